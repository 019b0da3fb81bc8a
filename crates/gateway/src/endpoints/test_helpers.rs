//! # エンドポイントテスト用共通ヘルパー
//!
//! 記録用のモックノードと、テスト用の共有状態。

use std::sync::{Arc, Mutex};

use symbol_tx_types::AnnouncePayload;

use crate::config::{ApiConfig, AppState};
use crate::error::GatewayError;
use crate::node_client::NodeClient;

pub const ALICE_PRIVATE_KEY: &str =
    "33047CFD3ABA8E1B6FE047182F9B0118E2FA7E7D9E33865533AB582973F3B2A8";
pub const BOB_ADDRESS: &str = "TCSMJNJTRI76YPGQFDEZBFL3XTM4L3AWELOGBDY";

/// 受け取ったペイロードを記録するモックノード。
/// `fail` がSomeの場合はそのメッセージでアナウンスに失敗する。
#[derive(Default)]
pub struct RecordingNode {
    pub payloads: Mutex<Vec<AnnouncePayload>>,
    pub fail: Option<String>,
}

impl RecordingNode {
    pub fn failing(message: &str) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            fail: Some(message.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl NodeClient for RecordingNode {
    async fn announce(&self, payload: &AnnouncePayload) -> Result<serde_json::Value, GatewayError> {
        self.payloads.lock().unwrap().push(payload.clone());
        match &self.fail {
            Some(message) => Err(GatewayError::Node(message.clone())),
            None => Ok(serde_json::json!({
                "message": "packet 9 was pushed to the network via /transactions"
            })),
        }
    }
}

/// テスト側から記録を参照できるよう、Arc越しでもノードとして使えるようにする
#[async_trait::async_trait]
impl NodeClient for Arc<RecordingNode> {
    async fn announce(&self, payload: &AnnouncePayload) -> Result<serde_json::Value, GatewayError> {
        self.as_ref().announce(payload).await
    }
}

/// テスト用の設定（Alice → Bob、testnet、手数料乗数100）
pub fn test_config() -> ApiConfig {
    ApiConfig::from_lookup(|name| match name {
        "SIGNER_PRIVATE_KEY" => Some(ALICE_PRIVATE_KEY.to_string()),
        "RECIPIENT_ADDRESS" => Some(BOB_ADDRESS.to_string()),
        "NODE_URL" => Some("http://127.0.0.1:1".to_string()),
        _ => None,
    })
    .unwrap()
}

/// 任意のノードクライアントで共有状態を構築する
pub fn test_state<N: NodeClient + 'static>(node: N) -> AppState {
    AppState::with_node_client(test_config(), Box::new(node)).unwrap()
}
