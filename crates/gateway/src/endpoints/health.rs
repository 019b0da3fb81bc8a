//! # GET /health
//!
//! ローカルサーバーの稼働確認。署名者・受取人・ネットワークを公開する。
//! 秘密鍵は含めない。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use symbol_tx_crypto::Address;
use symbol_tx_types::HealthResponse;

use crate::config::AppState;

/// 現在の設定から稼働情報を作る。
pub fn health_info(state: &AppState) -> HealthResponse {
    let config = &state.config;
    let network = config.transfer.network;
    HealthResponse {
        status: "ok".to_string(),
        network: network.to_string(),
        signer_public_key: config.signer.public_key().to_string(),
        signer_address: Address::from_public_key(network, config.signer.public_key()).to_string(),
        recipient_address: config.transfer.recipient.to_string(),
        node_url: config.announce.node_url.clone(),
    }
}

/// GET /health
pub async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(health_info(&state))
}
