//! # Lambda Runtime API クライアント
//!
//! `AWS_LAMBDA_RUNTIME_API` が設定された環境（provided.al2023 のカスタムランタイム）で、
//! 次のイベントの取得 → ハンドラ実行 → 結果の返却を繰り返す。
//!
//! - `GET  /2018-06-01/runtime/invocation/next`
//! - `POST /2018-06-01/runtime/invocation/{request_id}/response`
//! - `POST /2018-06-01/runtime/invocation/{request_id}/error`
//! - `POST /2018-06-01/runtime/init/error`

use std::sync::Arc;

use serde::Serialize;
use symbol_tx_types::{ProxyEvent, ProxyResponse};
use tracing::Instrument;

use crate::config::AppState;
use crate::endpoints::handle_event;

/// Runtime APIのバージョンプレフィックス
pub const RUNTIME_API_VERSION: &str = "2018-06-01";
/// 呼び出しIDを運ぶヘッダ
pub const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

/// Runtime APIとのやり取りのエラー。
#[derive(Debug, thiserror::Error)]
pub enum LambdaError {
    /// HTTP通信に失敗
    #[error("Runtime APIとの通信に失敗: {0}")]
    Http(#[from] reqwest::Error),
    /// Runtime APIが成功以外を返した
    #[error("Runtime APIがエラーを返しました: {endpoint} HTTP {status}")]
    Status { endpoint: String, status: u16 },
    /// 次のイベントに呼び出しIDが無い
    #[error("{REQUEST_ID_HEADER} ヘッダがありません")]
    MissingRequestId,
}

/// Runtime APIに返すエラー本文。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeErrorBody {
    pub error_message: String,
    pub error_type: String,
}

/// 1回分の呼び出し。
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub event: serde_json::Value,
}

/// Runtime APIクライアント。
pub struct RuntimeClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// `runtime_api` は `AWS_LAMBDA_RUNTIME_API` の値（例: "127.0.0.1:9001"）。
    pub fn new(http_client: reqwest::Client, runtime_api: &str) -> Self {
        let host = runtime_api
            .trim_start_matches("http://")
            .trim_end_matches('/');
        Self {
            http_client,
            base_url: format!("http://{host}/{RUNTIME_API_VERSION}/runtime"),
        }
    }

    /// 次のイベントをロングポーリングで取得する。
    pub async fn next_invocation(&self) -> Result<Invocation, LambdaError> {
        let endpoint = format!("{}/invocation/next", self.base_url);
        let response = self.http_client.get(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(LambdaError::Status {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(LambdaError::MissingRequestId)?;

        // ボディがJSONでない場合もハンドラ側でエラーとして返すため、ここでは失敗させない
        let text = response.text().await?;
        let event = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

        Ok(Invocation { request_id, event })
    }

    /// ハンドラの結果を返す。
    pub async fn send_response(
        &self,
        request_id: &str,
        response: &ProxyResponse,
    ) -> Result<(), LambdaError> {
        let endpoint = format!("{}/invocation/{request_id}/response", self.base_url);
        self.post(endpoint, response).await
    }

    /// 呼び出しの失敗を報告する。
    pub async fn send_error(
        &self,
        request_id: &str,
        error: &RuntimeErrorBody,
    ) -> Result<(), LambdaError> {
        let endpoint = format!("{}/invocation/{request_id}/error", self.base_url);
        self.post(endpoint, error).await
    }

    /// 初期化の失敗を報告する。以降この実行環境は使われない。
    pub async fn report_init_error(&self, error: &RuntimeErrorBody) -> Result<(), LambdaError> {
        let endpoint = format!("{}/init/error", self.base_url);
        self.post(endpoint, error).await
    }

    async fn post<T: Serialize>(&self, endpoint: String, body: &T) -> Result<(), LambdaError> {
        let response = self.http_client.post(&endpoint).json(body).send().await?;
        if !response.status().is_success() {
            return Err(LambdaError::Status {
                endpoint,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// イベントループ。Runtime APIとの通信に失敗した時点で戻る。
pub async fn run(state: Arc<AppState>, client: RuntimeClient) -> Result<(), LambdaError> {
    tracing::info!("Lambdaイベントループを開始します");

    loop {
        let invocation = client.next_invocation().await?;
        let span = tracing::info_span!("invocation", request_id = %invocation.request_id);
        process(&state, &client, invocation).instrument(span).await?;
    }
}

async fn process(
    state: &AppState,
    client: &RuntimeClient,
    invocation: Invocation,
) -> Result<(), LambdaError> {
    match serde_json::from_value::<ProxyEvent>(invocation.event) {
        Ok(event) => {
            let response = handle_event(state, event).await;
            tracing::info!(status = response.status_code, "レスポンスを返します");
            client.send_response(&invocation.request_id, &response).await
        }
        Err(e) => {
            tracing::error!(error = %e, "イベントの形式が不正です");
            let body = RuntimeErrorBody {
                error_message: format!("イベントの形式が不正です: {e}"),
                error_type: "InvalidEvent".to_string(),
            };
            client.send_error(&invocation.request_id, &body).await
        }
    }
}
