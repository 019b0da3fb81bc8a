//! # ノードクライアント
//!
//! 署名済みトランザクションを `PUT {NODE}/transactions` でアナウンスする。
//! 接続エラー・タイムアウト・5xx・429は指数バックオフで再試行する。
//! 再試行を含めた全体は `RetryPolicy::deadline` 以内に打ち切る。
//! 同じ署名済みペイロードを再送するため、ノード側ではハッシュで重複排除される。

use std::time::Duration;

use symbol_tx_types::AnnouncePayload;

use crate::backoff::calculate_backoff;
use crate::error::GatewayError;

/// アナウンス全体の期限のデフォルト（ミリ秒）。API Gatewayの統合タイムアウト（29秒）より短くする。
pub const DEFAULT_ANNOUNCE_DEADLINE_MS: u64 = 25_000;

/// アナウンスの再試行ポリシー。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回を含む）
    pub max_attempts: u32,
    /// バックオフの基準値（ミリ秒）
    pub base_delay_ms: u64,
    /// バックオフの上限（ミリ秒）
    pub max_delay_ms: u64,
    /// 再試行を含めたアナウンス全体の期限
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
            deadline: Duration::from_millis(DEFAULT_ANNOUNCE_DEADLINE_MS),
        }
    }
}

/// アナウンス先ノードの抽象インターフェース。
#[async_trait::async_trait]
pub trait NodeClient: Send + Sync {
    /// 署名済みペイロードをアナウンスし、ノードのレスポンスJSONを返す。
    async fn announce(&self, payload: &AnnouncePayload) -> Result<serde_json::Value, GatewayError>;
}

/// 1回の送信の結果。
enum Attempt {
    Done(serde_json::Value),
    Retryable(String),
    Fatal(String),
    Rejected {
        status: u16,
        response: serde_json::Value,
    },
}

/// HTTP経由でノードにアナウンスするクライアント。
pub struct HttpNodeClient {
    http_client: reqwest::Client,
    node_url: String,
    retry: RetryPolicy,
}

impl HttpNodeClient {
    /// 新しいHttpNodeClientを作成する。
    ///
    /// # 引数
    /// - `node_url`: ノードのベースURL（例: "http://localhost:3000"）
    pub fn new(http_client: reqwest::Client, node_url: String, retry: RetryPolicy) -> Self {
        Self {
            http_client,
            node_url: node_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// アナウンス先のURL。
    pub fn announce_url(&self) -> String {
        format!("{}/transactions", self.node_url)
    }

    async fn try_announce(&self, url: &str, payload: &AnnouncePayload) -> Attempt {
        let response = match self.http_client.put(url).json(payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return Attempt::Retryable(format!("HTTP送信失敗: {e}"));
            }
            Err(e) => return Attempt::Fatal(format!("HTTP送信失敗: {e}")),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retryable(format!("レスポンス読み取り失敗: {e}")),
        };

        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Attempt::Retryable(format!("ノードがエラーを返しました: HTTP {status} - {body}"));
        }
        if !status.is_success() {
            // JSONでなければ本文を文字列のまま渡す
            let response = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
            return Attempt::Rejected {
                status: status.as_u16(),
                response,
            };
        }

        match serde_json::from_str(&body) {
            Ok(value) => Attempt::Done(value),
            Err(e) => Attempt::Fatal(format!("レスポンスのパースに失敗: {e}")),
        }
    }

    async fn announce_with_retry(&self, payload: &AnnouncePayload) -> Result<serde_json::Value, GatewayError> {
        let url = self.announce_url();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay: Duration = calculate_backoff(
                    attempt - 1,
                    self.retry.base_delay_ms,
                    self.retry.max_delay_ms,
                );
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "アナウンスを再試行します"
                );
                tokio::time::sleep(delay).await;
            }

            match self.try_announce(&url, payload).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retryable(message) => last_error = message,
                Attempt::Fatal(message) => return Err(GatewayError::Node(message)),
                Attempt::Rejected { status, response } => {
                    return Err(GatewayError::NodeRejected { status, response })
                }
            }
        }

        Err(GatewayError::Node(format!(
            "{max_attempts}回試行しましたが失敗しました: {last_error}"
        )))
    }
}

#[async_trait::async_trait]
impl NodeClient for HttpNodeClient {
    async fn announce(&self, payload: &AnnouncePayload) -> Result<serde_json::Value, GatewayError> {
        let deadline = self.retry.deadline;
        match tokio::time::timeout(deadline, self.announce_with_retry(payload)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "アナウンスが期限切れになりました");
                Err(GatewayError::Node(format!(
                    "アナウンスが{}ミリ秒以内に完了しませんでした",
                    deadline.as_millis()
                )))
            }
        }
    }
}
