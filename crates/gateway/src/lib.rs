//! # Symbol Transaction Gateway
//!
//! 転送トランザクションを構築・署名し、Symbolノードにアナウンスする。
//!
//! ## 実行モード
//! - Lambda: `AWS_LAMBDA_RUNTIME_API` が設定されている場合、Runtime APIのイベントループを回す
//! - ローカル: それ以外は `LISTEN_ADDR` でHTTPサーバーを起動する
//!
//! ## API エンドポイント
//! - `POST /transaction`: 転送トランザクションの署名とアナウンス
//! - `GET /health`: 稼働確認（ローカルのみ）

pub mod backoff;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod idempotency;
pub mod lambda;
pub mod node_client;
pub mod response;
pub mod server;

pub use config::{ApiConfig, AppState, ConfigError};
pub use error::GatewayError;

/// tracingを初期化する。レベルは `RUST_LOG`（未設定なら info）。
///
/// CloudWatch Logsではエスケープシーケンスが読みにくいため、Lambdaでは `ansi = false` にする。
pub fn init_tracing(ansi: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // 二重初期化（テストやCLIからの再呼び出し）は無視する
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .try_init();
}
