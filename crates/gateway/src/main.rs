//! # symbol-tx-gateway
//!
//! Lambdaのカスタムランタイム（`bootstrap`）兼ローカルサーバー。
//! 設定の読み込みと署名鍵の自己診断に失敗した場合は起動しない。

use std::sync::Arc;

use symbol_tx_gateway::lambda::{self, RuntimeClient, RuntimeErrorBody};
use symbol_tx_gateway::{init_tracing, server, ApiConfig, AppState};

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let runtime_api = std::env::var("AWS_LAMBDA_RUNTIME_API")
        .ok()
        .filter(|v| !v.is_empty());
    init_tracing(runtime_api.is_none());

    let state = match build_state() {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "起動に失敗しました");
            if let Some(api) = &runtime_api {
                let client = RuntimeClient::new(reqwest::Client::new(), api);
                let body = RuntimeErrorBody {
                    error_message: format!("{e:#}"),
                    error_type: "Runtime.InitError".to_string(),
                };
                if let Err(report_err) = client.report_init_error(&body).await {
                    tracing::error!(error = %report_err, "初期化エラーの報告に失敗しました");
                }
            }
            return Err(e);
        }
    };

    match runtime_api {
        Some(api) => {
            let client = RuntimeClient::new(reqwest::Client::new(), &api);
            lambda::run(state, client).await?;
        }
        None => {
            let addr = state.config.listen_addr.clone();
            server::serve(state, &addr).await?;
        }
    }

    Ok(())
}

/// 環境変数から設定を読み込み、共有状態を作る。
fn build_state() -> anyhow::Result<AppState> {
    let config = ApiConfig::from_env()?;
    Ok(AppState::new(config)?)
}
