//! # ローカルHTTPサーバー
//!
//! Lambda外で動かす場合のエントリ。HTTPリクエストをプロキシイベントに変換し、
//! Lambdaと同じ `handle_event` で処理する。CORSは `CorsLayer` が担う。

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use symbol_tx_types::{ProxyEvent, ProxyResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppState;
use crate::endpoints::{handle_event, handle_health};

/// ルーターを構築する。
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/transaction",
            post(handle_transaction).options(handle_transaction),
        )
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `addr` で待ち受けを開始する。
pub async fn serve(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "ローカルサーバーを起動します");

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// POST/OPTIONS /transaction
async fn handle_transaction(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = to_proxy_event(&method, &uri, &headers, &body);
    into_http_response(handle_event(&state, event).await)
}

/// HTTPリクエストをプロキシイベントに変換する。
/// UTF-8でないボディはBase64で渡す。
pub fn to_proxy_event(method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> ProxyEvent {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let (body, is_base64_encoded) = if body.is_empty() {
        (None, false)
    } else {
        match std::str::from_utf8(body) {
            Ok(text) => (Some(serde_json::Value::String(text.to_string())), false),
            Err(_) => (
                Some(serde_json::Value::String(
                    base64::engine::general_purpose::STANDARD.encode(body),
                )),
                true,
            ),
        }
    };

    ProxyEvent {
        http_method: Some(method.as_str().to_string()),
        path: Some(uri.path().to_string()),
        headers: Some(headers),
        body,
        is_base64_encoded,
    }
}

/// プロキシレスポンスをHTTPレスポンスに変換する。
/// CORSヘッダは `CorsLayer` が付けるため除く。
pub fn into_http_response(response: ProxyResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if name.to_ascii_lowercase().starts_with("access-control-") {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    (status, headers, response.body).into_response()
}
