//! # プロキシレスポンスの組み立て
//!
//! 全レスポンスに `Content-Type: application/json` と
//! 全オリジン・全メソッドを許可するCORSヘッダを付ける。

use std::collections::HashMap;

use axum::http::StatusCode;
use serde::Serialize;
use symbol_tx_types::ProxyResponse;

/// クライアントが指定できるIdempotency-Keyヘッダ
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// CORSで許可するリクエストヘッダ
pub const ALLOWED_HEADERS: &[&str] = &[
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
    IDEMPOTENCY_KEY_HEADER,
];

/// CORSで許可するメソッド
pub const ALLOWED_METHODS: &str = "OPTIONS,GET,PUT,POST,DELETE,PATCH,HEAD";

/// CORSレスポンスヘッダ。
pub fn cors_headers() -> HashMap<String, String> {
    HashMap::from([
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("Access-Control-Allow-Methods".to_string(), ALLOWED_METHODS.to_string()),
        ("Access-Control-Allow-Headers".to_string(), ALLOWED_HEADERS.join(",")),
    ])
}

/// JSONボディのプロキシレスポンスを作る。
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ProxyResponse {
    let body = match serde_json::to_string(body) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "レスポンスのシリアライズに失敗");
            return ProxyResponse {
                status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                headers: cors_headers(),
                body: r#"{"message":"Failed to serialize response"}"#.to_string(),
                is_base64_encoded: false,
            };
        }
    };

    let mut headers = cors_headers();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    ProxyResponse {
        status_code: status.as_u16(),
        headers,
        body,
        is_base64_encoded: false,
    }
}

/// CORSプリフライト（OPTIONS）へのレスポンス。
pub fn preflight_response() -> ProxyResponse {
    ProxyResponse {
        status_code: StatusCode::NO_CONTENT.as_u16(),
        headers: cors_headers(),
        body: String::new(),
        is_base64_encoded: false,
    }
}
