//! # Gateway エラー型
//!
//! ハンドラで扱うエラーと、API Gatewayプロキシレスポンスへの変換。
//! 400は `{message}`、500は `{message, error, stack}` を返す。

use axum::http::StatusCode;
use symbol_tx_core::CodecError;
use symbol_tx_types::{ErrorResponse, ProxyResponse};

use crate::response::json_response;

/// ボディが無いリクエストに返す固定メッセージ
pub const MISSING_BODY_MESSAGE: &str = "Request body is required";
/// 500レスポンスの `message`
pub const INTERNAL_ERROR_MESSAGE: &str = "Failed to announce transaction";

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト
    #[error("{0}")]
    BadRequest(String),
    /// 同じIdempotency-Keyのリクエストが処理中
    #[error("同じIdempotency-Keyのリクエストを処理中です")]
    Conflict,
    /// トランザクションの構築・署名に失敗
    #[error("トランザクションの構築に失敗: {0}")]
    Build(#[from] CodecError),
    /// ノードへのアナウンスに失敗
    #[error("ノードへのアナウンスに失敗: {0}")]
    Node(String),
    /// ノードがアナウンスを拒否した（429以外の4xx）
    #[error("ノードがアナウンスを拒否しました: HTTP {status}")]
    NodeRejected {
        /// ノードのHTTPステータス
        status: u16,
        /// ノードのレスポンス
        response: serde_json::Value,
    },
    /// 起動時の検査に失敗
    #[error("起動に失敗: {0}")]
    Startup(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTPステータスコード。
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Conflict => StatusCode::CONFLICT,
            GatewayError::Build(_)
            | GatewayError::Node(_)
            | GatewayError::NodeRejected { .. }
            | GatewayError::Startup(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// レスポンスボディ。
    pub fn body(&self) -> ErrorResponse {
        match self {
            GatewayError::BadRequest(message) => ErrorResponse {
                message: message.clone(),
                error: None,
                stack: None,
                result: None,
            },
            GatewayError::Conflict => ErrorResponse {
                message: self.to_string(),
                error: None,
                stack: None,
                result: None,
            },
            _ => ErrorResponse {
                message: INTERNAL_ERROR_MESSAGE.to_string(),
                error: Some(self.to_string()),
                stack: Some(error_chain(self)),
                result: match self {
                    GatewayError::NodeRejected { response, .. } => Some(response.clone()),
                    _ => None,
                },
            },
        }
    }

    /// API Gatewayプロキシレスポンスに変換する。
    pub fn to_proxy_response(&self) -> ProxyResponse {
        json_response(self.status(), &self.body())
    }
}

/// エラーの原因チェーンを1行1件で列挙する。
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut lines = vec![format!("{error}")];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines.join("\n")
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (status, axum::Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_body() {
        let err = GatewayError::BadRequest(MISSING_BODY_MESSAGE.to_string());
        let response = err.to_proxy_response();

        assert_eq!(response.status_code, 400);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, serde_json::json!({"message": MISSING_BODY_MESSAGE}));
    }

    #[test]
    fn test_internal_error_has_error_and_stack() {
        let err = GatewayError::Node("HTTP 503".to_string());
        let response = err.to_proxy_response();

        assert_eq!(response.status_code, 500);
        let body: ErrorResponse = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
        assert!(body.error.unwrap().contains("HTTP 503"));
        assert!(!body.stack.unwrap().is_empty());
    }

    /// `#[from]` で包んだエラーの原因が stack に含まれる
    #[test]
    fn test_error_chain_includes_source() {
        let err = GatewayError::from(CodecError::Crypto(
            symbol_tx_crypto::CryptoError::SignatureVerifyError,
        ));
        let stack = error_chain(&err);

        assert!(stack.lines().count() >= 2, "{stack}");
        assert!(stack.contains("caused by"));
    }

    #[test]
    fn test_into_response() {
        use axum::response::IntoResponse;

        let response = GatewayError::BadRequest("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = GatewayError::Internal("y".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    /// ノードの拒否レスポンスは `result` にそのまま入る
    #[test]
    fn test_node_rejected_keeps_node_response() {
        let node_response = serde_json::json!({"code": "InvalidArgument", "message": "bad payload"});
        let err = GatewayError::NodeRejected {
            status: 409,
            response: node_response.clone(),
        };
        let response = err.to_proxy_response();

        assert_eq!(response.status_code, 500);
        let body: ErrorResponse = serde_json::from_str(&response.body).unwrap();
        assert!(body.error.unwrap().contains("HTTP 409"));
        assert_eq!(body.result, Some(node_response));

        let body = GatewayError::Node("x".to_string()).body();
        assert!(body.result.is_none());
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(GatewayError::Conflict.status(), StatusCode::CONFLICT);
        assert!(GatewayError::Conflict.body().error.is_none());
    }
}
