//! # POST /transaction
//!
//! 転送トランザクションを構築・署名し、ノードにアナウンスする。
//!
//! 1. ボディをパースする（無ければ400）
//! 2. メッセージ = タグバイト + `message`（省略時はデフォルト）
//! 3. 転送トランザクションを構築（期限 = 現在 + 設定時間）
//! 4. 手数料 = サイズ × 手数料乗数
//! 5. 署名し、`PUT {NODE}/transactions` でアナウンス
//! 6. 200 `{message, transaction, result}`、失敗時は500 `{message, error, stack}`

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use base64::Engine;
use symbol_tx_core::{deadline_after, Message, Mosaic, TransferTransaction, DEFAULT_MESSAGE};
use symbol_tx_types::{ProxyEvent, ProxyResponse, TransactionRequest, TransactionResponse};

use crate::config::AppState;
use crate::error::{GatewayError, MISSING_BODY_MESSAGE};
use crate::idempotency::{Reservation, MAX_KEY_LENGTH};
use crate::response::{json_response, preflight_response, IDEMPOTENCY_KEY_HEADER};

/// 成功レスポンスの `message`
pub const SUCCESS_MESSAGE: &str = "Transaction announced";

/// API Gatewayプロキシイベントを処理する。
///
/// エラーはすべてプロキシレスポンス（400/409/500）に変換されるため、この関数は失敗しない。
pub async fn handle_event(state: &AppState, event: ProxyEvent) -> ProxyResponse {
    tracing::debug!(event = ?event, "イベントを受信しました");

    if event
        .http_method
        .as_deref()
        .is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS"))
    {
        return preflight_response();
    }

    let request = match parse_request(&event) {
        Ok(request) => request,
        Err(e) => {
            tracing::info!(error = %e, "不正なリクエスト");
            return e.to_proxy_response();
        }
    };

    let idempotency_key = match idempotency_key(&event) {
        Ok(key) => key,
        Err(e) => return e.to_proxy_response(),
    };

    // ガードは成功時のみcompleteする。失敗やハンドラの中断では破棄され、キーが解放される
    let guard = match &idempotency_key {
        Some(key) => match state.idempotency.begin(key) {
            Reservation::New(guard) => Some(guard),
            Reservation::InFlight => return GatewayError::Conflict.to_proxy_response(),
            Reservation::Completed(response) => {
                tracing::info!(idempotency_key = %key, "処理済みのレスポンスを返します");
                return response;
            }
        },
        None => None,
    };

    let response = match announce_transfer(state, &request).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => {
            tracing::error!(error = %e, "トランザクションの送信に失敗しました");
            e.to_proxy_response()
        }
    };

    if let Some(guard) = guard {
        if response.status_code == StatusCode::OK.as_u16() {
            guard.complete(response.clone());
        }
    }

    response
}

/// イベントのボディを `TransactionRequest` にパースする。
///
/// ボディはJSON文字列（プロキシ統合）またはJSONオブジェクト（直接呼び出し）を受け付ける。
pub fn parse_request(event: &ProxyEvent) -> Result<TransactionRequest, GatewayError> {
    let missing = || GatewayError::BadRequest(MISSING_BODY_MESSAGE.to_string());

    match &event.body {
        None | Some(serde_json::Value::Null) => Err(missing()),
        Some(serde_json::Value::String(raw)) => {
            let decoded;
            let text = if event.is_base64_encoded {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(raw.trim())
                    .map_err(|e| GatewayError::BadRequest(format!("ボディのBase64デコードに失敗: {e}")))?;
                decoded = String::from_utf8(bytes)
                    .map_err(|_| GatewayError::BadRequest("ボディがUTF-8ではありません".to_string()))?;
                decoded.as_str()
            } else {
                raw.as_str()
            };

            if text.trim().is_empty() {
                return Err(missing());
            }
            serde_json::from_str(text).map_err(|e| {
                GatewayError::BadRequest(format!("ボディはJSONオブジェクトである必要があります: {e}"))
            })
        }
        Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|e| GatewayError::BadRequest(format!("ボディが不正です: {e}"))),
        Some(_) => Err(GatewayError::BadRequest(
            "ボディはJSONオブジェクトである必要があります".to_string(),
        )),
    }
}

/// Idempotency-Keyヘッダを取り出す。空なら無視する。
fn idempotency_key(event: &ProxyEvent) -> Result<Option<String>, GatewayError> {
    let Some(key) = event.header(IDEMPOTENCY_KEY_HEADER).map(str::trim) else {
        return Ok(None);
    };
    if key.is_empty() {
        return Ok(None);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(GatewayError::BadRequest(format!(
            "{IDEMPOTENCY_KEY_HEADER} は{MAX_KEY_LENGTH}バイト以下である必要があります"
        )));
    }
    Ok(Some(key.to_string()))
}

/// 転送トランザクションを構築・署名してアナウンスする。
pub async fn announce_transfer(
    state: &AppState,
    request: &TransactionRequest,
) -> Result<TransactionResponse, GatewayError> {
    let transfer = &state.config.transfer;
    let signer = &state.config.signer;

    let message = Message::plain(request.message.as_deref().unwrap_or(DEFAULT_MESSAGE));
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| GatewayError::Internal(format!("システム時刻が不正です: {e}")))?;
    let now_millis = u64::try_from(now.as_millis())
        .map_err(|_| GatewayError::Internal("システム時刻が範囲外です".to_string()))?;

    let mut tx = TransferTransaction::new(
        transfer.network,
        *signer.public_key(),
        transfer.recipient,
        vec![Mosaic {
            id: transfer.mosaic_id,
            amount: transfer.amount,
        }],
        message,
        deadline_after(transfer.network, now_millis, transfer.deadline),
    );
    let fee = tx.apply_fee_multiplier(transfer.fee_multiplier)?;
    tx.sign(signer)?;

    let transaction = tx.to_json()?;
    let payload = tx.announce_payload()?;

    tracing::info!(
        hash = %transaction.hash,
        size = transaction.size,
        fee,
        recipient = %transaction.recipient_address,
        "トランザクションをアナウンスします"
    );

    let result = state.node.announce(&payload).await?;

    tracing::info!(hash = %transaction.hash, "アナウンスが完了しました");

    Ok(TransactionResponse {
        message: SUCCESS_MESSAGE.to_string(),
        transaction,
        result,
    })
}
