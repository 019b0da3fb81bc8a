//! # Symbol Transaction API 共有型定義
//!
//! API Gateway (RESTプロキシ統合) のイベント/レスポンス、
//! `/transaction` エンドポイントのリクエスト/レスポンスボディ、
//! ノードへのアナウンスペイロードを定義する。
//!
//! ## エンコーディング規則
//! - Hex (大文字): 公開鍵、署名、トランザクションハッシュ、ペイロード
//! - Base32: Symbolアドレス（39文字）
//! - u64の値（fee, deadline, amount, mosaic id）はJSONの精度落ちを避けるため文字列で表現する

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// API Gateway プロキシ統合
// ---------------------------------------------------------------------------

/// API Gatewayプロキシ統合でLambdaに渡されるイベント。
///
/// ハンドラが参照するフィールドのみを定義する。未知のフィールドは無視される。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    /// HTTPメソッド（"POST", "OPTIONS" 等）
    #[serde(default)]
    pub http_method: Option<String>,
    /// リクエストパス（例: "/transaction"）
    #[serde(default)]
    pub path: Option<String>,
    /// リクエストヘッダ。API Gatewayはヘッダがない場合 `null` を送る。
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// リクエストボディ。
    /// プロキシ統合ではJSON文字列、直接呼び出し（テストイベント）ではJSONオブジェクトが入る。
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// `body` がBase64エンコードされているか
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ProxyEvent {
    /// ヘッダを大文字小文字を区別せずに取得する。
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }
}

/// API Gatewayプロキシ統合に返すレスポンス。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    /// HTTPステータスコード
    pub status_code: u16,
    /// レスポンスヘッダ
    pub headers: HashMap<String, String>,
    /// JSON文字列化されたレスポンスボディ
    pub body: String,
    /// `body` がBase64エンコードされているか（常にfalse）
    #[serde(default)]
    pub is_base64_encoded: bool,
}

// ---------------------------------------------------------------------------
// POST /transaction
// ---------------------------------------------------------------------------

/// `POST /transaction` のリクエストボディ。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// トランザクションに添付する平文メッセージ。省略時はデフォルトメッセージ。
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /transaction` の成功レスポンス (200)。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// 結果メッセージ
    pub message: String,
    /// アナウンスしたトランザクションのJSON表現
    pub transaction: TransactionJson,
    /// ノードのレスポンスJSON（そのまま中継）
    pub result: serde_json::Value,
}

/// エラーレスポンス (400 / 500)。
///
/// 400では `message` のみ、500では `error` と `stack` も含む。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// エラーの概要
    pub message: String,
    /// エラーの詳細（500のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// エラーの原因チェーン。1行に1つの原因（500のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// ノードが拒否した場合のノードのレスポンス（そのまま）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// トランザクション表現
// ---------------------------------------------------------------------------

/// 転送トランザクションのJSON表現。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionJson {
    /// トランザクションハッシュ（SHA3-256、Hex）
    pub hash: String,
    /// シリアライズ後のバイト長
    pub size: u32,
    /// 署名（Hex）
    pub signature: String,
    /// 署名者の公開鍵（Hex）
    pub signer_public_key: String,
    /// トランザクションバージョン
    pub version: u8,
    /// ネットワーク識別子（testnet: 152, mainnet: 104）
    pub network: u8,
    /// トランザクション種別（転送: 16724）
    #[serde(rename = "type")]
    pub transaction_type: u16,
    /// 手数料（最小単位）
    pub fee: String,
    /// 期限（ネットワーク時刻、ミリ秒）
    pub deadline: String,
    /// 受取人アドレス（Base32）
    pub recipient_address: String,
    /// 転送するモザイク
    pub mosaics: Vec<MosaicJson>,
    /// メッセージ（先頭のタグバイトを含むHex）
    pub message: String,
}

/// モザイクのJSON表現。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicJson {
    /// モザイクID（16桁Hex）
    #[serde(rename = "mosaicId")]
    pub mosaic_id: String,
    /// 数量（最小単位）
    pub amount: String,
}

// ---------------------------------------------------------------------------
// ノードへのアナウンス
// ---------------------------------------------------------------------------

/// `PUT /transactions` に送る署名済みペイロード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncePayload {
    /// シリアライズ済みトランザクション全体（大文字Hex）
    pub payload: String,
}

// ---------------------------------------------------------------------------
// GET /health（ローカルサーバーのみ）
// ---------------------------------------------------------------------------

/// `GET /health` のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 常に "ok"
    pub status: String,
    /// ネットワーク名（"testnet" / "mainnet"）
    pub network: String,
    /// 署名者の公開鍵（大文字Hex）
    pub signer_public_key: String,
    /// 署名者のアドレス
    pub signer_address: String,
    /// 受取人のアドレス
    pub recipient_address: String,
    /// アナウンス先ノード
    pub node_url: String,
}
