//! # Symbol Transaction API Core
//!
//! 転送トランザクションの構築・手数料計算・署名・シリアライズを実装する。
//!
//! ## 処理フロー
//! 1. メッセージ（タグバイト + UTF-8本文）を組み立てる
//! 2. 署名者・期限・受取人・モザイク・メッセージから転送トランザクションを構築する
//! 3. 手数料 = シリアライズ後のバイト長 × 手数料乗数
//! 4. Generation Hash Seedを前置したデータに署名する
//! 5. 全体を大文字Hexにしてアナウンスペイロードとする

pub mod message;
pub mod transaction;

use symbol_tx_crypto::CryptoError;

pub use message::{Message, DEFAULT_MESSAGE, PLAIN_MESSAGE_TAG};
pub use transaction::{
    deadline_after, Mosaic, TransferTransaction, TRANSACTION_HEADER_SIZE,
    TRANSFER_TRANSACTION_TYPE, TRANSFER_TRANSACTION_VERSION,
};

/// Coreモジュールのエラー型
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// メッセージがワイヤ形式の上限（65535バイト）を超えた
    #[error("メッセージが大きすぎます: {0}バイト")]
    MessageTooLarge(usize),
    /// モザイク数がワイヤ形式の上限（255件）を超えた
    #[error("モザイクが多すぎます: {0}件")]
    TooManyMosaics(usize),
    /// 手数料計算のオーバーフロー
    #[error("手数料の計算がオーバーフローしました")]
    FeeOverflow,
    /// デシリアライズ中にデータが途切れた
    #[error("データが途中で終わっています: {0}")]
    Truncated(String),
    /// フィールド値が不正
    #[error("フィールドが不正です: {0}")]
    InvalidField(String),
    /// 署名鍵がトランザクションの署名者と一致しない
    #[error("署名鍵の公開鍵がトランザクションの署名者と一致しません")]
    SignerMismatch,
    /// 暗号処理エラー
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
