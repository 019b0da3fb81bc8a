//! # Gatewayエンドポイント
//!
//! - `POST /transaction`: 転送トランザクションの署名とアナウンス
//! - `GET /health`: 稼働確認（ローカルサーバーのみ）

pub mod health;
pub mod transaction;

#[cfg(test)]
pub mod test_helpers;

pub use health::handle_health;
pub use transaction::handle_event;
