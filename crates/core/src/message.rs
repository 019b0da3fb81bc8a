//! 転送トランザクションに添付するメッセージ。
//!
//! 先頭1バイトがメッセージ種別タグ（平文は `0x00`）、以降が本文。

use crate::CodecError;

/// 平文メッセージのタグバイト
pub const PLAIN_MESSAGE_TAG: u8 = 0x00;

/// リクエストに `message` が無い場合に使う本文
pub const DEFAULT_MESSAGE: &str = "Hello, Symbol!";

/// タグバイトを含むメッセージのバイト列。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message(Vec<u8>);

impl Message {
    /// 平文メッセージを構築する。
    pub fn plain(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(1 + text.len());
        bytes.push(PLAIN_MESSAGE_TAG);
        bytes.extend_from_slice(text.as_bytes());
        Message(bytes)
    }

    /// タグを含む生バイト列からメッセージを構築する。
    /// ワイヤ形式の長さフィールド（u16）に収まらない場合はエラー。
    pub fn from_raw(bytes: Vec<u8>) -> Result<Self, CodecError> {
        if bytes.len() > u16::MAX as usize {
            return Err(CodecError::MessageTooLarge(bytes.len()));
        }
        Ok(Message(bytes))
    }

    /// タグを含むバイト列。
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// バイト長（タグを含む）。
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 空のメッセージか（タグも無い）。
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 平文メッセージであれば本文を返す。
    pub fn plain_text(&self) -> Option<&str> {
        match self.0.split_first() {
            Some((&PLAIN_MESSAGE_TAG, rest)) => std::str::from_utf8(rest).ok(),
            _ => None,
        }
    }
}
