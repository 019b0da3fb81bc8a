//! # Symbolアドレス
//!
//! 公開鍵からのアドレス導出とBase32表現の相互変換。
//!
//! ```text
//! raw(24) = network(1) || RIPEMD-160(SHA3-256(public_key))(20) || checksum(3)
//! checksum = SHA3-256(network || ripemd)[0..3]
//! ```
//! Base32（パディングなし）で39文字になる。

use std::fmt;
use std::str::FromStr;

use ripemd::{Digest as _, Ripemd160};

use crate::{sha3_256, CryptoError, Network, PublicKey};

/// アドレスのバイト長
pub const ADDRESS_SIZE: usize = 24;
/// Base32表現の文字数
pub const ENCODED_ADDRESS_SIZE: usize = 39;

const RIPEMD_SIZE: usize = 20;
const CHECKSUM_SIZE: usize = 3;

/// 24バイトのSymbolアドレス。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// 公開鍵からアドレスを導出する。
    pub fn from_public_key(network: Network, public_key: &PublicKey) -> Self {
        let key_hash = sha3_256(public_key.as_bytes());
        let ripemd = Ripemd160::digest(key_hash);

        let mut raw = [0u8; ADDRESS_SIZE];
        raw[0] = network.identifier();
        raw[1..1 + RIPEMD_SIZE].copy_from_slice(&ripemd);

        let checksum = sha3_256(&raw[..1 + RIPEMD_SIZE]);
        raw[1 + RIPEMD_SIZE..].copy_from_slice(&checksum[..CHECKSUM_SIZE]);
        Address(raw)
    }

    /// 24バイトの生データからアドレスを構築する。チェックサムを検証する。
    pub fn from_bytes(raw: [u8; ADDRESS_SIZE]) -> Result<Self, CryptoError> {
        let checksum = sha3_256(&raw[..1 + RIPEMD_SIZE]);
        if raw[1 + RIPEMD_SIZE..] != checksum[..CHECKSUM_SIZE] {
            return Err(CryptoError::InvalidAddress("チェックサムが一致しません".to_string()));
        }
        Ok(Address(raw))
    }

    /// 生データを返す。
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// アドレスが属するネットワーク。未知の識別子ならNone。
    pub fn network(&self) -> Option<Network> {
        Network::from_identifier(self.0[0])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&data_encoding::BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    /// Base32表現をパースする。区切りのハイフンは無視する。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if compact.len() != ENCODED_ADDRESS_SIZE {
            return Err(CryptoError::InvalidAddress(format!(
                "{}文字である必要があります（実際: {}文字）",
                ENCODED_ADDRESS_SIZE,
                compact.len()
            )));
        }

        let decoded = data_encoding::BASE32_NOPAD
            .decode(compact.as_bytes())
            .map_err(|e| CryptoError::InvalidAddress(format!("Base32デコードに失敗: {e}")))?;
        let raw: [u8; ADDRESS_SIZE] = decoded
            .try_into()
            .map_err(|_| CryptoError::InvalidAddress("デコード後の長さが不正です".to_string()))?;
        Address::from_bytes(raw)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
