//! # ネットワーク定義
//!
//! testnet / mainnet ごとに異なる定数（ネットワーク識別子、エポック、
//! Generation Hash Seed、基軸通貨モザイクID）をまとめる。

use std::fmt;
use std::str::FromStr;

use crate::CryptoError;

/// Symbolネットワーク。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    /// テストネット
    #[default]
    Testnet,
    /// メインネット
    Mainnet,
}

impl Network {
    /// アドレス先頭バイトおよびトランザクションの `network` フィールドに使う識別子。
    pub fn identifier(self) -> u8 {
        match self {
            Network::Testnet => 0x98,
            Network::Mainnet => 0x68,
        }
    }

    /// ネットワーク識別子からネットワークを判定する。
    pub fn from_identifier(identifier: u8) -> Option<Self> {
        match identifier {
            0x98 => Some(Network::Testnet),
            0x68 => Some(Network::Mainnet),
            _ => None,
        }
    }

    /// ネットワークのエポック（UNIX時刻、ミリ秒）。
    /// トランザクションの `deadline` はこの時刻からの経過ミリ秒で表す。
    pub fn epoch_unix_millis(self) -> u64 {
        match self {
            Network::Testnet => 1_667_250_467_000,
            Network::Mainnet => 1_615_853_185_000,
        }
    }

    /// 署名対象データの先頭に付与するGeneration Hash Seed。
    pub fn generation_hash_seed(self) -> [u8; 32] {
        match self {
            Network::Testnet => [
                0x49, 0xD6, 0xE1, 0xCE, 0x27, 0x6A, 0x85, 0xB7, 0x0E, 0xAF, 0xE5, 0x23, 0x49,
                0xAA, 0xCC, 0xA3, 0x89, 0x30, 0x2E, 0x7A, 0x97, 0x54, 0xBC, 0xF1, 0x22, 0x1E,
                0x79, 0x49, 0x4F, 0xC6, 0x65, 0xA4,
            ],
            Network::Mainnet => [
                0x57, 0xF7, 0xDA, 0x20, 0x50, 0x08, 0x02, 0x6C, 0x77, 0x6C, 0xB6, 0xAE, 0xD8,
                0x43, 0x39, 0x3F, 0x04, 0xCD, 0x45, 0x8E, 0x0A, 0xA2, 0xD9, 0xF1, 0xD5, 0xF3,
                0x1A, 0x40, 0x20, 0x72, 0xB2, 0xD6,
            ],
        }
    }

    /// 基軸通貨（symbol.xym）のモザイクID。
    pub fn currency_mosaic_id(self) -> u64 {
        match self {
            Network::Testnet => 0x72C0_212E_67A0_8BCE,
            Network::Mainnet => 0x6BED_913F_A202_23F8,
        }
    }

    /// UNIX時刻（ミリ秒）をネットワーク時刻に変換する。
    /// エポックより前の時刻は0に丸める。
    pub fn network_time_from_unix_millis(self, unix_millis: u64) -> u64 {
        unix_millis.saturating_sub(self.epoch_unix_millis())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => f.write_str("testnet"),
            Network::Mainnet => f.write_str("mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "public_test" => Ok(Network::Testnet),
            "mainnet" | "public" => Ok(Network::Mainnet),
            other => Err(CryptoError::UnknownNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_roundtrip() {
        for network in [Network::Testnet, Network::Mainnet] {
            assert_eq!(Network::from_identifier(network.identifier()), Some(network));
        }
        assert_eq!(Network::from_identifier(0x00), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!(" MAINNET ".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_time() {
        let testnet = Network::Testnet;
        assert_eq!(
            testnet.network_time_from_unix_millis(testnet.epoch_unix_millis() + 1_000),
            1_000
        );
        assert_eq!(testnet.network_time_from_unix_millis(0), 0);
    }

    #[test]
    fn test_generation_hash_seed_hex() {
        assert_eq!(
            hex::encode_upper(Network::Testnet.generation_hash_seed()),
            "49D6E1CE276A85B70EAFE52349AACCA389302E7A9754BCF1221E79494FC665A4"
        );
        assert_eq!(
            hex::encode_upper(Network::Mainnet.generation_hash_seed()),
            "57F7DA205008026C776CB6AED843393F04CD458E0AA2D9F1D5F31A402072B2D6"
        );
    }
}
