//! # Symbol Transaction API 暗号処理
//!
//! Symbolの転送トランザクションの署名・検証に必要な暗号プリミティブを提供する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 署名 | Ed25519 (SHA-512) |
//! | トランザクションハッシュ | SHA3-256 |
//! | アドレス導出 | SHA3-256 → RIPEMD-160 |
//! | アドレス表現 | Base32 |

pub mod address;
pub mod network;

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use sha3::{Digest, Sha3_256};

pub use address::Address;
pub use network::Network;

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 鍵のHexデコード・長さ不正
    #[error("鍵の形式が不正です: {0}")]
    InvalidKey(String),
    /// 公開鍵が曲線上の点として不正
    #[error("公開鍵が不正です")]
    InvalidPublicKey,
    /// 署名の形式が不正
    #[error("署名の形式が不正です: {0}")]
    InvalidSignature(String),
    /// Ed25519署名検証エラー
    #[error("Ed25519署名検証に失敗しました")]
    SignatureVerifyError,
    /// アドレスの形式・チェックサムが不正
    #[error("アドレスが不正です: {0}")]
    InvalidAddress(String),
    /// 未知のネットワーク名
    #[error("未知のネットワークです: {0}")]
    UnknownNetwork(String),
    /// 起動時の自己診断に失敗
    #[error("鍵ペアの自己診断に失敗しました: {0}")]
    SelfCheck(String),
}

/// SHA3-256ハッシュ計算。
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// 32バイトのHex文字列をデコードする。
fn decode_hex_32(value: &str) -> Result<[u8; 32], CryptoError> {
    let bytes = hex::decode(value.trim())
        .map_err(|e| CryptoError::InvalidKey(format!("Hexデコードに失敗: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("32バイトの16進数である必要があります".to_string()))
}

// ---------------------------------------------------------------------------
// 公開鍵・署名
// ---------------------------------------------------------------------------

/// 32バイトのEd25519公開鍵。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// 生バイトから公開鍵を構築する。
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    /// 生バイトを返す。
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_32(s).map(PublicKey)
    }
}

/// 64バイトのEd25519署名。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// 未署名トランザクションに入る全ゼロ署名。
    pub const ZERO: Signature = Signature([0u8; 64]);

    /// 生バイトから署名を構築する。
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Signature(bytes)
    }

    /// 生バイトを返す。
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::ZERO
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CryptoError::InvalidSignature(format!("Hexデコードに失敗: {e}")))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("64バイトである必要があります".to_string())
        })?;
        Ok(Signature(arr))
    }
}

/// Ed25519による署名検証。
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
    let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| CryptoError::SignatureVerifyError)
}

// ---------------------------------------------------------------------------
// 鍵ペア
// ---------------------------------------------------------------------------

/// トランザクション署名用のEd25519鍵ペア。
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// 32バイトの秘密鍵から鍵ペアを構築する。
    pub fn from_private_key(private_key: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&private_key);
        let public_key = PublicKey(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key,
        }
    }

    /// 64文字のHex秘密鍵から鍵ペアを構築する。
    pub fn from_private_key_hex(private_key: &str) -> Result<Self, CryptoError> {
        decode_hex_32(private_key).map(Self::from_private_key)
    }

    /// 公開鍵を返す。
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// メッセージに署名する。
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// 鍵ペアが署名・検証に使えることを確認する。
    ///
    /// `expected_public_key` が与えられた場合、導出した公開鍵と一致することも確認する。
    /// 起動時に一度だけ呼び、失敗した場合は起動を中止する。
    pub fn self_check(&self, expected_public_key: Option<&PublicKey>) -> Result<(), CryptoError> {
        if let Some(expected) = expected_public_key {
            if expected != &self.public_key {
                return Err(CryptoError::SelfCheck(format!(
                    "秘密鍵から導出した公開鍵 {} が設定値 {} と一致しません",
                    self.public_key, expected
                )));
            }
        }

        let probe = sha3_256(b"symbol-tx-self-check");
        let signature = self.sign(&probe);
        verify(&self.public_key, &probe, &signature)
            .map_err(|e| CryptoError::SelfCheck(e.to_string()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_PRIVATE_KEY: &str =
        "33047CFD3ABA8E1B6FE047182F9B0118E2FA7E7D9E33865533AB582973F3B2A8";
    const ALICE_PUBLIC_KEY: &str =
        "ABC57E7B68FF6AA2E5F3D7E674D071697F00F1B377AE484C1EDBA3EEB29761B8";

    #[test]
    fn test_public_key_from_private_key() {
        let key_pair = KeyPair::from_private_key_hex(ALICE_PRIVATE_KEY).unwrap();
        assert_eq!(key_pair.public_key().to_string(), ALICE_PUBLIC_KEY);
    }

    #[test]
    fn test_private_key_hex_errors() {
        assert!(KeyPair::from_private_key_hex("zz").is_err());
        assert!(KeyPair::from_private_key_hex("00").is_err());
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let key_pair = KeyPair::from_private_key(rand::random());
        let message = b"transfer";
        let signature = key_pair.sign(message);

        assert!(verify(key_pair.public_key(), message, &signature).is_ok());
        assert!(verify(key_pair.public_key(), b"tampered", &signature).is_err());
    }

    /// 異なる公開鍵での検証は失敗する
    #[test]
    fn test_verify_wrong_key() {
        let key_pair = KeyPair::from_private_key(rand::random());
        let other = KeyPair::from_private_key(rand::random());
        let signature = key_pair.sign(b"data");

        assert!(verify(other.public_key(), b"data", &signature).is_err());
    }

    #[test]
    fn test_self_check() {
        let key_pair = KeyPair::from_private_key_hex(ALICE_PRIVATE_KEY).unwrap();
        let expected: PublicKey = ALICE_PUBLIC_KEY.parse().unwrap();
        assert!(key_pair.self_check(None).is_ok());
        assert!(key_pair.self_check(Some(&expected)).is_ok());

        let other = KeyPair::from_private_key(rand::random());
        let err = key_pair.self_check(Some(other.public_key())).unwrap_err();
        assert!(matches!(err, CryptoError::SelfCheck(_)));
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let key_pair = KeyPair::from_private_key(rand::random());
        let signature = key_pair.sign(b"x");
        let parsed: Signature = signature.to_string().parse().unwrap();
        assert_eq!(parsed, signature);
        assert!("00".parse::<Signature>().is_err());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key_pair = KeyPair::from_private_key_hex(ALICE_PRIVATE_KEY).unwrap();
        let debug = format!("{key_pair:?}");
        assert!(debug.contains(ALICE_PUBLIC_KEY));
        assert!(!debug.contains(ALICE_PRIVATE_KEY));
    }

    #[test]
    fn test_sha3_256_empty() {
        assert_eq!(
            hex::encode(sha3_256(b"")),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }
}
