//! 転送トランザクションのモデルとバイナリコーデック。
//!
//! ## レイアウト（リトルエンディアン）
//! ```text
//! size u32 | reserved u32 | signature [64] | signer_public_key [32] | reserved u32
//! version u8 | network u8 | type u16 | fee u64 | deadline u64
//! recipient_address [24] | message_size u16 | mosaics_count u8 | reserved u32 | reserved u8
//! mosaics [(mosaic_id u64, amount u64); mosaics_count] | message [message_size]
//! ```
//! 署名対象は `generation_hash_seed || bytes[108..]`、
//! ハッシュは `SHA3-256(signature || signer_public_key || generation_hash_seed || bytes[108..])`。

use std::io::{Cursor, Read};
use std::time::Duration;

use symbol_tx_crypto::{sha3_256, Address, KeyPair, Network, PublicKey, Signature};
use symbol_tx_types::{AnnouncePayload, MosaicJson, TransactionJson};

use crate::message::Message;
use crate::CodecError;

/// 転送トランザクションの種別
pub const TRANSFER_TRANSACTION_TYPE: u16 = 0x4154;
/// 転送トランザクションのバージョン
pub const TRANSFER_TRANSACTION_VERSION: u8 = 1;

/// 署名・ハッシュ計算で除外するヘッダ部分のサイズ。
/// size(4) + reserved(4) + signature(64) + signer_public_key(32) + reserved(4)
pub const TRANSACTION_HEADER_SIZE: usize = 4 + 4 + 64 + 32 + 4;

/// トランザクション共通部分のサイズ（ヘッダ + version/network/type/fee/deadline）
const TRANSACTION_BASE_SIZE: usize = TRANSACTION_HEADER_SIZE + 1 + 1 + 2 + 8 + 8;
/// 転送ボディの固定長部分
const TRANSFER_BODY_FIXED_SIZE: usize = 24 + 2 + 1 + 4 + 1;
/// モザイク1件のサイズ
const MOSAIC_SIZE: usize = 8 + 8;

/// 転送するモザイク。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mosaic {
    /// モザイクID
    pub id: u64,
    /// 数量（最小単位）
    pub amount: u64,
}

/// 期限を計算する。`now_unix_millis` から `offset` 後のネットワーク時刻を返す。
pub fn deadline_after(network: Network, now_unix_millis: u64, offset: Duration) -> u64 {
    let offset_millis = u64::try_from(offset.as_millis()).unwrap_or(u64::MAX);
    network.network_time_from_unix_millis(now_unix_millis.saturating_add(offset_millis))
}

/// 転送トランザクション。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTransaction {
    /// 署名。未署名時は全ゼロ。
    pub signature: Signature,
    /// 署名者の公開鍵
    pub signer_public_key: PublicKey,
    /// ネットワーク
    pub network: Network,
    /// 手数料（最小単位）
    pub fee: u64,
    /// 期限（ネットワーク時刻、ミリ秒）
    pub deadline: u64,
    /// 受取人アドレス
    pub recipient_address: Address,
    /// 転送するモザイク
    pub mosaics: Vec<Mosaic>,
    /// 添付メッセージ
    pub message: Message,
}

impl TransferTransaction {
    /// 未署名・手数料0の転送トランザクションを構築する。
    pub fn new(
        network: Network,
        signer_public_key: PublicKey,
        recipient_address: Address,
        mosaics: Vec<Mosaic>,
        message: Message,
        deadline: u64,
    ) -> Self {
        Self {
            signature: Signature::ZERO,
            signer_public_key,
            network,
            fee: 0,
            deadline,
            recipient_address,
            mosaics,
            message,
        }
    }

    /// シリアライズ後のバイト長。
    pub fn size(&self) -> usize {
        TRANSACTION_BASE_SIZE
            + TRANSFER_BODY_FIXED_SIZE
            + self.mosaics.len() * MOSAIC_SIZE
            + self.message.len()
    }

    /// 手数料を `size × fee_multiplier` に設定し、その値を返す。
    pub fn apply_fee_multiplier(&mut self, fee_multiplier: u32) -> Result<u64, CodecError> {
        let fee = (self.size() as u64)
            .checked_mul(u64::from(fee_multiplier))
            .ok_or(CodecError::FeeOverflow)?;
        self.fee = fee;
        Ok(fee)
    }

    /// トランザクション全体をシリアライズする。
    /// モザイクはID昇順に並べて書き出す。
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let message_size = u16::try_from(self.message.len())
            .map_err(|_| CodecError::MessageTooLarge(self.message.len()))?;
        let mosaics_count = u8::try_from(self.mosaics.len())
            .map_err(|_| CodecError::TooManyMosaics(self.mosaics.len()))?;
        let size = u32::try_from(self.size())
            .map_err(|_| CodecError::InvalidField(format!("サイズが大きすぎます: {}", self.size())))?;

        let mut mosaics = self.mosaics.clone();
        mosaics.sort_by_key(|m| m.id);

        let mut buf = Vec::with_capacity(self.size());
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(self.signature.as_bytes());
        buf.extend_from_slice(self.signer_public_key.as_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.push(TRANSFER_TRANSACTION_VERSION);
        buf.push(self.network.identifier());
        buf.extend_from_slice(&TRANSFER_TRANSACTION_TYPE.to_le_bytes());
        buf.extend_from_slice(&self.fee.to_le_bytes());
        buf.extend_from_slice(&self.deadline.to_le_bytes());

        buf.extend_from_slice(self.recipient_address.as_bytes());
        buf.extend_from_slice(&message_size.to_le_bytes());
        buf.push(mosaics_count);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.push(0);
        for mosaic in &mosaics {
            buf.extend_from_slice(&mosaic.id.to_le_bytes());
            buf.extend_from_slice(&mosaic.amount.to_le_bytes());
        }
        buf.extend_from_slice(self.message.as_bytes());

        debug_assert_eq!(buf.len(), self.size());
        Ok(buf)
    }

    /// 署名対象データ（`generation_hash_seed || ヘッダ以降`）。
    pub fn signing_data(&self) -> Result<Vec<u8>, CodecError> {
        let bytes = self.serialize()?;
        let seed = self.network.generation_hash_seed();
        let mut data = Vec::with_capacity(seed.len() + bytes.len() - TRANSACTION_HEADER_SIZE);
        data.extend_from_slice(&seed);
        data.extend_from_slice(&bytes[TRANSACTION_HEADER_SIZE..]);
        Ok(data)
    }

    /// 鍵ペアで署名し、署名フィールドを更新する。
    /// 鍵ペアの公開鍵が `signer_public_key` と一致しない場合はエラー。
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), CodecError> {
        if key_pair.public_key() != &self.signer_public_key {
            return Err(CodecError::SignerMismatch);
        }
        let data = self.signing_data()?;
        self.signature = key_pair.sign(&data);
        Ok(())
    }

    /// 署名を検証する。
    pub fn verify_signature(&self) -> Result<(), CodecError> {
        let data = self.signing_data()?;
        symbol_tx_crypto::verify(&self.signer_public_key, &data, &self.signature)?;
        Ok(())
    }

    /// トランザクションハッシュ（SHA3-256）。
    pub fn hash(&self) -> Result<[u8; 32], CodecError> {
        let bytes = self.serialize()?;
        let seed = self.network.generation_hash_seed();
        let mut data = Vec::with_capacity(64 + 32 + 32 + bytes.len() - TRANSACTION_HEADER_SIZE);
        data.extend_from_slice(self.signature.as_bytes());
        data.extend_from_slice(self.signer_public_key.as_bytes());
        data.extend_from_slice(&seed);
        data.extend_from_slice(&bytes[TRANSACTION_HEADER_SIZE..]);
        Ok(sha3_256(&data))
    }

    /// ノードへアナウンスするペイロード（全体の大文字Hex）。
    pub fn announce_payload(&self) -> Result<AnnouncePayload, CodecError> {
        Ok(AnnouncePayload {
            payload: hex::encode_upper(self.serialize()?),
        })
    }

    /// JSON表現を構築する。
    pub fn to_json(&self) -> Result<TransactionJson, CodecError> {
        let size = u32::try_from(self.size())
            .map_err(|_| CodecError::InvalidField(format!("サイズが大きすぎます: {}", self.size())))?;
        let mut mosaics = self.mosaics.clone();
        mosaics.sort_by_key(|m| m.id);

        Ok(TransactionJson {
            hash: hex::encode_upper(self.hash()?),
            size,
            signature: self.signature.to_string(),
            signer_public_key: self.signer_public_key.to_string(),
            version: TRANSFER_TRANSACTION_VERSION,
            network: self.network.identifier(),
            transaction_type: TRANSFER_TRANSACTION_TYPE,
            fee: self.fee.to_string(),
            deadline: self.deadline.to_string(),
            recipient_address: self.recipient_address.to_string(),
            mosaics: mosaics
                .iter()
                .map(|m| MosaicJson {
                    mosaic_id: format!("{:016X}", m.id),
                    amount: m.amount.to_string(),
                })
                .collect(),
            message: hex::encode_upper(self.message.as_bytes()),
        })
    }

    /// シリアライズ済みバイト列からトランザクションを復元する。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Cursor::new(bytes);

        let size = read_u32(&mut reader, "size")? as usize;
        if size != bytes.len() {
            return Err(CodecError::InvalidField(format!(
                "sizeフィールド {} が実際の長さ {} と一致しません",
                size,
                bytes.len()
            )));
        }
        read_u32(&mut reader, "reserved")?;
        let signature = Signature::from_bytes(read_array(&mut reader, "signature")?);
        let signer_public_key = PublicKey::from_bytes(read_array(&mut reader, "signer_public_key")?);
        read_u32(&mut reader, "reserved")?;

        let [version] = read_array::<1>(&mut reader, "version")?;
        if version != TRANSFER_TRANSACTION_VERSION {
            return Err(CodecError::InvalidField(format!("未対応のバージョン: {version}")));
        }
        let [network_id] = read_array::<1>(&mut reader, "network")?;
        let network = Network::from_identifier(network_id)
            .ok_or_else(|| CodecError::InvalidField(format!("未知のネットワーク: 0x{network_id:02X}")))?;
        let transaction_type = u16::from_le_bytes(read_array(&mut reader, "type")?);
        if transaction_type != TRANSFER_TRANSACTION_TYPE {
            return Err(CodecError::InvalidField(format!(
                "転送トランザクションではありません: 0x{transaction_type:04X}"
            )));
        }
        let fee = read_u64(&mut reader, "fee")?;
        let deadline = read_u64(&mut reader, "deadline")?;

        let recipient_address = Address::from_bytes(read_array(&mut reader, "recipient_address")?)?;
        let message_size = u16::from_le_bytes(read_array(&mut reader, "message_size")?) as usize;
        let [mosaics_count] = read_array::<1>(&mut reader, "mosaics_count")?;
        read_u32(&mut reader, "reserved")?;
        read_array::<1>(&mut reader, "reserved")?;

        let mut mosaics = Vec::with_capacity(mosaics_count as usize);
        for _ in 0..mosaics_count {
            let id = read_u64(&mut reader, "mosaic_id")?;
            let amount = read_u64(&mut reader, "amount")?;
            mosaics.push(Mosaic { id, amount });
        }

        let mut message = vec![0u8; message_size];
        reader
            .read_exact(&mut message)
            .map_err(|_| CodecError::Truncated("message".to_string()))?;

        if reader.position() as usize != bytes.len() {
            return Err(CodecError::InvalidField("末尾に余分なバイトがあります".to_string()));
        }

        Ok(Self {
            signature,
            signer_public_key,
            network,
            fee,
            deadline,
            recipient_address,
            mosaics,
            message: Message::from_raw(message)?,
        })
    }

    /// アナウンスペイロード（Hex）からトランザクションを復元する。
    pub fn from_payload(payload: &AnnouncePayload) -> Result<Self, CodecError> {
        let bytes = hex::decode(&payload.payload)
            .map_err(|e| CodecError::InvalidField(format!("ペイロードのHexデコードに失敗: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

fn read_array<const N: usize>(reader: &mut Cursor<&[u8]>, field: &str) -> Result<[u8; N], CodecError> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|_| CodecError::Truncated(field.to_string()))?;
    Ok(buf)
}

fn read_u32(reader: &mut Cursor<&[u8]>, field: &str) -> Result<u32, CodecError> {
    read_array(reader, field).map(u32::from_le_bytes)
}

fn read_u64(reader: &mut Cursor<&[u8]>, field: &str) -> Result<u64, CodecError> {
    read_array(reader, field).map(u64::from_le_bytes)
}

#[cfg(test)]
mod tests;
