use std::time::Duration;

use symbol_tx_crypto::{Address, KeyPair, Network};

use super::*;
use crate::message::{Message, DEFAULT_MESSAGE};

const ALICE_PRIVATE_KEY: &str = "33047CFD3ABA8E1B6FE047182F9B0118E2FA7E7D9E33865533AB582973F3B2A8";
const BOB_ADDRESS: &str = "TCSMJNJTRI76YPGQFDEZBFL3XTM4L3AWELOGBDY";

/// Alice → Bob, 1 XYM, "Hello, Symbol!", deadline=1000000, 手数料乗数100 で署名済みのペイロード
const EXPECTED_PAYLOAD: &str = "BF0000000000000028502A9C9BBA7BBCD0555417B958E44C0F9001A94495056529D95FC91548B9484E6E347C3ED0E903B67ED1FF79A4773FE227F1CBA7EB574B1BD0C2AF641A1607ABC57E7B68FF6AA2E5F3D7E674D071697F00F1B377AE484C1EDBA3EEB29761B800000000019854419C4A00000000000040420F000000000098A4C4B5338A3FEC3CD028C990957BBCD9C5EC1622DC608F0F00010000000000CE8BA0672E21C07240420F00000000000048656C6C6F2C2053796D626F6C21";
const EXPECTED_SIGNATURE: &str = "28502A9C9BBA7BBCD0555417B958E44C0F9001A94495056529D95FC91548B9484E6E347C3ED0E903B67ED1FF79A4773FE227F1CBA7EB574B1BD0C2AF641A1607";
const EXPECTED_HASH: &str = "F986141F177364913C99F69F776408484048CC06D99F04812A04F5F419B90829";

fn alice() -> KeyPair {
    KeyPair::from_private_key_hex(ALICE_PRIVATE_KEY).unwrap()
}

fn build(key_pair: &KeyPair, text: &str) -> TransferTransaction {
    TransferTransaction::new(
        Network::Testnet,
        *key_pair.public_key(),
        BOB_ADDRESS.parse::<Address>().unwrap(),
        vec![Mosaic {
            id: Network::Testnet.currency_mosaic_id(),
            amount: 1_000_000,
        }],
        Message::plain(text),
        1_000_000,
    )
}

/// 既知のベクタと署名・ハッシュ・ペイロードが一致することを確認
#[test]
fn test_signed_transfer_matches_vector() {
    let key_pair = alice();
    let mut tx = build(&key_pair, DEFAULT_MESSAGE);

    assert_eq!(tx.size(), 191);
    assert_eq!(tx.apply_fee_multiplier(100).unwrap(), 19_100);

    tx.sign(&key_pair).unwrap();

    assert_eq!(tx.signature.to_string(), EXPECTED_SIGNATURE);
    assert_eq!(hex::encode_upper(tx.hash().unwrap()), EXPECTED_HASH);
    assert_eq!(tx.announce_payload().unwrap().payload, EXPECTED_PAYLOAD);
    assert!(tx.verify_signature().is_ok());
}

#[test]
fn test_serialized_length_matches_size() {
    let key_pair = alice();
    let long = "x".repeat(1000);
    for text in ["", "a", DEFAULT_MESSAGE, long.as_str()] {
        let tx = build(&key_pair, text);
        assert_eq!(tx.serialize().unwrap().len(), tx.size());
        assert_eq!(tx.size(), 160 + 16 + 1 + text.len());
    }
}

/// 手数料は常に size × 乗数
#[test]
fn test_fee_is_size_times_multiplier() {
    let key_pair = alice();
    for (len, multiplier) in [(0usize, 100u32), (10, 100), (300, 25), (1023, 1), (5, 0)] {
        let mut tx = build(&key_pair, &"m".repeat(len));
        let fee = tx.apply_fee_multiplier(multiplier).unwrap();
        assert_eq!(fee, tx.size() as u64 * u64::from(multiplier));
        assert_eq!(tx.fee, fee);
    }
}

#[test]
fn test_payload_roundtrip_keeps_message() {
    let key_pair = alice();
    let mut tx = build(&key_pair, "テスト送金");
    tx.apply_fee_multiplier(100).unwrap();
    tx.sign(&key_pair).unwrap();

    let decoded = TransferTransaction::from_payload(&tx.announce_payload().unwrap()).unwrap();
    assert_eq!(decoded, tx);
    assert_eq!(decoded.message.plain_text(), Some("テスト送金"));
    assert!(decoded.verify_signature().is_ok());
}

#[test]
fn test_sign_rejects_other_key() {
    let key_pair = alice();
    let other = KeyPair::from_private_key([7u8; 32]);
    let mut tx = build(&key_pair, "x");

    assert!(matches!(tx.sign(&other), Err(CodecError::SignerMismatch)));
}

/// 署名後に手数料を改変すると検証に失敗する
#[test]
fn test_tampered_fee_fails_verification() {
    let key_pair = alice();
    let mut tx = build(&key_pair, "x");
    tx.apply_fee_multiplier(100).unwrap();
    tx.sign(&key_pair).unwrap();

    tx.fee += 1;
    assert!(tx.verify_signature().is_err());
}

#[test]
fn test_mosaics_serialized_in_id_order() {
    let key_pair = alice();
    let mut tx = build(&key_pair, "");
    tx.mosaics = vec![
        Mosaic { id: 0x20, amount: 2 },
        Mosaic { id: 0x10, amount: 1 },
    ];
    let bytes = tx.serialize().unwrap();
    let first_id = u64::from_le_bytes(bytes[160..168].try_into().unwrap());
    assert_eq!(first_id, 0x10);

    let json = tx.to_json().unwrap();
    assert_eq!(json.mosaics[0].mosaic_id, "0000000000000010");
}

#[test]
fn test_from_bytes_rejects_truncated() {
    let key_pair = alice();
    let bytes = build(&key_pair, "truncate me").serialize().unwrap();

    assert!(TransferTransaction::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    assert!(matches!(
        TransferTransaction::from_bytes(&bytes[..10]),
        Err(CodecError::InvalidField(_))
    ));
    assert!(matches!(
        TransferTransaction::from_bytes(&bytes[..2]),
        Err(CodecError::Truncated(_))
    ));
}

#[test]
fn test_to_json_fields() {
    let key_pair = alice();
    let mut tx = build(&key_pair, DEFAULT_MESSAGE);
    tx.apply_fee_multiplier(100).unwrap();
    tx.sign(&key_pair).unwrap();

    let json = tx.to_json().unwrap();
    assert_eq!(json.hash, EXPECTED_HASH);
    assert_eq!(json.size, 191);
    assert_eq!(json.fee, "19100");
    assert_eq!(json.deadline, "1000000");
    assert_eq!(json.network, 0x98);
    assert_eq!(json.transaction_type, TRANSFER_TRANSACTION_TYPE);
    assert_eq!(json.recipient_address, BOB_ADDRESS);
    assert_eq!(json.mosaics[0].mosaic_id, "72C0212E67A08BCE");
    assert_eq!(json.message, "0048656C6C6F2C2053796D626F6C21");

    // レスポンスに載る形（u64は文字列、キーはcamelCase）
    let value = serde_json::to_value(&json).unwrap();
    assert_eq!(value["type"], TRANSFER_TRANSACTION_TYPE);
    assert_eq!(value["signerPublicKey"], json.signer_public_key);
    assert_eq!(value["recipientAddress"], BOB_ADDRESS);
    assert_eq!(value["fee"], "19100");
    assert_eq!(
        value["mosaics"],
        serde_json::json!([{"mosaicId": "72C0212E67A08BCE", "amount": json.mosaics[0].amount}])
    );
}

#[test]
fn test_deadline_after() {
    let network = Network::Testnet;
    let now = network.epoch_unix_millis() + 5_000;
    assert_eq!(
        deadline_after(network, now, Duration::from_secs(2 * 60 * 60)),
        5_000 + 7_200_000
    );
}
