//! サブコマンドの実装。

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use symbol_tx_crypto::{Address, KeyPair, Network, PublicKey};
use symbol_tx_gateway::endpoints::handle_event;
use symbol_tx_gateway::response::IDEMPOTENCY_KEY_HEADER;
use symbol_tx_gateway::{ApiConfig, AppState};
use symbol_tx_stack::{synthesize, StackProps};
use symbol_tx_types::{ProxyEvent, TransactionRequest};

// ---------------------------------------------------------------------------
// synth
// ---------------------------------------------------------------------------

pub fn synth(out_dir: &Path) -> anyhow::Result<()> {
    let props = StackProps::from_env()?;
    let output = synthesize(&props, out_dir)?;

    println!("スタック: {} ({})", output.manifest.stack_name, output.manifest.environment);
    println!("テンプレート: {}", output.template_path.display());
    println!("マニフェスト: {}", output.manifest_path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// invoke
// ---------------------------------------------------------------------------

pub async fn invoke(
    event_file: Option<&Path>,
    message: Option<String>,
    idempotency_key: Option<String>,
) -> anyhow::Result<()> {
    let event = match event_file {
        Some(path) => load_event(path)?,
        None => build_event(message)?,
    };
    let event = match idempotency_key {
        Some(key) => with_header(event, IDEMPOTENCY_KEY_HEADER, &key),
        None => event,
    };

    let config = ApiConfig::from_env()?;
    let state = AppState::new(config)?;

    let response = handle_event(&state, event).await;
    println!("テスト結果: {}", serde_json::to_string_pretty(&response)?);

    if response.status_code >= 400 {
        anyhow::bail!("ハンドラがHTTP {}を返しました", response.status_code);
    }
    Ok(())
}

/// JSONファイルからプロキシイベントを読み込む。
pub fn load_event(path: &Path) -> anyhow::Result<ProxyEvent> {
    tracing::debug!(path = %path.display(), "イベントファイルを読み込みます");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("イベントファイルを読み込めません: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("イベントファイルの形式が不正です: {}", path.display()))
}

/// API Gatewayと同じ形の `POST /transaction` イベントを組み立てる。
pub fn build_event(message: Option<String>) -> anyhow::Result<ProxyEvent> {
    let body = serde_json::to_string(&TransactionRequest { message })?;

    Ok(ProxyEvent {
        http_method: Some("POST".to_string()),
        path: Some("/transaction".to_string()),
        headers: Some(HashMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )])),
        body: Some(serde_json::Value::String(body)),
        is_base64_encoded: false,
    })
}

fn with_header(mut event: ProxyEvent, name: &str, value: &str) -> ProxyEvent {
    event
        .headers
        .get_or_insert_with(HashMap::new)
        .insert(name.to_string(), value.to_string());
    event
}

// ---------------------------------------------------------------------------
// address
// ---------------------------------------------------------------------------

pub fn address(public_key: Option<&str>, private_key: Option<&str>, network: &str) -> anyhow::Result<()> {
    let network: Network = network.parse()?;
    let (public_key, address) = derive_address(public_key, private_key, network)?;

    println!("ネットワーク: {network}");
    println!("公開鍵: {public_key}");
    println!("アドレス: {address}");
    Ok(())
}

/// 公開鍵（または秘密鍵から導出した公開鍵）とアドレスを返す。
pub fn derive_address(
    public_key: Option<&str>,
    private_key: Option<&str>,
    network: Network,
) -> anyhow::Result<(PublicKey, Address)> {
    let public_key = match (public_key, private_key) {
        (Some(hex), _) => hex.parse::<PublicKey>()?,
        (None, Some(hex)) => *KeyPair::from_private_key_hex(hex)?.public_key(),
        (None, None) => anyhow::bail!("--public-key か --private-key を指定してください"),
    };
    let address = Address::from_public_key(network, &public_key);
    Ok((public_key, address))
}
