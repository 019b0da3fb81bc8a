//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとハンドラの共有状態の定義。
//! 設定は起動時に一度だけ読み込み、不正な値は起動エラーにする。

use std::time::Duration;

use symbol_tx_crypto::{Address, KeyPair, Network, PublicKey};

use crate::error::GatewayError;
use crate::idempotency::IdempotencyCache;
use crate::idempotency::DEFAULT_MAX_ENTRIES;
use crate::node_client::{HttpNodeClient, NodeClient, RetryPolicy, DEFAULT_ANNOUNCE_DEADLINE_MS};

/// 設定読み込みのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("環境変数 {0} が設定されていません")]
    Missing(&'static str),
    /// 環境変数の値が不正
    #[error("環境変数 {name} の値が不正です: {reason}")]
    Invalid {
        /// 環境変数名
        name: &'static str,
        /// 理由
        reason: String,
    },
}

/// 転送トランザクションの内容に関する設定。
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// ネットワーク
    pub network: Network,
    /// 受取人アドレス
    pub recipient: Address,
    /// 転送するモザイクID
    pub mosaic_id: u64,
    /// 転送量（最小単位）
    pub amount: u64,
    /// 手数料乗数（1バイトあたりの手数料）
    pub fee_multiplier: u32,
    /// 現在時刻から期限までの時間
    pub deadline: Duration,
}

/// ノードへのアナウンスに関する設定。
#[derive(Debug, Clone)]
pub struct AnnounceSettings {
    /// ノードのベースURL
    pub node_url: String,
    /// 再試行ポリシー
    pub retry: RetryPolicy,
    /// 1回の送信のタイムアウト
    pub timeout: Duration,
}

/// Gatewayの設定。
#[derive(Debug)]
pub struct ApiConfig {
    /// 署名用鍵ペア
    pub signer: KeyPair,
    /// 起動時に照合する公開鍵（任意）
    pub expected_signer_public_key: Option<PublicKey>,
    /// 転送内容
    pub transfer: TransferSettings,
    /// アナウンス
    pub announce: AnnounceSettings,
    /// Idempotency-Keyの保持期間
    pub idempotency_ttl: Duration,
    /// Idempotency-Keyの最大保持数
    pub idempotency_max_entries: usize,
    /// ローカルサーバーのリッスンアドレス
    pub listen_addr: String,
}

/// デフォルトのアナウンス先ノード
pub const DEFAULT_NODE_URL: &str = "http://sym-test-03.opening-line.jp:3000";
/// デフォルトの転送量（1 XYM）
pub const DEFAULT_TRANSFER_AMOUNT: u64 = 1_000_000;
/// デフォルトの手数料乗数
pub const DEFAULT_FEE_MULTIPLIER: u32 = 100;
/// デフォルトの1回の送信のタイムアウト（秒）
pub const DEFAULT_ANNOUNCE_TIMEOUT_SECS: u64 = 8;
/// API Gatewayの統合タイムアウト（ミリ秒）。アナウンス全体の期限はこれより短くなければならない。
pub const INTEGRATION_TIMEOUT_MS: u64 = 29_000;

impl ApiConfig {
    /// プロセスの環境変数から設定を読み込む。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意のキー/値ルックアップから設定を読み込む。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let network: Network = match get("SYMBOL_NETWORK") {
            Some(v) => v.parse().map_err(|e: symbol_tx_crypto::CryptoError| {
                ConfigError::Invalid {
                    name: "SYMBOL_NETWORK",
                    reason: e.to_string(),
                }
            })?,
            None => Network::Testnet,
        };

        let private_key = get("SIGNER_PRIVATE_KEY").ok_or(ConfigError::Missing("SIGNER_PRIVATE_KEY"))?;
        let signer = KeyPair::from_private_key_hex(&private_key).map_err(|e| ConfigError::Invalid {
            name: "SIGNER_PRIVATE_KEY",
            reason: e.to_string(),
        })?;

        let expected_signer_public_key = get("SIGNER_PUBLIC_KEY")
            .map(|v| {
                v.parse::<PublicKey>().map_err(|e| ConfigError::Invalid {
                    name: "SIGNER_PUBLIC_KEY",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let recipient_raw = get("RECIPIENT_ADDRESS").ok_or(ConfigError::Missing("RECIPIENT_ADDRESS"))?;
        let recipient: Address = recipient_raw.parse().map_err(|e: symbol_tx_crypto::CryptoError| {
            ConfigError::Invalid {
                name: "RECIPIENT_ADDRESS",
                reason: e.to_string(),
            }
        })?;
        if recipient.network() != Some(network) {
            return Err(ConfigError::Invalid {
                name: "RECIPIENT_ADDRESS",
                reason: format!("{network} のアドレスではありません"),
            });
        }

        let mosaic_id = match get("MOSAIC_ID") {
            Some(v) => u64::from_str_radix(v.trim().trim_start_matches("0x"), 16).map_err(|e| {
                ConfigError::Invalid {
                    name: "MOSAIC_ID",
                    reason: e.to_string(),
                }
            })?,
            None => network.currency_mosaic_id(),
        };

        let amount = parse_or(&get, "TRANSFER_AMOUNT", DEFAULT_TRANSFER_AMOUNT)?;
        let fee_multiplier = parse_or(&get, "FEE_MULTIPLIER", DEFAULT_FEE_MULTIPLIER)?;
        let deadline_hours: u64 = parse_or(&get, "DEADLINE_HOURS", 2)?;
        if deadline_hours == 0 || deadline_hours > 24 {
            return Err(ConfigError::Invalid {
                name: "DEADLINE_HOURS",
                reason: "1〜24の範囲である必要があります".to_string(),
            });
        }

        let node_url = get("NODE_URL")
            .unwrap_or_else(|| DEFAULT_NODE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(node_url.starts_with("http://") || node_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "NODE_URL",
                reason: "http:// または https:// で始まる必要があります".to_string(),
            });
        }

        let max_attempts: u32 = parse_or(&get, "ANNOUNCE_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "ANNOUNCE_MAX_ATTEMPTS",
                reason: "1以上である必要があります".to_string(),
            });
        }
        let deadline_ms: u64 = parse_or(&get, "ANNOUNCE_DEADLINE_MS", DEFAULT_ANNOUNCE_DEADLINE_MS)?;
        if deadline_ms == 0 || deadline_ms >= INTEGRATION_TIMEOUT_MS {
            return Err(ConfigError::Invalid {
                name: "ANNOUNCE_DEADLINE_MS",
                reason: format!("1〜{}の範囲である必要があります", INTEGRATION_TIMEOUT_MS - 1),
            });
        }
        let retry = RetryPolicy {
            max_attempts,
            base_delay_ms: parse_or(&get, "ANNOUNCE_BACKOFF_BASE_MS", 200)?,
            max_delay_ms: parse_or(&get, "ANNOUNCE_BACKOFF_MAX_MS", 2000)?,
            deadline: Duration::from_millis(deadline_ms),
        };
        let timeout_secs: u64 = parse_or(&get, "ANNOUNCE_TIMEOUT_SECS", DEFAULT_ANNOUNCE_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "ANNOUNCE_TIMEOUT_SECS",
                reason: "1以上である必要があります".to_string(),
            });
        }
        let idempotency_ttl_secs: u64 = parse_or(&get, "IDEMPOTENCY_TTL_SECS", 2 * 60 * 60)?;
        let idempotency_max_entries: usize =
            parse_or(&get, "IDEMPOTENCY_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?;
        if idempotency_max_entries == 0 {
            return Err(ConfigError::Invalid {
                name: "IDEMPOTENCY_MAX_ENTRIES",
                reason: "1以上である必要があります".to_string(),
            });
        }

        Ok(Self {
            signer,
            expected_signer_public_key,
            transfer: TransferSettings {
                network,
                recipient,
                mosaic_id,
                amount,
                fee_multiplier,
                deadline: Duration::from_secs(deadline_hours * 60 * 60),
            },
            announce: AnnounceSettings {
                node_url,
                retry,
                timeout: Duration::from_secs(timeout_secs),
            },
            idempotency_ttl: Duration::from_secs(idempotency_ttl_secs),
            idempotency_max_entries,
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }
}

/// 数値の環境変数を読む。未設定ならデフォルト値。
fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// ハンドラの共有状態。
pub struct AppState {
    /// 設定
    pub config: ApiConfig,
    /// アナウンス先ノードのクライアント
    pub node: Box<dyn NodeClient>,
    /// Idempotency-Keyごとの処理結果
    pub idempotency: IdempotencyCache,
}

impl AppState {
    /// 設定からHTTPノードクライアントを構築し、共有状態を作る。
    pub fn new(config: ApiConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.announce.timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("HTTPクライアントの構築に失敗: {e}")))?;
        let node = HttpNodeClient::new(
            http_client,
            config.announce.node_url.clone(),
            config.announce.retry.clone(),
        );
        Self::with_node_client(config, Box::new(node))
    }

    /// 任意のノードクライアントで共有状態を作る。
    ///
    /// 署名鍵の自己診断をここで行い、失敗した場合は状態を作らない。
    pub fn with_node_client(config: ApiConfig, node: Box<dyn NodeClient>) -> Result<Self, GatewayError> {
        config
            .signer
            .self_check(config.expected_signer_public_key.as_ref())
            .map_err(|e| GatewayError::Startup(e.to_string()))?;

        tracing::info!(
            network = %config.transfer.network,
            signer = %config.signer.public_key(),
            signer_address = %Address::from_public_key(config.transfer.network, config.signer.public_key()),
            recipient = %config.transfer.recipient,
            node_url = %config.announce.node_url,
            "署名鍵の自己診断に成功しました"
        );

        let idempotency = IdempotencyCache::new(config.idempotency_ttl, config.idempotency_max_entries);
        Ok(Self {
            config,
            node,
            idempotency,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const ALICE_PRIVATE_KEY: &str =
        "33047CFD3ABA8E1B6FE047182F9B0118E2FA7E7D9E33865533AB582973F3B2A8";
    const ALICE_PUBLIC_KEY: &str =
        "ABC57E7B68FF6AA2E5F3D7E674D071697F00F1B377AE484C1EDBA3EEB29761B8";
    const BOB_ADDRESS: &str = "TCSMJNJTRI76YPGQFDEZBFL3XTM4L3AWELOGBDY";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SIGNER_PRIVATE_KEY", ALICE_PRIVATE_KEY),
            ("RECIPIENT_ADDRESS", BOB_ADDRESS),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&required())).unwrap();

        assert_eq!(config.signer.public_key().to_string(), ALICE_PUBLIC_KEY);
        assert_eq!(config.transfer.network, Network::Testnet);
        assert_eq!(config.transfer.recipient.to_string(), BOB_ADDRESS);
        assert_eq!(config.transfer.mosaic_id, Network::Testnet.currency_mosaic_id());
        assert_eq!(config.transfer.amount, DEFAULT_TRANSFER_AMOUNT);
        assert_eq!(config.transfer.fee_multiplier, DEFAULT_FEE_MULTIPLIER);
        assert_eq!(config.transfer.deadline, Duration::from_secs(7200));
        assert_eq!(config.announce.node_url, DEFAULT_NODE_URL);
        assert_eq!(config.announce.retry.max_attempts, 3);
        assert_eq!(config.announce.timeout, Duration::from_secs(DEFAULT_ANNOUNCE_TIMEOUT_SECS));
        assert_eq!(config.idempotency_max_entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        // 再試行を含めてもAPI Gatewayより先に500を返せる
        assert!(config.announce.retry.deadline < Duration::from_millis(INTEGRATION_TIMEOUT_MS));
    }

    #[test]
    fn test_overrides() {
        let mut vars = required();
        vars.extend([
            ("NODE_URL", "https://node.example:3001/"),
            ("MOSAIC_ID", "0x00000000000000AB"),
            ("TRANSFER_AMOUNT", "42"),
            ("FEE_MULTIPLIER", "25"),
            ("DEADLINE_HOURS", "1"),
            ("ANNOUNCE_MAX_ATTEMPTS", "5"),
            ("ANNOUNCE_DEADLINE_MS", "15000"),
            ("IDEMPOTENCY_MAX_ENTRIES", "10"),
            ("SIGNER_PUBLIC_KEY", ALICE_PUBLIC_KEY),
        ]);
        let config = ApiConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.announce.node_url, "https://node.example:3001");
        assert_eq!(config.transfer.mosaic_id, 0xAB);
        assert_eq!(config.transfer.amount, 42);
        assert_eq!(config.transfer.fee_multiplier, 25);
        assert_eq!(config.transfer.deadline, Duration::from_secs(3600));
        assert_eq!(config.announce.retry.max_attempts, 5);
        assert_eq!(config.announce.retry.deadline, Duration::from_millis(15_000));
        assert_eq!(config.idempotency_max_entries, 10);
        assert!(config.expected_signer_public_key.is_some());
    }

    #[test]
    fn test_missing_required() {
        let err = ApiConfig::from_lookup(lookup(&[("RECIPIENT_ADDRESS", BOB_ADDRESS)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SIGNER_PRIVATE_KEY")));

        let err =
            ApiConfig::from_lookup(lookup(&[("SIGNER_PRIVATE_KEY", ALICE_PRIVATE_KEY)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RECIPIENT_ADDRESS")));
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("SYMBOL_NETWORK", "devnet"),
            ("TRANSFER_AMOUNT", "-1"),
            ("FEE_MULTIPLIER", "abc"),
            ("DEADLINE_HOURS", "0"),
            ("NODE_URL", "ftp://node"),
            ("ANNOUNCE_MAX_ATTEMPTS", "0"),
            ("ANNOUNCE_DEADLINE_MS", "29000"),
            ("ANNOUNCE_DEADLINE_MS", "0"),
            ("ANNOUNCE_TIMEOUT_SECS", "0"),
            ("IDEMPOTENCY_MAX_ENTRIES", "0"),
            ("SIGNER_PUBLIC_KEY", "XYZ"),
        ] {
            let mut vars = required();
            vars.push((name, value));
            let err = ApiConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: n, .. } if n == name),
                "{name}={value} が拒否されなかった: {err:?}"
            );
        }
    }

    /// mainnet設定でtestnetアドレスを指定すると拒否される
    #[test]
    fn test_recipient_network_mismatch() {
        let mut vars = required();
        vars.push(("SYMBOL_NETWORK", "mainnet"));
        let err = ApiConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RECIPIENT_ADDRESS", .. }));
    }

    /// 公開鍵が一致しない場合、共有状態の構築（起動）に失敗する
    #[test]
    fn test_startup_fails_on_public_key_mismatch() {
        let mut vars = required();
        vars.push((
            "SIGNER_PUBLIC_KEY",
            "11DF928F12E742AEE9DE9BE813A1AA7D7C3AABE0512E530AFE39C82CE33FFABF",
        ));
        let config = ApiConfig::from_lookup(lookup(&vars)).unwrap();
        let result = AppState::new(config);
        assert!(matches!(result, Err(GatewayError::Startup(_))));
    }
}
