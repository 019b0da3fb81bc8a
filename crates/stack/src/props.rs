//! # スタックプロパティ
//!
//! スタック名・説明・タグ・デプロイ先と、Lambda関数の実行設定。
//! デプロイ先は環境変数から読み込む。

use std::collections::BTreeMap;

use crate::StackError;

/// デフォルトのスタック名
pub const DEFAULT_STACK_NAME: &str = "SymbolTransactionStack";
/// デフォルトのスタックの説明
pub const DEFAULT_DESCRIPTION: &str = "Symbol Transaction API Stack";
/// デフォルトのリージョン
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// API Gatewayの統合タイムアウトの上限（ミリ秒）
pub const MAX_INTEGRATION_TIMEOUT_MS: u32 = 29_000;

/// デプロイ先のアカウントとリージョン。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployEnvironment {
    /// AWSアカウントID。未指定ならデプロイ時に解決される。
    pub account: Option<String>,
    /// リージョン
    pub region: String,
}

impl DeployEnvironment {
    /// `aws://{account}/{region}` 形式。アカウント未指定は `unknown-account`。
    pub fn uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region
        )
    }
}

impl Default for DeployEnvironment {
    fn default() -> Self {
        Self {
            account: None,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

/// Lambda関数の実行設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionProps {
    /// ランタイム（カスタムランタイム）
    pub runtime: String,
    /// ハンドラ名（カスタムランタイムでは実行ファイル名）
    pub handler: String,
    /// タイムアウト（秒）
    pub timeout_secs: u32,
    /// メモリサイズ（MB）
    pub memory_mb: u32,
    /// API Gateway統合のタイムアウト（ミリ秒）
    pub integration_timeout_ms: u32,
    /// 関数に渡す `RUST_LOG`
    pub log_filter: String,
}

impl Default for FunctionProps {
    fn default() -> Self {
        Self {
            runtime: "provided.al2023".to_string(),
            handler: "bootstrap".to_string(),
            timeout_secs: 30,
            memory_mb: 256,
            integration_timeout_ms: MAX_INTEGRATION_TIMEOUT_MS,
            log_filter: "info".to_string(),
        }
    }
}

/// スタック全体のプロパティ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackProps {
    pub stack_name: String,
    pub description: String,
    /// タグ付け可能な全リソースに付与するタグ
    pub tags: BTreeMap<String, String>,
    pub env: DeployEnvironment,
    pub function: FunctionProps,
}

impl Default for StackProps {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            tags: BTreeMap::from([
                ("Environment".to_string(), "prod".to_string()),
                ("Project".to_string(), "SymbolTransactionAPI".to_string()),
            ]),
            env: DeployEnvironment::default(),
            function: FunctionProps::default(),
        }
    }
}

impl StackProps {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> Result<Self, StackError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意のキー/値ルックアップから読み込む。
    ///
    /// - `STACK_NAME`: スタック名
    /// - `CDK_DEFAULT_ACCOUNT`: アカウントID
    /// - `STACK_REGION`: リージョン
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StackError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut props = Self::default();
        if let Some(name) = get("STACK_NAME") {
            props.stack_name = name;
        }
        props.env.account = get("CDK_DEFAULT_ACCOUNT");
        if let Some(region) = get("STACK_REGION") {
            props.env.region = region;
        }

        props.validate()?;
        Ok(props)
    }

    /// CloudFormationの制約を検査する。
    pub fn validate(&self) -> Result<(), StackError> {
        let name = &self.stack_name;
        let valid_name = name.len() <= 128
            && name.starts_with(|c: char| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid_name {
            return Err(StackError::InvalidProps(format!(
                "スタック名は英字で始まる128文字以内の英数字とハイフンである必要があります: {name}"
            )));
        }

        if let Some(account) = &self.env.account {
            if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                return Err(StackError::InvalidProps(format!(
                    "アカウントIDは12桁の数字である必要があります: {account}"
                )));
            }
        }

        let region = &self.env.region;
        if region.is_empty()
            || !region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(StackError::InvalidProps(format!("リージョンが不正です: {region}")));
        }

        let function = &self.function;
        if !(1..=900).contains(&function.timeout_secs) {
            return Err(StackError::InvalidProps(format!(
                "関数のタイムアウトは1〜900秒である必要があります: {}",
                function.timeout_secs
            )));
        }
        if !(128..=10_240).contains(&function.memory_mb) {
            return Err(StackError::InvalidProps(format!(
                "関数のメモリは128〜10240MBである必要があります: {}",
                function.memory_mb
            )));
        }
        if !(50..=MAX_INTEGRATION_TIMEOUT_MS).contains(&function.integration_timeout_ms) {
            return Err(StackError::InvalidProps(format!(
                "統合タイムアウトは50〜{MAX_INTEGRATION_TIMEOUT_MS}ミリ秒である必要があります: {}",
                function.integration_timeout_ms
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let props = StackProps::from_lookup(lookup(&[])).unwrap();

        assert_eq!(props.stack_name, "SymbolTransactionStack");
        assert_eq!(props.description, "Symbol Transaction API Stack");
        assert_eq!(props.tags["Environment"], "prod");
        assert_eq!(props.tags["Project"], "SymbolTransactionAPI");
        assert_eq!(props.env.uri(), "aws://unknown-account/ap-northeast-1");
        assert_eq!(props.function.runtime, "provided.al2023");
        assert_eq!(props.function.timeout_secs, 30);
        assert_eq!(props.function.memory_mb, 256);
    }

    #[test]
    fn test_env_overrides() {
        let props = StackProps::from_lookup(lookup(&[
            ("STACK_NAME", "Symbol-Staging"),
            ("CDK_DEFAULT_ACCOUNT", "123456789012"),
            ("STACK_REGION", "us-east-1"),
        ]))
        .unwrap();

        assert_eq!(props.stack_name, "Symbol-Staging");
        assert_eq!(props.env.uri(), "aws://123456789012/us-east-1");
    }

    #[test]
    fn test_invalid_props() {
        for vars in [
            vec![("STACK_NAME", "1stack")],
            vec![("STACK_NAME", "has_underscore")],
            vec![("CDK_DEFAULT_ACCOUNT", "12345")],
            vec![("STACK_REGION", "AP-NORTHEAST-1")],
        ] {
            let result = StackProps::from_lookup(lookup(&vars));
            assert!(matches!(result, Err(StackError::InvalidProps(_))), "{vars:?}");
        }

        let mut props = StackProps::default();
        props.function.integration_timeout_ms = 30_000;
        assert!(props.validate().is_err());
    }
}
