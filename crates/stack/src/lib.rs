//! # Symbol Transaction API スタック定義
//!
//! Lambda関数・REST API・実行ロール・呼び出し権限を宣言し、
//! CloudFormationテンプレート（JSON）として合成する。
//! 実際のデプロイはCloudFormation側のツールで行う。
//!
//! ## 構成
//! - [`props`]: スタック名・タグ・デプロイ先などのプロパティ
//! - [`template`]: テンプレートの型と組み込み関数
//! - [`stack`]: リソースの宣言
//! - [`synth`]: `template.json` / `manifest.json` の書き出し

pub mod props;
pub mod stack;
pub mod synth;
pub mod template;

pub use props::{DeployEnvironment, FunctionProps, StackProps};
pub use stack::build_template;
pub use synth::{synthesize, Manifest, SynthOutput};
pub use template::Template;

/// スタック定義のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// プロパティが不正
    #[error("スタックのプロパティが不正です: {0}")]
    InvalidProps(String),
    /// JSONへの変換に失敗
    #[error("テンプレートのシリアライズに失敗: {0}")]
    Serialize(#[from] serde_json::Error),
    /// ファイルの書き出しに失敗
    #[error("合成結果の書き出しに失敗: {0}")]
    Io(#[from] std::io::Error),
}
