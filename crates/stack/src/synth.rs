//! # 合成
//!
//! テンプレートとマニフェストを出力ディレクトリに書き出す。
//!
//! ```text
//! {out_dir}/
//!   {stack_name}.template.json
//!   manifest.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::props::StackProps;
use crate::stack::build_template;
use crate::template::Template;
use crate::StackError;

/// マニフェストのバージョン
pub const MANIFEST_VERSION: &str = "1";
/// マニフェストのファイル名
pub const MANIFEST_FILE: &str = "manifest.json";

/// 合成結果の目録。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub stack_name: String,
    /// `aws://{account}/{region}`
    pub environment: String,
    pub template_file: String,
    pub tags: BTreeMap<String, String>,
}

/// 合成の結果。
#[derive(Debug, Clone)]
pub struct SynthOutput {
    pub template: Template,
    pub manifest: Manifest,
    pub template_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// テンプレートのファイル名。
pub fn template_file_name(stack_name: &str) -> String {
    format!("{stack_name}.template.json")
}

/// スタックを合成し、`out_dir` に書き出す。ディレクトリが無ければ作る。
pub fn synthesize(props: &StackProps, out_dir: &Path) -> Result<SynthOutput, StackError> {
    let template = build_template(props)?;
    let manifest = Manifest {
        version: MANIFEST_VERSION.to_string(),
        stack_name: props.stack_name.clone(),
        environment: props.env.uri(),
        template_file: template_file_name(&props.stack_name),
        tags: props.tags.clone(),
    };

    std::fs::create_dir_all(out_dir)?;

    let template_path = out_dir.join(&manifest.template_file);
    std::fs::write(&template_path, template.to_json_pretty()?)?;

    let manifest_path = out_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    tracing::info!(
        stack = %manifest.stack_name,
        environment = %manifest.environment,
        resources = template.resources.len(),
        path = %template_path.display(),
        "スタックを合成しました"
    );

    Ok(SynthOutput {
        template,
        manifest,
        template_path,
        manifest_path,
    })
}
