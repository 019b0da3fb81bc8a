//! # CloudFormationテンプレート
//!
//! テンプレートの型と、`Ref` / `Fn::GetAtt` / `Fn::Sub` の組み立て。
//! リソースのプロパティはリソース種別ごとに形が異なるため `serde_json::Value` で持つ。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::StackError;

/// テンプレートのフォーマットバージョン
pub const FORMAT_VERSION: &str = "2010-09-09";

/// CloudFormationテンプレート。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    pub resources: BTreeMap<String, Resource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

/// テンプレートパラメータ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// 値をコンソールやAPIに表示しない
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_echo: bool,
}

impl Parameter {
    /// 文字列パラメータ。
    pub fn string(description: &str) -> Self {
        Self {
            parameter_type: "String".to_string(),
            description: Some(description.to_string()),
            default: None,
            allowed_values: Vec::new(),
            no_echo: false,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_allowed_values(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn secret(mut self) -> Self {
        self.no_echo = true;
        self
    }
}

/// テンプレートリソース。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, logical_ids: &[&str]) -> Self {
        self.depends_on = logical_ids.iter().map(|id| id.to_string()).collect();
        self
    }
}

/// テンプレート出力。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

/// スタック間で参照するための出力のエクスポート名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}

// ---------------------------------------------------------------------------
// 組み込み関数
// ---------------------------------------------------------------------------

/// `{"Ref": logical_id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Sub": template}`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// タグの配列 `[{"Key": .., "Value": ..}]`（キー順）。
pub fn tag_list(tags: &BTreeMap<String, String>) -> Value {
    Value::Array(
        tags.iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

impl Template {
    pub fn new(description: &str) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.to_string(),
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add_parameter(&mut self, logical_id: &str, parameter: Parameter) -> Result<(), StackError> {
        self.ensure_unique(logical_id)?;
        self.parameters.insert(logical_id.to_string(), parameter);
        Ok(())
    }

    pub fn add_resource(&mut self, logical_id: &str, resource: Resource) -> Result<(), StackError> {
        self.ensure_unique(logical_id)?;
        self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    pub fn add_output(&mut self, logical_id: &str, output: Output) -> Result<(), StackError> {
        if self.outputs.contains_key(logical_id) {
            return Err(StackError::InvalidProps(format!("出力IDが重複しています: {logical_id}")));
        }
        self.outputs.insert(logical_id.to_string(), output);
        Ok(())
    }

    /// 論理IDでリソースを取得する。
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// 指定した種別のリソースの論理ID。
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
    }

    fn ensure_unique(&self, logical_id: &str) -> Result<(), StackError> {
        let valid = !logical_id.is_empty() && logical_id.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(StackError::InvalidProps(format!(
                "論理IDは英数字のみ使用できます: {logical_id}"
            )));
        }
        if self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(StackError::InvalidProps(format!("論理IDが重複しています: {logical_id}")));
        }
        Ok(())
    }

    /// `Ref` / `Fn::GetAtt` / `Fn::Sub` / `DependsOn` の参照先がすべて存在するか検査する。
    /// `AWS::` で始まる疑似パラメータは常に存在するものとして扱う。
    pub fn validate_references(&self) -> Result<(), StackError> {
        let mut referenced = BTreeSet::new();
        for resource in self.resources.values() {
            collect_references(&resource.properties, &mut referenced);
            referenced.extend(resource.depends_on.iter().cloned());
        }
        for output in self.outputs.values() {
            collect_references(&output.value, &mut referenced);
        }

        let missing: Vec<String> = referenced
            .into_iter()
            .filter(|id| !id.starts_with("AWS::"))
            .filter(|id| !self.parameters.contains_key(id) && !self.resources.contains_key(id))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StackError::InvalidProps(format!(
                "存在しない論理IDを参照しています: {}",
                missing.join(", ")
            )))
        }
    }

    /// 整形済みJSON。
    pub fn to_json_pretty(&self) -> Result<String, StackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 値に含まれる参照先の論理IDを集める。
fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                out.insert(id.clone());
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(id)) = args.first() {
                    out.insert(id.clone());
                }
            }
            if let Some(Value::String(template)) = map.get("Fn::Sub") {
                out.extend(sub_variables(template));
            }
            for child in map.values() {
                collect_references(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

/// `Fn::Sub` の `${Name}` / `${Name.Attr}` から論理IDを取り出す。`${!Literal}` は除く。
fn sub_variables(template: &str) -> Vec<String> {
    let mut vars = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.starts_with('!') {
            let id = name.split('.').next().unwrap_or(name);
            vars.push(id.to_string());
        }
        rest = &after[end + 1..];
    }
    vars
}
