use crate::edn_decode::{self, DecodingError};
use crate::error::ConfigError;
use crate::store::{Column, OrderBy};
use edn_format as edn;
use std::collections::BTreeMap;

/// What the forest importer does with a node whose parent reference does
/// not resolve inside the batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DanglingPolicy {
    /// Skip the node and its subtree, logging what was skipped.
    Drop,
    /// Refuse the whole import before touching the tree.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// External parent id that means "attach under the import target", in
    /// addition to a missing parent.
    pub root_sentinel: Option<u64>,
    pub dangling: DanglingPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            root_sentinel: Some(0),
            dangling: DanglingPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Order used when a caller passes no explicit sort keys.
    pub default_order: Vec<OrderBy>,
    pub import: ImportConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            default_order: vec![OrderBy::asc(Column::Left)],
            import: ImportConfig::default(),
        }
    }
}

fn invalid(key: &str, err: DecodingError) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_owned(),
        reason: err.0,
    }
}

fn reject_unknown(
    entries: &BTreeMap<String, &edn::Value>,
    known: &[&str],
) -> Result<(), ConfigError> {
    match entries.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(ConfigError::Invalid {
            key: key.clone(),
            reason: "unknown configuration key".to_owned(),
        }),
        None => Ok(()),
    }
}

fn decode_order(value: &edn::Value) -> Result<Vec<OrderBy>, ConfigError> {
    match value {
        edn::Value::String(spec) => OrderBy::parse(spec),
        edn::Value::Keyword(k) => OrderBy::parse(&edn_decode::qualified_name(k)),
        edn::Value::Vector(_) | edn::Value::List(_) => {
            let as_name = |v: &edn::Value| -> Result<String, DecodingError> {
                let from_keyword = |v: &edn::Value| edn_decode::keyword(v).map(edn_decode::qualified_name);
                let from_string = |v: &edn::Value| edn_decode::string(v).map(|s| s.to_owned());
                edn_decode::one_of(v, &from_keyword, &from_string)
            };
            let names = edn_decode::vector(value, &as_name).map_err(|e| invalid("order-by", e))?;
            OrderBy::parse(&names.join(","))
        }
        other => Err(invalid(
            "order-by",
            DecodingError::expected("a string, keyword or vector of sort keys", other),
        )),
    }
}

fn decode_dangling(value: &edn::Value) -> Result<DanglingPolicy, ConfigError> {
    let keyword = edn_decode::keyword(value).map_err(|e| invalid("import/dangling", e))?;
    match keyword.name() {
        "drop" => Ok(DanglingPolicy::Drop),
        "fail" => Ok(DanglingPolicy::Fail),
        other => Err(ConfigError::Invalid {
            key: "import/dangling".to_owned(),
            reason: format!("expected :drop or :fail, got :{}", other),
        }),
    }
}

fn decode_import(value: &edn::Value) -> Result<ImportConfig, ConfigError> {
    let entries = edn_decode::keyword_map(value).map_err(|e| invalid("import", e))?;
    reject_unknown(&entries, &["root-sentinel", "dangling"])?;
    let mut config = ImportConfig::default();
    if let Some(value) = entries.get("root-sentinel") {
        config.root_sentinel = edn_decode::nilable(value, &edn_decode::non_negative)
            .map_err(|e| invalid("import/root-sentinel", e))?;
    }
    if let Some(value) = entries.get("dangling") {
        config.dangling = decode_dangling(value)?;
    }
    Ok(config)
}

impl TreeConfig {
    pub fn from_edn(value: &edn::Value) -> Result<TreeConfig, ConfigError> {
        let entries = edn_decode::keyword_map(value).map_err(|e| invalid("config", e))?;
        reject_unknown(&entries, &["order-by", "import"])?;
        let mut config = TreeConfig::default();
        if let Some(value) = entries.get("order-by") {
            config.default_order = decode_order(value)?;
        }
        if let Some(value) = entries.get("import") {
            config.import = decode_import(value)?;
        }
        Ok(config)
    }

    pub fn from_edn_str(source: &str) -> Result<TreeConfig, ConfigError> {
        let value = edn::parse_str(source).map_err(|e| ConfigError::Parse(format!("{:?}", e)))?;
        TreeConfig::from_edn(&value)
    }
}
