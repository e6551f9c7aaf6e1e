//! codec
//!
//! Dotted-key flatten/unflatten and YAML encoding for language files.
//!
//! # Design
//!
//! Translation stores hand the engine flat tables keyed by dotted paths
//! (`"a.b.c" -> "text"`). On disk a language file is the nested YAML form
//! (`a: { b: { c: text } }`). This module is the only place that shape
//! conversion happens, and it guarantees the round trip is exact:
//! `flatten(unflatten(x)) == x` and `decode(&encode(x)?) == x`.
//!
//! Leaves are always strings. A table in which one dotted path is a prefix
//! of another (`"a"` and `"a.b"`) has no nested representation and is
//! rejected rather than silently dropping a key.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Flat translation table for one language: dotted key to translated text.
pub type LanguageTable = BTreeMap<String, String>;

/// Translation tables keyed by language code.
pub type LanguageTables = BTreeMap<String, LanguageTable>;

/// Errors from shape conversion or YAML serialization.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A key is empty or contains an empty dotted segment (`"a..b"`).
    #[error("invalid translation key: '{0}'")]
    InvalidKey(String),

    /// One key's path is a prefix of another's; both cannot exist in the
    /// nested form.
    #[error("conflicting translation keys at path '{0}'")]
    PathConflict(String),

    /// The nested document contains something other than string leaves and
    /// string-keyed mappings.
    #[error("unsupported value at path '{path}': expected string or mapping")]
    UnsupportedValue { path: String },

    /// YAML parse or serialize failure.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Reshape a flat dotted-key table into a nested YAML mapping.
pub fn unflatten(table: &LanguageTable) -> Result<Value, CodecError> {
    let mut root = Mapping::new();

    for (key, text) in table {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CodecError::InvalidKey(key.clone()));
        }

        let mut node = &mut root;
        for (i, segment) in segments.iter().enumerate() {
            let path = || segments[..=i].join(".");
            let is_leaf = i == segments.len() - 1;
            let entry = node
                .entry(Value::String(segment.to_string()))
                .or_insert_with(|| {
                    if is_leaf {
                        Value::String(text.clone())
                    } else {
                        Value::Mapping(Mapping::new())
                    }
                });
            if is_leaf {
                match entry {
                    Value::String(existing) if *existing == *text => {}
                    // BTreeMap keys are unique, so a non-matching value here
                    // means an earlier key claimed this path as a subtree.
                    _ => return Err(CodecError::PathConflict(path())),
                }
                break;
            } else {
                node = match entry {
                    Value::Mapping(m) => m,
                    _ => return Err(CodecError::PathConflict(path())),
                };
            }
        }
    }

    Ok(Value::Mapping(root))
}

/// Flatten a nested YAML mapping back into a dotted-key table.
pub fn flatten(value: &Value) -> Result<LanguageTable, CodecError> {
    let mut table = LanguageTable::new();
    flatten_into(value, String::new(), &mut table)?;
    Ok(table)
}

fn flatten_into(
    value: &Value,
    prefix: String,
    table: &mut LanguageTable,
) -> Result<(), CodecError> {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let segment = key
                    .as_str()
                    .ok_or_else(|| CodecError::UnsupportedValue {
                        path: prefix.clone(),
                    })?;
                let path = if prefix.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}.{}", prefix, segment)
                };
                flatten_into(child, path, table)?;
            }
            Ok(())
        }
        Value::String(text) if !prefix.is_empty() => {
            table.insert(prefix, text.clone());
            Ok(())
        }
        _ => Err(CodecError::UnsupportedValue { path: prefix }),
    }
}

/// Encode a flat table as nested YAML text.
pub fn encode(table: &LanguageTable) -> Result<String, CodecError> {
    let nested = unflatten(table)?;
    Ok(serde_yaml::to_string(&nested)?)
}

/// Decode nested YAML text back into a flat table.
pub fn decode(text: &str) -> Result<LanguageTable, CodecError> {
    let value: Value = serde_yaml::from_str(text)?;
    flatten(&value)
}
