//! Reading of JSON dump files.
//!
//! Three layouts are in circulation: a mapping from page URL to record, a
//! plain list of records, and the paged `{items: [...], total, ...}` export.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// One record of a dump, with the mapping key it was stored under.
#[derive(Clone, Debug, PartialEq)]
pub struct DumpEntry<'a> {
    pub key: Option<&'a str>,
    pub value: &'a Value,
}

pub fn load_dump_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dump {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse dump {:?}", path))
}

/// Lists the records of a dump in file order. Anything that is neither an
/// object nor an array yields no entries.
pub fn dump_entries(dump: &Value) -> Vec<DumpEntry<'_>> {
    match dump {
        Value::Array(records) => records
            .iter()
            .map(|value| DumpEntry { key: None, value })
            .collect(),
        Value::Object(fields) => match fields.get("items") {
            Some(Value::Array(records)) => records
                .iter()
                .map(|value| DumpEntry { key: None, value })
                .collect(),
            _ => fields
                .iter()
                .map(|(key, value)| DumpEntry {
                    key: Some(key.as_str()),
                    value,
                })
                .collect(),
        },
        _ => Vec::new(),
    }
}
