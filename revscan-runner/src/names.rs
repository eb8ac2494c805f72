//! Security code → display name lookup.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::data_loader::LoadError;

/// Name used when a code has no entry.
pub const UNKNOWN_NAME: &str = "unknown";

#[derive(Debug, Deserialize)]
struct NameRecord {
    #[serde(alias = "代码", alias = "股票代码", alias = "symbol")]
    code: String,
    #[serde(alias = "名称", alias = "股票名称")]
    name: String,
}

/// Read-only name table shared by every worker.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<String, String>,
}

/// Left-pad an all-digit code to six digits ("1" → "000001").
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.len() < 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{code:0>6}")
    } else {
        code.to_string()
    }
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut table = Self::new();
        for record in rdr.deserialize::<NameRecord>() {
            let record = record?;
            table.insert(&record.code, record.name);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn insert(&mut self, code: &str, name: impl Into<String>) {
        self.names.insert(normalize_code(code), name.into());
    }

    /// Display name for `code`, or [`UNKNOWN_NAME`].
    pub fn lookup(&self, code: &str) -> &str {
        self.names
            .get(&normalize_code(code))
            .map_or(UNKNOWN_NAME, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
