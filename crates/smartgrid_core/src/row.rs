use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Value;

/// Stable identity of a row across reorders and edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowId::Int(i) => write!(f, "{}", i),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(i: i64) -> Self {
        RowId::Int(i)
    }
}

impl From<i32> for RowId {
    fn from(i: i32) -> Self {
        RowId::Int(i64::from(i))
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId::Text(s.to_string())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        RowId::Text(s)
    }
}

/// A caller-owned record: identity plus values keyed by column id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(default)]
    pub values: IndexMap<String, Value>,
}

static NULL: Value = Value::Null;

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, column_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column_id.into(), value.into());
        self
    }

    /// Value of a column; missing columns read as `Null`.
    pub fn get(&self, column_id: &str) -> &Value {
        self.values.get(column_id).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column_id: impl Into<String>, value: Value) {
        self.values.insert(column_id.into(), value);
    }
}

/// Maps each identity to the index of its first occurrence.
///
/// Later duplicates are reported in the second element and must not be shown.
pub fn index_by_id(rows: &[Row]) -> (HashMap<RowId, usize>, Vec<usize>) {
    let mut index = HashMap::with_capacity(rows.len());
    let mut duplicates = Vec::new();

    for (ix, row) in rows.iter().enumerate() {
        if index.contains_key(&row.id) {
            duplicates.push(ix);
        } else {
            index.insert(row.id.clone(), ix);
        }
    }

    (index, duplicates)
}

/// Identities present in `rows`.
pub fn id_set(rows: &[Row]) -> HashSet<RowId> {
    rows.iter().map(|r| r.id.clone()).collect()
}
