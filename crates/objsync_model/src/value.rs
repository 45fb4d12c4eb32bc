//! Property values carried by records.

use crate::id::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named set of property values, keyed by property name.
pub type Fields = BTreeMap<String, Value>;

/// A single property value.
///
/// Owning and referencing properties hold record identifiers (`Ref` for
/// single-valued properties, `RefSeq` for collections). Everything else is
/// plain data copied verbatim between stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Plain text.
    Text(String),
    /// Text per writing system (`"en"`, `"fr"`, `"seh"`, ...).
    MultiText(BTreeMap<String, String>),
    /// A single record reference.
    Ref(RecordId),
    /// An ordered sequence of record references.
    RefSeq(Vec<RecordId>),
}

impl Value {
    /// Builds a multi-writing-system string from `(ws, text)` pairs.
    pub fn multi_text<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::MultiText(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an `Integer` value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the writing-system map, if this is a `MultiText` value.
    pub fn as_multi_text(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Value::MultiText(m) => Some(m),
            _ => None,
        }
    }

    /// Returns every record ID held by this value, in order.
    ///
    /// Non-reference values yield an empty list.
    pub fn referenced_ids(&self) -> Vec<RecordId> {
        match self {
            Value::Ref(id) => vec![*id],
            Value::RefSeq(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Ref(id)
    }
}

impl From<Vec<RecordId>> for Value {
    fn from(ids: Vec<RecordId>) -> Self {
        Value::RefSeq(ids)
    }
}
