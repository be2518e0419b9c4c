//! The wire value tree.
//!
//! Every control message serializes to a [`WireValue`]: a string, an ordered
//! list, or a string-keyed mapping of further values. Mappings are kept in a
//! `BTreeMap`, so rendering a tree (e.g. as JSON) is deterministic.

use crate::error::{DecodeError, DecodeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A string-keyed mapping of wire values.
pub type WireMap = BTreeMap<String, WireValue>;

/// A node of the wire value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    /// A leaf string (tokens, addresses, attribute values).
    Str(String),
    /// An ordered sequence, e.g. transports or neighbors.
    List(Vec<WireValue>),
    /// A nested mapping, e.g. a node info.
    Map(WireMap),
}

impl WireValue {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the list payload, if this is a list.
    pub fn as_list(&self) -> Option<&[WireValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the mapping payload, if this is a mapping.
    pub fn as_map(&self) -> Option<&WireMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the mapping payload or fail with [`DecodeError::NotAMap`].
    pub fn expect_map(&self, what: &str) -> DecodeResult<&WireMap> {
        self.as_map()
            .ok_or_else(|| DecodeError::NotAMap(what.to_string()))
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
        }
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(items: Vec<WireValue>) -> Self {
        Self::List(items)
    }
}

impl From<WireMap> for WireValue {
    fn from(map: WireMap) -> Self {
        Self::Map(map)
    }
}

/// Read an optional string field. Present-but-not-a-string is an error.
pub fn str_field<'a>(map: &'a WireMap, key: &str) -> DecodeResult<Option<&'a str>> {
    match map.get(key) {
        None => Ok(None),
        Some(WireValue::Str(s)) => Ok(Some(s)),
        Some(_) => Err(DecodeError::WrongShape {
            field: key.to_string(),
            expected: "string",
        }),
    }
}

/// Read an optional mapping field. Present-but-not-a-mapping is an error.
pub fn map_field<'a>(map: &'a WireMap, key: &str) -> DecodeResult<Option<&'a WireMap>> {
    match map.get(key) {
        None => Ok(None),
        Some(WireValue::Map(m)) => Ok(Some(m)),
        Some(_) => Err(DecodeError::WrongShape {
            field: key.to_string(),
            expected: "mapping",
        }),
    }
}

/// Read an optional list field. Present-but-not-a-list is an error.
pub fn list_field<'a>(map: &'a WireMap, key: &str) -> DecodeResult<Option<&'a [WireValue]>> {
    match map.get(key) {
        None => Ok(None),
        Some(WireValue::List(items)) => Ok(Some(items)),
        Some(_) => Err(DecodeError::WrongShape {
            field: key.to_string(),
            expected: "list",
        }),
    }
}

/// Turn an absent optional field into [`DecodeError::MissingField`].
pub fn required<T>(value: Option<T>, key: &str) -> DecodeResult<T> {
    value.ok_or_else(|| DecodeError::MissingField(key.to_string()))
}
