//! Hierarchical cache keys.
//!
//! A [`QueryKey`] is an ordered list of [`KeySegment`]s. Child scopes extend
//! their parent's key, so "everything under a scope" is a prefix match.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::Result;

/// Field name for parameters that failed to serialize. Not a Rust identifier,
/// so no derived parameter struct produces it.
const UNSERIALIZABLE: &str = "\0unserializable";

/// One segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
    /// Sentinel for an absent scope value ("nothing selected").
    Null,
    Text(String),
    Number(i64),
    /// Canonicalized query parameters, sorted by name.
    Params(BTreeMap<String, String>),
}

impl KeySegment {
    /// Segment for an optional scope value; `None` becomes [`KeySegment::Null`].
    pub fn optional(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |v| Self::Text(v.to_string()))
    }

    /// Canonicalize a parameter struct into a segment.
    ///
    /// Field values are stored as JSON text sorted by name, so two
    /// structurally equal parameter sets produce equal segments. Values that
    /// are not JSON objects are stored under the empty field name.
    pub fn try_params<T: Serialize>(params: &T) -> Result<Self> {
        let map = match serde_json::to_value(params)? {
            Value::Object(fields) => fields
                .into_iter()
                .map(|(name, value)| (name, value.to_string()))
                .collect(),
            other => BTreeMap::from([(String::new(), other.to_string())]),
        };
        Ok(Self::Params(map))
    }

    /// Like [`try_params`](Self::try_params), for parameter types that always
    /// serialize to JSON.
    ///
    /// A serialization failure is logged and yields a segment marked with the
    /// type name and the error, distinct from any derived parameter struct.
    pub fn params<T: Serialize>(params: &T) -> Self {
        Self::try_params(params).unwrap_or_else(|e| {
            let type_name = std::any::type_name::<T>();
            warn!(type_name, error = %e, "query parameters are not representable as JSON");
            Self::Params(BTreeMap::from([(
                UNSERIALIZABLE.to_string(),
                format!("{type_name}: {e}"),
            )]))
        })
    }
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for KeySegment {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for KeySegment {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<&str>> for KeySegment {
    fn from(value: Option<&str>) -> Self {
        Self::optional(value)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Params(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Identifies a cached read. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<KeySegment>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// A new key with `segment` appended.
    pub fn child(&self, segment: impl Into<KeySegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// A new key with every segment of `segments` appended.
    pub fn extend<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<KeySegment>,
    {
        let mut key = self.0.clone();
        key.extend(segments.into_iter().map(Into::into));
        Self(key)
    }

    /// Whether this key shares all leading segments of `prefix`.
    ///
    /// Every key starts with itself and with the empty key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{segment}")?;
        }
        f.write_str("]")
    }
}

/// Selects the cache entries an invalidation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    /// Every key starting with the given key.
    Prefix(QueryKey),
    /// Only the given key.
    Exact(QueryKey),
}

impl KeyFilter {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::Prefix(prefix) => key.starts_with(prefix),
            Self::Exact(exact) => key == exact,
        }
    }

    pub fn key(&self) -> &QueryKey {
        match self {
            Self::Prefix(key) | Self::Exact(key) => key,
        }
    }
}

impl From<QueryKey> for KeyFilter {
    fn from(key: QueryKey) -> Self {
        Self::Prefix(key)
    }
}
