//! Cache keys and invalidation patterns.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

/// Identifies one cached read: an operation name plus its parameters.
///
/// Parameters are kept sorted by name, and `null` values are dropped, so an
/// omitted optional parameter and an explicit `None` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    operation: String,
    params: BTreeMap<String, Value>,
}

impl QueryKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. `null` (including `None`) is treated as absent.
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = normalize(value.into());
        if value.is_null() {
            self.params.remove(name);
        } else {
            self.params.insert(name.to_string(), value);
        }
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    fn canonical_params(&self) -> String {
        // BTreeMap and serde_json's default Map both serialize in key order
        serde_json::to_string(&self.params).unwrap_or_default()
    }
}

/// Drop nulls inside nested objects so nested optionals normalize too.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.operation.hash(state);
        self.canonical_params().hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.operation)
        } else {
            write!(f, "{}{}", self.operation, self.canonical_params())
        }
    }
}

/// Selects cache entries to evict after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPattern {
    /// Exactly this key.
    Exact(QueryKey),
    /// Every key with the same operation whose parameters include all of
    /// this key's parameters. A key with no parameters matches the whole
    /// operation.
    Prefix(QueryKey),
}

impl KeyPattern {
    /// Every cached read of `operation`, whatever its parameters.
    pub fn operation(operation: impl Into<String>) -> Self {
        KeyPattern::Prefix(QueryKey::new(operation))
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyPattern::Exact(exact) => exact == key,
            KeyPattern::Prefix(prefix) => {
                prefix.operation == key.operation
                    && prefix
                        .params
                        .iter()
                        .all(|(name, value)| key.params.get(name) == Some(value))
            }
        }
    }
}

impl From<QueryKey> for KeyPattern {
    fn from(key: QueryKey) -> Self {
        KeyPattern::Exact(key)
    }
}
