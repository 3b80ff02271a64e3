//! Deterministic cache keys for remote operations
//!
//! A key has the shape `<namespace>:<operation>:<canonical params>`, where the
//! canonical form is compact JSON with object members sorted by name at every
//! depth and `null` members dropped. Namespace and operation come first so
//! that "everything cached for this operation" is a plain prefix match.

use crate::cache::types::CacheKey;
use crate::payload::Params;
use serde_json::Value;
use std::fmt::Write;

/// Builds keys for one cache namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    namespace: String,
}

impl CacheKeyBuilder {
    /// Create a builder for the given namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Build the key for an operation and its parameter bag
    ///
    /// Two bags that differ only in member order, or in members set to
    /// `null` versus left out, produce the same key.
    pub fn build(&self, operation: &str, params: &Params) -> CacheKey {
        let mut key = self.operation_prefix(operation);
        write_object(&mut key, params.iter());
        key
    }

    /// Prefix shared by every key of `operation`
    pub fn operation_prefix(&self, operation: &str) -> String {
        format!("{}:{}:", self.namespace, operation)
    }

    /// Regex matching every key of `operation`
    pub fn operation_pattern(&self, operation: &str) -> String {
        format!("^{}", regex::escape(&self.operation_prefix(operation)))
    }

    /// Regex matching keys of `operation` whose parameters hold `param = value`
    ///
    /// The member may sit at any depth of the parameter object, so a nested
    /// member with the same name and value also matches. Over-matching only
    /// costs an extra reload.
    pub fn shared_param_pattern(&self, operation: &str, param: &str, value: &Value) -> String {
        format!(
            "^{}.*[{{,]{}[,}}]",
            regex::escape(&self.operation_prefix(operation)),
            regex::escape(&param_fragment(param, value))
        )
    }
}

/// Canonical compact JSON of a parameter bag
pub fn canonical_params(params: &Params) -> String {
    let mut out = String::new();
    write_object(&mut out, params.iter());
    out
}

/// Canonical `"name":value` fragment as it appears inside a key
pub fn param_fragment(param: &str, value: &Value) -> String {
    let mut out = String::new();
    write_string(&mut out, param);
    out.push(':');
    write_value(&mut out, value);
    out
}

fn write_object<'a>(out: &mut String, members: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut members: Vec<_> = members.filter(|(_, v)| !v.is_null()).collect();
    members.sort_by(|(a, _), (b, _)| a.cmp(b));

    out.push('{');
    for (i, (name, value)) in members.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, name);
        out.push(':');
        write_value(out, value);
    }
    out.push('}');
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => write_object(out, map.iter()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::String(s) => write_string(out, s),
        // null, bool and number render the same in any serializer
        other => {
            let _ = write!(out, "{}", other);
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    // Serializing a str cannot fail
    let _ = write!(out, "{}", Value::String(s.to_string()));
}
