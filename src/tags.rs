//! Tag sets and the validation policy applied to them.
//!
//! Tags are descriptive key-value metadata attached to a metric. They are
//! immutable by convention: once attached to a primitive the map is never
//! mutated in place, and deriving a tagged view always allocates a fresh
//! merged map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TagError;

/// Key-value pairs associated with a metric.
pub type Tags = HashMap<String, String>;

/// Returns a new tag set containing all of `base`'s entries overlaid with
/// `overlay`'s entries. On key collision the overlay wins. Empty inputs are
/// legal and produce an empty (but allocated) result.
pub fn merge_tags(base: &Tags, overlay: &Tags) -> Tags {
    let mut merged = Tags::with_capacity(base.len() + overlay.len());
    for (k, v) in base {
        merged.insert(k.clone(), v.clone());
    }
    for (k, v) in overlay {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// Limits applied to tag sets and per-name instance counts at creation time.
///
/// The defaults are deliberately permissive enough for normal service
/// instrumentation while still bounding the damage of a runaway tag source:
/// 10 keys per metric, 100/200 byte key/value limits, and at most 1000 live
/// instances under a single metric name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPolicy {
    /// Maximum number of tags allowed per metric.
    pub max_keys: usize,
    /// Maximum length of a tag key, in bytes.
    pub max_key_length: usize,
    /// Maximum length of a tag value, in bytes.
    pub max_value_length: usize,
    /// Maximum number of live instances registered under one metric name.
    pub max_cardinality: usize,
    /// Tag keys that are rejected outright.
    pub disallowed_keys: Vec<String>,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            max_keys: 10,
            max_key_length: 100,
            max_value_length: 200,
            max_cardinality: 1000,
            disallowed_keys: Vec::new(),
        }
    }
}

/// Checks `tags` against `policy`, reporting the first violation found.
///
/// Map iteration order is unspecified, so when several violations exist at
/// once the reported one is arbitrary; callers should only rely on the error
/// kind, not on which offending key is named.
pub fn validate_tags(tags: &Tags, policy: &TagPolicy) -> Result<(), TagError> {
    if tags.len() > policy.max_keys {
        return Err(TagError::TooManyKeys {
            count: tags.len(),
            max: policy.max_keys,
        });
    }

    for (key, value) in tags {
        if key.is_empty() {
            return Err(TagError::EmptyKey);
        }
        if key.len() > policy.max_key_length {
            return Err(TagError::KeyTooLong {
                key: key.clone(),
                max: policy.max_key_length,
            });
        }
        if value.len() > policy.max_value_length {
            return Err(TagError::ValueTooLong {
                key: key.clone(),
                max: policy.max_value_length,
            });
        }
        if policy.disallowed_keys.iter().any(|d| d == key) {
            return Err(TagError::DisallowedKey { key: key.clone() });
        }
    }

    Ok(())
}
