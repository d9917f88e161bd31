//! Field normalization shared by resource handlers

use crate::error::{CloudError, Result};
use std::collections::BTreeMap;

const MAX_TAGS: usize = 50;
const MAX_TAG_KEY_LEN: usize = 512;
const MAX_TAG_VALUE_LEN: usize = 256;

/// Canonical location name: `"West Europe"` and `"westeurope"` are the
/// same region.
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Convert a `tags` attribute into the API tag map.
///
/// Numbers and booleans are accepted and stringified; nested values are
/// rejected.
pub fn expand_tags(value: Option<&serde_json::Value>) -> Result<BTreeMap<String, String>> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(BTreeMap::new());
    };

    let object = value
        .as_object()
        .ok_or_else(|| CloudError::Validation("\"tags\" must be a map".to_string()))?;

    let mut tags = BTreeMap::new();
    for (key, value) in object {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            _ => {
                return Err(CloudError::Validation(format!(
                    "tag \"{}\" must be a string",
                    key
                )));
            }
        };
        tags.insert(key.clone(), value);
    }

    validate_tags(&tags)?;
    Ok(tags)
}

/// Convert API tags back into the `tags` attribute
pub fn flatten_tags(tags: Option<&BTreeMap<String, String>>) -> serde_json::Value {
    let map = tags
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::Value::Object(map)
}

/// Enforce the API's tag limits
pub fn validate_tags(tags: &BTreeMap<String, String>) -> Result<()> {
    if tags.len() > MAX_TAGS {
        return Err(CloudError::Validation(format!(
            "a maximum of {} tags can be applied to each resource",
            MAX_TAGS
        )));
    }

    for (key, value) in tags {
        if key.chars().count() > MAX_TAG_KEY_LEN {
            return Err(CloudError::Validation(format!(
                "the maximum length for a tag key is {} characters: {}",
                MAX_TAG_KEY_LEN, key
            )));
        }
        if value.chars().count() > MAX_TAG_VALUE_LEN {
            return Err(CloudError::Validation(format!(
                "the maximum length for a tag value is {} characters: {}",
                MAX_TAG_VALUE_LEN, key
            )));
        }
    }

    Ok(())
}
