//! Resource data accessor
//!
//! The engine hands each CRUD handler a [`ResourceData`]: the configured
//! attributes in, the observed attributes and ID out. Handlers never see the
//! engine's state file or graph.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map keyed by attribute name
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Attributes and identity of a single resource instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceData {
    /// Remote resource ID; `None` until created, or after the resource is gone
    id: Option<String>,

    /// Current attribute values
    attributes: Attributes,

    /// Attribute values from the previous state, used by `has_change`
    #[serde(default)]
    prior: Attributes,

    /// Last write through this accessor
    updated_at: Option<DateTime<Utc>>,
}

impl ResourceData {
    /// Data for a resource that does not exist yet
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Data for an existing resource: `prior` is the stored state and
    /// `attributes` the configuration being applied
    pub fn from_state(id: impl Into<String>, prior: Attributes, attributes: Attributes) -> Self {
        Self {
            id: Some(id.into()),
            attributes,
            prior,
            updated_at: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
        self.touch();
    }

    /// Mark the resource as gone so the engine drops it from state
    pub fn clear_id(&mut self) {
        self.id = None;
        self.touch();
    }

    pub fn is_new_resource(&self) -> bool {
        self.id.is_none()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        // Serializing plain data (strings, numbers, maps) cannot fail.
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.attributes.insert(key.into(), value);
        self.touch();
    }

    /// Whether `key` differs from the previous state.
    ///
    /// A new resource has no previous state, so every set attribute counts
    /// as changed.
    pub fn has_change(&self, key: &str) -> bool {
        if self.is_new_resource() {
            return self.attributes.contains_key(key);
        }
        self.attributes.get(key) != self.prior.get(key)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, serde_json::Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_new_resource_has_no_id() {
        let data = ResourceData::new(attrs(&[("name", json!("vnet-a"))]));
        assert!(data.is_new_resource());
        assert_eq!(data.get_str("name"), Some("vnet-a"));
    }

    #[test]
    fn test_set_and_clear_id() {
        let mut data = ResourceData::default();
        data.set_id("/subscriptions/sub");
        assert_eq!(data.id(), Some("/subscriptions/sub"));
        assert!(data.updated_at().is_some());

        data.clear_id();
        assert!(data.is_new_resource());
    }

    #[test]
    fn test_typed_get() {
        let data = ResourceData::default()
            .with_attribute("address_space", json!(["10.0.0.0/16"]))
            .with_attribute("priority", json!(100))
            .with_attribute("dns_servers", serde_json::Value::Null);

        let space: Vec<String> = data.get("address_space").unwrap();
        assert_eq!(space, vec!["10.0.0.0/16".to_string()]);
        assert_eq!(data.get::<i32>("priority"), Some(100));
        assert_eq!(data.get::<Vec<String>>("dns_servers"), None);
        assert_eq!(data.get_or::<Vec<String>>("dns_servers", Vec::new()).len(), 0);
        assert_eq!(data.get::<String>("priority"), None);
    }

    #[test]
    fn test_has_change_against_prior_state() {
        let prior = attrs(&[("address_prefix", json!("10.0.1.0/24")), ("name", json!("a"))]);
        let current = attrs(&[("address_prefix", json!("10.0.2.0/24")), ("name", json!("a"))]);
        let data = ResourceData::from_state("id", prior, current);

        assert!(data.has_change("address_prefix"));
        assert!(!data.has_change("name"));
    }

    #[test]
    fn test_has_change_for_new_resource() {
        let data = ResourceData::new(attrs(&[("name", json!("a"))]));
        assert!(data.has_change("name"));
        assert!(!data.has_change("tags"));
    }
}
