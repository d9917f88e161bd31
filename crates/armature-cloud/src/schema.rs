//! Resource schema declarations

use crate::error::{CloudError, Result};
use crate::resource::ResourceData;
use serde::Serialize;
use std::collections::BTreeMap;

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Bool,
    List,
    Map,
}

impl AttributeType {
    fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Int => value.is_i64() || value.is_u64(),
            AttributeType::Bool => value.is_boolean(),
            AttributeType::List => value.is_array(),
            AttributeType::Map => value.is_object(),
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Int => write!(f, "int"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List => write!(f, "list"),
            AttributeType::Map => write!(f, "map"),
        }
    }
}

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    /// Must be set in configuration
    Required,
    /// May be set in configuration
    Optional,
    /// Set by the provider only
    Computed,
    /// May be set in configuration, otherwise filled in by the provider
    OptionalComputed,
}

/// A single attribute declaration
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub attribute_type: AttributeType,
    pub mode: AttributeMode,
    /// Changing the value replaces the remote object
    pub force_new: bool,
    pub description: Option<String>,
}

impl Attribute {
    fn new(attribute_type: AttributeType, mode: AttributeMode) -> Self {
        Self {
            attribute_type,
            mode,
            force_new: false,
            description: None,
        }
    }

    pub fn required(attribute_type: AttributeType) -> Self {
        Self::new(attribute_type, AttributeMode::Required)
    }

    pub fn optional(attribute_type: AttributeType) -> Self {
        Self::new(attribute_type, AttributeMode::Optional)
    }

    pub fn computed(attribute_type: AttributeType) -> Self {
        Self::new(attribute_type, AttributeMode::Computed)
    }

    pub fn optional_computed(attribute_type: AttributeType) -> Self {
        Self::new(attribute_type, AttributeMode::OptionalComputed)
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Attribute declarations of one resource type
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.force_new)
            .map(|(name, _)| name.as_str())
    }

    /// Check configured data against this schema.
    ///
    /// Every problem is reported in a single `Validation` error.
    pub fn validate(&self, data: &ResourceData) -> Result<()> {
        let mut problems = Vec::new();

        for (name, attribute) in &self.attributes {
            match data.raw(name).filter(|v| !v.is_null()) {
                None if attribute.mode == AttributeMode::Required => {
                    problems.push(format!("\"{}\" is required", name));
                }
                Some(value) if !attribute.attribute_type.matches(value) => {
                    problems.push(format!(
                        "\"{}\" must be of type {}",
                        name, attribute.attribute_type
                    ));
                }
                _ => {}
            }
        }

        for name in data.attributes().keys() {
            if !self.attributes.contains_key(name) {
                problems.push(format!("\"{}\" is not a known attribute", name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CloudError::Validation(problems.join("; ")))
        }
    }
}
