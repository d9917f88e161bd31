//! ARM resource ID parsing
//!
//! IDs look like
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{child}/{name}...]`.
//! Keys are matched case-insensitively, values are kept verbatim.

use crate::error::{CloudError, Result};
use std::fmt;

/// Parsed ARM resource ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    subscription_id: String,
    resource_group: Option<String>,
    provider: Option<String>,
    /// Remaining `(type, name)` pairs in path order
    segments: Vec<(String, String)>,
}

impl ResourceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: Some(resource_group.into()),
            provider: Some(provider.into()),
            segments: Vec::new(),
        }
    }

    /// Subscription-scoped ID (`/subscriptions/{sub}`)
    pub fn subscription(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: None,
            provider: None,
            segments: Vec::new(),
        }
    }

    /// Parse an ID string
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |reason: &str| CloudError::InvalidResourceId(format!("{}: {}", id, reason));

        let path = id.trim();
        let Some(path) = path.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };
        let path = path.trim_end_matches('/');

        let components: Vec<&str> = path.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(invalid("the number of path segments is not divisible by 2"));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut segments = Vec::new();

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(invalid("key/value segments cannot be empty"));
            }

            if key.eq_ignore_ascii_case("subscriptions") && subscription_id.is_none() {
                subscription_id = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("resourceGroups") && resource_group.is_none() {
                resource_group = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("providers") && provider.is_none() {
                provider = Some(value.to_string());
            } else {
                segments.push((key.to_string(), value.to_string()));
            }
        }

        let subscription_id = subscription_id.ok_or_else(|| invalid("no subscription ID found"))?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            segments,
        })
    }

    /// Append a `(type, name)` segment
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut id = self.clone();
        id.segments.push((resource_type.into(), name.into()));
        id
    }

    /// The ID with its last segment removed
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut id = self.clone();
        id.segments.pop();
        Some(id)
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Resource group, or `InvalidResourceId` when the ID has none
    pub fn require_resource_group(&self) -> Result<&str> {
        self.resource_group().ok_or_else(|| {
            CloudError::InvalidResourceId(format!("{}: no resource group found", self))
        })
    }

    /// Name of the segment keyed `resource_type`, if present
    pub fn segment(&self, resource_type: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(resource_type))
            .map(|(_, value)| value.as_str())
    }

    /// Like [`segment`](Self::segment) but missing segments are an error
    pub fn require_segment(&self, resource_type: &str) -> Result<&str> {
        self.segment(resource_type).ok_or_else(|| {
            CloudError::InvalidResourceId(format!(
                "{}: no '{}' segment found",
                self, resource_type
            ))
        })
    }

    /// Name of the innermost resource
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|(_, value)| value.as_str())
    }

    /// Type of the innermost resource (e.g. `subnets`)
    pub fn resource_type(&self) -> Option<&str> {
        self.segments.last().map(|(key, _)| key.as_str())
    }

    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.segments {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ResourceId {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
