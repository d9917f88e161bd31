//! Network resource handlers

mod network_security_rule;
mod subnet;
mod subnet_network_security_group_association;
mod virtual_network;

pub use network_security_rule::NetworkSecurityRuleResource;
pub use subnet::SubnetResource;
pub use subnet_network_security_group_association::SubnetNetworkSecurityGroupAssociationResource;
pub use virtual_network::VirtualNetworkResource;

use armature_cloud::{CloudError, ResourceData, ResourceId, Result};

/// A configured string attribute that the schema marks as required
fn required_str(data: &ResourceData, key: &str) -> Result<String> {
    data.get_str(key)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CloudError::Validation(format!("\"{}\" is required", key)))
}

/// Parse the ID recorded in state
fn state_id(data: &ResourceData) -> Result<ResourceId> {
    let id = data
        .id()
        .ok_or_else(|| CloudError::InvalidResourceId("resource has no ID in state".to_string()))?;
    ResourceId::parse(id)
}

/// Treat "gone" as success, for delete paths
fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Enum-like attribute value: matched case-insensitively, returned in its
/// canonical spelling
fn one_of(key: &str, value: &str, allowed: &[&'static str]) -> Result<&'static str> {
    allowed
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(value))
        .ok_or_else(|| {
            CloudError::Validation(format!(
                "\"{}\" must be one of [{}], got {:?}",
                key,
                allowed.join(", "),
                value
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str_rejects_empty() {
        let data = ResourceData::default()
            .with_attribute("name", json!(""))
            .with_attribute("location", json!("westeurope"));
        assert!(required_str(&data, "name").is_err());
        assert!(required_str(&data, "missing").is_err());
        assert_eq!(required_str(&data, "location").unwrap(), "westeurope");
    }

    #[test]
    fn test_one_of_canonicalizes() {
        assert_eq!(one_of("access", "allow", &["Allow", "Deny"]).unwrap(), "Allow");
        let err = one_of("access", "Permit", &["Allow", "Deny"]).unwrap_err();
        assert!(err.to_string().contains("[Allow, Deny]"));
    }

    #[test]
    fn test_ignore_not_found() {
        assert!(ignore_not_found(Err(CloudError::ResourceNotFound("x".into()))).is_ok());
        assert!(ignore_not_found(Err(CloudError::Timeout("x".into()))).is_err());
    }
}
