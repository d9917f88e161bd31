//! Provider assembly

use crate::context::NetworkContext;
use crate::resources::{
    NetworkSecurityRuleResource, SubnetNetworkSecurityGroupAssociationResource, SubnetResource,
    VirtualNetworkResource,
};
use armature_cloud::Provider;

pub const PROVIDER_NAME: &str = "azurerm";

/// Provider exposing every network resource, all sharing `ctx`'s locks
pub fn network_provider(ctx: NetworkContext) -> Provider {
    Provider::new(PROVIDER_NAME)
        .with_resource(VirtualNetworkResource::new(ctx.clone()))
        .with_resource(SubnetResource::new(ctx.clone()))
        .with_resource(NetworkSecurityRuleResource::new(ctx.clone()))
        .with_resource(SubnetNetworkSecurityGroupAssociationResource::new(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_cloud::InMemoryClient;
    use std::sync::Arc;

    #[test]
    fn test_resource_types() {
        let ctx = NetworkContext::new("sub", Arc::new(InMemoryClient::new()));
        let provider = network_provider(ctx);

        assert_eq!(provider.name(), "azurerm");
        assert_eq!(
            provider.resource_types().collect::<Vec<_>>(),
            vec![
                "azurerm_network_security_rule",
                "azurerm_subnet",
                "azurerm_subnet_network_security_group_association",
                "azurerm_virtual_network",
            ]
        );
    }

    #[test]
    fn test_every_schema_declares_a_name_or_reference() {
        let ctx = NetworkContext::new("sub", Arc::new(InMemoryClient::new()));
        for (resource_type, schema) in network_provider(ctx).schemas() {
            assert!(
                schema.get("name").is_some() || schema.get("subnet_id").is_some(),
                "{} has no identifying attribute",
                resource_type
            );
            assert!(schema.force_new_attributes().next().is_some());
        }
    }
}
