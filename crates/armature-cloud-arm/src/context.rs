//! Shared state of the network resource handlers

use crate::models::{NetworkSecurityGroup, VirtualNetwork};
use armature_cloud::{NamedLocks, PollConfig, ResourceClient, ResourceId, lock_key};
use std::sync::Arc;

pub const NETWORK_NAMESPACE: &str = "Microsoft.Network";

pub const VIRTUAL_NETWORK_TYPE: &str = "azurerm_virtual_network";
pub const NETWORK_SECURITY_GROUP_TYPE: &str = "azurerm_network_security_group";

/// A client that can read and write every aggregate the network resources
/// touch
pub trait NetworkClient:
    ResourceClient<VirtualNetwork> + ResourceClient<NetworkSecurityGroup>
{
}

impl<T> NetworkClient for T where
    T: ResourceClient<VirtualNetwork> + ResourceClient<NetworkSecurityGroup>
{
}

/// Everything a network resource handler needs.
///
/// Cloning is cheap and every clone shares the same lock registry, so all
/// handlers built from one context serialize on the same parent objects.
#[derive(Clone)]
pub struct NetworkContext {
    subscription_id: String,
    locks: Arc<NamedLocks>,
    client: Arc<dyn NetworkClient>,
    poll: PollConfig,
}

impl NetworkContext {
    pub fn new(subscription_id: impl Into<String>, client: Arc<dyn NetworkClient>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            locks: Arc::new(NamedLocks::new()),
            client,
            poll: PollConfig::default(),
        }
    }

    /// Share a lock registry with handlers outside this context
    pub fn with_locks(mut self, locks: Arc<NamedLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn locks(&self) -> &NamedLocks {
        &self.locks
    }

    pub fn client(&self) -> &dyn NetworkClient {
        self.client.as_ref()
    }

    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    pub fn virtual_network_id(&self, resource_group: &str, name: &str) -> ResourceId {
        ResourceId::new(&self.subscription_id, resource_group, NETWORK_NAMESPACE)
            .child("virtualNetworks", name)
    }

    pub fn network_security_group_id(&self, resource_group: &str, name: &str) -> ResourceId {
        ResourceId::new(&self.subscription_id, resource_group, NETWORK_NAMESPACE)
            .child("networkSecurityGroups", name)
    }
}

impl std::fmt::Debug for NetworkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkContext")
            .field("subscription_id", &self.subscription_id)
            .field("locks", &self.locks.len())
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

/// Lock key guarding a virtual network and its subnets
pub fn virtual_network_key(name: &str) -> String {
    lock_key(VIRTUAL_NETWORK_TYPE, name)
}

/// Lock key guarding a network security group and its rules
pub fn network_security_group_key(name: &str) -> String {
    lock_key(NETWORK_SECURITY_GROUP_TYPE, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_cloud::InMemoryClient;

    #[test]
    fn test_ids() {
        let ctx = NetworkContext::new("sub", Arc::new(InMemoryClient::new()));
        assert_eq!(
            ctx.virtual_network_id("rg", "vnet").to_string(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet"
        );
        assert_eq!(
            ctx.network_security_group_id("rg", "nsg").name(),
            Some("nsg")
        );
    }

    #[test]
    fn test_keys_ignore_name_case() {
        assert_eq!(virtual_network_key("VNet-A"), virtual_network_key("vnet-a"));
        assert_ne!(virtual_network_key("a"), network_security_group_key("a"));
    }

    #[test]
    fn test_clones_share_locks() {
        let ctx = NetworkContext::new("sub", Arc::new(InMemoryClient::new()));
        let other = ctx.clone();

        let _guard = ctx.locks().try_lock(&virtual_network_key("vnet")).unwrap();
        assert!(other.locks().try_lock(&virtual_network_key("vnet")).is_none());
    }
}
