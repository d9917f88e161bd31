//! Azure Resource Manager network resources for armature
//!
//! This crate implements [`Resource`](armature_cloud::Resource) handlers for
//! virtual networks and the objects that live inside other objects on the
//! ARM side: subnets (inside a virtual network), security rules (inside a
//! network security group) and subnet/security group associations (a field
//! of a subnet).
//!
//! Child handlers never write a parent without holding its named lock, so
//! parallel applies cannot drop each other's changes.
//!
//! # Requirements
//!
//! - A bearer token for `https://management.azure.com/`, for example from
//!   `az account get-access-token`, exported as `ARM_ACCESS_TOKEN`
//!
//! # Example
//!
//! ```ignore
//! use armature_cloud_arm::{ArmClient, NetworkContext, network_provider};
//! use std::sync::Arc;
//!
//! let client = ArmClient::new(std::env::var("ARM_ACCESS_TOKEN")?);
//! let ctx = NetworkContext::new("00000000-0000-0000-0000-000000000000", Arc::new(client));
//! let provider = network_provider(ctx);
//!
//! provider.create("azurerm_subnet", &mut data).await?;
//! ```

pub mod client;
pub mod context;
pub mod models;
pub mod provider;
pub mod resources;

pub use client::{ArmClient, DEFAULT_ENDPOINT, SubscriptionProviders};
pub use context::{NetworkClient, NetworkContext, network_security_group_key, virtual_network_key};
pub use models::{
    ArmModel, NetworkSecurityGroup, SecurityRule, SubResource, Subnet, VirtualNetwork,
};
pub use provider::{PROVIDER_NAME, network_provider};
pub use resources::{
    NetworkSecurityRuleResource, SubnetNetworkSecurityGroupAssociationResource, SubnetResource,
    VirtualNetworkResource,
};
