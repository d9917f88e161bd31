use super::{ignore_not_found, required_str, state_id};
use crate::context::{NetworkContext, network_security_group_key, virtual_network_key};
use crate::models::{SubResource, VirtualNetwork};
use armature_cloud::{
    Attribute, AttributeType, CloudError, Resource, ResourceClient, ResourceData, ResourceId,
    Result, Schema, read_modify_write,
};
use async_trait::async_trait;

pub const SUBNET_NSG_ASSOCIATION_TYPE: &str = "azurerm_subnet_network_security_group_association";

/// `azurerm_subnet_network_security_group_association`
///
/// Sets the `networkSecurityGroup` reference of a subnet. The write goes
/// through the subnet's virtual network, and the group is locked as well so
/// rule changes and association changes never interleave.
pub struct SubnetNetworkSecurityGroupAssociationResource {
    ctx: NetworkContext,
}

impl SubnetNetworkSecurityGroupAssociationResource {
    pub fn new(ctx: NetworkContext) -> Self {
        Self { ctx }
    }
}

struct SubnetRef {
    id: ResourceId,
    vnet_id: ResourceId,
    vnet_name: String,
    name: String,
}

impl SubnetRef {
    fn parse(id: &str) -> Result<Self> {
        let id = ResourceId::parse(id)?;
        let vnet_name = id.require_segment("virtualNetworks")?.to_string();
        let name = id.require_segment("subnets")?.to_string();
        let vnet_id = id.parent().ok_or_else(|| {
            CloudError::InvalidResourceId(format!("{}: subnet has no parent", id))
        })?;
        Ok(Self {
            id,
            vnet_id,
            vnet_name,
            name,
        })
    }

    fn from_state(data: &ResourceData) -> Result<Self> {
        Self::parse(&state_id(data)?.to_string())
    }

    /// Locks for a change that touches this subnet and `nsg_id`
    fn keys(&self, nsg_id: &ResourceId) -> Result<Vec<String>> {
        let nsg_name = nsg_id.require_segment("networkSecurityGroups")?;
        Ok(vec![
            virtual_network_key(&self.vnet_name),
            network_security_group_key(nsg_name),
        ])
    }
}

#[async_trait]
impl Resource for SubnetNetworkSecurityGroupAssociationResource {
    fn type_name(&self) -> &'static str {
        SUBNET_NSG_ASSOCIATION_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("subnet_id", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "network_security_group_id",
                Attribute::required(AttributeType::String).force_new(),
            )
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let subnet = SubnetRef::parse(&required_str(data, "subnet_id")?)?;
        let nsg_id = ResourceId::parse(&required_str(data, "network_security_group_id")?)?;
        let keys = subnet.keys(&nsg_id)?;

        read_modify_write(
            self.ctx.locks(),
            keys.as_slice(),
            self.ctx.client(),
            &subnet.vnet_id,
            self.ctx.poll(),
            |vnet: &mut VirtualNetwork| {
                let target = vnet
                    .subnet_mut(&subnet.name)
                    .ok_or_else(|| CloudError::ResourceNotFound(subnet.id.to_string()))?;
                if target.properties.network_security_group.is_some() {
                    return Err(CloudError::ResourceAlreadyExists(subnet.id.to_string()));
                }
                target.properties.network_security_group =
                    Some(SubResource::new(nsg_id.to_string()));
                Ok(())
            },
        )
        .await?;

        data.set_id(subnet.id.to_string());
        data.set("subnet_id", subnet.id.to_string());
        data.set("network_security_group_id", nsg_id.to_string());
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let subnet = SubnetRef::from_state(data)?;

        let vnet = match ResourceClient::<VirtualNetwork>::get(self.ctx.client(), &subnet.vnet_id)
            .await
        {
            Ok(vnet) => vnet,
            Err(e) if e.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let nsg = vnet
            .subnet(&subnet.name)
            .and_then(|s| s.properties.network_security_group.as_ref());
        match nsg {
            Some(nsg) => {
                data.set("subnet_id", subnet.id.to_string());
                data.set("network_security_group_id", &nsg.id);
            }
            None => {
                tracing::warn!(
                    "Subnet {} has no network security group, removing association from state",
                    subnet.id
                );
                data.clear_id();
            }
        }
        Ok(())
    }

    async fn update(&self, _data: &mut ResourceData) -> Result<()> {
        // Both attributes force replacement.
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let subnet = SubnetRef::from_state(data)?;

        // The group to lock is whatever the subnet points at right now.
        let vnet = match ResourceClient::<VirtualNetwork>::get(self.ctx.client(), &subnet.vnet_id)
            .await
        {
            Ok(vnet) => vnet,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        let Some(nsg) = vnet
            .subnet(&subnet.name)
            .and_then(|s| s.properties.network_security_group.clone())
        else {
            return Ok(());
        };
        let keys = subnet.keys(&ResourceId::parse(&nsg.id)?)?;

        let result = read_modify_write(
            self.ctx.locks(),
            keys.as_slice(),
            self.ctx.client(),
            &subnet.vnet_id,
            self.ctx.poll(),
            |vnet: &mut VirtualNetwork| {
                let target = vnet
                    .subnet_mut(&subnet.name)
                    .ok_or_else(|| CloudError::ResourceNotFound(subnet.id.to_string()))?;
                target.properties.network_security_group = None;
                Ok(())
            },
        )
        .await
        .map(|_| ());

        ignore_not_found(result)
    }
}
