use super::{ignore_not_found, required_str, state_id};
use crate::context::{NetworkContext, virtual_network_key};
use crate::models::{Subnet, SubnetProperties, VirtualNetwork};
use armature_cloud::{
    Attribute, AttributeType, CloudError, Resource, ResourceClient, ResourceData, ResourceId,
    Result, Schema, read_modify_write,
};
use async_trait::async_trait;

pub const SUBNET_TYPE: &str = "azurerm_subnet";

/// `azurerm_subnet`
///
/// Subnets are entries of their virtual network's `subnets` list, so every
/// change is a read-modify-write of the parent under the parent's lock.
pub struct SubnetResource {
    ctx: NetworkContext,
}

impl SubnetResource {
    pub fn new(ctx: NetworkContext) -> Self {
        Self { ctx }
    }
}

/// Parent virtual network ID, virtual network name and subnet name
fn split_id(id: &ResourceId) -> Result<(ResourceId, String, String)> {
    let vnet_name = id.require_segment("virtualNetworks")?.to_string();
    let name = id.require_segment("subnets")?.to_string();
    let vnet_id = id.parent().ok_or_else(|| {
        CloudError::InvalidResourceId(format!("{}: subnet has no parent", id))
    })?;
    Ok((vnet_id, vnet_name, name))
}

fn flatten(data: &mut ResourceData, id: &ResourceId, subnet: &Subnet) {
    data.set("name", id.name());
    data.set("resource_group_name", id.resource_group());
    data.set("virtual_network_name", id.segment("virtualNetworks"));
    data.set("address_prefix", &subnet.properties.address_prefix);
    data.set(
        "network_security_group_id",
        subnet
            .properties
            .network_security_group
            .as_ref()
            .map(|nsg| nsg.id.as_str()),
    );
}

#[async_trait]
impl Resource for SubnetResource {
    fn type_name(&self) -> &'static str {
        SUBNET_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("name", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "resource_group_name",
                Attribute::required(AttributeType::String).force_new(),
            )
            .with_attribute(
                "virtual_network_name",
                Attribute::required(AttributeType::String).force_new(),
            )
            .with_attribute("address_prefix", Attribute::required(AttributeType::String))
            .with_attribute(
                "network_security_group_id",
                Attribute::computed(AttributeType::String),
            )
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let name = required_str(data, "name")?;
        let resource_group = required_str(data, "resource_group_name")?;
        let vnet_name = required_str(data, "virtual_network_name")?;
        let address_prefix = required_str(data, "address_prefix")?;

        let vnet_id = self.ctx.virtual_network_id(&resource_group, &vnet_name);
        let id = vnet_id.child("subnets", &name);

        let updated = read_modify_write(
            self.ctx.locks(),
            &[virtual_network_key(&vnet_name)],
            self.ctx.client(),
            &vnet_id,
            self.ctx.poll(),
            |vnet: &mut VirtualNetwork| {
                if vnet.subnet(&name).is_some() {
                    return Err(CloudError::ResourceAlreadyExists(id.to_string()));
                }
                vnet.properties.subnets.push(Subnet {
                    id: None,
                    name: Some(name.clone()),
                    properties: SubnetProperties {
                        address_prefix: Some(address_prefix),
                        ..SubnetProperties::default()
                    },
                });
                Ok(())
            },
        )
        .await?;

        data.set_id(id.to_string());
        if let Some(subnet) = updated.subnet(&name) {
            flatten(data, &id, subnet);
        }
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let (vnet_id, _, name) = split_id(&id)?;

        let vnet = match ResourceClient::<VirtualNetwork>::get(self.ctx.client(), &vnet_id).await {
            Ok(vnet) => vnet,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "Virtual network {} was not found, removing subnet from state",
                    vnet_id
                );
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match vnet.subnet(&name) {
            Some(subnet) => flatten(data, &id, subnet),
            None => {
                tracing::warn!("Subnet {} was not found, removing from state", id);
                data.clear_id();
            }
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let (vnet_id, vnet_name, name) = split_id(&id)?;
        let address_prefix = required_str(data, "address_prefix")?;

        let updated = read_modify_write(
            self.ctx.locks(),
            &[virtual_network_key(&vnet_name)],
            self.ctx.client(),
            &vnet_id,
            self.ctx.poll(),
            |vnet: &mut VirtualNetwork| {
                let subnet = vnet
                    .subnet_mut(&name)
                    .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
                subnet.properties.address_prefix = Some(address_prefix);
                Ok(())
            },
        )
        .await?;

        if let Some(subnet) = updated.subnet(&name) {
            flatten(data, &id, subnet);
        }
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let (vnet_id, vnet_name, name) = split_id(&id)?;

        let result = read_modify_write(
            self.ctx.locks(),
            &[virtual_network_key(&vnet_name)],
            self.ctx.client(),
            &vnet_id,
            self.ctx.poll(),
            |vnet: &mut VirtualNetwork| {
                if vnet.remove_subnet(&name) {
                    Ok(())
                } else {
                    Err(CloudError::ResourceNotFound(id.to_string()))
                }
            },
        )
        .await
        .map(|_| ());

        ignore_not_found(result)
    }
}
