use super::{required_str, state_id};
use crate::context::{NetworkContext, VIRTUAL_NETWORK_TYPE, virtual_network_key};
use crate::models::{AddressSpace, DhcpOptions, VirtualNetwork};
use armature_cloud::normalize::{expand_tags, flatten_tags, normalize_location};
use armature_cloud::{
    Attribute, AttributeType, CloudError, Resource, ResourceClient, ResourceData, ResourceId,
    Result, Schema, delete_if_exists, ensure_absent, read_modify_write,
};
use async_trait::async_trait;

/// `azurerm_virtual_network`
///
/// Subnets are managed by [`SubnetResource`](super::SubnetResource); this
/// handler never adds or removes entries of the remote subnet list.
pub struct VirtualNetworkResource {
    ctx: NetworkContext,
}

impl VirtualNetworkResource {
    pub fn new(ctx: NetworkContext) -> Self {
        Self { ctx }
    }
}

/// Copy the configured fields this resource owns onto `vnet`
fn apply_config(vnet: &mut VirtualNetwork, data: &ResourceData) -> Result<()> {
    let address_prefixes: Vec<String> = data.get("address_space").unwrap_or_default();
    if address_prefixes.is_empty() {
        return Err(CloudError::Validation(
            "\"address_space\" must contain at least one prefix".to_string(),
        ));
    }
    vnet.properties.address_space = Some(AddressSpace { address_prefixes });

    let dns_servers: Vec<String> = data.get("dns_servers").unwrap_or_default();
    vnet.properties.dhcp_options = if dns_servers.is_empty() {
        None
    } else {
        Some(DhcpOptions { dns_servers })
    };

    vnet.tags = expand_tags(data.raw("tags"))?;
    Ok(())
}

fn flatten(data: &mut ResourceData, id: &ResourceId, vnet: &VirtualNetwork) {
    data.set("name", id.name());
    data.set("resource_group_name", id.resource_group());
    if let Some(location) = &vnet.location {
        data.set("location", normalize_location(location));
    }
    data.set(
        "address_space",
        vnet.properties
            .address_space
            .as_ref()
            .map(|a| a.address_prefixes.clone())
            .unwrap_or_default(),
    );
    data.set(
        "dns_servers",
        vnet.properties
            .dhcp_options
            .as_ref()
            .map(|d| d.dns_servers.clone())
            .unwrap_or_default(),
    );
    data.set("tags", flatten_tags(Some(&vnet.tags)));
    data.set(
        "subnet_names",
        vnet.properties
            .subnets
            .iter()
            .filter_map(|s| s.name.clone())
            .collect::<Vec<_>>(),
    );
}

#[async_trait]
impl Resource for VirtualNetworkResource {
    fn type_name(&self) -> &'static str {
        VIRTUAL_NETWORK_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("name", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "resource_group_name",
                Attribute::required(AttributeType::String).force_new(),
            )
            .with_attribute("location", Attribute::required(AttributeType::String).force_new())
            .with_attribute("address_space", Attribute::required(AttributeType::List))
            .with_attribute("dns_servers", Attribute::optional(AttributeType::List))
            .with_attribute("tags", Attribute::optional(AttributeType::Map))
            .with_attribute(
                "subnet_names",
                Attribute::computed(AttributeType::List)
                    .with_description("Subnets present in the remote object"),
            )
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let name = required_str(data, "name")?;
        let resource_group = required_str(data, "resource_group_name")?;
        let location = required_str(data, "location")?;
        let id = self.ctx.virtual_network_id(&resource_group, &name);

        let mut vnet = VirtualNetwork {
            name: Some(name.clone()),
            location: Some(normalize_location(&location)),
            ..VirtualNetwork::default()
        };
        apply_config(&mut vnet, data)?;

        let guard = self.ctx.locks().lock(&virtual_network_key(&name)).await;
        ensure_absent::<VirtualNetwork, _>(self.ctx.client(), &id).await?;
        let created =
            ResourceClient::<VirtualNetwork>::create_or_update(self.ctx.client(), &id, &vnet)
                .await?
                .wait(self.ctx.poll())
                .await?;
        guard.unlock();

        data.set_id(id.to_string());
        flatten(data, &id, &created);
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        match ResourceClient::<VirtualNetwork>::get(self.ctx.client(), &id).await {
            Ok(vnet) => {
                flatten(data, &id, &vnet);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Virtual network {} was not found, removing from state", id);
                data.clear_id();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let name = id.require_segment("virtualNetworks")?.to_string();

        let updated = read_modify_write(
            self.ctx.locks(),
            &[virtual_network_key(&name)],
            self.ctx.client(),
            &id,
            self.ctx.poll(),
            |vnet: &mut VirtualNetwork| apply_config(vnet, data),
        )
        .await?;

        flatten(data, &id, &updated);
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let name = id.require_segment("virtualNetworks")?;

        let _guard = self.ctx.locks().lock(&virtual_network_key(name)).await;
        delete_if_exists::<VirtualNetwork, _>(self.ctx.client(), &id, self.ctx.poll()).await
    }
}
