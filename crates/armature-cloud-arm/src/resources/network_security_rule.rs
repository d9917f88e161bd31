use super::{ignore_not_found, one_of, required_str, state_id};
use crate::context::{NetworkContext, network_security_group_key};
use crate::models::{NetworkSecurityGroup, SecurityRule, SecurityRuleProperties};
use armature_cloud::{
    Attribute, AttributeType, CloudError, Resource, ResourceClient, ResourceData, ResourceId,
    Result, Schema, read_modify_write,
};
use async_trait::async_trait;

pub const NETWORK_SECURITY_RULE_TYPE: &str = "azurerm_network_security_rule";

const MIN_PRIORITY: i64 = 100;
const MAX_PRIORITY: i64 = 4096;

const PROTOCOLS: &[&str] = &["Tcp", "Udp", "Icmp", "Esp", "Ah", "*"];
const ACCESSES: &[&str] = &["Allow", "Deny"];
const DIRECTIONS: &[&str] = &["Inbound", "Outbound"];

/// Optional range and prefix attributes that default to "any"
const WILDCARD_ATTRIBUTES: &[&str] = &[
    "source_port_range",
    "destination_port_range",
    "source_address_prefix",
    "destination_address_prefix",
];

/// `azurerm_network_security_rule`
///
/// Rules live in their security group's `securityRules` list and are
/// changed through a read-modify-write of the group.
pub struct NetworkSecurityRuleResource {
    ctx: NetworkContext,
}

impl NetworkSecurityRuleResource {
    pub fn new(ctx: NetworkContext) -> Self {
        Self { ctx }
    }
}

fn split_id(id: &ResourceId) -> Result<(ResourceId, String, String)> {
    let nsg_name = id.require_segment("networkSecurityGroups")?.to_string();
    let name = id.require_segment("securityRules")?.to_string();
    let nsg_id = id.parent().ok_or_else(|| {
        CloudError::InvalidResourceId(format!("{}: security rule has no parent", id))
    })?;
    Ok((nsg_id, nsg_name, name))
}

fn expand(data: &ResourceData) -> Result<SecurityRuleProperties> {
    let priority: i64 = data
        .get("priority")
        .ok_or_else(|| CloudError::Validation("\"priority\" is required".to_string()))?;
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(CloudError::Validation(format!(
            "\"priority\" must be between {} and {}, got {}",
            MIN_PRIORITY, MAX_PRIORITY, priority
        )));
    }

    let wildcard = |key: &str| data.get_str(key).unwrap_or("*").to_string();

    Ok(SecurityRuleProperties {
        description: data.get_str("description").map(str::to_string),
        protocol: one_of("protocol", &required_str(data, "protocol")?, PROTOCOLS)?.to_string(),
        access: one_of("access", &required_str(data, "access")?, ACCESSES)?.to_string(),
        direction: one_of("direction", &required_str(data, "direction")?, DIRECTIONS)?
            .to_string(),
        priority,
        source_port_range: wildcard("source_port_range"),
        destination_port_range: wildcard("destination_port_range"),
        source_address_prefix: wildcard("source_address_prefix"),
        destination_address_prefix: wildcard("destination_address_prefix"),
        ..SecurityRuleProperties::default()
    })
}

fn flatten(data: &mut ResourceData, id: &ResourceId, rule: &SecurityRule) {
    let props = &rule.properties;
    data.set("name", id.name());
    data.set("resource_group_name", id.resource_group());
    data.set("network_security_group_name", id.segment("networkSecurityGroups"));
    data.set("description", &props.description);
    data.set("protocol", &props.protocol);
    data.set("access", &props.access);
    data.set("direction", &props.direction);
    data.set("priority", props.priority);
    data.set("source_port_range", &props.source_port_range);
    data.set("destination_port_range", &props.destination_port_range);
    data.set("source_address_prefix", &props.source_address_prefix);
    data.set("destination_address_prefix", &props.destination_address_prefix);
}

/// Fail if another rule of the group already uses `priority` in the same
/// direction
fn check_priority_free(
    nsg: &NetworkSecurityGroup,
    name: &str,
    rule: &SecurityRuleProperties,
) -> Result<()> {
    let clash = nsg.properties.security_rules.iter().find(|other| {
        !other.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name))
            && other.properties.priority == rule.priority
            && other.properties.direction.eq_ignore_ascii_case(&rule.direction)
    });
    match clash {
        Some(other) => Err(CloudError::Validation(format!(
            "priority {} is already used by rule {} in direction {}",
            rule.priority,
            other.name.as_deref().unwrap_or_default(),
            rule.direction
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl Resource for NetworkSecurityRuleResource {
    fn type_name(&self) -> &'static str {
        NETWORK_SECURITY_RULE_TYPE
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::new()
            .with_attribute("name", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "resource_group_name",
                Attribute::required(AttributeType::String).force_new(),
            )
            .with_attribute(
                "network_security_group_name",
                Attribute::required(AttributeType::String).force_new(),
            )
            .with_attribute("description", Attribute::optional(AttributeType::String))
            .with_attribute("protocol", Attribute::required(AttributeType::String))
            .with_attribute("access", Attribute::required(AttributeType::String))
            .with_attribute("direction", Attribute::required(AttributeType::String))
            .with_attribute("priority", Attribute::required(AttributeType::Int));
        for name in WILDCARD_ATTRIBUTES {
            schema = schema.with_attribute(
                *name,
                Attribute::optional_computed(AttributeType::String)
                    .with_description("Defaults to \"*\""),
            );
        }
        schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let name = required_str(data, "name")?;
        let resource_group = required_str(data, "resource_group_name")?;
        let nsg_name = required_str(data, "network_security_group_name")?;
        let properties = expand(data)?;

        let nsg_id = self.ctx.network_security_group_id(&resource_group, &nsg_name);
        let id = nsg_id.child("securityRules", &name);

        let updated = read_modify_write(
            self.ctx.locks(),
            &[network_security_group_key(&nsg_name)],
            self.ctx.client(),
            &nsg_id,
            self.ctx.poll(),
            |nsg: &mut NetworkSecurityGroup| {
                if nsg.rule(&name).is_some() {
                    return Err(CloudError::ResourceAlreadyExists(id.to_string()));
                }
                check_priority_free(nsg, &name, &properties)?;
                nsg.properties.security_rules.push(SecurityRule {
                    id: None,
                    name: Some(name.clone()),
                    properties,
                });
                Ok(())
            },
        )
        .await?;

        data.set_id(id.to_string());
        if let Some(rule) = updated.rule(&name) {
            flatten(data, &id, rule);
        }
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let (nsg_id, _, name) = split_id(&id)?;

        let client = self.ctx.client();
        let nsg = match ResourceClient::<NetworkSecurityGroup>::get(client, &nsg_id).await {
            Ok(nsg) => nsg,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "Network security group {} was not found, removing rule from state",
                    nsg_id
                );
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match nsg.rule(&name) {
            Some(rule) => flatten(data, &id, rule),
            None => {
                tracing::warn!("Security rule {} was not found, removing from state", id);
                data.clear_id();
            }
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let (nsg_id, nsg_name, name) = split_id(&id)?;
        let properties = expand(data)?;

        let updated = read_modify_write(
            self.ctx.locks(),
            &[network_security_group_key(&nsg_name)],
            self.ctx.client(),
            &nsg_id,
            self.ctx.poll(),
            |nsg: &mut NetworkSecurityGroup| {
                check_priority_free(nsg, &name, &properties)?;
                let rule = nsg
                    .rule_mut(&name)
                    .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
                let mut extra = std::mem::take(&mut rule.properties.extra);
                for plural in SecurityRuleProperties::PLURAL_FIELDS {
                    extra.remove(plural);
                }
                rule.properties = SecurityRuleProperties {
                    extra,
                    ..properties
                };
                Ok(())
            },
        )
        .await?;

        if let Some(rule) = updated.rule(&name) {
            flatten(data, &id, rule);
        }
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let id = state_id(data)?;
        let (nsg_id, nsg_name, name) = split_id(&id)?;

        let result = read_modify_write(
            self.ctx.locks(),
            &[network_security_group_key(&nsg_name)],
            self.ctx.client(),
            &nsg_id,
            self.ctx.poll(),
            |nsg: &mut NetworkSecurityGroup| {
                if nsg.remove_rule(&name) {
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
