//! ARM network models
//!
//! Only the fields the resources manage are typed. Everything else the API
//! returns is kept in `extra` so a read-modify-write round trip sends it
//! back unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Extra = BTreeMap<String, serde_json::Value>;

/// A top-level ARM object with its own `api-version`
pub trait ArmModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    const API_VERSION: &'static str;
}

const NETWORK_API_VERSION: &str = "2023-09-01";

/// Reference to another resource by ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    pub id: String,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: VirtualNetworkProperties,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ArmModel for VirtualNetwork {
    const API_VERSION: &'static str = NETWORK_API_VERSION;
}

impl VirtualNetwork {
    /// Subnet named `name`, compared case-insensitively
    pub fn subnet(&self, name: &str) -> Option<&Subnet> {
        self.properties
            .subnets
            .iter()
            .find(|s| s.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn subnet_mut(&mut self, name: &str) -> Option<&mut Subnet> {
        self.properties
            .subnets
            .iter_mut()
            .find(|s| s.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Remove the subnet named `name`; returns whether it was present
    pub fn remove_subnet(&mut self, name: &str) -> bool {
        let before = self.properties.subnets.len();
        self.properties
            .subnets
            .retain(|s| !s.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)));
        self.properties.subnets.len() != before
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<DhcpOptions>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpOptions {
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: NetworkSecurityGroupProperties,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ArmModel for NetworkSecurityGroup {
    const API_VERSION: &'static str = NETWORK_API_VERSION;
}

impl NetworkSecurityGroup {
    pub fn rule(&self, name: &str) -> Option<&SecurityRule> {
        self.properties
            .security_rules
            .iter()
            .find(|r| r.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn rule_mut(&mut self, name: &str) -> Option<&mut SecurityRule> {
        self.properties
            .security_rules
            .iter_mut()
            .find(|r| r.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.properties.security_rules.len();
        self.properties
            .security_rules
            .retain(|r| !r.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)));
        self.properties.security_rules.len() != before
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupProperties {
    #[serde(default)]
    pub security_rules: Vec<SecurityRule>,
    /// Read-only back references maintained by the API
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<SubResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: SecurityRuleProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub protocol: String,
    /// Empty when the rule uses the plural `sourcePortRanges` form
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_port_range: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination_port_range: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_address_prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination_address_prefix: String,
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SecurityRuleProperties {
    /// Plural forms that ARM rejects when sent next to their singular field
    pub const PLURAL_FIELDS: [&'static str; 4] = [
        "sourcePortRanges",
        "destinationPortRanges",
        "sourceAddressPrefixes",
        "destinationAddressPrefixes",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let body = json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet",
            "name": "vnet",
            "location": "westeurope",
            "etag": "W/\"1\"",
            "extendedLocation": {"name": "microsoftlosangeles1", "type": "EdgeZone"},
            "properties": {
                "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                "enableDdosProtection": false,
                "subnets": [{
                    "name": "frontend",
                    "properties": {
                        "addressPrefix": "10.0.1.0/24",
                        "serviceEndpoints": [{"service": "Microsoft.Storage"}]
                    }
                }]
            }
        });

        let vnet: VirtualNetwork = serde_json::from_value(body).unwrap();
        assert_eq!(vnet.properties.extra["enableDdosProtection"], json!(false));

        let back = serde_json::to_value(&vnet).unwrap();
        assert_eq!(back["etag"], "W/\"1\"");
        assert_eq!(back["extendedLocation"]["name"], "microsoftlosangeles1");
        assert_eq!(back["properties"]["enableDdosProtection"], json!(false));
        assert_eq!(
            back["properties"]["subnets"][0]["properties"]["serviceEndpoints"][0]["service"],
            "Microsoft.Storage"
        );
    }

    #[test]
    fn test_subnet_lookup_ignores_case() {
        let mut vnet = VirtualNetwork::default();
        vnet.properties.subnets.push(Subnet {
            name: Some("Frontend".into()),
            ..Subnet::default()
        });

        assert!(vnet.subnet("frontend").is_some());
        assert!(vnet.remove_subnet("FRONTEND"));
        assert!(!vnet.remove_subnet("frontend"));
    }

    #[test]
    fn test_security_rule_serializes_camel_case() {
        let rule = SecurityRule {
            name: Some("allow-ssh".into()),
            properties: SecurityRuleProperties {
                protocol: "Tcp".into(),
                source_port_range: "*".into(),
                destination_port_range: "22".into(),
                source_address_prefix: "*".into(),
                destination_address_prefix: "*".into(),
                access: "Allow".into(),
                priority: 100,
                direction: "Inbound".into(),
                ..SecurityRuleProperties::default()
            },
            ..SecurityRule::default()
        };

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["properties"]["destinationPortRange"], "22");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_security_group_keeps_top_level_fields() {
        let body = json!({
            "name": "nsg",
            "type": "Microsoft.Network/networkSecurityGroups",
            "etag": "W/\"7\"",
            "properties": {"securityRules": []}
        });

        let nsg: NetworkSecurityGroup = serde_json::from_value(body).unwrap();
        let back = serde_json::to_value(&nsg).unwrap();
        assert_eq!(back["type"], "Microsoft.Network/networkSecurityGroups");
        assert_eq!(back["etag"], "W/\"7\"");
    }

    #[test]
    fn test_rule_with_plural_ranges_round_trips() {
        let body = json!({
            "name": "web",
            "properties": {
                "protocol": "Tcp",
                "sourcePortRange": "*",
                "destinationPortRanges": ["80", "443"],
                "sourceAddressPrefixes": ["10.0.0.0/8", "192.168.0.0/16"],
                "destinationAddressPrefix": "*",
                "access": "Allow",
                "priority": 200,
                "direction": "Inbound"
            }
        });

        let rule: SecurityRule = serde_json::from_value(body).unwrap();
        assert!(rule.properties.destination_port_range.is_empty());

        let back = serde_json::to_value(&rule).unwrap();
        assert!(back["properties"].get("destinationPortRange").is_none());
        assert!(back["properties"].get("sourceAddressPrefix").is_none());
        assert_eq!(back["properties"]["destinationPortRanges"], json!(["80", "443"]));
        assert_eq!(back["properties"]["sourcePortRange"], "*");
    }
}
