//! Resource provider registration bookkeeping
//!
//! A subscription can only create resources of a namespace (for example
//! `Microsoft.Network`) once that namespace is registered. The provider
//! checks the namespaces it needs when it is configured and registers the
//! missing ones.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

/// Registration state of a namespace within a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegistrationState {
    Registered,
    NotRegistered,
    Registering,
    Unregistering,
    Other(String),
}

impl From<&str> for RegistrationState {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("Registered") {
            RegistrationState::Registered
        } else if value.eq_ignore_ascii_case("NotRegistered") {
            RegistrationState::NotRegistered
        } else if value.eq_ignore_ascii_case("Registering") {
            RegistrationState::Registering
        } else if value.eq_ignore_ascii_case("Unregistering") {
            RegistrationState::Unregistering
        } else {
            RegistrationState::Other(value.to_string())
        }
    }
}

impl From<String> for RegistrationState {
    fn from(value: String) -> Self {
        RegistrationState::from(value.as_str())
    }
}

impl From<RegistrationState> for String {
    fn from(state: RegistrationState) -> Self {
        state.to_string()
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationState::Registered => write!(f, "Registered"),
            RegistrationState::NotRegistered => write!(f, "NotRegistered"),
            RegistrationState::Registering => write!(f, "Registering"),
            RegistrationState::Unregistering => write!(f, "Unregistering"),
            RegistrationState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One namespace and its state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRegistration {
    pub namespace: String,
    pub registration_state: RegistrationState,
}

impl ProviderRegistration {
    pub fn new(namespace: impl Into<String>, state: RegistrationState) -> Self {
        Self {
            namespace: namespace.into(),
            registration_state: state,
        }
    }
}

/// Access to a subscription's resource provider registrations
#[async_trait]
pub trait ProviderRegistrar: Send + Sync {
    /// Every namespace the subscription knows about
    async fn list_states(&self) -> Result<Vec<ProviderRegistration>>;

    /// Request registration of `namespace`
    async fn register(&self, namespace: &str) -> Result<()>;
}

/// Namespaces the provider's resources depend on
pub fn required_resource_providers() -> Vec<&'static str> {
    vec![
        "Microsoft.Authorization",
        "Microsoft.Compute",
        "Microsoft.KeyVault",
        "Microsoft.Network",
        "Microsoft.Resources",
        "Microsoft.Sql",
        "Microsoft.Storage",
    ]
}

/// Namespaces from `required` that are not in the `Registered` state.
///
/// Namespace comparison ignores case; a namespace missing from `states`
/// counts as unregistered.
pub fn unregistered<'a>(required: &[&'a str], states: &[ProviderRegistration]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|namespace| {
            !states.iter().any(|s| {
                s.namespace.eq_ignore_ascii_case(namespace)
                    && s.registration_state == RegistrationState::Registered
            })
        })
        .collect()
}

/// Register every namespace of `required` that is not registered yet.
///
/// Registrations run concurrently. Returns the namespaces that were
/// registered; the first failure is reported as
/// `CloudError::ProviderRegistration`.
pub async fn ensure_registered<R>(registrar: &R, required: &[&str]) -> Result<Vec<String>>
where
    R: ProviderRegistrar + ?Sized,
{
    let states = registrar.list_states().await?;
    let missing = unregistered(required, &states);

    if missing.is_empty() {
        tracing::debug!("All {} resource providers registered", required.len());
        return Ok(Vec::new());
    }

    let results = join_all(missing.iter().map(|namespace| async move {
        tracing::info!("Registering resource provider {}", namespace);
        registrar
            .register(namespace)
            .await
            .map_err(|e| {
                CloudError::ProviderRegistration(format!(
                    "cannot register provider {} with Azure Resource Manager: {}",
                    namespace, e
                ))
            })
            .map(|()| namespace.to_string())
    }))
    .await;

    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_str_ignores_case() {
        assert_eq!(RegistrationState::from("registered"), RegistrationState::Registered);
        assert_eq!(
            RegistrationState::from("NotRegistered"),
            RegistrationState::NotRegistered
        );
        assert_eq!(
            RegistrationState::from("Pending"),
            RegistrationState::Other("Pending".into())
        );
    }

    #[test]
    fn test_state_serde_round_trip() {
        let reg: ProviderRegistration = serde_json::from_str(
            r#"{"namespace":"Microsoft.Network","registrationState":"Registered"}"#,
        )
        .unwrap();
        assert_eq!(reg.registration_state, RegistrationState::Registered);
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["registrationState"], "Registered");
    }

    #[test]
    fn test_unregistered() {
        let states = vec![
            ProviderRegistration::new("microsoft.network", RegistrationState::Registered),
            ProviderRegistration::new("Microsoft.Storage", RegistrationState::Registering),
            ProviderRegistration::new("Microsoft.Sql", RegistrationState::NotRegistered),
        ];
        let required = [
            "Microsoft.Network",
            "Microsoft.Storage",
            "Microsoft.Sql",
            "Microsoft.Compute",
        ];

        assert_eq!(
            unregistered(&required, &states),
            vec!["Microsoft.Storage", "Microsoft.Sql", "Microsoft.Compute"]
        );
    }

    #[test]
    fn test_required_providers_are_sorted_and_unique() {
        let required = required_resource_providers();
        let mut sorted = required.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(required, sorted);
        assert!(required.contains(&"Microsoft.Network"));
    }
}
