//! Resource trait and provider registry

use crate::error::{CloudError, Result};
use crate::resource::ResourceData;
use crate::schema::Schema;
use crate::timeouts::{OperationKind, Timeouts};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// CRUD handlers for one resource type
///
/// Every resource type (virtual network, subnet, ...) implements this trait
/// to translate between [`ResourceData`] and the remote API.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name (e.g. "azurerm_subnet")
    fn type_name(&self) -> &'static str;

    /// Attribute declarations
    fn schema(&self) -> Schema;

    /// Deadlines for each operation
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Create the remote object and record its ID and computed attributes
    async fn create(&self, data: &mut ResourceData) -> Result<()>;

    /// Refresh attributes from the remote object.
    ///
    /// When the remote object no longer exists, clear the ID and return
    /// `Ok(())` so the engine drops it from state.
    async fn read(&self, data: &mut ResourceData) -> Result<()>;

    /// Push configuration changes to the remote object
    async fn update(&self, data: &mut ResourceData) -> Result<()>;

    /// Delete the remote object; an already-missing object is not an error
    async fn delete(&self, data: &mut ResourceData) -> Result<()>;
}

/// Named set of resource types exposed to the engine
pub struct Provider {
    name: String,
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    timeouts: Option<Timeouts>,
}

impl Provider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
            timeouts: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Resource + 'static) -> Self {
        self.register(Arc::new(resource));
        self
    }

    /// Override every resource's own timeouts
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn schemas(&self) -> BTreeMap<&'static str, Schema> {
        self.resources
            .iter()
            .map(|(name, resource)| (*name, resource.schema()))
            .collect()
    }

    pub fn resource(&self, resource_type: &str) -> Result<Arc<dyn Resource>> {
        self.resources.get(resource_type).cloned().ok_or_else(|| {
            CloudError::InvalidConfig(format!(
                "provider {} does not support resource type {}",
                self.name, resource_type
            ))
        })
    }

    fn timeouts_for(&self, resource: &dyn Resource) -> Timeouts {
        self.timeouts.unwrap_or_else(|| resource.timeouts())
    }

    pub async fn create(&self, resource_type: &str, data: &mut ResourceData) -> Result<()> {
        let resource = self.resource(resource_type)?;
        resource.schema().validate(data)?;

        tracing::info!("Creating {}", resource_type);
        self.timeouts_for(resource.as_ref())
            .run(OperationKind::Create, resource.create(data))
            .await?;
        tracing::info!("Created {} {}", resource_type, data.id().unwrap_or_default());
        Ok(())
    }

    pub async fn read(&self, resource_type: &str, data: &mut ResourceData) -> Result<()> {
        let resource = self.resource(resource_type)?;
        self.timeouts_for(resource.as_ref())
            .run(OperationKind::Read, resource.read(data))
            .await?;

        if data.is_new_resource() {
            tracing::info!("{} no longer exists remotely, removing from state", resource_type);
        }
        Ok(())
    }

    pub async fn update(&self, resource_type: &str, data: &mut ResourceData) -> Result<()> {
        let resource = self.resource(resource_type)?;
        resource.schema().validate(data)?;

        tracing::info!("Updating {} {}", resource_type, data.id().unwrap_or_default());
        self.timeouts_for(resource.as_ref())
            .run(OperationKind::Update, resource.update(data))
            .await
    }

    pub async fn delete(&self, resource_type: &str, data: &mut ResourceData) -> Result<()> {
        let resource = self.resource(resource_type)?;

        tracing::info!("Deleting {} {}", resource_type, data.id().unwrap_or_default());
        self.timeouts_for(resource.as_ref())
            .run(OperationKind::Delete, resource.delete(data))
            .await?;
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use serde_json::json;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl Resource for Echo {
        fn type_name(&self) -> &'static str {
            "test_echo"
        }

        fn schema(&self) -> Schema {
            Schema::new()
                .with_attribute("name", Attribute::required(AttributeType::String))
                .with_attribute("slow", Attribute::optional(AttributeType::Bool))
        }

        async fn create(&self, data: &mut ResourceData) -> Result<()> {
            if data.get_or("slow", false) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let name = data.get_str("name").unwrap_or_default().to_string();
            data.set_id(format!("/echo/{}", name));
            Ok(())
        }

        async fn read(&self, data: &mut ResourceData) -> Result<()> {
            if data.id() == Some("/echo/gone") {
                data.clear_id();
            }
            Ok(())
        }

        async fn update(&self, _data: &mut ResourceData) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _data: &mut ResourceData) -> Result<()> {
            Ok(())
        }
    }

    fn provider() -> Provider {
        Provider::new("test").with_resource(Echo)
    }

    #[tokio::test]
    async fn test_create_validates_then_dispatches() {
        let mut data = ResourceData::default().with_attribute("name", json!("a"));
        provider().create("test_echo", &mut data).await.unwrap();
        assert_eq!(data.id(), Some("/echo/a"));

        let mut invalid = ResourceData::default();
        let err = provider().create("test_echo", &mut invalid).await.unwrap_err();
        assert!(matches!(err, CloudError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let mut data = ResourceData::default();
        let err = provider().read("test_missing", &mut data).await.unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_read_of_gone_resource_clears_id() {
        let mut data =
            ResourceData::from_state("/echo/gone", Default::default(), Default::default());
        provider().read("test_echo", &mut data).await.unwrap();
        assert!(data.is_new_resource());
    }

    #[tokio::test]
    async fn test_delete_clears_id() {
        let mut data = ResourceData::from_state("/echo/a", Default::default(), Default::default());
        provider().delete("test_echo", &mut data).await.unwrap();
        assert!(data.id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_override_applies() {
        let provider = provider().with_timeouts(Timeouts {
            create: Duration::from_secs(5),
            ..Timeouts::default()
        });
        let mut data = ResourceData::default()
            .with_attribute("name", json!("a"))
            .with_attribute("slow", json!(true));

        let err = provider.create("test_echo", &mut data).await.unwrap_err();
        assert!(matches!(err, CloudError::Timeout(_)));
        assert!(data.is_new_resource());
    }

    #[test]
    fn test_schemas_listed_by_type() {
        let provider = provider();
        assert_eq!(provider.resource_types().collect::<Vec<_>>(), vec!["test_echo"]);
        assert!(provider.schemas()["test_echo"].get("name").is_some());
    }
}
