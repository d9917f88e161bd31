//! In-memory remote backend
//!
//! Stands in for the ARM API in tests and local runs. Objects are stored as
//! JSON keyed by lower-cased resource ID, so one client serves every model
//! type. Writes and deletes take effect when their operation completes,
//! which makes the poll loop part of every mutation just like the real API.

use crate::client::ResourceClient;
use crate::error::{CloudError, Result};
use crate::operation::{Operation, PollOperation, PollStatus};
use crate::registration::{ProviderRegistrar, ProviderRegistration, RegistrationState};
use crate::resource_id::ResourceId;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Objects = Arc<Mutex<HashMap<String, serde_json::Value>>>;

fn storage_key(id: &ResourceId) -> String {
    id.to_string().to_lowercase()
}

fn lock_objects(objects: &Objects) -> MutexGuard<'_, HashMap<String, serde_json::Value>> {
    objects.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`ResourceClient`] for any serde model
#[derive(Debug, Default)]
pub struct InMemoryClient {
    objects: Objects,
    read_delay: Duration,
    write_delay: Duration,
    pending_polls: u32,
    fail_next_write: Mutex<Option<(u16, String)>>,
    reads: AtomicUsize,
    writes: Arc<AtomicUsize>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `get` after the object has been read.
    ///
    /// The returned value is the state at the start of the delay, so
    /// concurrent read-modify-write cycles without locking lose updates.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Delay every write and delete before it is accepted
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Number of `InProgress` polls before a mutation takes effect
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Make the next write or delete fail with an API error
    pub fn fail_next_write(&self, status: u16, message: impl Into<String>) {
        *self
            .fail_next_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((status, message.into()));
    }

    /// Store `model` directly, bypassing delays and polling
    pub fn insert<M: Serialize>(&self, id: &ResourceId, model: &M) -> Result<()> {
        let value = serde_json::to_value(model)?;
        lock_objects(&self.objects).insert(storage_key(id), value);
        Ok(())
    }

    /// Read an object directly, bypassing delays
    pub fn fetch<M: DeserializeOwned>(&self, id: &ResourceId) -> Result<M> {
        let value = lock_objects(&self.objects)
            .get(&storage_key(id))
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Remove an object out of band, as if someone deleted it by hand
    pub fn remove(&self, id: &ResourceId) -> bool {
        lock_objects(&self.objects).remove(&storage_key(id)).is_some()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        lock_objects(&self.objects).contains_key(&storage_key(id))
    }

    pub fn len(&self) -> usize {
        lock_objects(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get` calls served
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of writes and deletes that took effect
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> Option<CloudError> {
        self.fail_next_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|(status, message)| CloudError::ApiError { status, message })
    }

    fn submit<T: Send + 'static>(
        &self,
        description: String,
        mutation: Mutation<T>,
    ) -> Operation<T> {
        if self.pending_polls == 0 {
            return Operation::completed(mutation.apply());
        }
        Operation::pending(
            description,
            PendingMutation {
                remaining: self.pending_polls,
                mutation: Some(mutation),
            },
        )
    }
}

enum Change {
    Put(serde_json::Value),
    Remove,
}

struct Mutation<T> {
    objects: Objects,
    writes: Arc<AtomicUsize>,
    key: String,
    change: Change,
    output: T,
}

impl<T> Mutation<T> {
    fn apply(self) -> T {
        let Mutation {
            objects,
            writes,
            key,
            change,
            output,
        } = self;

        {
            let mut objects = lock_objects(&objects);
            match change {
                Change::Put(value) => {
                    objects.insert(key, value);
                }
                Change::Remove => {
                    objects.remove(&key);
                }
            }
        }
        writes.fetch_add(1, Ordering::SeqCst);
        output
    }
}

struct PendingMutation<T> {
    remaining: u32,
    mutation: Option<Mutation<T>>,
}

#[async_trait]
impl<T: Send> PollOperation<T> for PendingMutation<T> {
    async fn poll(&mut self) -> Result<PollStatus<T>> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(PollStatus::InProgress { retry_after: None });
        }
        let mutation = self.mutation.take().ok_or_else(|| {
            CloudError::OperationFailed("operation polled after completion".to_string())
        })?;
        Ok(PollStatus::Done(mutation.apply()))
    }
}

#[async_trait]
impl<M> ResourceClient<M> for InMemoryClient
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, id: &ResourceId) -> Result<M> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let snapshot = lock_objects(&self.objects).get(&storage_key(id)).cloned();

        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }

        let value = snapshot.ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create_or_update(&self, id: &ResourceId, model: &M) -> Result<Operation<M>> {
        let value = serde_json::to_value(model)?;
        let output: M = serde_json::from_value(value.clone())?;

        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }

        tracing::debug!("PUT {}", id);
        let mutation = Mutation {
            objects: Arc::clone(&self.objects),
            writes: Arc::clone(&self.writes),
            key: storage_key(id),
            change: Change::Put(value),
            output,
        };
        Ok(self.submit(format!("PUT {}", id), mutation))
    }

    async fn delete(&self, id: &ResourceId) -> Result<Operation<()>> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        if !self.contains(id) {
            return Err(CloudError::ResourceNotFound(id.to_string()));
        }

        tracing::debug!("DELETE {}", id);
        let mutation = Mutation {
            objects: Arc::clone(&self.objects),
            writes: Arc::clone(&self.writes),
            key: storage_key(id),
            change: Change::Remove,
            output: (),
        };
        Ok(self.submit(format!("DELETE {}", id), mutation))
    }
}

/// In-memory [`ProviderRegistrar`]
#[derive(Debug, Default)]
pub struct InMemoryRegistrar {
    states: Mutex<BTreeMap<String, RegistrationState>>,
    failing: Mutex<BTreeSet<String>>,
    registered: Mutex<Vec<String>>,
}

impl InMemoryRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, namespace: &str, state: RegistrationState) -> Self {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), state);
        self
    }

    /// Make registration of `namespace` fail
    pub fn fail_registration(self, namespace: &str) -> Self {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_lowercase());
        self
    }

    /// Namespaces registered through this registrar, in call order
    pub fn registered(&self) -> Vec<String> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProviderRegistrar for InMemoryRegistrar {
    async fn list_states(&self) -> Result<Vec<ProviderRegistration>> {
        Ok(self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(ns, state)| ProviderRegistration::new(ns.clone(), state.clone()))
            .collect())
    }

    async fn register(&self, namespace: &str) -> Result<()> {
        let fails = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&namespace.to_lowercase());
        if fails {
            return Err(CloudError::ApiError {
                status: 403,
                message: format!("AuthorizationFailed for {}", namespace),
            });
        }

        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), RegistrationState::Registered);
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(namespace.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::PollConfig;
    use crate::registration::{ensure_registered, required_resource_providers};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        size: u32,
    }

    fn widget_id(name: &str) -> ResourceId {
        ResourceId::new("sub", "rg", "Test.Widgets").child("widgets", name)
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let client = InMemoryClient::new();
        let err = ResourceClient::<Widget>::get(&client, &widget_id("a"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.read_count(), 1);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let client = InMemoryClient::new();
        let widget = Widget {
            name: "a".into(),
            size: 3,
        };
        let stored = client
            .create_or_update(&widget_id("a"), &widget)
            .await
            .unwrap()
            .wait(&PollConfig::default())
            .await
            .unwrap();
        assert_eq!(stored, widget);

        let fetched: Widget = client.get(&widget_id("A")).await.unwrap();
        assert_eq!(fetched, widget);
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_write_applies_on_completion() {
        let client = InMemoryClient::new().with_pending_polls(2);
        let widget = Widget {
            name: "a".into(),
            size: 1,
        };

        let op = client.create_or_update(&widget_id("a"), &widget).await.unwrap();
        assert!(!op.is_completed());
        assert!(!client.contains(&widget_id("a")));

        op.wait(&PollConfig::default()).await.unwrap();
        assert!(client.contains(&widget_id("a")));
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let client = InMemoryClient::new();
        let widget = Widget {
            name: "a".into(),
            size: 1,
        };
        client.fail_next_write(409, "AnotherOperationInProgress");

        let err = client
            .create_or_update(&widget_id("a"), &widget)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ApiError { status: 409, .. }));
        assert!(client.create_or_update(&widget_id("a"), &widget).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete() {
        let client = InMemoryClient::new();
        client
            .insert(
                &widget_id("a"),
                &Widget {
                    name: "a".into(),
                    size: 1,
                },
            )
            .unwrap();

        ResourceClient::<Widget>::delete(&client, &widget_id("a"))
            .await
            .unwrap()
            .wait(&PollConfig::default())
            .await
            .unwrap();
        assert!(client.is_empty());

        let err = ResourceClient::<Widget>::delete(&client, &widget_id("a"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_registrar_registers_missing_namespaces() {
        let registrar = InMemoryRegistrar::new()
            .with_state("Microsoft.Network", RegistrationState::Registered)
            .with_state("Microsoft.Storage", RegistrationState::NotRegistered);

        let registered = ensure_registered(&registrar, &["Microsoft.Network", "Microsoft.Storage"])
            .await
            .unwrap();
        assert_eq!(registered, vec!["Microsoft.Storage".to_string()]);

        let again = ensure_registered(&registrar, &["Microsoft.Network", "Microsoft.Storage"])
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_registrar_failure_is_reported() {
        let registrar = InMemoryRegistrar::new().fail_registration("Microsoft.Sql");
        let err = ensure_registered(&registrar, &required_resource_providers())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ProviderRegistration(_)));
        assert!(err.to_string().contains("Microsoft.Sql"));
    }
}
