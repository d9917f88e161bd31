//! Remote resource client trait

use crate::error::Result;
use crate::operation::Operation;
use crate::resource_id::ResourceId;
use async_trait::async_trait;
use std::sync::Arc;

/// CRUD access to one kind of remote object `M`.
///
/// Implementations must report a missing object as
/// [`CloudError::ResourceNotFound`](crate::CloudError::ResourceNotFound) so
/// callers can tell "gone" apart from real failures.
#[async_trait]
pub trait ResourceClient<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    /// Fetch the current remote representation
    async fn get(&self, id: &ResourceId) -> Result<M>;

    /// Create or replace the remote object with `model`
    async fn create_or_update(&self, id: &ResourceId, model: &M) -> Result<Operation<M>>;

    /// Delete the remote object
    async fn delete(&self, id: &ResourceId) -> Result<Operation<()>>;
}

#[async_trait]
impl<M, C> ResourceClient<M> for Arc<C>
where
    M: Send + Sync + 'static,
    C: ResourceClient<M> + ?Sized,
{
    async fn get(&self, id: &ResourceId) -> Result<M> {
        (**self).get(id).await
    }

    async fn create_or_update(&self, id: &ResourceId, model: &M) -> Result<Operation<M>> {
        (**self).create_or_update(id, model).await
    }

    async fn delete(&self, id: &ResourceId) -> Result<Operation<()>> {
        (**self).delete(id).await
    }
}
