//! Read-modify-write of shared remote aggregates
//!
//! Child resources such as subnets or security rules live inside a parent
//! object on the remote side. Changing one means fetching the whole parent,
//! editing it and writing it back, and two handlers doing that at once
//! would silently drop one of the edits. Every such round trip goes through
//! [`read_modify_write`], which holds the parent's named locks from the read
//! until the write has finished applying.

use crate::client::ResourceClient;
use crate::error::{CloudError, Result};
use crate::operation::PollConfig;
use crate::resource_id::ResourceId;
use armature_locks::NamedLocks;

/// Read `id`, apply `modify`, write the result back and wait for it to
/// complete, all while holding every key in `keys`.
///
/// - `modify` receives the freshly read remote object and must merge its
///   change into it; fields it does not own must be left untouched.
/// - A missing object fails with `CloudError::ResourceNotFound`.
/// - Errors from `modify`, the write, or polling are returned as-is. The
///   keys are released on every path, including cancellation.
pub async fn read_modify_write<M, C, K, F>(
    locks: &NamedLocks,
    keys: &[K],
    client: &C,
    id: &ResourceId,
    poll: &PollConfig,
    modify: F,
) -> Result<M>
where
    M: Send + Sync + 'static,
    C: ResourceClient<M> + ?Sized,
    K: AsRef<str>,
    F: FnOnce(&mut M) -> Result<()>,
{
    let guard = locks.lock_all(keys).await;
    tracing::debug!(
        "Read-modify-write of {} holding [{}]",
        id,
        guard.keys().collect::<Vec<_>>().join(", ")
    );

    let mut current = client.get(id).await?;
    modify(&mut current)?;

    let updated = client
        .create_or_update(id, &current)
        .await?
        .wait(poll)
        .await?;

    guard.unlock();
    Ok(updated)
}

/// Fail with `ResourceAlreadyExists` if `id` already exists remotely.
///
/// Create paths call this so an unmanaged remote object is imported
/// instead of being overwritten.
pub async fn ensure_absent<M, C>(client: &C, id: &ResourceId) -> Result<()>
where
    M: Send + Sync + 'static,
    C: ResourceClient<M> + ?Sized,
{
    match client.get(id).await {
        Ok(_) => Err(CloudError::ResourceAlreadyExists(id.to_string())),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete `id` and wait for completion; an object that is already gone
/// counts as deleted.
pub async fn delete_if_exists<M, C>(client: &C, id: &ResourceId, poll: &PollConfig) -> Result<()>
where
    M: Send + Sync + 'static,
    C: ResourceClient<M> + ?Sized,
{
    let operation = match client.delete(id).await {
        Ok(operation) => operation,
        Err(e) if e.is_not_found() => {
            tracing::debug!("{} already deleted", id);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    match operation.wait(poll).await {
        Err(e) if e.is_not_found() => Ok(()),
        result => result,
    }
}
