//! Per-operation deadlines

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;

/// CRUD operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Read => write!(f, "read"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// Deadlines for each CRUD operation of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

impl Timeouts {
    pub fn for_operation(&self, kind: OperationKind) -> Duration {
        match kind {
            OperationKind::Create => self.create,
            OperationKind::Read => self.read,
            OperationKind::Update => self.update,
            OperationKind::Delete => self.delete,
        }
    }

    /// Run `fut`, failing with `CloudError::Timeout` once the deadline for
    /// `kind` passes.
    ///
    /// The future is dropped on timeout, which releases any named locks it
    /// holds.
    pub async fn run<T, F>(&self, kind: OperationKind, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.for_operation(kind);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("{} did not complete within {:?}", kind, limit);
                Err(CloudError::Timeout(format!(
                    "{} did not complete within {:?}",
                    kind, limit
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.for_operation(OperationKind::Read), Duration::from_secs(300));
        assert_eq!(timeouts.for_operation(OperationKind::Create), Duration::from_secs(1800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_within_deadline() {
        let timeouts = Timeouts::default();
        let value = timeouts
            .run(OperationKind::Read, async { Ok::<_, CloudError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let timeouts = Timeouts {
            update: Duration::from_secs(1),
            ..Timeouts::default()
        };
        let err = timeouts
            .run(OperationKind::Update, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, CloudError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Timeout(_)));
    }
}
