//! Armature cloud provider core
//!
//! This crate provides the pieces every armature resource handler is built
//! from: resource IDs, the attribute accessor handed over by the engine,
//! schema declarations, remote clients with long-running operations, and
//! the locked read-modify-write protocol for shared remote aggregates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           declarative engine (external)          │
//! │        create / read / update / delete           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ResourceData
//! ┌─────────────────▼───────────────────────────────┐
//! │                armature-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Provider ─► trait Resource { ... }       │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐    │
//! │  │ NamedLocks   │  │ read_modify_write    │    │
//! │  └──────────────┘  └──────────────────────┘    │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │ ResourceClient<M>
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  ARM REST     │ │  in-memory    │
//! │  (reqwest)    │ │  backend      │
//! └───────────────┘ └───────────────┘
//! ```

pub mod client;
pub mod error;
pub mod in_memory;
pub mod normalize;
pub mod operation;
pub mod protocol;
pub mod provider;
pub mod registration;
pub mod resource;
pub mod resource_id;
pub mod schema;
pub mod timeouts;

// Re-exports
pub use armature_locks::{MultiLockGuard, NamedLockGuard, NamedLocks, lock_key};
pub use client::ResourceClient;
pub use error::{CloudError, Result};
pub use in_memory::{InMemoryClient, InMemoryRegistrar};
pub use operation::{Operation, PollConfig, PollOperation, PollStatus};
pub use protocol::{delete_if_exists, ensure_absent, read_modify_write};
pub use provider::{Provider, Resource};
pub use registration::{
    ProviderRegistrar, ProviderRegistration, RegistrationState, ensure_registered,
    required_resource_providers, unregistered,
};
pub use resource::{Attributes, ResourceData};
pub use resource_id::ResourceId;
pub use schema::{Attribute, AttributeMode, AttributeType, Schema};
pub use timeouts::{OperationKind, Timeouts};
