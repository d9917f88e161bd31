//! Armature named locks
//!
//! Per-name mutual exclusion for resource handlers that mutate a shared
//! remote aggregate. Two operations that lock the same name run one after
//! the other; operations on different names never wait on each other.
//!
//! ```text
//! handler ──lock_all([vnet, nsg])──► NamedLocks ──► per-key tokio Mutex
//!    │                                   │
//!    │  read ─► merge ─► write ─► poll   └─ map lock (held only for lookup)
//!    ▼
//! guard dropped ──► keys released
//! ```
//!
//! # Example
//!
//! ```ignore
//! use armature_locks::{NamedLocks, lock_key};
//!
//! let locks = NamedLocks::new();
//! let _guard = locks
//!     .lock(&lock_key("azurerm_virtual_network", "vnet-a"))
//!     .await;
//! // read-modify-write the virtual network here
//! ```

pub mod key;
pub mod registry;

pub use key::lock_key;
pub use registry::{MultiLockGuard, NamedLockGuard, NamedLocks};
