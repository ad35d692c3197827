//! # dsv-store
//!
//! Namespaced key-value backends for [`dsv-migrate`](https://docs.rs/dsv-migrate).
//!
//! Every backend exposes the same [`StateStore`] contract: opaque byte values
//! addressed by `(namespace, key)`. Namespaces keep each schema version's
//! records and the persisted version marker apart inside one physical store.
//!
//! ## Quick Start
//!
//! ```
//! use dsv_store::{MemoryStore, StateStore};
//!
//! let mut store = MemoryStore::new();
//! store.put("v1", "sensor-42", b"hello").unwrap();
//! let data = store.get("v1", "sensor-42").unwrap();
//! assert_eq!(data.as_deref(), Some(b"hello".as_slice()));
//! ```
//!
//! ## Backends
//!
//! | Backend | Feature flag | Use case |
//! |---------|-------------|----------|
//! | [`MemoryStore`] | *(always available)* | Testing, prototyping |
//! | `SqliteStore` | `sqlite` | Edge Linux, mobile, desktop |
//! | `RedbStore` | `redb` | Pure-Rust edge without C deps |
//!
//! [`SharedStore`] wraps any backend in a cloneable handle so a migration
//! runner and a record accessor can work on the same store.

mod memory;
#[cfg(feature = "redb")]
mod redb;
mod shared;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use memory::{MemoryError, MemoryStore};
#[cfg(feature = "redb")]
pub use redb::{RedbError, RedbStore};
pub use shared::SharedStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteStore};
pub use traits::*;
