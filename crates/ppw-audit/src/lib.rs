//! PPW Audit - audit log event listener.
//!
//! Hooks the audit engine of `ppw-audit-core` into a mapping runtime's
//! post-write events and persists the resulting rows on the connection of
//! the triggering write.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ppw_audit::{AuditConfig, AuditLogEventListener, EventListeners, SledAuditStore};
//! use ppw_audit::audit_core::{AuditLogEntity, Catalog};
//!
//! let config = AuditConfig::new();
//! let store = SledAuditStore::from_config(&config);
//! let listener = Arc::new(AuditLogEventListener::<AuditLogEntity<u64>, _>::new(
//!     config,
//!     Arc::new(catalog),
//!     store,
//! ));
//!
//! let mut listeners = EventListeners::new();
//! listener.register(&mut listeners);
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod registry;
pub mod session;
pub mod store;

pub use config::{AuditConfig, DEFAULT_AUDIT_ENTITY_NAME, DEFAULT_AUDIT_TREE};
pub use dispatcher::{dispatch, dispatch_async};
pub use error::Error;
pub use listener::AuditLogEventListener;
pub use registry::{
    EventListeners, PostDeleteEventListener, PostInsertEventListener, PostUpdateEventListener,
};
pub use session::{AsyncAuditSession, AuditSession, AuditSessionFactory};
pub use store::{
    MemoryAuditSession, MemoryAuditStore, MemoryConnection, SledAuditSession, SledAuditStore,
};

/// Re-export of the audit engine.
pub use ppw_audit_core as audit_core;

/// Re-export of the cancellation token used by the asynchronous path.
pub use tokio_util::sync::CancellationToken;
