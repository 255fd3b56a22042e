//! PPW Audit Core - change detection and audit row construction.
//!
//! This crate turns post-write events of a mapping runtime into audit rows.
//! It owns no persistence: rows are handed to whatever sink the host
//! provides (see the `ppw-audit` crate).

pub mod audit;
pub mod cache;
pub mod changeset;
pub mod error;
pub mod event;
pub mod expand;
pub mod log;
pub mod metadata;
pub mod provider;
pub mod stamp;
pub mod value;

pub use audit::{AuditEntity, AuditEntry, AuditLogEntity, EntryType};
pub use cache::{AuditLogItem, AuditLogItemCache};
pub use changeset::{AuditEntitiesHook, ChangeSetBuilder, CorrelationHook, NoopHook};
pub use error::Error;
pub use event::{find_dirty, PostDeleteEvent, PostInsertEvent, PostUpdateEvent};
pub use expand::{expand_value, format_scalar};
pub use log::{PpwAuditLog, PpwAuditLogPair};
pub use metadata::{
    AuditDeclaration, AuditLogAction, AuditMetadataSource, Catalog, EntityDef, FieldDef,
    FieldType, ScalarType,
};
pub use provider::{
    FixedTimeProvider, IdentityProvider, StaticIdentityProvider, SystemTimeProvider, TimeProvider,
};
pub use stamp::{AuditStamper, StampFields};
pub use value::{AuditLoggable, EntityRef, Scalar, Value};
