//! Audit row stores.

mod memory;
mod sled;

pub use memory::{MemoryAuditSession, MemoryAuditStore, MemoryConnection};
pub use self::sled::{SledAuditSession, SledAuditStore};
