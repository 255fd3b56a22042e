//! Audit listener configuration.

use std::fmt;
use std::sync::Arc;

use ppw_audit_core::{IdentityProvider, StaticIdentityProvider, SystemTimeProvider, TimeProvider};

/// Default entity name of the audit rows.
pub const DEFAULT_AUDIT_ENTITY_NAME: &str = "AuditLog";

/// Default sled tree holding audit rows.
pub const DEFAULT_AUDIT_TREE: &str = "audit:log";

/// Configuration of the audit log listener.
#[derive(Clone)]
pub struct AuditConfig {
    /// Entity name of the audit rows; this type is never audited itself.
    pub audit_entity_name: String,

    /// Sled tree used by [`SledAuditStore`](crate::SledAuditStore).
    pub audit_tree: String,

    /// Source of `created_by`.
    pub identity_provider: Arc<dyn IdentityProvider>,

    /// Source of `created_at`.
    pub time_provider: Arc<dyn TimeProvider>,
}

impl AuditConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            audit_entity_name: DEFAULT_AUDIT_ENTITY_NAME.to_string(),
            audit_tree: DEFAULT_AUDIT_TREE.to_string(),
            identity_provider: Arc::new(StaticIdentityProvider::default()),
            time_provider: Arc::new(SystemTimeProvider),
        }
    }

    /// Set the audit row entity name.
    pub fn with_audit_entity_name(mut self, name: impl Into<String>) -> Self {
        self.audit_entity_name = name.into();
        self
    }

    /// Set the sled tree name.
    pub fn with_audit_tree(mut self, tree: impl Into<String>) -> Self {
        self.audit_tree = tree.into();
        self
    }

    /// Set the identity provider.
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = provider;
        self
    }

    /// Set the time provider.
    pub fn with_time_provider(mut self, provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = provider;
        self
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("audit_entity_name", &self.audit_entity_name)
            .field("audit_tree", &self.audit_tree)
            .finish_non_exhaustive()
    }
}
