//! Sources of the acting identity and the current time.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Supplies the name of whoever performs the current write.
pub trait IdentityProvider: Send + Sync {
    /// Name recorded as `created_by`.
    fn identity_name(&self) -> String;
}

/// Supplies the current time.
pub trait TimeProvider: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Identity provider returning a fixed name.
#[derive(Debug)]
pub struct StaticIdentityProvider {
    name: RwLock<String>,
}

impl StaticIdentityProvider {
    /// Create a provider with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: RwLock::new(name.into()),
        }
    }

    /// Change the reported name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self::new("system")
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn identity_name(&self) -> String {
        self.name.read().clone()
    }
}

/// Wall-clock time provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time provider frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeProvider(pub DateTime<Utc>);

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
