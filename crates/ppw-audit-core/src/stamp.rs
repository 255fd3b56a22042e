//! Creation and modification stamping for entities about to be written.

use std::sync::Arc;

use tracing::trace;

use crate::metadata::EntityDef;
use crate::provider::{IdentityProvider, TimeProvider};
use crate::value::Value;

/// Names of the stamped properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampFields {
    /// Creation time.
    pub created_at: String,
    /// Creator.
    pub created_by: String,
    /// Last modification time.
    pub last_modified_at: String,
    /// Last modifier.
    pub last_modified_by: String,
}

impl Default for StampFields {
    fn default() -> Self {
        Self {
            created_at: "CreatedAt".to_string(),
            created_by: "CreatedBy".to_string(),
            last_modified_at: "LastModifiedAt".to_string(),
            last_modified_by: "LastModifiedBy".to_string(),
        }
    }
}

/// Fills creation and modification properties in a pending state array.
///
/// Entities that do not declare a stamp property are left alone for that
/// property.
pub struct AuditStamper {
    fields: StampFields,
    identity: Arc<dyn IdentityProvider>,
    time: Arc<dyn TimeProvider>,
}

impl AuditStamper {
    /// Create a stamper with the default property names.
    pub fn new(identity: Arc<dyn IdentityProvider>, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            fields: StampFields::default(),
            identity,
            time,
        }
    }

    /// Use custom property names.
    pub fn with_fields(mut self, fields: StampFields) -> Self {
        self.fields = fields;
        self
    }

    /// Stamp all four properties before an insert. Returns whether the state
    /// changed.
    pub fn on_pre_insert(&self, entity: &EntityDef, state: &mut [Value]) -> bool {
        let user = self.identity.identity_name();
        let now = Value::from(self.time.now().naive_utc());

        let mut changed = set(entity, state, &self.fields.created_at, now.clone());
        changed |= set(entity, state, &self.fields.created_by, Value::from(user.clone()));
        changed |= set(entity, state, &self.fields.last_modified_at, now);
        changed |= set(entity, state, &self.fields.last_modified_by, Value::from(user));

        if changed {
            trace!(entity = %entity.name, "stamped entity before insert");
        }
        changed
    }

    /// Stamp the modification properties before an update. Returns whether
    /// the state changed.
    pub fn on_pre_update(&self, entity: &EntityDef, state: &mut [Value]) -> bool {
        let user = self.identity.identity_name();
        let now = Value::from(self.time.now().naive_utc());

        let mut changed = set(entity, state, &self.fields.last_modified_at, now);
        changed |= set(entity, state, &self.fields.last_modified_by, Value::from(user));

        if changed {
            trace!(entity = %entity.name, "stamped entity before update");
        }
        changed
    }
}

fn set(entity: &EntityDef, state: &mut [Value], property: &str, value: Value) -> bool {
    match entity.field_index(property).and_then(|i| state.get_mut(i)) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}
