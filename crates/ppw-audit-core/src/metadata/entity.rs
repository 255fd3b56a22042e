//! Entity definitions.

use super::action::AuditLogAction;
use super::field::FieldDef;

/// A mapped entity type.
///
/// The order of `fields` is the order of the state arrays carried by write
/// events for this entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    /// Entity name (unique within a catalog).
    pub name: String,
    /// Name of the identity property.
    pub identity_field: String,
    /// Persistent properties, identity excluded.
    pub fields: Vec<FieldDef>,
    /// Type-level audit declaration. `None` means the type is not audited.
    pub audit: Option<AuditLogAction>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: identity_field.into(),
            fields: Vec::new(),
            audit: None,
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Declare the entity as audited for the given operations.
    pub fn audited(mut self, actions: AuditLogAction) -> Self {
        self.audit = Some(actions);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in the event state arrays.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Property names in state-array order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields with a public setter.
    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.writable)
    }
}
