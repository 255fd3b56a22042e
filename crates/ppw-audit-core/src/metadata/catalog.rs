//! Entity catalog and the audit metadata query.

use super::action::AuditLogAction;
use super::entity::EntityDef;
use crate::error::Error;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Audit configuration declared on an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditDeclaration {
    /// Operations that produce audit rows.
    pub actions: AuditLogAction,
    /// Writable properties with the operations each one is excluded from.
    pub properties: Vec<(String, AuditLogAction)>,
}

/// Source of type-level and property-level audit configuration.
///
/// Implementations may read declarations from any mechanism the host uses:
/// a registration table, generated code, or external configuration.
pub trait AuditMetadataSource: Send + Sync {
    /// Declaration for the entity type, or `None` if the type is not audited.
    fn audit_declaration(&self, entity: &str) -> Option<AuditDeclaration>;
}

/// In-memory registry of entity definitions.
#[derive(Debug, Default)]
pub struct Catalog {
    entities: RwLock<HashMap<String, EntityDef>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity definition, replacing any previous one with the same name.
    pub fn register(&self, entity: EntityDef) {
        self.entities.write().insert(entity.name.clone(), entity);
    }

    /// Register several entity definitions.
    pub fn with_entities(self, entities: impl IntoIterator<Item = EntityDef>) -> Self {
        for entity in entities {
            self.register(entity);
        }
        self
    }

    /// Get an entity definition by name.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        self.entities.read().get(name).cloned()
    }

    /// Get an entity definition by name, failing if it is not registered.
    pub fn require_entity(&self, name: &str) -> Result<EntityDef, Error> {
        self.get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// List all registered entity names.
    pub fn list_entities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entities.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl AuditMetadataSource for Catalog {
    fn audit_declaration(&self, entity: &str) -> Option<AuditDeclaration> {
        let guard = self.entities.read();
        let def = guard.get(entity)?;
        let actions = def.audit?;

        let properties = def
            .writable_fields()
            .map(|f| (f.name.clone(), f.audit_exclude))
            .collect();

        Some(AuditDeclaration {
            actions,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldDef, FieldType, ScalarType};

    fn company() -> EntityDef {
        EntityDef::new("Company", "id")
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
            .with_field(
                FieldDef::new("code", FieldType::scalar(ScalarType::String))
                    .exclude_from_audit(AuditLogAction::UPDATE),
            )
            .with_field(FieldDef::read_only(
                "version",
                FieldType::scalar(ScalarType::Int32),
            ))
            .audited(AuditLogAction::CREATE | AuditLogAction::UPDATE)
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = Catalog::new();
        catalog.register(company());
        catalog.register(EntityDef::new("Person", "id"));

        assert!(catalog.get_entity("Company").is_some());
        assert_eq!(catalog.list_entities(), vec!["Company", "Person"]);
        assert!(matches!(
            catalog.require_entity("Nope"),
            Err(Error::UnknownEntity(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_audit_declaration() {
        let catalog = Catalog::new().with_entities([company()]);
        let decl = catalog.audit_declaration("Company").unwrap();

        assert_eq!(decl.actions, AuditLogAction::CREATE | AuditLogAction::UPDATE);
        assert_eq!(
            decl.properties,
            vec![
                ("name".to_string(), AuditLogAction::NONE),
                ("code".to_string(), AuditLogAction::UPDATE),
            ]
        );
    }

    #[test]
    fn test_undeclared_entity_has_no_declaration() {
        let catalog = Catalog::new().with_entities([EntityDef::new("Person", "id")]);
        assert!(catalog.audit_declaration("Person").is_none());
        assert!(catalog.audit_declaration("Missing").is_none());
    }
}
