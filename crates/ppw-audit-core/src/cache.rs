//! Per-entity audit descriptors and their cache.

use crate::metadata::{AuditLogAction, AuditMetadataSource};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Audit descriptor of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditLogItem {
    /// Operations that produce audit rows.
    pub action: AuditLogAction,
    /// Tracked property names with the operations each one is excluded from.
    /// `None` for types that are not audited.
    pub properties: Option<HashMap<String, AuditLogAction>>,
}

impl AuditLogItem {
    /// Descriptor of a type that is never audited.
    pub fn inert() -> Self {
        Self::default()
    }

    /// Whether the operation produces audit rows for this type.
    pub fn is_enabled(&self, action: AuditLogAction) -> bool {
        self.action.contains(action)
    }

    /// Exclusion mask of a tracked property, `None` if it is not tracked.
    pub fn exclusion(&self, property: &str) -> Option<AuditLogAction> {
        self.properties.as_ref()?.get(property).copied()
    }

    /// Whether the property is logged for the operation.
    pub fn tracks(&self, property: &str, action: AuditLogAction) -> bool {
        self.exclusion(property)
            .is_some_and(|excluded| !excluded.contains(action))
    }
}

/// Process-wide cache of audit descriptors keyed by entity type name.
///
/// Descriptors are computed on first lookup and never invalidated. Two
/// threads missing the same key at once may both compute it; the first
/// insert wins and both get the stored descriptor.
#[derive(Debug)]
pub struct AuditLogItemCache {
    items: DashMap<String, Arc<AuditLogItem>>,
    audit_entity_name: String,
}

impl AuditLogItemCache {
    /// Create a cache. `audit_entity_name` names the audit row type, which is
    /// never audited itself.
    pub fn new(audit_entity_name: impl Into<String>) -> Self {
        Self {
            items: DashMap::new(),
            audit_entity_name: audit_entity_name.into(),
        }
    }

    /// Look up the descriptor for an entity type, computing it on first use.
    pub fn find(&self, entity: &str, source: &dyn AuditMetadataSource) -> Arc<AuditLogItem> {
        if let Some(item) = self.items.get(entity) {
            return Arc::clone(item.value());
        }

        let computed = Arc::new(self.compute(entity, source));
        let stored = self
            .items
            .entry(entity.to_string())
            .or_insert(computed);
        Arc::clone(stored.value())
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn compute(&self, entity: &str, source: &dyn AuditMetadataSource) -> AuditLogItem {
        if entity == self.audit_entity_name {
            return AuditLogItem::inert();
        }

        let Some(declaration) = source.audit_declaration(entity) else {
            debug!(entity = %entity, "entity carries no audit declaration");
            return AuditLogItem::inert();
        };

        debug!(
            entity = %entity,
            actions = %declaration.actions,
            properties = declaration.properties.len(),
            "computed audit descriptor"
        );

        AuditLogItem {
            action: declaration.actions,
            properties: Some(declaration.properties.into_iter().collect()),
        }
    }
}
