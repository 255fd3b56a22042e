//! Change-set construction.
//!
//! One builder per event kind turns a write event and the entity's
//! [`AuditLogItem`] into the audit rows to persist:
//!
//! - insert: one `I` row per tracked, non-null expanded value;
//! - update: one `U` row per expanded property whose serialized value changed;
//! - delete: a single `D` row without property.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::audit::{AuditEntity, AuditEntry, EntryType};
use crate::cache::AuditLogItem;
use crate::error::Error;
use crate::event::{check_state, find_dirty, PostDeleteEvent, PostInsertEvent, PostUpdateEvent};
use crate::expand::{expand_to_map, expand_value, format_scalar};
use crate::log::PpwAuditLogPair;
use crate::metadata::{AuditLogAction, EntityDef};
use crate::provider::{IdentityProvider, TimeProvider};
use crate::value::Scalar;

/// Hook invoked once per event on a non-empty change set, before it is
/// persisted.
pub trait AuditEntitiesHook<A>: Send + Sync {
    /// Attach cross-cutting state to the rows of one event.
    fn on_add_audit_entities(&self, entities: &mut [A]);
}

/// Hook that leaves rows untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl<A> AuditEntitiesHook<A> for NoopHook {
    fn on_add_audit_entities(&self, _entities: &mut [A]) {}
}

/// Hook stamping the same correlation id on every row it sees.
#[derive(Debug, Clone)]
pub struct CorrelationHook {
    correlation_id: String,
}

impl CorrelationHook {
    /// Create a hook stamping `correlation_id`.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }
}

impl<A: AuditEntity> AuditEntitiesHook<A> for CorrelationHook {
    fn on_add_audit_entities(&self, entities: &mut [A]) {
        for entity in entities {
            entity.entry_mut().correlation_id = Some(self.correlation_id.clone());
        }
    }
}

/// Builds audit rows for write events.
pub struct ChangeSetBuilder<'a, A> {
    identity: &'a dyn IdentityProvider,
    time: &'a dyn TimeProvider,
    hook: &'a dyn AuditEntitiesHook<A>,
}

/// Values shared by every row of one event.
struct RowContext<'e> {
    entity_name: &'e str,
    entity_id: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl RowContext<'_> {
    fn entry(
        &self,
        entry_type: EntryType,
        property_name: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> AuditEntry {
        AuditEntry {
            entry_type,
            entity_name: self.entity_name.to_string(),
            entity_id: self.entity_id.clone(),
            property_name,
            old_value,
            new_value,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            correlation_id: None,
        }
    }
}

impl<'a, A: AuditEntity> ChangeSetBuilder<'a, A> {
    /// Create a builder.
    pub fn new(
        identity: &'a dyn IdentityProvider,
        time: &'a dyn TimeProvider,
        hook: &'a dyn AuditEntitiesHook<A>,
    ) -> Self {
        Self {
            identity,
            time,
            hook,
        }
    }

    /// Rows for an insert: every tracked property holding a value.
    pub fn build_insert<C>(
        &self,
        event: &PostInsertEvent<'_, C>,
        item: &AuditLogItem,
    ) -> Result<Vec<A>, Error> {
        if !item.is_enabled(AuditLogAction::CREATE) {
            return Ok(Vec::new());
        }
        check_state(event.entity, event.state)?;

        let ctx = self.row_context(event.entity, &event.id);
        let mut rows = Vec::new();

        for (field, value) in event.entity.fields.iter().zip(event.state) {
            if !item.tracks(&field.name, AuditLogAction::CREATE) {
                continue;
            }

            let date_only = field.field_type.is_date_only();
            for log in expand_value(&field.name, value, date_only) {
                if log.value.is_none() {
                    continue;
                }
                rows.push(A::from_entry(ctx.entry(
                    EntryType::Insert,
                    Some(log.property_name),
                    None,
                    log.value,
                )));
            }
        }

        Ok(self.finish(rows))
    }

    /// Rows for an update: every tracked, dirty property whose serialized
    /// value actually changed.
    pub fn build_update<C>(
        &self,
        event: &PostUpdateEvent<'_, C>,
        item: &AuditLogItem,
    ) -> Result<Vec<A>, Error> {
        if !item.is_enabled(AuditLogAction::UPDATE) {
            return Ok(Vec::new());
        }

        let old_state = event.old_state.ok_or_else(|| Error::MissingPreviousState {
            entity: event.entity.name.clone(),
        })?;
        check_state(event.entity, old_state)?;
        check_state(event.entity, event.state)?;

        let dirty: BTreeSet<usize> = match event.dirty_fields {
            Some(indices) => indices.iter().copied().collect(),
            None => find_dirty(old_state, event.state).into_iter().collect(),
        };

        let ctx = self.row_context(event.entity, &event.id);
        let mut rows = Vec::new();

        for index in dirty {
            let Some(field) = event.entity.fields.get(index) else {
                continue;
            };
            if !item.tracks(&field.name, AuditLogAction::UPDATE) {
                continue;
            }

            let date_only = field.field_type.is_date_only();
            let old_logs = expand_to_map(&field.name, &old_state[index], date_only);
            let new_logs = expand_to_map(&field.name, &event.state[index], date_only);
            let names: BTreeSet<&String> = old_logs.keys().chain(new_logs.keys()).collect();

            for name in names {
                let pair =
                    PpwAuditLogPair::new(old_logs.get(name).cloned(), new_logs.get(name).cloned());
                if !pair.is_change() {
                    continue;
                }
                rows.push(A::from_entry(ctx.entry(
                    EntryType::Update,
                    Some(name.clone()),
                    pair.old.and_then(|l| l.value),
                    pair.new.and_then(|l| l.value),
                )));
            }
        }

        Ok(self.finish(rows))
    }

    /// Rows for a delete: a single row without property.
    pub fn build_delete<C>(
        &self,
        event: &PostDeleteEvent<'_, C>,
        item: &AuditLogItem,
    ) -> Result<Vec<A>, Error> {
        if !item.is_enabled(AuditLogAction::DELETE) {
            return Ok(Vec::new());
        }

        let ctx = self.row_context(event.entity, &event.id);
        let rows = vec![A::from_entry(ctx.entry(EntryType::Delete, None, None, None))];

        Ok(self.finish(rows))
    }

    fn row_context<'e>(&self, entity: &'e EntityDef, id: &Scalar) -> RowContext<'e> {
        RowContext {
            entity_name: &entity.name,
            entity_id: format_scalar(id, false),
            created_by: self.identity.identity_name(),
            created_at: self.time.now(),
        }
    }

    fn finish(&self, mut rows: Vec<A>) -> Vec<A> {
        if !rows.is_empty() {
            self.hook.on_add_audit_entities(&mut rows);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLogEntity;
    use crate::cache::AuditLogItemCache;
    use crate::log::PpwAuditLog;
    use crate::metadata::{Catalog, FieldDef, FieldType, ScalarType};
    use crate::provider::{FixedTimeProvider, StaticIdentityProvider};
    use crate::value::{AuditLoggable, Value};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Row = AuditLogEntity<u64>;

    #[derive(Debug)]
    struct Address {
        street: &'static str,
        city: Option<&'static str>,
    }

    impl AuditLoggable for Address {
        fn is_multi_log(&self) -> bool {
            true
        }

        fn to_log_string(&self) -> Option<String> {
            None
        }

        fn to_log_entries(&self, property_name: &str) -> Vec<PpwAuditLog> {
            vec![
                PpwAuditLog::new(
                    format!("{}.Street", property_name),
                    Some(self.street.to_string()),
                ),
                PpwAuditLog::new(
                    format!("{}.City", property_name),
                    self.city.map(String::from),
                ),
            ]
        }
    }

    #[derive(Default)]
    struct CountingHook {
        calls: AtomicUsize,
    }

    impl AuditEntitiesHook<Row> for CountingHook {
        fn on_add_audit_entities(&self, _entities: &mut [Row]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn company() -> EntityDef {
        EntityDef::new("Company", "id")
            .with_field(FieldDef::new("Name", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::new("Age", FieldType::scalar(ScalarType::Int32)))
            .with_field(
                FieldDef::new("Code", FieldType::scalar(ScalarType::String))
                    .exclude_from_audit(AuditLogAction::CREATE | AuditLogAction::UPDATE),
            )
            .with_field(FieldDef::new("Address", FieldType::component("Address")))
            .with_field(FieldDef::new("Parent", FieldType::reference("Company")))
            .audited(AuditLogAction::ALL)
    }

    fn person() -> EntityDef {
        EntityDef::new("Person", "id")
            .with_field(FieldDef::new("Name", FieldType::scalar(ScalarType::String)))
    }

    struct Fixture {
        catalog: Catalog,
        cache: AuditLogItemCache,
        identity: StaticIdentityProvider,
        time: FixedTimeProvider,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: Catalog::new().with_entities([company(), person()]),
                cache: AuditLogItemCache::new("AuditLog"),
                identity: StaticIdentityProvider::new("alice"),
                time: FixedTimeProvider(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            }
        }

        fn item(&self, entity: &str) -> Arc<AuditLogItem> {
            self.cache.find(entity, &self.catalog)
        }

        fn builder<'a>(
            &'a self,
            hook: &'a dyn AuditEntitiesHook<Row>,
        ) -> ChangeSetBuilder<'a, Row> {
            ChangeSetBuilder::new(&self.identity, &self.time, hook)
        }
    }

    fn company_state(name: &str, age: i32) -> Vec<Value> {
        vec![
            Value::from(name),
            Value::from(age),
            Value::from("C-1"),
            Value::Null,
            Value::Null,
        ]
    }

    #[test]
    fn test_insert_emits_tracked_non_null_values() {
        let fx = Fixture::new();
        let entity = company();
        let mut state = company_state("Acme", 30);
        state[4] = Value::reference("Company", 42i64);

        let event = PostInsertEvent::new(&entity, 7i64, &state, &());
        let rows = fx.builder(&NoopHook).build_insert(&event, &fx.item("Company")).unwrap();

        let summary: Vec<_> = rows
            .iter()
            .map(|r| {
                (
                    r.entry.property_name.as_deref().unwrap(),
                    r.entry.new_value.as_deref().unwrap(),
                )
            })
            .collect();
        assert_eq!(summary, vec![("Name", "Acme"), ("Age", "30"), ("Parent", "42")]);

        let first = &rows[0].entry;
        assert_eq!(first.entry_type, EntryType::Insert);
        assert_eq!(first.entity_name, "Company");
        assert_eq!(first.entity_id, "7");
        assert_eq!(first.old_value, None);
        assert_eq!(first.created_by, "alice");
        assert_eq!(first.created_at, fx.time.0);
    }

    #[test]
    fn test_insert_single_field() {
        let fx = Fixture::new();
        let entity = EntityDef::new("Company", "id")
            .with_field(FieldDef::new("Name", FieldType::scalar(ScalarType::String)))
            .audited(AuditLogAction::ALL);
        let catalog = Catalog::new().with_entities([entity.clone()]);
        let item = AuditLogItemCache::new("AuditLog").find("Company", &catalog);

        let state = vec![Value::from("Acme")];
        let event = PostInsertEvent::new(&entity, 1i64, &state, &());
        let rows = fx.builder(&NoopHook).build_insert(&event, &item).unwrap();

        assert_eq!(rows.len(), 1);
        let entry = &rows[0].entry;
        assert_eq!(entry.entry_type, EntryType::Insert);
        assert_eq!(entry.property_name.as_deref(), Some("Name"));
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_insert_null_field_produces_no_row() {
        let fx = Fixture::new();
        let entity = company();
        let state = vec![Value::Null, Value::Null, Value::Null, Value::Null, Value::Null];

        let event = PostInsertEvent::new(&entity, 1i64, &state, &());
        let rows = fx.builder(&NoopHook).build_insert(&event, &fx.item("Company")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_insert_expands_multi_log_and_drops_null_parts() {
        let fx = Fixture::new();
        let entity = company();
        let mut state = company_state("Acme", 30);
        state[3] = Value::loggable(Arc::new(Address {
            street: "Main 1",
            city: None,
        }));

        let event = PostInsertEvent::new(&entity, 1i64, &state, &());
        let rows = fx.builder(&NoopHook).build_insert(&event, &fx.item("Company")).unwrap();

        let names: Vec<_> = rows
            .iter()
            .map(|r| r.entry.property_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Name", "Age", "Address.Street"]);
    }

    #[test]
    fn test_update_emits_only_changed_values() {
        let fx = Fixture::new();
        let entity = company();
        let old = company_state("Acme", 30);
        let new = company_state("Acme", 31);
        // The runtime reports both properties dirty.
        let dirty = [0usize, 1];

        let event = PostUpdateEvent::new(&entity, 7i64, &new, Some(old.as_slice()), &())
            .with_dirty_fields(&dirty);
        let rows = fx.builder(&NoopHook).build_update(&event, &fx.item("Company")).unwrap();

        assert_eq!(rows.len(), 1);
        let entry = &rows[0].entry;
        assert_eq!(entry.entry_type, EntryType::Update);
        assert_eq!(entry.property_name.as_deref(), Some("Age"));
        assert_eq!(entry.old_value.as_deref(), Some("30"));
        assert_eq!(entry.new_value.as_deref(), Some("31"));
    }

    #[test]
    fn test_update_repeated_dirty_index_emits_one_row() {
        let fx = Fixture::new();
        let entity = company();
        let old = company_state("Acme", 30);
        let new = company_state("Acme", 31);
        let dirty = [1usize, 1, 1];

        let event = PostUpdateEvent::new(&entity, 7i64, &new, Some(old.as_slice()), &())
            .with_dirty_fields(&dirty);
        let rows = fx.builder(&NoopHook).build_update(&event, &fx.item("Company")).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.property_name.as_deref(), Some("Age"));
    }

    #[test]
    fn test_update_respects_exclusion_and_computes_dirty() {
        let fx = Fixture::new();
        let entity = company();
        let old = company_state("Acme", 30);
        let mut new = company_state("Acme Inc", 30);
        new[2] = Value::from("C-2");

        let event = PostUpdateEvent::new(&entity, 7i64, &new, Some(old.as_slice()), &());
        let rows = fx.builder(&NoopHook).build_update(&event, &fx.item("Company")).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.property_name.as_deref(), Some("Name"));
    }

    #[test]
    fn test_update_multi_log_pairs_sub_properties() {
        let fx = Fixture::new();
        let entity = company();
        let mut old = company_state("Acme", 30);
        old[3] = Value::loggable(Arc::new(Address {
            street: "Main 1",
            city: Some("Ghent"),
        }));
        let mut new = company_state("Acme", 30);
        new[3] = Value::loggable(Arc::new(Address {
            street: "Main 1",
            city: None,
        }));

        let event = PostUpdateEvent::new(&entity, 7i64, &new, Some(old.as_slice()), &());
        let rows = fx.builder(&NoopHook).build_update(&event, &fx.item("Company")).unwrap();

        assert_eq!(rows.len(), 1);
        let entry = &rows[0].entry;
        assert_eq!(entry.property_name.as_deref(), Some("Address.City"));
        assert_eq!(entry.old_value.as_deref(), Some("Ghent"));
        assert_eq!(entry.new_value, None);
    }

    #[test]
    fn test_update_from_null_to_multi_log() {
        let fx = Fixture::new();
        let entity = company();
        let old = company_state("Acme", 30);
        let mut new = company_state("Acme", 30);
        new[3] = Value::loggable(Arc::new(Address {
            street: "Main 1",
            city: Some("Ghent"),
        }));

        let event = PostUpdateEvent::new(&entity, 7i64, &new, Some(old.as_slice()), &());
        let rows = fx.builder(&NoopHook).build_update(&event, &fx.item("Company")).unwrap();

        // "Address" goes from null to absent; both sub-properties appear.
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.entry.property_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Address.City", "Address.Street"]);
    }

    #[test]
    fn test_update_without_previous_state_fails() {
        let fx = Fixture::new();
        let entity = company();
        let new = company_state("Acme", 31);

        let event = PostUpdateEvent::new(&entity, 7i64, &new, None, &());
        let result = fx.builder(&NoopHook).build_update(&event, &fx.item("Company"));

        assert!(matches!(
            result,
            Err(Error::MissingPreviousState { entity }) if entity == "Company"
        ));
    }

    #[test]
    fn test_update_skips_out_of_range_dirty_index() {
        let fx = Fixture::new();
        let entity = company();
        let old = company_state("Acme", 30);
        let new = company_state("Acme", 30);
        let dirty = [99usize];

        let event = PostUpdateEvent::new(&entity, 7i64, &new, Some(old.as_slice()), &())
            .with_dirty_fields(&dirty);
        let rows = fx.builder(&NoopHook).build_update(&event, &fx.item("Company")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_delete_emits_sentinel() {
        let fx = Fixture::new();
        let entity = company();
        let state = company_state("Acme", 30);

        let event = PostDeleteEvent::new(&entity, 7i64, &state, &());
        let rows = fx.builder(&NoopHook).build_delete(&event, &fx.item("Company")).unwrap();

        assert_eq!(rows.len(), 1);
        let entry = &rows[0].entry;
        assert_eq!(entry.entry_type, EntryType::Delete);
        assert_eq!(entry.property_name, None);
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value, None);
    }

    #[test]
    fn test_unconfigured_type_produces_nothing() {
        let fx = Fixture::new();
        let entity = person();
        let item = fx.item("Person");
        let old = vec![Value::from("Bob")];
        let new = vec![Value::from("Rob")];
        let builder = fx.builder(&NoopHook);

        let insert = PostInsertEvent::new(&entity, 1i64, &new, &());
        let update = PostUpdateEvent::new(&entity, 1i64, &new, Some(old.as_slice()), &());
        let delete = PostDeleteEvent::new(&entity, 1i64, &new, &());

        assert!(builder.build_insert(&insert, &item).unwrap().is_empty());
        assert!(builder.build_update(&update, &item).unwrap().is_empty());
        assert!(builder.build_delete(&delete, &item).unwrap().is_empty());
    }

    #[test]
    fn test_disabled_action_skips_update_without_previous_state() {
        let fx = Fixture::new();
        let entity = company().audited(AuditLogAction::CREATE);
        let catalog = Catalog::new().with_entities([entity.clone()]);
        let item = AuditLogItemCache::new("AuditLog").find("Company", &catalog);
        let new = company_state("Acme", 31);

        let event = PostUpdateEvent::new(&entity, 7i64, &new, None, &());
        let rows = fx.builder(&NoopHook).build_update(&event, &item).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_hook_called_once_for_non_empty_change_set() {
        let fx = Fixture::new();
        let entity = company();
        let hook = CountingHook::default();
        let builder = fx.builder(&hook);

        let state = company_state("Acme", 30);
        let insert = PostInsertEvent::new(&entity, 1i64, &state, &());
        builder.build_insert(&insert, &fx.item("Company")).unwrap();
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);

        let unchanged = PostUpdateEvent::new(&entity, 1i64, &state, Some(state.as_slice()), &());
        assert!(builder
            .build_update(&unchanged, &fx.item("Company"))
            .unwrap()
            .is_empty());
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_correlation_hook_stamps_rows() {
        let fx = Fixture::new();
        let entity = company();
        let hook = CorrelationHook::new("run-1");
        let state = company_state("Acme", 30);

        let event = PostInsertEvent::new(&entity, 1i64, &state, &());
        let rows = fx.builder(&hook).build_insert(&event, &fx.item("Company")).unwrap();

        assert!(!rows.is_empty());
        assert!(rows
            .iter()
            .all(|r| r.entry.correlation_id.as_deref() == Some("run-1")));
    }

    #[test]
    fn test_state_mismatch_is_rejected() {
        let fx = Fixture::new();
        let entity = company();
        let state = vec![Value::from("Acme")];

        let event = PostInsertEvent::new(&entity, 1i64, &state, &());
        let result = fx.builder(&NoopHook).build_insert(&event, &fx.item("Company"));
        assert!(matches!(result, Err(Error::StateMismatch { .. })));
    }
}
