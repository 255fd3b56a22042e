//! The audit log event listener.
//!
//! Composition root of the audit engine: for each post-write event it looks
//! up the entity's audit descriptor, builds the change set and persists it
//! through a session opened on the event's connection.

use std::sync::Arc;

use async_trait::async_trait;
use ppw_audit_core::{
    AuditEntitiesHook, AuditEntity, AuditLogItem, AuditLogItemCache, AuditMetadataSource,
    ChangeSetBuilder, EntityDef, NoopHook, PostDeleteEvent, PostInsertEvent, PostUpdateEvent,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::AuditConfig;
use crate::dispatcher::{dispatch, dispatch_async};
use crate::error::Error;
use crate::registry::{
    EventListeners, PostDeleteEventListener, PostInsertEventListener, PostUpdateEventListener,
};
use crate::session::AuditSessionFactory;

/// Writes audit rows for every insert, update and delete of audited entities.
///
/// `A` is the audit row type, `F` opens sessions on the connection type of
/// the events it receives.
pub struct AuditLogEventListener<A, F> {
    config: AuditConfig,
    metadata: Arc<dyn AuditMetadataSource>,
    cache: Arc<AuditLogItemCache>,
    factory: F,
    hook: Arc<dyn AuditEntitiesHook<A>>,
}

impl<A, F> AuditLogEventListener<A, F>
where
    A: AuditEntity,
    F: AuditSessionFactory<A>,
{
    /// Create a listener with its own descriptor cache and no hook.
    pub fn new(config: AuditConfig, metadata: Arc<dyn AuditMetadataSource>, factory: F) -> Self {
        let cache = Arc::new(AuditLogItemCache::new(config.audit_entity_name.clone()));
        Self {
            config,
            metadata,
            cache,
            factory,
            hook: Arc::new(NoopHook),
        }
    }

    /// Share a descriptor cache owned by the caller.
    pub fn with_cache(mut self, cache: Arc<AuditLogItemCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Install a hook run on every non-empty change set.
    pub fn with_hook(mut self, hook: Arc<dyn AuditEntitiesHook<A>>) -> Self {
        self.hook = hook;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Descriptor cache in use.
    pub fn cache(&self) -> &Arc<AuditLogItemCache> {
        &self.cache
    }

    /// Session factory in use.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Audit descriptor of an entity type.
    pub fn descriptor(&self, entity: &str) -> Arc<AuditLogItem> {
        self.cache.find(entity, self.metadata.as_ref())
    }

    /// Rows an insert would produce, without persisting them.
    pub fn insert_change_set(
        &self,
        event: &PostInsertEvent<'_, F::Connection>,
    ) -> Result<Vec<A>, Error> {
        let item = self.descriptor(&event.entity.name);
        Ok(self.builder().build_insert(event, &item)?)
    }

    /// Rows an update would produce, without persisting them.
    pub fn update_change_set(
        &self,
        event: &PostUpdateEvent<'_, F::Connection>,
    ) -> Result<Vec<A>, Error> {
        let item = self.descriptor(&event.entity.name);
        Ok(self.builder().build_update(event, &item)?)
    }

    /// Rows a delete would produce, without persisting them.
    pub fn delete_change_set(
        &self,
        event: &PostDeleteEvent<'_, F::Connection>,
    ) -> Result<Vec<A>, Error> {
        let item = self.descriptor(&event.entity.name);
        Ok(self.builder().build_delete(event, &item)?)
    }

    /// Audit an insert. Returns the persisted rows.
    pub fn audit_insert(
        &self,
        event: &PostInsertEvent<'_, F::Connection>,
    ) -> Result<Vec<A>, Error> {
        let rows = self.insert_change_set(event)?;
        self.persist(event.entity, event.session, rows)
    }

    /// Audit an update. Returns the persisted rows.
    pub fn audit_update(
        &self,
        event: &PostUpdateEvent<'_, F::Connection>,
    ) -> Result<Vec<A>, Error> {
        let rows = self.update_change_set(event)?;
        self.persist(event.entity, event.session, rows)
    }

    /// Audit a delete. Returns the persisted rows.
    pub fn audit_delete(
        &self,
        event: &PostDeleteEvent<'_, F::Connection>,
    ) -> Result<Vec<A>, Error> {
        let rows = self.delete_change_set(event)?;
        self.persist(event.entity, event.session, rows)
    }

    /// Audit an insert on the asynchronous path.
    pub async fn audit_insert_async(
        &self,
        event: &PostInsertEvent<'_, F::Connection>,
        cancel: &CancellationToken,
    ) -> Result<Vec<A>, Error> {
        let rows = self.insert_change_set(event)?;
        self.persist_async(event.entity, event.session, rows, cancel).await
    }

    /// Audit an update on the asynchronous path.
    pub async fn audit_update_async(
        &self,
        event: &PostUpdateEvent<'_, F::Connection>,
        cancel: &CancellationToken,
    ) -> Result<Vec<A>, Error> {
        let rows = self.update_change_set(event)?;
        self.persist_async(event.entity, event.session, rows, cancel).await
    }

    /// Audit a delete on the asynchronous path.
    pub async fn audit_delete_async(
        &self,
        event: &PostDeleteEvent<'_, F::Connection>,
        cancel: &CancellationToken,
    ) -> Result<Vec<A>, Error> {
        let rows = self.delete_change_set(event)?;
        self.persist_async(event.entity, event.session, rows, cancel).await
    }

    fn builder(&self) -> ChangeSetBuilder<'_, A> {
        ChangeSetBuilder::new(
            self.config.identity_provider.as_ref(),
            self.config.time_provider.as_ref(),
            self.hook.as_ref(),
        )
    }

    fn persist(
        &self,
        entity: &EntityDef,
        connection: &F::Connection,
        rows: Vec<A>,
    ) -> Result<Vec<A>, Error> {
        if rows.is_empty() {
            debug!(entity = %entity.name, "no audit rows");
            return Ok(rows);
        }
        debug!(entity = %entity.name, rows = rows.len(), "persisting audit rows");
        dispatch(&self.factory, connection, rows)
    }

    async fn persist_async(
        &self,
        entity: &EntityDef,
        connection: &F::Connection,
        rows: Vec<A>,
        cancel: &CancellationToken,
    ) -> Result<Vec<A>, Error> {
        if rows.is_empty() {
            debug!(entity = %entity.name, "no audit rows");
            return Ok(rows);
        }
        debug!(entity = %entity.name, rows = rows.len(), "persisting audit rows");
        dispatch_async(&self.factory, connection, rows, cancel).await
    }
}

impl<A, F> AuditLogEventListener<A, F>
where
    A: AuditEntity,
    F: AuditSessionFactory<A> + 'static,
{
    /// Put this listener in front of every post-write listener list.
    pub fn register(self: &Arc<Self>, listeners: &mut EventListeners<F::Connection>) {
        let insert: Arc<dyn PostInsertEventListener<F::Connection>> = Arc::<Self>::clone(self);
        listeners.prepend_post_insert(insert);
        let update: Arc<dyn PostUpdateEventListener<F::Connection>> = Arc::<Self>::clone(self);
        listeners.prepend_post_update(update);
        let delete: Arc<dyn PostDeleteEventListener<F::Connection>> = Arc::<Self>::clone(self);
        listeners.prepend_post_delete(delete);
    }
}

#[async_trait]
impl<A, F> PostInsertEventListener<F::Connection> for AuditLogEventListener<A, F>
where
    A: AuditEntity,
    F: AuditSessionFactory<A> + 'static,
{
    fn on_post_insert(&self, event: &PostInsertEvent<'_, F::Connection>) -> Result<(), Error> {
        self.audit_insert(event).map(|_| ())
    }

    async fn on_post_insert_async(
        &self,
        event: &PostInsertEvent<'_, F::Connection>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.audit_insert_async(event, cancel).await.map(|_| ())
    }
}

#[async_trait]
impl<A, F> PostUpdateEventListener<F::Connection> for AuditLogEventListener<A, F>
where
    A: AuditEntity,
    F: AuditSessionFactory<A> + 'static,
{
    fn on_post_update(&self, event: &PostUpdateEvent<'_, F::Connection>) -> Result<(), Error> {
        self.audit_update(event).map(|_| ())
    }

    async fn on_post_update_async(
        &self,
        event: &PostUpdateEvent<'_, F::Connection>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.audit_update_async(event, cancel).await.map(|_| ())
    }
}

#[async_trait]
impl<A, F> PostDeleteEventListener<F::Connection> for AuditLogEventListener<A, F>
where
    A: AuditEntity,
    F: AuditSessionFactory<A> + 'static,
{
    fn on_post_delete(&self, event: &PostDeleteEvent<'_, F::Connection>) -> Result<(), Error> {
        self.audit_delete(event).map(|_| ())
    }

    async fn on_post_delete_async(
        &self,
        event: &PostDeleteEvent<'_, F::Connection>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.audit_delete_async(event, cancel).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryAuditStore, MemoryConnection};
    use ppw_audit_core::{
        AuditLogAction, AuditLogEntity, Catalog, EntryType, FieldDef, FieldType, ScalarType,
        Value,
    };

    type Row = AuditLogEntity<u64>;

    fn listener() -> (AuditLogEventListener<Row, MemoryAuditStore<Row>>, MemoryAuditStore<Row>) {
        let catalog = Catalog::new().with_entities([EntityDef::new("Company", "id")
            .with_field(FieldDef::new("Name", FieldType::scalar(ScalarType::String)))
            .audited(AuditLogAction::ALL)]);
        let store = MemoryAuditStore::new();
        let listener =
            AuditLogEventListener::new(AuditConfig::new(), Arc::new(catalog), store.clone());
        (listener, store)
    }

    #[test]
    fn test_audit_insert_persists_rows() {
        let (listener, store) = listener();
        let entity = listener_entity();
        let state = vec![Value::from("Acme")];
        let connection = MemoryConnection::new(3);

        let rows = listener
            .audit_insert(&PostInsertEvent::new(&entity, 1i64, &state, &connection))
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(store.rows(), rows);
        assert_eq!(store.connections_used(), vec![3]);
    }

    #[test]
    fn test_unchanged_update_opens_no_session() {
        let (listener, store) = listener();
        let entity = listener_entity();
        let state = vec![Value::from("Acme")];
        let connection = MemoryConnection::new(3);

        let rows = listener
            .audit_update(&PostUpdateEvent::new(
                &entity,
                1i64,
                &state,
                Some(state.as_slice()),
                &connection,
            ))
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(store.sessions_opened(), 0);
    }

    #[test]
    fn test_missing_previous_state_surfaces_core_error() {
        let (listener, store) = listener();
        let entity = listener_entity();
        let state = vec![Value::from("Acme")];
        let connection = MemoryConnection::new(3);

        let result =
            listener.audit_update(&PostUpdateEvent::new(&entity, 1i64, &state, None, &connection));

        assert!(matches!(
            result,
            Err(Error::Audit(ppw_audit_core::Error::MissingPreviousState { .. }))
        ));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[test]
    fn test_register_prepends_to_all_lists() {
        let (listener, store) = listener();
        let listener = Arc::new(listener);
        let mut listeners = EventListeners::new();
        listener.register(&mut listeners);
        assert_eq!(listeners.counts(), (1, 1, 1));

        let entity = listener_entity();
        let state = vec![Value::from("Acme")];
        let connection = MemoryConnection::new(1);
        listeners
            .fire_post_delete(&PostDeleteEvent::new(&entity, 1i64, &state, &connection))
            .unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.entry_type, EntryType::Delete);
    }

    struct Rejecting;

    impl PostInsertEventListener<MemoryConnection> for Rejecting {
        fn on_post_insert(
            &self,
            _event: &PostInsertEvent<'_, MemoryConnection>,
        ) -> Result<(), Error> {
            Err(Error::Session("rejected".into()))
        }
    }

    #[test]
    fn test_register_runs_before_existing_listeners() {
        let (listener, store) = listener();
        let mut listeners = EventListeners::new();
        listeners.append_post_insert(Arc::new(Rejecting));
        Arc::new(listener).register(&mut listeners);
        assert_eq!(listeners.counts(), (2, 1, 1));

        let entity = listener_entity();
        let state = vec![Value::from("Acme")];
        let connection = MemoryConnection::new(1);
        let result =
            listeners.fire_post_insert(&PostInsertEvent::new(&entity, 1i64, &state, &connection));

        assert!(matches!(result, Err(Error::Session(_))));
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_async_insert() {
        let (listener, store) = listener();
        let entity = listener_entity();
        let state = vec![Value::from("Acme")];
        let connection = MemoryConnection::new(1);
        let cancel = CancellationToken::new();

        let rows = listener
            .audit_insert_async(&PostInsertEvent::new(&entity, 1i64, &state, &connection), &cancel)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(store.flush_count(), 1);
    }

    fn listener_entity() -> EntityDef {
        EntityDef::new("Company", "id")
            .with_field(FieldDef::new("Name", FieldType::scalar(ScalarType::String)))
            .audited(AuditLogAction::ALL)
    }
}
