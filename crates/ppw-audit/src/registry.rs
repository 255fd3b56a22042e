//! Post-write listener registration.
//!
//! The mapping runtime notifies listeners in list order after each write.
//! Audit listeners prepend themselves so they observe every write before any
//! other listener can fail it.

use std::sync::Arc;

use async_trait::async_trait;
use ppw_audit_core::{PostDeleteEvent, PostInsertEvent, PostUpdateEvent};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Observer of inserts.
#[async_trait]
pub trait PostInsertEventListener<C: Send + Sync + 'static>: Send + Sync {
    /// Handle an insert.
    fn on_post_insert(&self, event: &PostInsertEvent<'_, C>) -> Result<(), Error>;

    /// Handle an insert on the asynchronous path.
    async fn on_post_insert_async(
        &self,
        event: &PostInsertEvent<'_, C>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.on_post_insert(event)
    }
}

/// Observer of updates.
#[async_trait]
pub trait PostUpdateEventListener<C: Send + Sync + 'static>: Send + Sync {
    /// Handle an update.
    fn on_post_update(&self, event: &PostUpdateEvent<'_, C>) -> Result<(), Error>;

    /// Handle an update on the asynchronous path.
    async fn on_post_update_async(
        &self,
        event: &PostUpdateEvent<'_, C>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.on_post_update(event)
    }
}

/// Observer of deletes.
#[async_trait]
pub trait PostDeleteEventListener<C: Send + Sync + 'static>: Send + Sync {
    /// Handle a delete.
    fn on_post_delete(&self, event: &PostDeleteEvent<'_, C>) -> Result<(), Error>;

    /// Handle a delete on the asynchronous path.
    async fn on_post_delete_async(
        &self,
        event: &PostDeleteEvent<'_, C>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.on_post_delete(event)
    }
}

/// Ordered post-write listener lists.
pub struct EventListeners<C: Send + Sync + 'static> {
    post_insert: Vec<Arc<dyn PostInsertEventListener<C>>>,
    post_update: Vec<Arc<dyn PostUpdateEventListener<C>>>,
    post_delete: Vec<Arc<dyn PostDeleteEventListener<C>>>,
}

impl<C: Send + Sync + 'static> EventListeners<C> {
    /// Create empty lists.
    pub fn new() -> Self {
        Self {
            post_insert: Vec::new(),
            post_update: Vec::new(),
            post_delete: Vec::new(),
        }
    }

    /// Put an insert listener in front of the others.
    pub fn prepend_post_insert(&mut self, listener: Arc<dyn PostInsertEventListener<C>>) {
        self.post_insert.insert(0, listener);
    }

    /// Put an update listener in front of the others.
    pub fn prepend_post_update(&mut self, listener: Arc<dyn PostUpdateEventListener<C>>) {
        self.post_update.insert(0, listener);
    }

    /// Put a delete listener in front of the others.
    pub fn prepend_post_delete(&mut self, listener: Arc<dyn PostDeleteEventListener<C>>) {
        self.post_delete.insert(0, listener);
    }

    /// Add an insert listener at the end.
    pub fn append_post_insert(&mut self, listener: Arc<dyn PostInsertEventListener<C>>) {
        self.post_insert.push(listener);
    }

    /// Add an update listener at the end.
    pub fn append_post_update(&mut self, listener: Arc<dyn PostUpdateEventListener<C>>) {
        self.post_update.push(listener);
    }

    /// Add a delete listener at the end.
    pub fn append_post_delete(&mut self, listener: Arc<dyn PostDeleteEventListener<C>>) {
        self.post_delete.push(listener);
    }

    /// Number of listeners per list: insert, update, delete.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.post_insert.len(),
            self.post_update.len(),
            self.post_delete.len(),
        )
    }

    /// Notify insert listeners in order, stopping at the first error.
    pub fn fire_post_insert(&self, event: &PostInsertEvent<'_, C>) -> Result<(), Error> {
        for listener in &self.post_insert {
            listener.on_post_insert(event)?;
        }
        Ok(())
    }

    /// Notify update listeners in order, stopping at the first error.
    pub fn fire_post_update(&self, event: &PostUpdateEvent<'_, C>) -> Result<(), Error> {
        for listener in &self.post_update {
            listener.on_post_update(event)?;
        }
        Ok(())
    }

    /// Notify delete listeners in order, stopping at the first error.
    pub fn fire_post_delete(&self, event: &PostDeleteEvent<'_, C>) -> Result<(), Error> {
        for listener in &self.post_delete {
            listener.on_post_delete(event)?;
        }
        Ok(())
    }

    /// Asynchronous [`fire_post_insert`](Self::fire_post_insert).
    pub async fn fire_post_insert_async(
        &self,
        event: &PostInsertEvent<'_, C>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        for listener in &self.post_insert {
            listener.on_post_insert_async(event, cancel).await?;
        }
        Ok(())
    }

    /// Asynchronous [`fire_post_update`](Self::fire_post_update).
    pub async fn fire_post_update_async(
        &self,
        event: &PostUpdateEvent<'_, C>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        for listener in &self.post_update {
            listener.on_post_update_async(event, cancel).await?;
        }
        Ok(())
    }

    /// Asynchronous [`fire_post_delete`](Self::fire_post_delete).
    pub async fn fire_post_delete_async(
        &self,
        event: &PostDeleteEvent<'_, C>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        for listener in &self.post_delete {
            listener.on_post_delete_async(event, cancel).await?;
        }
        Ok(())
    }
}

impl<C: Send + Sync + 'static> Default for EventListeners<C> {
    fn default() -> Self {
        Self::new()
    }
}
