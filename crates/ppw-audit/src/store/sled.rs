//! Sled-backed audit store.
//!
//! Rows live in one tree keyed by a database-generated id (big-endian, so
//! iteration follows insertion order) and are stored as JSON. A session
//! buffers its inserts in a [`Batch`] and applies them atomically on flush.

use async_trait::async_trait;
use ppw_audit_core::AuditEntity;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use tracing::debug;

use crate::config::AuditConfig;
use crate::error::Error;
use crate::session::{AsyncAuditSession, AuditSession, AuditSessionFactory};

/// Audit store writing to a sled tree of the triggering database.
#[derive(Debug, Clone)]
pub struct SledAuditStore {
    tree_name: String,
}

impl SledAuditStore {
    /// Create a store writing to `tree_name`.
    pub fn new(tree_name: impl Into<String>) -> Self {
        Self {
            tree_name: tree_name.into(),
        }
    }

    /// Create a store using the configured tree.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.audit_tree.clone())
    }

    /// Name of the audit tree.
    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    /// Read back every stored row in insertion order.
    pub fn rows<A: DeserializeOwned>(&self, db: &Db) -> Result<Vec<A>, Error> {
        let tree = db.open_tree(&self.tree_name)?;
        tree.iter()
            .values()
            .map(|value| {
                let bytes = value?;
                serde_json::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Number of stored rows.
    pub fn len(&self, db: &Db) -> Result<usize, Error> {
        Ok(db.open_tree(&self.tree_name)?.len())
    }

    /// Check if no row is stored.
    pub fn is_empty(&self, db: &Db) -> Result<bool, Error> {
        Ok(db.open_tree(&self.tree_name)?.is_empty())
    }
}

/// Session of the sled store.
pub struct SledAuditSession {
    db: Db,
    tree: Tree,
    batch: Batch,
    pending: usize,
}

impl SledAuditSession {
    fn queue<A>(&mut self, row: &mut A) -> Result<(), Error>
    where
        A: AuditEntity + Serialize,
        A::Id: From<u64>,
    {
        let id = self.db.generate_id()?;
        row.assign_id(A::Id::from(id));

        let bytes = serde_json::to_vec(row).map_err(|e| Error::Serialization(e.to_string()))?;
        self.batch.insert(id.to_be_bytes().to_vec(), bytes);
        self.pending += 1;
        Ok(())
    }

    fn apply(&mut self) -> Result<usize, Error> {
        let written = self.pending;
        self.tree.apply_batch(std::mem::take(&mut self.batch))?;
        self.pending = 0;
        Ok(written)
    }
}

impl Drop for SledAuditSession {
    fn drop(&mut self) {
        if self.pending > 0 {
            debug!(
                pending = self.pending,
                tree = ?self.tree.name(),
                "audit session closed with unflushed rows"
            );
        }
    }
}

impl<A> AuditSession<A> for SledAuditSession
where
    A: AuditEntity + Serialize,
    A::Id: From<u64>,
{
    fn save(&mut self, row: &mut A) -> Result<(), Error> {
        self.queue(row)
    }

    fn flush(&mut self) -> Result<(), Error> {
        let written = self.apply()?;
        self.tree.flush()?;
        debug!(rows = written, "audit batch applied");
        Ok(())
    }
}

#[async_trait]
impl<A> AsyncAuditSession<A> for SledAuditSession
where
    A: AuditEntity + Serialize,
    A::Id: From<u64>,
{
    async fn save_async(&mut self, row: &mut A) -> Result<(), Error> {
        self.queue(row)
    }

    async fn flush_async(&mut self) -> Result<(), Error> {
        let written = std::mem::take(&mut self.pending);
        let batch = std::mem::take(&mut self.batch);
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || {
            tree.apply_batch(batch)?;
            tree.flush()
        })
        .await
        .map_err(|e| Error::Session(e.to_string()))??;
        debug!(rows = written, "audit batch applied");
        Ok(())
    }
}

impl<A> AuditSessionFactory<A> for SledAuditStore
where
    A: AuditEntity + Serialize,
    A::Id: From<u64>,
{
    type Connection = Db;
    type Session = SledAuditSession;

    fn open_session(&self, db: &Db) -> Result<SledAuditSession, Error> {
        let tree = db.open_tree(&self.tree_name)?;
        Ok(SledAuditSession {
            db: db.clone(),
            tree,
            batch: Batch::default(),
            pending: 0,
        })
    }
}
