//! Units of work used to persist audit rows.
//!
//! A session is opened against the connection of the triggering write so the
//! audit rows commit or fail together with it. Sessions release their
//! resources when dropped.

use async_trait::async_trait;
use ppw_audit_core::AuditEntity;

use crate::error::Error;

/// Synchronous audit unit of work.
pub trait AuditSession<A: AuditEntity>: Send {
    /// Queue a row for insertion, assigning its identity.
    fn save(&mut self, row: &mut A) -> Result<(), Error>;

    /// Write every queued row.
    fn flush(&mut self) -> Result<(), Error>;
}

/// Asynchronous audit unit of work.
#[async_trait]
pub trait AsyncAuditSession<A: AuditEntity>: Send {
    /// Queue a row for insertion, assigning its identity.
    async fn save_async(&mut self, row: &mut A) -> Result<(), Error>;

    /// Write every queued row.
    async fn flush_async(&mut self) -> Result<(), Error>;
}

/// Opens audit sessions on the connection of a triggering write.
#[async_trait]
pub trait AuditSessionFactory<A: AuditEntity>: Send + Sync {
    /// Connection shared with the triggering unit of work.
    type Connection: Send + Sync + 'static;

    /// Session type, usable from both dispatch paths.
    type Session: AuditSession<A> + AsyncAuditSession<A>;

    /// Open a session on the connection.
    fn open_session(&self, connection: &Self::Connection) -> Result<Self::Session, Error>;

    /// Open a session on the connection without blocking.
    async fn open_session_async(
        &self,
        connection: &Self::Connection,
    ) -> Result<Self::Session, Error> {
        self.open_session(connection)
    }
}
