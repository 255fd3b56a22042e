//! In-memory audit store.
//!
//! Records what the dispatcher does with it: sessions opened and closed,
//! rows flushed, flush count. Failures and cancellation can be injected.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use ppw_audit_core::AuditEntity;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::session::{AsyncAuditSession, AuditSession, AuditSessionFactory};

/// Connection handle of the in-memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConnection {
    /// Connection identifier.
    pub id: u64,
}

impl MemoryConnection {
    /// Create a connection handle.
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
struct MemoryState<A> {
    rows: Vec<A>,
    next_id: u64,
    sessions_opened: usize,
    sessions_closed: usize,
    saves_attempted: usize,
    flushes: usize,
    connections: Vec<u64>,
    fail_on_save: Option<usize>,
    cancel_after: Option<(usize, CancellationToken)>,
    cancel_on_flush: Option<CancellationToken>,
}

/// Audit store keeping flushed rows in memory.
#[derive(Debug)]
pub struct MemoryAuditStore<A> {
    state: Arc<Mutex<MemoryState<A>>>,
}

impl<A> Clone for MemoryAuditStore<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: Clone> MemoryAuditStore<A> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                rows: Vec::new(),
                next_id: 0,
                sessions_opened: 0,
                sessions_closed: 0,
                saves_attempted: 0,
                flushes: 0,
                connections: Vec::new(),
                fail_on_save: None,
                cancel_after: None,
                cancel_on_flush: None,
            })),
        }
    }

    /// Fail the save with the given zero-based attempt number.
    pub fn fail_on_save(self, attempt: usize) -> Self {
        self.state.lock().fail_on_save = Some(attempt);
        self
    }

    /// Cancel `token` once `saves` saves have been attempted.
    pub fn cancel_after_saves(self, saves: usize, token: CancellationToken) -> Self {
        self.state.lock().cancel_after = Some((saves, token));
        self
    }

    /// Cancel `token` while a flush is in progress.
    pub fn cancel_on_flush(self, token: CancellationToken) -> Self {
        self.state.lock().cancel_on_flush = Some(token);
        self
    }

    /// Flushed rows, in save order.
    pub fn rows(&self) -> Vec<A> {
        self.state.lock().rows.clone()
    }

    /// Number of sessions opened.
    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    /// Number of sessions released.
    pub fn sessions_closed(&self) -> usize {
        self.state.lock().sessions_closed
    }

    /// Number of save calls, failed ones included.
    pub fn saves_attempted(&self) -> usize {
        self.state.lock().saves_attempted
    }

    /// Number of flushes.
    pub fn flush_count(&self) -> usize {
        self.state.lock().flushes
    }

    /// Connection ids sessions were opened on, in order.
    pub fn connections_used(&self) -> Vec<u64> {
        self.state.lock().connections.clone()
    }
}

impl<A: Clone> Default for MemoryAuditStore<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Session of the in-memory store.
pub struct MemoryAuditSession<A> {
    state: Arc<Mutex<MemoryState<A>>>,
    pending: Vec<A>,
}

impl<A> Drop for MemoryAuditSession<A> {
    fn drop(&mut self) {
        self.state.lock().sessions_closed += 1;
    }
}

impl<A> AuditSession<A> for MemoryAuditSession<A>
where
    A: AuditEntity + Clone,
    A::Id: From<u64>,
{
    fn save(&mut self, row: &mut A) -> Result<(), Error> {
        let mut state = self.state.lock();
        let attempt = state.saves_attempted;
        state.saves_attempted += 1;

        if state.fail_on_save == Some(attempt) {
            return Err(Error::Session(format!("save {} rejected", attempt)));
        }

        state.next_id += 1;
        row.assign_id(A::Id::from(state.next_id));
        self.pending.push(row.clone());

        if let Some((after, token)) = &state.cancel_after {
            if state.saves_attempted >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.rows.append(&mut self.pending);
        state.flushes += 1;
        Ok(())
    }
}

#[async_trait]
impl<A> AsyncAuditSession<A> for MemoryAuditSession<A>
where
    A: AuditEntity + Clone,
    A::Id: From<u64>,
{
    async fn save_async(&mut self, row: &mut A) -> Result<(), Error> {
        AuditSession::save(self, row)
    }

    async fn flush_async(&mut self) -> Result<(), Error> {
        let token = self.state.lock().cancel_on_flush.clone();
        if let Some(token) = token {
            token.cancel();
            tokio::task::yield_now().await;
        }
        AuditSession::flush(self)
    }
}

impl<A> AuditSessionFactory<A> for MemoryAuditStore<A>
where
    A: AuditEntity + Clone,
    A::Id: From<u64>,
{
    type Connection = MemoryConnection;
    type Session = MemoryAuditSession<A>;

    fn open_session(&self, connection: &MemoryConnection) -> Result<Self::Session, Error> {
        let mut state = self.state.lock();
        state.sessions_opened += 1;
        state.connections.push(connection.id);

        Ok(MemoryAuditSession {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        })
    }
}
