//! Persistence of change sets.
//!
//! Both paths open one session per non-empty change set, save every row and
//! flush once at the end. The session is dropped before returning, whatever
//! the outcome. Errors from the sink are returned unchanged.

use std::future::Future;

use ppw_audit_core::AuditEntity;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::session::{AsyncAuditSession, AuditSession, AuditSessionFactory};

/// Persist a change set synchronously. Returns the saved rows with their
/// identities assigned.
pub fn dispatch<A, F>(
    factory: &F,
    connection: &F::Connection,
    mut rows: Vec<A>,
) -> Result<Vec<A>, Error>
where
    A: AuditEntity,
    F: AuditSessionFactory<A>,
{
    if rows.is_empty() {
        return Ok(rows);
    }

    let mut session = factory.open_session(connection)?;
    debug!(rows = rows.len(), "audit session opened");

    for row in rows.iter_mut() {
        session.save(row)?;
    }
    session.flush()?;

    debug!(rows = rows.len(), "audit rows flushed");
    Ok(rows)
}

/// Persist a change set asynchronously.
///
/// Cancellation is observed while opening the session, around every save and
/// before the final flush. Once the flush has started it is awaited to
/// completion, so `Error::Cancelled` always means nothing was flushed. Rows
/// already handed to the session are left to the shared connection's
/// transaction.
pub async fn dispatch_async<A, F>(
    factory: &F,
    connection: &F::Connection,
    mut rows: Vec<A>,
    cancel: &CancellationToken,
) -> Result<Vec<A>, Error>
where
    A: AuditEntity,
    F: AuditSessionFactory<A>,
{
    if rows.is_empty() {
        return Ok(rows);
    }

    let mut session = cancellable(cancel, factory.open_session_async(connection)).await?;
    debug!(rows = rows.len(), "audit session opened");

    let total = rows.len();
    for (saved, row) in rows.iter_mut().enumerate() {
        if let Err(err) = cancellable(cancel, session.save_async(row)).await {
            if matches!(err, Error::Cancelled) {
                warn!(saved, total, "audit dispatch cancelled");
            }
            return Err(err);
        }
    }

    if cancel.is_cancelled() {
        warn!(saved = total, total, "audit dispatch cancelled before flush");
        return Err(Error::Cancelled);
    }
    // A started flush runs to completion so its outcome is the one reported.
    session.flush_async().await?;

    debug!(rows = total, "audit rows flushed");
    Ok(rows)
}

async fn cancellable<T, Fut>(cancel: &CancellationToken, operation: Fut) -> Result<T, Error>
where
    Fut: Future<Output = Result<T, Error>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = operation => result,
    }
}
