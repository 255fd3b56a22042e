//! Post-write events delivered by the mapping runtime.
//!
//! State arrays are aligned with [`EntityDef::fields`]: the value at index
//! `i` belongs to `entity.fields[i]`.

use crate::error::Error;
use crate::metadata::EntityDef;
use crate::value::{Scalar, Value};

/// An entity was inserted.
#[derive(Debug)]
pub struct PostInsertEvent<'a, C> {
    /// Mapped type of the entity.
    pub entity: &'a EntityDef,
    /// Identity of the inserted entity.
    pub id: Scalar,
    /// Property values as written.
    pub state: &'a [Value],
    /// Connection of the unit of work that performed the write.
    pub session: &'a C,
}

/// An entity was updated.
#[derive(Debug)]
pub struct PostUpdateEvent<'a, C> {
    /// Mapped type of the entity.
    pub entity: &'a EntityDef,
    /// Identity of the updated entity.
    pub id: Scalar,
    /// Property values after the update.
    pub state: &'a [Value],
    /// Property values as loaded, `None` if the entity was never loaded into
    /// the session.
    pub old_state: Option<&'a [Value]>,
    /// Indices of dirty properties as computed by the runtime. Treated as a
    /// set: order and repeats are ignored. When absent they are computed by
    /// comparing both state arrays.
    pub dirty_fields: Option<&'a [usize]>,
    /// Connection of the unit of work that performed the write.
    pub session: &'a C,
}

/// An entity was deleted.
#[derive(Debug)]
pub struct PostDeleteEvent<'a, C> {
    /// Mapped type of the entity.
    pub entity: &'a EntityDef,
    /// Identity of the deleted entity.
    pub id: Scalar,
    /// Property values at the time of deletion.
    pub deleted_state: &'a [Value],
    /// Connection of the unit of work that performed the write.
    pub session: &'a C,
}

impl<'a, C> PostInsertEvent<'a, C> {
    /// Create an insert event.
    pub fn new(
        entity: &'a EntityDef,
        id: impl Into<Scalar>,
        state: &'a [Value],
        session: &'a C,
    ) -> Self {
        Self {
            entity,
            id: id.into(),
            state,
            session,
        }
    }
}

impl<'a, C> PostUpdateEvent<'a, C> {
    /// Create an update event without precomputed dirty indices.
    pub fn new(
        entity: &'a EntityDef,
        id: impl Into<Scalar>,
        state: &'a [Value],
        old_state: Option<&'a [Value]>,
        session: &'a C,
    ) -> Self {
        Self {
            entity,
            id: id.into(),
            state,
            old_state,
            dirty_fields: None,
            session,
        }
    }

    /// Use the runtime's dirty indices.
    pub fn with_dirty_fields(mut self, dirty_fields: &'a [usize]) -> Self {
        self.dirty_fields = Some(dirty_fields);
        self
    }
}

impl<'a, C> PostDeleteEvent<'a, C> {
    /// Create a delete event.
    pub fn new(
        entity: &'a EntityDef,
        id: impl Into<Scalar>,
        deleted_state: &'a [Value],
        session: &'a C,
    ) -> Self {
        Self {
            entity,
            id: id.into(),
            deleted_state,
            session,
        }
    }
}

/// Check that a state array lines up with the entity's properties.
pub fn check_state(entity: &EntityDef, state: &[Value]) -> Result<(), Error> {
    if state.len() != entity.fields.len() {
        return Err(Error::StateMismatch {
            entity: entity.name.clone(),
            expected: entity.fields.len(),
            actual: state.len(),
        });
    }
    Ok(())
}

/// Indices of properties whose old and new values differ.
pub fn find_dirty(old_state: &[Value], state: &[Value]) -> Vec<usize> {
    old_state
        .iter()
        .zip(state)
        .enumerate()
        .filter(|(_, (old, new))| old != new)
        .map(|(index, _)| index)
        .collect()
}
