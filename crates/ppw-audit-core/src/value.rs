//! Runtime field values carried by write events.

use crate::log::PpwAuditLog;
use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;

/// A plain column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int32(i) => write!(f, "{}", i),
            Scalar::Int64(i) => write!(f, "{}", i),
            Scalar::Float64(x) => write!(f, "{}", x),
            Scalar::String(s) => f.write_str(s),
            Scalar::DateTime(dt) => write!(f, "{}", dt),
            Scalar::Uuid(u) => write!(
                f,
                "{}-{}-{}-{}-{}",
                hex::encode(&u[0..4]),
                hex::encode(&u[4..6]),
                hex::encode(&u[6..8]),
                hex::encode(&u[8..10]),
                hex::encode(&u[10..16])
            ),
        }
    }
}

/// Reference to another tracked entity, reduced to its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    /// Referenced entity type name.
    pub entity: String,
    /// Identity value of the referenced entity.
    pub id: Scalar,
}

impl EntityRef {
    /// Create a reference.
    pub fn new(entity: impl Into<String>, id: impl Into<Scalar>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// A value type that controls its own audit log representation.
///
/// Single-valued implementations write one entry through
/// [`to_log_string`](AuditLoggable::to_log_string). Multi-valued ones return
/// `true` from [`is_multi_log`](AuditLoggable::is_multi_log) and enumerate
/// their sub-properties in [`to_log_entries`](AuditLoggable::to_log_entries).
///
/// Sub-property names must be derived from the given property name by
/// appending a suffix only; [`Value`] equality compares entries produced
/// under an empty property name.
pub trait AuditLoggable: fmt::Debug + Send + Sync {
    /// Whether the value expands into several log entries.
    fn is_multi_log(&self) -> bool {
        false
    }

    /// Serialized single value.
    fn to_log_string(&self) -> Option<String>;

    /// Log entries for the value stored under `property_name`.
    fn to_log_entries(&self, property_name: &str) -> Vec<PpwAuditLog> {
        vec![PpwAuditLog::new(property_name, self.to_log_string())]
    }
}

/// A field value as seen in an event state array.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null.
    Null,
    /// Reference to another entity.
    Reference(EntityRef),
    /// Value object expanding into several log entries.
    MultiLog(Arc<dyn AuditLoggable>),
    /// Value object with a custom single-entry representation.
    SingleLog(Arc<dyn AuditLoggable>),
    /// Plain column value.
    Scalar(Scalar),
}

impl Value {
    /// Wrap a loggable value, picking the variant it declares.
    pub fn loggable(value: Arc<dyn AuditLoggable>) -> Self {
        if value.is_multi_log() {
            Value::MultiLog(value)
        } else {
            Value::SingleLog(value)
        }
    }

    /// Create an entity reference value.
    pub fn reference(entity: impl Into<String>, id: impl Into<Scalar>) -> Self {
        Value::Reference(EntityRef::new(entity, id))
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get the plain column value.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::MultiLog(a), Value::MultiLog(b)) => {
                a.to_log_entries("") == b.to_log_entries("")
            }
            (Value::SingleLog(a), Value::SingleLog(b)) => a.to_log_string() == b.to_log_string(),
            _ => false,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float64(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(v: NaiveDateTime) -> Self {
        Scalar::DateTime(v)
    }
}

impl From<[u8; 16]> for Scalar {
    fn from(v: [u8; 16]) -> Self {
        Scalar::Uuid(v)
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(v.into())
                }
            }
        )*
    };
}

value_from_scalar!(bool, i32, i64, f64, String, &str, NaiveDateTime, [u8; 16]);

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Value::Scalar(v)
    }
}

impl From<EntityRef> for Value {
    fn from(v: EntityRef) -> Self {
        Value::Reference(v)
    }
}
