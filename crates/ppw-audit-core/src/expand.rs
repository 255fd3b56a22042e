//! Value-to-log expansion.
//!
//! Turns one raw field value into the flat log entries written to the audit
//! table. Dispatch is on the [`Value`] variant:
//!
//! | variant       | entries                                         |
//! |---------------|-------------------------------------------------|
//! | `Null`        | one, null value                                 |
//! | `Reference`   | one, the referenced entity's id                 |
//! | `MultiLog`    | zero or more, enumerated by the value itself    |
//! | `SingleLog`   | one, serialized by the value itself             |
//! | `Scalar`      | one, default serializer                         |

use crate::log::PpwAuditLog;
use crate::value::{Scalar, Value};
use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;

/// Format used for date-only columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Log entries keyed by property name.
pub type LogMap = BTreeMap<String, PpwAuditLog>;

/// Serialize a date/time value.
///
/// Date-only columns keep `yyyy-MM-dd`. Everything else uses a round-trip
/// format with 100ns precision, `yyyy-MM-ddTHH:mm:ss.fffffff`.
pub fn format_datetime(value: &NaiveDateTime, date_only: bool) -> String {
    if date_only {
        value.format(DATE_FORMAT).to_string()
    } else {
        format!(
            "{}.{:07}",
            value.format("%Y-%m-%dT%H:%M:%S"),
            value.nanosecond() % 1_000_000_000 / 100
        )
    }
}

/// Default serializer for plain column values.
pub fn format_scalar(value: &Scalar, date_only: bool) -> String {
    match value {
        Scalar::DateTime(dt) => format_datetime(dt, date_only),
        other => other.to_string(),
    }
}

/// Expand one field value into its log entries.
///
/// `date_only` states whether the backing column stores only a date.
pub fn expand_value(property_name: &str, value: &Value, date_only: bool) -> Vec<PpwAuditLog> {
    match value {
        Value::Null => vec![PpwAuditLog::null(property_name)],
        Value::Reference(reference) => vec![PpwAuditLog::new(
            property_name,
            Some(format_scalar(&reference.id, false)),
        )],
        Value::MultiLog(loggable) => loggable.to_log_entries(property_name),
        Value::SingleLog(loggable) => {
            vec![PpwAuditLog::new(property_name, loggable.to_log_string())]
        }
        Value::Scalar(scalar) => vec![PpwAuditLog::new(
            property_name,
            Some(format_scalar(scalar, date_only)),
        )],
    }
}

/// Expand a value into a map keyed by property name. Later entries with the
/// same name replace earlier ones.
pub fn expand_to_map(property_name: &str, value: &Value, date_only: bool) -> LogMap {
    expand_value(property_name, value, date_only)
        .into_iter()
        .map(|log| (log.property_name.clone(), log))
        .collect()
}
