//! Flat audit log values.

/// One property's serialized value as written to the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpwAuditLog {
    /// Property name, possibly suffixed for sub-properties of a value object.
    pub property_name: String,
    /// Serialized value; `None` for null.
    pub value: Option<String>,
}

impl PpwAuditLog {
    /// Create a log entry.
    pub fn new(property_name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            property_name: property_name.into(),
            value,
        }
    }

    /// Create a log entry for a null value.
    pub fn null(property_name: impl Into<String>) -> Self {
        Self::new(property_name, None)
    }
}

/// Before and after state of one changed property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PpwAuditLogPair {
    /// State before the update, if the property existed then.
    pub old: Option<PpwAuditLog>,
    /// State after the update, if the property exists now.
    pub new: Option<PpwAuditLog>,
}

impl PpwAuditLogPair {
    /// Pair up both sides.
    pub fn new(old: Option<PpwAuditLog>, new: Option<PpwAuditLog>) -> Self {
        Self { old, new }
    }

    /// Old serialized value.
    pub fn old_value(&self) -> Option<&str> {
        self.old.as_ref().and_then(|l| l.value.as_deref())
    }

    /// New serialized value.
    pub fn new_value(&self) -> Option<&str> {
        self.new.as_ref().and_then(|l| l.value.as_deref())
    }

    /// Whether the serialized values differ. Two nulls are equal.
    pub fn is_change(&self) -> bool {
        self.old_value() != self.new_value()
    }

    /// Name of the property, taken from whichever side is present.
    pub fn property_name(&self) -> Option<&str> {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|l| l.property_name.as_str())
    }
}
