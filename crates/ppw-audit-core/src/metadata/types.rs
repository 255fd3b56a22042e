//! Property type definitions.

/// Scalar column types of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Calendar date without a time of day.
    Date,
    /// Date and time of day.
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

/// Mapped type of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A single column value.
    Scalar(ScalarType),
    /// A many-to-one reference to another entity.
    Reference {
        /// Name of the referenced entity type.
        entity: String,
    },
    /// A value object mapped onto several columns.
    Component {
        /// Name of the component type.
        name: String,
    },
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create a reference field type.
    pub fn reference(entity: impl Into<String>) -> Self {
        FieldType::Reference {
            entity: entity.into(),
        }
    }

    /// Create a component field type.
    pub fn component(name: impl Into<String>) -> Self {
        FieldType::Component { name: name.into() }
    }

    /// Whether the column stores only the date part of a date/time value.
    pub fn is_date_only(&self) -> bool {
        matches!(self, FieldType::Scalar(ScalarType::Date))
    }
}
