//! Entity metadata used to decide what gets audited.

mod action;
mod catalog;
mod entity;
mod field;
mod types;

pub use action::AuditLogAction;
pub use catalog::{AuditDeclaration, AuditMetadataSource, Catalog};
pub use entity::EntityDef;
pub use field::FieldDef;
pub use types::{FieldType, ScalarType};
