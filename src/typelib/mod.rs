// Tue Jan 13 2026 - Alex

pub mod base_struct;
pub mod ctype;
pub mod error;
pub mod member;
pub mod registry;
pub mod schema;
pub mod validation;

pub use base_struct::{BaseStruct, Reconciliation, StructState};
pub use ctype::CType;
pub use error::TypelibError;
pub use member::StructMember;
pub use registry::{StructDefinition, StructRegistry};
pub use schema::{FieldSpec, SchemaFile, StructSchema};
pub use validation::{Mismatch, ValidationReport};
