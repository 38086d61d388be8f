// Tue Jan 15 2026 - Alex

pub mod config;
pub mod host;
pub mod typelib;
pub mod ui;
pub mod utils;

pub use config::Config;
pub use host::{ConfirmationProvider, Decision, InMemoryDatabase, TypeDatabase};
pub use typelib::{BaseStruct, FieldSpec, Reconciliation, StructDefinition, StructRegistry, TypelibError};
