// Tue Jan 13 2026 - Alex

use crate::host::{ConfirmationProvider, TypeDatabase};
use crate::typelib::{BaseStruct, FieldSpec, TypelibError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A struct type declared in code.
///
/// ```ignore
/// struct Vec3;
///
/// impl StructDefinition for Vec3 {
///     fn schema() -> Vec<FieldSpec> {
///         vec![
///             FieldSpec::new("x", "float"),
///             FieldSpec::new("y", "float"),
///             FieldSpec::new("z", "float"),
///         ]
///     }
/// }
/// ```
pub trait StructDefinition: 'static {
    /// Host name override. Defaults to the Rust type name.
    const NAME: Option<&'static str> = None;

    fn schema() -> Vec<FieldSpec>;

    fn struct_name() -> String {
        match Self::NAME {
            Some(name) => name.to_string(),
            None => short_type_name(type_name::<Self>()).to_string(),
        }
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

static GLOBAL: Lazy<StructRegistry> = Lazy::new(StructRegistry::new);

/// One materialized [`BaseStruct`] per [`StructDefinition`] type.
pub struct StructRegistry {
    entries: Mutex<HashMap<TypeId, Arc<BaseStruct>>>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn global() -> &'static StructRegistry {
        &GLOBAL
    }

    /// Returns the live descriptor for `T`, building and materializing it on
    /// first use. Later calls never touch `db` or `confirm`. A failed attempt
    /// is not remembered.
    ///
    /// The lock is held while `confirm` runs; it must not call back into the
    /// registry.
    pub fn get_or_materialize<T: StructDefinition>(
        &self,
        db: &mut dyn TypeDatabase,
        confirm: &mut dyn ConfirmationProvider,
    ) -> Result<Arc<BaseStruct>, TypelibError> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&TypeId::of::<T>()) {
            return Ok(Arc::clone(existing));
        }

        let name = T::struct_name();
        log::debug!("Initializing '{}'", name);
        let built = Arc::new(BaseStruct::build(&name, &T::schema(), db, confirm)?);
        entries.insert(TypeId::of::<T>(), Arc::clone(&built));
        Ok(built)
    }

    pub fn get<T: StructDefinition>(&self) -> Option<Arc<BaseStruct>> {
        self.entries.lock().get(&TypeId::of::<T>()).cloned()
    }

    pub fn contains<T: StructDefinition>(&self) -> bool {
        self.entries.lock().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for StructRegistry {
    fn default() -> Self {
        Self::new()
    }
}
