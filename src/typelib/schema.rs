// Tue Jan 13 2026 - Alex

use crate::typelib::TypelibError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One declared field. `ctype` is required; `name` may be omitted when an
/// explicit `offset` is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctype: Option<String>,
}

impl FieldSpec {
    pub fn new(name: &str, ctype: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            offset: None,
            ctype: Some(ctype.to_string()),
        }
    }

    pub fn at(offset: u64, ctype: &str) -> Self {
        Self {
            name: None,
            offset: Some(offset),
            ctype: Some(ctype.to_string()),
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

/// A JSON document declaring several structs. Order matters: a struct may use
/// `struct X` only for structs declared before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    pub structs: Vec<StructSchema>,
}

impl SchemaFile {
    pub fn load(path: &Path) -> Result<Self, TypelibError> {
        let data = fs::read_to_string(path)
            .map_err(|e| TypelibError::Schema(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, TypelibError> {
        let file: Self = serde_json::from_str(data).map_err(|e| TypelibError::Schema(e.to_string()))?;
        file.check_names()?;
        Ok(file)
    }

    pub fn get(&self, name: &str) -> Option<&StructSchema> {
        self.structs.iter().find(|s| s.name == name)
    }

    fn check_names(&self) -> Result<(), TypelibError> {
        let mut seen = HashSet::new();
        for schema in &self.structs {
            if schema.name.trim().is_empty() {
                return Err(TypelibError::Schema("structure with an empty name".to_string()));
            }
            if !seen.insert(schema.name.as_str()) {
                return Err(TypelibError::Schema(format!("structure '{}' declared twice", schema.name)));
            }
        }
        Ok(())
    }
}
