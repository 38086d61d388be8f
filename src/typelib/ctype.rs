// Tue Jan 13 2026 - Alex

use crate::host::{DataFlags, HostError, ResolvedType, TypeDatabase, TypeKind};
use std::fmt;

const STRUCT_KEYWORDS: [&str; 3] = ["struct", "union", "class"];

/// A C type declaration resolved once through the host parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    decl: String,
    resolved: ResolvedType,
}

impl CType {
    pub fn parse(decl: &str, db: &dyn TypeDatabase) -> Result<Self, HostError> {
        let resolved = db.parse_type_declaration(decl)?;
        if resolved.size == 0 {
            return Err(HostError::parse(decl, "type has no size"));
        }
        log::trace!("Resolved '{}' to '{}' ({} bytes)", decl, resolved.name, resolved.size);

        Ok(Self {
            decl: decl.to_string(),
            resolved,
        })
    }

    pub fn decl(&self) -> &str {
        &self.decl
    }

    pub fn size(&self) -> u64 {
        self.resolved.size
    }

    pub fn name(&self) -> &str {
        &self.resolved.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.resolved.kind
    }

    pub fn resolved(&self) -> &ResolvedType {
        &self.resolved
    }

    pub fn is_struct(&self) -> bool {
        let head = self.name().split_whitespace().next().unwrap_or("");
        STRUCT_KEYWORDS.contains(&head)
    }

    pub fn flags(&self) -> DataFlags {
        DataFlags::for_type(&self.resolved)
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolved.name)
    }
}
