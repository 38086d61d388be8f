// Tue Jan 13 2026 - Alex

use crate::host::{MemberId, StructId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("A structure named '{0}' already exists")]
    NameCollision(String),
    #[error("Unknown structure id {0}")]
    UnknownStruct(StructId),
    #[error("Unknown member id {0}")]
    UnknownMember(MemberId),
    #[error("Member '{name}' rejected: {reason}")]
    MemberRejected { name: String, reason: String },
    #[error("Type '{type_name}' rejected for member {member}: {reason}")]
    TypeRejected {
        member: MemberId,
        type_name: String,
        reason: String,
    },
    #[error("Could not parse type '{decl}': {reason}")]
    Parse { decl: String, reason: String },
    #[error("Corrupt database: {0}")]
    Corrupt(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HostError {
    pub fn parse(decl: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            decl: decl.to_string(),
            reason: reason.into(),
        }
    }

    pub fn rejected(name: &str, reason: impl Into<String>) -> Self {
        Self::MemberRejected {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
