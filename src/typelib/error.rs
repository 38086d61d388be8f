// Tue Jan 13 2026 - Alex

use crate::host::HostError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypelibError {
    #[error("Member with name '{member}' already present in structure '{structure}'")]
    DuplicateMember { structure: String, member: String },
    #[error("Member #{index} of '{structure}' needs a 'name' or an 'offset'")]
    MissingName { structure: String, index: usize },
    #[error("Member '{member}' of '{structure}' needs a 'ctype'")]
    MissingType { structure: String, member: String },
    #[error("Member #{index} of '{structure}' has an empty name")]
    EmptyName { structure: String, index: usize },
    #[error("Member '{member}' of '{structure}' overlaps member '{other}'")]
    OverlappingMember { structure: String, member: String, other: String },
    #[error("Member '{member}' of '{structure}' ends past the addressable range")]
    OffsetOverflow { structure: String, member: String },
    #[error("May not call {operation} twice on '{structure}'")]
    Reentrant { structure: String, operation: &'static str },
    #[error("Schema of '{0}' has not been parsed")]
    NotParsed(String),
    #[error("'{0}' is not waiting for an overwrite decision")]
    NoPendingConfirmation(String),
    #[error("Could not parse type '{decl}' for '{member}': {source}")]
    TypeParse {
        member: String,
        decl: String,
        #[source]
        source: HostError,
    },
    #[error("Could not create struct member '{member}': {source}")]
    MemberMaterialization {
        member: String,
        #[source]
        source: HostError,
    },
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("User declined to overwrite structure '{0}'")]
    Declined(String),
    #[error("User cancelled operation on structure '{0}'")]
    Cancelled(String),
    #[error("Schema error: {0}")]
    Schema(String),
}

impl TypelibError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateMember { .. }
                | Self::MissingName { .. }
                | Self::MissingType { .. }
                | Self::EmptyName { .. }
                | Self::OverlappingMember { .. }
                | Self::OffsetOverflow { .. }
                | Self::Reentrant { .. }
                | Self::NotParsed(_)
                | Self::NoPendingConfirmation(_)
        )
    }

    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::Declined(_) | Self::Cancelled(_))
    }
}
