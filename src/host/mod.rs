// Tue Jan 13 2026 - Alex

pub mod error;
pub mod flags;
pub mod memory;
pub mod parser;
pub mod prompt;
pub mod types;

pub use error::HostError;
pub use flags::DataFlags;
pub use memory::{HostCall, InMemoryDatabase};
pub use parser::DeclParser;
pub use prompt::{FixedAnswer, ScriptedAnswers, TerminalConfirm};
pub use types::{Decision, HostMember, MemberId, ResolvedType, StructId, TypeKind};

/// The disassembler's struct database as seen by the reconciliation code.
///
/// Every call is a direct request against a shared, persistent store; no call
/// is transactional.
pub trait TypeDatabase {
    fn find_struct_by_name(&self, name: &str) -> Option<StructId>;
    fn create_struct(&mut self, name: &str) -> Result<StructId, HostError>;
    fn delete_struct(&mut self, id: StructId) -> Result<(), HostError>;
    fn struct_size(&self, id: StructId) -> Result<u64, HostError>;

    /// Members in host storage order.
    fn members(&self, id: StructId) -> Result<Vec<HostMember>, HostError>;

    fn create_member(
        &mut self,
        id: StructId,
        name: &str,
        offset: u64,
        size: u64,
        flags: DataFlags,
    ) -> Result<MemberId, HostError>;

    fn set_member_type(
        &mut self,
        id: StructId,
        member: MemberId,
        offset: u64,
        ty: &ResolvedType,
    ) -> Result<(), HostError>;

    fn parse_type_declaration(&self, decl: &str) -> Result<ResolvedType, HostError>;
}

/// Blocking yes/no question put to the user.
pub trait ConfirmationProvider {
    fn confirm(&mut self, prompt: &str) -> Decision;
}
