// Tue Jan 13 2026 - Alex

use itertools::Itertools;
use std::fmt;

/// One way a host definition differs from the declared schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    StructSize { expected: u64, found: u64 },
    MemberName { expected: String, found: String },
    MemberOffset { member: String, expected: u64, found: u64 },
    MemberSize { member: String, expected: u64, found: u64 },
    /// Present in the host, absent from the schema
    UnexpectedMember { name: String, offset: u64 },
    /// Declared but never seen in the host
    MissingMember { name: String },
    MemberCount { expected: usize, found: usize },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::StructSize { expected, found } => {
                write!(f, "size mismatch: expected {} but got {}", expected, found)
            }
            Mismatch::MemberName { expected, found } => {
                write!(f, "name mismatch: expected '{}' but got '{}'", expected, found)
            }
            Mismatch::MemberOffset { member, expected, found } => {
                write!(f, "'{}' offset mismatch: expected 0x{:X} but got 0x{:X}", member, expected, found)
            }
            Mismatch::MemberSize { member, expected, found } => {
                write!(f, "'{}' size mismatch: expected {} but got {}", member, expected, found)
            }
            Mismatch::UnexpectedMember { name, offset } => {
                write!(f, "unexpected member '{}' @ 0x{:X}", name, offset)
            }
            Mismatch::MissingMember { name } => write!(f, "missing member '{}'", name),
            Mismatch::MemberCount { expected, found } => {
                write!(f, "incorrect number of members: expected {} but got {}", expected, found)
            }
        }
    }
}

/// Outcome of comparing an existing host struct against its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub structure: String,
    pub mismatches: Vec<Mismatch>,
}

impl ValidationReport {
    pub fn new(structure: &str) -> Self {
        Self {
            structure: structure.to_string(),
            mismatches: Vec::new(),
        }
    }

    pub fn push(&mut self, mismatch: Mismatch) {
        log::warn!("validate '{}': {}", self.structure, mismatch);
        self.mismatches.push(mismatch);
    }

    pub fn extend(&mut self, mismatches: impl IntoIterator<Item = Mismatch>) {
        for mismatch in mismatches {
            self.push(mismatch);
        }
    }

    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn overwrite_prompt(&self) -> String {
        format!(
            "A structure named '{}' already exists but does not match the needed format ({}). Do you wish to overwrite it?",
            self.structure,
            self.mismatches.iter().take(3).join("; ")
        )
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_match() {
            return write!(f, "{}: matches", self.structure);
        }
        writeln!(f, "{}: {} mismatch(es)", self.structure, self.mismatches.len())?;
        write!(f, "{}", self.mismatches.iter().map(|m| format!("  - {}", m)).join("\n"))
    }
}
