// Tue Jan 13 2026 - Alex

use crate::host::{DataFlags, HostMember, MemberId, StructId, TypeDatabase};
use crate::typelib::{CType, FieldSpec, Mismatch, TypelibError};
use std::fmt;

#[derive(Debug, Clone)]
pub struct StructMember {
    structure: String,
    name: String,
    offset: u64,
    ctype: CType,
    member_id: Option<MemberId>,
}

impl StructMember {
    /// `current_size` is the owning struct's size before this member, used
    /// as the offset when none is given. `index` is only used in errors.
    pub fn from_spec(
        structure: &str,
        index: usize,
        current_size: u64,
        spec: &FieldSpec,
        db: &dyn TypeDatabase,
    ) -> Result<Self, TypelibError> {
        log::debug!("[{}] field #{} = {:?}", structure, index, spec);

        let offset = spec.offset.unwrap_or(current_size);

        let name = match (&spec.name, spec.offset) {
            (Some(name), _) => name.clone(),
            (None, Some(offset)) => format!("field_{:x}", offset),
            (None, None) => {
                return Err(TypelibError::MissingName {
                    structure: structure.to_string(),
                    index,
                })
            }
        };
        if name.trim().is_empty() {
            return Err(TypelibError::EmptyName {
                structure: structure.to_string(),
                index,
            });
        }

        let decl = spec.ctype.as_deref().ok_or_else(|| TypelibError::MissingType {
            structure: structure.to_string(),
            member: name.clone(),
        })?;

        let ctype = CType::parse(decl, db).map_err(|source| TypelibError::TypeParse {
            member: format!("{}.{}", structure, name),
            decl: decl.to_string(),
            source,
        })?;

        if offset.checked_add(ctype.size()).is_none() {
            return Err(TypelibError::OffsetOverflow {
                structure: structure.to_string(),
                member: name,
            });
        }

        Ok(Self {
            structure: structure.to_string(),
            name,
            offset,
            ctype,
            member_id: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.ctype.size()
    }

    pub fn offset_end(&self) -> u64 {
        self.offset + self.size()
    }

    pub fn ctype(&self) -> &CType {
        &self.ctype
    }

    pub fn type_name(&self) -> &str {
        self.ctype.name()
    }

    pub fn flags(&self) -> DataFlags {
        self.ctype.flags()
    }

    pub fn member_id(&self) -> Option<MemberId> {
        self.member_id
    }

    pub fn hierarchy(&self) -> String {
        format!("{}.{}", self.structure, self.name)
    }

    /// Creates the host field and attaches the resolved type to it.
    pub fn materialize(&mut self, db: &mut dyn TypeDatabase, sid: StructId) -> Result<MemberId, TypelibError> {
        let wrap = |source| TypelibError::MemberMaterialization {
            member: self.hierarchy(),
            source,
        };

        let mid = db
            .create_member(sid, &self.name, self.offset, self.size(), self.flags())
            .map_err(wrap)?;
        db.set_member_type(sid, mid, self.offset, self.ctype.resolved())
            .map_err(wrap)?;

        self.member_id = Some(mid);
        log::info!(
            "Created struct member '{}' of size {} at offset {}",
            self.hierarchy(),
            self.size(),
            self.offset
        );
        Ok(mid)
    }

    /// Compares against an existing host record. An empty result means the
    /// record matches exactly.
    pub fn validate(&self, host: &HostMember) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if host.name != self.name {
            mismatches.push(Mismatch::MemberName {
                expected: self.name.clone(),
                found: host.name.clone(),
            });
        }
        if host.start_offset != self.offset {
            mismatches.push(Mismatch::MemberOffset {
                member: self.name.clone(),
                expected: self.offset,
                found: host.start_offset,
            });
        }
        if host.size() != self.size() {
            mismatches.push(Mismatch::MemberSize {
                member: self.name.clone(),
                expected: self.size(),
                found: host.size(),
            });
        }

        if mismatches.is_empty() {
            log::debug!("validate: found match for '{}'", self.hierarchy());
        }
        mismatches
    }

    pub(crate) fn bind(&mut self, id: MemberId) {
        self.member_id = Some(id);
    }

    pub(crate) fn unbind(&mut self) {
        self.member_id = None;
    }
}

impl fmt::Display for StructMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ 0x{:X}", self.ctype, self.name, self.offset)
    }
}
