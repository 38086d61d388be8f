// Tue Jan 13 2026 - Alex

use crate::host::{DataFlags, DeclParser, HostError, HostMember, MemberId, ResolvedType, StructId, TypeDatabase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A mutating request as it reached the database, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateStruct(String),
    DeleteStruct(StructId),
    CreateMember { sid: StructId, name: String, offset: u64, size: u64 },
    SetMemberType { sid: StructId, member: MemberId, type_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMember {
    pub id: MemberId,
    pub name: String,
    pub offset: u64,
    pub size: u64,
    pub flags: u32,
    pub type_name: Option<String>,
}

impl StoredMember {
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStruct {
    pub id: StructId,
    pub name: String,
    pub members: Vec<StoredMember>,
}

impl StoredStruct {
    pub fn size(&self) -> u64 {
        self.members.iter().map(|m| m.end()).max().unwrap_or(0)
    }
}

/// Self-contained struct database implementing the host contract. Persisted
/// as JSON so a schema can be synced against it across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryDatabase {
    #[serde(default = "default_pointer_size")]
    pointer_size: u64,
    next_id: u64,
    structs: BTreeMap<u64, StoredStruct>,
    #[serde(skip)]
    journal: Vec<HostCall>,
}

fn default_pointer_size() -> u64 {
    8
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::with_pointer_size(default_pointer_size())
    }

    pub fn with_pointer_size(pointer_size: u64) -> Self {
        Self {
            pointer_size,
            next_id: 0xFF00_0000,
            structs: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let data = fs::read_to_string(path)?;
        let db = Self::from_json(&data)?;
        log::debug!("Loaded {} structures from {}", db.structs.len(), path.display());
        Ok(db)
    }

    /// Deserializes a stored database, rejecting member ranges that could not
    /// have been created through the host calls. Members come back in offset
    /// order whatever order the file lists them in.
    pub fn from_json(data: &str) -> Result<Self, HostError> {
        let mut db: Self = serde_json::from_str(data)?;
        for stored in db.structs.values_mut() {
            stored.members.sort_by_key(|m| m.offset);

            let mut previous: Option<&StoredMember> = None;
            for member in &stored.members {
                if member.size == 0 || member.offset.checked_add(member.size).is_none() {
                    return Err(HostError::Corrupt(format!(
                        "member '{}.{}' has range 0x{:X}+0x{:X}",
                        stored.name, member.name, member.offset, member.size
                    )));
                }
                if let Some(prev) = previous.filter(|p| p.end() > member.offset) {
                    return Err(HostError::Corrupt(format!(
                        "members '{}' and '{}' of '{}' overlap",
                        prev.name, member.name, stored.name
                    )));
                }
                previous = Some(member);
            }
        }
        Ok(db)
    }

    pub fn load_or_default(path: &Path, pointer_size: u64) -> Result<Self, HostError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("Database {} does not exist yet, starting empty", path.display());
            Ok(Self::with_pointer_size(pointer_size))
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), HostError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        log::debug!("Saved {} structures to {}", self.structs.len(), path.display());
        Ok(())
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn journal(&self) -> &[HostCall] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    pub fn structs(&self) -> impl Iterator<Item = &StoredStruct> {
        self.structs.values()
    }

    pub fn get(&self, id: StructId) -> Option<&StoredStruct> {
        self.structs.get(&id.as_u64())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&StoredStruct> {
        self.structs.values().find(|s| s.name == name)
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get_mut(&mut self, id: StructId) -> Result<&mut StoredStruct, HostError> {
        self.structs.get_mut(&id.as_u64()).ok_or(HostError::UnknownStruct(id))
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDatabase for InMemoryDatabase {
    fn find_struct_by_name(&self, name: &str) -> Option<StructId> {
        self.get_by_name(name).map(|s| s.id)
    }

    fn create_struct(&mut self, name: &str) -> Result<StructId, HostError> {
        if self.get_by_name(name).is_some() {
            return Err(HostError::NameCollision(name.to_string()));
        }

        let id = StructId::new(self.alloc_id());
        self.structs.insert(
            id.as_u64(),
            StoredStruct {
                id,
                name: name.to_string(),
                members: Vec::new(),
            },
        );
        self.journal.push(HostCall::CreateStruct(name.to_string()));
        Ok(id)
    }

    fn delete_struct(&mut self, id: StructId) -> Result<(), HostError> {
        self.structs.remove(&id.as_u64()).ok_or(HostError::UnknownStruct(id))?;
        self.journal.push(HostCall::DeleteStruct(id));
        Ok(())
    }

    fn struct_size(&self, id: StructId) -> Result<u64, HostError> {
        self.get(id).map(|s| s.size()).ok_or(HostError::UnknownStruct(id))
    }

    fn members(&self, id: StructId) -> Result<Vec<HostMember>, HostError> {
        let stored = self.get(id).ok_or(HostError::UnknownStruct(id))?;
        Ok(stored
            .members
            .iter()
            .map(|m| HostMember {
                id: m.id,
                name: m.name.clone(),
                start_offset: m.offset,
                end_offset: m.end(),
            })
            .collect())
    }

    fn create_member(
        &mut self,
        id: StructId,
        name: &str,
        offset: u64,
        size: u64,
        flags: DataFlags,
    ) -> Result<MemberId, HostError> {
        if size == 0 {
            return Err(HostError::rejected(name, "zero-sized member"));
        }
        let end = offset
            .checked_add(size)
            .ok_or_else(|| HostError::rejected(name, "member end overflows"))?;

        let member_id = MemberId::new(self.next_id);
        let stored = self.get_mut(id)?;

        if stored.members.iter().any(|m| m.name == name) {
            return Err(HostError::rejected(name, "duplicate member name"));
        }
        if let Some(other) = stored.members.iter().find(|m| offset < m.end() && m.offset < end) {
            return Err(HostError::rejected(
                name,
                format!("range 0x{:x}..0x{:x} overlaps '{}'", offset, end, other.name),
            ));
        }

        let position = stored.members.partition_point(|m| m.offset < offset);
        stored.members.insert(
            position,
            StoredMember {
                id: member_id,
                name: name.to_string(),
                offset,
                size,
                flags: flags.bits(),
                type_name: None,
            },
        );

        self.next_id += 1;
        self.journal.push(HostCall::CreateMember {
            sid: id,
            name: name.to_string(),
            offset,
            size,
        });
        Ok(member_id)
    }

    fn set_member_type(
        &mut self,
        id: StructId,
        member: MemberId,
        offset: u64,
        ty: &ResolvedType,
    ) -> Result<(), HostError> {
        let stored = self.get_mut(id)?;
        let record = stored
            .members
            .iter_mut()
            .find(|m| m.id == member)
            .ok_or(HostError::UnknownMember(member))?;

        let reject = |reason: String| HostError::TypeRejected {
            member,
            type_name: ty.name.clone(),
            reason,
        };
        if record.offset != offset {
            return Err(reject(format!("member lives at 0x{:x}, not 0x{:x}", record.offset, offset)));
        }
        if record.size != ty.size {
            return Err(reject(format!("type is {} bytes, member is {}", ty.size, record.size)));
        }

        record.type_name = Some(ty.name.clone());
        self.journal.push(HostCall::SetMemberType {
            sid: id,
            member,
            type_name: ty.name.clone(),
        });
        Ok(())
    }

    fn parse_type_declaration(&self, decl: &str) -> Result<ResolvedType, HostError> {
        DeclParser::new(self.pointer_size).parse(decl, |name| self.get_by_name(name).map(|s| s.size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TypeKind;

    #[test]
    fn test_create_and_enumerate_in_offset_order() {
        let mut db = InMemoryDatabase::new();
        let sid = db.create_struct("Pair").unwrap();
        db.create_member(sid, "second", 4, 4, DataFlags::FF_DATA).unwrap();
        db.create_member(sid, "first", 0, 4, DataFlags::FF_DATA).unwrap();

        let members = db.members(sid).unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(db.struct_size(sid).unwrap(), 8);
        assert_eq!(db.find_struct_by_name("Pair"), Some(sid));
    }

    #[test]
    fn test_rejects_collisions_and_overlaps() {
        let mut db = InMemoryDatabase::new();
        let sid = db.create_struct("S").unwrap();
        assert!(matches!(db.create_struct("S"), Err(HostError::NameCollision(_))));

        db.create_member(sid, "a", 0, 4, DataFlags::FF_DATA).unwrap();
        assert!(db.create_member(sid, "b", 2, 2, DataFlags::FF_DATA).is_err());
        assert!(db.create_member(sid, "a", 8, 2, DataFlags::FF_DATA).is_err());
        assert!(db.create_member(sid, "c", 8, 0, DataFlags::FF_DATA).is_err());
        assert_eq!(db.members(sid).unwrap().len(), 1);
    }

    #[test]
    fn test_set_member_type_checks_size() {
        let mut db = InMemoryDatabase::new();
        let sid = db.create_struct("S").unwrap();
        let mid = db.create_member(sid, "a", 0, 4, DataFlags::FF_DATA).unwrap();

        let wrong = ResolvedType { size: 2, name: "uint16_t".to_string(), kind: TypeKind::Integer };
        assert!(db.set_member_type(sid, mid, 0, &wrong).is_err());

        let right = db.parse_type_declaration("uint32_t").unwrap();
        db.set_member_type(sid, mid, 0, &right).unwrap();
        assert_eq!(db.get(sid).unwrap().members[0].type_name.as_deref(), Some("uint32_t"));
    }

    #[test]
    fn test_journal_records_mutations_only() {
        let mut db = InMemoryDatabase::new();
        let sid = db.create_struct("S").unwrap();
        let _ = db.find_struct_by_name("S");
        let _ = db.members(sid);
        db.delete_struct(sid).unwrap();

        assert_eq!(db.journal(), &[HostCall::CreateStruct("S".to_string()), HostCall::DeleteStruct(sid)]);
        assert!(db.delete_struct(sid).is_err());
    }

    #[test]
    fn test_parser_sees_existing_structs() {
        let mut db = InMemoryDatabase::with_pointer_size(4);
        let sid = db.create_struct("Inner").unwrap();
        db.create_member(sid, "x", 0, 8, DataFlags::FF_DATA).unwrap();

        assert_eq!(db.parse_type_declaration("struct Inner").unwrap().size, 8);
        assert_eq!(db.parse_type_declaration("Inner *").unwrap().size, 4);
    }

    #[test]
    fn test_json_persistence() {
        let mut db = InMemoryDatabase::new();
        let sid = db.create_struct("S").unwrap();
        db.create_member(sid, "a", 0, 4, DataFlags::FF_DATA).unwrap();

        let json = serde_json::to_string(&db).unwrap();
        let mut restored: InMemoryDatabase = serde_json::from_str(&json).unwrap();
        assert!(restored.journal().is_empty());
        assert_eq!(restored.find_struct_by_name("S"), Some(sid));

        let other = restored.create_struct("T").unwrap();
        assert_ne!(other, sid);
    }

    fn stored_json(members: &str) -> String {
        format!(
            r#"{{ "pointer_size": 8, "next_id": 4278190081, "structs": {{ "4278190080": {{ "id": 4278190080, "name": "S", "members": [{}] }} }} }}"#,
            members
        )
    }

    #[test]
    fn test_load_sorts_members_by_offset() {
        let json = stored_json(
            r#"{ "id": 2, "name": "b", "offset": 4, "size": 2, "flags": 1024, "type_name": null },
               { "id": 1, "name": "a", "offset": 0, "size": 4, "flags": 1024, "type_name": null }"#,
        );
        let db = InMemoryDatabase::from_json(&json).unwrap();
        let sid = db.find_struct_by_name("S").unwrap();

        let names: Vec<String> = db.members(sid).unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(db.struct_size(sid).unwrap(), 6);
    }

    #[test]
    fn test_load_rejects_impossible_ranges() {
        let overflow = stored_json(&format!(
            r#"{{ "id": 1, "name": "a", "offset": {}, "size": 4, "flags": 1024, "type_name": null }}"#,
            u64::MAX
        ));
        assert!(matches!(InMemoryDatabase::from_json(&overflow), Err(HostError::Corrupt(_))));

        let overlap = stored_json(
            r#"{ "id": 1, "name": "a", "offset": 0, "size": 8, "flags": 1024, "type_name": null },
               { "id": 2, "name": "b", "offset": 4, "size": 2, "flags": 1024, "type_name": null }"#,
        );
        assert!(matches!(InMemoryDatabase::from_json(&overlap), Err(HostError::Corrupt(_))));
    }
}
