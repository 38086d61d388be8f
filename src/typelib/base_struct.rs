// Tue Jan 13 2026 - Alex

use crate::host::{ConfirmationProvider, Decision, StructId, TypeDatabase};
use crate::typelib::{FieldSpec, Mismatch, StructMember, TypelibError, ValidationReport};
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructState {
    Uninitialized,
    SchemaParsed,
    /// Schema parsed; an existing host struct failed validation and the
    /// caller has to decide whether it may be replaced.
    AwaitingConfirmation { existing: StructId, report: ValidationReport },
    Materialized(StructId),
}

/// How a struct ended up in the host database, or why it has not yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// An existing definition matched the schema and was kept untouched.
    Accepted(StructId),
    /// No definition existed; a new one was created.
    Created(StructId),
    /// A mismatching definition was deleted and created again.
    Recreated { deleted: StructId, created: StructId },
    NeedsConfirmation(ValidationReport),
}

impl Reconciliation {
    pub fn struct_id(&self) -> Option<StructId> {
        match self {
            Reconciliation::Accepted(id) | Reconciliation::Created(id) => Some(*id),
            Reconciliation::Recreated { created, .. } => Some(*created),
            Reconciliation::NeedsConfirmation(_) => None,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Reconciliation::Created(_) | Reconciliation::Recreated { .. })
    }
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reconciliation::Accepted(id) => write!(f, "accepted existing ({})", id),
            Reconciliation::Created(id) => write!(f, "created ({})", id),
            Reconciliation::Recreated { deleted, created } => write!(f, "recreated ({} -> {})", deleted, created),
            Reconciliation::NeedsConfirmation(report) => write!(f, "needs confirmation ({} mismatches)", report.len()),
        }
    }
}

/// A struct declared by schema and reconciled against the host database.
#[derive(Debug, Clone)]
pub struct BaseStruct {
    name: String,
    size: u64,
    members: IndexMap<String, StructMember>,
    state: StructState,
}

impl BaseStruct {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            members: IndexMap::new(),
            state: StructState::Uninitialized,
        }
    }

    /// Parses the schema and reconciles in one go, asking `confirm` before
    /// replacing a mismatching definition.
    pub fn build(
        name: &str,
        schema: &[FieldSpec],
        db: &mut dyn TypeDatabase,
        confirm: &mut dyn ConfirmationProvider,
    ) -> Result<Self, TypelibError> {
        let mut it = Self::new(name);
        it.parse_schema(schema, &*db)?;
        it.materialize(db, confirm)?;
        Ok(it)
    }

    pub fn parse_schema(&mut self, schema: &[FieldSpec], db: &dyn TypeDatabase) -> Result<(), TypelibError> {
        if self.state != StructState::Uninitialized {
            return Err(self.reentrant("parse_schema"));
        }

        for (index, spec) in schema.iter().enumerate() {
            let member = StructMember::from_spec(&self.name, index, self.size, spec, db)?;
            self.register_member(member)?;
        }

        log::debug!("Parsed schema of '{}': {} members, {} bytes", self.name, self.members.len(), self.size);
        self.state = StructState::SchemaParsed;
        Ok(())
    }

    fn register_member(&mut self, member: StructMember) -> Result<(), TypelibError> {
        if self.members.contains_key(member.name()) {
            return Err(TypelibError::DuplicateMember {
                structure: self.name.clone(),
                member: member.name().to_string(),
            });
        }

        let (start, end) = (member.offset(), member.offset_end());
        if let Some(other) = self.members.values().find(|m| m.offset() < end && start < m.offset_end()) {
            return Err(TypelibError::OverlappingMember {
                structure: self.name.clone(),
                member: member.name().to_string(),
                other: other.name().to_string(),
            });
        }

        self.size = self.size.max(end);
        self.members.insert(member.name().to_string(), member);
        Ok(())
    }

    /// Runs the validate-or-create protocol. Returns
    /// `Reconciliation::NeedsConfirmation` instead of touching a mismatching
    /// definition; answer it with [`BaseStruct::resolve`].
    pub fn reconcile(&mut self, db: &mut dyn TypeDatabase) -> Result<Reconciliation, TypelibError> {
        match self.state {
            StructState::Uninitialized => return Err(TypelibError::NotParsed(self.name.clone())),
            StructState::SchemaParsed => {}
            StructState::AwaitingConfirmation { .. } | StructState::Materialized(_) => {
                return Err(self.reentrant("reconcile"))
            }
        }

        let existing = match db.find_struct_by_name(&self.name) {
            Some(id) => id,
            None => {
                let created = self.create(db)?;
                return Ok(Reconciliation::Created(created));
            }
        };

        let report = self.validate(&*db, existing)?;
        if report.is_match() {
            log::info!("Found struct '{}' with ID {}", self.name, existing);
            self.state = StructState::Materialized(existing);
            return Ok(Reconciliation::Accepted(existing));
        }

        self.state = StructState::AwaitingConfirmation {
            existing,
            report: report.clone(),
        };
        Ok(Reconciliation::NeedsConfirmation(report))
    }

    /// Answers a pending overwrite question. Declining leaves the host
    /// untouched and the struct back in `SchemaParsed`.
    pub fn resolve(&mut self, db: &mut dyn TypeDatabase, decision: Decision) -> Result<Reconciliation, TypelibError> {
        let existing = match &self.state {
            StructState::AwaitingConfirmation { existing, .. } => *existing,
            _ => return Err(TypelibError::NoPendingConfirmation(self.name.clone())),
        };

        match decision {
            Decision::No => {
                self.state = StructState::SchemaParsed;
                Err(TypelibError::Declined(self.name.clone()))
            }
            Decision::Cancel => {
                self.state = StructState::SchemaParsed;
                Err(TypelibError::Cancelled(self.name.clone()))
            }
            Decision::Yes => {
                if let Err(e) = db.delete_struct(existing) {
                    self.state = StructState::SchemaParsed;
                    return Err(e.into());
                }
                log::info!("Deleted struct '{}' (ID={})", self.name, existing);
                self.state = StructState::SchemaParsed;

                let created = self.create(db)?;
                Ok(Reconciliation::Recreated {
                    deleted: existing,
                    created,
                })
            }
        }
    }

    /// `reconcile` followed, if needed, by a blocking question to `confirm`.
    pub fn materialize(
        &mut self,
        db: &mut dyn TypeDatabase,
        confirm: &mut dyn ConfirmationProvider,
    ) -> Result<Reconciliation, TypelibError> {
        match self.reconcile(db)? {
            Reconciliation::NeedsConfirmation(report) => {
                let decision = confirm.confirm(&report.overwrite_prompt());
                log::debug!("Overwrite '{}'? -> {}", self.name, decision);
                self.resolve(db, decision)
            }
            done => Ok(done),
        }
    }

    /// Compares an existing host struct against the parsed members. Never
    /// mutates the host; matching members get their host id attached.
    pub fn validate(&mut self, db: &dyn TypeDatabase, sid: StructId) -> Result<ValidationReport, TypelibError> {
        let mut report = ValidationReport::new(&self.name);

        let host_size = db.struct_size(sid)?;
        if host_size != self.size {
            report.push(Mismatch::StructSize {
                expected: self.size,
                found: host_size,
            });
        }

        let host_members = db.members(sid)?;
        for host in &host_members {
            match self.members.get_mut(&host.name) {
                Some(member) => {
                    let mismatches = member.validate(host);
                    if mismatches.is_empty() {
                        member.bind(host.id);
                    } else {
                        log::warn!("validate: field '{}' failed validation", member.hierarchy());
                    }
                    report.extend(mismatches);
                }
                None => report.push(Mismatch::UnexpectedMember {
                    name: host.name.clone(),
                    offset: host.start_offset,
                }),
            }
        }

        if host_members.len() != self.members.len() {
            report.push(Mismatch::MemberCount {
                expected: self.members.len(),
                found: host_members.len(),
            });
        }

        for name in self.members.keys() {
            if !host_members.iter().any(|m| &m.name == name) {
                report.push(Mismatch::MissingMember { name: name.clone() });
            }
        }

        if !report.is_match() {
            for member in self.members.values_mut() {
                member.unbind();
            }
        }
        Ok(report)
    }

    fn create(&mut self, db: &mut dyn TypeDatabase) -> Result<StructId, TypelibError> {
        let sid = db.create_struct(&self.name)?;

        let mut failure = None;
        for member in self.members.values_mut() {
            if let Err(e) = member.materialize(db, sid) {
                failure = Some((member.hierarchy(), e));
                break;
            }
        }

        if let Some((hierarchy, e)) = failure {
            log::error!("Failed to materialize '{}', rolling back struct '{}'", hierarchy, self.name);
            match db.delete_struct(sid) {
                Ok(()) => log::info!("Deleted partial struct '{}' (ID={})", self.name, sid),
                Err(rollback) => log::error!("Could not delete partial struct '{}': {}", self.name, rollback),
            }
            for member in self.members.values_mut() {
                member.unbind();
            }
            return Err(e);
        }

        log::info!("Created struct '{}' of size {}", self.name, self.size);
        self.state = StructState::Materialized(sid);
        Ok(sid)
    }

    fn reentrant(&self, operation: &'static str) -> TypelibError {
        TypelibError::Reentrant {
            structure: self.name.clone(),
            operation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hierarchy(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> impl Iterator<Item = &StructMember> {
        self.members.values()
    }

    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.get(name)
    }

    pub fn state(&self) -> &StructState {
        &self.state
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.state, StructState::Materialized(_))
    }

    pub fn struct_id(&self) -> Option<StructId> {
        match self.state {
            StructState::Materialized(id) => Some(id),
            _ => None,
        }
    }

    /// C rendering of the declared layout, members in offset order.
    pub fn to_c_declaration(&self) -> String {
        let mut members: Vec<&StructMember> = self.members.values().collect();
        members.sort_by_key(|m| m.offset());

        let mut out = format!("struct {} // sizeof=0x{:X}\n{{\n", self.name, self.size);
        for member in members {
            let ty = member.ctype().name();
            let kind = member.ctype().kind();
            let line = match ty.find('[') {
                Some(idx) if kind.is_array() => format!("{} {}{};", &ty[..idx], member.name(), &ty[idx..]),
                _ if kind.is_pointer() => format!("{}{};", ty, member.name()),
                _ => format!("{} {};", ty, member.name()),
            };
            out.push_str(&format!("  /* 0x{:02X} */ {}\n", member.offset(), line));
        }
        out.push_str("};\n");
        out
    }
}

impl fmt::Display for BaseStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DataFlags, HostCall, HostError, HostMember, InMemoryDatabase, MemberId, ResolvedType, ScriptedAnswers};

    fn two_fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new("a", "uint32_t"), FieldSpec::new("b", "uint16_t")]
    }

    fn parsed(name: &str, schema: &[FieldSpec], db: &InMemoryDatabase) -> BaseStruct {
        let mut it = BaseStruct::new(name);
        it.parse_schema(schema, db).unwrap();
        it
    }

    fn seed(db: &mut InMemoryDatabase, name: &str, members: &[(&str, u64, u64)]) -> StructId {
        let sid = db.create_struct(name).unwrap();
        for (member, offset, size) in members {
            db.create_member(sid, member, *offset, *size, DataFlags::FF_DATA).unwrap();
        }
        db.clear_journal();
        sid
    }

    #[test]
    fn test_end_to_end_on_empty_database() {
        let mut db = InMemoryDatabase::new();
        let mut answers = ScriptedAnswers::default();

        let it = BaseStruct::build("Pair", &two_fields(), &mut db, &mut answers).unwrap();
        assert_eq!(it.size(), 6);
        assert_eq!(it.member("a").unwrap().offset(), 0);
        assert_eq!(it.member("a").unwrap().size(), 4);
        assert_eq!(it.member("b").unwrap().offset(), 4);
        assert_eq!(it.member("b").unwrap().size(), 2);
        assert!(it.is_materialized());
        assert!(answers.prompts().is_empty());

        let creates: Vec<&str> = db
            .journal()
            .iter()
            .filter_map(|c| match c {
                HostCall::CreateMember { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(creates, vec!["a", "b"]);
        assert_eq!(db.struct_size(it.struct_id().unwrap()).unwrap(), 6);
    }

    #[test]
    fn test_size_is_max_member_end() {
        let db = InMemoryDatabase::new();
        let schema = vec![
            FieldSpec::new("tail", "uint64_t").with_offset(0x20),
            FieldSpec::new("head", "uint8_t").with_offset(0),
        ];
        let it = parsed("S", &schema, &db);
        assert_eq!(it.size(), 0x28);
        let ends: Vec<u64> = it.members().map(|m| m.offset_end()).collect();
        assert_eq!(it.size(), *ends.iter().max().unwrap());
    }

    #[test]
    fn test_sequential_packing_after_explicit_offset() {
        let db = InMemoryDatabase::new();
        let schema = vec![
            FieldSpec::new("a", "uint8_t"),
            FieldSpec::at(0x10, "uint32_t"),
            FieldSpec::new("c", "uint16_t"),
        ];
        let it = parsed("S", &schema, &db);
        assert_eq!(it.member("a").unwrap().offset(), 0);
        assert_eq!(it.member("field_10").unwrap().offset(), 0x10);
        assert_eq!(it.member("c").unwrap().offset(), 0x14);
        assert_eq!(it.size(), 0x16);
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let db = InMemoryDatabase::new();
        let schema = vec![FieldSpec::new("a", "int"), FieldSpec::new("a", "int")];
        let mut it = BaseStruct::new("S");
        assert!(matches!(it.parse_schema(&schema, &db), Err(TypelibError::DuplicateMember { .. })));
    }

    #[test]
    fn test_reentry_fails() {
        let mut db = InMemoryDatabase::new();
        let mut it = BaseStruct::new("S");
        assert!(matches!(it.reconcile(&mut db), Err(TypelibError::NotParsed(_))));

        it.parse_schema(&two_fields(), &db).unwrap();
        let err = it.parse_schema(&two_fields(), &db).unwrap_err();
        assert!(err.is_configuration());

        it.reconcile(&mut db).unwrap();
        assert!(matches!(it.reconcile(&mut db), Err(TypelibError::Reentrant { .. })));
    }

    #[test]
    fn test_exact_match_is_accepted_without_mutation() {
        let mut db = InMemoryDatabase::new();
        let sid = seed(&mut db, "Pair", &[("a", 0, 4), ("b", 4, 2)]);
        let mut answers = ScriptedAnswers::new([Decision::Yes]);

        let mut it = parsed("Pair", &two_fields(), &db);
        let outcome = it.materialize(&mut db, &mut answers).unwrap();

        assert_eq!(outcome, Reconciliation::Accepted(sid));
        assert!(db.journal().is_empty());
        assert!(answers.prompts().is_empty());
        assert_eq!(it.struct_id(), Some(sid));
        assert!(it.member("a").unwrap().member_id().is_some());
    }

    #[test]
    fn test_extra_field_needs_confirmation() {
        let mut db = InMemoryDatabase::new();
        seed(&mut db, "Pair", &[("a", 0, 4), ("b", 4, 2), ("c", 6, 2)]);

        let mut it = parsed("Pair", &two_fields(), &db);
        match it.reconcile(&mut db).unwrap() {
            Reconciliation::NeedsConfirmation(report) => {
                assert!(report
                    .mismatches
                    .iter()
                    .any(|m| matches!(m, Mismatch::UnexpectedMember { name, .. } if name == "c")));
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
        assert!(matches!(it.state(), StructState::AwaitingConfirmation { .. }));
        assert!(db.journal().is_empty());
    }

    #[test]
    fn test_missing_field_needs_confirmation() {
        let mut db = InMemoryDatabase::new();
        seed(&mut db, "Pair", &[("a", 0, 4)]);
        let mut answers = ScriptedAnswers::new([Decision::No]);

        let mut it = parsed("Pair", &two_fields(), &db);
        let err = it.materialize(&mut db, &mut answers).unwrap_err();

        assert!(matches!(err, TypelibError::Declined(_)));
        assert_eq!(answers.prompts().len(), 1);
        assert!(answers.prompts()[0].contains("Pair"));
    }

    #[test]
    fn test_declined_overwrite_leaves_host_untouched() {
        let mut db = InMemoryDatabase::new();
        let sid = seed(&mut db, "Pair", &[("a", 0, 8)]);
        let mut answers = ScriptedAnswers::new([Decision::No]);

        let mut it = parsed("Pair", &two_fields(), &db);
        assert!(it.materialize(&mut db, &mut answers).unwrap_err().is_user_abort());

        assert!(db.journal().is_empty());
        assert_eq!(db.find_struct_by_name("Pair"), Some(sid));
        assert_eq!(db.members(sid).unwrap().len(), 1);
        assert_eq!(it.state(), &StructState::SchemaParsed);
    }

    #[test]
    fn test_cancel_behaves_like_decline() {
        let mut db = InMemoryDatabase::new();
        seed(&mut db, "Pair", &[("a", 0, 8)]);

        let mut it = parsed("Pair", &two_fields(), &db);
        it.reconcile(&mut db).unwrap();
        assert!(matches!(it.resolve(&mut db, Decision::Cancel), Err(TypelibError::Cancelled(_))));
        assert!(db.journal().is_empty());
        assert!(matches!(it.resolve(&mut db, Decision::Yes), Err(TypelibError::NoPendingConfirmation(_))));
    }

    #[test]
    fn test_accepted_overwrite_deletes_then_recreates_in_order() {
        let mut db = InMemoryDatabase::new();
        let old = seed(&mut db, "Pair", &[("b", 0, 2), ("a", 2, 4)]);
        let mut answers = ScriptedAnswers::new([Decision::Yes]);

        let mut it = parsed("Pair", &two_fields(), &db);
        let outcome = it.materialize(&mut db, &mut answers).unwrap();

        let new = match outcome {
            Reconciliation::Recreated { deleted, created } => {
                assert_eq!(deleted, old);
                created
            }
            other => panic!("expected recreate, got {:?}", other),
        };

        let journal = db.journal();
        assert_eq!(journal[0], HostCall::DeleteStruct(old));
        assert_eq!(journal[1], HostCall::CreateStruct("Pair".to_string()));
        let creates: Vec<&str> = journal
            .iter()
            .filter_map(|c| match c {
                HostCall::CreateMember { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(creates, vec!["a", "b"]);
        assert_eq!(it.struct_id(), Some(new));
        assert_eq!(db.struct_size(new).unwrap(), 6);
    }

    /// Delegates to an in-memory database but refuses one member name.
    struct RejectingDb {
        inner: InMemoryDatabase,
        reject: &'static str,
    }

    impl TypeDatabase for RejectingDb {
        fn find_struct_by_name(&self, name: &str) -> Option<StructId> {
            self.inner.find_struct_by_name(name)
        }

        fn create_struct(&mut self, name: &str) -> Result<StructId, HostError> {
            self.inner.create_struct(name)
        }

        fn delete_struct(&mut self, id: StructId) -> Result<(), HostError> {
            self.inner.delete_struct(id)
        }

        fn struct_size(&self, id: StructId) -> Result<u64, HostError> {
            self.inner.struct_size(id)
        }

        fn members(&self, id: StructId) -> Result<Vec<HostMember>, HostError> {
            self.inner.members(id)
        }

        fn create_member(
            &mut self,
            id: StructId,
            name: &str,
            offset: u64,
            size: u64,
            flags: DataFlags,
        ) -> Result<MemberId, HostError> {
            if name == self.reject {
                return Err(HostError::rejected(name, "refused"));
            }
            self.inner.create_member(id, name, offset, size, flags)
        }

        fn set_member_type(
            &mut self,
            id: StructId,
            member: MemberId,
            offset: u64,
            ty: &ResolvedType,
        ) -> Result<(), HostError> {
            self.inner.set_member_type(id, member, offset, ty)
        }

        fn parse_type_declaration(&self, decl: &str) -> Result<ResolvedType, HostError> {
            self.inner.parse_type_declaration(decl)
        }
    }

    #[test]
    fn test_member_failure_rolls_back_new_struct() {
        let mut db = RejectingDb {
            inner: InMemoryDatabase::new(),
            reject: "b",
        };
        let mut it = BaseStruct::new("Pair");
        it.parse_schema(&two_fields(), &db).unwrap();

        let err = it.reconcile(&mut db).unwrap_err();
        assert!(matches!(err, TypelibError::MemberMaterialization { .. }));
        assert_eq!(db.find_struct_by_name("Pair"), None);
        assert!(matches!(db.inner.journal().last(), Some(HostCall::DeleteStruct(_))));
        assert!(!it.is_materialized());
        assert!(it.member("a").unwrap().member_id().is_none());
    }

    #[test]
    fn test_overlapping_members_rejected_before_host_calls() {
        let mut db = InMemoryDatabase::new();
        let sid = seed(&mut db, "Pair", &[("a", 0, 8)]);
        let schema = vec![FieldSpec::new("a", "uint32_t"), FieldSpec::new("b", "uint16_t").with_offset(2)];

        let mut answers = ScriptedAnswers::new([Decision::Yes]);
        let err = BaseStruct::build("Pair", &schema, &mut db, &mut answers).unwrap_err();

        match &err {
            TypelibError::OverlappingMember { member, other, .. } => {
                assert_eq!(member, "b");
                assert_eq!(other, "a");
            }
            other => panic!("expected overlap error, got {:?}", other),
        }
        assert!(err.is_configuration());
        assert!(answers.prompts().is_empty());
        assert!(db.journal().is_empty());
        assert_eq!(db.find_struct_by_name("Pair"), Some(sid));
    }

    #[test]
    fn test_adjacent_members_do_not_overlap() {
        let db = InMemoryDatabase::new();
        let schema = vec![
            FieldSpec::new("b", "uint16_t").with_offset(4),
            FieldSpec::new("a", "uint32_t").with_offset(0),
        ];
        assert_eq!(parsed("Pair", &schema, &db).size(), 6);
    }

    #[test]
    fn test_c_declaration() {
        let db = InMemoryDatabase::new();
        let schema = vec![
            FieldSpec::new("name", "char[8]"),
            FieldSpec::new("next", "void *"),
            FieldSpec::new("id", "uint32_t"),
        ];
        let it = parsed("Entry", &schema, &db);
        let decl = it.to_c_declaration();
        assert!(decl.starts_with("struct Entry // sizeof=0x14"));
        assert!(decl.contains("/* 0x00 */ char name[8];"));
        assert!(decl.contains("/* 0x08 */ void *next;"));
        assert!(decl.contains("/* 0x10 */ uint32_t id;"));
    }
}
