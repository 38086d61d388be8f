// Tue Jan 13 2026 - Alex

use crate::host::{HostError, ResolvedType, TypeKind};
use once_cell::sync::Lazy;
use regex::Regex;

static DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<base>[A-Za-z_][A-Za-z0-9_]*(?:\s+[A-Za-z_][A-Za-z0-9_]*)*)\s*(?P<ptr>(?:\*\s*)*)(?P<dims>(?:\[\s*[0-9]+\s*\]\s*)*)$",
    )
    .expect("declaration regex")
});

static DIM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s*([0-9]+)\s*\]").expect("array dimension regex"));

const AGGREGATE_KEYWORDS: [&str; 3] = ["struct", "union", "class"];

/// Resolves C type declarations (`uint32_t`, `char[16]`, `struct Foo *`) into
/// a size, a canonical display name and a kind.
#[derive(Debug, Clone, Copy)]
pub struct DeclParser {
    pointer_size: u64,
}

impl DeclParser {
    pub fn new(pointer_size: u64) -> Self {
        Self { pointer_size }
    }

    /// `lookup_struct` returns the size of a struct already present in the
    /// database, used for `struct X` and bare typedef-style names.
    pub fn parse<F>(&self, decl: &str, lookup_struct: F) -> Result<ResolvedType, HostError>
    where
        F: Fn(&str) -> Option<u64>,
    {
        let text = decl.trim().trim_end_matches(';').trim();
        if text.is_empty() {
            return Err(HostError::parse(decl, "empty declaration"));
        }

        let caps = DECL_RE
            .captures(text)
            .ok_or_else(|| HostError::parse(decl, "malformed declaration"))?;

        let words: Vec<&str> = caps["base"]
            .split_whitespace()
            .filter(|w| *w != "const" && *w != "volatile")
            .collect();
        if words.is_empty() {
            return Err(HostError::parse(decl, "missing base type"));
        }

        let pointer_depth = caps["ptr"].chars().filter(|c| *c == '*').count();
        let mut resolved = self.resolve_base(decl, &words, pointer_depth > 0, &lookup_struct)?;

        if pointer_depth > 0 {
            resolved = ResolvedType {
                size: self.pointer_size,
                name: format!("{} {}", resolved.name, "*".repeat(pointer_depth)),
                kind: TypeKind::Pointer,
            };
        }

        let dims = caps["dims"].to_string();
        let counts: Vec<u64> = DIM_RE
            .captures_iter(&dims)
            .map(|c| c[1].parse::<u64>().map_err(|_| HostError::parse(decl, "array dimension out of range")))
            .collect::<Result<_, _>>()?;

        if !counts.is_empty() {
            resolved = self.apply_dimensions(decl, resolved, &counts)?;
        }

        if resolved.size == 0 {
            return Err(HostError::parse(decl, "type has no size"));
        }

        Ok(resolved)
    }

    fn resolve_base<F>(
        &self,
        decl: &str,
        words: &[&str],
        behind_pointer: bool,
        lookup_struct: &F,
    ) -> Result<ResolvedType, HostError>
    where
        F: Fn(&str) -> Option<u64>,
    {
        let first = words[0];

        if AGGREGATE_KEYWORDS.contains(&first) {
            if words.len() != 2 {
                return Err(HostError::parse(decl, format!("expected '{} <name>'", first)));
            }
            let name = format!("{} {}", first, words[1]);
            let size = match lookup_struct(words[1]) {
                Some(size) => size,
                None if behind_pointer => 0,
                None => return Err(HostError::parse(decl, format!("unknown {} '{}'", first, words[1]))),
            };
            return Ok(ResolvedType { size, name, kind: TypeKind::Aggregate });
        }

        if first == "enum" {
            if words.len() != 2 {
                return Err(HostError::parse(decl, "expected 'enum <name>'"));
            }
            return Ok(ResolvedType {
                size: 4,
                name: words.join(" "),
                kind: TypeKind::Enum,
            });
        }

        let name = canonical_integer(words).unwrap_or_else(|| words.join(" "));
        if let Some((size, kind)) = self.builtin(&name) {
            if size == 0 && !behind_pointer {
                return Err(HostError::parse(decl, format!("'{}' has no size", name)));
            }
            return Ok(ResolvedType { size, name, kind });
        }

        if words.len() == 1 {
            if let Some(size) = lookup_struct(first) {
                return Ok(ResolvedType {
                    size,
                    name,
                    kind: TypeKind::Aggregate,
                });
            }
        }

        Err(HostError::parse(decl, format!("unknown type '{}'", name)))
    }

    fn apply_dimensions(&self, decl: &str, base: ResolvedType, counts: &[u64]) -> Result<ResolvedType, HostError> {
        let mut size = base.size;
        let mut kind = base.kind;

        for &count in counts.iter().rev() {
            if count == 0 {
                return Err(HostError::parse(decl, "zero-length array"));
            }
            let element_size = size;
            size = size
                .checked_mul(count)
                .ok_or_else(|| HostError::parse(decl, "array size overflows"))?;
            kind = TypeKind::Array {
                element: Box::new(kind),
                element_size,
                count,
            };
        }

        let suffix: String = counts.iter().map(|c| format!("[{}]", c)).collect();
        Ok(ResolvedType {
            size,
            name: format!("{}{}", base.name, suffix),
            kind,
        })
    }

    fn builtin(&self, name: &str) -> Option<(u64, TypeKind)> {
        let ptr = self.pointer_size;
        let entry = match name {
            "void" => (0, TypeKind::Integer),
            "bool" | "_Bool" | "char" | "signed char" | "unsigned char" | "int8_t" | "uint8_t" | "__int8"
            | "unsigned __int8" | "_BYTE" | "BYTE" | "_BOOL1" => (1, TypeKind::Integer),
            "short" | "unsigned short" | "int16_t" | "uint16_t" | "__int16" | "unsigned __int16" | "wchar_t"
            | "_WORD" | "WORD" | "_BOOL2" => (2, TypeKind::Integer),
            "int" | "unsigned int" | "long" | "unsigned long" | "int32_t" | "uint32_t" | "__int32"
            | "unsigned __int32" | "_DWORD" | "DWORD" | "_BOOL4" => (4, TypeKind::Integer),
            "long long" | "unsigned long long" | "int64_t" | "uint64_t" | "__int64" | "unsigned __int64"
            | "_QWORD" | "QWORD" | "_BOOL8" => (8, TypeKind::Integer),
            "__int128" | "unsigned __int128" | "_OWORD" => (16, TypeKind::Integer),
            "size_t" | "ssize_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t" => (ptr, TypeKind::Integer),
            "float" => (4, TypeKind::Float),
            "double" => (8, TypeKind::Float),
            "long double" | "_TBYTE" => (10, TypeKind::Float),
            _ => return None,
        };
        Some(entry)
    }
}

/// Puts a run of integer specifiers (`long unsigned int`, `signed short`,
/// `signed __int8`) into the one spelling the builtin table knows. `None` when
/// the words are not purely integer specifiers or do not combine.
fn canonical_integer(words: &[&str]) -> Option<String> {
    let (mut signed, mut unsigned, mut short, mut long, mut int, mut chars) = (0, 0, 0, 0, 0, 0);
    let mut sized: Option<&str> = None;

    for word in words {
        match *word {
            "signed" => signed += 1,
            "unsigned" => unsigned += 1,
            "short" => short += 1,
            "long" => long += 1,
            "int" => int += 1,
            "char" => chars += 1,
            "__int8" | "__int16" | "__int32" | "__int64" | "__int128" if sized.is_none() => sized = Some(*word),
            _ => return None,
        }
    }

    if signed + unsigned > 1 || short > 1 || long > 2 || int > 1 || chars > 1 {
        return None;
    }
    let prefix = if unsigned == 1 { "unsigned " } else { "" };

    let base = match (sized, chars, short, long) {
        (Some(sized), 0, 0, 0) if int == 0 => sized,
        (None, 1, 0, 0) if int == 0 => {
            // plain, signed and unsigned char are three distinct types
            return Some(match (signed, unsigned) {
                (1, _) => "signed char".to_string(),
                (_, 1) => "unsigned char".to_string(),
                _ => "char".to_string(),
            });
        }
        (None, 0, 1, 0) => "short",
        (None, 0, 0, 1) => "long",
        (None, 0, 0, 2) => "long long",
        (None, 0, 0, 0) if signed + unsigned + int > 0 => "int",
        _ => return None,
    };
    Some(format!("{}{}", prefix, base))
}

impl Default for DeclParser {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_structs(_: &str) -> Option<u64> {
        None
    }

    #[test]
    fn test_builtin_types() {
        let parser = DeclParser::default();
        let ty = parser.parse("uint32_t", no_structs).unwrap();
        assert_eq!(ty.size, 4);
        assert_eq!(ty.name, "uint32_t");
        assert_eq!(ty.kind, TypeKind::Integer);

        let ty = parser.parse("unsigned   long long;", no_structs).unwrap();
        assert_eq!(ty.size, 8);
        assert_eq!(ty.name, "unsigned long long");

        assert_eq!(parser.parse("double", no_structs).unwrap().kind, TypeKind::Float);
        assert_eq!(parser.parse("const char", no_structs).unwrap().name, "char");
    }

    #[test]
    fn test_integer_specifiers_in_any_order() {
        let parser = DeclParser::default();
        let cases = [
            ("signed long", "long", 4),
            ("signed long int", "long", 4),
            ("long unsigned int", "unsigned long", 4),
            ("signed long long", "long long", 8),
            ("short unsigned", "unsigned short", 2),
            ("short int", "short", 2),
            ("long long unsigned int", "unsigned long long", 8),
            ("int long long", "long long", 8),
            ("signed __int8", "__int8", 1),
            ("unsigned", "unsigned int", 4),
            ("signed", "int", 4),
            ("char signed", "signed char", 1),
        ];
        for (decl, name, size) in cases {
            let ty = parser.parse(decl, no_structs).unwrap();
            assert_eq!(ty.name, name, "{}", decl);
            assert_eq!(ty.size, size, "{}", decl);
        }
    }

    #[test]
    fn test_conflicting_integer_specifiers() {
        let parser = DeclParser::default();
        for decl in ["short long", "signed unsigned int", "long long long", "int int", "short char", "long __int32"] {
            assert!(parser.parse(decl, no_structs).is_err(), "{}", decl);
        }
        assert_eq!(parser.parse("long double", no_structs).unwrap().size, 10);
    }

    #[test]
    fn test_pointers_follow_pointer_size() {
        let ty = DeclParser::new(4).parse("void *", no_structs).unwrap();
        assert_eq!(ty.size, 4);
        assert_eq!(ty.name, "void *");
        assert!(ty.kind.is_pointer());

        let ty = DeclParser::default().parse("char**", no_structs).unwrap();
        assert_eq!(ty.size, 8);
        assert_eq!(ty.name, "char **");
    }

    #[test]
    fn test_arrays() {
        let parser = DeclParser::default();
        let ty = parser.parse("char[16]", no_structs).unwrap();
        assert_eq!(ty.size, 16);
        assert_eq!(ty.name, "char[16]");

        let ty = parser.parse("uint16_t [2][3]", no_structs).unwrap();
        assert_eq!(ty.size, 12);
        match ty.kind {
            TypeKind::Array { element, element_size, count } => {
                assert_eq!(count, 2);
                assert_eq!(element_size, 6);
                assert!(element.is_array());
            }
            other => panic!("expected array, got {:?}", other),
        }

        assert!(parser.parse("int[0]", no_structs).is_err());
    }

    #[test]
    fn test_struct_lookup() {
        let parser = DeclParser::default();
        let lookup = |name: &str| if name == "Vec3" { Some(12) } else { None };

        let ty = parser.parse("struct Vec3", lookup).unwrap();
        assert_eq!(ty.size, 12);
        assert_eq!(ty.name, "struct Vec3");
        assert_eq!(ty.kind, TypeKind::Aggregate);

        let ty = parser.parse("Vec3[2]", lookup).unwrap();
        assert_eq!(ty.size, 24);

        assert!(parser.parse("struct Missing", lookup).is_err());
        assert_eq!(parser.parse("struct Missing *", lookup).unwrap().size, 8);
    }

    #[test]
    fn test_rejects_bad_declarations() {
        let parser = DeclParser::default();
        assert!(parser.parse("", no_structs).is_err());
        assert!(parser.parse("void", no_structs).is_err());
        assert!(parser.parse("not_a_type", no_structs).is_err());
        assert!(parser.parse("int (*)(void)", no_structs).is_err());
        assert!(parser.parse("struct", no_structs).is_err());
    }
}
