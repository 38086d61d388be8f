// Tue Jan 13 2026 - Alex

use crate::host::{ResolvedType, TypeKind};
use bitflags::bitflags;

bitflags! {
    /// Data flags a host member is created with. Values follow the
    /// disassembler's `bytes.hpp` layout: the top nibble is the data type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DataFlags: u32 {
        const FF_DATA = 0x0000_0400;
        const FF_WORD = 0x1000_0000;
        const FF_DWORD = 0x2000_0000;
        const FF_QWORD = 0x3000_0000;
        const FF_TBYTE = 0x4000_0000;
        const FF_STRLIT = 0x5000_0000;
        const FF_STRUCT = 0x6000_0000;
        const FF_OWORD = 0x7000_0000;
        const FF_FLOAT = 0x8000_0000;
        const FF_DOUBLE = 0x9000_0000;
        const FF_PACKREAL = 0xA000_0000;
        const FF_ALIGN = 0xB000_0000;
        const FF_CUSTOM = 0xD000_0000;
        const FF_YWORD = 0xE000_0000;
        const FF_ZWORD = 0xF000_0000;
    }
}

pub const DT_TYPE: u32 = 0xF000_0000;

impl DataFlags {
    pub fn data_type(&self) -> u32 {
        self.bits() & DT_TYPE
    }

    pub fn for_type(ty: &ResolvedType) -> Self {
        Self::FF_DATA | Self::from_bits_retain(Self::type_bits(&ty.kind, ty.size))
    }

    fn type_bits(kind: &TypeKind, size: u64) -> u32 {
        match kind {
            TypeKind::Aggregate => Self::FF_STRUCT.bits(),
            TypeKind::Float => match size {
                4 => Self::FF_FLOAT.bits(),
                8 => Self::FF_DOUBLE.bits(),
                10 | 12 | 16 => Self::FF_TBYTE.bits(),
                _ => 0,
            },
            TypeKind::Array { element, element_size, .. } => Self::type_bits(element, *element_size),
            TypeKind::Integer | TypeKind::Pointer | TypeKind::Enum => Self::unit_bits(size),
        }
    }

    fn unit_bits(size: u64) -> u32 {
        match size {
            2 => Self::FF_WORD.bits(),
            4 => Self::FF_DWORD.bits(),
            8 => Self::FF_QWORD.bits(),
            16 => Self::FF_OWORD.bits(),
            32 => Self::FF_YWORD.bits(),
            64 => Self::FF_ZWORD.bits(),
            _ => 0,
        }
    }
}
