//! IR types and the source-to-IR type mapping

use crate::error::{CompileError, CompileResult};
use crate::frontend::SourceType;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    Double,
    I1,
    I32,
    /// Raw byte pointer returned by the allocator, `i8*`
    BytePtr,
    /// Named struct value type, `%Name`
    Struct(String),
    /// Pointer to a named struct, `%Name*`
    StructPtr(String),
}

impl IrType {
    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Double => write!(f, "double"),
            IrType::I1 => write!(f, "i1"),
            IrType::I32 => write!(f, "i32"),
            IrType::BytePtr => write!(f, "i8*"),
            IrType::Struct(name) => write!(f, "%{}", name),
            IrType::StructPtr(name) => write!(f, "%{}*", name),
        }
    }
}

/// Map a source type to its IR type.
///
/// Class types map to a pointer to their struct when `as_pointer` is set
/// (values, parameters, fields) and to the struct itself otherwise. A missing
/// type maps to `void`.
pub fn map_type(ty: Option<&SourceType>, as_pointer: bool) -> CompileResult<IrType> {
    match ty {
        None | Some(SourceType::Void) => Ok(IrType::Void),
        Some(SourceType::Number) => Ok(IrType::Double),
        Some(SourceType::Boolean) => Ok(IrType::I1),
        Some(SourceType::Class(name)) if as_pointer => Ok(IrType::StructPtr(name.clone())),
        Some(SourceType::Class(name)) => Ok(IrType::Struct(name.clone())),
        Some(other) => Err(CompileError::UnsupportedType {
            ty: other.to_string(),
        }),
    }
}
