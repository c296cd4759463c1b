//! Compilation errors

use crate::ir::BranchSlot;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Broad classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input uses something outside the lowerable subset.
    UnsupportedConstruct,
    /// The compiler reached a state its own rules forbid.
    InvariantViolation,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unsupported construct: {construct}")]
    Unsupported { construct: String },

    #[error("Unsupported type: {ty}")]
    UnsupportedType { ty: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Undefined type: {name}")]
    UndefinedType { name: String },

    #[error("Expected {expected} context, found {found}")]
    ContextMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("No storage bound for symbol {name}")]
    UnresolvedSymbol { name: String },

    #[error("Unknown class: {name}")]
    UnknownClass { name: String },

    #[error("Class {class} has no field {field}")]
    UnknownField { class: String, field: String },

    #[error("Instruction {position} is not a branch")]
    NotABranch { position: usize },

    #[error("{slot} target of branch {position} is already resolved")]
    DoublePatch { position: usize, slot: BranchSlot },

    #[error("Branch {position} in function {function} has an unresolved target")]
    UnresolvedBranch { function: String, position: usize },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompileError {
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported {
            construct: construct.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported { .. }
            | Self::UnsupportedType { .. }
            | Self::UndefinedVariable { .. }
            | Self::UndefinedType { .. } => ErrorKind::UnsupportedConstruct,
            Self::ContextMismatch { .. }
            | Self::UnresolvedSymbol { .. }
            | Self::UnknownClass { .. }
            | Self::UnknownField { .. }
            | Self::NotABranch { .. }
            | Self::DoublePatch { .. }
            | Self::UnresolvedBranch { .. }
            | Self::InternalError { .. } => ErrorKind::InvariantViolation,
        }
    }
}
