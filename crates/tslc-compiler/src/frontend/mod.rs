//! Front-end contract
//!
//! The lowering engine never parses or type-checks. It consumes a syntax tree
//! plus a [`FrontEnd`] that answers type and symbol queries about its nodes.
//! [`binder::TypedProgram`] is a small in-memory implementation that resolves
//! declared annotations.

pub mod ast;
pub mod binder;
pub mod builder;

use ast::NodeId;
use std::fmt;

/// Source-level type as reported by the front end
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceType {
    Void,
    Number,
    Boolean,
    String,
    /// Statically unknown
    Any,
    /// Nominal reference to a declared class
    Class(String),
}

impl SourceType {
    pub fn class_name(&self) -> Option<&str> {
        match self {
            SourceType::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, SourceType::Any)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Void => write!(f, "void"),
            SourceType::Number => write!(f, "number"),
            SourceType::Boolean => write!(f, "boolean"),
            SourceType::String => write!(f, "string"),
            SourceType::Any => write!(f, "any"),
            SourceType::Class(name) => write!(f, "{}", name),
        }
    }
}

/// What an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Method,
    Variable,
    Property,
    /// Not declared in this unit; treated as an external namespace
    Unclassified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<SourceType>,
    pub ret: SourceType,
}

impl Signature {
    pub fn new(params: Vec<SourceType>, ret: SourceType) -> Self {
        Self { params, ret }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    Property(SourceType),
    Method(Signature),
    Constructor(Signature),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMemberInfo {
    pub name: String,
    pub kind: MemberKind,
}

/// Declared shape of a class, members in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    pub name: String,
    pub members: Vec<ClassMemberInfo>,
}

impl ClassLayout {
    /// Non-method, non-constructor members in declaration order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &SourceType)> {
        self.members.iter().filter_map(|m| match &m.kind {
            MemberKind::Property(ty) => Some((m.name.as_str(), ty)),
            _ => None,
        })
    }

    pub fn method(&self, name: &str) -> Option<&Signature> {
        self.members.iter().find_map(|m| match &m.kind {
            MemberKind::Method(sig) if m.name == name => Some(sig),
            _ => None,
        })
    }

    pub fn property(&self, name: &str) -> Option<&SourceType> {
        self.properties()
            .find(|(field, _)| *field == name)
            .map(|(_, ty)| ty)
    }

    pub fn constructor(&self) -> Option<&Signature> {
        self.members.iter().find_map(|m| match &m.kind {
            MemberKind::Constructor(sig) => Some(sig),
            _ => None,
        })
    }
}

/// Type and symbol queries the lowering engine relies on
pub trait FrontEnd {
    /// Static type of an expression or declaration; `Any` when unknown
    fn type_of(&self, node: NodeId) -> SourceType;

    /// Type the surrounding context expects for an expression
    fn contextual_type(&self, node: NodeId) -> Option<SourceType>;

    fn classify(&self, node: NodeId) -> SymbolKind;

    fn class_layout(&self, name: &str) -> Option<&ClassLayout>;

    fn function_signature(&self, name: &str) -> Option<&Signature>;
}
