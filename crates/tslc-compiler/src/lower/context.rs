//! Lowering contexts
//!
//! What lowering an expression, a condition or a statement hands back to its
//! caller.

use crate::frontend::SourceType;
use crate::ir::{BackpatchEntry, BranchSlot, Operand, Register};

/// Result of lowering an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExprContext {
    /// A computed value
    Value(Operand, SourceType),
    /// A register holding the address of a slot of the given type
    Address(Register, SourceType),
    /// A field name waiting for its object
    Property(String),
    /// A callable function
    Function { ir_name: String, imported: bool },
    /// A method; the receiver is filled in by the enclosing property access
    Method {
        receiver: Option<(Operand, String)>,
        ir_name: String,
    },
    /// An undeclared name standing for an external module
    ImportedNamespace(String),
}

impl ExprContext {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprContext::Value(..) => "value",
            ExprContext::Address(..) => "address",
            ExprContext::Property(_) => "property",
            ExprContext::Function { .. } => "function",
            ExprContext::Method { .. } => "method",
            ExprContext::ImportedNamespace(_) => "namespace",
        }
    }
}

/// Result of lowering a condition: the branch slots still to be aimed at the
/// true and false continuations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolContext {
    pub true_list: Vec<BackpatchEntry>,
    pub false_list: Vec<BackpatchEntry>,
}

impl BoolContext {
    /// Both slots of the conditional branch at `position`
    pub fn branch(position: usize) -> Self {
        Self {
            true_list: vec![BackpatchEntry::new(position, BranchSlot::True)],
            false_list: vec![BackpatchEntry::new(position, BranchSlot::False)],
        }
    }

    pub fn negate(self) -> Self {
        Self {
            true_list: self.false_list,
            false_list: self.true_list,
        }
    }
}

/// Result of lowering a statement: jumps to whatever comes next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtContext {
    pub next_list: Vec<BackpatchEntry>,
}

impl StmtContext {
    pub fn new(next_list: Vec<BackpatchEntry>) -> Self {
        Self { next_list }
    }

    pub fn is_empty(&self) -> bool {
        self.next_list.is_empty()
    }

    pub fn merge(mut self, other: StmtContext) -> Self {
        self.next_list.extend(other.next_list);
        self
    }
}
