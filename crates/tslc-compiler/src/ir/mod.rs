//! Intermediate Representation
//!
//! The textual LLVM-like IR produced by lowering: registers and labels, IR
//! types, the instruction model, the buffer that collects and renders a
//! module, and a reference evaluator for the result.

pub mod buffer;
pub mod instr;
pub mod interp;
pub mod types;
pub mod value;

pub use buffer::{runtime_declarations, BackpatchEntry, BranchSlot, InstructionBuffer};
pub use instr::{ArithOp, CompareOp, Declaration, Instruction, StructDef};
pub use types::{map_type, IrType};
pub use value::{Label, Operand, Register};
