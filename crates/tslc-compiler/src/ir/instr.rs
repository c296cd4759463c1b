//! IR Instructions
//!
//! One variant per instruction form the lowering engine emits, each rendering
//! to exactly one line of LLVM assembly. Branch targets are optional until
//! backpatched.

use super::types::IrType;
use super::value::{Label, Operand, Register};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArithOp::FAdd => "fadd",
            ArithOp::FSub => "fsub",
            ArithOp::FMul => "fmul",
            ArithOp::FDiv => "fdiv",
        };
        f.write_str(name)
    }
}

/// Ordered floating-point predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Olt,
    Ole,
    Ogt,
    Oge,
    Oeq,
    One,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompareOp::Olt => "olt",
            CompareOp::Ole => "ole",
            CompareOp::Ogt => "ogt",
            CompareOp::Oge => "oge",
            CompareOp::Oeq => "oeq",
            CompareOp::One => "one",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `define <ret> @<name>(<params>) {`
    FunctionBegin {
        name: String,
        ret: IrType,
        params: Vec<IrType>,
    },
    /// `}`
    FunctionEnd,
    Label(Label),
    /// Numeric literal materialized as `fadd double 0.0, <value>`
    Constant { dest: Register, value: f64 },
    Binary {
        dest: Register,
        op: ArithOp,
        lhs: Operand,
        rhs: Operand,
    },
    Neg { dest: Register, operand: Operand },
    Compare {
        dest: Register,
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    },
    CondBranch {
        cond: Register,
        if_true: Option<Label>,
        if_false: Option<Label>,
    },
    Branch { target: Option<Label> },
    Return { ty: IrType, value: Option<Operand> },
    /// Calls always consume a register, even when the result is void and unnamed
    Call {
        dest: Register,
        ret: IrType,
        callee: String,
        args: Vec<(IrType, Operand)>,
    },
    Alloca { dest: Register, ty: IrType },
    Load {
        dest: Register,
        ty: IrType,
        addr: Operand,
    },
    Store {
        ty: IrType,
        value: Operand,
        addr: Operand,
    },
    FieldAddress {
        dest: Register,
        class: String,
        base: Operand,
        index: u32,
    },
    /// `getelementptr %C, %C* null, i32 1`, the size of `%C` as a pointer
    SizeOf { dest: Register, class: String },
    PtrToInt {
        dest: Register,
        class: String,
        src: Register,
    },
    BitCast {
        dest: Register,
        src: Register,
        class: String,
    },
    Unreachable,
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return { .. }
                | Instruction::Branch { .. }
                | Instruction::CondBranch { .. }
                | Instruction::Unreachable
        )
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Instruction::Branch { .. } | Instruction::CondBranch { .. })
    }

    /// True for a branch with at least one unresolved target
    pub fn has_open_target(&self) -> bool {
        match self {
            Instruction::Branch { target } => target.is_none(),
            Instruction::CondBranch {
                if_true, if_false, ..
            } => if_true.is_none() || if_false.is_none(),
            _ => false,
        }
    }

    /// Register this instruction defines
    pub fn dest(&self) -> Option<Register> {
        match self {
            Instruction::Constant { dest, .. }
            | Instruction::Binary { dest, .. }
            | Instruction::Neg { dest, .. }
            | Instruction::Compare { dest, .. }
            | Instruction::Call { dest, .. }
            | Instruction::Alloca { dest, .. }
            | Instruction::Load { dest, .. }
            | Instruction::FieldAddress { dest, .. }
            | Instruction::SizeOf { dest, .. }
            | Instruction::PtrToInt { dest, .. }
            | Instruction::BitCast { dest, .. } => Some(*dest),
            _ => None,
        }
    }
}

/// Render a double the way LLVM accepts it in a constant position
pub fn format_double(value: f64) -> String {
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < EXACT_LIMIT {
        format!("{:.1}", value)
    } else {
        format!("0x{:016X}", value.to_bits())
    }
}

fn join_types(types: &[IrType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn target(label: &Option<Label>) -> String {
    match label {
        Some(label) => label.to_string(),
        None => "%<unresolved>".to_string(),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::FunctionBegin { name, ret, params } => {
                write!(f, "define {} @{}({}) {{", ret, name, join_types(params))
            }
            Instruction::FunctionEnd => write!(f, "}}"),
            Instruction::Label(label) => write!(f, "{}:", label.name()),
            Instruction::Constant { dest, value } => {
                write!(f, "{} = fadd double 0.0, {}", dest, format_double(*value))
            }
            Instruction::Binary { dest, op, lhs, rhs } => {
                write!(f, "{} = {} double {}, {}", dest, op, lhs, rhs)
            }
            Instruction::Neg { dest, operand } => write!(f, "{} = fneg double {}", dest, operand),
            Instruction::Compare { dest, op, lhs, rhs } => {
                write!(f, "{} = fcmp {} double {}, {}", dest, op, lhs, rhs)
            }
            Instruction::CondBranch {
                cond,
                if_true,
                if_false,
            } => write!(
                f,
                "br i1 {}, label {}, label {}",
                cond,
                target(if_true),
                target(if_false)
            ),
            Instruction::Branch { target: label } => write!(f, "br label {}", target(label)),
            Instruction::Return { ty, value } => match value {
                Some(value) => write!(f, "ret {} {}", ty, value),
                None => write!(f, "ret {}", ty),
            },
            Instruction::Call {
                dest,
                ret,
                callee,
                args,
            } => {
                if !ret.is_void() {
                    write!(f, "{} = ", dest)?;
                }
                let types: Vec<IrType> = args.iter().map(|(ty, _)| ty.clone()).collect();
                let values = args
                    .iter()
                    .map(|(ty, value)| format!("{} {}", ty, value))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "call {} ({}) @{}({})",
                    ret,
                    join_types(&types),
                    callee,
                    values
                )
            }
            Instruction::Alloca { dest, ty } => write!(f, "{} = alloca {}", dest, ty),
            Instruction::Load { dest, ty, addr } => {
                write!(f, "{} = load {}, {}* {}", dest, ty, ty, addr)
            }
            Instruction::Store { ty, value, addr } => {
                write!(f, "store {} {}, {}* {}", ty, value, ty, addr)
            }
            Instruction::FieldAddress {
                dest,
                class,
                base,
                index,
            } => write!(
                f,
                "{} = getelementptr %{}, %{}* {}, i32 0, i32 {}",
                dest, class, class, base, index
            ),
            Instruction::SizeOf { dest, class } => {
                write!(f, "{} = getelementptr %{}, %{}* null, i32 1", dest, class, class)
            }
            Instruction::PtrToInt { dest, class, src } => {
                write!(f, "{} = ptrtoint %{}* {} to i32", dest, class, src)
            }
            Instruction::BitCast { dest, src, class } => {
                write!(f, "{} = bitcast i8* {} to %{}*", dest, src, class)
            }
            Instruction::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// External function declaration, `declare <ret> @<name>(<params>)`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<IrType>,
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "declare {} @{}({})", self.ret, self.name, join_types(&self.params))
    }
}

/// Named struct type, `%<name> = type { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<IrType>,
}

impl fmt::Display for StructDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            write!(f, "%{} = type {{}}", self.name)
        } else {
            write!(f, "%{} = type {{ {} }}", self.name, join_types(&self.fields))
        }
    }
}
