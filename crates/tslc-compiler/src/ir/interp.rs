//! Reference evaluator
//!
//! Executes a lowered [`InstructionBuffer`] directly so the meaning of the
//! emitted code can be checked without an LLVM toolchain. Memory is a flat
//! array of cells: `alloca`, `malloc` and field addresses all produce cell
//! indices, and a struct occupies one cell per field.

use super::buffer::{InstructionBuffer, MALLOC, PRINT_NUMBER, PRINT_STRING, READ_NUMBER};
use super::instr::{ArithOp, CompareOp, Instruction};
use super::value::{Label, Operand, Register};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

const MAX_CALL_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Int(i64),
    Ptr(usize),
    Void,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}i", i),
            Value::Ptr(p) => write!(f, "*{}", p),
            Value::Void => write!(f, "void"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown struct: %{0}")]
    UnknownStruct(String),

    #[error("Unknown label: {0}")]
    UnknownLabel(Label),

    #[error("Branch at {0} has no target")]
    UnresolvedBranch(usize),

    #[error("Register {0} read before definition")]
    UndefinedRegister(Register),

    #[error("Parameter %{0} out of range")]
    MissingArgument(u32),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: Value },

    #[error("Read of uninitialized memory at {0}")]
    Uninitialized(usize),

    #[error("Invalid address {0}")]
    InvalidAddress(usize),

    #[error("No input left for {}", READ_NUMBER)]
    InputExhausted,

    #[error("Call depth limit exceeded")]
    StackOverflow,

    #[error("Reached unreachable code in {0}")]
    Unreachable(String),

    #[error("Control fell off the end of {0}")]
    FellOffEnd(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

type HostFn = Box<dyn FnMut(&[Value]) -> Value>;

pub struct Interpreter<'b> {
    code: &'b [Instruction],
    functions: FxHashMap<String, usize>,
    labels: FxHashMap<Label, usize>,
    struct_sizes: FxHashMap<String, usize>,
    memory: Vec<Option<Value>>,
    host: FxHashMap<String, HostFn>,
    input: VecDeque<f64>,
    output: Vec<f64>,
    depth: usize,
}

impl<'b> Interpreter<'b> {
    pub fn new(buffer: &'b InstructionBuffer) -> Self {
        let code = buffer.instructions();
        let mut functions = FxHashMap::default();
        let mut labels = FxHashMap::default();
        for (position, instr) in code.iter().enumerate() {
            match instr {
                Instruction::FunctionBegin { name, .. } => {
                    functions.insert(name.clone(), position);
                }
                Instruction::Label(label) => {
                    labels.insert(*label, position);
                }
                _ => {}
            }
        }
        let struct_sizes = buffer
            .structs()
            .iter()
            .map(|def| (def.name.clone(), def.fields.len()))
            .collect();
        Self {
            code,
            functions,
            labels,
            struct_sizes,
            // cell 0 stands for null
            memory: vec![None],
            host: FxHashMap::default(),
            input: VecDeque::new(),
            output: Vec::new(),
            depth: 0,
        }
    }

    /// Provide an implementation for an external (imported) function
    pub fn with_import(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(&[Value]) -> Value + 'static,
    ) -> Self {
        self.host.insert(name.into(), Box::new(f));
        self
    }

    /// Queue numbers for the read primitive
    pub fn with_input(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.input.extend(values);
        self
    }

    /// Numbers printed so far
    pub fn output(&self) -> &[f64] {
        &self.output
    }

    /// Read the cell at `addr`
    pub fn read(&self, addr: Value) -> EvalResult<Value> {
        let index = address(addr)?;
        match self.memory.get(index) {
            Some(Some(value)) => Ok(*value),
            Some(None) => Err(EvalError::Uninitialized(index)),
            None => Err(EvalError::InvalidAddress(index)),
        }
    }

    pub fn call(&mut self, name: &str, args: &[Value]) -> EvalResult<Value> {
        if let Some(&start) = self.functions.get(name) {
            if self.depth >= MAX_CALL_DEPTH {
                return Err(EvalError::StackOverflow);
            }
            self.depth += 1;
            let result = self.run(name, start, args);
            self.depth -= 1;
            return result;
        }
        match name {
            MALLOC => {
                let size = match args.first() {
                    Some(Value::Int(n)) => (*n).max(1) as usize,
                    Some(other) => return Err(mismatch("i32", *other)),
                    None => return Err(EvalError::MissingArgument(0)),
                };
                let base = self.memory.len();
                self.memory.resize(base + size, None);
                Ok(Value::Ptr(base))
            }
            PRINT_NUMBER => {
                let value = args.first().copied().ok_or(EvalError::MissingArgument(0))?;
                self.output.push(number(value)?);
                Ok(Value::Void)
            }
            PRINT_STRING => Ok(Value::Void),
            READ_NUMBER => self
                .input
                .pop_front()
                .map(Value::Number)
                .ok_or(EvalError::InputExhausted),
            _ => match self.host.get_mut(name) {
                Some(f) => Ok(f(args)),
                None => Err(EvalError::UnknownFunction(name.to_string())),
            },
        }
    }

    fn alloc_cell(&mut self) -> Value {
        self.memory.push(None);
        Value::Ptr(self.memory.len() - 1)
    }

    fn store(&mut self, addr: Value, value: Value) -> EvalResult<()> {
        let index = address(addr)?;
        match self.memory.get_mut(index) {
            Some(cell) if index != 0 => {
                *cell = Some(value);
                Ok(())
            }
            _ => Err(EvalError::InvalidAddress(index)),
        }
    }

    fn jump(&self, label: &Option<Label>, position: usize) -> EvalResult<usize> {
        let label = label.ok_or(EvalError::UnresolvedBranch(position))?;
        self.labels
            .get(&label)
            .map(|p| p + 1)
            .ok_or(EvalError::UnknownLabel(label))
    }

    fn run(&mut self, name: &str, start: usize, args: &[Value]) -> EvalResult<Value> {
        let code = self.code;
        let mut regs: FxHashMap<Register, Value> = FxHashMap::default();
        let read = |regs: &FxHashMap<Register, Value>, op: &Operand| -> EvalResult<Value> {
            match op {
                Operand::Reg(reg) => regs.get(reg).copied().ok_or(EvalError::UndefinedRegister(*reg)),
                Operand::Param(index) => args
                    .get(*index as usize)
                    .copied()
                    .ok_or(EvalError::MissingArgument(*index)),
            }
        };

        let mut pc = start + 1;
        loop {
            let instr = code
                .get(pc)
                .ok_or_else(|| EvalError::FellOffEnd(name.to_string()))?;
            pc += 1;
            match instr {
                Instruction::FunctionBegin { .. } | Instruction::FunctionEnd => {
                    return Err(EvalError::FellOffEnd(name.to_string()));
                }
                Instruction::Label(_) => {}
                Instruction::Constant { dest, value } => {
                    regs.insert(*dest, Value::Number(*value));
                }
                Instruction::Binary { dest, op, lhs, rhs } => {
                    let l = number(read(&regs, lhs)?)?;
                    let r = number(read(&regs, rhs)?)?;
                    let result = match op {
                        ArithOp::FAdd => l + r,
                        ArithOp::FSub => l - r,
                        ArithOp::FMul => l * r,
                        ArithOp::FDiv => l / r,
                    };
                    regs.insert(*dest, Value::Number(result));
                }
                Instruction::Neg { dest, operand } => {
                    let v = number(read(&regs, operand)?)?;
                    regs.insert(*dest, Value::Number(-v));
                }
                Instruction::Compare { dest, op, lhs, rhs } => {
                    let l = number(read(&regs, lhs)?)?;
                    let r = number(read(&regs, rhs)?)?;
                    let ordered = !l.is_nan() && !r.is_nan();
                    let result = ordered
                        && match op {
                            CompareOp::Olt => l < r,
                            CompareOp::Ole => l <= r,
                            CompareOp::Ogt => l > r,
                            CompareOp::Oge => l >= r,
                            CompareOp::Oeq => l == r,
                            CompareOp::One => l != r,
                        };
                    regs.insert(*dest, Value::Bool(result));
                }
                Instruction::CondBranch {
                    cond,
                    if_true,
                    if_false,
                } => {
                    let taken = match regs.get(cond) {
                        Some(Value::Bool(b)) => *b,
                        Some(other) => return Err(mismatch("i1", *other)),
                        None => return Err(EvalError::UndefinedRegister(*cond)),
                    };
                    let target = if taken { if_true } else { if_false };
                    pc = self.jump(target, pc - 1)?;
                }
                Instruction::Branch { target } => {
                    pc = self.jump(target, pc - 1)?;
                }
                Instruction::Return { value, .. } => {
                    return match value {
                        Some(op) => read(&regs, op),
                        None => Ok(Value::Void),
                    };
                }
                Instruction::Call {
                    dest,
                    ret,
                    callee,
                    args: call_args,
                } => {
                    let values = call_args
                        .iter()
                        .map(|(_, op)| read(&regs, op))
                        .collect::<EvalResult<Vec<_>>>()?;
                    let result = self.call(callee, &values)?;
                    if !ret.is_void() {
                        regs.insert(*dest, result);
                    }
                }
                Instruction::Alloca { dest, .. } => {
                    let cell = self.alloc_cell();
                    regs.insert(*dest, cell);
                }
                Instruction::Load { dest, addr, .. } => {
                    let value = self.read(read(&regs, addr)?)?;
                    regs.insert(*dest, value);
                }
                Instruction::Store { value, addr, .. } => {
                    let value = read(&regs, value)?;
                    let addr = read(&regs, addr)?;
                    self.store(addr, value)?;
                }
                Instruction::FieldAddress {
                    dest, base, index, ..
                } => {
                    let base = address(read(&regs, base)?)?;
                    regs.insert(*dest, Value::Ptr(base + *index as usize));
                }
                Instruction::SizeOf { dest, class } => {
                    let size = self
                        .struct_sizes
                        .get(class)
                        .copied()
                        .ok_or_else(|| EvalError::UnknownStruct(class.clone()))?;
                    regs.insert(*dest, Value::Ptr(size));
                }
                Instruction::PtrToInt { dest, src, .. } => {
                    let p = address(read(&regs, &Operand::Reg(*src))?)?;
                    regs.insert(*dest, Value::Int(p as i64));
                }
                Instruction::BitCast { dest, src, .. } => {
                    let p = read(&regs, &Operand::Reg(*src))?;
                    regs.insert(*dest, p);
                }
                Instruction::Unreachable => return Err(EvalError::Unreachable(name.to_string())),
            }
        }
    }
}

fn mismatch(expected: &'static str, found: Value) -> EvalError {
    EvalError::TypeMismatch { expected, found }
}

fn number(value: Value) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| mismatch("double", value))
}

fn address(value: Value) -> EvalResult<usize> {
    match value {
        Value::Ptr(p) => Ok(p),
        other => Err(mismatch("pointer", other)),
    }
}
