//! Instruction Buffer
//!
//! Ordered storage for everything one compilation unit emits: external
//! declarations, struct definitions and function code. The buffer owns the
//! register and label counters, resolves branch targets after the fact
//! (backpatching) and renders the final IR text.

use super::instr::{Declaration, Instruction, StructDef};
use super::types::IrType;
use super::value::{Label, Register};
use crate::error::{CompileError, CompileResult};
use std::fmt;

/// Runtime primitive reading a number
pub const READ_NUMBER: &str = "scand";
/// Runtime primitive printing a number
pub const PRINT_NUMBER: &str = "printd";
/// Runtime primitive printing a C string
pub const PRINT_STRING: &str = "prints";
/// Runtime allocator
pub const MALLOC: &str = "malloc";

/// Declarations every module starts with
pub fn runtime_declarations() -> Vec<Declaration> {
    vec![
        Declaration {
            name: READ_NUMBER.to_string(),
            ret: IrType::Double,
            params: vec![],
        },
        Declaration {
            name: PRINT_NUMBER.to_string(),
            ret: IrType::Void,
            params: vec![IrType::Double],
        },
        Declaration {
            name: PRINT_STRING.to_string(),
            ret: IrType::Void,
            params: vec![IrType::BytePtr],
        },
        Declaration {
            name: MALLOC.to_string(),
            ret: IrType::BytePtr,
            params: vec![IrType::I32],
        },
    ]
}

/// Which target of a branch an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchSlot {
    /// The `true` target of a conditional branch, or the only target of an
    /// unconditional one
    True,
    False,
}

impl fmt::Display for BranchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchSlot::True => f.write_str("true"),
            BranchSlot::False => f.write_str("false"),
        }
    }
}

/// A branch target waiting for its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackpatchEntry {
    pub position: usize,
    pub slot: BranchSlot,
}

impl BackpatchEntry {
    pub fn new(position: usize, slot: BranchSlot) -> Self {
        Self { position, slot }
    }
}

#[derive(Debug, Clone)]
pub struct InstructionBuffer {
    module_name: String,
    declarations: Vec<Declaration>,
    structs: Vec<StructDef>,
    code: Vec<Instruction>,
    next_register: u32,
    next_label: u32,
    fallthrough_branches: bool,
    current_function: Option<(String, usize)>,
}

impl Default for InstructionBuffer {
    fn default() -> Self {
        Self::new("main")
    }
}

impl InstructionBuffer {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            declarations: Vec::new(),
            structs: Vec::new(),
            code: Vec::new(),
            next_register: 1,
            next_label: 0,
            fallthrough_branches: true,
            current_function: None,
        }
    }

    pub fn with_fallthrough_branches(mut self, enabled: bool) -> Self {
        self.fallthrough_branches = enabled;
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.code
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }

    /// Whether control can fall off the end of the code emitted so far
    pub fn is_open(&self) -> bool {
        self.code.last().map_or(true, |instr| !instr.is_terminator())
    }

    pub fn new_register(&mut self) -> Register {
        let reg = Register::new(self.next_register);
        self.next_register += 1;
        reg
    }

    pub fn emit(&mut self, instr: Instruction) -> usize {
        let position = self.code.len();
        self.code.push(instr);
        position
    }

    pub fn emit_declaration(&mut self, decl: Declaration) {
        self.declarations.push(decl);
    }

    pub fn emit_struct(&mut self, def: StructDef) {
        self.structs.push(def);
    }

    /// Allocate a label and define it at the current position.
    ///
    /// When the preceding block is still open it is closed with an explicit
    /// jump to the new label.
    pub fn new_label(&mut self) -> Label {
        let label = Label::new(self.next_label);
        self.next_label += 1;
        let needs_jump = match self.code.last() {
            Some(Instruction::FunctionBegin { .. }) | None => false,
            Some(instr) => !instr.is_terminator(),
        };
        if self.fallthrough_branches && needs_jump {
            self.emit(Instruction::Branch {
                target: Some(label),
            });
        }
        self.emit(Instruction::Label(label));
        log::trace!("label {} at {}", label.name(), self.code.len() - 1);
        label
    }

    /// Point every listed branch slot at `label`
    pub fn patch(&mut self, entries: &[BackpatchEntry], label: Label) -> CompileResult<()> {
        for entry in entries {
            let instr = self
                .code
                .get_mut(entry.position)
                .filter(|instr| instr.is_branch())
                .ok_or(CompileError::NotABranch {
                    position: entry.position,
                })?;
            let slot = match (instr, entry.slot) {
                (Instruction::Branch { target }, BranchSlot::True) => target,
                (Instruction::CondBranch { if_true, .. }, BranchSlot::True) => if_true,
                (Instruction::CondBranch { if_false, .. }, BranchSlot::False) => if_false,
                _ => {
                    return Err(CompileError::NotABranch {
                        position: entry.position,
                    })
                }
            };
            if slot.is_some() {
                return Err(CompileError::DoublePatch {
                    position: entry.position,
                    slot: entry.slot,
                });
            }
            *slot = Some(label);
            log::trace!("patched {} slot of {} -> {}", entry.slot, entry.position, label);
        }
        Ok(())
    }

    pub fn begin_function(&mut self, name: &str, ret: IrType, params: Vec<IrType>) -> CompileResult<()> {
        if let Some((open, _)) = &self.current_function {
            return Err(CompileError::internal(format!(
                "function {} started while {} is still open",
                name, open
            )));
        }
        let position = self.emit(Instruction::FunctionBegin {
            name: name.to_string(),
            ret,
            params,
        });
        self.current_function = Some((name.to_string(), position));
        Ok(())
    }

    /// Close the current function and verify every branch in it is resolved
    pub fn end_function(&mut self) -> CompileResult<()> {
        let (name, start) = self
            .current_function
            .take()
            .ok_or_else(|| CompileError::internal("end of function without a begin"))?;
        self.emit(Instruction::FunctionEnd);
        if let Some(offset) = self.code[start..].iter().position(Instruction::has_open_target) {
            return Err(CompileError::UnresolvedBranch {
                function: name,
                position: start + offset,
            });
        }
        Ok(())
    }

    /// Render the module: header, declarations, structs, then code
    pub fn serialize(&self) -> String {
        let mut out = format!("; ModuleID = '{}'\n", self.module_name);
        for decl in runtime_declarations().iter().chain(&self.declarations) {
            out.push_str(&format!("{}\n", decl));
        }
        out.push('\n');
        if !self.structs.is_empty() {
            for def in &self.structs {
                out.push_str(&format!("{}\n", def));
            }
            out.push('\n');
        }
        for instr in &self.code {
            match instr {
                Instruction::FunctionBegin { .. } | Instruction::Label(_) => {
                    out.push_str(&format!("{}\n", instr));
                }
                Instruction::FunctionEnd => out.push_str(&format!("{}\n\n", instr)),
                _ => out.push_str(&format!("  {}\n", instr)),
            }
        }
        out
    }
}
