//! AST to IR Lowering
//!
//! Single-pass translation of the syntax tree into an [`InstructionBuffer`].
//! All state of a compilation unit lives in one [`Lowerer`]: the buffer with
//! its register and label counters, the symbol table of the current function,
//! the import tracker, the struct layouts and the manifest being built.

mod class;
mod context;
mod expr;
mod imports;
mod manifest;
mod stmt;
mod symbols;

pub use class::StructLayout;
pub use context::{BoolContext, ExprContext, StmtContext};
pub use imports::ImportTracker;
pub use manifest::{ClassEntry, FieldEntry, FunctionEntry, ModuleManifest};
pub use symbols::{Storage, StorageDescriptor, SymbolTable};

use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{self, Block, Item, Param};
use crate::frontend::{FrontEnd, SourceType};
use crate::ir::{map_type, Instruction, InstructionBuffer, IrType, Register};
use crate::options::CompileOptions;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Output of a successful compilation
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub buffer: InstructionBuffer,
    pub manifest: ModuleManifest,
}

impl CompiledModule {
    /// The module as LLVM assembly text
    pub fn ir_text(&self) -> String {
        self.buffer.serialize()
    }
}

/// Per-function lowering state
#[derive(Debug, Clone)]
struct FunctionState {
    name: String,
    ret: SourceType,
    /// Stack slot holding `this` inside a constructor, with its class
    this_slot: Option<(Register, String)>,
}

/// AST to IR lowerer
pub struct Lowerer<'a> {
    front: &'a dyn FrontEnd,
    options: &'a CompileOptions,
    buffer: InstructionBuffer,
    symbols: SymbolTable,
    imports: ImportTracker,
    layouts: FxHashMap<String, Rc<StructLayout>>,
    manifest: ModuleManifest,
    function: Option<FunctionState>,
}

impl<'a> Lowerer<'a> {
    pub fn new(front: &'a dyn FrontEnd, options: &'a CompileOptions) -> Self {
        Self {
            front,
            options,
            buffer: InstructionBuffer::new(options.module_name.clone())
                .with_fallthrough_branches(options.fallthrough_branches),
            symbols: SymbolTable::new(),
            imports: ImportTracker::new(),
            layouts: FxHashMap::default(),
            manifest: ModuleManifest::new(options.module_name.clone()),
            function: None,
        }
    }

    /// Lower every declaration of `module`, in source order
    pub fn lower_module(mut self, module: &ast::Module) -> CompileResult<CompiledModule> {
        for item in &module.items {
            match item {
                Item::Function(func) => self.lower_function(func)?,
                Item::Class(class) => self.lower_class(class)?,
            }
        }
        log::debug!(
            "module {}: {} instructions, {} imports",
            self.options.module_name,
            self.buffer.instructions().len(),
            self.imports.entries().len()
        );
        self.manifest.imports = self.imports.entries().iter().map(FunctionEntry::from).collect();
        Ok(CompiledModule {
            buffer: self.buffer,
            manifest: self.manifest,
        })
    }

    fn lower_function(&mut self, func: &ast::FunctionDecl) -> CompileResult<()> {
        log::debug!("lowering function {}", func.name);
        let signature = self
            .front
            .function_signature(&func.name)
            .cloned()
            .ok_or_else(|| CompileError::internal(format!("no signature for function {}", func.name)))?;
        let (ret, params) =
            self.lower_callable(&func.name, &func.params, &signature.params, signature.ret, None, &func.body)?;
        self.manifest
            .functions
            .push(FunctionEntry::new(&func.name, &ret, &params));
        Ok(())
    }

    /// Emit a function or method body. With a receiver class, `this` is bound
    /// to an extra trailing parameter. Returns the IR signature.
    fn lower_callable(
        &mut self,
        ir_name: &str,
        params: &[Param],
        param_types: &[SourceType],
        ret: SourceType,
        receiver: Option<&str>,
        body: &Block,
    ) -> CompileResult<(IrType, Vec<IrType>)> {
        self.symbols.clear();
        let mut ir_params = param_types
            .iter()
            .map(|ty| map_type(Some(ty), true))
            .collect::<CompileResult<Vec<_>>>()?;
        for (index, param) in params.iter().enumerate() {
            self.symbols
                .bind(&param.name, StorageDescriptor::param(index as u32));
        }
        if let Some(class) = receiver {
            self.symbols
                .bind("this", StorageDescriptor::param(params.len() as u32));
            ir_params.push(IrType::StructPtr(class.to_string()));
        }
        let ir_ret = map_type(Some(&ret), true)?;

        self.buffer.begin_function(ir_name, ir_ret.clone(), ir_params.clone())?;
        self.function = Some(FunctionState {
            name: ir_name.to_string(),
            ret,
            this_slot: None,
        });
        let ctx = self.lower_block(body)?;
        self.close_body(ctx)?;
        self.buffer.end_function()?;
        self.function = None;
        Ok((ir_ret, ir_params))
    }

    /// Resolve what is still pending at the end of a body and make sure
    /// control cannot fall off its end.
    fn close_body(&mut self, ctx: StmtContext) -> CompileResult<()> {
        if !ctx.is_empty() {
            let label = self.buffer.new_label();
            self.buffer.patch(&ctx.next_list, label)?;
        }
        if !self.buffer.is_open() {
            return Ok(());
        }
        let state = self.current_function()?.clone();
        match (&state.this_slot, &state.ret) {
            (Some(_), _) | (None, SourceType::Void) => self.emit_plain_return(),
            (None, _) => {
                self.buffer.emit(Instruction::Unreachable);
                Ok(())
            }
        }
    }

    /// `ret void`, or the constructed object inside a constructor
    fn emit_plain_return(&mut self) -> CompileResult<()> {
        let this_slot = self.current_function()?.this_slot.clone();
        match this_slot {
            Some((slot, class)) => {
                let ty = IrType::StructPtr(class);
                let value = self.buffer.new_register();
                self.buffer.emit(Instruction::Load {
                    dest: value,
                    ty: ty.clone(),
                    addr: slot.into(),
                });
                self.buffer.emit(Instruction::Return {
                    ty,
                    value: Some(value.into()),
                });
            }
            None => {
                self.buffer.emit(Instruction::Return {
                    ty: IrType::Void,
                    value: None,
                });
            }
        }
        Ok(())
    }

    fn current_function(&self) -> CompileResult<&FunctionState> {
        self.function
            .as_ref()
            .ok_or_else(|| CompileError::internal("statement lowered outside a function"))
    }
}
