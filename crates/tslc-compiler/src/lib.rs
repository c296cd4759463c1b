//! Tslc Compiler - typed TypeScript subset to LLVM IR
//!
//! Lowers a type-annotated syntax tree into textual LLVM assembly: numbers
//! become `double`, classes become heap-allocated structs with accessor,
//! allocator and constructor functions, and control flow is built with
//! backpatched branches. Types and symbols come from a [`FrontEnd`].

pub mod error;
pub mod frontend;
pub mod ir;
pub mod lower;
pub mod options;

pub use error::{CompileError, CompileResult, ErrorKind};
pub use frontend::ast::Module;
pub use frontend::binder::TypedProgram;
pub use frontend::builder::AstBuilder;
pub use frontend::{FrontEnd, Signature, SourceType, SymbolKind};
pub use ir::interp::{EvalError, Interpreter, Value};
pub use ir::InstructionBuffer;
pub use lower::{CompiledModule, Lowerer, ModuleManifest};
pub use options::CompileOptions;

/// Main compiler entry point
pub struct Compiler<'a> {
    front: &'a dyn FrontEnd,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(front: &'a dyn FrontEnd, options: CompileOptions) -> Self {
        Self { front, options }
    }

    /// Compile a module into IR
    pub fn compile(&self, module: &Module) -> CompileResult<CompiledModule> {
        Lowerer::new(self.front, &self.options).lower_module(module)
    }
}
