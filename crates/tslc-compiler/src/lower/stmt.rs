//! Statement lowering
//!
//! Each statement returns the list of branch slots that must jump to whatever
//! follows it; the enclosing block resolves that list against a fresh label.

use super::context::StmtContext;
use super::symbols::StorageDescriptor;
use super::Lowerer;
use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{Block, Expr, ForStmt, IfStmt, Stmt, VariableDecl};
use crate::frontend::SourceType;
use crate::ir::{map_type, BackpatchEntry, BranchSlot, Instruction};

impl<'a> Lowerer<'a> {
    /// Lower a statement sequence, chaining each statement's pending jumps to
    /// the next one
    pub(super) fn lower_block(&mut self, block: &Block) -> CompileResult<StmtContext> {
        let mut ctx = StmtContext::default();
        for stmt in &block.statements {
            if !ctx.is_empty() || !self.buffer.is_open() {
                let label = self.buffer.new_label();
                self.buffer.patch(&ctx.next_list, label)?;
            }
            ctx = self.lower_stmt(stmt)?;
        }
        Ok(ctx)
    }

    pub(super) fn lower_stmt(&mut self, stmt: &Stmt) -> CompileResult<StmtContext> {
        match stmt {
            Stmt::Expression(expr) => {
                self.lower_expr(expr)?;
                Ok(StmtContext::default())
            }
            Stmt::VariableDecl(decl) => {
                self.lower_var_decl(decl)?;
                Ok(StmtContext::default())
            }
            Stmt::Return(value) => {
                self.lower_return(value.as_ref())?;
                Ok(StmtContext::default())
            }
            Stmt::If(if_stmt) => self.lower_if(if_stmt),
            Stmt::For(for_stmt) => self.lower_for(for_stmt),
            Stmt::Block(block) => {
                self.symbols.enter_scope();
                let result = self.lower_block(block);
                self.symbols.exit_scope();
                result
            }
            Stmt::Empty => Ok(StmtContext::default()),
            other => Err(CompileError::unsupported(other.kind_name())),
        }
    }

    fn lower_var_decl(&mut self, decl: &VariableDecl) -> CompileResult<()> {
        let ty = self.front.type_of(decl.id);
        let ir = map_type(Some(&ty), true)?;
        let slot = self.buffer.new_register();
        self.buffer.emit(Instruction::Alloca {
            dest: slot,
            ty: ir.clone(),
        });
        if let Some(init) = &decl.init {
            let (value, _) = self.lower_value(init)?;
            self.buffer.emit(Instruction::Store {
                ty: ir,
                value,
                addr: slot.into(),
            });
        }
        // visible only once it holds a value
        self.symbols.bind(&decl.name, StorageDescriptor::slot(slot));
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&Expr>) -> CompileResult<()> {
        let state = self.current_function()?.clone();
        match value {
            Some(expr) => {
                if state.ret == SourceType::Void || state.this_slot.is_some() {
                    return Err(CompileError::unsupported(format!(
                        "value returned from {}",
                        state.name
                    )));
                }
                let (value, _) = self.lower_value(expr)?;
                let ty = map_type(Some(&state.ret), true)?;
                self.buffer.emit(Instruction::Return {
                    ty,
                    value: Some(value),
                });
                Ok(())
            }
            None if state.ret == SourceType::Void || state.this_slot.is_some() => {
                self.emit_plain_return()
            }
            None => Err(CompileError::unsupported(format!(
                "return without a value from {}",
                state.name
            ))),
        }
    }

    /// Unconditional jump with an open target, if control can reach here
    fn jump_if_open(&mut self) -> Option<BackpatchEntry> {
        if !self.buffer.is_open() {
            return None;
        }
        let position = self.buffer.emit(Instruction::Branch { target: None });
        Some(BackpatchEntry::new(position, BranchSlot::True))
    }

    fn lower_scoped(&mut self, stmt: &Stmt) -> CompileResult<StmtContext> {
        self.symbols.enter_scope();
        let result = self.lower_stmt(stmt);
        self.symbols.exit_scope();
        result
    }

    fn lower_if(&mut self, if_stmt: &IfStmt) -> CompileResult<StmtContext> {
        let cond = self.lower_condition(&if_stmt.condition)?;

        let then_label = self.buffer.new_label();
        self.buffer.patch(&cond.true_list, then_label)?;
        let then_ctx = self.lower_scoped(&if_stmt.then_branch)?;

        match &if_stmt.else_branch {
            None => Ok(StmtContext::new(cond.false_list).merge(then_ctx)),
            Some(else_branch) => {
                let skip_else = self.jump_if_open();
                let else_label = self.buffer.new_label();
                self.buffer.patch(&cond.false_list, else_label)?;
                let else_ctx = self.lower_scoped(else_branch)?;
                Ok(then_ctx
                    .merge(StmtContext::new(skip_else.into_iter().collect()))
                    .merge(else_ctx))
            }
        }
    }

    fn lower_for(&mut self, for_stmt: &ForStmt) -> CompileResult<StmtContext> {
        let (Some(init), Some(condition), Some(update)) =
            (&for_stmt.init, &for_stmt.condition, &for_stmt.update)
        else {
            return Err(CompileError::unsupported(
                "for statement without initializer, condition and update",
            ));
        };

        self.symbols.enter_scope();
        let result = self.lower_for_parts(init, condition, update, &for_stmt.body);
        self.symbols.exit_scope();
        result
    }

    fn lower_for_parts(
        &mut self,
        init: &Stmt,
        condition: &Expr,
        update: &Expr,
        body: &Stmt,
    ) -> CompileResult<StmtContext> {
        let init_ctx = self.lower_stmt(init)?;
        let mut entry = init_ctx.next_list;
        entry.extend(self.jump_if_open());

        let cond_label = self.buffer.new_label();
        self.buffer.patch(&entry, cond_label)?;
        let cond = self.lower_condition(condition)?;

        let body_label = self.buffer.new_label();
        self.buffer.patch(&cond.true_list, body_label)?;
        let body_ctx = self.lower_scoped(body)?;
        let mut to_update = body_ctx.next_list;
        to_update.extend(self.jump_if_open());

        let update_label = self.buffer.new_label();
        self.buffer.patch(&to_update, update_label)?;
        self.lower_expr(update)?;
        self.buffer.emit(Instruction::Branch {
            target: Some(cond_label),
        });

        Ok(StmtContext::new(cond.false_list))
    }
}
