//! Expression lowering
//!
//! Expressions lower to an [`ExprContext`]; conditions lower to a
//! [`BoolContext`] made of unresolved branch slots.

use super::context::{BoolContext, ExprContext};
use super::symbols::Storage;
use super::Lowerer;
use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{
    AssignOp, BinaryOp, Expr, ExprKind, Identifier, LogicalOp, NodeId, UnaryOp, UpdateOp,
};
use crate::frontend::{SourceType, SymbolKind};
use crate::ir::buffer::{PRINT_NUMBER, READ_NUMBER};
use crate::ir::{map_type, ArithOp, CompareOp, Instruction, IrType, Operand, Register};

fn arith_op(op: BinaryOp) -> CompileResult<ArithOp> {
    match op {
        BinaryOp::Add => Ok(ArithOp::FAdd),
        BinaryOp::Sub => Ok(ArithOp::FSub),
        BinaryOp::Mul => Ok(ArithOp::FMul),
        BinaryOp::Div => Ok(ArithOp::FDiv),
        BinaryOp::Mod => Err(CompileError::unsupported("operator %")),
        relational => Err(CompileError::unsupported(format!(
            "comparison {} outside a condition",
            relational.symbol()
        ))),
    }
}

fn compare_op(op: BinaryOp) -> Option<CompareOp> {
    match op {
        BinaryOp::Lt => Some(CompareOp::Olt),
        BinaryOp::Le => Some(CompareOp::Ole),
        BinaryOp::Gt => Some(CompareOp::Ogt),
        BinaryOp::Ge => Some(CompareOp::Oge),
        BinaryOp::Eq | BinaryOp::StrictEq => Some(CompareOp::Oeq),
        BinaryOp::Ne | BinaryOp::StrictNe => Some(CompareOp::One),
        _ => None,
    }
}

impl<'a> Lowerer<'a> {
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> CompileResult<ExprContext> {
        match &expr.kind {
            ExprKind::Number(value) => Ok(self.lower_number(*value)),
            ExprKind::Identifier(name) => self.lower_identifier(expr.id, name),
            ExprKind::This => self.lower_variable("this", self.front.type_of(expr.id)),
            ExprKind::Paren(inner) => self.lower_expr(inner),
            ExprKind::Binary { op, left, right } => self.lower_binary(*op, left, right),
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand),
            ExprKind::Update { op, target, .. } => self.lower_update(*op, target),
            ExprKind::Assign { op, target, value } => self.lower_assign(*op, target, value),
            ExprKind::Member { object, property } => self.lower_member(object, property),
            ExprKind::Call { callee, args } => self.lower_call(expr.id, callee, args),
            ExprKind::New { class, args } => self.lower_new(class, args),
            ExprKind::Logical { .. } => Err(CompileError::unsupported(
                "logical expression outside a condition",
            )),
            other => Err(CompileError::unsupported(other.kind_name())),
        }
    }

    fn emit_constant(&mut self, value: f64) -> Register {
        let dest = self.buffer.new_register();
        self.buffer.emit(Instruction::Constant { dest, value });
        dest
    }

    fn lower_number(&mut self, value: f64) -> ExprContext {
        let dest = self.emit_constant(value);
        ExprContext::Value(dest.into(), SourceType::Number)
    }

    pub(super) fn lower_identifier(&mut self, node: NodeId, name: &str) -> CompileResult<ExprContext> {
        match self.front.classify(node) {
            SymbolKind::Function => Ok(ExprContext::Function {
                ir_name: name.to_string(),
                imported: false,
            }),
            SymbolKind::Method => Ok(ExprContext::Method {
                receiver: None,
                ir_name: name.to_string(),
            }),
            SymbolKind::Property => Ok(ExprContext::Property(name.to_string())),
            SymbolKind::Variable => self.lower_variable(name, self.front.type_of(node)),
            // Names the unit never declares are namespaces of other modules.
            SymbolKind::Unclassified => Ok(ExprContext::ImportedNamespace(name.to_string())),
        }
    }

    fn lower_variable(&mut self, name: &str, ty: SourceType) -> CompileResult<ExprContext> {
        let descriptor = self
            .symbols
            .lookup(name)
            .ok_or_else(|| CompileError::UnresolvedSymbol {
                name: name.to_string(),
            })?;
        Ok(match descriptor.storage() {
            Storage::Param(index) => ExprContext::Value(Operand::Param(index), ty),
            Storage::Slot(reg) => ExprContext::Address(reg, ty),
        })
    }

    /// Collapse a context to a value, loading through addresses
    pub(super) fn to_value(&mut self, ctx: ExprContext) -> CompileResult<(Operand, SourceType)> {
        match ctx {
            ExprContext::Value(operand, ty) => Ok((operand, ty)),
            ExprContext::Address(addr, ty) => {
                let ir = map_type(Some(&ty), true)?;
                let dest = self.buffer.new_register();
                self.buffer.emit(Instruction::Load {
                    dest,
                    ty: ir,
                    addr: addr.into(),
                });
                Ok((dest.into(), ty))
            }
            other => Err(CompileError::ContextMismatch {
                expected: "value",
                found: other.kind_name(),
            }),
        }
    }

    pub(super) fn lower_value(&mut self, expr: &Expr) -> CompileResult<(Operand, SourceType)> {
        let ctx = self.lower_expr(expr)?;
        self.to_value(ctx)
    }

    fn lower_number_operand(&mut self, expr: &Expr) -> CompileResult<Operand> {
        let (operand, ty) = self.lower_value(expr)?;
        match ty {
            SourceType::Number | SourceType::Any => Ok(operand),
            other => Err(CompileError::unsupported(format!("arithmetic on {}", other))),
        }
    }

    /// Address of a number slot, the target of `op`
    fn lower_number_address(&mut self, op: &str, expr: &Expr) -> CompileResult<Register> {
        match self.lower_address(expr)? {
            (addr, SourceType::Number | SourceType::Any) => Ok(addr),
            (_, other) => Err(CompileError::unsupported(format!("operator {} on {}", op, other))),
        }
    }

    fn lower_address(&mut self, expr: &Expr) -> CompileResult<(Register, SourceType)> {
        match self.lower_expr(expr)? {
            ExprContext::Address(reg, ty) => Ok((reg, ty)),
            other => Err(CompileError::ContextMismatch {
                expected: "address",
                found: other.kind_name(),
            }),
        }
    }

    fn emit_arith(&mut self, op: ArithOp, lhs: Operand, rhs: Operand) -> Register {
        let dest = self.buffer.new_register();
        self.buffer.emit(Instruction::Binary { dest, op, lhs, rhs });
        dest
    }

    fn lower_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<ExprContext> {
        let arith = arith_op(op)?;
        let lhs = self.lower_number_operand(left)?;
        let rhs = self.lower_number_operand(right)?;
        let dest = self.emit_arith(arith, lhs, rhs);
        Ok(ExprContext::Value(dest.into(), SourceType::Number))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> CompileResult<ExprContext> {
        match op {
            UnaryOp::Neg => {
                let value = self.lower_number_operand(operand)?;
                let dest = self.buffer.new_register();
                self.buffer.emit(Instruction::Neg {
                    dest,
                    operand: value,
                });
                Ok(ExprContext::Value(dest.into(), SourceType::Number))
            }
            UnaryOp::Plus => {
                let value = self.lower_number_operand(operand)?;
                Ok(ExprContext::Value(value, SourceType::Number))
            }
            UnaryOp::Not => Err(CompileError::unsupported("operator ! outside a condition")),
            UnaryOp::BitNot => Err(CompileError::unsupported("operator ~")),
        }
    }

    /// `++`/`--`, prefix or postfix: store and yield the updated value
    fn lower_update(&mut self, op: UpdateOp, target: &Expr) -> CompileResult<ExprContext> {
        let (symbol, arith) = match op {
            UpdateOp::Increment => ("++", ArithOp::FAdd),
            UpdateOp::Decrement => ("--", ArithOp::FSub),
        };
        let addr = self.lower_number_address(symbol, target)?;
        let current = self.buffer.new_register();
        self.buffer.emit(Instruction::Load {
            dest: current,
            ty: IrType::Double,
            addr: addr.into(),
        });
        let one = self.emit_constant(1.0);
        let updated = self.emit_arith(arith, current.into(), one.into());
        self.buffer.emit(Instruction::Store {
            ty: IrType::Double,
            value: updated.into(),
            addr: addr.into(),
        });
        Ok(ExprContext::Value(updated.into(), SourceType::Number))
    }

    fn lower_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> CompileResult<ExprContext> {
        match op.binary_op() {
            None => {
                let (value, _) = self.lower_value(value)?;
                let (addr, ty) = self.lower_address(target)?;
                let ir = map_type(Some(&ty), true)?;
                self.buffer.emit(Instruction::Store {
                    ty: ir,
                    value,
                    addr: addr.into(),
                });
                Ok(ExprContext::Value(value, ty))
            }
            Some(binary) => {
                let arith = arith_op(binary)?;
                let addr = self.lower_number_address(op.symbol(), target)?;
                let current = self.buffer.new_register();
                self.buffer.emit(Instruction::Load {
                    dest: current,
                    ty: IrType::Double,
                    addr: addr.into(),
                });
                let rhs = self.lower_number_operand(value)?;
                let updated = self.emit_arith(arith, current.into(), rhs);
                self.buffer.emit(Instruction::Store {
                    ty: IrType::Double,
                    value: updated.into(),
                    addr: addr.into(),
                });
                Ok(ExprContext::Value(updated.into(), SourceType::Number))
            }
        }
    }

    /// Pointer to a class instance, and its class
    fn object_pointer(&mut self, ctx: ExprContext) -> CompileResult<(Operand, String)> {
        let (operand, ty) = self.to_value(ctx)?;
        match ty {
            SourceType::Class(class) => Ok((operand, class)),
            other => Err(CompileError::unsupported(format!("property access on {}", other))),
        }
    }

    fn lower_member(&mut self, object: &Expr, property: &Identifier) -> CompileResult<ExprContext> {
        let base = self.lower_expr(object)?;
        if let ExprContext::ImportedNamespace(namespace) = &base {
            return Ok(ExprContext::Function {
                ir_name: format!("{}_{}", namespace, property.name),
                imported: true,
            });
        }
        let member = self.lower_identifier(property.id, &property.name)?;
        let (object, class) = self.object_pointer(base)?;
        match member {
            ExprContext::Property(field) => {
                let layout = self.struct_layout(&class)?;
                let (index, ty) = layout.field(&field).ok_or_else(|| CompileError::UnknownField {
                    class: class.clone(),
                    field: field.clone(),
                })?;
                let dest = self.buffer.new_register();
                self.buffer.emit(Instruction::FieldAddress {
                    dest,
                    class,
                    base: object,
                    index,
                });
                Ok(ExprContext::Address(dest, ty.clone()))
            }
            ExprContext::Method {
                receiver: None,
                ir_name,
            } => Ok(ExprContext::Method {
                ir_name: format!("{}_{}", class, ir_name),
                receiver: Some((object, class)),
            }),
            other => Err(CompileError::ContextMismatch {
                expected: "property or method",
                found: other.kind_name(),
            }),
        }
    }

    /// Lower call arguments left to right into typed operands
    fn lower_args(&mut self, args: &[Expr]) -> CompileResult<Vec<(IrType, Operand)>> {
        let mut lowered = Vec::with_capacity(args.len());
        for arg in args {
            let (operand, ty) = self.lower_value(arg)?;
            let ty = match ty {
                SourceType::Any => self
                    .front
                    .contextual_type(arg.id)
                    .ok_or_else(|| CompileError::UnsupportedType { ty: ty.to_string() })?,
                SourceType::Void => {
                    return Err(CompileError::unsupported("void value as an argument"))
                }
                ty => ty,
            };
            lowered.push((map_type(Some(&ty), true)?, operand));
        }
        Ok(lowered)
    }

    fn is_console_log(&self, callee: &Expr) -> bool {
        match &callee.kind {
            ExprKind::Member { object, property } => {
                property.name == "log"
                    && matches!(&object.kind, ExprKind::Identifier(name) if name == "console")
                    && self.front.classify(object.id) == SymbolKind::Unclassified
            }
            _ => false,
        }
    }

    fn is_scanf(&self, callee: &Expr) -> bool {
        matches!(&callee.kind, ExprKind::Identifier(name) if name == "scanf")
            && self.front.classify(callee.id) == SymbolKind::Unclassified
    }

    fn lower_call(&mut self, node: NodeId, callee: &Expr, args: &[Expr]) -> CompileResult<ExprContext> {
        if self.options.intercept_console_log && self.is_console_log(callee) {
            return self.lower_print(args);
        }
        if self.is_scanf(callee) {
            return self.lower_scan(args);
        }
        let mut lowered = self.lower_args(args)?;
        let callee_ctx = self.lower_expr(callee)?;
        let ret = match self.front.type_of(node) {
            SourceType::Any => self.front.contextual_type(node).unwrap_or(SourceType::Void),
            ty => ty,
        };
        let ir_ret = map_type(Some(&ret), true)?;
        let ir_name = match callee_ctx {
            ExprContext::Function { ir_name, imported } => {
                if imported {
                    let params: Vec<IrType> = lowered.iter().map(|(ty, _)| ty.clone()).collect();
                    if let Some(decl) = self.imports.record(&ir_name, &ir_ret, &params) {
                        self.buffer.emit_declaration(decl);
                    }
                }
                ir_name
            }
            ExprContext::Method {
                receiver: Some((receiver, class)),
                ir_name,
            } => {
                lowered.push((IrType::StructPtr(class), receiver));
                ir_name
            }
            other => {
                return Err(CompileError::ContextMismatch {
                    expected: "callable",
                    found: other.kind_name(),
                })
            }
        };
        let dest = self.buffer.new_register();
        self.buffer.emit(Instruction::Call {
            dest,
            ret: ir_ret,
            callee: ir_name,
            args: lowered,
        });
        Ok(ExprContext::Value(dest.into(), ret))
    }

    /// `console.log(n)` through the runtime print primitive
    fn lower_print(&mut self, args: &[Expr]) -> CompileResult<ExprContext> {
        let [arg] = args else {
            return Err(CompileError::unsupported(format!(
                "console.log with {} arguments",
                args.len()
            )));
        };
        let value = match self.lower_value(arg)? {
            (operand, SourceType::Number | SourceType::Any) => operand,
            (_, other) => {
                return Err(CompileError::unsupported(format!("console.log of {}", other)))
            }
        };
        let dest = self.buffer.new_register();
        self.buffer.emit(Instruction::Call {
            dest,
            ret: IrType::Void,
            callee: PRINT_NUMBER.to_string(),
            args: vec![(IrType::Double, value)],
        });
        Ok(ExprContext::Value(dest.into(), SourceType::Void))
    }

    /// `scanf("%d")` through the runtime read primitive
    fn lower_scan(&mut self, args: &[Expr]) -> CompileResult<ExprContext> {
        let format = match args {
            [Expr {
                kind: ExprKind::String(format),
                ..
            }] => format.as_str(),
            [_] => return Err(CompileError::unsupported("scanf without a format string")),
            _ => {
                return Err(CompileError::unsupported(format!(
                    "scanf with {} arguments",
                    args.len()
                )))
            }
        };
        if !matches!(format, "%f" | "%lf" | "%d") {
            return Err(CompileError::unsupported(format!("scanf format {:?}", format)));
        }
        let dest = self.buffer.new_register();
        self.buffer.emit(Instruction::Call {
            dest,
            ret: IrType::Double,
            callee: READ_NUMBER.to_string(),
            args: Vec::new(),
        });
        Ok(ExprContext::Value(dest.into(), SourceType::Number))
    }

    fn lower_new(&mut self, class: &str, args: &[Expr]) -> CompileResult<ExprContext> {
        let layout = self.struct_layout(class)?;
        let lowered = self.lower_args(args)?;
        let dest = self.buffer.new_register();
        self.buffer.emit(Instruction::Call {
            dest,
            ret: IrType::StructPtr(layout.name.clone()),
            callee: layout.constructor_name(),
            args: lowered,
        });
        Ok(ExprContext::Value(
            dest.into(),
            SourceType::Class(layout.name.clone()),
        ))
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    pub(super) fn lower_condition(&mut self, expr: &Expr) -> CompileResult<BoolContext> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.lower_condition(inner),
            ExprKind::Binary { op, left, right } => {
                let predicate = compare_op(*op).ok_or_else(|| {
                    CompileError::unsupported(format!("operator {} as a condition", op.symbol()))
                })?;
                let lhs = self.lower_number_operand(left)?;
                let rhs = self.lower_number_operand(right)?;
                let cond = self.buffer.new_register();
                self.buffer.emit(Instruction::Compare {
                    dest: cond,
                    op: predicate,
                    lhs,
                    rhs,
                });
                let position = self.buffer.emit(Instruction::CondBranch {
                    cond,
                    if_true: None,
                    if_false: None,
                });
                Ok(BoolContext::branch(position))
            }
            ExprKind::Logical { op, left, right } => {
                let first = self.lower_condition(left)?;
                let label = self.buffer.new_label();
                let (mut true_list, mut false_list) = match op {
                    LogicalOp::And => {
                        self.buffer.patch(&first.true_list, label)?;
                        (Vec::new(), first.false_list)
                    }
                    LogicalOp::Or => {
                        self.buffer.patch(&first.false_list, label)?;
                        (first.true_list, Vec::new())
                    }
                };
                let second = self.lower_condition(right)?;
                true_list.extend(second.true_list);
                false_list.extend(second.false_list);
                Ok(BoolContext {
                    true_list,
                    false_list,
                })
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(self.lower_condition(operand)?.negate()),
            other => Err(CompileError::unsupported(format!(
                "{} as a condition",
                other.kind_name()
            ))),
        }
    }
}
