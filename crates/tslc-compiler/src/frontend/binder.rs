//! In-memory front end
//!
//! [`TypedProgram`] walks a [`Module`] once, resolves written annotations and
//! local inference (`let x = 1` is a number), classifies identifiers and
//! records the answers the lowering engine will ask for. Names that are not
//! declared anywhere in the unit are left unclassified, which the lowering
//! engine reads as an external namespace.

use super::ast::*;
use super::{ClassLayout, ClassMemberInfo, FrontEnd, MemberKind, Signature, SourceType, SymbolKind};
use crate::error::{CompileError, CompileResult};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
pub struct TypedProgram {
    classes: FxHashMap<String, ClassLayout>,
    functions: FxHashMap<String, Signature>,
    externals: FxHashMap<(String, String), Signature>,
    types: FxHashMap<NodeId, SourceType>,
    contextual: FxHashMap<NodeId, SourceType>,
    kinds: FxHashMap<NodeId, SymbolKind>,
}

impl TypedProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the signature of `namespace.member` living outside the unit
    pub fn with_external(
        mut self,
        namespace: impl Into<String>,
        member: impl Into<String>,
        signature: Signature,
    ) -> Self {
        self.externals
            .insert((namespace.into(), member.into()), signature);
        self
    }

    /// Resolve every declaration and body of `module`
    pub fn bind(mut self, module: &Module) -> CompileResult<Self> {
        self.collect_declarations(module)?;
        for item in &module.items {
            let mut binder = Binder::new(&mut self);
            match item {
                Item::Function(func) => binder.bind_function(func, None)?,
                Item::Class(class) => binder.bind_class(class)?,
            }
        }
        Ok(self)
    }

    fn collect_declarations(&mut self, module: &Module) -> CompileResult<()> {
        let class_names: FxHashSet<&str> = module
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Class(class) => Some(class.name.as_str()),
                Item::Function(_) => None,
            })
            .collect();

        for item in &module.items {
            match item {
                Item::Function(func) => {
                    let signature = signature_of(&class_names, &func.params, &func.return_type)?;
                    self.functions.insert(func.name.clone(), signature);
                }
                Item::Class(class) => {
                    let mut members = Vec::new();
                    for member in &class.members {
                        let info = match member {
                            ClassMember::Field(field) => ClassMemberInfo {
                                name: field.name.clone(),
                                kind: MemberKind::Property(resolve(&class_names, &field.ty)?),
                            },
                            ClassMember::Constructor(ctor) => ClassMemberInfo {
                                name: "constructor".to_string(),
                                kind: MemberKind::Constructor(signature_of(
                                    &class_names,
                                    &ctor.params,
                                    &TypeAnnotation::Void,
                                )?),
                            },
                            ClassMember::Method(method) => ClassMemberInfo {
                                name: method.name.clone(),
                                kind: MemberKind::Method(signature_of(
                                    &class_names,
                                    &method.params,
                                    &method.return_type,
                                )?),
                            },
                        };
                        members.push(info);
                    }
                    self.classes.insert(
                        class.name.clone(),
                        ClassLayout {
                            name: class.name.clone(),
                            members,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn resolve_annotation(&self, ann: &TypeAnnotation) -> CompileResult<SourceType> {
        match ann {
            TypeAnnotation::Named(name) if !self.classes.contains_key(name) => {
                Err(CompileError::UndefinedType { name: name.clone() })
            }
            TypeAnnotation::Named(name) => Ok(SourceType::Class(name.clone())),
            other => Ok(primitive(other)),
        }
    }
}

fn primitive(ann: &TypeAnnotation) -> SourceType {
    match ann {
        TypeAnnotation::Number => SourceType::Number,
        TypeAnnotation::Boolean => SourceType::Boolean,
        TypeAnnotation::Void => SourceType::Void,
        TypeAnnotation::String => SourceType::String,
        TypeAnnotation::Named(name) => SourceType::Class(name.clone()),
    }
}

fn resolve(classes: &FxHashSet<&str>, ann: &TypeAnnotation) -> CompileResult<SourceType> {
    if let TypeAnnotation::Named(name) = ann {
        if !classes.contains(name.as_str()) {
            return Err(CompileError::UndefinedType { name: name.clone() });
        }
    }
    Ok(primitive(ann))
}

fn signature_of(
    classes: &FxHashSet<&str>,
    params: &[Param],
    ret: &TypeAnnotation,
) -> CompileResult<Signature> {
    let params = params
        .iter()
        .map(|p| resolve(classes, &p.ty))
        .collect::<CompileResult<Vec<_>>>()?;
    Ok(Signature::new(params, resolve(classes, ret)?))
}

impl FrontEnd for TypedProgram {
    fn type_of(&self, node: NodeId) -> SourceType {
        self.types.get(&node).cloned().unwrap_or(SourceType::Any)
    }

    fn contextual_type(&self, node: NodeId) -> Option<SourceType> {
        self.contextual.get(&node).cloned()
    }

    fn classify(&self, node: NodeId) -> SymbolKind {
        self.kinds
            .get(&node)
            .copied()
            .unwrap_or(SymbolKind::Unclassified)
    }

    fn class_layout(&self, name: &str) -> Option<&ClassLayout> {
        self.classes.get(name)
    }

    fn function_signature(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }
}

/// Body walker, one per top-level item
struct Binder<'p> {
    program: &'p mut TypedProgram,
    scopes: Vec<FxHashMap<String, SourceType>>,
    return_type: SourceType,
    this_class: Option<String>,
}

impl<'p> Binder<'p> {
    fn new(program: &'p mut TypedProgram) -> Self {
        Self {
            program,
            scopes: vec![FxHashMap::default()],
            return_type: SourceType::Void,
            this_class: None,
        }
    }

    fn reset(&mut self, this_class: Option<&str>, return_type: SourceType) {
        self.scopes = vec![FxHashMap::default()];
        self.this_class = this_class.map(str::to_string);
        self.return_type = return_type;
    }

    fn declare(&mut self, name: &str, ty: SourceType) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn lookup(&self, name: &str) -> Option<&SourceType> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn record(&mut self, node: NodeId, ty: SourceType) -> SourceType {
        self.program.types.insert(node, ty.clone());
        ty
    }

    fn expect_type(&mut self, node: NodeId, ty: &SourceType) {
        if !ty.is_any() {
            self.program.contextual.insert(node, ty.clone());
        }
    }

    fn bind_params(&mut self, params: &[Param]) -> CompileResult<()> {
        for param in params {
            let ty = self.program.resolve_annotation(&param.ty)?;
            self.declare(&param.name, ty);
        }
        Ok(())
    }

    fn bind_function(&mut self, func: &FunctionDecl, this_class: Option<&str>) -> CompileResult<()> {
        let return_type = self.program.resolve_annotation(&func.return_type)?;
        self.reset(this_class, return_type);
        self.bind_params(&func.params)?;
        self.bind_block(&func.body)
    }

    fn bind_class(&mut self, class: &ClassDecl) -> CompileResult<()> {
        for member in &class.members {
            match member {
                ClassMember::Field(field) => {
                    if let Some(init) = &field.init {
                        self.reset(Some(&class.name), SourceType::Void);
                        let ty = self.program.resolve_annotation(&field.ty)?;
                        self.expect_type(init.id, &ty);
                        self.bind_expr(init)?;
                    }
                }
                ClassMember::Constructor(ctor) => {
                    self.reset(Some(&class.name), SourceType::Void);
                    self.bind_params(&ctor.params)?;
                    self.bind_block(&ctor.body)?;
                }
                ClassMember::Method(method) => self.bind_function(method, Some(&class.name))?,
            }
        }
        Ok(())
    }

    fn bind_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.statements {
            self.bind_stmt(stmt)?;
        }
        Ok(())
    }

    fn bind_scoped(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.scopes.push(FxHashMap::default());
        let result = self.bind_stmt(stmt);
        self.scopes.pop();
        result
    }

    fn bind_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.bind_expr(expr)?;
            }
            Stmt::VariableDecl(decl) => {
                let declared = match &decl.ty {
                    Some(ann) => Some(self.program.resolve_annotation(ann)?),
                    None => None,
                };
                let init_ty = match &decl.init {
                    Some(init) => {
                        if let Some(ty) = &declared {
                            self.expect_type(init.id, ty);
                        }
                        Some(self.bind_expr(init)?)
                    }
                    None => None,
                };
                let ty = declared.or(init_ty).unwrap_or(SourceType::Any);
                self.record(decl.id, ty.clone());
                self.declare(&decl.name, ty);
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    let expected = self.return_type.clone();
                    self.expect_type(value.id, &expected);
                    self.bind_expr(value)?;
                }
            }
            Stmt::If(if_stmt) => {
                self.bind_expr(&if_stmt.condition)?;
                self.bind_scoped(&if_stmt.then_branch)?;
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.bind_scoped(else_branch)?;
                }
            }
            Stmt::For(for_stmt) => {
                self.scopes.push(FxHashMap::default());
                let result = self.bind_for(for_stmt);
                self.scopes.pop();
                result?;
            }
            Stmt::While(while_stmt) => {
                self.bind_expr(&while_stmt.condition)?;
                self.bind_scoped(&while_stmt.body)?;
            }
            Stmt::Block(block) => {
                self.scopes.push(FxHashMap::default());
                let result = self.bind_block(block);
                self.scopes.pop();
                result?;
            }
            Stmt::Break | Stmt::Continue | Stmt::Empty => {}
        }
        Ok(())
    }

    fn bind_for(&mut self, for_stmt: &ForStmt) -> CompileResult<()> {
        if let Some(init) = &for_stmt.init {
            self.bind_stmt(init)?;
        }
        if let Some(condition) = &for_stmt.condition {
            self.bind_expr(condition)?;
        }
        if let Some(update) = &for_stmt.update {
            self.bind_expr(update)?;
        }
        self.bind_scoped(&for_stmt.body)
    }

    fn bind_expr(&mut self, expr: &Expr) -> CompileResult<SourceType> {
        let ty = match &expr.kind {
            ExprKind::Number(_) => SourceType::Number,
            ExprKind::String(_) => SourceType::String,
            ExprKind::Boolean(_) => SourceType::Boolean,
            ExprKind::Identifier(name) => self.bind_identifier(expr.id, name),
            ExprKind::This => match &self.this_class {
                Some(class) => {
                    self.program.kinds.insert(expr.id, SymbolKind::Variable);
                    SourceType::Class(class.clone())
                }
                None => {
                    return Err(CompileError::UndefinedVariable {
                        name: "this".to_string(),
                    })
                }
            },
            ExprKind::Binary { op, left, right } => {
                self.bind_expr(left)?;
                self.bind_expr(right)?;
                if op.is_relational() {
                    SourceType::Boolean
                } else {
                    SourceType::Number
                }
            }
            ExprKind::Logical { left, right, .. } => {
                self.bind_expr(left)?;
                self.bind_expr(right)?;
                SourceType::Boolean
            }
            ExprKind::Unary { op, operand } => {
                self.bind_expr(operand)?;
                match op {
                    UnaryOp::Not => SourceType::Boolean,
                    UnaryOp::Neg | UnaryOp::Plus | UnaryOp::BitNot => SourceType::Number,
                }
            }
            ExprKind::Update { target, .. } => {
                self.bind_expr(target)?;
                SourceType::Number
            }
            ExprKind::Assign { target, value, .. } => {
                let target_ty = self.bind_expr(target)?;
                self.expect_type(value.id, &target_ty);
                let value_ty = self.bind_expr(value)?;
                if target_ty.is_any() {
                    value_ty
                } else {
                    target_ty
                }
            }
            ExprKind::Member { object, property } => self.bind_member(object, property)?,
            ExprKind::Call { callee, args } => {
                self.bind_expr(callee)?;
                let signature = self.callee_signature(callee);
                for (index, arg) in args.iter().enumerate() {
                    if let Some(param) = signature.as_ref().and_then(|s| s.params.get(index)) {
                        self.expect_type(arg.id, param);
                    }
                    self.bind_expr(arg)?;
                }
                signature.map(|s| s.ret).unwrap_or(SourceType::Any)
            }
            ExprKind::New { class, args } => {
                let ctor = match self.program.classes.get(class) {
                    Some(layout) => layout.constructor().cloned(),
                    None => return Err(CompileError::UndefinedType { name: class.clone() }),
                };
                for (index, arg) in args.iter().enumerate() {
                    if let Some(param) = ctor.as_ref().and_then(|s| s.params.get(index)) {
                        self.expect_type(arg.id, param);
                    }
                    self.bind_expr(arg)?;
                }
                SourceType::Class(class.clone())
            }
            ExprKind::Paren(inner) => self.bind_expr(inner)?,
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.bind_expr(condition)?;
                let ty = self.bind_expr(then_expr)?;
                self.bind_expr(else_expr)?;
                ty
            }
        };
        Ok(self.record(expr.id, ty))
    }

    fn bind_identifier(&mut self, node: NodeId, name: &str) -> SourceType {
        if let Some(ty) = self.lookup(name).cloned() {
            self.program.kinds.insert(node, SymbolKind::Variable);
            ty
        } else if self.program.functions.contains_key(name) {
            self.program.kinds.insert(node, SymbolKind::Function);
            SourceType::Any
        } else {
            self.program.kinds.insert(node, SymbolKind::Unclassified);
            SourceType::Any
        }
    }

    fn bind_member(&mut self, object: &Expr, property: &Identifier) -> CompileResult<SourceType> {
        let object_ty = self.bind_expr(object)?;
        let (kind, ty) = match &object_ty {
            SourceType::Class(class) => {
                let layout = self
                    .program
                    .classes
                    .get(class)
                    .ok_or_else(|| CompileError::UndefinedType { name: class.clone() })?;
                if let Some(ty) = layout.property(&property.name) {
                    (SymbolKind::Property, ty.clone())
                } else if layout.method(&property.name).is_some() {
                    (SymbolKind::Method, SourceType::Any)
                } else {
                    return Err(CompileError::UndefinedVariable {
                        name: format!("{}.{}", class, property.name),
                    });
                }
            }
            SourceType::Any => (SymbolKind::Unclassified, SourceType::Any),
            other => {
                return Err(CompileError::unsupported(format!(
                    "property access on {}",
                    other
                )))
            }
        };
        self.program.kinds.insert(property.id, kind);
        Ok(self.record(property.id, ty))
    }

    fn callee_signature(&self, callee: &Expr) -> Option<Signature> {
        match &callee.kind {
            ExprKind::Identifier(name) => match self.program.kinds.get(&callee.id) {
                Some(SymbolKind::Function) => self.program.functions.get(name).cloned(),
                // the runtime reader: `scanf("%d")` yields a number
                Some(SymbolKind::Unclassified) if name == "scanf" => Some(Signature::new(
                    vec![SourceType::String],
                    SourceType::Number,
                )),
                _ => None,
            },
            ExprKind::Member { object, property } => match self.program.types.get(&object.id) {
                Some(SourceType::Class(class)) => self
                    .program
                    .classes
                    .get(class)?
                    .method(&property.name)
                    .cloned(),
                Some(SourceType::Any) => match &object.kind {
                    ExprKind::Identifier(namespace) => self
                        .program
                        .externals
                        .get(&(namespace.clone(), property.name.clone()))
                        .cloned(),
                    _ => None,
                },
                _ => None,
            },
            ExprKind::Paren(inner) => self.callee_signature(inner),
            _ => None,
        }
    }
}
