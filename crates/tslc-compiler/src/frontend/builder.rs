//! Syntax tree builder
//!
//! Hands out fresh [`NodeId`]s so trees built in code can be queried through a
//! front end exactly like parsed ones.

use super::ast::*;

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
        }
    }

    pub fn ident_node(&mut self, name: &str) -> Identifier {
        Identifier {
            id: self.next_id(),
            name: name.to_string(),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn num(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Number(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::String(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Boolean(value))
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Identifier(name.to_string()))
    }

    pub fn this(&mut self) -> Expr {
        self.expr(ExprKind::This)
    }

    pub fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn add(&mut self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Add, left, right)
    }

    pub fn sub(&mut self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(&mut self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Mul, left, right)
    }

    pub fn lt(&mut self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Lt, left, right)
    }

    pub fn le(&mut self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Le, left, right)
    }

    pub fn logical(&mut self, op: LogicalOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn not(&mut self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn neg(&mut self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Neg, operand)
    }

    pub fn update(&mut self, op: UpdateOp, prefix: bool, target: Expr) -> Expr {
        self.expr(ExprKind::Update {
            op,
            prefix,
            target: Box::new(target),
        })
    }

    pub fn post_inc(&mut self, target: Expr) -> Expr {
        self.update(UpdateOp::Increment, false, target)
    }

    pub fn post_dec(&mut self, target: Expr) -> Expr {
        self.update(UpdateOp::Decrement, false, target)
    }

    pub fn assign_op(&mut self, op: AssignOp, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.assign_op(AssignOp::Assign, target, value)
    }

    pub fn member(&mut self, object: Expr, property: &str) -> Expr {
        let property = self.ident_node(property);
        self.expr(ExprKind::Member {
            object: Box::new(object),
            property,
        })
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    /// `object.method(args)`
    pub fn method_call(&mut self, object: Expr, method: &str, args: Vec<Expr>) -> Expr {
        let callee = self.member(object, method);
        self.call(callee, args)
    }

    pub fn new_object(&mut self, class: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::New {
            class: class.to_string(),
            args,
        })
    }

    pub fn paren(&mut self, inner: Expr) -> Expr {
        self.expr(ExprKind::Paren(Box::new(inner)))
    }

    pub fn conditional(&mut self, condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        self.expr(ExprKind::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// `let name[: ty] = init;`
    pub fn let_stmt(&mut self, name: &str, ty: Option<TypeAnnotation>, init: Expr) -> Stmt {
        Stmt::VariableDecl(VariableDecl {
            id: self.next_id(),
            name: name.to_string(),
            ty,
            init: Some(init),
        })
    }

    /// `let name: ty;`
    pub fn declare(&mut self, name: &str, ty: TypeAnnotation) -> Stmt {
        Stmt::VariableDecl(VariableDecl {
            id: self.next_id(),
            name: name.to_string(),
            ty: Some(ty),
            init: None,
        })
    }
}
