//! Syntax tree
//!
//! The type-annotated tree handed over by the front end. Nodes the front end
//! answers queries about (expressions, identifiers, declarations) carry a
//! [`NodeId`]; everything else is plain data.

/// Stable identity of a node for front-end queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A whole source file
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

impl Module {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}

/// Top-level declaration
#[derive(Debug, Clone)]
pub enum Item {
    Function(FunctionDecl),
    Class(ClassDecl),
}

/// Identifier that the front end can classify
#[derive(Debug, Clone)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
}

/// Written type annotation
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Number,
    Boolean,
    Void,
    String,
    Named(String),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeAnnotation,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeAnnotation) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Function declaration, also used for class methods
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeAnnotation,
    pub body: Block,
}

impl FunctionDecl {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: TypeAnnotation,
        body: Block,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub members: Vec<ClassMember>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: TypeAnnotation) -> Self {
        self.members.push(ClassMember::Field(FieldDecl {
            name: name.into(),
            ty,
            init: None,
        }));
        self
    }

    pub fn field_with_init(mut self, name: impl Into<String>, ty: TypeAnnotation, init: Expr) -> Self {
        self.members.push(ClassMember::Field(FieldDecl {
            name: name.into(),
            ty,
            init: Some(init),
        }));
        self
    }

    pub fn constructor(mut self, params: Vec<Param>, body: Block) -> Self {
        self.members
            .push(ClassMember::Constructor(ConstructorDecl { params, body }));
        self
    }

    pub fn method(mut self, method: FunctionDecl) -> Self {
        self.members.push(ClassMember::Method(method));
        self
    }
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Field(FieldDecl),
    Constructor(ConstructorDecl),
    Method(FunctionDecl),
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeAnnotation,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),
    VariableDecl(VariableDecl),
    Return(Option<Expr>),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
    Block(Block),
    Break,
    Continue,
    Empty,
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expression(expr)
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return(Some(value))
    }

    pub fn block(statements: Vec<Stmt>) -> Self {
        Stmt::Block(Block::new(statements))
    }

    pub fn if_then(condition: Expr, then_branch: Stmt) -> Self {
        Stmt::If(IfStmt {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: None,
        })
    }

    pub fn if_else(condition: Expr, then_branch: Stmt, else_branch: Stmt) -> Self {
        Stmt::If(IfStmt {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        })
    }

    pub fn for_loop(init: Stmt, condition: Expr, update: Expr, body: Stmt) -> Self {
        Stmt::For(ForStmt {
            init: Some(Box::new(init)),
            condition: Some(condition),
            update: Some(update),
            body: Box::new(body),
        })
    }

    /// Short name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Expression(_) => "expression statement",
            Stmt::VariableDecl(_) => "variable declaration",
            Stmt::Return(_) => "return statement",
            Stmt::If(_) => "if statement",
            Stmt::For(_) => "for statement",
            Stmt::While(_) => "while statement",
            Stmt::Block(_) => "block",
            Stmt::Break => "break statement",
            Stmt::Continue => "continue statement",
            Stmt::Empty => "empty statement",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: Option<TypeAnnotation>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),
    This,
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Identifier,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        class: String,
        args: Vec<Expr>,
    },
    Paren(Box<Expr>),
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

impl ExprKind {
    /// Short name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprKind::Number(_) => "numeric literal",
            ExprKind::String(_) => "string literal",
            ExprKind::Boolean(_) => "boolean literal",
            ExprKind::Identifier(_) => "identifier",
            ExprKind::This => "this",
            ExprKind::Binary { .. } => "binary expression",
            ExprKind::Logical { .. } => "logical expression",
            ExprKind::Unary { .. } => "unary expression",
            ExprKind::Update { .. } => "update expression",
            ExprKind::Assign { .. } => "assignment",
            ExprKind::Member { .. } => "property access",
            ExprKind::Call { .. } => "call",
            ExprKind::New { .. } => "new expression",
            ExprKind::Paren(_) => "parenthesized expression",
            ExprKind::Conditional { .. } => "conditional expression",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

impl BinaryOp {
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::StrictEq
                | BinaryOp::StrictNe
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment applies
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
        }
    }
}
