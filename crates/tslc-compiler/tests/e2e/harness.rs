//! Test harness for end-to-end lowering and evaluation
//!
//! Builds modules with `AstBuilder`, resolves them with `TypedProgram`, lowers
//! them and runs the result on the reference evaluator.

#![allow(dead_code)]

use tslc_compiler::frontend::ast::*;
use tslc_compiler::ir::{Instruction, Register};
use tslc_compiler::{
    AstBuilder, CompileError, CompileOptions, CompiledModule, Compiler, Interpreter, TypedProgram,
    Value,
};

pub fn compile_program(program: TypedProgram, module: &Module) -> CompiledModule {
    let program = program.bind(module).expect("front end failed");
    Compiler::new(&program, CompileOptions::default())
        .compile(module)
        .expect("lowering failed")
}

pub fn compile(module: &Module) -> CompiledModule {
    compile_program(TypedProgram::new(), module)
}

pub fn compile_err(module: &Module) -> CompileError {
    let program = TypedProgram::new().bind(module).expect("front end failed");
    match Compiler::new(&program, CompileOptions::default()).compile(module) {
        Ok(compiled) => panic!("expected failure, got:\n{}", compiled.ir_text()),
        Err(err) => err,
    }
}

pub fn numbers(args: &[f64]) -> Vec<Value> {
    args.iter().map(|n| Value::Number(*n)).collect()
}

pub fn run(compiled: &CompiledModule, function: &str, args: &[f64]) -> Value {
    Interpreter::new(&compiled.buffer)
        .call(function, &numbers(args))
        .unwrap_or_else(|e| panic!("{} failed: {}\n{}", function, e, compiled.ir_text()))
}

pub fn expect_number(compiled: &CompiledModule, function: &str, args: &[f64], expected: f64) {
    assert_eq!(
        run(compiled, function, args),
        Value::Number(expected),
        "{}({:?})",
        function,
        args
    );
}

pub fn num(name: &str) -> Param {
    Param::new(name, TypeAnnotation::Number)
}

pub fn function(name: &str, params: Vec<Param>, ret: TypeAnnotation, body: Vec<Stmt>) -> Item {
    Item::Function(FunctionDecl::new(name, params, ret, Block::new(body)))
}

/// Instructions of `name`, from its `define` line to its closing brace
pub fn function_body<'c>(code: &'c [Instruction], name: &str) -> &'c [Instruction] {
    let start = code
        .iter()
        .position(|i| matches!(i, Instruction::FunctionBegin { name: n, .. } if n == name))
        .unwrap_or_else(|| panic!("no function {}", name));
    let len = code[start..]
        .iter()
        .position(|i| matches!(i, Instruction::FunctionEnd))
        .expect("unterminated function");
    &code[start..=start + len]
}

pub fn defined_registers(code: &[Instruction]) -> Vec<Register> {
    code.iter().filter_map(Instruction::dest).collect()
}

// ============================================================================
// Shared programs
// ============================================================================

/// ```text
/// function fact(n: number): number {
///     let result = 1;
///     for (let i = 2; i <= n; i++) { result = result * i; }
///     return result;
/// }
/// ```
pub fn factorial_module() -> Module {
    let mut b = AstBuilder::new();
    let one = b.num(1.0);
    let result_decl = b.let_stmt("result", None, one);

    let two = b.num(2.0);
    let init = b.let_stmt("i", None, two);
    let i = b.ident("i");
    let n = b.ident("n");
    let cond = b.le(i, n);
    let i = b.ident("i");
    let update = b.post_inc(i);
    let result = b.ident("result");
    let i = b.ident("i");
    let product = b.mul(result, i);
    let target = b.ident("result");
    let assign = b.assign(target, product);
    let body = Stmt::block(vec![Stmt::expr(assign)]);
    let for_stmt = Stmt::for_loop(init, cond, update, body);

    let result = b.ident("result");
    Module::new(vec![function(
        "fact",
        vec![num("n")],
        TypeAnnotation::Number,
        vec![result_decl, for_stmt, Stmt::ret(result)],
    )])
}

/// ```text
/// class P {
///     x: number;
///     y: number;
///     constructor(v: number) { this.x = v; this.y = v + 1; }
///     getX(): number { return this.x; }
///     sum(k: number): number { return this.x + this.y + k; }
/// }
/// function make(v: number): number { let p = new P(v); return p.x; }
/// function viaMethod(v: number): number { let p = new P(v); return p.getX(); }
/// function total(v: number, k: number): number { let p = new P(v); return p.sum(k); }
/// ```
pub fn point_module() -> Module {
    let mut b = AstBuilder::new();

    let this = b.this();
    let this_x = b.member(this, "x");
    let v = b.ident("v");
    let set_x = b.assign(this_x, v);
    let this = b.this();
    let this_y = b.member(this, "y");
    let v = b.ident("v");
    let one = b.num(1.0);
    let v_plus_one = b.add(v, one);
    let set_y = b.assign(this_y, v_plus_one);

    let this = b.this();
    let this_x = b.member(this, "x");
    let get_x = FunctionDecl::new(
        "getX",
        vec![],
        TypeAnnotation::Number,
        Block::new(vec![Stmt::ret(this_x)]),
    );

    let this = b.this();
    let this_x = b.member(this, "x");
    let this = b.this();
    let this_y = b.member(this, "y");
    let xy = b.add(this_x, this_y);
    let k = b.ident("k");
    let total = b.add(xy, k);
    let sum = FunctionDecl::new(
        "sum",
        vec![num("k")],
        TypeAnnotation::Number,
        Block::new(vec![Stmt::ret(total)]),
    );

    let class = ClassDecl::new("P")
        .field("x", TypeAnnotation::Number)
        .field("y", TypeAnnotation::Number)
        .constructor(
            vec![num("v")],
            Block::new(vec![Stmt::expr(set_x), Stmt::expr(set_y)]),
        )
        .method(get_x)
        .method(sum);

    let v = b.ident("v");
    let created = b.new_object("P", vec![v]);
    let decl = b.let_stmt("p", None, created);
    let p = b.ident("p");
    let p_x = b.member(p, "x");
    let make = function("make", vec![num("v")], TypeAnnotation::Number, vec![decl, Stmt::ret(p_x)]);

    let v = b.ident("v");
    let created = b.new_object("P", vec![v]);
    let decl = b.let_stmt("p", None, created);
    let p = b.ident("p");
    let call = b.method_call(p, "getX", vec![]);
    let via_method = function(
        "viaMethod",
        vec![num("v")],
        TypeAnnotation::Number,
        vec![decl, Stmt::ret(call)],
    );

    let v = b.ident("v");
    let created = b.new_object("P", vec![v]);
    let decl = b.let_stmt("p", None, created);
    let p = b.ident("p");
    let k = b.ident("k");
    let call = b.method_call(p, "sum", vec![k]);
    let total = function(
        "total",
        vec![num("v"), num("k")],
        TypeAnnotation::Number,
        vec![decl, Stmt::ret(call)],
    );

    Module::new(vec![Item::Class(class), make, via_method, total])
}
