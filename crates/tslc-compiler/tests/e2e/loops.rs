//! Loop tests
//!
//! `for` loops with declaration initializers, backpatched exits and the
//! increment block.

use super::harness::*;
use tslc_compiler::frontend::ast::*;
use tslc_compiler::ir::Instruction;
use tslc_compiler::AstBuilder;

// ============================================================================
// Factorial
// ============================================================================

#[test]
fn test_factorial_of_five() {
    let compiled = compile(&factorial_module());
    expect_number(&compiled, "fact", &[5.0], 120.0);
}

#[test]
fn test_factorial_loop_never_runs() {
    let compiled = compile(&factorial_module());
    expect_number(&compiled, "fact", &[0.0], 1.0);
    expect_number(&compiled, "fact", &[1.0], 1.0);
}

#[test]
fn test_factorial_block_structure() {
    let compiled = compile(&factorial_module());
    let body = function_body(compiled.buffer.instructions(), "fact");
    let labels = body
        .iter()
        .filter(|i| matches!(i, Instruction::Label(_)))
        .count();
    // condition, body, increment, exit
    assert_eq!(labels, 4);
    let back_edges = body
        .iter()
        .filter(|i| matches!(i, Instruction::Branch { target: Some(_) }))
        .count();
    assert_eq!(back_edges, 3);
    assert!(compiled.ir_text().contains("fcmp ole double"));
}

// ============================================================================
// Nested loops and decrement
// ============================================================================

/// ```text
/// function grid(n: number): number {
///     let count = 0;
///     for (let i = 0; i < n; i++) {
///         for (let j = n; j > 0; j--) { count += 1; }
///     }
///     return count;
/// }
/// ```
fn grid_module() -> Module {
    let mut b = AstBuilder::new();
    let zero = b.num(0.0);
    let count_decl = b.let_stmt("count", None, zero);

    let n = b.ident("n");
    let inner_init = b.let_stmt("j", None, n);
    let j = b.ident("j");
    let zero = b.num(0.0);
    let inner_cond = b.binary(BinaryOp::Gt, j, zero);
    let j = b.ident("j");
    let inner_update = b.post_dec(j);
    let count = b.ident("count");
    let one = b.num(1.0);
    let bump = b.assign_op(AssignOp::Add, count, one);
    let inner = Stmt::for_loop(
        inner_init,
        inner_cond,
        inner_update,
        Stmt::block(vec![Stmt::expr(bump)]),
    );

    let zero = b.num(0.0);
    let outer_init = b.let_stmt("i", None, zero);
    let i = b.ident("i");
    let n = b.ident("n");
    let outer_cond = b.lt(i, n);
    let i = b.ident("i");
    let outer_update = b.post_inc(i);
    let outer = Stmt::for_loop(outer_init, outer_cond, outer_update, Stmt::block(vec![inner]));

    let count = b.ident("count");
    Module::new(vec![function(
        "grid",
        vec![num("n")],
        TypeAnnotation::Number,
        vec![count_decl, outer, Stmt::ret(count)],
    )])
}

#[test]
fn test_nested_loops() {
    let compiled = compile(&grid_module());
    expect_number(&compiled, "grid", &[3.0], 9.0);
    expect_number(&compiled, "grid", &[0.0], 0.0);
}

#[test]
fn test_loop_variable_scoped_to_loop() {
    let compiled = compile(&grid_module());
    let text = compiled.ir_text();
    assert_eq!(text.matches("alloca double").count(), 3);
}

/// Loop whose body returns early: the body block ends in `ret`, so the jump to
/// the increment block is skipped.
#[test]
fn test_early_return_from_loop() {
    let mut b = AstBuilder::new();
    let zero = b.num(0.0);
    let init = b.let_stmt("i", None, zero);
    let i = b.ident("i");
    let hundred = b.num(100.0);
    let cond = b.lt(i, hundred);
    let i = b.ident("i");
    let update = b.post_inc(i);
    let i = b.ident("i");
    let limit = b.ident("limit");
    let reached = b.binary(BinaryOp::Ge, i, limit);
    let i = b.ident("i");
    let body = Stmt::block(vec![Stmt::if_then(reached, Stmt::ret(i))]);
    let minus_one = b.num(-1.0);
    let module = Module::new(vec![function(
        "firstAtLeast",
        vec![num("limit")],
        TypeAnnotation::Number,
        vec![Stmt::for_loop(init, cond, update, body), Stmt::ret(minus_one)],
    )]);

    let compiled = compile(&module);
    expect_number(&compiled, "firstAtLeast", &[7.0], 7.0);
    expect_number(&compiled, "firstAtLeast", &[500.0], -1.0);
}
