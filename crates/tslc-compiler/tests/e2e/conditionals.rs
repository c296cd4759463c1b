//! Conditional tests
//!
//! `if`/`else`, comparison predicates and short-circuit conditions.

use std::cell::Cell;
use std::rc::Rc;

use super::harness::*;
use tslc_compiler::frontend::ast::*;
use tslc_compiler::ir::{Instruction, Label};
use tslc_compiler::{AstBuilder, Interpreter, Signature, SourceType, TypedProgram, Value};

/// ```text
/// function pick(a: number, b: number): number {
///     let r = 0;
///     if (a < b) { r = 1; } else { r = 2; }
///     return r;
/// }
/// ```
fn pick_module(condition: impl FnOnce(&mut AstBuilder) -> Expr) -> Module {
    let mut b = AstBuilder::new();
    let zero = b.num(0.0);
    let decl = b.let_stmt("r", None, zero);
    let cond = condition(&mut b);
    let r = b.ident("r");
    let one = b.num(1.0);
    let then_assign = b.assign(r, one);
    let r = b.ident("r");
    let two = b.num(2.0);
    let else_assign = b.assign(r, two);
    let r = b.ident("r");
    Module::new(vec![function(
        "pick",
        vec![num("a"), num("b"), num("c")],
        TypeAnnotation::Number,
        vec![
            decl,
            Stmt::if_else(
                cond,
                Stmt::block(vec![Stmt::expr(then_assign)]),
                Stmt::block(vec![Stmt::expr(else_assign)]),
            ),
            Stmt::ret(r),
        ],
    )])
}

fn a_lt_b(b: &mut AstBuilder) -> Expr {
    let a = b.ident("a");
    let bb = b.ident("b");
    b.lt(a, bb)
}

fn labels_in(code: &[Instruction]) -> Vec<Label> {
    code.iter()
        .filter_map(|i| match i {
            Instruction::Label(label) => Some(*label),
            _ => None,
        })
        .collect()
}

#[test]
fn test_if_else_values() {
    let compiled = compile(&pick_module(a_lt_b));
    expect_number(&compiled, "pick", &[1.0, 2.0, 0.0], 1.0);
    expect_number(&compiled, "pick", &[2.0, 1.0, 0.0], 2.0);
    expect_number(&compiled, "pick", &[2.0, 2.0, 0.0], 2.0);
}

#[test]
fn test_if_else_shape() {
    let compiled = compile(&pick_module(a_lt_b));
    let body = function_body(compiled.buffer.instructions(), "pick");

    let compares = body
        .iter()
        .filter(|i| matches!(i, Instruction::Compare { .. }))
        .count();
    assert_eq!(compares, 1);

    let branches: Vec<_> = body
        .iter()
        .filter_map(|i| match i {
            Instruction::CondBranch {
                if_true, if_false, ..
            } => Some((*if_true, *if_false)),
            _ => None,
        })
        .collect();
    assert_eq!(branches.len(), 1);

    // then, else, and the join point of the following `return`
    let labels = labels_in(body);
    assert_eq!(labels.len(), 3);
    assert_eq!(branches[0], (Some(labels[0]), Some(labels[1])));
    assert_ne!(labels[0], labels[1]);
}

#[test]
fn test_then_branch_skips_else() {
    let compiled = compile(&pick_module(a_lt_b));
    let body = function_body(compiled.buffer.instructions(), "pick");
    let labels = labels_in(body);
    let else_at = body
        .iter()
        .position(|i| *i == Instruction::Label(labels[1]))
        .unwrap();
    assert_eq!(
        body[else_at - 1],
        Instruction::Branch {
            target: Some(labels[2])
        }
    );
}

#[test]
fn test_predicates() {
    let cases: [(BinaryOp, &str, [f64; 2], f64); 6] = [
        (BinaryOp::Lt, "olt", [1.0, 1.0], 2.0),
        (BinaryOp::Le, "ole", [1.0, 1.0], 1.0),
        (BinaryOp::Gt, "ogt", [3.0, 1.0], 1.0),
        (BinaryOp::Ge, "oge", [0.0, 1.0], 2.0),
        (BinaryOp::StrictEq, "oeq", [4.0, 4.0], 1.0),
        (BinaryOp::StrictNe, "one", [4.0, 4.0], 2.0),
    ];
    for (op, predicate, [a, b], expected) in cases {
        let module = pick_module(|builder| {
            let a = builder.ident("a");
            let b = builder.ident("b");
            builder.binary(op, a, b)
        });
        let compiled = compile(&module);
        assert!(
            compiled.ir_text().contains(&format!("fcmp {} double", predicate)),
            "{:?}",
            op
        );
        expect_number(&compiled, "pick", &[a, b, 0.0], expected);
    }
}

// ============================================================================
// Short-circuit conditions
// ============================================================================

#[test]
fn test_logical_and() {
    // a < b && b < c
    let compiled = compile(&pick_module(|b| {
        let first = a_lt_b(b);
        let bb = b.ident("b");
        let c = b.ident("c");
        let second = b.lt(bb, c);
        b.logical(LogicalOp::And, first, second)
    }));
    expect_number(&compiled, "pick", &[1.0, 2.0, 3.0], 1.0);
    expect_number(&compiled, "pick", &[1.0, 2.0, 2.0], 2.0);
    expect_number(&compiled, "pick", &[3.0, 2.0, 9.0], 2.0);
}

#[test]
fn test_logical_or_with_not() {
    // !(a < b) || b < c
    let compiled = compile(&pick_module(|b| {
        let first = a_lt_b(b);
        let first = b.paren(first);
        let negated = b.not(first);
        let bb = b.ident("b");
        let c = b.ident("c");
        let second = b.lt(bb, c);
        b.logical(LogicalOp::Or, negated, second)
    }));
    expect_number(&compiled, "pick", &[5.0, 2.0, 0.0], 1.0);
    expect_number(&compiled, "pick", &[1.0, 2.0, 3.0], 1.0);
    expect_number(&compiled, "pick", &[1.0, 2.0, 0.0], 2.0);
}

#[test]
fn test_short_circuit_skips_second_operand() {
    // ns.check() is only reached when a < b
    let module = pick_module(|b| {
        let first = a_lt_b(b);
        let ns = b.ident("ns");
        let check = b.method_call(ns, "check", vec![]);
        let zero = b.num(0.0);
        let second = b.lt(check, zero);
        b.logical(LogicalOp::And, first, second)
    });
    let program = TypedProgram::new().with_external(
        "ns",
        "check",
        Signature::new(vec![], SourceType::Number),
    );
    let compiled = compile_program(program, &module);

    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let mut interp = Interpreter::new(&compiled.buffer).with_import("ns_check", move |_| {
        seen.set(seen.get() + 1);
        Value::Number(-1.0)
    });
    let result = interp.call("pick", &numbers(&[5.0, 1.0, 0.0])).unwrap();
    assert_eq!(result, Value::Number(2.0));
    assert_eq!(calls.get(), 0);
    let result = interp.call("pick", &numbers(&[1.0, 5.0, 0.0])).unwrap();
    assert_eq!(result, Value::Number(1.0));
    assert_eq!(calls.get(), 1);
}
