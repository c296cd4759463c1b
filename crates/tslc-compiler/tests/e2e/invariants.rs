//! Structural invariant tests
//!
//! Properties every lowered unit must have regardless of the program:
//! registers defined once and in order, labels unique, every branch resolved
//! to a label of its own function, and well-formed basic blocks.

use std::collections::HashSet;

use super::harness::*;
use tslc_compiler::frontend::ast::*;
use tslc_compiler::ir::{Instruction, Label};
use tslc_compiler::{AstBuilder, CompileOptions, CompiledModule, Compiler, TypedProgram};

/// ```text
/// function clamp(x: number, lo: number, hi: number): number {
///     let r = x;
///     if (x < lo) { r = lo; } else if (x > hi) { r = hi; } else { r = x; }
///     return r;
/// }
/// ```
fn clamp_module() -> Module {
    let mut b = AstBuilder::new();
    let x = b.ident("x");
    let decl = b.let_stmt("r", None, x);

    let x = b.ident("x");
    let lo = b.ident("lo");
    let below = b.lt(x, lo);
    let r = b.ident("r");
    let lo = b.ident("lo");
    let set_lo = b.assign(r, lo);

    let x = b.ident("x");
    let hi = b.ident("hi");
    let above = b.binary(BinaryOp::Gt, x, hi);
    let r = b.ident("r");
    let hi = b.ident("hi");
    let set_hi = b.assign(r, hi);

    let r = b.ident("r");
    let x = b.ident("x");
    let keep = b.assign(r, x);

    let inner = Stmt::if_else(
        above,
        Stmt::block(vec![Stmt::expr(set_hi)]),
        Stmt::block(vec![Stmt::expr(keep)]),
    );
    let outer = Stmt::if_else(below, Stmt::block(vec![Stmt::expr(set_lo)]), inner);
    let r = b.ident("r");
    Module::new(vec![function(
        "clamp",
        vec![num("x"), num("lo"), num("hi")],
        TypeAnnotation::Number,
        vec![decl, outer, Stmt::ret(r)],
    )])
}

fn programs() -> Vec<(&'static str, CompiledModule)> {
    vec![
        ("factorial", compile(&factorial_module())),
        ("point", compile(&point_module())),
        ("clamp", compile(&clamp_module())),
    ]
}

fn function_names(code: &[Instruction]) -> Vec<String> {
    code.iter()
        .filter_map(|i| match i {
            Instruction::FunctionBegin { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn branch_targets(instr: &Instruction) -> Vec<Option<Label>> {
    match instr {
        Instruction::Branch { target } => vec![*target],
        Instruction::CondBranch {
            if_true, if_false, ..
        } => vec![*if_true, *if_false],
        _ => vec![],
    }
}

/// Register names `%rN` used anywhere in a line
fn register_uses(line: &str) -> Vec<String> {
    let mut uses = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find("%r") {
        let digits: String = rest[start + 2..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if !digits.is_empty() {
            uses.push(format!("%r{}", digits));
        }
        rest = &rest[start + 2 + digits.len()..];
    }
    uses
}

#[test]
fn test_registers_consecutive_across_unit() {
    for (name, compiled) in programs() {
        let registers: Vec<u32> = defined_registers(compiled.buffer.instructions())
            .iter()
            .map(|r| r.as_u32())
            .collect();
        let expected: Vec<u32> = (1..=registers.len() as u32).collect();
        assert_eq!(registers, expected, "{}", name);
    }
}

#[test]
fn test_every_used_register_is_defined_once() {
    for (name, compiled) in programs() {
        let text = compiled.ir_text();
        let mut defined = HashSet::new();
        for line in text.lines() {
            if let Some((lhs, _)) = line.trim_start().split_once(" = ") {
                if lhs.starts_with("%r") {
                    assert!(defined.insert(lhs.to_string()), "{}: {} redefined", name, lhs);
                }
            }
        }
        for line in text.lines() {
            for used in register_uses(line) {
                assert!(defined.contains(&used), "{}: {} never defined", name, used);
            }
        }
    }
}

#[test]
fn test_labels_unique_and_in_order() {
    for (name, compiled) in programs() {
        let labels: Vec<u32> = compiled
            .buffer
            .instructions()
            .iter()
            .filter_map(|i| match i {
                Instruction::Label(label) => Some(label.as_u32()),
                _ => None,
            })
            .collect();
        let expected: Vec<u32> = (0..labels.len() as u32).collect();
        assert_eq!(labels, expected, "{}", name);
    }
}

#[test]
fn test_branches_resolved_within_their_function() {
    for (name, compiled) in programs() {
        let code = compiled.buffer.instructions();
        for function in function_names(code) {
            let body = function_body(code, &function);
            let defined: HashSet<Label> = body
                .iter()
                .filter_map(|i| match i {
                    Instruction::Label(label) => Some(*label),
                    _ => None,
                })
                .collect();
            for target in body.iter().flat_map(branch_targets) {
                let target = target.unwrap_or_else(|| panic!("{}::{} has an open branch", name, function));
                assert!(
                    defined.contains(&target),
                    "{}::{} jumps to {} outside the function",
                    name,
                    function,
                    target
                );
            }
        }
    }
}

#[test]
fn test_basic_blocks_well_formed() {
    for (name, compiled) in programs() {
        let code = compiled.buffer.instructions();
        for function in function_names(code) {
            let body = function_body(code, &function);
            for pair in body.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                match next {
                    Instruction::Label(_) => assert!(
                        prev.is_terminator() || matches!(prev, Instruction::FunctionBegin { .. }),
                        "{}::{}: {} falls into {}",
                        name,
                        function,
                        prev,
                        next
                    ),
                    Instruction::FunctionEnd => assert!(
                        prev.is_terminator(),
                        "{}::{} ends with {}",
                        name,
                        function,
                        prev
                    ),
                    _ => assert!(
                        !prev.is_terminator(),
                        "{}::{}: {} follows {}",
                        name,
                        function,
                        next,
                        prev
                    ),
                }
            }
        }
    }
}

#[test]
fn test_field_indices_consistent() {
    let compiled = compile(&point_module());
    let code = compiled.buffer.instructions();
    let indices = |function: &str| -> Vec<u32> {
        function_body(code, function)
            .iter()
            .filter_map(|i| match i {
                Instruction::FieldAddress { class, index, .. } if class == "P" => Some(*index),
                _ => None,
            })
            .collect()
    };

    assert_eq!(indices("get_x_P"), vec![0]);
    assert_eq!(indices("set_x_P"), vec![0]);
    assert_eq!(indices("get_y_P"), vec![1]);
    assert_eq!(indices("set_y_P"), vec![1]);
    // this.x = v; this.y = v + 1
    assert_eq!(indices("P_constructor"), vec![0, 1]);
    // this.x + this.y + k
    assert_eq!(indices("P_sum"), vec![0, 1]);
    assert_eq!(indices("make"), vec![0]);

    let class = compiled.manifest.class("P").unwrap();
    for field in &class.fields {
        assert_eq!(indices(field.getter.as_str()), vec![field.index]);
    }
}

#[test]
fn test_clamp_values() {
    let compiled = compile(&clamp_module());
    expect_number(&compiled, "clamp", &[-5.0, 0.0, 10.0], 0.0);
    expect_number(&compiled, "clamp", &[15.0, 0.0, 10.0], 10.0);
    expect_number(&compiled, "clamp", &[3.5, 0.0, 10.0], 3.5);
}

#[test]
fn test_fallthrough_branches_optional() {
    let module = clamp_module();
    let program = TypedProgram::new().bind(&module).unwrap();
    let with = compile(&module);
    let options = CompileOptions {
        fallthrough_branches: false,
        ..CompileOptions::default()
    };
    let without = Compiler::new(&program, options).compile(&module).unwrap();

    let jumps = |compiled: &CompiledModule| {
        compiled
            .buffer
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::Branch { .. }))
            .count()
    };
    assert!(jumps(&without) < jumps(&with));
    // labels are still allocated the same way
    assert_eq!(
        without.buffer.instructions().iter().filter(|i| matches!(i, Instruction::Label(_))).count(),
        with.buffer.instructions().iter().filter(|i| matches!(i, Instruction::Label(_))).count()
    );
    expect_number(&without, "clamp", &[15.0, 0.0, 10.0], 10.0);
    expect_number(&without, "clamp", &[3.5, 0.0, 10.0], 3.5);
}
