//! Import tests
//!
//! Calls through names the unit never declares become calls to external
//! functions, each declared exactly once.

use super::harness::*;
use tslc_compiler::frontend::ast::*;
use tslc_compiler::{
    AstBuilder, CompileError, Interpreter, Signature, SourceType, TypedProgram, Value,
};

fn ns_f() -> TypedProgram {
    TypedProgram::new().with_external(
        "ns",
        "f",
        Signature::new(vec![SourceType::Number], SourceType::Number),
    )
}

/// `ns.f(<value>)`
fn call_ns(b: &mut AstBuilder, member: &str, args: Vec<Expr>) -> Expr {
    let ns = b.ident("ns");
    b.method_call(ns, member, args)
}

/// ```text
/// function both(): number { return ns.f(1) + ns.f(2); }
/// function again(a: number): number { return ns.f(a); }
/// ```
fn repeated_module() -> Module {
    let mut b = AstBuilder::new();
    let one = b.num(1.0);
    let first = call_ns(&mut b, "f", vec![one]);
    let two = b.num(2.0);
    let second = call_ns(&mut b, "f", vec![two]);
    let sum = b.add(first, second);
    let both = function("both", vec![], TypeAnnotation::Number, vec![Stmt::ret(sum)]);

    let a = b.ident("a");
    let call = call_ns(&mut b, "f", vec![a]);
    let again = function("again", vec![num("a")], TypeAnnotation::Number, vec![Stmt::ret(call)]);
    Module::new(vec![both, again])
}

#[test]
fn test_import_declared_once() {
    let compiled = compile_program(ns_f(), &repeated_module());
    let text = compiled.ir_text();
    assert_eq!(text.matches("declare double @ns_f(double)").count(), 1);
    assert_eq!(text.matches("call double (double) @ns_f(double").count(), 3);

    let imports: Vec<String> = compiled
        .buffer
        .declarations()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(imports, vec!["declare double @ns_f(double)"]);
    assert_eq!(compiled.manifest.imports.len(), 1);
    assert_eq!(compiled.manifest.imports[0].name, "ns_f");
}

#[test]
fn test_import_declaration_follows_runtime_primitives() {
    let compiled = compile_program(ns_f(), &repeated_module());
    let text = compiled.ir_text();
    let header: Vec<&str> = text.lines().take(7).collect();
    assert_eq!(
        header,
        vec![
            "; ModuleID = 'main'",
            "declare double @scand()",
            "declare void @printd(double)",
            "declare void @prints(i8*)",
            "declare i8* @malloc(i32)",
            "declare double @ns_f(double)",
            "",
        ]
    );
}

#[test]
fn test_imported_call_evaluates_through_host() {
    let compiled = compile_program(ns_f(), &repeated_module());
    let mut interp = Interpreter::new(&compiled.buffer).with_import("ns_f", |args| {
        Value::Number(args[0].as_number().unwrap_or(f64::NAN) * 10.0)
    });
    assert_eq!(interp.call("both", &[]).unwrap(), Value::Number(30.0));
    assert_eq!(
        interp.call("again", &numbers(&[0.5])).unwrap(),
        Value::Number(5.0)
    );
}

#[test]
fn test_unknown_signature_in_statement_position_is_void() {
    // function g(): void { ns.f(1); }
    let mut b = AstBuilder::new();
    let one = b.num(1.0);
    let call = call_ns(&mut b, "f", vec![one]);
    let module = Module::new(vec![function("g", vec![], TypeAnnotation::Void, vec![Stmt::expr(call)])]);

    let compiled = compile(&module);
    let text = compiled.ir_text();
    assert!(text.contains("declare void @ns_f(double)"));
    assert!(text.contains("  call void (double) @ns_f(double %r1)\n"));
    assert_eq!(compiled.manifest.imports[0].ret, "void");
}

#[test]
fn test_unknown_signature_takes_contextual_type() {
    // function h(): number { let y: number = ns.f(1); return y; }
    let mut b = AstBuilder::new();
    let one = b.num(1.0);
    let call = call_ns(&mut b, "f", vec![one]);
    let decl = b.let_stmt("y", Some(TypeAnnotation::Number), call);
    let y = b.ident("y");
    let module = Module::new(vec![function(
        "h",
        vec![],
        TypeAnnotation::Number,
        vec![decl, Stmt::ret(y)],
    )]);

    let compiled = compile(&module);
    assert!(compiled.ir_text().contains("declare double @ns_f(double)"));
    let mut interp = Interpreter::new(&compiled.buffer).with_import("ns_f", |_| Value::Number(4.0));
    assert_eq!(interp.call("h", &[]).unwrap(), Value::Number(4.0));
}

#[test]
fn test_nested_imports_declared_in_first_use_order() {
    // function k(): number { return ns.f(ns.g()); }
    let mut b = AstBuilder::new();
    let inner = call_ns(&mut b, "g", vec![]);
    let outer = call_ns(&mut b, "f", vec![inner]);
    let module = Module::new(vec![function("k", vec![], TypeAnnotation::Number, vec![Stmt::ret(outer)])]);

    let compiled = compile_program(ns_f(), &module);
    let imports: Vec<String> = compiled
        .buffer
        .declarations()
        .iter()
        .map(ToString::to_string)
        .collect();
    // ns.g has no signature; its value is expected to be ns.f's parameter
    assert_eq!(
        imports,
        vec!["declare double @ns_g()", "declare double @ns_f(double)"]
    );
}

#[test]
fn test_void_import_result_rejected_as_argument() {
    // function k(): void { ns.f(ns.g()); } with neither signature known
    let mut b = AstBuilder::new();
    let inner = call_ns(&mut b, "g", vec![]);
    let outer = call_ns(&mut b, "f", vec![inner]);
    let module = Module::new(vec![function("k", vec![], TypeAnnotation::Void, vec![Stmt::expr(outer)])]);

    let err = compile_err(&module);
    assert!(matches!(err, CompileError::Unsupported { .. }), "{:?}", err);
}

#[test]
fn test_local_function_is_not_an_import() {
    // function ns(): number { return 1; }  function user(): number { return ns(); }
    let mut b = AstBuilder::new();
    let one = b.num(1.0);
    let ns = function("ns", vec![], TypeAnnotation::Number, vec![Stmt::ret(one)]);
    let callee = b.ident("ns");
    let call = b.call(callee, vec![]);
    let user = function("user", vec![], TypeAnnotation::Number, vec![Stmt::ret(call)]);

    let compiled = compile(&Module::new(vec![ns, user]));
    assert!(compiled.buffer.declarations().is_empty());
    expect_number(&compiled, "user", &[], 1.0);
}
