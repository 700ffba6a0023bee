//! Integration tests for dispatch and exception handling

use std::sync::Arc;

use edict_listree::NodeRef;
use edict_vm::{
    Bytecode, ExtFlags, FnType, HostReflector, NativeArg, Opcode, Outcome, Param, TypeDesc, Vm,
    VmConfig,
};

fn setup() -> (Vm, NodeRef) {
    let host = Arc::new(HostReflector::new());
    host.register(
        "inc",
        FnType::new("inc", vec![Param::new("n", TypeDesc::Int)], TypeDesc::Int),
        |args| Ok(NativeArg::Int(args[0].as_int()? + 1)),
    )
    .unwrap();
    host.register(
        "join",
        FnType::new(
            "join",
            vec![Param::new("a", TypeDesc::Bytes), Param::new("b", TypeDesc::Bytes)],
            TypeDesc::Bytes,
        ),
        |args| match (&args[0], &args[1]) {
            (NativeArg::Bytes(a), NativeArg::Bytes(b)) => Ok(NativeArg::Bytes([&a[..], b"-", b].concat())),
            _ => Ok(NativeArg::Void),
        },
    )
    .unwrap();
    let root = host.module();
    (Vm::new(host), root)
}

fn eval(source: &str) -> Outcome {
    let (mut vm, root) = setup();
    vm.evaluate(&root, source).unwrap()
}

fn exceptions(outcome: &Outcome) -> Vec<String> {
    outcome.exceptions.iter().map(|e| e.text_lossy()).collect()
}

// =============================================================================
// Literals and Bindings
// =============================================================================

#[test]
fn dup_literal_survives_buffer_drop() {
    let (mut vm, root) = setup();
    let mut code = Bytecode::new();
    code.emit_ext(b"xyz", ExtFlags::DUP)
        .unwrap()
        .emit(Opcode::PushExt)
        .emit(Opcode::Reset);
    let outcome = vm.run(&root, code.into_shared()).unwrap();
    assert_eq!(outcome.texts(), ["xyz"]);
    assert!(outcome.exceptions.is_empty());
}

#[test]
fn counter_loop_counts() {
    let (mut vm, root) = setup();
    vm.evaluate(&root, "[0] @counter").unwrap();
    for _ in 0..10 {
        let outcome = vm.evaluate(&root, "inc ( counter ) @counter").unwrap();
        assert!(outcome.stack.is_empty());
    }
    assert_eq!(vm.evaluate(&root, "counter").unwrap().texts(), ["10"]);
}

#[test]
fn scopes_build_records() {
    let (mut vm, root) = setup();
    let outcome = vm
        .evaluate(&root, "< [1] @x [2] @y %d > @point point.y point.x")
        .unwrap();
    assert_eq!(outcome.texts(), ["2", "1"]);
    assert!(!root.has_entry(b"x"));
    let point = root.peek(Some(b"point")).unwrap();
    assert!(point.has_entry(b"x"));
}

#[test]
fn call_arguments_arrive_in_order() {
    assert_eq!(eval("join ( [left] [right] )").texts(), ["left-right"]);
}

#[test]
fn text_values_evaluate_as_code() {
    assert_eq!(eval("[[a] [b] join !] @pair pair !").texts(), ["a-b"]);
}

// =============================================================================
// Exceptions
// =============================================================================

#[test]
fn catch_without_pending_exception_skips_region() {
    let outcome = eval("[a] | < [skipped] inc ( [0] ) > [b]");
    assert_eq!(outcome.texts(), ["a", "b"]);
}

#[test]
fn catch_by_identity_ignores_equal_content() {
    let outcome = eval("[boom] @err ^[boom] |err [unreached]");
    assert!(outcome.is_throwing());
    assert_eq!(exceptions(&outcome), ["boom"]);

    let outcome = eval("[boom] @err ^err |err [handled]");
    assert_eq!(outcome.texts(), ["handled"]);
    assert!(!outcome.is_throwing());
}

#[test]
fn handler_region_runs_only_when_throwing() {
    assert_eq!(eval("^[e] | < [recovered] >").texts(), ["recovered"]);
    assert_eq!(eval("| < [recovered] > [normal]").texts(), ["normal"]);
}

#[test]
fn exceptions_unwind_nested_regions() {
    let outcome = eval("< < ^[deep] [x] > [y] > %e");
    assert_eq!(outcome.texts(), ["deep"]);
    assert!(outcome.exceptions.is_empty());
}

#[test]
fn native_failures_raise_exceptions() {
    let outcome = eval("inc ( [notanumber] ) | [caught]");
    assert!(!outcome.is_throwing());
    assert_eq!(outcome.top().unwrap().text_lossy(), "caught");
}

#[test]
fn runaway_recursion_raises() {
    let host = Arc::new(HostReflector::new());
    let root = host.module();
    let mut vm = Vm::new(host).with_config(VmConfig::embedded());
    let outcome = vm.evaluate(&root, "[again !] @again again !").unwrap();
    assert!(outcome.is_throwing());
    assert!(exceptions(&outcome)[0].contains("code stack overflow"));
}
