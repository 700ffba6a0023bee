//! Integration tests for the bytecode format

use std::sync::Arc;

use edict_foundation::ErrorKind;
use edict_vm::{Bytecode, Decoder, ExtFlags, HostReflector, Opcode, Vm, VmState, compile};

#[test]
fn compiled_programs_decode_cleanly() {
    let code = compile("[0] @n < inc ( n ) @n > ^[e] |[e] %d =d # done").unwrap();
    let ops: Vec<Opcode> = Decoder::new(code.as_bytes()).map(|i| i.unwrap().op).collect();
    assert!(ops.contains(&Opcode::CtxPush));
    assert!(ops.contains(&Opcode::FunEval));
    assert!(ops.contains(&Opcode::Catch));
    assert!(ops.contains(&Opcode::S2D));
    assert_eq!(ops.last(), Some(&Opcode::S2D));
}

#[test]
fn ext_payload_is_addressable() {
    let mut code = Bytecode::new();
    code.emit_ext(b"hello", ExtFlags::BINARY).unwrap().emit(Opcode::PushExt);
    let bytes = code.as_bytes();
    let first = Decoder::new(bytes).next().unwrap().unwrap();
    let ext = first.ext.unwrap();
    assert_eq!(&bytes[ext.range], b"hello");
    assert!(ext.flags.contains(ExtFlags::BINARY));
}

#[test]
fn appended_buffers_run_in_sequence() {
    let mut a = compile("[one]").unwrap();
    let b = compile("[two]").unwrap();
    a.append(&b);
    let host = Arc::new(HostReflector::new());
    let root = host.module();
    let outcome = Vm::new(host).run(&root, a.into_shared()).unwrap();
    assert_eq!(outcome.texts(), ["one", "two"]);
}

#[test]
fn unknown_opcodes_abort_with_error_state() {
    let host = Arc::new(HostReflector::new());
    let root = host.module();
    let mut vm = Vm::new(host);
    let err = vm.run(&root, Arc::from(vec![0xee_u8])).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownOpcode(0xee)));
    assert_eq!(vm.evaluate(&root, "[ok]").unwrap().texts(), ["ok"]);
}

#[test]
fn truncated_ext_is_malformed() {
    let mut code = Bytecode::new();
    code.emit_ext(b"abcdef", ExtFlags::NONE).unwrap();
    let mut bytes = code.as_bytes().to_vec();
    bytes.truncate(bytes.len() - 2);
    let err = Decoder::new(&bytes).next().unwrap().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedBytecode { offset: 0, .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn finished_runs_report_complete() {
    let host = Arc::new(HostReflector::new());
    let root = host.module();
    let outcome = Vm::new(host).evaluate(&root, "[x]").unwrap();
    assert!(outcome.state.contains(VmState::COMPLETE));
    assert!(!outcome.state.contains(VmState::ERROR));
}
