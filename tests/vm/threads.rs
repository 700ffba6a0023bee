//! Integration tests for trees shared between threads

use std::sync::Arc;
use std::thread;

use edict_listree::{End, Node, PathCursor};
use edict_vm::{FnType, HostReflector, Param, TypeDesc, Vm, VmConfig, compile};

#[test]
fn interpreters_on_separate_threads_share_a_subtree() {
    let shared = Node::map();
    let host = Arc::new(HostReflector::new());

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let shared = shared.clone();
            let host = Arc::clone(&host);
            thread::spawn(move || {
                let root = Node::map();
                root.put(Some(b"shared"), End::Tail, shared).unwrap();
                let mut vm = Vm::new(host);
                let outcome = vm.evaluate(&root, &format!("[v{n}] @shared.t{n}")).unwrap();
                assert!(outcome.exceptions.is_empty());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for n in 0..4 {
        let mut cursor = PathCursor::parse(&format!("t{n}")).unwrap();
        let value = cursor.resolve(&shared, false).unwrap().unwrap();
        assert_eq!(value.text_lossy(), format!("v{n}"));
    }
}

#[test]
fn continuation_sees_caller_tree() {
    let host = Arc::new(HostReflector::new());
    let root = host.module();
    root.put(Some(b"greeting"), End::Tail, Node::text("hi")).unwrap();

    let mut vm = Vm::new(host.clone()).with_config(VmConfig::default().with_thread_name("greeter"));
    let ty = FnType::new("greet", vec![Param::new("who", TypeDesc::Bytes)], TypeDesc::Node);
    let closure = vm
        .continuation(compile("@who greeting").unwrap().into_shared(), &root, ty)
        .unwrap();
    root.put(Some(b"greet"), End::Tail, closure).unwrap();

    let outcome = vm.evaluate(&root, "[bob] greet !").unwrap();
    assert_eq!(outcome.texts(), ["hi"]);
    assert_eq!(root.peek(Some(b"who")).unwrap().text_lossy(), "bob");
}
