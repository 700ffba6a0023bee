//! End-to-end scripts run through the runtime

use edict::runtime::{CliConfig, Output, Runtime};
use edict::vm::VmState;

fn runtime() -> Runtime {
    Runtime::with_output(&CliConfig::default(), Output::captured()).unwrap()
}

// =============================================================================
// Scripts
// =============================================================================

#[test]
fn counter_script_prints_each_step() {
    let mut rt = runtime();
    let script = "[0] @counter\n".to_string()
        + &"add ( counter [1] ) @counter counter print !\n".repeat(3);
    let outcome = rt.run(&script).unwrap();
    assert!(outcome.stack.is_empty());
    assert!(outcome.state.contains(VmState::COMPLETE));
    assert_eq!(rt.output().transcript().unwrap(), "1\n2\n3\n");
}

#[test]
fn handler_reports_failure() {
    let mut rt = runtime();
    let script = "
        # add rejects x, so only the handler prints
        add ( [1] [x] ) print !
        | < [recovered] print ! >
    ";
    let outcome = rt.run(script).unwrap();
    assert!(!outcome.is_throwing());
    assert_eq!(rt.output().transcript().unwrap(), "recovered\n");
}

#[test]
fn named_exceptions_and_equality() {
    let mut rt = runtime();
    rt.run("[match] @yes").unwrap();
    let outcome = rt.run("^yes |[nomatch] |yes [ok]").unwrap();
    assert_eq!(outcome.texts(), ["ok"]);
    let outcome = rt.run("[a] [a] eq ! [a] [b] eq !").unwrap();
    assert_eq!(outcome.texts(), ["1", "0"]);
}

#[test]
fn dump_shows_structure_built_by_script() {
    let mut rt = runtime();
    rt.run("[red] @palette.fg [black] @palette.bg").unwrap();
    rt.run("palette dump !").unwrap();
    assert_eq!(rt.output().transcript().unwrap(), "bg: black\nfg: red\n");
}

#[test]
fn copy_is_independent_of_original() {
    let mut rt = runtime();
    rt.run("[1] @orig.n orig copy ! @clone [2] @clone.n").unwrap();
    assert_eq!(rt.run("orig.n clone.n").unwrap().texts(), ["1", "2"]);
}
