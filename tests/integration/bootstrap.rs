//! Bootstrapping a runtime from command-line arguments

use std::fs;

use edict::runtime::{Bootstrap, Output, Runtime, RuntimeError};

#[test]
fn inline_script_runs() {
    let boot = Bootstrap::from_args(["edict", "-e", "[2] [3] sub !"]).unwrap().unwrap();
    assert_eq!(boot.name, "<eval>");
    let mut rt = Runtime::with_output(&boot.config, Output::captured()).unwrap();
    assert_eq!(rt.run(&boot.source).unwrap().texts(), ["-1"]);
}

#[test]
fn file_script_runs() {
    let path = std::env::temp_dir().join(format!("edict-boot-{}.ed", std::process::id()));
    fs::write(&path, "[hello] print !\n[done]\n").unwrap();

    let boot = Bootstrap::from_args(["edict".to_string(), "--trace".to_string(), path.display().to_string()])
        .unwrap()
        .unwrap();
    assert!(boot.config.trace);
    let mut rt = Runtime::with_output(&boot.config, Output::captured()).unwrap();
    let outcome = rt.run(&boot.source).unwrap();
    assert_eq!(outcome.texts(), ["done"]);
    assert_eq!(rt.output().transcript().unwrap(), "hello\n");
    fs::remove_file(&path).unwrap();
}

#[test]
fn compile_errors_surface_from_runtime() {
    let boot = Bootstrap::from_args(["edict", "-e", "[open"]).unwrap().unwrap();
    let mut rt = Runtime::with_output(&boot.config, Output::captured()).unwrap();
    let err = rt.run(&boot.source).unwrap_err();
    assert!(matches!(err, RuntimeError::Edict(_)));
}
