//! Integration tests for Error types
//!
//! Tests error construction, display, and recoverability.

use edict_foundation::{Error, ErrorContext, ErrorKind};

// =============================================================================
// Error Display
// =============================================================================

#[test]
fn underflow_names_the_resource() {
    let err = Error::underflow("excp");
    assert!(matches!(err.kind, ErrorKind::StackUnderflow("excp")));
    assert_eq!(err.to_string(), "excp stack underflow");
}

#[test]
fn compile_error_carries_position() {
    let err = Error::compile("unexpected character: ~", 3, 7);
    let msg = format!("{err}");
    assert!(msg.contains("3:7"), "{msg}");
    assert!(msg.contains("unexpected character"), "{msg}");
}

#[test]
fn path_syntax_carries_offset() {
    let err = Error::path_syntax("unterminated value key", 4);
    assert!(matches!(err.kind, ErrorKind::PathSyntax { offset: 4, .. }));
}

#[test]
fn context_is_attached() {
    let err = Error::not_found("a.b").with_context(ErrorContext::new().with_source("a.b").with_offset(2));
    let context = err.context.as_ref().unwrap();
    assert_eq!(context.source.as_deref(), Some("a.b"));
    assert_eq!(context.offset, Some(2));
}

// =============================================================================
// Recoverability
// =============================================================================

#[test]
fn handler_failures_are_recoverable() {
    for err in [
        Error::read_only(),
        Error::not_a_container("leaf"),
        Error::not_found("x"),
        Error::underflow("data"),
        Error::overflow("code"),
        Error::ffi("bad"),
        Error::compile("bad", 1, 1),
        Error::continuation("bad"),
    ] {
        assert!(err.is_recoverable(), "{err}");
    }
}

#[test]
fn decoding_failures_are_fatal() {
    assert!(!Error::malformed(3, "truncated").is_recoverable());
    assert!(!Error::new(ErrorKind::UnknownOpcode(0xff)).is_recoverable());
    assert!(!Error::internal("bug").is_recoverable());
}
