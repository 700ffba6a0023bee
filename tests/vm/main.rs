//! Integration tests for Layer 2: VM
//!
//! Tests for bytecode, dispatch, and sharing trees across threads.

mod bytecode;
mod dispatch;
mod threads;
