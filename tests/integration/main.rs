//! Cross-layer integration tests for Edict
//!
//! Tests that verify correct interaction between multiple crates.

mod bootstrap;
mod scripts;
