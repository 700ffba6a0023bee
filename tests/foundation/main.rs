//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Cll, Name, wildcard patterns, and Error.

mod cll;
mod errors;
mod names;
