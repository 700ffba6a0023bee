//! Integration tests for Layer 1: Listree
//!
//! Tests for the tree store, the name index, and path cursors.

mod cursor;
mod index;
mod tree;
