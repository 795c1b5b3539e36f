//! Property-based tests for determinism guarantees

mod determinism;
