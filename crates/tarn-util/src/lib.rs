//! Shared utilities for tarn.
//!
//! This crate provides cross-cutting concerns used by all other tarn crates:
//! the unified error type, artifact digests for hash checking, and terminal
//! status output.

pub mod errors;
pub mod hash;
pub mod progress;
