//! Shared utilities for the Trellis dependency manager.
//!
//! This crate provides cross-cutting concerns used by the other Trellis crates:
//! the unified error type and terminal progress indicators.

pub mod errors;
pub mod progress;
