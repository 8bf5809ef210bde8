//! Shared test utilities for quizarchiver integration tests.
//!
//! This module provides:
//! - `TestHarness` with temp directories, an in-memory database and a file store
//! - Builders for an in-memory quiz repository and a stub page renderer

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
