//! Deterministic, pure logic shared by the ralph commands.
//!
//! Core modules must be free of I/O side effects. They operate on an in-memory
//! PRD or raw agent text and return deterministic outputs suitable for tests.

pub mod error;
pub mod markup;
pub mod results;
pub mod selector;
pub mod story_update;
pub mod tag;
pub mod types;
