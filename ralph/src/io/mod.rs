//! I/O helpers for ralph commands.

pub mod config;
pub mod input;
pub mod prd_store;
pub mod progress_log;
