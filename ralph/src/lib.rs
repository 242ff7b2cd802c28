//! Backlog tooling for an autonomous coding-agent loop.
//!
//! Between agent iterations, ralph picks the next stories to work on from a
//! PRD document and folds the agent's tagged output back into it. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (tag scanning, result parsing,
//!   story selection, in-memory story updates). No I/O.
//! - **[`io`]**: Side-effecting operations (PRD load/save, progress log,
//!   config, stdin).
//!
//! Orchestration modules ([`select`], [`apply`], [`update`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod apply;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod select;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod update;
