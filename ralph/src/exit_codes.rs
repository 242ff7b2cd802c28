//! Stable exit codes for ralph CLI commands.

/// Command succeeded (including `select` with nothing left to do).
pub const OK: i32 = 0;
/// A referenced PRD, story, or tag block does not exist.
pub const NOT_FOUND: i32 = 1;
/// Invalid input: bad tag name, malformed PRD, unparsable flag, empty text.
pub const INVALID: i32 = 2;
