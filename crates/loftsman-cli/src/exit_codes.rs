//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - manifest or settings rejected
pub const VALIDATION_ERROR: i32 = 2;

/// Ship failed - at least one chart did not release
pub const SHIP_FAILED: i32 = 3;

/// Lock error - another ship is active, or none is to avast
pub const LOCK_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cancelled - interrupted by a signal (128 + SIGINT)
pub const CANCELLED: i32 = 130;
