//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: schedulers and scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | recon            | Reconciliation run outcomes              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, config file not found.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config failed to parse or validate (no sources, duplicate keys, unknown
/// base or group member).
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// Base dataset unreadable, or it has no identifier column.
pub const EXIT_RECON_BASE: u8 = 61;

/// A report file could not be serialized or written.
pub const EXIT_RECON_WRITE: u8 = 62;

/// Run completed but at least one entity failed. Only with `--strict`.
pub const EXIT_RECON_FAILING: u8 = 63;
