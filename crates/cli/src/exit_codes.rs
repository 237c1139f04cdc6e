//! CLI Exit Code Registry
//!
//! Single source of truth for `pricewise` exit codes. Scripts branch on these,
//! so existing values never change meaning.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 2    | CLI usage error (bad args)                               |
//! | 60   | Config failed to parse or validate                       |
//! | 61   | Runtime error (unreadable file, bad CSV, write failure)  |
//! | 62   | Run completed but some reference listings had no match   |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed, or parsed but failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 60;

/// Config was valid but the run could not complete.
pub const EXIT_RUNTIME: u8 = 61;

/// Report produced, but at least one reference listing went unmatched.
/// `--allow-unmatched` turns this into success.
pub const EXIT_UNMATCHED: u8 = 62;
