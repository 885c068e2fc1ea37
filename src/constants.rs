//! Central configuration constants for cmdchain
//!
//! Tunables used across the crate live here so they are easy to audit.

// =============================================================================
// Context Inspection
// =============================================================================

/// Maximum rendered length for a string value before it is truncated
pub const MAX_INSPECT_STRING_LEN: usize = 64;

/// Maximum number of collection elements rendered inline
pub const MAX_INSPECT_ITEMS: usize = 8;

// =============================================================================
// Failure Messages
// =============================================================================

/// Canonical message recorded when a body halts without a payload
pub const DEFAULT_HALT_MESSAGE: &str = "command halted";
