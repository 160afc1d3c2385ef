/*!
 * System Limits and Constants
 *
 * Centralized location for system-wide limits and tunables.
 * Organized by domain for maintainability and discoverability.
 */

// =============================================================================
// PROCESS LIMITS
// =============================================================================

/// Maximum stored process-name length in bytes
/// Longer names are silently truncated at a character boundary
pub const MAX_PROCESS_NAME_LEN: usize = 255;

// =============================================================================
// SYNC LIMITS
// =============================================================================

/// Number of park slots for exit-event waiters (power of 2 for fast modulo)
/// Unrelated keys may share a slot; waiters tolerate spurious wakeups
pub const PARK_SLOTS: usize = 64;

// =============================================================================
// MEMORY LIMITS
// =============================================================================

/// Total simulated memory pool (1GB)
/// Used as default capacity for the memory manager
pub const DEFAULT_MEMORY_POOL: usize = 1024 * 1024 * 1024;

/// Address-space size (16MB) charged against the pool per process
pub const DEFAULT_SPACE_SIZE: usize = 16 * 1024 * 1024;
