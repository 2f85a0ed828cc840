//! Protocol and timing constants for presence-ipc.
//!
//! Wire-level values are fixed by the desktop peer and must not change.
//! Timing values are defaults; [`crate::Config`] and the client builder
//! override them per client.
//!
//! # Categories
//!
//! - **Wire**: header layout, size caps, handshake version
//! - **Addresses**: candidate socket naming
//! - **Timing**: Read Loop and Presence Scheduler periods

use std::time::Duration;

// ============================================================================
// Wire
// ============================================================================

/// Size of a frame header: `[u32 LE opcode][u32 LE length]`.
pub const HEADER_LEN: usize = 8;

/// Maximum accepted frame payload (16 MB).
///
/// The peer never sends anything close to this; a larger length means the
/// stream is out of sync and the buffered bytes are discarded.
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Protocol version announced in the handshake payload.
pub const HANDSHAKE_VERSION: u32 = 1;

/// Scratch buffer size for one non-blocking read.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

// ============================================================================
// Addresses
// ============================================================================

/// Number of candidate addresses tried by one connection sweep.
pub const ADDRESS_CANDIDATES: u8 = 10;

/// Socket / pipe name prefix; the candidate ordinal is appended.
pub const SOCKET_NAME_PREFIX: &str = "discord-ipc-";

// ============================================================================
// Timing
// ============================================================================

/// Default Read Loop period.
pub const DEFAULT_READ_INTERVAL: Duration = Duration::from_millis(1000);

/// Default Presence Scheduler period.
///
/// The peer rate-limits activity updates; one update every 15 seconds
/// stays under that limit.
pub const DEFAULT_PRESENCE_INTERVAL: Duration = Duration::from_secs(15);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_interval_shorter_than_presence_interval() {
        assert!(DEFAULT_READ_INTERVAL < DEFAULT_PRESENCE_INTERVAL);
    }

    #[test]
    fn test_header_fits_two_u32() {
        assert_eq!(HEADER_LEN, 2 * std::mem::size_of::<u32>());
    }
}
