//! Wire-format and tuning constants shared between the extractor and its consumers.

/// Lowest lead byte that can start a debugger-snapshot candidate.
pub const COG_ID_MIN: u8 = 0;
/// Highest valid COG id (inclusive); the P2 has eight cores, numbered 0..=7.
pub const COG_ID_MAX: u8 = 7;

/// Total size of a debugger snapshot frame, in bytes.
pub const DEBUGGER_PACKET_LEN: usize = 416;
/// Size of the zeroed remainder of the little-endian COG-ID word (bytes 1..=3).
pub const DEBUGGER_PACKET_ID_PAD: usize = 3;

/// Sizes of the three opaque sub-blocks that follow the COG-ID word in a snapshot.
pub const DEBUGGER_SUBBLOCK_COG_LEN: usize = 40;
pub const DEBUGGER_SUBBLOCK_HUB_LEN: usize = 128;
pub const DEBUGGER_SUBBLOCK_TAIL_LEN: usize = 248;

/// Sizes of the five sections of a debugger response frame; must sum to 75.
pub const RESPONSE_COG_CHECKSUM_LEN: usize = 16;
pub const RESPONSE_HUB_CHECKSUM_LEN: usize = 31;
pub const RESPONSE_HUB_REQUEST_LEN: usize = 20;
pub const RESPONSE_COGBRK_LEN: usize = 4;
pub const RESPONSE_STALL_LEN: usize = 4;
pub const RESPONSE_LEN: usize = RESPONSE_COG_CHECKSUM_LEN
    + RESPONSE_HUB_CHECKSUM_LEN
    + RESPONSE_HUB_REQUEST_LEN
    + RESPONSE_COGBRK_LEN
    + RESPONSE_STALL_LEN;

/// The 32-bit stall command word, little-endian encoded, as the final four response bytes.
pub const STALL_COMMAND_WORD: u32 = 0x8000_0000;

/// Default fixed capacity for a `RingBuffer`: ~4s of backpressure budget at the P2's
/// sustained 2 Mbps debug-channel rate (250 KiB/s).
pub const DEFAULT_RING_CAPACITY: usize = 1024 * 1024;

/// Default output queue thresholds.
pub const DEFAULT_QUEUE_SOFT_CAP: usize = 4096;
pub const DEFAULT_QUEUE_HARD_CAP: usize = 8192;
