//! Deterministic 75-byte debugger response frames.
//!
//! `ResponseGenerator` has no relationship to the ring or queue: the extractor
//! never calls it. It exists because every consumer of a `DEBUGGER_416BYTE`
//! message needs to unblock the COG that produced it, and the reply format is
//! fixed by the P2 debug ROM protocol, not by anything this crate chooses.

use std::sync::atomic::{AtomicU32, Ordering};

use shared::constants::{
    DEBUGGER_PACKET_LEN, DEBUGGER_SUBBLOCK_COG_LEN, RESPONSE_COGBRK_LEN, RESPONSE_COG_CHECKSUM_LEN,
    RESPONSE_HUB_CHECKSUM_LEN, RESPONSE_HUB_REQUEST_LEN, RESPONSE_LEN, RESPONSE_STALL_LEN,
    STALL_COMMAND_WORD,
};

/// Holds the per-session nonce that keeps repeated replies to the same
/// snapshot from being bit-identical.
pub struct ResponseGenerator {
    nonce: AtomicU32,
}

impl Default for ResponseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseGenerator {
    pub fn new() -> Self {
        Self {
            nonce: AtomicU32::new(1),
        }
    }

    /// Clears accumulated per-session state. Callers invoke this when the
    /// serial port's DTR line toggles, signalling a fresh debug session.
    pub fn reset(&self) {
        self.nonce.store(1, Ordering::Relaxed);
    }

    /// Builds the 75-byte reply for a 416-byte debugger snapshot payload.
    ///
    /// # Panics
    /// Panics if `payload.len() != 416`; the caller (the consumer loop) only
    /// ever calls this with a `DEBUGGER_416BYTE` message's payload, which is
    /// always exactly that length by construction (see `MessageExtractor`).
    pub fn generate_response(&self, payload: &[u8]) -> [u8; RESPONSE_LEN] {
        assert_eq!(
            payload.len(),
            DEBUGGER_PACKET_LEN,
            "generate_response requires a full 416-byte snapshot payload"
        );
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let cog_id = payload[0];

        let mut out = [0u8; RESPONSE_LEN];
        let mut cursor = 0;

        let cog_checksum = Self::fold(
            &payload[..DEBUGGER_SUBBLOCK_COG_LEN],
            RESPONSE_COG_CHECKSUM_LEN,
            nonce ^ 0x434F_4721,
        );
        out[cursor..cursor + RESPONSE_COG_CHECKSUM_LEN].copy_from_slice(&cog_checksum);
        cursor += RESPONSE_COG_CHECKSUM_LEN;

        let hub_checksum = Self::fold(payload, RESPONSE_HUB_CHECKSUM_LEN, nonce ^ 0x4855_4201);
        out[cursor..cursor + RESPONSE_HUB_CHECKSUM_LEN].copy_from_slice(&hub_checksum);
        cursor += RESPONSE_HUB_CHECKSUM_LEN;

        debug_assert_eq!(RESPONSE_HUB_REQUEST_LEN, 20);
        for i in 0..5 {
            let word = Self::hub_request_word(payload, nonce, i);
            out[cursor..cursor + 4].copy_from_slice(&word.to_le_bytes());
            cursor += 4;
        }

        debug_assert_eq!(RESPONSE_COGBRK_LEN, 4);
        let cogbrk = u32::from(cog_id) | (nonce << 8);
        out[cursor..cursor + RESPONSE_COGBRK_LEN].copy_from_slice(&cogbrk.to_le_bytes());
        cursor += RESPONSE_COGBRK_LEN;

        debug_assert_eq!(RESPONSE_STALL_LEN, 4);
        out[cursor..cursor + RESPONSE_STALL_LEN].copy_from_slice(&STALL_COMMAND_WORD.to_le_bytes());
        cursor += RESPONSE_STALL_LEN;

        debug_assert_eq!(cursor, RESPONSE_LEN);
        out
    }

    /// Folds `data` into a `out_len`-byte checksum, seeded by `seed` so the
    /// same bytes never fold to the same checksum across two nonce values.
    /// Not a cryptographic hash; the P2 debug protocol's own checksum is a
    /// simple rolling one and this mirrors that register-level feel rather
    /// than pulling in a hashing crate for an internal-only value.
    fn fold(data: &[u8], out_len: usize, seed: u32) -> Vec<u8> {
        let mut acc = vec![0u8; out_len];
        let mut state = seed;
        for (i, &b) in data.iter().enumerate() {
            state = state
                .wrapping_mul(16_777_619)
                .wrapping_add(u32::from(b))
                .rotate_left(5);
            acc[i % out_len] ^= (state >> (8 * (i % 4))) as u8;
        }
        acc
    }

    fn hub_request_word(payload: &[u8], nonce: u32, slot: usize) -> u32 {
        let lane = payload.len() / 5;
        let start = slot * lane;
        let end = if slot == 4 { payload.len() } else { start + lane };
        let mut h = nonce.wrapping_add(slot as u32).wrapping_mul(0x9E37_79B1);
        for &b in &payload[start..end] {
            h = h.wrapping_mul(31).wrapping_add(u32::from(b));
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cog_id: u8) -> Vec<u8> {
        let mut buf = vec![0u8; DEBUGGER_PACKET_LEN];
        buf[0] = cog_id;
        for (i, b) in buf.iter_mut().enumerate().skip(4) {
            *b = (i % 251) as u8;
        }
        buf
    }

    #[test]
    fn response_is_always_75_bytes_ending_in_the_stall_word() {
        let gen = ResponseGenerator::new();
        let reply = gen.generate_response(&snapshot(3));
        assert_eq!(reply.len(), RESPONSE_LEN);
        assert_eq!(&reply[RESPONSE_LEN - 4..], &[0x00, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn cogbrk_low_byte_identifies_the_cog() {
        let gen = ResponseGenerator::new();
        let reply = gen.generate_response(&snapshot(5));
        let cogbrk_offset = RESPONSE_COG_CHECKSUM_LEN + RESPONSE_HUB_CHECKSUM_LEN + RESPONSE_HUB_REQUEST_LEN;
        assert_eq!(reply[cogbrk_offset], 5);
    }

    #[test]
    fn replaying_the_same_snapshot_does_not_repeat_the_reply() {
        let gen = ResponseGenerator::new();
        let payload = snapshot(1);
        let first = gen.generate_response(&payload);
        let second = gen.generate_response(&payload);
        assert_ne!(first, second);
    }

    #[test]
    fn reset_restores_the_first_reply_in_a_session() {
        let gen = ResponseGenerator::new();
        let payload = snapshot(2);
        let first = gen.generate_response(&payload);
        gen.reset();
        let after_reset = gen.generate_response(&payload);
        assert_eq!(first, after_reset);
    }

    #[test]
    #[should_panic]
    fn rejects_a_payload_of_the_wrong_length() {
        let gen = ResponseGenerator::new();
        gen.generate_response(&[0u8; 10]);
    }
}
