use thiserror::Error;

/// Errors raised by `RingBuffer`. Both are non-fatal; the caller is expected to retry.
#[derive(Debug, Error)]
pub enum RingError {
    /// `append_at_tail` was rejected because the chunk did not fit in the free space.
    #[error("ring full: need {needed} bytes, have {available} free of {capacity}")]
    Full {
        needed: usize,
        available: usize,
        capacity: usize,
    },
}
