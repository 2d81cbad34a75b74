use thiserror::Error;

/// Errors raised by `OutputQueue`. Non-fatal; the extractor must leave the
/// underlying ring bytes unconsumed when this is returned from `enqueue`.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("output queue at hard cap: size={size}, hard_cap={hard_cap}")]
    Full { size: usize, hard_cap: usize },
}
