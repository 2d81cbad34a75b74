use thiserror::Error;

/// Fatal extractor faults. Unlike `RingError`/`QueueError`, these mean the ring's
/// head is no longer trustworthy; the pipeline must stop rather than continue
/// reading from a corrupt cursor.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("ring invariant violated: {0}")]
    InvariantViolation(String),
}
