mod extractor_errors;
mod queue_errors;
mod ring_errors;

pub use extractor_errors::ExtractorError;
pub use queue_errors::QueueError;
pub use ring_errors::RingError;
