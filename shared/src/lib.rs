pub mod bitops;
pub mod constants;
pub mod errors;
pub mod message;

pub use message::{ExtractedMessage, MessageKind};
