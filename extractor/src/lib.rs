//! Streaming extraction pipeline for a Parallax Propeller 2 debug byte stream.
//!
//! Data flow: transport -> [`RingBuffer`] -> [`MessageExtractor`] -> [`OutputQueue`]
//! -> consumers. [`ResponseGenerator`] sits off to the side, invoked by
//! consumers for every `DEBUGGER_416BYTE` message, never by the extractor.

pub mod config;
pub mod extractor;
pub mod logger;
pub mod queue;
pub mod response;
pub mod ring;

pub use extractor::MessageExtractor;
pub use queue::OutputQueue;
pub use response::ResponseGenerator;
pub use ring::RingBuffer;
