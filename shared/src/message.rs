//! The typed variant emitted by the extractor and carried through the output queue.

/// Closed set of message shapes the extractor can recognize on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum MessageKind {
    /// A text line emitted by one of COGs 0-7 or by the main program.
    CogMessage,
    /// A 416-byte binary debugger snapshot. Its first byte is the originating COG id.
    Debugger416Byte,
    /// Reserved for a future sub-extractor; the core never constructs this variant today.
    UnknownBinary,
}

/// One framed unit pulled out of the ring by the extractor.
///
/// Payloads never include their terminator (CR/LF/CRLF for text) or, for a snapshot,
/// anything beyond the 416 committed bytes. `source_offset` is the logical ring
/// position of the first payload byte at the moment of extraction and is
/// monotonically non-decreasing across a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
    /// Confidence in `[0, 1]` that the framing is correct, not just well-shaped.
    confidence_permille: u16,
    pub source_offset: u64,
}

impl ExtractedMessage {
    /// `confidence` is clamped into `[0, 1]` before storage.
    pub fn new(kind: MessageKind, payload: Vec<u8>, confidence: f32, source_offset: u64) -> Self {
        let clamped = confidence.clamp(0.0, 1.0);
        Self {
            kind,
            payload,
            confidence_permille: (clamped * 1000.0).round() as u16,
            source_offset,
        }
    }

    pub fn confidence(&self) -> f32 {
        f32::from(self.confidence_permille) / 1000.0
    }
}
