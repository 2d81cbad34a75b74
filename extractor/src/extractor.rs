//! The resynchronizing message extractor: the hardest part of this crate.
//!
//! `MessageExtractor` is deliberately stateless beyond its tuning (work budget,
//! cancellation flag): all progress state lives in the `RingBuffer` it is handed,
//! so the same extractor can be driven from a single pipeline or reused across
//! tests without worrying about leftover state between calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shared::constants::{COG_ID_MAX, DEBUGGER_PACKET_LEN};
use shared::errors::ExtractorError;
use shared::{ExtractedMessage, MessageKind};

use crate::queue::OutputQueue;
use crate::ring::RingBuffer;

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;

/// Outcome of looking at the current ring head and deciding what it starts.
enum Candidate {
    /// A complete message is ready; consuming `consumed` bytes commits it.
    Emit {
        kind: MessageKind,
        payload: Vec<u8>,
        consumed: usize,
    },
    /// The head cannot yet start a complete message with the bytes available.
    /// No bytes may be consumed; waiting for more input is the only option.
    Incomplete,
    /// Nothing buffered at all.
    Empty,
}

pub struct MessageExtractor {
    /// Maximum messages emitted per `extract_messages`/`extract_batch` call.
    /// `None` means unbounded within the ring's current contents.
    budget: Option<usize>,
    cancel: Arc<AtomicBool>,
}

impl MessageExtractor {
    pub fn new(budget: Option<usize>) -> Self {
        Self::with_cancellation(budget, Arc::new(AtomicBool::new(false)))
    }

    pub fn with_cancellation(budget: Option<usize>, cancel: Arc<AtomicBool>) -> Self {
        Self { budget, cancel }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Runs the emit loop, pushing each message directly into `queue`.
    ///
    /// Returns `hasMore`: whether a follow-up call might have more work to do.
    pub fn extract_messages(
        &self,
        ring: &RingBuffer,
        queue: &OutputQueue,
    ) -> Result<bool, ExtractorError> {
        let mut emitted = 0usize;
        loop {
            if self.is_cancelled() {
                return Ok(ring.has_data());
            }
            if let Some(budget) = self.budget {
                if emitted >= budget {
                    return Ok(ring.has_data());
                }
            }

            match Self::next_candidate(ring)? {
                Candidate::Empty | Candidate::Incomplete => return Ok(false),
                Candidate::Emit {
                    kind,
                    payload,
                    consumed,
                } => {
                    let msg = ExtractedMessage::new(kind, payload, 1.0, Self::source_offset(ring));
                    // Transactional emit: only consume ring bytes once the queue
                    // has actually accepted the message.
                    match queue.enqueue(msg) {
                        Ok(()) => {
                            ring.consume(consumed);
                            emitted += 1;
                            if queue.is_under_pressure() {
                                return Ok(true);
                            }
                        }
                        Err(_hard_cap_reached) => return Ok(true),
                    }
                }
            }
        }
    }

    /// Identical framing semantics to `extract_messages`, but returns the
    /// messages to the caller instead of enqueuing them.
    pub fn extract_batch(
        &self,
        ring: &RingBuffer,
    ) -> Result<(Vec<ExtractedMessage>, bool), ExtractorError> {
        let mut out = Vec::new();
        let mut emitted = 0usize;
        loop {
            if self.is_cancelled() {
                return Ok((out, ring.has_data()));
            }
            if let Some(budget) = self.budget {
                if emitted >= budget {
                    return Ok((out, ring.has_data()));
                }
            }

            match Self::next_candidate(ring)? {
                Candidate::Empty | Candidate::Incomplete => return Ok((out, false)),
                Candidate::Emit {
                    kind,
                    payload,
                    consumed,
                } => {
                    let offset = Self::source_offset(ring);
                    ring.consume(consumed);
                    emitted += 1;
                    out.push(ExtractedMessage::new(kind, payload, 1.0, offset));
                }
            }
        }
    }

    /// The logical stream offset of the message about to be emitted is exactly
    /// the number of bytes already consumed from the ring: everything before the
    /// head has been consumed, and the candidate being emitted starts at the head.
    fn source_offset(ring: &RingBuffer) -> u64 {
        ring.total_consumed()
    }

    fn next_candidate(ring: &RingBuffer) -> Result<Candidate, ExtractorError> {
        let used = ring.used();
        if used == 0 {
            return Ok(Candidate::Empty);
        }

        let b0 = ring
            .peek_at(0)
            .ok_or_else(|| ExtractorError::InvariantViolation("used() > 0 but peek_at(0) is None".into()))?;

        if b0 <= COG_ID_MAX {
            match Self::try_debugger_packet(ring, used, b0)? {
                Some(candidate) => return Ok(candidate),
                None => {} // shape gate failed; fall through to text-line mode below
            }
        } else if b0 == CR || b0 == LF {
            let consumed = if b0 == CR && ring.peek_at(1) == Some(LF) {
                2
            } else {
                1
            };
            return Ok(Candidate::Emit {
                kind: MessageKind::CogMessage,
                payload: Vec::new(),
                consumed,
            });
        }

        Self::scan_text_line(ring, used)
    }

    /// Validates a candidate debugger-snapshot frame starting at the head.
    ///
    /// Returns `Ok(Some(Candidate::Emit{..}))` on a committed snapshot,
    /// `Ok(Some(Candidate::Incomplete))` if fewer than 416 bytes are buffered,
    /// or `Ok(None)` if the shape gate fails and the caller should reclassify
    /// `b0` as an ordinary text byte.
    fn try_debugger_packet(
        ring: &RingBuffer,
        used: usize,
        cog_id: u8,
    ) -> Result<Option<Candidate>, ExtractorError> {
        if used < DEBUGGER_PACKET_LEN {
            return Ok(Some(Candidate::Incomplete));
        }
        let shape_ok = ring.peek_at(1) == Some(0) && ring.peek_at(2) == Some(0) && ring.peek_at(3) == Some(0);
        if !shape_ok || cog_id > COG_ID_MAX {
            return Ok(None);
        }

        let payload = ring.peek_owned(DEBUGGER_PACKET_LEN).ok_or_else(|| {
            ExtractorError::InvariantViolation("used() >= 416 but peek_owned(416) failed".into())
        })?;
        Ok(Some(Candidate::Emit {
            kind: MessageKind::Debugger416Byte,
            payload,
            consumed: DEBUGGER_PACKET_LEN,
        }))
    }

    /// Scans from the head for a CR/LF/CRLF terminator. `used` bounds the scan
    /// to the bytes currently buffered; reaching it without a terminator means
    /// the line is incomplete and nothing is consumed.
    fn scan_text_line(ring: &RingBuffer, used: usize) -> Result<Candidate, ExtractorError> {
        let mut i = 0usize;
        while i < used {
            match ring.peek_at(i) {
                Some(CR) => {
                    let consumed = if ring.peek_at(i + 1) == Some(LF) { i + 2 } else { i + 1 };
                    let payload = ring.peek_owned(i).ok_or_else(|| {
                        ExtractorError::InvariantViolation("text line payload shrank mid-scan".into())
                    })?;
                    return Ok(Candidate::Emit {
                        kind: MessageKind::CogMessage,
                        payload,
                        consumed,
                    });
                }
                Some(LF) => {
                    let payload = ring.peek_owned(i).ok_or_else(|| {
                        ExtractorError::InvariantViolation("text line payload shrank mid-scan".into())
                    })?;
                    return Ok(Candidate::Emit {
                        kind: MessageKind::CogMessage,
                        payload,
                        consumed: i + 1,
                    });
                }
                Some(_) => i += 1,
                None => {
                    return Err(ExtractorError::InvariantViolation(
                        "scan index ran past used() mid-loop".into(),
                    ))
                }
            }
        }
        Ok(Candidate::Incomplete)
    }
}
