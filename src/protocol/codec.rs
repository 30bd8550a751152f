//! Frame codec
//!
//! Wraps a message payload with its opcode and length:
//!
//! ```text
//! [OPCODE (1)] [LENGTH (1)] [PAYLOAD (LENGTH bytes)]
//! ```

use chrono::{DateTime, FixedOffset, Local};
use tracing::{debug, trace};

use super::metrics::{Direction, Metrics};
use super::{Error, FRAME_HEADER_SIZE, MAX_FRAME_PAYLOAD, Message, OpcodeRegistry, Result};

/// Borrowed view of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    opcode: u8,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parse a frame from the front of `bytes`
    ///
    /// Bytes past the declared payload are ignored.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let needed = frame_len(bytes)?;
        if bytes.len() < needed {
            return Err(Error::TruncatedFrame {
                needed,
                got: bytes.len(),
            });
        }

        let opcode = bytes[0];
        if needed == FRAME_HEADER_SIZE {
            return Err(Error::EmptyPayload { opcode });
        }

        Ok(Self {
            opcode,
            payload: &bytes[FRAME_HEADER_SIZE..needed],
        })
    }

    /// Opcode byte
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Payload slice
    #[must_use]
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Size of the frame on the wire
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }
}

/// Total frame size declared by a frame header
///
/// Only the two header bytes are read, so this works on a partially received frame.
pub fn frame_len(bytes: &[u8]) -> Result<usize> {
    match bytes {
        [_, length, ..] => Ok(FRAME_HEADER_SIZE + usize::from(*length)),
        _ => Err(Error::TruncatedFrame {
            needed: FRAME_HEADER_SIZE,
            got: bytes.len(),
        }),
    }
}

/// Prefix `payload` with `opcode` and its length
///
/// Payloads longer than [`MAX_FRAME_PAYLOAD`] are rejected, never truncated.
pub fn encode_frame(opcode: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let length = u8::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge {
        size: payload.len(),
        max: MAX_FRAME_PAYLOAD,
    })?;

    let mut bytes = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    bytes.push(opcode);
    bytes.push(length);
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

/// Serializes messages to frames and back using an opcode table
#[derive(Debug, Clone, Copy)]
pub struct Codec<'r> {
    registry: &'r OpcodeRegistry,
}

impl<'r> Codec<'r> {
    /// Codec over `registry`
    #[must_use]
    pub const fn new(registry: &'r OpcodeRegistry) -> Self {
        Self { registry }
    }

    /// Opcode table in use
    #[must_use]
    pub const fn registry(&self) -> &'r OpcodeRegistry {
        self.registry
    }

    /// Encode `message` as a frame
    pub fn serialize(&self, message: &Message) -> Result<Vec<u8>> {
        let result = self.try_serialize(message);
        match &result {
            Ok(frame) => {
                Metrics::record_frame(Direction::Outbound, message.kind());
                trace!(kind = %message.kind(), len = frame.len(), "serialized frame");
            }
            Err(err) => {
                Metrics::record_error();
                debug!(kind = %message.kind(), error = %err, "failed to serialize frame");
            }
        }
        result
    }

    fn try_serialize(&self, message: &Message) -> Result<Vec<u8>> {
        let opcode = self.registry.opcode_of(message.kind())?;
        let payload = message.encode()?;
        encode_frame(opcode, &payload)
    }

    /// Decode a frame, dating time-of-day fields against the local clock
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Message> {
        self.deserialize_at(bytes, &Local::now().fixed_offset())
    }

    /// Decode a frame, dating time-of-day fields against `reference_now`
    pub fn deserialize_at(
        &self,
        bytes: &[u8],
        reference_now: &DateTime<FixedOffset>,
    ) -> Result<Message> {
        let result = self.try_deserialize(bytes, reference_now);
        match &result {
            Ok(message) => {
                Metrics::record_frame(Direction::Inbound, message.kind());
                trace!(kind = %message.kind(), len = bytes.len(), "deserialized frame");
            }
            Err(err) => {
                Metrics::record_error();
                debug!(len = bytes.len(), error = %err, "failed to deserialize frame");
            }
        }
        result
    }

    fn try_deserialize(&self, bytes: &[u8], reference_now: &DateTime<FixedOffset>) -> Result<Message> {
        let frame = Frame::parse(bytes)?;
        let kind = self.registry.variant_for(frame.opcode())?;
        Message::decode(kind, frame.payload(), reference_now)
    }
}

impl Default for Codec<'static> {
    fn default() -> Self {
        Self::new(OpcodeRegistry::global())
    }
}

/// Encode `message` with the standard opcode table
pub fn serialize(message: &Message) -> Result<Vec<u8>> {
    Codec::default().serialize(message)
}

/// Decode a frame with the standard opcode table
pub fn deserialize(bytes: &[u8]) -> Result<Message> {
    Codec::default().deserialize(bytes)
}
