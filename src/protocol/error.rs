//! Wire layer error types

use thiserror::Error;

use super::MessageKind;

/// Errors produced by the message, frame and packet codecs
#[derive(Error, Debug)]
pub enum Error {
    /// Message kind has no opcode in the registry
    #[error("message kind {kind} is not registered")]
    UnknownVariant {
        /// Kind that was looked up
        kind: MessageKind,
    },

    /// Opcode does not resolve to a registered message kind
    #[error("unknown opcode: {opcode}")]
    UnknownOpcode {
        /// Opcode byte read from the frame
        opcode: u8,
    },

    /// Opcode already owned by another kind, or reserved
    #[error("opcode {opcode} is already taken")]
    DuplicateOpcode {
        /// Conflicting opcode
        opcode: u8,
    },

    /// Kind registered twice
    #[error("message kind {kind} is already registered")]
    DuplicateVariant {
        /// Conflicting kind
        kind: MessageKind,
    },

    /// Registered kind has no binary layout and cannot be framed
    #[error("message kind {kind} has no binary layout")]
    NoBinaryLayout {
        /// Kind that was resolved
        kind: MessageKind,
    },

    /// Encoded payload does not fit in the one-byte length field
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Frame header or declared payload runs past the end of the input
    #[error("truncated frame: need {needed} bytes, got {got}")]
    TruncatedFrame {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Payload shorter than the fixed size of its message kind
    #[error("truncated {kind} payload: need {needed} bytes, got {got}")]
    TruncatedPayload {
        /// Kind being decoded
        kind: MessageKind,
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Frame declares a zero-length payload
    #[error("frame with opcode {opcode} has an empty payload")]
    EmptyPayload {
        /// Opcode byte read from the frame
        opcode: u8,
    },

    /// Action byte outside the command enumeration
    #[error("invalid action: {value}")]
    InvalidAction {
        /// Raw byte
        value: u8,
    },

    /// Timestamp cannot be represented in the requested encoding
    #[error("timestamp out of range: {millis} ms")]
    TimestampOutOfRange {
        /// Offending millisecond value
        millis: i128,
    },

    /// Payload needs more packets than the one-byte total field allows
    #[error("payload of {size} bytes needs {packets} packets (max {max})")]
    TooManyPackets {
        /// Payload size
        size: usize,
        /// Packets required
        packets: usize,
        /// Maximum packet count
        max: usize,
    },

    /// Raw packet shorter than the fixed radio packet size
    #[error("truncated packet: need {needed} bytes, got {got}")]
    TruncatedPacket {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Packet set cannot be reassembled
    #[error("incomplete packet set: {reason}")]
    IncompletePacketSet {
        /// What is wrong with the set
        reason: PacketSetFault,
    },

    /// Text is not a valid two-digits-per-byte hex string
    #[error("invalid hex at offset {offset}")]
    InvalidHex {
        /// Offset of the first bad character
        offset: usize,
    },

    /// JSON encoding of a configuration command failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reason a set of packets cannot be reassembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSetFault {
    /// No packets supplied
    Empty,
    /// A sequence number in `1..=total` never arrived
    Missing {
        /// First missing sequence number
        sequence_no: u8,
    },
    /// Sequence number seen more than once
    Duplicate {
        /// Repeated sequence number
        sequence_no: u8,
    },
    /// Sequence number zero or above the declared total
    OutOfRange {
        /// Offending sequence number
        sequence_no: u8,
        /// Declared total
        total_packets: u8,
    },
    /// Packets disagree on `total_packets`
    TotalMismatch {
        /// Total carried by the first packet
        expected: u8,
        /// Disagreeing total
        found: u8,
    },
    /// Packets disagree on the radio address
    AddressMismatch {
        /// Address carried by the first packet
        expected: u8,
        /// Disagreeing address
        found: u8,
    },
    /// Declared payload length is impossible for this many packets
    LengthMismatch {
        /// Declared payload length
        len: usize,
        /// Packets in the set
        total_packets: u8,
    },
}

impl std::fmt::Display for PacketSetFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "no packets"),
            Self::Missing { sequence_no } => write!(f, "packet {sequence_no} missing"),
            Self::Duplicate { sequence_no } => write!(f, "packet {sequence_no} duplicated"),
            Self::OutOfRange {
                sequence_no,
                total_packets,
            } => write!(f, "sequence {sequence_no} outside 1..={total_packets}"),
            Self::TotalMismatch { expected, found } => {
                write!(f, "total_packets {found} disagrees with {expected}")
            }
            Self::AddressMismatch { expected, found } => {
                write!(f, "address {found} disagrees with {expected}")
            }
            Self::LengthMismatch { len, total_packets } => {
                write!(f, "{len} bytes cannot span {total_packets} packets")
            }
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
