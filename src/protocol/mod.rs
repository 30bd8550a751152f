//! Heliostat radio wire layer
//!
//! This module provides the message layouts, opcode table, frame codec and packetizer.

mod codec;
mod error;
pub mod hex;
mod message;
pub mod metrics;
mod packet;
mod registry;
pub mod time;
mod types;

pub use codec::{Codec, Frame, deserialize, encode_frame, frame_len, serialize};
pub use error::{Error, PacketSetFault, Result};
pub use message::{
    CalibObservation, HeartBeat, HelioAngleMsg, HelioCmd, HelioTargetPoseCmd, JoystickCmd,
    Message, PodConfigUpdateCmd,
};
pub use packet::{
    Packet, Packetizer, Reassembler, fragment, packet_count, reassemble, reassemble_frame,
};
pub use registry::{
    MessageKind, OpcodeRegistry, RESERVED_OPCODES, RegistryBuilder, STANDARD_OPCODES,
};
pub use types::{Action, ActuatorDirection, HelioAngle, HelioMode, HelioStatus, PodStatus};

/// Radio address of the field controller
pub const FC_RADIO_ADDRESS: u8 = 255;

/// Frame header size in bytes (opcode + length)
pub const FRAME_HEADER_SIZE: usize = 2;

/// Largest payload the one-byte length field can describe
pub const MAX_FRAME_PAYLOAD: usize = u8::MAX as usize;

/// Radio packet size in bytes
pub const PACKET_SIZE: usize = 16;

/// Packet header size in bytes (address + sequence + total)
pub const PACKET_HEADER_SIZE: usize = 3;

/// Payload bytes carried per packet
pub const PACKET_DATA_SIZE: usize = PACKET_SIZE - PACKET_HEADER_SIZE;

/// Most packets one transmission can be split into
pub const MAX_PACKETS: usize = u8::MAX as usize;

/// Heliostats served by one pod controller
pub const NUM_HELIOS_IN_POD: usize = 6;
