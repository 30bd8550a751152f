//! helio-wire - binary message layer for a heliostat-field radio link
//!
//! Converts typed commands and telemetry into compact frames and fixed 16-byte radio
//! packets, and back.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use helio_wire::{Action, HelioCmd, Message, Packetizer};
//!
//! // Build a command
//! let msg = Message::from(HelioCmd::new(300, Action::Stow));
//!
//! // Frame it: [opcode][length][payload]
//! let frame = helio_wire::serialize(&msg)?;
//! assert_eq!(frame, [0, 3, 1, 44, 2]);
//!
//! // Cut it into radio packets for the field controller address
//! let packets = Packetizer::default().fragment(&frame)?;
//!
//! // Receiving side
//! let frame = helio_wire::reassemble_frame(&packets)?;
//! let decoded = helio_wire::deserialize(&frame)?;
//! assert_eq!(decoded, msg);
//! # Ok::<(), helio_wire::Error>(())
//! ```
//!
//! # Layers
//!
//! - **Time codec** - absolute and time-of-day timestamp encodings
//! - **Messages** - fixed byte layouts per message kind
//! - **Opcode registry** - immutable, append-only opcode table
//! - **Frame codec** - `[opcode][length][payload]`
//! - **Packetizer** - 16-byte packets with address, sequence and total

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;

pub use protocol::{
    Action, ActuatorDirection, CalibObservation, Codec, Error, FC_RADIO_ADDRESS, HeartBeat,
    HelioAngle, HelioAngleMsg, HelioCmd, HelioTargetPoseCmd, JoystickCmd, MAX_FRAME_PAYLOAD,
    Message, MessageKind, OpcodeRegistry, PACKET_SIZE, Packet, Packetizer, PodConfigUpdateCmd,
    Reassembler, Result, deserialize, fragment, reassemble, reassemble_frame, serialize,
};

