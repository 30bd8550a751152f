//! Opcode registry
//!
//! Maps each message kind to the one-byte opcode used on the wire. The table is assembled
//! once through [`RegistryBuilder`], checked for uniqueness as it is built, and is
//! read-only afterwards. Opcodes are append-only: a kind keeps its opcode forever and a
//! retired opcode is reserved rather than reassigned.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Identity of a message kind known to the radio link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Single heliostat command
    HelioCmd,
    /// Pod configuration update (JSON only)
    PodConfigUpdate,
    /// Calibration observation
    CalibObservation,
    /// Heliostat target pose
    HelioTargetPose,
    /// Link heartbeat
    HeartBeat,
}

impl MessageKind {
    /// Number of kinds
    pub const COUNT: usize = 5;

    /// Every kind
    pub const ALL: [Self; Self::COUNT] = [
        Self::HelioCmd,
        Self::PodConfigUpdate,
        Self::CalibObservation,
        Self::HelioTargetPose,
        Self::HeartBeat,
    ];

    const fn index(self) -> usize {
        match self {
            Self::HelioCmd => 0,
            Self::PodConfigUpdate => 1,
            Self::CalibObservation => 2,
            Self::HelioTargetPose => 3,
            Self::HeartBeat => 4,
        }
    }

    /// Fixed encoded payload size, or `None` for kinds without a binary layout
    #[must_use]
    pub const fn wire_size(self) -> Option<usize> {
        match self {
            Self::HelioCmd => Some(3),
            Self::HelioTargetPose => Some(14),
            Self::CalibObservation => Some(22),
            Self::HeartBeat => Some(8),
            Self::PodConfigUpdate => None,
        }
    }

    /// Whether the kind can be framed
    #[must_use]
    pub const fn has_binary_layout(self) -> bool {
        self.wire_size().is_some()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HelioCmd => "HelioCmd",
            Self::PodConfigUpdate => "PodConfigUpdateCmd",
            Self::CalibObservation => "CalibObservation",
            Self::HelioTargetPose => "HelioTargetPoseCmd",
            Self::HeartBeat => "HeartBeat",
        };
        write!(f, "{name}")
    }
}

/// Opcode assignments of the deployed link. Append only.
pub const STANDARD_OPCODES: [(MessageKind, u8); 5] = [
    (MessageKind::HelioCmd, 0),
    (MessageKind::PodConfigUpdate, 3),
    (MessageKind::CalibObservation, 4),
    (MessageKind::HelioTargetPose, 5),
    (MessageKind::HeartBeat, 6),
];

/// Opcodes retired or held back in the deployed link
pub const RESERVED_OPCODES: [u8; 2] = [1, 2];

/// Immutable opcode table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeRegistry {
    by_opcode: [Option<MessageKind>; 256],
    by_kind: [Option<u8>; MessageKind::COUNT],
    reserved: [bool; 256],
}

impl OpcodeRegistry {
    /// Start an empty table
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            table: Self {
                by_opcode: [None; 256],
                by_kind: [None; MessageKind::COUNT],
                reserved: [false; 256],
            },
        }
    }

    /// Build the table used by the deployed link
    pub fn standard() -> Result<Self> {
        let mut builder = Self::builder();
        for opcode in RESERVED_OPCODES {
            builder = builder.reserve(opcode)?;
        }
        for (kind, opcode) in STANDARD_OPCODES {
            builder = builder.register(kind, opcode)?;
        }
        Ok(builder.build())
    }

    /// Process-wide standard table, built on first use
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<OpcodeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::standard().expect("standard opcode table is unique"))
    }

    /// Opcode assigned to `kind`
    pub fn opcode_of(&self, kind: MessageKind) -> Result<u8> {
        self.by_kind[kind.index()].ok_or(Error::UnknownVariant { kind })
    }

    /// Kind owning `opcode`
    pub fn variant_for(&self, opcode: u8) -> Result<MessageKind> {
        self.by_opcode[usize::from(opcode)].ok_or(Error::UnknownOpcode { opcode })
    }

    /// Whether `opcode` is held back from assignment
    #[must_use]
    pub fn is_reserved(&self, opcode: u8) -> bool {
        self.reserved[usize::from(opcode)]
    }

    /// Registered `(kind, opcode)` pairs in opcode order
    pub fn iter(&self) -> impl Iterator<Item = (MessageKind, u8)> + '_ {
        (0..=u8::MAX).filter_map(|opcode| self.by_opcode[usize::from(opcode)].map(|kind| (kind, opcode)))
    }

    /// Smallest opcode neither registered nor reserved
    #[must_use]
    pub fn next_free_opcode(&self) -> Option<u8> {
        let highest = (0..=u8::MAX)
            .rev()
            .find(|&opcode| self.by_opcode[usize::from(opcode)].is_some() || self.reserved[usize::from(opcode)]);
        match highest {
            None => Some(0),
            Some(opcode) => opcode.checked_add(1),
        }
    }
}

/// Collects opcode assignments before the table is frozen
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    table: OpcodeRegistry,
}

impl RegistryBuilder {
    /// Assign `opcode` to `kind`
    pub fn register(mut self, kind: MessageKind, opcode: u8) -> Result<Self> {
        let slot = usize::from(opcode);
        if self.table.by_opcode[slot].is_some() || self.table.reserved[slot] {
            return Err(Error::DuplicateOpcode { opcode });
        }
        if self.table.by_kind[kind.index()].is_some() {
            return Err(Error::DuplicateVariant { kind });
        }
        self.table.by_opcode[slot] = Some(kind);
        self.table.by_kind[kind.index()] = Some(opcode);
        Ok(self)
    }

    /// Hold `opcode` back so it can never be assigned
    pub fn reserve(mut self, opcode: u8) -> Result<Self> {
        let slot = usize::from(opcode);
        if self.table.by_opcode[slot].is_some() || self.table.reserved[slot] {
            return Err(Error::DuplicateOpcode { opcode });
        }
        self.table.reserved[slot] = true;
        Ok(self)
    }

    /// Freeze the table
    #[must_use]
    pub fn build(self) -> OpcodeRegistry {
        self.table
    }
}
