//! Radio message variants and their byte layouts
//!
//! Every variant has a fixed payload size. Multi-byte fields are little-endian except
//! [`HelioCmd::helio_id`] and the time-of-day timestamp in [`CalibObservation`], which are
//! big-endian to match the deployed heliostat firmware.

use bytes::{Buf, BufMut};
use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};

use super::time::{self, ABSOLUTE_TIMESTAMP_SIZE, TIME_OF_DAY_SIZE};
use super::{Action, Error, HelioAngle, MessageKind, Result};

/// Link heartbeat carrying a millisecond timestamp
///
/// # Wire Format
///
/// ```text
/// [timestamp: u64 LE, ms since epoch]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartBeat {
    /// Send time
    pub timestamp: DateTime<Utc>,
}

impl HeartBeat {
    /// Encoded size in bytes
    pub const SIZE: usize = ABSOLUTE_TIMESTAMP_SIZE;

    /// Heartbeat stamped with the current time
    #[must_use]
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }

    /// Convert to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(time::encode_absolute(&self.timestamp)?.to_vec())
    }

    /// Parse from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw = fixed::<{ HeartBeat::SIZE }>(MessageKind::HeartBeat, bytes)?;
        Ok(Self {
            timestamp: time::decode_absolute(raw)?,
        })
    }
}

/// Command addressed to a single heliostat
///
/// # Wire Format
///
/// ```text
/// [helio_id: u16 BE][action: u8]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelioCmd {
    /// Target heliostat
    pub helio_id: u16,
    /// Command to execute
    pub action: Action,
}

impl HelioCmd {
    /// Encoded size in bytes
    pub const SIZE: usize = 3;

    /// Create a new command
    #[must_use]
    pub const fn new(helio_id: u16, action: Action) -> Self {
        Self { helio_id, action }
    }

    /// Convert to bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.put_u16(self.helio_id);
        bytes.put_u8(self.action.as_u8());
        bytes
    }

    /// Parse from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw = fixed::<{ HelioCmd::SIZE }>(MessageKind::HelioCmd, bytes)?;
        let mut buf = &raw[..];
        let helio_id = buf.get_u16();
        let value = buf.get_u8();
        let action = Action::from_u8(value).ok_or(Error::InvalidAction { value })?;
        Ok(Self { helio_id, action })
    }
}

/// Point a heliostat's reflected beam at a position in field coordinates
///
/// # Wire Format
///
/// ```text
/// [helio_id: u16 LE][x: f32 LE][y: f32 LE][z: f32 LE]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelioTargetPoseCmd {
    /// Target heliostat
    pub helio_id: u16,
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
    /// Z coordinate
    pub z: f32,
}

impl HelioTargetPoseCmd {
    /// Encoded size in bytes
    pub const SIZE: usize = 14;

    /// Convert to bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.put_u16_le(self.helio_id);
        bytes.put_f32_le(self.x);
        bytes.put_f32_le(self.y);
        bytes.put_f32_le(self.z);
        bytes
    }

    /// Parse from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw = fixed::<{ HelioTargetPoseCmd::SIZE }>(MessageKind::HelioTargetPose, bytes)?;
        let mut buf = &raw[..];
        Ok(Self {
            helio_id: buf.get_u16_le(),
            x: buf.get_f32_le(),
            y: buf.get_f32_le(),
            z: buf.get_f32_le(),
        })
    }
}

/// One calibration sample for a heliostat
///
/// Spot errors are in metres: positive `u` puts the spot right of target, positive `v`
/// above it. Only the time of day of `timestamp` is transmitted.
///
/// # Wire Format
///
/// ```text
/// [time_of_day: u32 BE][spot_error_u: f32 LE][spot_error_v: f32 LE]
/// [helio_id: u16 LE][elev: f32 LE][tilt: f32 LE]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibObservation {
    /// Observation time; the date does not survive the wire
    pub timestamp: DateTime<FixedOffset>,
    /// Horizontal spot error (m)
    pub spot_error_u: f32,
    /// Vertical spot error (m)
    pub spot_error_v: f32,
    /// Observed heliostat
    pub helio_id: u16,
    /// Heliostat pose at the time of observation
    pub elev_tilt: HelioAngle,
}

impl CalibObservation {
    /// Encoded size in bytes
    pub const SIZE: usize = 22;

    /// Convert to bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.put_slice(&time::encode_time_of_day(&self.timestamp));
        bytes.put_f32_le(self.spot_error_u);
        bytes.put_f32_le(self.spot_error_v);
        bytes.put_u16_le(self.helio_id);
        bytes.put_slice(&self.elev_tilt.to_bytes());
        bytes
    }

    /// Parse from bytes, dating the observation against the local clock
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_at(bytes, &Local::now().fixed_offset())
    }

    /// Parse from bytes, dating the observation against `reference_now`
    pub fn decode_at(bytes: &[u8], reference_now: &DateTime<FixedOffset>) -> Result<Self> {
        let raw = fixed::<{ CalibObservation::SIZE }>(MessageKind::CalibObservation, bytes)?;
        let mut buf = &raw[..];

        let mut time_of_day = [0u8; TIME_OF_DAY_SIZE];
        buf.copy_to_slice(&mut time_of_day);
        let timestamp = time::decode_time_of_day(time_of_day, reference_now)?;
        let spot_error_u = buf.get_f32_le();
        let spot_error_v = buf.get_f32_le();
        let helio_id = buf.get_u16_le();
        let mut angle = [0u8; HelioAngle::SIZE];
        buf.copy_to_slice(&mut angle);

        Ok(Self {
            timestamp,
            spot_error_u,
            spot_error_v,
            helio_id,
            elev_tilt: HelioAngle::from_bytes(angle),
        })
    }
}

/// Full or partial configuration update for a pod
///
/// Has no binary layout. It travels as JSON over the pub/sub transport, never over the
/// radio framing; its opcode is held so the number is never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodConfigUpdateCmd {
    /// Target pod
    pub pod_id: u32,
    /// Configuration keys to apply
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl PodConfigUpdateCmd {
    /// Message kind
    pub const KIND: MessageKind = MessageKind::PodConfigUpdate;

    /// Serialize to JSON bytes
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Joystick drive for one heliostat, held until a zero command stops it
///
/// Each direction is `1.0` to extend, `-1.0` to retract and `0.0` to stop. JSON only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoystickCmd {
    /// Target heliostat
    pub helio_id: u16,
    /// Elevation axis drive
    #[serde(default)]
    pub elev_direction: f32,
    /// Tilt axis drive
    #[serde(default)]
    pub tilt_direction: f32,
}

impl JoystickCmd {
    /// Command that halts both axes
    #[must_use]
    pub const fn stop(helio_id: u16) -> Self {
        Self {
            helio_id,
            elev_direction: 0.0,
            tilt_direction: 0.0,
        }
    }
}

/// Reported actuator angles of one heliostat. JSON only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelioAngleMsg {
    /// Reporting heliostat
    pub helio_id: u16,
    /// Elevation (rad)
    pub elev_rad: f32,
    /// Tilt (rad)
    pub tilt_rad: f32,
}

impl HelioAngleMsg {
    /// Angles as carried inside binary messages
    #[must_use]
    pub const fn angle(&self) -> HelioAngle {
        HelioAngle {
            elev: self.elev_rad,
            tilt: self.tilt_rad,
        }
    }
}

/// Any message that can cross the radio link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Message {
    /// Single heliostat command
    HelioCmd(HelioCmd),
    /// Calibration observation
    CalibObservation(CalibObservation),
    /// Heliostat target pose
    HelioTargetPose(HelioTargetPoseCmd),
    /// Link heartbeat
    HeartBeat(HeartBeat),
}

impl Message {
    /// Kind of this message
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::HelioCmd(_) => MessageKind::HelioCmd,
            Self::CalibObservation(_) => MessageKind::CalibObservation,
            Self::HelioTargetPose(_) => MessageKind::HelioTargetPose,
            Self::HeartBeat(_) => MessageKind::HeartBeat,
        }
    }

    /// Encode the payload (without frame header)
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::HelioCmd(msg) => Ok(msg.encode()),
            Self::CalibObservation(msg) => Ok(msg.encode()),
            Self::HelioTargetPose(msg) => Ok(msg.encode()),
            Self::HeartBeat(msg) => msg.encode(),
        }
    }

    /// Decode a payload of the given kind
    ///
    /// `reference_now` dates time-of-day fields.
    pub fn decode(
        kind: MessageKind,
        payload: &[u8],
        reference_now: &DateTime<FixedOffset>,
    ) -> Result<Self> {
        match kind {
            MessageKind::HelioCmd => HelioCmd::decode(payload).map(Self::HelioCmd),
            MessageKind::CalibObservation => {
                CalibObservation::decode_at(payload, reference_now).map(Self::CalibObservation)
            }
            MessageKind::HelioTargetPose => {
                HelioTargetPoseCmd::decode(payload).map(Self::HelioTargetPose)
            }
            MessageKind::HeartBeat => HeartBeat::decode(payload).map(Self::HeartBeat),
            MessageKind::PodConfigUpdate => Err(Error::NoBinaryLayout { kind }),
        }
    }
}

impl From<HelioCmd> for Message {
    fn from(msg: HelioCmd) -> Self {
        Self::HelioCmd(msg)
    }
}

impl From<CalibObservation> for Message {
    fn from(msg: CalibObservation) -> Self {
        Self::CalibObservation(msg)
    }
}

impl From<HelioTargetPoseCmd> for Message {
    fn from(msg: HelioTargetPoseCmd) -> Self {
        Self::HelioTargetPose(msg)
    }
}

impl From<HeartBeat> for Message {
    fn from(msg: HeartBeat) -> Self {
        Self::HeartBeat(msg)
    }
}

fn fixed<const N: usize>(kind: MessageKind, bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|head| <[u8; N]>::try_from(head).ok())
        .ok_or(Error::TruncatedPayload {
            kind,
            needed: N,
            got: bytes.len(),
        })
}
