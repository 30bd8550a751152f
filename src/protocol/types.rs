//! Field-level value types shared by the message variants

use std::fmt;

use serde::{Deserialize, Serialize};

/// Heliostat actuator command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Action {
    /// Follow the sun
    Track = 0,
    /// Move the spot off target
    Defocus = 1,
    /// Park in the safe position
    Stow = 2,
    /// Hold the current pose
    Pause = 3,
    /// Reset the motor controllers
    MotorReset = 4,
    /// Discard the calibration model
    ResetCalibration = 5,
    /// Fit a calibration model from collected observations
    SolveCalibration = 6,
    /// Reboot the heliostat controller
    Restart = 7,
}

impl Action {
    /// Every action in wire order
    pub const ALL: [Self; 8] = [
        Self::Track,
        Self::Defocus,
        Self::Stow,
        Self::Pause,
        Self::MotorReset,
        Self::ResetCalibration,
        Self::SolveCalibration,
        Self::Restart,
    ];

    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Track => "TRACK",
            Self::Defocus => "DEFOCUS",
            Self::Stow => "STOW",
            Self::Pause => "PAUSE",
            Self::MotorReset => "MOTOR_RESET",
            Self::ResetCalibration => "RESET_CALIBRATION",
            Self::SolveCalibration => "SOLVE_CALIBRATION",
            Self::Restart => "RESTART",
        };
        write!(f, "{name}")
    }
}

/// Elevation and tilt of a heliostat, in radians
///
/// # Wire Format
///
/// ```text
/// [elev: f32 LE][tilt: f32 LE]
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HelioAngle {
    /// Elevation angle (rad)
    pub elev: f32,
    /// Tilt angle (rad)
    pub tilt: f32,
}

impl HelioAngle {
    /// Encoded size in bytes
    pub const SIZE: usize = 8;

    /// Create a new angle pair
    #[must_use]
    pub const fn new(elev: f32, tilt: f32) -> Self {
        Self { elev, tilt }
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.elev.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.tilt.to_le_bytes());
        bytes
    }

    /// Parse from exactly [`HelioAngle::SIZE`] bytes (little-endian)
    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            elev: f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            tilt: f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// Operating mode reported by a heliostat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum HelioMode {
    /// Following the sun
    Tracking = 0,
    /// Powered and idle
    Standby = 1,
    /// Parked
    Stowed = 2,
    /// Under joystick control
    Manual = 3,
}

impl HelioMode {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Tracking),
            1 => Some(Self::Standby),
            2 => Some(Self::Stowed),
            3 => Some(Self::Manual),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Motion status reported by a heliostat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum HelioStatus {
    /// Actuators running
    Moving = 0,
    /// Actuators idle
    Stopped = 1,
    /// Parked
    Stowed = 2,
    /// Fault latched
    Error = 3,
}

impl HelioStatus {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Moving),
            1 => Some(Self::Stopped),
            2 => Some(Self::Stowed),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Health of a pod controller. Values start at one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PodStatus {
    /// Nominal
    Ok = 1,
    /// Degraded
    Sad = 2,
    /// Faulted
    Error = 3,
    /// Unresponsive but still reporting
    RockingBackwardsAndForwardsInACorner = 4,
}

impl PodStatus {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ok),
            2 => Some(Self::Sad),
            3 => Some(Self::Error),
            4 => Some(Self::RockingBackwardsAndForwardsInACorner),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Direction a linear actuator is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ActuatorDirection {
    /// Lengthen the actuator
    Extend = 0,
    /// Shorten the actuator
    Retract = 1,
}

impl ActuatorDirection {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Extend),
            1 => Some(Self::Retract),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
