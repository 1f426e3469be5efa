//! Punctuality modes and their presentation tables
//!
//! | Delay (minutes)        | Mode          | Code | Status        | Air quality      |
//! |------------------------|---------------|------|---------------|------------------|
//! | unknown                | `UNKNOWN`     | 4    | `unknown`     | ExtremelyPoor→4  |
//! | `-2..=2`, or below -2  | `ON_TIME`     | 0    | `on_time`     | Good 1           |
//! | `3..=5`                | `MINOR_DELAY` | 1    | `minor_delay` | Fair 2           |
//! | `6..=10`               | `DELAYED`     | 2    | `delayed`     | Moderate 3       |
//! | `>= 11`                | `MAJOR_DELAY` | 3    | `major_delay` | VeryPoor→4       |
//!
//! Trains running early never count as delayed, however early they are.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_SUPPORTED_AIR_QUALITY;
use crate::impl_tag_conversions;

/// Signed lateness in whole minutes, `None` when unknown
pub type DelayMinutes = Option<i64>;

/// Externally visible punctuality state of the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    OnTime,
    MinorDelay,
    Delayed,
    MajorDelay,
    #[default]
    Unknown,
}

impl Mode {
    /// Every mode, ordered by code
    pub const ALL: [Mode; 5] =
        [Mode::OnTime, Mode::MinorDelay, Mode::Delayed, Mode::MajorDelay, Mode::Unknown];

    /// Numeric code reported as the device's current mode
    pub const fn code(self) -> u8 {
        match self {
            Mode::OnTime => 0,
            Mode::MinorDelay => 1,
            Mode::Delayed => 2,
            Mode::MajorDelay => 3,
            Mode::Unknown => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    pub const fn status(self) -> Status {
        match self {
            Mode::OnTime => Status::OnTime,
            Mode::MinorDelay => Status::MinorDelay,
            Mode::Delayed => Status::Delayed,
            Mode::MajorDelay => Status::MajorDelay,
            Mode::Unknown => Status::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Mode::OnTime => "On Time",
            Mode::MinorDelay => "Minor Delay",
            Mode::Delayed => "Delayed",
            Mode::MajorDelay => "Major Delay",
            Mode::Unknown => "Unknown",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Mode::OnTime => "Early, or at most 2 minutes late",
            Mode::MinorDelay => "Running 3 to 5 minutes late",
            Mode::Delayed => "Running 6 to 10 minutes late",
            Mode::MajorDelay => "Running 11 or more minutes late",
            Mode::Unknown => "No usable running information",
        }
    }

    pub const fn descriptor(self) -> ModeDescriptor {
        ModeDescriptor {
            mode: self,
            code: self.code(),
            label: self.label(),
            description: self.description(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::OnTime => write!(f, "ON_TIME"),
            Mode::MinorDelay => write!(f, "MINOR_DELAY"),
            Mode::Delayed => write!(f, "DELAYED"),
            Mode::MajorDelay => write!(f, "MAJOR_DELAY"),
            Mode::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Display metadata for one supported mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeDescriptor {
    pub mode: Mode,
    pub code: u8,
    pub label: &'static str,
    pub description: &'static str,
}

/// Status tag written to the device framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    OnTime,
    MinorDelay,
    Delayed,
    MajorDelay,
    Unknown,
}

impl_tag_conversions!(Status {
    OnTime => "on_time",
    MinorDelay => "minor_delay",
    Delayed => "delayed",
    MajorDelay => "major_delay",
    Unknown => "unknown",
});

impl Status {
    pub const fn air_quality(self) -> AirQuality {
        match self {
            Status::OnTime => AirQuality::Good,
            Status::MinorDelay => AirQuality::Fair,
            Status::Delayed => AirQuality::Moderate,
            Status::MajorDelay => AirQuality::VeryPoor,
            Status::Unknown => AirQuality::ExtremelyPoor,
        }
    }
}

/// Air-quality scale used to surface punctuality on stock controllers
///
/// The framework only accepts ordinals up to
/// [`MAX_SUPPORTED_AIR_QUALITY`]; the two worst tiers collapse onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQuality {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    ExtremelyPoor,
}

impl AirQuality {
    /// Position on the full six-tier scale (1 = good)
    pub const fn ordinal(self) -> u8 {
        match self {
            AirQuality::Good => 1,
            AirQuality::Fair => 2,
            AirQuality::Moderate => 3,
            AirQuality::Poor => 4,
            AirQuality::VeryPoor => 5,
            AirQuality::ExtremelyPoor => 6,
        }
    }

    /// Ordinal actually written to the framework
    pub const fn reported_ordinal(self) -> u8 {
        let ordinal = self.ordinal();
        if ordinal > MAX_SUPPORTED_AIR_QUALITY {
            MAX_SUPPORTED_AIR_QUALITY
        } else {
            ordinal
        }
    }
}
