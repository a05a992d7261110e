//! The eight movements a goniometer assessment is made of, and the two sides
//! of the body each one is measured on.
//!
//! Each movement maps to a single ASCII command byte that arms the device.
//! The table is fixed and ordered; a movement's `index` is its slot position
//! within a side.

use std::{fmt, str::FromStr};

/// Byte that puts the device into calibration (live streaming, no result).
pub const CALIBRATION_COMMAND: u8 = b'r';

/// Number of angle slots a side owns, one per [`Movement`].
pub const SLOTS_PER_SIDE: usize = 8;

/// The joint a movement belongs to. Each joint pairs two movements whose
/// angles combine into one range-of-motion value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    /// Flexion and extension of the wrist
    Wrist,
    /// Supination and pronation of the forearm
    Forearm,
    /// Flexion and extension of the elbow
    Elbow,
    /// Radial and ulnar deviation of the wrist
    WristDeviation,
}

impl Joint {
    /// All joints, in slot order.
    pub const ALL: [Joint; 4] = [
        Joint::Wrist,
        Joint::Forearm,
        Joint::Elbow,
        Joint::WristDeviation,
    ];

    /// Label used on screen and in reports.
    pub fn rom_label(self) -> &'static str {
        match self {
            Joint::Wrist => "ROM Wrist",
            Joint::Forearm => "ROM Forearm",
            Joint::Elbow => "ROM Elbow",
            Joint::WristDeviation => "ROM Wrist Deviation",
        }
    }
}

/// An immutable movement descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    /// Byte written to the device to arm this measurement
    pub command: u8,
    /// Human readable name, e.g. "Wrist Flexion"
    pub name: &'static str,
    /// Slot position within a side, `0..8`
    pub index: usize,
    /// The joint this movement contributes to
    pub joint: Joint,
}

/// The fixed movement table.
///
/// Radial and ulnar deviation both send `z`. The device firmware defines it
/// this way, so the two entries are kept as-is rather than deduplicated.
pub const MOVEMENTS: [Movement; SLOTS_PER_SIDE] = [
    Movement {
        command: b'f',
        name: "Wrist Flexion",
        index: 0,
        joint: Joint::Wrist,
    },
    Movement {
        command: b'e',
        name: "Wrist Extension",
        index: 1,
        joint: Joint::Wrist,
    },
    Movement {
        command: b's',
        name: "Forearm Supination",
        index: 2,
        joint: Joint::Forearm,
    },
    Movement {
        command: b'p',
        name: "Forearm Pronation",
        index: 3,
        joint: Joint::Forearm,
    },
    Movement {
        command: b'x',
        name: "Elbow Flexion",
        index: 4,
        joint: Joint::Elbow,
    },
    Movement {
        command: b'y',
        name: "Elbow Extension",
        index: 5,
        joint: Joint::Elbow,
    },
    Movement {
        command: b'z',
        name: "Radial Deviation",
        index: 6,
        joint: Joint::WristDeviation,
    },
    Movement {
        command: b'z',
        name: "Ulnar Deviation",
        index: 7,
        joint: Joint::WristDeviation,
    },
];

impl Movement {
    /// Looks a movement up by name, ignoring case, spaces, dashes and
    /// underscores, so `"wrist-flexion"` finds "Wrist Flexion".
    pub fn from_name(name: &str) -> Option<&'static Movement> {
        let wanted = normalize(name);
        MOVEMENTS.iter().find(|m| normalize(m.name) == wanted)
    }

    /// Whether another movement in the table sends the same command byte.
    pub fn shares_command(&self) -> bool {
        MOVEMENTS
            .iter()
            .any(|m| m.index != self.index && m.command == self.command)
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Which side of the patient a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The healthy reference side
    Unaffected,
    /// The side under assessment
    Affected,
}

impl Side {
    /// Both sides, in storage order.
    pub const BOTH: [Side; 2] = [Side::Unaffected, Side::Affected];

    /// Position of this side in per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::Unaffected => 0,
            Side::Affected => 1,
        }
    }

    /// The other side.
    pub fn toggled(self) -> Side {
        match self {
            Side::Unaffected => Side::Affected,
            Side::Affected => Side::Unaffected,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Unaffected => "Unaffected",
            Side::Affected => "Affected",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unaffected" | "u" => Ok(Side::Unaffected),
            "affected" | "a" => Ok(Side::Affected),
            other => Err(format!(
                "unknown side `{}`, expected `unaffected` or `affected`",
                other
            )),
        }
    }
}
