use crate::error::IncubatorError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Switch
// ---------------------------------------------------------------------------

/// Command sent to a single actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Switch {
    On,
    #[default]
    Off,
}

impl Switch {
    pub fn from_bool(on: bool) -> Self {
        if on {
            Switch::On
        } else {
            Switch::Off
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Switch::On => "ON",
            Switch::Off => "OFF",
        }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Switch {
    type Err = IncubatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ON" | "TRUE" | "1" => Ok(Switch::On),
            "OFF" | "FALSE" | "0" => Ok(Switch::Off),
            _ => Err(IncubatorError::InvalidSetpoint(format!(
                "'{s}' is not ON or OFF"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

/// Bird species being incubated. Anything unrecognised collapses to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Poule,
    Canne,
    Oie,
    Caille,
    #[serde(other)]
    Other,
}

impl Species {
    pub fn all() -> &'static [Species] {
        &[
            Species::Poule,
            Species::Canne,
            Species::Oie,
            Species::Caille,
            Species::Other,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Species::Poule => "poule",
            Species::Canne => "canne",
            Species::Oie => "oie",
            Species::Caille => "caille",
            Species::Other => "other",
        }
    }

    /// Lenient parse used for operator input: case-insensitive, never fails.
    pub fn parse(s: &str) -> Species {
        match s.trim().to_ascii_lowercase().as_str() {
            "poule" => Species::Poule,
            "canne" => Species::Canne,
            "oie" => Species::Oie,
            "caille" => Species::Caille,
            _ => Species::Other,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActuatorStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub fan: Switch,
    pub humidifier: Switch,
}

impl ActuatorStatus {
    /// Both actuators off; returned whenever a baseline record is missing.
    pub fn all_off() -> Self {
        Self::default()
    }
}
