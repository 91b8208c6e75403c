use crate::error::{IncubatorError, Result};
use crate::model::default_run_at;
use crate::paths;
use crate::types::Species;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Inclusive physical range for a measured or requested value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN and infinities are never contained.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Setpoints and incubator-wide average temperature.
    #[serde(default = "default_temperature_bounds")]
    pub temperature: Bounds,
    #[serde(default = "default_humidity_bounds")]
    pub humidity: Bounds,
    /// Individual sensor temperature; wider than the average range.
    #[serde(default = "default_sensor_temperature_bounds")]
    pub sensor_temperature: Bounds,
}

fn default_temperature_bounds() -> Bounds {
    Bounds::new(0.0, 50.0)
}

fn default_humidity_bounds() -> Bounds {
    Bounds::new(0.0, 100.0)
}

fn default_sensor_temperature_bounds() -> Bounds {
    Bounds::new(-50.0, 100.0)
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            temperature: default_temperature_bounds(),
            humidity: default_humidity_bounds(),
            sensor_temperature: default_sensor_temperature_bounds(),
        }
    }
}

impl Limits {
    pub fn check_temperature(&self, value: f64) -> Result<f64> {
        if self.temperature.contains(value) {
            Ok(value)
        } else {
            Err(IncubatorError::InvalidSetpoint(format!(
                "temperature {value} outside {}..={}",
                self.temperature.min, self.temperature.max
            )))
        }
    }

    pub fn check_humidity(&self, value: f64) -> Result<f64> {
        if self.humidity.contains(value) {
            Ok(value)
        } else {
            Err(IncubatorError::InvalidSetpoint(format!(
                "humidity {value} outside {}..={}",
                self.humidity.min, self.humidity.max
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Values substituted when a stored setpoint is missing or garbled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,
    #[serde(default = "default_target_humidity")]
    pub target_humidity: f64,
    #[serde(default = "default_species")]
    pub species: Species,
    #[serde(default = "default_cycle_length_days")]
    pub cycle_length_days: u32,
    #[serde(default = "default_stepper_count")]
    pub stepper_count: i32,
}

fn default_target_temperature() -> f64 {
    37.5
}

fn default_target_humidity() -> f64 {
    45.0
}

fn default_species() -> Species {
    Species::Poule
}

fn default_cycle_length_days() -> u32 {
    21
}

fn default_stepper_count() -> i32 {
    3
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            target_temperature: default_target_temperature(),
            target_humidity: default_target_humidity(),
            species: default_species(),
            cycle_length_days: default_cycle_length_days(),
            stepper_count: default_stepper_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActuatorPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorPolicy {
    /// Days after the start date from which the humidity setpoint is raised.
    #[serde(default = "default_late_stage_after_days")]
    pub late_stage_after_days: i64,
    #[serde(default = "default_late_stage_humidity_offset")]
    pub late_stage_humidity_offset: f64,
}

fn default_late_stage_after_days() -> i64 {
    20
}

fn default_late_stage_humidity_offset() -> f64 {
    10.0
}

impl Default for ActuatorPolicy {
    fn default() -> Self {
        Self {
            late_stage_after_days: default_late_stage_after_days(),
            late_stage_humidity_offset: default_late_stage_humidity_offset(),
        }
    }
}

// ---------------------------------------------------------------------------
// StepperPolicy
// ---------------------------------------------------------------------------

/// Longest pulse that still fits one hourly cycle.
pub const MAX_PULSE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepperPolicy {
    /// Length of the activation pulse measured from the scheduled boundary.
    #[serde(default = "default_pulse_minutes")]
    pub pulse_minutes: i64,
    /// Boundary used when no schedule has been stored yet.
    #[serde(default = "default_run_at")]
    pub default_run_at: NaiveTime,
}

fn default_pulse_minutes() -> i64 {
    2
}

impl Default for StepperPolicy {
    fn default() -> Self {
        Self {
            pulse_minutes: default_pulse_minutes(),
            default_run_at: default_run_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub actuator: ActuatorPolicy,
    #[serde(default)]
    pub stepper: StepperPolicy,
    #[serde(default)]
    pub limits: Limits,
}

fn default_version() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            defaults: Defaults::default(),
            actuator: ActuatorPolicy::default(),
            stepper: StepperPolicy::default(),
            limits: Limits::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(IncubatorError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Every range must be non-empty
        for (name, bounds) in [
            ("temperature", self.limits.temperature),
            ("humidity", self.limits.humidity),
            ("sensor_temperature", self.limits.sensor_temperature),
        ] {
            if !(bounds.min.is_finite() && bounds.max.is_finite()) || bounds.min > bounds.max {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "limits.{name}: range {}..={} is empty",
                        bounds.min, bounds.max
                    ),
                });
            }
        }

        // 2. Fallback setpoints must themselves be acceptable
        if !self.limits.temperature.contains(self.defaults.target_temperature) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "defaults.target_temperature {} is outside limits.temperature",
                    self.defaults.target_temperature
                ),
            });
        }
        if !self.limits.humidity.contains(self.defaults.target_humidity) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "defaults.target_humidity {} is outside limits.humidity",
                    self.defaults.target_humidity
                ),
            });
        }

        // 3. Late-stage humidity should still be reachable
        let late = self.defaults.target_humidity + self.actuator.late_stage_humidity_offset;
        if late > self.limits.humidity.max {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "late-stage humidity setpoint {late} exceeds limits.humidity.max {}; \
                     the humidifier will never switch off after day {}",
                    self.limits.humidity.max, self.actuator.late_stage_after_days
                ),
            });
        }

        // 4. Stepper cadence
        if self.defaults.stepper_count <= 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "defaults.stepper_count must be positive".to_string(),
            });
        } else {
            let slot_minutes = 60 / i64::from(self.defaults.stepper_count);
            if self.stepper.pulse_minutes >= slot_minutes {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "stepper.pulse_minutes ({}) is not shorter than the {slot_minutes}-minute \
                         slot for {} steppers",
                        self.stepper.pulse_minutes, self.defaults.stepper_count
                    ),
                });
            }
        }
        if self.stepper.pulse_minutes < 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "stepper.pulse_minutes must not be negative".to_string(),
            });
        } else if self.stepper.pulse_minutes > MAX_PULSE_MINUTES {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "stepper.pulse_minutes ({}) exceeds {MAX_PULSE_MINUTES}",
                    self.stepper.pulse_minutes
                ),
            });
        }

        if self.defaults.cycle_length_days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "defaults.cycle_length_days must be positive".to_string(),
            });
        }

        warnings
    }
}
