//! Configuration – reads/writes `~/.rover/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rover_hal::MotorPins;
use rover_kernel::DetectorConfig;
use rover_types::RoverError;
use tracing::warn;

/// Which ports the rig is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Hardware {
    /// Simulated H-bridge and ranger; no hardware required.
    #[default]
    Sim,
    /// Linux sysfs GPIO (Raspberry Pi).
    Gpio,
}

impl std::fmt::Display for Hardware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hardware::Sim => write!(f, "sim"),
            Hardware::Gpio => write!(f, "gpio"),
        }
    }
}

impl std::str::FromStr for Hardware {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sim" => Ok(Hardware::Sim),
            "gpio" => Ok(Hardware::Gpio),
            other => Err(format!("unknown hardware backend '{other}'")),
        }
    }
}

/// BCM pin assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pins {
    #[serde(default = "default_left_a")]
    pub left_a: u32,
    #[serde(default = "default_left_b")]
    pub left_b: u32,
    #[serde(default = "default_right_a")]
    pub right_a: u32,
    #[serde(default = "default_right_b")]
    pub right_b: u32,
    /// Ultrasonic trigger line.
    #[serde(default = "default_trigger")]
    pub trigger: u32,
    /// Ultrasonic echo line.
    #[serde(default = "default_echo")]
    pub echo: u32,
}

impl Pins {
    pub fn motor_pins(&self) -> MotorPins {
        MotorPins {
            left_a: self.left_a,
            left_b: self.left_b,
            right_a: self.right_a,
            right_b: self.right_b,
        }
    }
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            left_a: default_left_a(),
            left_b: default_left_b(),
            right_a: default_right_a(),
            right_b: default_right_b(),
            trigger: default_trigger(),
            echo: default_echo(),
        }
    }
}

/// Persisted configuration stored in `~/.rover/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Obstacle sampling period in milliseconds.
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,

    /// Minimum forward clearance in centimetres.
    #[serde(default = "default_min_distance_cm")]
    pub min_distance_cm: f64,

    /// Whether the obstacle interlock starts enabled.
    #[serde(default = "default_avoidance_enabled")]
    pub avoidance_enabled: bool,

    #[serde(default)]
    pub hardware: Hardware,

    #[serde(default)]
    pub pins: Pins,

    /// Upper bound on each phase of an ultrasonic echo wait.
    #[serde(default = "default_echo_timeout_ms")]
    pub echo_timeout_ms: u64,
}

fn default_sample_period_ms() -> u64 {
    100
}
fn default_min_distance_cm() -> f64 {
    30.0
}
fn default_avoidance_enabled() -> bool {
    true
}
fn default_echo_timeout_ms() -> u64 {
    30
}
fn default_left_a() -> u32 {
    5
}
fn default_left_b() -> u32 {
    6
}
fn default_right_a() -> u32 {
    13
}
fn default_right_b() -> u32 {
    26
}
fn default_trigger() -> u32 {
    12
}
fn default_echo() -> u32 {
    16
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period_ms(),
            min_distance_cm: default_min_distance_cm(),
            avoidance_enabled: default_avoidance_enabled(),
            hardware: Hardware::default(),
            pins: Pins::default(),
            echo_timeout_ms: default_echo_timeout_ms(),
        }
    }
}

impl Config {
    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            sample_period: Duration::from_millis(self.sample_period_ms),
            min_distance_cm: self.min_distance_cm,
        }
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    /// Replace out-of-range fields with their defaults.
    ///
    /// Returns one [`RoverError::Config`] per field that was reset.  A zero
    /// period would make the sampling loop spin, and a NaN or negative
    /// distance would never register an obstacle.
    pub fn sanitize(&mut self) -> Vec<RoverError> {
        let mut reset = Vec::new();
        if !valid_period_ms(self.sample_period_ms) {
            reset.push(RoverError::Config(format!(
                "sample_period_ms = {} must be positive; using {}",
                self.sample_period_ms,
                default_sample_period_ms()
            )));
            self.sample_period_ms = default_sample_period_ms();
        }
        if !valid_distance_cm(self.min_distance_cm) {
            reset.push(RoverError::Config(format!(
                "min_distance_cm = {} must be a finite, non-negative number; using {}",
                self.min_distance_cm,
                default_min_distance_cm()
            )));
            self.min_distance_cm = default_min_distance_cm();
        }
        if self.echo_timeout_ms == 0 {
            reset.push(RoverError::Config(format!(
                "echo_timeout_ms = 0 must be positive; using {}",
                default_echo_timeout_ms()
            )));
            self.echo_timeout_ms = default_echo_timeout_ms();
        }
        reset
    }
}

fn valid_period_ms(ms: u64) -> bool {
    ms > 0
}

fn valid_distance_cm(cm: f64) -> bool {
    cm.is_finite() && cm >= 0.0
}

/// Return the path to `~/.rover/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, RoverError> {
    load_from(&config_path())
}

/// Load the config from a specific path.
///
/// Out-of-range values are reset to their defaults with a warning.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RoverError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RoverError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| RoverError::Config(format!("Failed to parse config: {}", e)))?;
    for problem in cfg.sanitize() {
        warn!(path = %path.display(), error = %problem, "invalid config value replaced");
    }
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_SAMPLE_PERIOD_MS` | `sample_period_ms` |
/// | `ROVER_MIN_DISTANCE_CM` | `min_distance_cm` |
/// | `ROVER_HARDWARE` | `hardware` (`sim` / `gpio`) |
/// | `ROVER_AVOIDANCE` | `avoidance_enabled` (`on` / `off`) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Override logic with an injectable lookup, so tests need not touch the
/// process environment.
pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROVER_SAMPLE_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
        && valid_period_ms(ms)
    {
        cfg.sample_period_ms = ms;
    }
    if let Some(v) = lookup("ROVER_MIN_DISTANCE_CM")
        && let Ok(cm) = v.trim().parse::<f64>()
        && valid_distance_cm(cm)
    {
        cfg.min_distance_cm = cm;
    }
    if let Some(v) = lookup("ROVER_HARDWARE")
        && let Ok(hw) = v.parse::<Hardware>()
    {
        cfg.hardware = hw;
    }
    if let Some(v) = lookup("ROVER_AVOIDANCE") {
        match v.trim().to_lowercase().as_str() {
            "on" | "true" | "1" => cfg.avoidance_enabled = true,
            "off" | "false" | "0" => cfg.avoidance_enabled = false,
            _ => {}
        }
    }
}

/// Save the config to disk, creating `~/.rover/` if necessary.
pub fn save(cfg: &Config) -> Result<(), RoverError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RoverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RoverError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RoverError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(path, raw).map_err(|e| {
        RoverError::Config(format!("Failed to write {}: {}", path.display(), e))
    })
}
