//! Arbitration engine configuration.
//!
//! [`ArbiterConfig`] is an immutable snapshot of every tunable the engine
//! reads.  Changes arrive as a [`ConfigPatch`] (every field optional) and are
//! shallow-merged into a *new* `ArbiterConfig`, so anyone still holding the
//! previous snapshot never observes a change.
//!
//! # Key names
//!
//! Keys serialize in camelCase so a config written for a browser host reads
//! the same as one loaded from a TOML file:
//!
//! ```toml
//! deadzone = 0.2
//! sensitivity = 12
//! ownershipHysteresisMs = 100
//! devicePreference = "last-connected"
//!
//! [axisMap]
//! leftX = 0
//! leftY = 1
//! ```
//!
//! # Unknown keys
//!
//! Keys the engine does not understand are kept in `extra` and written back
//! out unchanged.  They are never interpreted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default axis magnitude below which input is ignored.
pub const DEFAULT_DEADZONE: f64 = 0.15;

/// Default axis-to-pixel scale factor.
pub const DEFAULT_SENSITIVITY: f64 = 10.0;

/// Default lead time (ms) the controller must hold over the pointer before it
/// takes ownership.
pub const DEFAULT_HYSTERESIS_MS: u64 = 75;

/// Axis name read for horizontal cursor motion.
pub const CURSOR_AXIS_X: &str = "leftX";

/// Axis name read for vertical cursor motion.
pub const CURSOR_AXIS_Y: &str = "leftY";

/// Errors produced when building or merging a configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A known key carries a value outside its accepted range.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// `devicePreference` is neither a known policy nor an index.
    #[error("unknown device preference {0:?}: expected \"first\", \"last-connected\" or a device index")]
    UnknownDevicePreference(String),
}

// ── Device preference ─────────────────────────────────────────────────────────

/// Policy for choosing which connected controller drives the cursor.
///
/// Evaluated against the deduplicated connected-device set in connection
/// order, never against the raw order of a host snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PreferenceRepr", into = "PreferenceRepr")]
pub enum DevicePreference {
    /// The controller that has been connected the longest.
    #[default]
    First,
    /// The most recently connected controller.
    LastConnected,
    /// The controller the host reports at this slot index.
    Index(u32),
}

/// Wire form of [`DevicePreference`]: a policy string or a bare integer.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PreferenceRepr {
    Index(u32),
    Policy(String),
}

impl TryFrom<PreferenceRepr> for DevicePreference {
    type Error = ConfigError;

    fn try_from(repr: PreferenceRepr) -> Result<Self, Self::Error> {
        match repr {
            PreferenceRepr::Index(index) => Ok(DevicePreference::Index(index)),
            PreferenceRepr::Policy(policy) => policy.parse(),
        }
    }
}

impl From<DevicePreference> for PreferenceRepr {
    fn from(pref: DevicePreference) -> Self {
        match pref {
            DevicePreference::Index(index) => PreferenceRepr::Index(index),
            other => PreferenceRepr::Policy(other.to_string()),
        }
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(DevicePreference::First),
            "last-connected" => Ok(DevicePreference::LastConnected),
            other => other
                .parse::<u32>()
                .map(DevicePreference::Index)
                .map_err(|_| ConfigError::UnknownDevicePreference(other.to_string())),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::First => f.write_str("first"),
            DevicePreference::LastConnected => f.write_str("last-connected"),
            DevicePreference::Index(index) => write!(f, "{index}"),
        }
    }
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Complete, validated engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbiterConfig {
    /// Axis name → axis index in the controller snapshot.
    #[serde(default = "default_axis_map")]
    pub axis_map: BTreeMap<String, usize>,
    /// Button name → button index in the controller snapshot.
    #[serde(default = "default_button_map")]
    pub button_map: BTreeMap<String, usize>,
    /// Minimum absolute axis value that counts as input.
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    /// Pixels per frame at full axis deflection.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Lead (ms) controller activity must hold over pointer activity.
    #[serde(default = "default_hysteresis_ms")]
    pub ownership_hysteresis_ms: u64,
    #[serde(default)]
    pub device_preference: DevicePreference,
    /// When `false` the controller may own input but never moves the cursor.
    #[serde(default = "default_true")]
    pub pointer_enabled: bool,
    /// Skip frame processing while the host surface is hidden.
    #[serde(default = "default_true")]
    pub pause_when_hidden: bool,
    /// Keys the engine does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A partial configuration: every absent field keeps its current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_map: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_map: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadzone: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_hysteresis_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_preference: Option<DevicePreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_when_hidden: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_axis_map() -> BTreeMap<String, usize> {
    [(CURSOR_AXIS_X, 0), (CURSOR_AXIS_Y, 1), ("rightX", 2), ("rightY", 3)]
        .into_iter()
        .map(|(name, index)| (name.to_string(), index))
        .collect()
}

/// Standard gamepad layout (W3C "standard" mapping order).
fn default_button_map() -> BTreeMap<String, usize> {
    [
        "south",
        "east",
        "west",
        "north",
        "leftBumper",
        "rightBumper",
        "leftTrigger",
        "rightTrigger",
        "select",
        "start",
        "leftStick",
        "rightStick",
        "dpadUp",
        "dpadDown",
        "dpadLeft",
        "dpadRight",
        "home",
    ]
    .into_iter()
    .enumerate()
    .map(|(index, name)| (name.to_string(), index))
    .collect()
}

fn default_deadzone() -> f64 {
    DEFAULT_DEADZONE
}
fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}
fn default_hysteresis_ms() -> u64 {
    DEFAULT_HYSTERESIS_MS
}
fn default_true() -> bool {
    true
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            axis_map: default_axis_map(),
            button_map: default_button_map(),
            deadzone: default_deadzone(),
            sensitivity: default_sensitivity(),
            ownership_hysteresis_ms: default_hysteresis_ms(),
            device_preference: DevicePreference::default(),
            pointer_enabled: true,
            pause_when_hidden: true,
            extra: BTreeMap::new(),
        }
    }
}

impl ArbiterConfig {
    /// Returns a new configuration with `patch` shallow-merged over `self`.
    ///
    /// Map-valued keys (`axisMap`, `buttonMap`) are replaced whole, not merged
    /// entry by entry.  Unknown keys are merged key by key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the merged result fails
    /// [`validate`](Self::validate); `self` is never modified.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        if let Some(axis_map) = &patch.axis_map {
            next.axis_map = axis_map.clone();
        }
        if let Some(button_map) = &patch.button_map {
            next.button_map = button_map.clone();
        }
        if let Some(deadzone) = patch.deadzone {
            next.deadzone = deadzone;
        }
        if let Some(sensitivity) = patch.sensitivity {
            next.sensitivity = sensitivity;
        }
        if let Some(ms) = patch.ownership_hysteresis_ms {
            next.ownership_hysteresis_ms = ms;
        }
        if let Some(pref) = patch.device_preference {
            next.device_preference = pref;
        }
        if let Some(enabled) = patch.pointer_enabled {
            next.pointer_enabled = enabled;
        }
        if let Some(pause) = patch.pause_when_hidden {
            next.pause_when_hidden = pause;
        }
        for (key, value) in &patch.extra {
            next.extra.insert(key.clone(), value.clone());
        }
        next.validate()?;
        Ok(next)
    }

    /// Checks that every numeric knob is usable.
    ///
    /// # Errors
    ///
    /// - `deadzone` must be finite and within `[0, 1]`.
    /// - `sensitivity` must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.deadzone.is_finite() || !(0.0..=1.0).contains(&self.deadzone) {
            return Err(ConfigError::Invalid {
                key: "deadzone",
                reason: format!("{} is outside [0, 1]", self.deadzone),
            });
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(ConfigError::Invalid {
                key: "sensitivity",
                reason: format!("{} is not a finite, non-negative number", self.sensitivity),
            });
        }
        Ok(())
    }

    /// Index of the named axis, if mapped.
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axis_map.get(name).copied()
    }

    /// Hysteresis window in the engine's millisecond timestamp unit.
    pub fn hysteresis_window(&self) -> f64 {
        self.ownership_hysteresis_ms as f64
    }
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadzone(mut self, deadzone: f64) -> Self {
        self.deadzone = Some(deadzone);
        self
    }

    pub fn sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    pub fn hysteresis_ms(mut self, ms: u64) -> Self {
        self.ownership_hysteresis_ms = Some(ms);
        self
    }

    pub fn device_preference(mut self, pref: DevicePreference) -> Self {
        self.device_preference = Some(pref);
        self
    }

    pub fn pointer_enabled(mut self, enabled: bool) -> Self {
        self.pointer_enabled = Some(enabled);
        self
    }

    pub fn pause_when_hidden(mut self, pause: bool) -> Self {
        self.pause_when_hidden = Some(pause);
        self
    }

    pub fn button_map<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        self.button_map = Some(entries.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Returns `true` when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == ConfigPatch::default()
    }

    /// Layers `top` over `self`: any key set in `top` wins.
    pub fn overlay(mut self, top: &ConfigPatch) -> Self {
        if top.axis_map.is_some() {
            self.axis_map = top.axis_map.clone();
        }
        if top.button_map.is_some() {
            self.button_map = top.button_map.clone();
        }
        self.deadzone = top.deadzone.or(self.deadzone);
        self.sensitivity = top.sensitivity.or(self.sensitivity);
        self.ownership_hysteresis_ms = top.ownership_hysteresis_ms.or(self.ownership_hysteresis_ms);
        self.device_preference = top.device_preference.or(self.device_preference);
        self.pointer_enabled = top.pointer_enabled.or(self.pointer_enabled);
        self.pause_when_hidden = top.pause_when_hidden.or(self.pause_when_hidden);
        for (key, value) in &top.extra {
            self.extra.insert(key.clone(), value.clone());
        }
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
