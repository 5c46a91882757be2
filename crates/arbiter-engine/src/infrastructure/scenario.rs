//! Deterministic scenario replay.
//!
//! A scenario is a TOML timeline of host changes: controllers appearing and
//! moving, pointer events, visibility toggles, configuration patches, and
//! engine stop/start.  [`run_scenario`] replays it against a fresh engine and
//! a [`ScriptedHost`] in *virtual* time, one frame every `frame_ms`, and
//! returns every event the engine emitted with the time it was emitted.
//!
//! Because time is virtual the same scenario always yields the same events,
//! which makes scenarios useful both as regression tests and for tuning
//! deadzone/hysteresis values offline.
//!
//! ```toml
//! frame_ms = 16
//! duration_ms = 600
//!
//! [viewport]
//! width = 800
//! height = 600
//!
//! [config]
//! sensitivity = 12
//!
//! [[steps]]
//! at = 0
//! devices = [{ index = 0, id = "Pad", axes = [0.0, 0.6, 0.0, 0.0] }]
//!
//! [[steps]]
//! at = 300
//! pointer = { kind = "move", position = { x = 10.0, y = 10.0 } }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arbiter_core::{ConfigError, ConfigPatch, DeviceSnapshot, EngineEvent, EventKind, Viewport};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::application::arbitrate::{ArbitrationEngine, EngineState};
use crate::application::event_bus::Handler;
use crate::application::ports::{HostSurface, PointerEvent};
use crate::infrastructure::host::ScriptedHost;

/// Default virtual frame interval (≈60 Hz).
pub const DEFAULT_FRAME_MS: f64 = 16.0;

/// Buttons given to a scenario device when `buttons` is omitted.
const STANDARD_BUTTON_COUNT: usize = 17;

/// Error type for loading and replaying scenarios.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("I/O error reading scenario at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("frame_ms must be a positive number of milliseconds that fits a Duration, got {0}")]
    InvalidFrameInterval(f64),

    #[error("duration_ms must be a finite, non-negative number, got {0}")]
    InvalidDuration(f64),

    #[error("step at {at} ms has a non-finite or negative time")]
    InvalidStepTime { at: f64 },

    /// The scenario's base configuration is invalid.
    #[error("invalid scenario config: {0}")]
    Config(#[from] ConfigError),

    /// A timed config patch was rejected by the engine.
    #[error("config patch at {at} ms rejected: {source}")]
    StepConfig {
        at: f64,
        #[source]
        source: ConfigError,
    },
}

// ── Scenario schema ───────────────────────────────────────────────────────────

/// A controller as written in a scenario file.
///
/// Buttons are given as a count plus the indices held down, which keeps
/// scenario files short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDevice {
    pub index: u32,
    pub id: String,
    #[serde(default = "default_true")]
    pub connected: bool,
    #[serde(default = "default_mapping")]
    pub mapping: String,
    #[serde(default)]
    pub axes: Vec<f64>,
    #[serde(default = "default_button_count")]
    pub buttons: usize,
    /// Indices of held buttons.
    #[serde(default)]
    pub pressed: Vec<usize>,
}

impl ScenarioDevice {
    pub fn to_snapshot(&self) -> DeviceSnapshot {
        let mut snapshot = DeviceSnapshot::new(self.index, self.id.clone())
            .with_axes(self.axes.clone())
            .with_buttons(self.buttons, &self.pressed);
        snapshot.mapping.clone_from(&self.mapping);
        snapshot.connected = self.connected;
        snapshot
    }
}

/// One timed change.  Every field except `at` is optional; the ones present
/// are applied in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Virtual time (ms) at which the step applies.
    pub at: f64,
    /// Replaces the controllers the host reports.
    #[serde(default)]
    pub devices: Option<Vec<ScenarioDevice>>,
    /// Makes device enumeration fail with this message until the next
    /// `devices` step.
    #[serde(default)]
    pub fail_snapshot: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub config: Option<ConfigPatch>,
    #[serde(default)]
    pub pointer: Option<PointerEvent>,
    #[serde(default)]
    pub stop: bool,
    #[serde(default)]
    pub start: bool,
}

/// A full replayable timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub viewport: Viewport,
    /// Config patch applied when the engine is created.
    #[serde(default)]
    pub config: ConfigPatch,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    /// Last virtual time to simulate.  Defaults to one frame past the last step.
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default = "default_true")]
    pub has_ui: bool,
    #[serde(default = "default_true")]
    pub device_api: bool,
    /// Start the engine at t = 0.
    #[serde(default = "default_true")]
    pub autostart: bool,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

fn default_true() -> bool {
    true
}
fn default_mapping() -> String {
    "standard".to_string()
}
fn default_button_count() -> usize {
    STANDARD_BUTTON_COUNT
}
fn default_frame_ms() -> f64 {
    DEFAULT_FRAME_MS
}

/// An emitted event stamped with the virtual time it was emitted at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    pub at: f64,
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub events: Vec<RecordedEvent>,
    /// Number of frames the engine actually ticked.
    pub frames: u64,
    pub final_state: EngineState,
}

impl ScenarioReport {
    /// Events of one kind, in emission order.
    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &RecordedEvent> {
        self.events.iter().filter(move |e| e.event.kind() == kind)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses a scenario from TOML text.
///
/// # Errors
///
/// Returns [`ScenarioError::Parse`] if the TOML is malformed.
pub fn parse_scenario(text: &str) -> Result<Scenario, ScenarioError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the scenario at `path`.
///
/// # Errors
///
/// Returns [`ScenarioError::Io`] if the file cannot be read, plus anything
/// [`parse_scenario`] reports.
pub fn load_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scenario(&text)
}

// ── Replay ────────────────────────────────────────────────────────────────────

/// A scenario being replayed, one frame at a time.
///
/// [`run_scenario`] drives it to completion in one go; a caller that wants
/// wall-clock pacing calls [`Replay::advance`] on its own timer.
pub struct Replay {
    host: Arc<ScriptedHost>,
    engine: ArbitrationEngine,
    log: Arc<Mutex<Vec<RecordedEvent>>>,
    steps: Vec<ScenarioStep>,
    next_step: usize,
    frame_ms: f64,
    frame_interval: Duration,
    end_ms: f64,
    frame_index: u64,
    ticked: u64,
}

impl Replay {
    /// Builds the host and engine for `scenario`.
    ///
    /// `base` is layered under the scenario's own `config`, so a config file
    /// supplies defaults that the scenario may override.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidFrameInterval`],
    /// [`ScenarioError::InvalidDuration`] or
    /// [`ScenarioError::InvalidStepTime`] for malformed timing, and
    /// [`ScenarioError::Config`] if the merged configuration is invalid.
    pub fn new(scenario: Scenario, base: &ConfigPatch) -> Result<Self, ScenarioError> {
        if !scenario.frame_ms.is_finite() || scenario.frame_ms <= 0.0 {
            return Err(ScenarioError::InvalidFrameInterval(scenario.frame_ms));
        }
        let frame_interval = Duration::try_from_secs_f64(scenario.frame_ms / 1000.0)
            .map_err(|_| ScenarioError::InvalidFrameInterval(scenario.frame_ms))?;
        if let Some(duration) = scenario.duration_ms {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ScenarioError::InvalidDuration(duration));
            }
        }
        if let Some(bad) = scenario
            .steps
            .iter()
            .find(|s| !s.at.is_finite() || s.at < 0.0)
        {
            return Err(ScenarioError::InvalidStepTime { at: bad.at });
        }

        let mut steps = scenario.steps;
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        let last_step = steps.last().map_or(0.0, |s| s.at);
        let end_ms = scenario
            .duration_ms
            .unwrap_or(last_step + scenario.frame_ms);

        let mut host = ScriptedHost::new().with_viewport(scenario.viewport);
        if !scenario.has_ui {
            host = host.without_ui();
        }
        if !scenario.device_api {
            host = host.without_device_api();
        }
        let host = Arc::new(host);

        let patch = base.clone().overlay(&scenario.config);
        let mut engine = ArbitrationEngine::new(&patch, host.ports())?;

        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder: Handler = {
            let log = Arc::clone(&log);
            let clock = Arc::clone(&host);
            Arc::new(move |event: &EngineEvent| {
                let at = clock.now();
                log.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(RecordedEvent {
                        at,
                        event: event.clone(),
                    });
            })
        };
        for kind in EventKind::ALL {
            engine.on(kind, Arc::clone(&recorder));
        }

        if scenario.autostart {
            engine.start();
        }
        debug!(steps = steps.len(), end_ms, "scenario replay prepared");

        Ok(Self {
            host,
            engine,
            log,
            steps,
            next_step: 0,
            frame_ms: scenario.frame_ms,
            frame_interval,
            end_ms,
            frame_index: 0,
            ticked: 0,
        })
    }

    /// Wall-clock length of one virtual frame.
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Applies the steps due by the next frame and fires it.
    ///
    /// Returns `Ok(false)` once the timeline is past `duration_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::StepConfig`] if a step's config patch is
    /// rejected.
    pub fn advance(&mut self) -> Result<bool, ScenarioError> {
        let now = self.frame_index as f64 * self.frame_ms;
        if now > self.end_ms {
            return Ok(false);
        }

        while let Some(step) = self.steps.get(self.next_step) {
            if step.at > now {
                break;
            }
            let step = step.clone();
            self.next_step += 1;
            self.apply(&step)?;
        }

        if self.host.fire_frame(&mut self.engine, now) {
            self.ticked += 1;
        }
        self.frame_index += 1;
        Ok(true)
    }

    fn apply(&mut self, step: &ScenarioStep) -> Result<(), ScenarioError> {
        self.host.set_now(step.at);

        if let Some(devices) = &step.devices {
            self.host
                .set_devices(devices.iter().map(ScenarioDevice::to_snapshot).collect());
        }
        if let Some(reason) = &step.fail_snapshot {
            self.host.fail_snapshots(reason);
        }
        if let Some(hidden) = step.hidden {
            self.host.set_hidden(hidden);
        }
        if let Some(patch) = &step.config {
            self.engine
                .set_config(patch)
                .map_err(|source| ScenarioError::StepConfig {
                    at: step.at,
                    source,
                })?;
        }
        if let Some(event) = step.pointer {
            self.host.deliver_pointer(&mut self.engine, event, step.at);
        }
        if step.stop {
            self.engine.stop();
        }
        if step.start {
            self.engine.start();
        }
        Ok(())
    }

    /// Ends the replay and collects what happened.
    pub fn finish(self) -> ScenarioReport {
        let events = std::mem::take(&mut *self.log.lock().unwrap_or_else(PoisonError::into_inner));
        info!(
            events = events.len(),
            frames = self.ticked,
            "scenario replay finished"
        );
        ScenarioReport {
            events,
            frames: self.ticked,
            final_state: self.engine.state(),
        }
    }
}

/// Replays `scenario` to completion in virtual time.
///
/// # Errors
///
/// See [`Replay::new`] and [`Replay::advance`].
pub fn run_scenario(scenario: Scenario, base: &ConfigPatch) -> Result<ScenarioReport, ScenarioError> {
    let mut replay = Replay::new(scenario, base)?;
    while replay.advance()? {}
    Ok(replay.finish())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::Ownership;

    #[test]
    fn test_parse_minimal_scenario_uses_defaults() {
        let scenario = parse_scenario("").expect("empty scenario parses");

        assert_eq!(scenario.frame_ms, DEFAULT_FRAME_MS);
        assert_eq!(scenario.viewport, Viewport::default());
        assert!(scenario.autostart);
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn test_scenario_device_expands_pressed_indices() {
        let device: ScenarioDevice =
            toml::from_str(r#"index = 1
id = "Pad"
pressed = [0, 2]"#)
                .unwrap();

        let snapshot = device.to_snapshot();

        assert_eq!(snapshot.buttons.len(), STANDARD_BUTTON_COUNT);
        assert!(snapshot.is_pressed(0));
        assert!(!snapshot.is_pressed(1));
        assert!(snapshot.is_pressed(2));
        assert_eq!(snapshot.mapping, "standard");
    }

    #[test]
    fn test_zero_frame_interval_is_rejected() {
        let scenario = parse_scenario("frame_ms = 0").unwrap();

        let result = run_scenario(scenario, &ConfigPatch::new());

        assert!(matches!(result, Err(ScenarioError::InvalidFrameInterval(_))));
    }

    #[test]
    fn test_frame_interval_too_large_for_duration_is_rejected() {
        // Arrange
        let scenario = parse_scenario("frame_ms = 1e300").unwrap();

        // Act
        let result = Replay::new(scenario, &ConfigPatch::new());

        // Assert
        assert!(matches!(result, Err(ScenarioError::InvalidFrameInterval(ms)) if ms == 1e300));
    }

    #[test]
    fn test_non_finite_duration_is_rejected() {
        for text in ["duration_ms = nan", "duration_ms = inf", "duration_ms = -16"] {
            // Arrange
            let scenario = parse_scenario(text).unwrap();

            // Act
            let result = Replay::new(scenario, &ConfigPatch::new());

            // Assert
            assert!(
                matches!(result, Err(ScenarioError::InvalidDuration(_))),
                "{text} must be rejected"
            );
        }
    }

    #[test]
    fn test_frame_interval_matches_frame_ms() {
        let scenario = parse_scenario("frame_ms = 8\nduration_ms = 16").unwrap();

        let replay = Replay::new(scenario, &ConfigPatch::new()).unwrap();

        assert_eq!(replay.frame_interval(), Duration::from_millis(8));
    }

    #[test]
    fn test_negative_step_time_is_rejected() {
        let scenario = parse_scenario("[[steps]]\nat = -5").unwrap();

        let result = run_scenario(scenario, &ConfigPatch::new());

        assert!(matches!(result, Err(ScenarioError::InvalidStepTime { .. })));
    }

    #[test]
    fn test_rejected_step_config_reports_time() {
        let scenario = parse_scenario(
            r#"
[[steps]]
at = 32
config = { deadzone = 7.0 }
"#,
        )
        .unwrap();

        let result = run_scenario(scenario, &ConfigPatch::new());

        assert!(matches!(result, Err(ScenarioError::StepConfig { at, .. }) if at == 32.0));
    }

    #[test]
    fn test_replay_without_steps_only_enables() {
        let scenario = parse_scenario("duration_ms = 48").unwrap();

        let report = run_scenario(scenario, &ConfigPatch::new()).unwrap();

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].event.kind(), EventKind::EnabledChange);
        assert_eq!(report.frames, 4);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let text = r#"
duration_ms = 400
[[steps]]
at = 0
devices = [{ index = 0, id = "Pad", axes = [0.5, 0.0, 0.0, 0.0] }]
"#;

        let first = run_scenario(parse_scenario(text).unwrap(), &ConfigPatch::new()).unwrap();
        let second = run_scenario(parse_scenario(text).unwrap(), &ConfigPatch::new()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.final_state.ownership, Ownership::SecondaryOwned);
    }

    #[test]
    fn test_scenario_config_overrides_base_patch() {
        let scenario = parse_scenario("[config]\nsensitivity = 3.0").unwrap();
        let base = ConfigPatch::new().sensitivity(20.0).deadzone(0.3);

        let report = run_scenario(scenario, &base).unwrap();

        assert_eq!(report.final_state.config.sensitivity, 3.0);
        assert_eq!(report.final_state.config.deadzone, 0.3);
    }

    #[test]
    fn test_recorded_event_serializes_flat() {
        let recorded = RecordedEvent {
            at: 16.0,
            event: EngineEvent::ButtonChange {
                name: "south".to_string(),
                pressed: true,
            },
        };

        let value = serde_json::to_value(&recorded).unwrap();

        assert_eq!(
            value,
            serde_json::json!({ "at": 16.0, "type": "buttonChange", "name": "south", "pressed": true })
        );
    }
}
