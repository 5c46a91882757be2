//! ArbitrationEngine: decides, frame by frame, who owns the virtual cursor.
//!
//! The engine is the heart of the crate.  Once per display frame the host
//! calls [`ArbitrationEngine::tick`], and the engine:
//!
//! 1. Rescans connected controllers (at most every [`SCAN_INTERVAL_MS`]).
//! 2. Notes whether any controller shows deliberate input this frame.
//! 3. Hands ownership to the controller once its activity leads the pointer's
//!    by more than the hysteresis window.
//! 4. While the controller owns the cursor, moves it by the left stick and
//!    reports button presses and releases.
//!
//! Pointer activity arrives out of band through
//! [`ArbitrationEngine::handle_pointer`] and reclaims ownership immediately.
//!
//! # Architecture
//!
//! The engine depends only on the host-port traits in [`super::ports`] and on
//! domain types from `arbiter_core`.  Every host implementation is injected at
//! construction time, so the whole arbitration policy is unit-testable with a
//! scripted host and virtual time.
//!
//! # Time
//!
//! All timestamps are host milliseconds.  `tick(now)` must be given the same
//! clock that [`HostSurface::now`](super::ports::HostSurface::now) reads,
//! because pointer activity is stamped with the latter.

use std::collections::BTreeMap;
use std::sync::Arc;

use arbiter_core::domain::device::live_devices;
use arbiter_core::domain::signal::{cursor_delta, is_active};
use arbiter_core::{
    ArbiterConfig, ConfigError, ConfigPatch, ConnectedDevice, ConnectedSet, DevicePreference,
    DeviceSnapshot, DisableReason, EngineEvent, EventKind, Ownership, Point,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::event_bus::{EventBus, Handler};
use super::ports::{FrameHandle, HostPorts, PointerActivityKind, PointerEvent};

/// Minimum time (ms) between two device-membership scans.
pub const SCAN_INTERVAL_MS: f64 = 200.0;

/// Owned snapshot of the engine's observable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub ownership: Ownership,
    pub cursor: Point,
    /// Connected controllers in connection order.
    pub connected: Vec<ConnectedDevice>,
    pub config: ArbiterConfig,
    pub running: bool,
    pub enabled: bool,
    pub native_pointer_hidden: bool,
}

/// The arbitration engine.
///
/// Owns the configuration, the connected-device set, the ownership state and
/// the virtual cursor.  All mutation goes through `&mut self`, so one engine
/// is driven by one host loop at a time.
pub struct ArbitrationEngine {
    config: Arc<ArbiterConfig>,
    ports: HostPorts,
    bus: EventBus,

    connected: ConnectedSet,
    ownership: Ownership,
    cursor: Point,
    native_pointer_hidden: bool,
    /// Last pointer position seen on a trusted move.
    last_pointer: Option<Point>,
    last_pointer_activity: f64,
    last_secondary_activity: f64,
    last_scan: Option<f64>,
    /// Last reported pressed state per mapped button name.
    buttons: BTreeMap<String, bool>,

    pending_frame: Option<FrameHandle>,
    running: bool,
    enabled: bool,
    unavailable_announced: bool,
}

impl ArbitrationEngine {
    /// Creates an engine with `patch` merged over the default configuration.
    ///
    /// Probes [`DeviceSource::is_available`](super::ports::DeviceSource::is_available)
    /// once; nothing else on the host is touched until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the merged configuration is invalid.
    pub fn new(patch: &ConfigPatch, ports: HostPorts) -> Result<Self, ConfigError> {
        let config = ArbiterConfig::default().merged(patch)?;
        let enabled = ports.devices.is_available();
        debug!(enabled, "arbitration engine created");

        Ok(Self {
            config: Arc::new(config),
            ports,
            bus: EventBus::new(),
            connected: ConnectedSet::new(),
            ownership: Ownership::PointerOwned,
            cursor: Point::default(),
            native_pointer_hidden: false,
            last_pointer: None,
            last_pointer_activity: 0.0,
            last_secondary_activity: 0.0,
            last_scan: None,
            buttons: BTreeMap::new(),
            pending_frame: None,
            running: false,
            enabled,
            unavailable_announced: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts the frame loop.
    ///
    /// Does nothing if already running or if the host has no UI.  If the
    /// host has no controller API, emits a single
    /// `EnabledChange { enabled: false }` and stays stopped.
    pub fn start(&mut self) {
        if self.running || !self.ports.surface.has_ui() {
            return;
        }
        if !self.enabled {
            if !self.unavailable_announced {
                self.unavailable_announced = true;
                info!("controller API unavailable; arbitration disabled");
                self.emit(EngineEvent::EnabledChange {
                    enabled: false,
                    reason: Some(DisableReason::Unavailable),
                });
            }
            return;
        }

        self.running = true;
        info!("arbitration started");
        self.emit(EngineEvent::EnabledChange {
            enabled: true,
            reason: None,
        });
        self.ports.pointer.attach(&PointerActivityKind::ALL);

        if self.last_pointer.is_none() {
            let center = self.ports.surface.viewport().center();
            self.last_pointer = Some(center);
            self.cursor = center;
        }
        self.pending_frame = Some(self.ports.frames.request_frame());
    }

    /// Stops the frame loop and hands the cursor back to the pointer.
    ///
    /// Does nothing if not running.  If a subscriber panics while handling
    /// the final `OwnershipChange`, the native pointer is restored directly.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        if let Some(handle) = self.pending_frame.take() {
            self.ports.frames.cancel_frame(handle);
        }
        self.ports.pointer.detach();
        self.buttons.clear();

        let faults = self.set_ownership(Ownership::PointerOwned);
        if faults > 0 {
            warn!(faults, "ownership handler failed during stop; restoring native pointer");
            self.ports.surface.restore_native_pointer();
        }
        info!("arbitration stopped");
    }

    // ── Frame processing ──────────────────────────────────────────────────────

    /// Runs one frame at host time `now` (ms).
    ///
    /// Inert unless running.  Always requests the next frame while running,
    /// even when processing is paused because the surface is hidden.
    pub fn tick(&mut self, now: f64) {
        if !self.running {
            return;
        }
        self.pending_frame = None;

        let paused = self.config.pause_when_hidden && self.ports.surface.is_hidden();
        if self.enabled && !paused {
            self.process_frame(now);
        }

        if self.running {
            self.pending_frame = Some(self.ports.frames.request_frame());
        }
    }

    fn process_frame(&mut self, now: f64) {
        let config = Arc::clone(&self.config);

        let snapshot = match self.ports.devices.snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(%err, "device snapshot failed; treating frame as empty");
                None
            }
        };

        if let Some(snapshot) = &snapshot {
            if self.scan_due(now) {
                self.scan(snapshot, now);
            }
        }

        let devices: &[DeviceSnapshot] = snapshot.as_deref().unwrap_or_default();
        let live = live_devices(devices);

        if live.iter().any(|d| is_active(d, config.deadzone)) {
            self.last_secondary_activity = now;
        }

        if self.ownership == Ownership::PointerOwned
            && self.last_secondary_activity
                > self.last_pointer_activity + config.hysteresis_window()
        {
            let viewport = self.ports.surface.viewport();
            let seed = self.last_pointer.unwrap_or_else(|| viewport.center());
            self.cursor = viewport.clamp(seed);
            self.set_ownership(Ownership::SecondaryOwned);
        }

        if !self.ownership.is_secondary() {
            return;
        }

        let selected = select_device(&self.connected, config.device_preference, &live);

        if config.pointer_enabled {
            if let Some(device) = selected {
                self.move_cursor(device, &config);
            }
        }
        self.update_buttons(selected, &config);
    }

    fn scan_due(&self, now: f64) -> bool {
        self.last_scan
            .map_or(true, |last| now - last >= SCAN_INTERVAL_MS)
    }

    fn scan(&mut self, snapshot: &[DeviceSnapshot], now: f64) {
        self.last_scan = Some(now);
        let diff = self.connected.rescan(snapshot, now);

        if !diff.added.is_empty() {
            info!(count = diff.added.len(), "controllers connected");
            self.emit(EngineEvent::Connected {
                devices: diff.added,
            });
        }
        if !diff.removed.is_empty() {
            info!(count = diff.removed.len(), "controllers disconnected");
            self.emit(EngineEvent::Disconnected {
                removed_ids: diff.removed,
            });
        }
    }

    fn move_cursor(&mut self, device: &DeviceSnapshot, config: &ArbiterConfig) {
        let (dx, dy) = cursor_delta(device, config);
        let viewport = self.ports.surface.viewport();
        let next = viewport.clamp(self.cursor.offset(dx, dy));
        if next == self.cursor {
            return;
        }
        self.cursor = next;
        self.emit(EngineEvent::CursorChange {
            ownership: self.ownership,
            cursor: next,
        });
    }

    /// Emits one `ButtonChange` per mapped button whose state flipped.
    ///
    /// With no selected device every button reads as released.
    fn update_buttons(&mut self, device: Option<&DeviceSnapshot>, config: &ArbiterConfig) {
        for (name, &index) in &config.button_map {
            let pressed = device.is_some_and(|d| d.is_pressed(index));
            let previous = self.buttons.get(name).copied().unwrap_or(false);
            if pressed == previous {
                continue;
            }
            self.buttons.insert(name.clone(), pressed);
            self.emit(EngineEvent::ButtonChange {
                name: name.clone(),
                pressed,
            });
        }
    }

    // ── Pointer activity ──────────────────────────────────────────────────────

    /// Handles one pointer event forwarded by the host.
    ///
    /// Ignored unless running.  Untrusted (script-generated) events never
    /// count as activity.  A trusted event reclaims ownership immediately.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if !self.running {
            return;
        }
        if !event.trusted {
            debug!(kind = ?event.kind, "ignoring untrusted pointer event");
            return;
        }

        self.last_pointer_activity = self.ports.surface.now();
        if event.kind == PointerActivityKind::Move {
            if let Some(position) = event.position {
                self.last_pointer = Some(position);
            }
        }
        self.set_ownership(Ownership::PointerOwned);
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Merges `patch` into a new configuration and publishes it.
    ///
    /// Takes effect on the next tick.  Toggling `pointerEnabled` while the
    /// controller owns the cursor re-emits `OwnershipChange` so the host can
    /// show or hide its native pointer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the merged configuration is invalid; the
    /// live configuration is left unchanged.
    pub fn set_config(&mut self, patch: &ConfigPatch) -> Result<(), ConfigError> {
        let next = self.config.merged(patch)?;
        self.config = Arc::new(next);
        self.buttons
            .retain(|name, _| self.config.button_map.contains_key(name));
        debug!(?patch, "configuration updated");

        self.emit(EngineEvent::ConfigChange {
            config: ArbiterConfig::clone(&self.config),
        });

        let hidden = self.pointer_hidden_for(self.ownership);
        if hidden != self.native_pointer_hidden {
            self.native_pointer_hidden = hidden;
            self.emit(EngineEvent::OwnershipChange {
                ownership: self.ownership,
                cursor: self.cursor,
                native_pointer_hidden: hidden,
            });
        }
        Ok(())
    }

    // ── Subscriptions ─────────────────────────────────────────────────────────

    /// Subscribes `handler` to `kind`.  Returns `false` if already subscribed.
    pub fn on(&mut self, kind: EventKind, handler: Handler) -> bool {
        self.bus.subscribe(kind, handler)
    }

    /// Unsubscribes `handler` from `kind`.  Returns `false` if not subscribed.
    pub fn off(&mut self, kind: EventKind, handler: &Handler) -> bool {
        self.bus.unsubscribe(kind, handler)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        EngineState {
            ownership: self.ownership,
            cursor: self.cursor,
            connected: self.connected.devices(),
            config: ArbiterConfig::clone(&self.config),
            running: self.running,
            enabled: self.enabled,
            native_pointer_hidden: self.native_pointer_hidden,
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The live configuration snapshot.
    pub fn config(&self) -> Arc<ArbiterConfig> {
        Arc::clone(&self.config)
    }

    /// Reads the host clock the engine stamps pointer activity with.
    pub fn host_now(&self) -> f64 {
        self.ports.surface.now()
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn pointer_hidden_for(&self, ownership: Ownership) -> bool {
        ownership.is_secondary() && self.config.pointer_enabled
    }

    /// Switches ownership and publishes the change.  Returns handler faults.
    fn set_ownership(&mut self, next: Ownership) -> usize {
        if self.ownership == next {
            return 0;
        }
        self.ownership = next;
        self.native_pointer_hidden = self.pointer_hidden_for(next);
        info!(ownership = %next, cursor = %self.cursor, "ownership changed");
        self.emit(EngineEvent::OwnershipChange {
            ownership: next,
            cursor: self.cursor,
            native_pointer_hidden: self.native_pointer_hidden,
        })
    }

    fn emit(&self, event: EngineEvent) -> usize {
        debug!(%event, "emit");
        self.bus.publish(&event)
    }
}

impl std::fmt::Debug for ArbitrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArbitrationEngine")
            .field("ownership", &self.ownership)
            .field("cursor", &self.cursor)
            .field("running", &self.running)
            .field("enabled", &self.enabled)
            .field("connected", &self.connected.len())
            .finish_non_exhaustive()
    }
}

/// Resolves the device preference against the connected set, then finds that
/// device in this frame's snapshot.
fn select_device<'a>(
    connected: &ConnectedSet,
    preference: DevicePreference,
    live: &[&'a DeviceSnapshot],
) -> Option<&'a DeviceSnapshot> {
    let chosen = connected.select(preference)?;
    live.iter().copied().find(|s| s.device_id() == chosen.id)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
