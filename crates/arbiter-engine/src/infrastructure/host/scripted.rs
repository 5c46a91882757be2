//! Scripted host for tests and offline replay.
//!
//! [`ScriptedHost`] implements all four host ports against in-memory state
//! that a test (or the scenario runner) controls directly: the clock, the
//! viewport, visibility, and the controller snapshot the host reports.  It
//! records every port call so tests can assert on them.
//!
//! Frames never fire on their own.  The driver calls
//! [`ScriptedHost::fire_frame`], which ticks the engine only if a frame is
//! actually pending, exactly as a real frame scheduler would.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arbiter_core::{DeviceSnapshot, Viewport};

use crate::application::arbitrate::ArbitrationEngine;
use crate::application::ports::{
    DeviceSource, FrameHandle, FrameScheduler, HostError, HostPorts, HostSurface,
    PointerActivityKind, PointerEvent, PointerListeners,
};

#[derive(Debug)]
struct HostState {
    now: f64,
    hidden: bool,
    has_ui: bool,
    device_api: bool,
    viewport: Viewport,
    devices: Vec<DeviceSnapshot>,
    snapshot_error: Option<HostError>,

    next_frame: u64,
    pending: Option<FrameHandle>,
    attached: Vec<PointerActivityKind>,

    frame_requests: usize,
    cancellations: usize,
    snapshot_calls: usize,
    restore_calls: usize,
}

/// An in-memory host whose every input is set by the caller.
#[derive(Debug)]
pub struct ScriptedHost {
    state: Mutex<HostState>,
}

impl ScriptedHost {
    /// A visible 1920×1080 surface with a controller API and no controllers.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                now: 0.0,
                hidden: false,
                has_ui: true,
                device_api: true,
                viewport: Viewport::default(),
                devices: Vec::new(),
                snapshot_error: None,
                next_frame: 1,
                pending: None,
                attached: Vec::new(),
                frame_requests: 0,
                cancellations: 0,
                snapshot_calls: 0,
                restore_calls: 0,
            }),
        }
    }

    pub fn with_viewport(self, viewport: Viewport) -> Self {
        self.lock().viewport = viewport;
        self
    }

    /// Simulates a headless environment.
    pub fn without_ui(self) -> Self {
        self.lock().has_ui = false;
        self
    }

    /// Simulates a host with no controller API.
    pub fn without_device_api(self) -> Self {
        self.lock().device_api = false;
        self
    }

    /// Bundles this host as the engine's ports.
    pub fn ports(self: &Arc<Self>) -> HostPorts {
        HostPorts {
            frames: Arc::clone(self) as Arc<dyn FrameScheduler>,
            pointer: Arc::clone(self) as Arc<dyn PointerListeners>,
            devices: Arc::clone(self) as Arc<dyn DeviceSource>,
            surface: Arc::clone(self) as Arc<dyn HostSurface>,
        }
    }

    // ── Scripting ─────────────────────────────────────────────────────────────

    pub fn set_now(&self, now: f64) {
        self.lock().now = now;
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.lock().hidden = hidden;
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.lock().viewport = viewport;
    }

    /// Replaces the snapshot reported from now on and clears any failure.
    pub fn set_devices(&self, devices: Vec<DeviceSnapshot>) {
        let mut state = self.lock();
        state.devices = devices;
        state.snapshot_error = None;
    }

    /// Makes every following `snapshot()` call fail until `set_devices`.
    pub fn fail_snapshots(&self, reason: &str) {
        self.lock().snapshot_error = Some(HostError::Enumeration(reason.to_string()));
    }

    /// Fires the pending frame at time `at`.
    ///
    /// Returns `false` (and does not tick) if no frame is pending.
    pub fn fire_frame(&self, engine: &mut ArbitrationEngine, at: f64) -> bool {
        let fired = {
            let mut state = self.lock();
            state.now = at;
            state.pending.take().is_some()
        };
        if fired {
            engine.tick(at);
        }
        fired
    }

    /// Delivers `event` at time `at` if its kind is currently attached.
    pub fn deliver_pointer(
        &self,
        engine: &mut ArbitrationEngine,
        event: PointerEvent,
        at: f64,
    ) -> bool {
        let listening = {
            let mut state = self.lock();
            state.now = at;
            state.attached.contains(&event.kind)
        };
        if listening {
            engine.handle_pointer(event);
        }
        listening
    }

    // ── Recorded calls ────────────────────────────────────────────────────────

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.lock().pending
    }

    pub fn is_attached(&self) -> bool {
        !self.lock().attached.is_empty()
    }

    pub fn frame_requests(&self) -> usize {
        self.lock().frame_requests
    }

    pub fn cancellations(&self) -> usize {
        self.lock().cancellations
    }

    pub fn snapshot_calls(&self) -> usize {
        self.lock().snapshot_calls
    }

    pub fn restore_calls(&self) -> usize {
        self.lock().restore_calls
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

// ── Port implementations ──────────────────────────────────────────────────────

impl FrameScheduler for ScriptedHost {
    fn request_frame(&self) -> FrameHandle {
        let mut state = self.lock();
        let handle = FrameHandle(state.next_frame);
        state.next_frame += 1;
        state.pending = Some(handle);
        state.frame_requests += 1;
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut state = self.lock();
        state.cancellations += 1;
        if state.pending == Some(handle) {
            state.pending = None;
        }
    }
}

impl PointerListeners for ScriptedHost {
    fn attach(&self, kinds: &[PointerActivityKind]) {
        self.lock().attached = kinds.to_vec();
    }

    fn detach(&self) {
        self.lock().attached.clear();
    }
}

impl DeviceSource for ScriptedHost {
    fn is_available(&self) -> bool {
        self.lock().device_api
    }

    fn snapshot(&self) -> Result<Vec<DeviceSnapshot>, HostError> {
        let mut state = self.lock();
        state.snapshot_calls += 1;
        match &state.snapshot_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.devices.clone()),
        }
    }
}

impl HostSurface for ScriptedHost {
    fn has_ui(&self) -> bool {
        self.lock().has_ui
    }

    fn is_hidden(&self) -> bool {
        self.lock().hidden
    }

    fn viewport(&self) -> Viewport {
        self.lock().viewport
    }

    fn now(&self) -> f64 {
        self.lock().now
    }

    fn restore_native_pointer(&self) {
        self.lock().restore_calls += 1;
    }
}
