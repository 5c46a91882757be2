//! Host ports: the traits through which the engine reaches its host.
//!
//! The engine never talks to a browser, a window system, or a gamepad driver
//! directly.  Everything it needs from the outside world is expressed as one
//! of four small traits, bundled in [`HostPorts`]:
//!
//! | Port                  | Provides                                          |
//! |-----------------------|---------------------------------------------------|
//! | [`FrameScheduler`]    | "call me back on the next display frame"          |
//! | [`PointerListeners`]  | start/stop forwarding mouse activity              |
//! | [`DeviceSource`]      | controller capability probe and snapshots         |
//! | [`HostSurface`]       | viewport size, visibility, clock, pointer restore |
//!
//! # Inversion of control (for beginners)
//!
//! A browser `requestAnimationFrame` takes a closure.  Handing the engine's
//! own `&mut self` to a closure that the host stores would make the engine
//! borrow itself, which Rust rejects.  Instead the flow is inverted:
//!
//! 1. The engine calls [`FrameScheduler::request_frame`] and keeps the handle.
//! 2. When the frame fires, the host calls `ArbitrationEngine::tick(now)`.
//!
//! Pointer activity works the same way: [`PointerListeners::attach`] only
//! tells the host which kinds to forward; the host then calls
//! `ArbitrationEngine::handle_pointer(event)` for each one.
//!
//! Production adapters live in `infrastructure`; unit tests use the
//! `mockall`-generated mocks or the scripted host.

use std::fmt;
use std::sync::Arc;

use arbiter_core::{DeviceSnapshot, Point, Viewport};
use thiserror::Error;

/// Opaque identifier of a requested frame, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Errors a host port may report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    /// The controller API exists but refused to enumerate (e.g. blocked by a
    /// permissions policy).
    #[error("device enumeration failed: {0}")]
    Enumeration(String),
}

// ── Pointer events ────────────────────────────────────────────────────────────

/// The pointer activity kinds the engine listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerActivityKind {
    Move,
    Wheel,
    Press,
}

impl PointerActivityKind {
    pub const ALL: [PointerActivityKind; 3] = [
        PointerActivityKind::Move,
        PointerActivityKind::Wheel,
        PointerActivityKind::Press,
    ];
}

/// One pointer event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PointerEvent {
    pub kind: PointerActivityKind,
    /// Pointer position in viewport coordinates, when the host knows it.
    #[serde(default)]
    pub position: Option<Point>,
    /// `false` for synthetic events dispatched by scripts.
    #[serde(default = "default_trusted")]
    pub trusted: bool,
}

fn default_trusted() -> bool {
    true
}

impl PointerEvent {
    /// A trusted move to `(x, y)`.
    pub fn moved(x: f64, y: f64) -> Self {
        Self {
            kind: PointerActivityKind::Move,
            position: Some(Point::new(x, y)),
            trusted: true,
        }
    }

    /// A trusted wheel event with no position.
    pub fn wheel() -> Self {
        Self {
            kind: PointerActivityKind::Wheel,
            position: None,
            trusted: true,
        }
    }

    /// A trusted button press at `(x, y)`.
    pub fn pressed(x: f64, y: f64) -> Self {
        Self {
            kind: PointerActivityKind::Press,
            position: Some(Point::new(x, y)),
            trusted: true,
        }
    }

    /// Marks the event as script-generated.
    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }
}

// ── Port traits ───────────────────────────────────────────────────────────────

/// Requests and cancels display-frame callbacks.
#[cfg_attr(test, mockall::automock)]
pub trait FrameScheduler: Send + Sync {
    /// Asks the host to call `tick` on the next frame.
    fn request_frame(&self) -> FrameHandle;

    /// Cancels a pending request.  Unknown or already-fired handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Controls forwarding of pointer activity to the engine.
#[cfg_attr(test, mockall::automock)]
pub trait PointerListeners: Send + Sync {
    /// Starts forwarding the given kinds via `handle_pointer`.
    fn attach(&self, kinds: &[PointerActivityKind]);

    /// Stops forwarding all pointer activity.
    fn detach(&self);
}

/// Enumerates connected controllers.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceSource: Send + Sync {
    /// Whether the host has a controller API at all.  Probed once.
    fn is_available(&self) -> bool;

    /// Every controller the host currently reports, in host slot order.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Enumeration`] if the host refuses to enumerate.
    fn snapshot(&self) -> Result<Vec<DeviceSnapshot>, HostError>;
}

/// The visible surface the cursor lives on.
#[cfg_attr(test, mockall::automock)]
pub trait HostSurface: Send + Sync {
    /// `false` in headless environments; the engine then never starts.
    fn has_ui(&self) -> bool;

    /// Whether the surface is currently hidden (e.g. a background tab).
    fn is_hidden(&self) -> bool;

    fn viewport(&self) -> Viewport;

    /// Monotonic host clock in milliseconds.
    fn now(&self) -> f64;

    /// Shows the native pointer indicator again.
    ///
    /// Only called during teardown, when a subscriber failed to handle the
    /// final ownership event.
    fn restore_native_pointer(&self);
}

/// All host ports an engine needs, shared behind `Arc`s.
#[derive(Clone)]
pub struct HostPorts {
    pub frames: Arc<dyn FrameScheduler>,
    pub pointer: Arc<dyn PointerListeners>,
    pub devices: Arc<dyn DeviceSource>,
    pub surface: Arc<dyn HostSurface>,
}

impl fmt::Debug for HostPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPorts").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_event_constructors_are_trusted() {
        assert!(PointerEvent::moved(1.0, 2.0).trusted);
        assert!(PointerEvent::wheel().trusted);
        assert!(!PointerEvent::pressed(0.0, 0.0).untrusted().trusted);
    }

    #[test]
    fn test_pointer_event_deserializes_trusted_by_default() {
        let event: PointerEvent = serde_json::from_str(r#"{ "kind": "wheel" }"#).unwrap();
        assert_eq!(event.kind, PointerActivityKind::Wheel);
        assert!(event.trusted);
        assert!(event.position.is_none());
    }

    #[test]
    fn test_frame_handle_display() {
        assert_eq!(FrameHandle(7).to_string(), "frame#7");
    }
}
