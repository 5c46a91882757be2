//! arbiter-engine library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the `arbiter-sim` binary in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::arbitrate::{ArbitrationEngine, EngineState, SCAN_INTERVAL_MS};
pub use application::event_bus::Handler;
pub use application::ports::{
    DeviceSource, FrameHandle, FrameScheduler, HostError, HostPorts, HostSurface,
    PointerActivityKind, PointerEvent, PointerListeners,
};
