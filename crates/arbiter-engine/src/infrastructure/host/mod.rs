//! Host adapters implementing the engine's ports.
//!
//! - **`scripted`** – An in-memory host driven by tests and by scenario
//!   replay.  Every input (clock, viewport, visibility, controllers) is set
//!   explicitly and every port call is recorded.
//!
//! The native frame scheduler lives in `infrastructure::frame_driver`
//! alongside the loop that serves it.

pub mod scripted;

pub use scripted::ScriptedHost;
