//! # arbiter-core
//!
//! Shared domain library for the cursor arbiter: configuration, ownership and
//! cursor geometry, controller snapshots, signal processing, and the events
//! the arbitration engine publishes.
//!
//! It has zero dependencies on host APIs, frame schedulers, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! A page can be driven by two competing input sources: a mouse (the
//! "pointer") and a game controller (the "secondary device").  Only one of
//! them may move the on-screen cursor at a time.  The arbitration engine
//! decides, once per display frame, which source currently *owns* the cursor.
//!
//! This crate (`arbiter-core`) is the pure foundation.  It defines:
//!
//! - **`domain::config`** – The tunable knobs (deadzone, sensitivity,
//!   hysteresis window, axis/button maps) and how partial updates merge.
//!
//! - **`domain::ownership`** – Who owns the cursor, where the cursor is, and
//!   how it is clamped to the visible viewport.
//!
//! - **`domain::device`** – What a controller reports each frame and the
//!   debounced set of connected controllers.
//!
//! - **`domain::signal`** – Deadzone and sensitivity: how raw stick values
//!   become pixel deltas.
//!
//! - **`domain::events`** – The events a UI layer subscribes to.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `arbiter_core::ArbiterConfig` instead of `arbiter_core::domain::config::ArbiterConfig`.
pub use domain::config::{ArbiterConfig, ConfigError, ConfigPatch, DevicePreference};
pub use domain::device::{ButtonSnapshot, ConnectedDevice, ConnectedSet, DeviceId, DeviceSnapshot, ScanDiff};
pub use domain::events::{DisableReason, EngineEvent, EventKind};
pub use domain::ownership::{Ownership, Point, Viewport};
