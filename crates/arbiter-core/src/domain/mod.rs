//! Domain entities for the cursor arbiter.
//!
//! This module contains pure business logic with no host dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from browser APIs, frame schedulers, or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Code in outer layers (the engine, host adapters, the simulator) depends on
//! the domain, but the domain never depends on them.

/// Engine configuration and partial-update merging.
pub mod config;

/// Controller snapshots and the debounced connected-device set.
pub mod device;

/// Events published by the arbitration engine.
pub mod events;

/// Ownership state and cursor geometry.
pub mod ownership;

/// Deadzone and sensitivity processing of raw axis values.
pub mod signal;
