//! Application layer: the arbitration engine and the ports it depends on.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `arbiter_core`) and the infrastructure (hosts, files,
//! runtimes).
//!
//! Code in this layer:
//!
//! - **Orchestrates** domain objects to fulfil a goal (e.g., "give the cursor
//!   to the controller once it has clearly taken over").
//! - **Depends on abstractions** (the traits in `ports`) rather than concrete
//!   hosts, so a browser, a native window, or a test script can drive it.
//! - **Contains no I/O**: no file access, no clocks, no sleeping.
//!
//! # Sub-modules
//!
//! - **`arbitrate`** – `ArbitrationEngine`: lifecycle, per-frame tick, pointer
//!   reclaim, configuration updates.  Runs on every display frame.
//!
//! - **`event_bus`** – Synchronous, fault-isolating publish/subscribe for the
//!   events a UI layer consumes.
//!
//! - **`ports`** – The four host traits the engine is built against.

pub mod arbitrate;
pub mod event_bus;
pub mod ports;
