//! Infrastructure layer: concrete hosts and runtimes for the engine.
//!
//! Contains the scripted in-memory host, the tokio frame driver for native
//! hosts, TOML config-file storage, and deterministic scenario replay.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `arbiter_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod frame_driver;
pub mod host;
pub mod scenario;
pub mod storage;
