//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes an arbiter configuration patch as
//! TOML.  A missing file is not an error: it simply means "use the defaults".
//!
//! Keeping file handling here means the engine itself never touches the file
//! system; it only ever sees an already-parsed `ConfigPatch`.

pub mod config;
