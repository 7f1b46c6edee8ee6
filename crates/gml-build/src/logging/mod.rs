//! Logging setup for tools that drive the engine.
//!
//! The engine itself only emits through the `log` facade; binaries call
//! [`init_logging`] once to install an `env_logger` backend.

mod init;

pub use init::{LoggingConfig, init_logging};
