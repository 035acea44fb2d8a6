//! Logging utilities.
//!
//! This module centralizes logger initialization. Library code logs through the `log`
//! facade only; the binary installs [`TieredLogger`] once at startup.

mod init;

pub use init::{init_logging, FileLogConfig, LoggingConfig, TieredLogger};
