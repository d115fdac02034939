//! Logging setup for opsdeck binaries.

pub mod logging;
