//! # Core Runtime Module
//!
//! Provides the shared runtime infrastructure for the seek-table workspace:
//! - Logging and tracing infrastructure
//! - Host log forwarding through [`logging::LoggerSink`]
//!
//! ## Overview
//!
//! Every crate in the workspace logs through `tracing`. This crate owns the
//! subscriber setup so hosts configure output format and filtering in one place.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
