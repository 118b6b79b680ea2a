//! Workspace facade crate.
//!
//! Re-exports the workspace crates so host applications can depend on
//! `seektable-workspace` and toggle the documented features (e.g. `symphonia`)
//! without wiring each crate individually.

pub use core_runtime;
pub use core_seektable;
