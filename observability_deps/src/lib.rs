//! Pins the version of [`tracing`] used across the workspace.
//!
//! Crates log through `observability_deps::tracing` instead of depending on
//! `tracing` directly, so an upgrade happens in exactly one place.

pub use tracing;
