//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-decoder`, `bridge-desktop`, `core-runtime`).
//! Host applications can depend on `xmp-flac-workspace` and enable the documented
//! features without needing to wire each crate individually.

#[cfg(feature = "decoder")]
pub use core_decoder as decoder;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;

#[cfg(feature = "desktop-shims")]
pub use core_runtime as runtime;
