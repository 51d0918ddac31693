//! # Hostlink Core
//!
//! The target memory and lifecycle bridge.
//! Splits arbitrary memory ranges into transfers the device's channel can
//! carry, loads program images into target memory, and sequences the target
//! through reset/start/stop. The control protocol itself (run loop, syscall
//! proxying, console) lives in an external engine that calls back in
//! through [`TargetAccess`].

pub mod bridge;
pub mod chunk;
pub mod error;
pub mod image;
pub mod state;

// Re-export the main surface so users can just use `hostlink_core::TargetBridge`.
pub use bridge::{Lifecycle, TargetAccess, TargetBridge};
pub use error::{BridgeError, Result};
pub use image::{ImageError, ProgramImage, Segment};
pub use state::SessionState;

// The transport contract comes from the hardware interface layer.
pub use hostlink_io::{Platform, ProcControl, TargetAddr, TransportError};
