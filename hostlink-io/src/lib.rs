//! # Hostlink IO
//!
//! The Hardware Interface Layer.
//! Defines the transport contract the bridge runs on top of: a `Platform`
//! that moves aligned chunks of bytes to and from target memory, and a
//! `ProcControl` that holds the target's lifeline (reset and teardown).
//!
//! Two backends live here: an in-memory simulated target for tests and
//! bring-up, and a framed serial link for real hardware.

use thiserror::Error;

pub mod serial;
pub mod sim;

pub use serial::{SerialConfig, SerialLink, SerialPlatform, SerialProcControl};
pub use sim::{SimPlatform, SimProcControl};

/// A byte offset in the target's memory space.
/// Opaque beyond arithmetic and comparison.
pub type TargetAddr = u64;

/// Failures reported by the physical transport.
/// All of these are fatal to the session; retry policy, if any exists,
/// lives below this interface.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("misaligned transfer at {addr:#x} (alignment {align})")]
    Misaligned { addr: TargetAddr, align: usize },

    #[error("bad transfer length {len} (alignment {align}, max {max})")]
    BadLength { len: usize, align: usize, max: usize },

    #[error("range {addr:#x}+{len:#x} outside target memory")]
    OutOfRange { addr: TargetAddr, len: usize },

    #[error("device fault: {0}")]
    Device(String),

    #[error("link error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// The physical transfer channel.
///
/// Primitives take an address aligned to `chunk_align()` and a buffer whose
/// length is a non-zero multiple of `chunk_align()`, at most
/// `chunk_max_size()` bytes. Splitting arbitrary requests down to calls that
/// satisfy this contract is the bridge's job, not the platform's.
pub trait Platform {
    /// Required address alignment for every transfer.
    fn chunk_align(&self) -> usize;

    /// Maximum bytes a single transfer may carry.
    fn chunk_max_size(&self) -> usize;

    /// Read `dst.len()` bytes of target memory starting at `addr`.
    fn read_aligned(&mut self, addr: TargetAddr, dst: &mut [u8]) -> Result<(), TransportError>;

    /// Write `src` into target memory starting at `addr`.
    fn write_aligned(&mut self, addr: TargetAddr, src: &[u8]) -> Result<(), TransportError>;
}

/// Lifeline of the target process or device instance.
/// Operations either succeed or fail fatally; the bridge does not retry.
pub trait ProcControl {
    /// Bring the target out of reset into a runnable state.
    fn release_reset(&mut self) -> Result<(), TransportError>;

    /// Tear the target down. Unconditional and immediate.
    fn terminate(&mut self) -> Result<(), TransportError>;

    /// Whether the target process/device is still up.
    fn is_alive(&self) -> bool;
}
