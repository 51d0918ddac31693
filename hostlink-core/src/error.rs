use hostlink_io::{TargetAddr, TransportError};
use thiserror::Error;

/// Everything that can abort a bridge session.
///
/// All of these are fatal: the bridge never retries, and the control engine
/// is expected to tear the session down via `stop()` when one surfaces.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The platform primitive reported a transport fault.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A requested range wraps past the end of the address space.
    /// Caller bug, not a runtime condition.
    #[error("range {addr:#x}+{len:#x} wraps the target address space")]
    AddressOverflow { addr: TargetAddr, len: usize },

    /// The platform advertised limits no transfer can satisfy.
    #[error("unusable platform limits: align {align}, max chunk {max_size}")]
    BadPlatformLimits { align: usize, max_size: usize },

    /// A segment write failed during program load. Loading stops at the
    /// failing segment; nothing is rolled back.
    #[error("failed to load segment {index} at {addr:#x}")]
    Loader {
        index: usize,
        addr: TargetAddr,
        #[source]
        source: Box<BridgeError>,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
