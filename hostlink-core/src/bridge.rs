//! The bridge proper: borrowed Platform/ProcControl collaborators, the
//! program image, and the start/stop lifecycle the control engine drives.
//!
//! The bridge is a capability provider, not a session driver. It never
//! initiates control-protocol exchanges; the engine holds it through the
//! `TargetAccess` trait and calls in at its own lifecycle points.

use crate::chunk;
use crate::error::{BridgeError, Result};
use crate::image::ProgramImage;
use crate::state::SessionState;
use hostlink_io::{Platform, ProcControl, TargetAddr};
use tracing::{debug, info, warn};

/// The replaceable lifecycle contract.
///
/// `load_program`, `reset`, and `shutdown` are the hooks; `start` and `stop`
/// carry the fixed sequencing. A platform-specific bridge substitutes its
/// own hook implementations without touching the chunked-transfer contract.
pub trait Lifecycle {
    /// Materialize the program image in target memory.
    fn load_program(&mut self) -> Result<()>;

    /// Bring the target out of reset into a runnable state.
    /// One call per session; calling it again without a fresh load is
    /// undefined target behavior and is not guarded against here.
    fn reset(&mut self) -> Result<()>;

    /// Best-effort teardown. Must not surface new failures that would mask
    /// whatever fault triggered it.
    fn shutdown(&mut self);

    /// Load the program, then pull the target out of reset.
    fn start(&mut self) -> Result<()> {
        self.load_program()?;
        self.reset()
    }

    /// End the session. Safe to call even if `start()` never completed.
    fn stop(&mut self) {
        self.shutdown();
    }
}

/// What the external control engine holds: memory access plus the two
/// lifecycle points it signals. A callback surface, not a base class.
pub trait TargetAccess {
    fn read_memory(&mut self, addr: TargetAddr, dst: &mut [u8]) -> Result<()>;
    fn write_memory(&mut self, addr: TargetAddr, src: &[u8]) -> Result<()>;
    fn on_start(&mut self) -> Result<()>;
    fn on_stop(&mut self);
}

/// The target memory and lifecycle bridge.
///
/// Holds non-owning references to its collaborators; they are caller-owned
/// and must outlive the bridge. The bridge owns no target memory and no
/// platform resources; all transfers are pass-through.
pub struct TargetBridge<'a> {
    args: Vec<String>,
    proc: &'a mut dyn ProcControl,
    platform: &'a mut dyn Platform,
    image: ProgramImage,
    state: SessionState,
    verbose: bool,
}

impl std::fmt::Debug for TargetBridge<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetBridge")
            .field("args", &self.args)
            .field("segments", &self.image.segments().len())
            .field("state", &self.state)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl<'a> TargetBridge<'a> {
    /// `args` is the command-line-style argument list; the bridge consumes
    /// the `+` options it recognizes (`+verbose`) and keeps the rest as
    /// opaque pass-through for the control engine.
    pub fn new(
        args: Vec<String>,
        proc: &'a mut dyn ProcControl,
        platform: &'a mut dyn Platform,
        image: ProgramImage,
    ) -> Self {
        let verbose = args.iter().any(|a| a == "+verbose");
        Self {
            args,
            proc,
            platform,
            image,
            state: SessionState::Constructed,
            verbose,
        }
    }

    /// The argument list, for the control engine to interpret.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Chunked read of arbitrary alignment and length.
    pub fn read_chunk(&mut self, addr: TargetAddr, dst: &mut [u8]) -> Result<()> {
        if self.verbose {
            debug!("read_chunk {:#x}+{:#x}", addr, dst.len());
        }
        chunk::read_chunked(self.platform, addr, dst)
    }

    /// Chunked write of arbitrary alignment and length.
    pub fn write_chunk(&mut self, addr: TargetAddr, src: &[u8]) -> Result<()> {
        if self.verbose {
            debug!("write_chunk {:#x}+{:#x}", addr, src.len());
        }
        chunk::write_chunked(self.platform, addr, src)
    }

    /// The engine owns the `Ready -> Running` edge; this is how it hands
    /// the transition to the bridge's bookkeeping.
    pub fn notify_running(&mut self) {
        debug!("session running");
        self.state = SessionState::Running;
    }
}

impl Lifecycle for TargetBridge<'_> {
    fn load_program(&mut self) -> Result<()> {
        self.state = SessionState::Loading;
        info!(
            "loading {} segments ({} bytes)",
            self.image.segments().len(),
            self.image.total_bytes()
        );

        // Segments go out exactly in supplied order: no reordering, no
        // merging, each independently chunk-aligned. On failure nothing is
        // rolled back; the session must be torn down, not resumed.
        for (index, seg) in self.image.segments().iter().enumerate() {
            if self.verbose {
                debug!("segment {}: {:#x}+{:#x}", index, seg.addr, seg.data.len());
            }
            chunk::write_chunked(self.platform, seg.addr, &seg.data).map_err(|source| {
                BridgeError::Loader {
                    index,
                    addr: seg.addr,
                    source: Box::new(source),
                }
            })?;
        }

        self.state = SessionState::Ready;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.proc.release_reset()?;
        info!("target out of reset");
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        if let Err(e) = self.proc.terminate() {
            // Teardown runs on the failure path too; never let it mask the
            // original fault.
            warn!("target teardown failed: {e}");
            if self.proc.is_alive() {
                warn!("target still alive after teardown attempt");
            }
        }
        self.state = SessionState::Stopped;
        info!("session stopped");
    }
}

impl TargetAccess for TargetBridge<'_> {
    fn read_memory(&mut self, addr: TargetAddr, dst: &mut [u8]) -> Result<()> {
        self.read_chunk(addr, dst)
    }

    fn write_memory(&mut self, addr: TargetAddr, src: &[u8]) -> Result<()> {
        self.write_chunk(addr, src)
    }

    fn on_start(&mut self) -> Result<()> {
        self.start()
    }

    fn on_stop(&mut self) {
        self.stop();
    }
}
