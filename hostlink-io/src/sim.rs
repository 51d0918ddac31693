//! The simulated target: a flat byte array behind the same chunk-aligned
//! transfer contract real hardware imposes. Strict about the contract on
//! purpose: a misaligned or oversized call here is a bug in the caller,
//! and the tests want to see it fail loudly.

use crate::{Platform, ProcControl, TargetAddr, TransportError};
use tracing::trace;

/// Direction of a logged platform transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// One platform-level transfer, as the simulated device saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub dir: Direction,
    pub addr: TargetAddr,
    pub len: usize,
}

/// In-memory target memory with configurable transport limits.
///
/// Every transfer is validated against the chunk contract and appended to a
/// log the tests can inspect. A fault can be scheduled to fire after a given
/// number of successful transfers.
pub struct SimPlatform {
    base: TargetAddr,
    mem: Vec<u8>,
    align: usize,
    max_size: usize,
    log: Vec<TransferRecord>,
    fail_after: Option<usize>,
}

impl std::fmt::Debug for SimPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimPlatform")
            .field("base", &self.base)
            .field("size", &self.mem.len())
            .field("align", &self.align)
            .field("max_size", &self.max_size)
            .field("transfers", &self.log.len())
            .finish()
    }
}

impl SimPlatform {
    /// A simulated target with `size` bytes of memory starting at `base`.
    pub fn new(base: TargetAddr, size: usize, align: usize, max_size: usize) -> Self {
        Self {
            base,
            mem: vec![0; size],
            align,
            max_size,
            log: Vec::new(),
            fail_after: None,
        }
    }

    /// Let the next `n` transfers succeed, then fail every one after.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// Every platform-level transfer issued so far, in order.
    pub fn transfer_log(&self) -> &[TransferRecord] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Inspect target memory directly, bypassing the transfer contract.
    pub fn peek(&self, addr: TargetAddr, len: usize) -> &[u8] {
        let off = (addr - self.base) as usize;
        &self.mem[off..off + len]
    }

    /// Preload target memory directly, bypassing the transfer contract.
    pub fn poke(&mut self, addr: TargetAddr, data: &[u8]) {
        let off = (addr - self.base) as usize;
        self.mem[off..off + data.len()].copy_from_slice(data);
    }

    /// Validate the chunk contract and return the offset into `mem`.
    fn check(&self, addr: TargetAddr, len: usize) -> Result<usize, TransportError> {
        if let Some(n) = self.fail_after {
            if self.log.len() >= n {
                return Err(TransportError::Device(format!(
                    "injected fault after {n} transfers"
                )));
            }
        }
        if addr % self.align as u64 != 0 {
            return Err(TransportError::Misaligned {
                addr,
                align: self.align,
            });
        }
        if len == 0 || len > self.max_size || len % self.align != 0 {
            return Err(TransportError::BadLength {
                len,
                align: self.align,
                max: self.max_size,
            });
        }
        if addr < self.base
            || addr - self.base + len as u64 > self.mem.len() as u64
        {
            return Err(TransportError::OutOfRange { addr, len });
        }
        Ok((addr - self.base) as usize)
    }
}

impl Platform for SimPlatform {
    fn chunk_align(&self) -> usize {
        self.align
    }

    fn chunk_max_size(&self) -> usize {
        self.max_size
    }

    fn read_aligned(&mut self, addr: TargetAddr, dst: &mut [u8]) -> Result<(), TransportError> {
        let off = self.check(addr, dst.len())?;
        dst.copy_from_slice(&self.mem[off..off + dst.len()]);
        self.log.push(TransferRecord {
            dir: Direction::Read,
            addr,
            len: dst.len(),
        });
        trace!("sim read {} bytes @ {:#x}", dst.len(), addr);
        Ok(())
    }

    fn write_aligned(&mut self, addr: TargetAddr, src: &[u8]) -> Result<(), TransportError> {
        let off = self.check(addr, src.len())?;
        self.mem[off..off + src.len()].copy_from_slice(src);
        self.log.push(TransferRecord {
            dir: Direction::Write,
            addr,
            len: src.len(),
        });
        trace!("sim write {} bytes @ {:#x}", src.len(), addr);
        Ok(())
    }
}

/// Process control for the simulated target. Nothing actually runs; this
/// just keeps the books the lifecycle tests need.
#[derive(Debug)]
pub struct SimProcControl {
    alive: bool,
    in_reset: bool,
    resets: usize,
    terminations: usize,
    fail_terminate: bool,
}

impl SimProcControl {
    pub fn new() -> Self {
        Self {
            alive: true,
            in_reset: true,
            resets: 0,
            terminations: 0,
            fail_terminate: false,
        }
    }

    /// Make `terminate()` report a device fault instead of succeeding.
    pub fn fail_terminate(&mut self) {
        self.fail_terminate = true;
    }

    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    /// How many times the target was released from reset.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// How many times teardown was attempted.
    pub fn terminations(&self) -> usize {
        self.terminations
    }
}

impl Default for SimProcControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcControl for SimProcControl {
    fn release_reset(&mut self) -> Result<(), TransportError> {
        self.in_reset = false;
        self.resets += 1;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), TransportError> {
        self.terminations += 1;
        if self.fail_terminate {
            return Err(TransportError::Device("terminate refused".to_string()));
        }
        self.alive = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}
