//! Splits arbitrary byte ranges into transfers the platform will accept.
//!
//! The platform only takes aligned addresses and bounded, alignment-multiple
//! lengths. A request that starts or ends off-alignment gets its edge
//! widened to a full alignment unit: reads bounce the widened chunk through
//! a scratch buffer and copy out just the requested bytes, writes do a
//! read-modify-write so the neighbors sharing the chunk survive untouched.

use crate::error::{BridgeError, Result};
use hostlink_io::{Platform, TargetAddr};
use tracing::trace;

/// One platform-level transfer window: aligned address, bounded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub addr: TargetAddr,
    pub len: usize,
}

impl Window {
    fn end(&self) -> TargetAddr {
        self.addr + self.len as u64
    }
}

/// The sequence of windows covering a requested range, address-ascending.
///
/// A partial head or tail is emitted as a single alignment-unit window; the
/// aligned interior is walked in steps of the largest alignment multiple
/// that fits `chunk_max_size()`.
#[derive(Debug)]
pub struct ChunkPlan {
    head: Option<Window>,
    cur: TargetAddr,
    mid_end: TargetAddr,
    step: u64,
    tail: Option<Window>,
}

impl ChunkPlan {
    pub fn new(align: usize, max_size: usize, addr: TargetAddr, len: usize) -> Result<Self> {
        if align == 0 || max_size < align {
            return Err(BridgeError::BadPlatformLimits { align, max_size });
        }

        let step = (max_size - max_size % align) as u64;
        if len == 0 {
            return Ok(Self { head: None, cur: 0, mid_end: 0, step, tail: None });
        }

        let end = addr
            .checked_add(len as u64)
            .ok_or(BridgeError::AddressOverflow { addr, len })?;

        let align64 = align as u64;
        let head_start = addr - addr % align64;
        let tail_rem = end % align64;
        let tail_end = if tail_rem == 0 {
            end
        } else {
            end.checked_add(align64 - tail_rem)
                .ok_or(BridgeError::AddressOverflow { addr, len })?
        };

        let lead = addr % align64 != 0;
        let trail = tail_rem != 0;

        // The whole request fits inside one alignment unit.
        if tail_end - head_start == align64 && (lead || trail) {
            return Ok(Self {
                head: Some(Window { addr: head_start, len: align }),
                cur: 0,
                mid_end: 0,
                step,
                tail: None,
            });
        }

        let head = lead.then_some(Window { addr: head_start, len: align });
        let cur = if lead { head_start + align64 } else { addr };
        let mid_end = if trail { tail_end - align64 } else { end };
        let tail = trail.then_some(Window { addr: mid_end, len: align });

        Ok(Self { head, cur, mid_end, step, tail })
    }
}

impl Iterator for ChunkPlan {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if let Some(w) = self.head.take() {
            return Some(w);
        }
        if self.cur < self.mid_end {
            let len = (self.mid_end - self.cur).min(self.step) as usize;
            let w = Window { addr: self.cur, len };
            self.cur += len as u64;
            return Some(w);
        }
        self.tail.take()
    }
}

/// Read `dst.len()` bytes of target memory at `addr` through the platform.
///
/// Interior windows land straight in `dst`; widened edge windows bounce
/// through a scratch chunk so nothing outside the request leaks in.
pub fn read_chunked(platform: &mut dyn Platform, addr: TargetAddr, dst: &mut [u8]) -> Result<()> {
    let len = dst.len();
    if len == 0 {
        return Ok(());
    }
    let end = addr
        .checked_add(len as u64)
        .ok_or(BridgeError::AddressOverflow { addr, len })?;

    let plan = ChunkPlan::new(platform.chunk_align(), platform.chunk_max_size(), addr, len)?;
    for win in plan {
        trace!("read window {:#x}+{:#x}", win.addr, win.len);
        if win.addr >= addr && win.end() <= end {
            let off = (win.addr - addr) as usize;
            platform.read_aligned(win.addr, &mut dst[off..off + win.len])?;
        } else {
            let mut chunk = vec![0u8; win.len];
            platform.read_aligned(win.addr, &mut chunk)?;

            let lo = win.addr.max(addr);
            let hi = win.end().min(end);
            let n = (hi - lo) as usize;
            dst[(lo - addr) as usize..][..n]
                .copy_from_slice(&chunk[(lo - win.addr) as usize..][..n]);
        }
    }
    Ok(())
}

/// Write `src` into target memory at `addr` through the platform.
///
/// Widened edge windows are read-modify-written: read the full aligned
/// chunk, overlay the requested bytes, write the chunk back. A naive
/// unaligned write would corrupt whatever shares the chunk.
pub fn write_chunked(platform: &mut dyn Platform, addr: TargetAddr, src: &[u8]) -> Result<()> {
    let len = src.len();
    if len == 0 {
        return Ok(());
    }
    let end = addr
        .checked_add(len as u64)
        .ok_or(BridgeError::AddressOverflow { addr, len })?;

    let plan = ChunkPlan::new(platform.chunk_align(), platform.chunk_max_size(), addr, len)?;
    for win in plan {
        trace!("write window {:#x}+{:#x}", win.addr, win.len);
        if win.addr >= addr && win.end() <= end {
            let off = (win.addr - addr) as usize;
            platform.write_aligned(win.addr, &src[off..off + win.len])?;
        } else {
            let mut chunk = vec![0u8; win.len];
            platform.read_aligned(win.addr, &mut chunk)?;

            let lo = win.addr.max(addr);
            let hi = win.end().min(end);
            let n = (hi - lo) as usize;
            chunk[(lo - win.addr) as usize..][..n]
                .copy_from_slice(&src[(lo - addr) as usize..][..n]);

            platform.write_aligned(win.addr, &chunk)?;
        }
    }
    Ok(())
}
