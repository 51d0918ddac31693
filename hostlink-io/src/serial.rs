//! A `Platform`/`ProcControl` pair speaking a small framed command protocol
//! over a serial debug link. The device side advertises its own transfer
//! limits at open time, so the bridge never has to guess alignment.
//!
//! Frame layout is fixed little-endian: one opcode byte, then an 8-byte
//! target address and a 4-byte length where the command carries them.

use crate::{Platform, ProcControl, TargetAddr, TransportError};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const OP_PROBE: u8 = b'?';
const OP_READ: u8 = b'R';
const OP_WRITE: u8 = b'W';
const OP_RESET: u8 = b'S';
const OP_KILL: u8 = b'Q';

const ACK: u8 = 0x06;
const NAK: u8 = 0x15;

/// Configuration for the serial debug link.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl SerialConfig {
    pub fn new(port_name: &str, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate,
            timeout_ms: 1000,
        }
    }
}

// The platform and proc-control halves share one port; the session is the
// sole caller, the mutex only keeps the two halves from interleaving frames.
type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Opens the link and hands out its two capability halves.
pub struct SerialLink;

impl SerialLink {
    pub fn open(config: &SerialConfig) -> Result<(SerialPlatform, SerialProcControl), TransportError> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|e| {
                TransportError::Device(format!("failed to open {}: {e}", config.port_name))
            })?;
        let port: SharedPort = Arc::new(Mutex::new(port));

        let (align, max_size) = probe_limits(&port)?;
        info!(
            "serial link up on {} ({} baud): align {}, chunk max {}",
            config.port_name, config.baud_rate, align, max_size
        );

        Ok((
            SerialPlatform {
                port: port.clone(),
                align,
                max_size,
            },
            SerialProcControl { port, alive: true },
        ))
    }
}

/// Chunk transfers over the serial link.
pub struct SerialPlatform {
    port: SharedPort,
    align: usize,
    max_size: usize,
}

impl std::fmt::Debug for SerialPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPlatform")
            .field("align", &self.align)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl Platform for SerialPlatform {
    fn chunk_align(&self) -> usize {
        self.align
    }

    fn chunk_max_size(&self) -> usize {
        self.max_size
    }

    fn read_aligned(&mut self, addr: TargetAddr, dst: &mut [u8]) -> Result<(), TransportError> {
        debug!("serial read {} bytes @ {:#x}", dst.len(), addr);
        let mut port = self.port.lock().unwrap();
        port.write_all(&read_frame(addr, dst.len()))?;
        port.flush()?;
        port.read_exact(dst)?;
        Ok(())
    }

    fn write_aligned(&mut self, addr: TargetAddr, src: &[u8]) -> Result<(), TransportError> {
        debug!("serial write {} bytes @ {:#x}", src.len(), addr);
        let mut port = self.port.lock().unwrap();
        port.write_all(&write_frame(addr, src))?;
        port.flush()?;
        expect_ack(&mut **port)
    }
}

/// Reset and teardown over the same link.
pub struct SerialProcControl {
    port: SharedPort,
    alive: bool,
}

impl std::fmt::Debug for SerialProcControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialProcControl")
            .field("alive", &self.alive)
            .finish()
    }
}

impl ProcControl for SerialProcControl {
    fn release_reset(&mut self) -> Result<(), TransportError> {
        let mut port = self.port.lock().unwrap();
        port.write_all(&[OP_RESET])?;
        port.flush()?;
        expect_ack(&mut **port)
    }

    fn terminate(&mut self) -> Result<(), TransportError> {
        let mut port = self.port.lock().unwrap();
        port.write_all(&[OP_KILL])?;
        port.flush()?;
        expect_ack(&mut **port)?;
        self.alive = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Ask the device for its transfer limits.
fn probe_limits(port: &SharedPort) -> Result<(usize, usize), TransportError> {
    let mut port = port.lock().unwrap();
    port.write_all(&[OP_PROBE])?;
    port.flush()?;

    let mut reply = [0u8; 8];
    port.read_exact(&mut reply)?;
    let align = u32::from_le_bytes(reply[0..4].try_into().unwrap()) as usize;
    let max_size = u32::from_le_bytes(reply[4..8].try_into().unwrap()) as usize;

    if align == 0 || max_size < align {
        return Err(TransportError::Protocol(format!(
            "device advertised unusable limits: align {align}, max {max_size}"
        )));
    }
    Ok((align, max_size))
}

fn expect_ack(port: &mut dyn SerialPort) -> Result<(), TransportError> {
    let mut status = [0u8; 1];
    port.read_exact(&mut status)?;
    match status[0] {
        ACK => Ok(()),
        NAK => Err(TransportError::Protocol("device rejected command".to_string())),
        other => Err(TransportError::Protocol(format!(
            "unexpected response byte {other:#04x}"
        ))),
    }
}

fn read_frame(addr: TargetAddr, len: usize) -> [u8; 13] {
    let mut frame = [0u8; 13];
    frame[0] = OP_READ;
    frame[1..9].copy_from_slice(&addr.to_le_bytes());
    frame[9..13].copy_from_slice(&(len as u32).to_le_bytes());
    frame
}

fn write_frame(addr: TargetAddr, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(13 + payload.len());
    frame.push(OP_WRITE);
    frame.extend_from_slice(&addr.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}
