//! The program image: the ordered (address, payload) segments placed in
//! target memory before execution. Two reference sources are provided: a
//! flat binary dropped at a base address, and a JSON manifest describing
//! multiple segments. Richer formats (ELF, ...) belong to external image
//! collaborators that build a `ProgramImage` themselves.

use bytes::Bytes;
use hostlink_io::TargetAddr;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bad segment address {0:?}")]
    BadAddress(String),

    #[error("bad hex payload in segment at {addr:#x}")]
    BadHex { addr: TargetAddr },

    #[error("segment at {addr:#x} must have exactly one of \"file\" or \"hex\"")]
    BadSource { addr: TargetAddr },
}

/// One loadable segment. Address and length are caller-supplied and not
/// assumed aligned to anything.
#[derive(Debug, Clone)]
pub struct Segment {
    pub addr: TargetAddr,
    pub data: Bytes,
}

/// Ordered segments to be written to target memory.
///
/// Order is the contract: segments are loaded exactly as supplied, never
/// merged or reordered, so overlapping segments resolve last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct ProgramImage {
    segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addr: TargetAddr, data: impl Into<Bytes>) {
        self.segments.push(Segment { addr, data: data.into() });
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }

    /// A raw binary placed as a single segment at `base`.
    pub fn from_flat_binary(path: &Path, base: TargetAddr) -> Result<Self, ImageError> {
        let data = std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut image = Self::new();
        image.push(base, data);
        Ok(image)
    }

    /// A JSON manifest of segments, each payload either a file next to the
    /// manifest or an inline hex string:
    ///
    /// ```json
    /// { "segments": [
    ///     { "addr": "0x80000000", "file": "kernel.bin" },
    ///     { "addr": "0x1000", "hex": "deadbeef" }
    /// ] }
    /// ```
    pub fn from_manifest(path: &Path) -> Result<Self, ImageError> {
        let text = std::fs::read_to_string(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest_str(&text, dir)
    }

    /// Parse manifest text; `dir` anchors relative "file" payloads.
    pub fn from_manifest_str(text: &str, dir: &Path) -> Result<Self, ImageError> {
        let manifest: Manifest = serde_json::from_str(text)?;

        let mut image = Self::new();
        for seg in manifest.segments {
            let addr = parse_addr(&seg.addr)?;
            let data = match (seg.file, seg.hex) {
                (Some(file), None) => {
                    let path = dir.join(file);
                    Bytes::from(std::fs::read(&path).map_err(|source| ImageError::Io {
                        path,
                        source,
                    })?)
                }
                (None, Some(hex)) => Bytes::from(parse_hex(&hex).ok_or(ImageError::BadHex { addr })?),
                _ => return Err(ImageError::BadSource { addr }),
            };
            image.push(addr, data);
        }
        Ok(image)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    segments: Vec<ManifestSegment>,
}

#[derive(Debug, Deserialize)]
struct ManifestSegment {
    addr: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    hex: Option<String>,
}

/// Addresses in manifests are strings so they can be hex: "0x80000000".
fn parse_addr(s: &str) -> Result<TargetAddr, ImageError> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => TargetAddr::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| ImageError::BadAddress(s.to_string()))
}

fn parse_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
