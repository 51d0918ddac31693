//! The host harness: wires a platform and proc control to a `TargetBridge`,
//! loads the image, and walks the session through its lifecycle. The real
//! control engine (tohost/fromhost protocol, syscall proxy, console) is an
//! external component; this binary stands in as a minimal driver so a
//! bridge + backend pair can be exercised end to end.

use anyhow::{Context, Result, bail};
use hostlink_core::{Lifecycle, ProgramImage, TargetAddr, TargetBridge};
use hostlink_io::{Platform, ProcControl, SerialConfig, SerialLink, SimPlatform, SimProcControl};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = Options::parse(&args)?;

    let level = if opts.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    eprintln!("=== Hostlink Bridge Starting ===");

    let image = load_image(&opts)?;
    info!(
        "image: {} segments, {} bytes",
        image.segments().len(),
        image.total_bytes()
    );

    // Keep the first segment around to verify the load end to end.
    let probe = image
        .segments()
        .first()
        .map(|s| (s.addr, s.data.to_vec()));

    let (mut platform, mut proc): (Box<dyn Platform>, Box<dyn ProcControl>) = match &opts.port {
        Some(port) => {
            let config = SerialConfig::new(port, opts.baud);
            let (platform, proc) = SerialLink::open(&config).context("failed to open serial link")?;
            (Box::new(platform), Box::new(proc))
        }
        None => {
            info!(
                "simulated target: {:#x}+{:#x}, align {}, chunk {}",
                opts.base, opts.mem_size, opts.align, opts.chunk_max
            );
            (
                Box::new(SimPlatform::new(opts.base, opts.mem_size, opts.align, opts.chunk_max)),
                Box::new(SimProcControl::new()),
            )
        }
    };

    let mut bridge = TargetBridge::new(args, proc.as_mut(), platform.as_mut(), image);

    let outcome = run_session(&mut bridge, probe);
    // Teardown runs on both paths; a failed session still gets stopped.
    bridge.stop();
    outcome?;

    info!("session complete ({})", bridge.state());
    Ok(())
}

fn run_session(
    bridge: &mut TargetBridge<'_>,
    probe: Option<(TargetAddr, Vec<u8>)>,
) -> Result<()> {
    bridge.start().context("session aborted during start")?;

    if let Some((addr, expected)) = probe {
        let mut readback = vec![0u8; expected.len()];
        bridge
            .read_chunk(addr, &mut readback)
            .context("image readback failed")?;
        if readback != expected {
            bail!("image readback mismatch at {addr:#x}");
        }
        info!("image verified ({} bytes at {:#x})", expected.len(), addr);
    }

    bridge.notify_running();
    Ok(())
}

#[derive(Debug)]
struct Options {
    image: PathBuf,
    base: TargetAddr,
    mem_size: usize,
    align: usize,
    chunk_max: usize,
    port: Option<String>,
    baud: u32,
    verbose: bool,
}

impl Options {
    /// fesvr-style argv: `+key=value` options for the harness, first bare
    /// argument is the image, everything after it belongs to the engine.
    fn parse(args: &[String]) -> Result<Self> {
        let mut opts = Self {
            image: PathBuf::new(),
            base: 0x8000_0000,
            mem_size: 16 * 1024 * 1024,
            align: 8,
            chunk_max: 1024,
            port: None,
            baud: 115_200,
            verbose: false,
        };

        let mut image = None;
        for arg in args {
            if let Some(opt) = arg.strip_prefix('+') {
                if image.is_some() {
                    continue; // engine territory
                }
                match opt.split_once('=') {
                    None if opt == "verbose" => opts.verbose = true,
                    Some(("base", v)) => opts.base = parse_num(v)?,
                    Some(("mem", v)) => opts.mem_size = parse_num(v)? as usize,
                    Some(("align", v)) => opts.align = parse_num(v)? as usize,
                    Some(("chunk", v)) => opts.chunk_max = parse_num(v)? as usize,
                    Some(("port", v)) => opts.port = Some(v.to_string()),
                    Some(("baud", v)) => opts.baud = parse_num(v)? as u32,
                    _ => bail!("unknown option +{opt}"),
                }
            } else if image.is_none() {
                image = Some(PathBuf::from(arg));
            }
        }

        opts.image = image.context("usage: hostlink-bridge [+options] <image> [engine args...]")?;
        Ok(opts)
    }
}

fn load_image(opts: &Options) -> Result<ProgramImage> {
    let is_manifest = opts
        .image
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let image = if is_manifest {
        ProgramImage::from_manifest(&opts.image)
    } else {
        ProgramImage::from_flat_binary(&opts.image, opts.base)
    };
    let image = image.with_context(|| format!("failed to load image {}", opts.image.display()))?;
    if image.is_empty() {
        bail!("image {} has no segments", opts.image.display());
    }
    Ok(image)
}

fn parse_num(s: &str) -> Result<u64> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("bad number {s:?}"))
}
