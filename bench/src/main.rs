use std::{
    fmt::Write as _,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use serde_json::json;
use sha2::Digest as _;

use raytile::{
    ChannelFlags, Device, DeviceConfig, ExecutionMode, FrameBuffer, GradientRenderer,
    LocalFrameBuffer, Renderer, Size2,
};

#[derive(Clone, Debug)]
struct BenchArgs {
    width: u32,
    height: u32,
    tile_size: u32,
    spp: u32,
    warmup: u32,
    repeats: u32,
    devices: usize,
    parallel: bool,
    threads: Option<usize>,
    json_out: Option<PathBuf>,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width/--height must be > 0");
    }
    if args.tile_size == 0 {
        anyhow::bail!("--tile-size must be > 0");
    }
    if args.devices == 0 {
        anyhow::bail!("--devices must be >= 1");
    }
    if args.repeats == 0 {
        anyhow::bail!("--repeats must be >= 1");
    }
    if let Some(n) = args.threads
        && n == 0
    {
        anyhow::bail!("--threads must be >= 1 when set");
    }

    let size = Size2::new(args.width, args.height);
    let channels = ChannelFlags::COLOR | ChannelFlags::DEPTH | ChannelFlags::NORMAL;
    let local = Arc::new(
        LocalFrameBuffer::with_tile_size(size, args.tile_size, channels)
            .context("create frame buffer")?,
    );
    let fb: Arc<dyn FrameBuffer> = local.clone();
    let renderer: Arc<dyn Renderer> = Arc::new(GradientRenderer::new(size).with_spp(args.spp));

    // One device per share; with --devices 1 this is the plain local balancer.
    let devices = (0..args.devices)
        .map(|device_id| {
            let mode = if args.devices == 1 {
                ExecutionMode::Local
            } else {
                ExecutionMode::Interleaved {
                    device_id,
                    num_devices: args.devices,
                }
            };
            Device::new(DeviceConfig {
                mode,
                parallel: args.parallel,
                threads: args.threads,
            })
            .with_context(|| format!("create device {device_id}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    eprintln!(
        "frame {}x{} tile={} tiles={} spp={} devices={} parallel={}",
        args.width,
        args.height,
        args.tile_size,
        local.grid().total(),
        args.spp,
        args.devices,
        args.parallel
    );

    let render_once = || -> anyhow::Result<Duration> {
        local.clear()?;
        let t0 = Instant::now();
        for device in &devices {
            device.render_frame(&renderer, &fb, channels)?;
        }
        Ok(t0.elapsed())
    };

    for _ in 0..args.warmup {
        render_once()?;
    }

    let mut runs = Vec::with_capacity(args.repeats as usize);
    let mut digest: Option<String> = None;
    for i in 0..args.repeats {
        runs.push(render_once()?);
        let d = sha256_hex(&local.color_rgba8()?);
        match &digest {
            Some(first) if *first != d => {
                anyhow::bail!("run {i} produced a different image ({d} != {first})")
            }
            Some(_) => {}
            None => digest = Some(d),
        }
    }

    let digest = digest.unwrap_or_default();
    eprintln!("color sha256: {digest}");
    print_percentiles(&runs);

    if let Some(path) = args.json_out {
        let mut sorted = runs.clone();
        sorted.sort();
        let report = json!({
            "width": args.width,
            "height": args.height,
            "tile_size": args.tile_size,
            "tiles": local.grid().total(),
            "devices": args.devices,
            "parallel": args.parallel,
            "threads": args.threads,
            "spp": args.spp,
            "repeats": args.repeats,
            "p50_ms": ms(percentile(&sorted, 0.50)),
            "p90_ms": ms(percentile(&sorted, 0.90)),
            "p99_ms": ms(percentile(&sorted, 0.99)),
            "color_sha256": digest,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("write '{}'", path.display()))?;
    }

    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn parse_args() -> anyhow::Result<BenchArgs> {
    let mut args = std::env::args().skip(1);

    let mut out = BenchArgs {
        width: 1024,
        height: 768,
        tile_size: raytile::DEFAULT_TILE_SIZE,
        spp: 4,
        warmup: 1,
        repeats: 20,
        devices: 1,
        parallel: false,
        threads: None,
        json_out: None,
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--width" => out.width = parse_u32(args.next(), "--width")?,
            "--height" => out.height = parse_u32(args.next(), "--height")?,
            "--tile-size" => out.tile_size = parse_u32(args.next(), "--tile-size")?,
            "--spp" => out.spp = parse_u32(args.next(), "--spp")?,
            "--warmup" => out.warmup = parse_u32(args.next(), "--warmup")?,
            "--repeats" => out.repeats = parse_u32(args.next(), "--repeats")?,
            "--devices" => out.devices = parse_usize(args.next(), "--devices")?,
            "--parallel" => out.parallel = true,
            "--threads" => out.threads = Some(parse_usize(args.next(), "--threads")?),
            "--json" => {
                out.json_out = Some(PathBuf::from(args.next().ok_or_else(|| {
                    anyhow::anyhow!("missing value for --json (expected a path)")
                })?))
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => anyhow::bail!("unknown arg '{a}' (try --help)"),
        }
    }

    Ok(out)
}

fn print_help() {
    eprintln!(
        r#"raytile-bench

Renders one frame repeatedly through the tiled load balancer and reports p50/p90/p99.
Every run must hash to the same color image.

Usage:
  cargo run -q --release
  cargo run -q --release -- --parallel --threads 8
  cargo run -q --release -- --parallel --devices 4 --tile-size 32

Args:
  --width N        (default 1024)
  --height N       (default 768)
  --tile-size N    (default 64)
  --spp N          (default 4)
  --warmup N       (default 1)
  --repeats N      (default 20)
  --devices N      (default 1; >1 renders interleaved shares one after another)
  --parallel       (use a rayon pool per device)
  --threads N      (rayon threads per device)
  --json PATH      (write a JSON summary)"#
    );
}

fn parse_u32(v: Option<String>, flag: &str) -> anyhow::Result<u32> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u32>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn parse_usize(v: Option<String>, flag: &str) -> anyhow::Result<usize> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<usize>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let n = sorted.len();
    if n == 0 {
        return Duration::ZERO;
    }
    let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
    sorted[rank - 1]
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn print_percentiles(runs: &[Duration]) {
    let mut v = runs.to_vec();
    v.sort();
    eprintln!(
        "frame  p50={:.3}ms  p90={:.3}ms  p99={:.3}ms",
        ms(percentile(&v, 0.50)),
        ms(percentile(&v, 0.90)),
        ms(percentile(&v, 0.99))
    );
}
