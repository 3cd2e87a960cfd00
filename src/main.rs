use pixelfem::{load_png, run_viewer, EngineControl, FrameRecorder, Scenario, SimConfig, View};
use pixelfem::{bench_convergence_curve, bench_substep};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pixelfem", about = "Soft-body sprite simulation")]
struct Args {
    /// Sprite to simulate (PNG, transparent pixels are empty space)
    #[arg(required_unless_present = "bench")]
    image: Option<PathBuf>,

    /// Window / recording size as WIDTHxHEIGHT
    #[arg(long, default_value = "640x480", value_parser = parse_size)]
    size: WindowSize,

    /// Screen pixels per sprite pixel
    #[arg(long, default_value_t = 4.0, value_parser = parse_scale)]
    scale: f32,

    /// Write every frame as a PNG into --out
    #[arg(long)]
    record: bool,

    /// Keep the body centred in the view
    #[arg(long)]
    track: bool,

    /// Scenario YAML; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run headless for this many frames instead of opening a window
    #[arg(long)]
    frames: Option<u64>,

    /// Directory for recorded frames
    #[arg(long, default_value = "frames")]
    out: PathBuf,

    /// Engines held on for the whole headless run
    #[arg(long, value_enum)]
    fire: Vec<Fire>,

    /// Run a benchmark and exit
    #[arg(long, value_enum)]
    bench: Option<Bench>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Fire {
    Thrust,
    Left,
    Right,
}

impl From<Fire> for EngineControl {
    fn from(f: Fire) -> Self {
        match f {
            Fire::Thrust => EngineControl::Thrust,
            Fire::Left => EngineControl::Left,
            Fire::Right => EngineControl::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Bench {
    Substep,
    Convergence,
}

fn parse_size(s: &str) -> Result<WindowSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{}': expected WIDTHxHEIGHT, e.g. 640x480", s))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}' in size '{}'", w, s))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}' in size '{}'", h, s))?;
    if width == 0 || height == 0 {
        return Err(format!("invalid size '{}': both dimensions must be positive", s));
    }
    Ok(WindowSize { width, height })
}

fn parse_scale(s: &str) -> Result<f32, String> {
    let scale: f32 = s.parse().map_err(|_| format!("invalid scale '{}': not a number", s))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("invalid scale '{}': must be a positive number", s));
    }
    Ok(scale)
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let cfg = match path {
        Some(p) => SimConfig::load(p).with_context(|| format!("failed to load scenario {}", p.display()))?,
        None => SimConfig::default(),
    };
    cfg.validate().context("invalid scenario")?;
    Ok(cfg)
}

/// Fixed number of frames without a window; logs the centroid once per second
fn run_headless(mut scenario: Scenario, view: View, mut recorder: Option<FrameRecorder>, frames: u64) -> Result<()> {
    let per_second = ((1.0 / scenario.parameters.dt).round() as u64).max(1);

    for _ in 0..frames {
        scenario.step_frame().context("simulation halted")?;

        if let Some(rec) = recorder.as_mut() {
            rec.record(&scenario.body, &view)?;
        }
        if scenario.frame % per_second == 0 {
            let m = scenario.body.centroid();
            info!(
                "t = {:7.3}  centroid = ({:9.3}, {:9.3})  velocity = ({:8.3}, {:8.3})",
                scenario.body.time(),
                m.position.x,
                m.position.y,
                m.velocity.x,
                m.velocity.y
            );
        }
    }

    if !scenario.body.is_finite() {
        bail!("state became non-finite after {} frames", scenario.frame);
    }
    if let Some(rec) = recorder {
        info!("wrote {} frames", rec.frames_written());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(bench) = args.bench {
        match bench {
            Bench::Substep => bench_substep()?,
            Bench::Convergence => bench_convergence_curve()?,
        }
        return Ok(());
    }

    let Some(image_path) = args.image.as_deref() else {
        bail!("no sprite given");
    };

    let cfg = load_config(args.config.as_deref())?;
    let image = load_png(image_path).with_context(|| format!("failed to load sprite {}", image_path.display()))?;
    let mut scenario = Scenario::build_scenario(&cfg, &image).context("failed to build scenario")?;

    for f in &args.fire {
        scenario.body.engines_mut().press((*f).into());
    }

    let view = View {
        width: args.size.width,
        height: args.size.height,
        scale: args.scale,
        track: args.track,
    };
    let recorder = if args.record {
        Some(FrameRecorder::new(&args.out)?)
    } else {
        None
    };

    match args.frames {
        Some(n) => run_headless(scenario, view, recorder, n),
        None => {
            run_viewer(scenario, view, recorder);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_sizes_are_rejected() {
        for s in ["0x5", "abc", "12x", "x480", "-1x5"] {
            let err = parse_size(s).unwrap_err();
            assert!(err.contains(s), "message for '{}' was: {}", s, err);
        }
    }

    #[test]
    fn size_separator_is_case_insensitive() {
        assert_eq!(parse_size("640X480").unwrap(), WindowSize { width: 640, height: 480 });
        assert_eq!(parse_size("32x16").unwrap(), WindowSize { width: 32, height: 16 });
    }

    #[test]
    fn bad_scales_are_rejected() {
        for s in ["0", "-1", "nan", "inf", "x"] {
            let err = parse_scale(s).unwrap_err();
            assert!(err.contains(s), "message for '{}' was: {}", s, err);
        }
        assert_eq!(parse_scale("2.5").unwrap(), 2.5);
    }

    #[test]
    fn invalid_flags_fail_argument_parsing() {
        assert!(Args::try_parse_from(["pixelfem", "ship.png", "--size", "0x5"]).is_err());
        assert!(Args::try_parse_from(["pixelfem", "ship.png", "--scale", "nan"]).is_err());
        assert!(Args::try_parse_from(["pixelfem"]).is_err());
        let args = Args::try_parse_from(["pixelfem", "ship.png", "--size", "320x200"]).unwrap();
        assert_eq!(args.size, WindowSize { width: 320, height: 200 });
    }
}
