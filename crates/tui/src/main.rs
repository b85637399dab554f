mod app;
mod renderer;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use state_timeline_core::model::PanelOptions;
use state_timeline_core::parsers::parse_frames;
use state_timeline_core::theme::Theme;
use tracing::info;

use crate::app::App;

const USAGE: &str = "Usage: state-timeline <frames.json> [--options <options.json>] [--svg <out.svg>]";
const LOG_FILE: &str = "state-timeline.log";
const SVG_WIDTH: f64 = 1200.0;
const SVG_LANE_HEIGHT: f64 = 40.0;

struct Args {
    frames: PathBuf,
    options: Option<PathBuf>,
    svg: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut frames = None;
    let mut options = None;
    let mut svg = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--options" => options = Some(PathBuf::from(args.next().context(USAGE)?)),
            "--svg" => svg = Some(PathBuf::from(args.next().context(USAGE)?)),
            "-h" | "--help" => bail!(USAGE),
            _ if frames.is_none() => frames = Some(PathBuf::from(arg)),
            other => bail!("unexpected argument `{other}`\n{USAGE}"),
        }
    }
    Ok(Args {
        frames: frames.context(USAGE)?,
        options,
        svg,
    })
}

/// The terminal owns stderr, so logs go to a file, and only when asked for.
fn init_logging() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let file = File::create(LOG_FILE).with_context(|| format!("creating {LOG_FILE}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging()?;

    let data = std::fs::read(&args.frames)
        .with_context(|| format!("reading {}", args.frames.display()))?;
    let frames = parse_frames(&data)
        .with_context(|| format!("parsing {}", args.frames.display()))?;
    let options = match &args.options {
        Some(path) => {
            let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            PanelOptions::from_json(&data).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PanelOptions::default(),
    };
    info!(frames = frames.len(), "parsed input");

    let mut app = App::new(frames, options, Theme::dark());

    if let Some(path) = &args.svg {
        std::fs::write(path, app.export_svg(SVG_WIDTH, SVG_LANE_HEIGHT))
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote svg");
        return Ok(());
    }

    renderer::render_tui(&mut app)
}
