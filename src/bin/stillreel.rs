use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "stillreel", version)]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `stillreel=debug`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render images (or one video) into a zooming, crossfaded video.
    Render(RenderArgs),
    /// Print the timeline and segment plan as JSON without rendering.
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input images, in playback order.
    #[arg(required_unless_present = "video", conflicts_with = "video")]
    images: Vec<PathBuf>,

    /// One long video to cut into clips (needs the `media-ffmpeg` feature).
    #[arg(long)]
    video: Option<PathBuf>,

    /// Render configuration JSON. Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds per clip.
    #[arg(long)]
    clip_duration: Option<f64>,

    /// Zoom reached at the end of each clip.
    #[arg(long)]
    zoom: Option<f64>,

    /// Crossfade length between clips, seconds.
    #[arg(long)]
    transition: Option<f64>,

    /// Per-clip fade from black, seconds.
    #[arg(long)]
    fade_in: Option<f64>,

    /// Per-clip fade to black, seconds.
    #[arg(long)]
    fade_out: Option<f64>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Render in segments of at most this many seconds.
    #[arg(long)]
    chunk: Option<f64>,

    /// Render segments on a worker pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// Directory for intermediate segment files.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Output format; inferred from the `--out` extension when omitted.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Mp4,
    Y4m,
}

impl From<FormatChoice> for stillreel::OutputFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Mp4 => Self::Mp4H264,
            FormatChoice::Y4m => Self::Y4m,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn init_logging(level: &str, json: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

fn load_config(args: &InputArgs) -> anyhow::Result<stillreel::RenderConfig> {
    let mut cfg = match &args.config {
        Some(path) => stillreel::RenderConfig::from_json_file(path)?,
        None => stillreel::RenderConfig::default(),
    };
    if let Some(v) = args.clip_duration {
        cfg.clip_duration = v;
    }
    if let Some(v) = args.zoom {
        cfg.zoom_factor = v;
    }
    if let Some(v) = args.transition {
        cfg.transition_duration = v;
    }
    if let Some(v) = args.fade_in {
        cfg.fade_in = v;
    }
    if let Some(v) = args.fade_out {
        cfg.fade_out = v;
    }
    if let Some(v) = args.fps {
        cfg.fps = v;
    }
    if let Some(v) = args.width {
        cfg.canvas.width = v;
    }
    if let Some(v) = args.height {
        cfg.canvas.height = v;
    }
    if args.chunk.is_some() {
        cfg.chunk_duration = args.chunk;
    }
    if args.parallel {
        cfg.threading.parallel = true;
    }
    if args.threads.is_some() {
        cfg.threading.threads = args.threads;
    }
    if args.scratch_dir.is_some() {
        cfg.scratch_dir = args.scratch_dir.clone();
    }
    Ok(cfg)
}

fn load_input(
    args: &InputArgs,
    cfg: &stillreel::RenderConfig,
    host: &dyn stillreel::RenderHost,
) -> anyhow::Result<stillreel::RenderInput> {
    if let Some(path) = &args.video {
        let source = stillreel::FfmpegVideoSource::open(path)
            .with_context(|| format!("open video '{}'", path.display()))?;
        return Ok(stillreel::RenderInput::Video(Arc::new(source)));
    }

    cfg.limits.admit(args.images.len(), 0.0)?;
    let refs = args
        .images
        .iter()
        .map(|p| {
            p.to_str()
                .map(str::to_owned)
                .with_context(|| format!("image path '{}' is not valid UTF-8", p.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(stillreel::RenderInput::Images(stillreel::load_images(
        host, &refs,
    )?))
}

fn infer_format(out: &Path) -> stillreel::OutputFormat {
    match out.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("y4m") => stillreel::OutputFormat::Y4m,
        _ => stillreel::OutputFormat::Mp4H264,
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(&args.input)?;
    cfg.format = args
        .format
        .map_or_else(|| infer_format(&args.out), Into::into);
    cfg.validate()?;

    let host = stillreel::FsHost::new(&args.out);
    let input = load_input(&args.input, &cfg, &host)?;
    let artifact = stillreel::render(input, &cfg, &host)?;

    eprintln!(
        "wrote {} ({} frames, {:.3}s, {}/{})",
        args.out.display(),
        artifact.frame_count,
        artifact.duration_secs(),
        artifact.container(),
        artifact.codec()
    );
    Ok(())
}

#[derive(serde::Serialize)]
struct PlanReport {
    clips: usize,
    total_duration_secs: f64,
    frame_count: u64,
    transition_windows: Vec<stillreel::TimeRange>,
    segments: Vec<stillreel::RenderSegment>,
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.input)?;
    cfg.validate()?;

    let host = stillreel::FsHost::new("stillreel-plan.out");
    let input = load_input(&args.input, &cfg, &host)?;
    let timeline = stillreel::build_timeline(input, &cfg)?;
    let fps = cfg.fps()?;
    // Unchunked renders run as one segment spanning every frame.
    let chunk = cfg
        .chunk_duration
        .unwrap_or(timeline.total_duration() + fps.frame_duration_secs());
    let segments = stillreel::plan_segments(&timeline, fps, chunk)?;

    let report = PlanReport {
        clips: timeline.clips().len(),
        total_duration_secs: timeline.total_duration(),
        frame_count: timeline.frame_count(fps),
        transition_windows: timeline.transition_windows(),
        segments,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize plan")?
    );
    Ok(())
}
