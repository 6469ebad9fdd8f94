use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pianoreel", version)]
struct Cli {
    /// Log at DEBUG level (external command lines, cache misses).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg`, and `fluidsynth` when audio is enabled).
    Render(RenderArgs),
    /// Render the keyboard at one point in time as a PNG.
    Frame(FrameArgs),
    /// Print the resolved note timeline as JSON.
    Timeline(TimelineArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Input MIDI file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Config TOML. Repeat to layer files; later files override earlier keys.
    #[arg(long = "config")]
    configs: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Directory that holds the per-run temp directory.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Keep the temp directory (frames, manifest, audio) after the run.
    #[arg(long)]
    keep_temp: bool,

    /// Rasterize distinct frames on a thread pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel (defaults to the number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Time of the frame, in milliseconds from the start.
    #[arg(long, default_value_t = 0)]
    at_ms: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct TimelineArgs {
    #[command(flatten)]
    input: InputArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Timeline(args) => cmd_timeline(args),
    }
}

fn prepare(input: &InputArgs) -> anyhow::Result<pianoreel::RenderSession> {
    let config = if input.configs.is_empty() {
        pianoreel::Config::default()
    } else {
        pianoreel::Config::load_layered(input.configs.as_slice())?
    };
    Ok(pianoreel::RenderSession::prepare(&input.in_path, config)?)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let session = prepare(&args.input)?;
    let opts = pianoreel::RenderSessionOpts {
        work_dir: args.work_dir,
        keep_temp: args.keep_temp,
        threading: pianoreel::RenderThreading {
            parallel: args.parallel,
            threads: args.jobs,
        },
        ..Default::default()
    };

    let report = session.render_to_mp4(&args.out, &opts)?;
    eprintln!(
        "wrote {} ({} frames, {} rendered, {} reused)",
        report.output.display(),
        report.stats.frames_total,
        report.stats.frames_rendered,
        report.stats.frames_reused
    );
    if let Some(dir) = report.temp_dir {
        eprintln!("kept {}", dir.display());
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = prepare(&args.input)?;
    let rasterizer = session.rasterizer()?;
    let frame = session.render_still(args.at_ms as f64 * 1000.0, &rasterizer)?;

    pianoreel::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

#[derive(serde::Serialize)]
struct TimelineDump<'a> {
    range: pianoreel::KeyRange,
    fps: u32,
    total_frames: u64,
    duration_micros: f64,
    events: &'a [pianoreel::NoteEvent],
}

fn cmd_timeline(args: TimelineArgs) -> anyhow::Result<()> {
    let session = prepare(&args.input)?;
    let timeline = session.timeline();
    let dump = TimelineDump {
        range: session.range(),
        fps: session.fps().num,
        total_frames: session.total_frames(),
        duration_micros: timeline.duration_micros(),
        events: timeline.events(),
    };
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &dump).context("write timeline JSON")?;
    println!();
    Ok(())
}
