use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use storyreel::encode::ensure_parent_dir;
use storyreel::{
    FrameIndex, Pipeline, PipelineInputs, ReelConfig, RenderThreading, TransformKind,
    TransformPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    /// Log filter (overrides the config file; `RUST_LOG` overrides both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the full video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Build the timeline and print it as JSON without encoding.
    Plan(InputArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Duration manifest (`<audio-file>: <seconds> seconds` per line).
    #[arg(long)]
    manifest: PathBuf,

    /// Directory of still images.
    #[arg(long)]
    images: PathBuf,

    /// Directory of narration audio.
    #[arg(long)]
    audio: PathBuf,

    /// JSON config file; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use this transform for every clip.
    #[arg(long, conflicts_with = "seed")]
    transform: Option<TransformKind>,

    /// Pick transforms at random with this seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Export without narration.
    #[arg(long)]
    no_audio: bool,

    /// Render frames on a thread pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long, requires = "parallel")]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(ref args) => cmd_render(&cli, args),
        Command::Plan(ref args) => cmd_plan(&cli, args),
        Command::Frame(ref args) => cmd_frame(&cli, args),
    }
}

fn load_config(cli: &Cli, input: &InputArgs) -> anyhow::Result<ReelConfig> {
    let mut cfg = match &input.config {
        Some(path) => ReelConfig::from_path(path)?,
        None => ReelConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        cfg.logging.level = level.clone();
    }
    if cli.log_json {
        cfg.logging.json = true;
    }
    if let Some(kind) = input.transform {
        cfg.motion.policy = TransformPolicy::Fixed(kind);
    }
    if let Some(seed) = input.seed {
        cfg.motion.policy = TransformPolicy::Random { seed: Some(seed) };
    }
    storyreel::logging::init_logging(&cfg.logging);
    Ok(cfg)
}

fn inputs(input: &InputArgs) -> PipelineInputs {
    PipelineInputs {
        manifest: input.manifest.clone(),
        images_dir: input.images.clone(),
        audio_dir: input.audio.clone(),
    }
}

fn cmd_render(cli: &Cli, args: &RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(cli, &args.input)?;
    if args.no_audio {
        cfg.audio.enabled = false;
    }
    let threading = RenderThreading {
        parallel: args.parallel,
        threads: args.threads,
        ..RenderThreading::default()
    };

    let pipeline = Pipeline::new(cfg, inputs(&args.input))?.with_threading(threading);
    let report = pipeline.run(&args.out)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_plan(cli: &Cli, args: &InputArgs) -> anyhow::Result<()> {
    let cfg = load_config(cli, args)?;
    let planned = Pipeline::new(cfg, inputs(args))?.plan()?;

    let out = serde_json::json!({
        "timeline": planned.timeline.plan(),
        "skipped": planned.skipped,
        "malformed_lines": planned.malformed_lines,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_frame(cli: &Cli, args: &FrameArgs) -> anyhow::Result<()> {
    let cfg = load_config(cli, &args.input)?;
    let frame = Pipeline::new(cfg, inputs(&args.input))?
        .render_preview_frame(FrameIndex(args.frame))?;

    ensure_parent_dir(&args.out)?;
    frame
        .to_rgba_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
