use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use loopline::config::presets::resolve_font_family;
use loopline::{
    AnimationLoop, CancelToken, CaptureCodec, CountedTicker, CpuSurface, Direction, FALLBACK_PHRASES,
    Fps, GeminiSuggester, InMemorySink, Mood, Recorder, RenderConfig, SinkConfig,
    SuggestionRequest, SurfaceDesc, TextEngine, TextTransform, apply_first_phrase,
    is_ffmpeg_on_path, suggest_or_fallback,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "loopline", version, about = "Infinite scrolling text loops")]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the loop after a number of ticks as a PNG.
    Frame(FrameArgs),
    /// Record the loop to a video file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Ask for phrase suggestions on a topic.
    Suggest(SuggestArgs),
    /// Print or write the default configuration.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct SurfaceArgs {
    /// Surface width in logical pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Surface height in logical pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Extra font files to make available by family name.
    #[arg(long = "font-file")]
    font_files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Configuration JSON; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    text: Option<String>,

    /// Preset name (e.g. "Bebas Neue") or a font family stack.
    #[arg(long)]
    font: Option<String>,

    #[arg(long)]
    font_size: Option<f64>,

    /// Pixels per tick.
    #[arg(long)]
    speed: Option<f64>,

    #[arg(long, value_enum)]
    direction: Option<DirectionChoice>,

    /// Stroke glyph outlines instead of filling them.
    #[arg(long)]
    outline: bool,

    #[arg(long, value_enum)]
    transform: Option<TransformChoice>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionChoice {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransformChoice {
    None,
    Uppercase,
    Lowercase,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    Auto,
    Webm,
    Mp4,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Ticks to advance before capturing (the captured frame is the last one).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    ticks: u64,

    #[command(flatten)]
    surface: SurfaceArgs,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Directory receiving `infinity-loop-<millis>.<ext>`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Clip length in seconds.
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    /// Ticks per second; one tick advances the offset by `speed`.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    #[arg(long, value_enum, default_value_t = CodecChoice::Auto)]
    codec: CodecChoice,

    #[command(flatten)]
    surface: SurfaceArgs,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct SuggestArgs {
    #[arg(long)]
    topic: String,

    /// One of cyberpunk, retro, minimalist, aggressive, calm.
    #[arg(long, default_value_t = Mood::Cyberpunk)]
    mood: Mood,

    /// Base configuration for `--write`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the configuration with its text replaced by the first phrase.
    #[arg(long)]
    write: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Write to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Suggest(args) => cmd_suggest(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenderConfig> {
    match path {
        Some(path) => RenderConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn styled_config(style: &StyleArgs) -> anyhow::Result<RenderConfig> {
    let mut config = load_config(style.config.as_deref())?;
    if let Some(text) = &style.text {
        config.text = text.replace("\\n", "\n");
    }
    if let Some(font) = &style.font {
        config.font_family = resolve_font_family(font);
    }
    if let Some(size) = style.font_size {
        config.font_size = size;
    }
    if let Some(speed) = style.speed {
        config.speed = speed;
    }
    if let Some(direction) = style.direction {
        config.direction = match direction {
            DirectionChoice::Left => Direction::Left,
            DirectionChoice::Right => Direction::Right,
        };
    }
    if style.outline {
        config.is_outline = true;
    }
    if let Some(transform) = style.transform {
        config.text_transform = match transform {
            TransformChoice::None => TextTransform::None,
            TransformChoice::Uppercase => TextTransform::Uppercase,
            TransformChoice::Lowercase => TextTransform::Lowercase,
        };
    }
    let config = config.clamped();
    config.validate()?;
    Ok(config)
}

fn make_surface(args: &SurfaceArgs) -> anyhow::Result<CpuSurface> {
    let desc = SurfaceDesc::new(args.width, args.height, args.scale)?;
    let mut engine = TextEngine::new();
    for path in &args.font_files {
        let families = engine
            .register_font_file(path)
            .with_context(|| format!("register font '{}'", path.display()))?;
        info!(path = %path.display(), ?families, "font registered");
    }
    Ok(CpuSurface::with_engine(desc, engine)?)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let config = styled_config(&args.style)?;
    let surface = make_surface(&args.surface)?;
    let (width, height) = surface_physical_size(&args.surface)?;

    let mut animation = AnimationLoop::new(config, surface);
    let cancel = CancelToken::new();
    animation.run(&mut CountedTicker::new(args.ticks - 1), &cancel);

    let sink = Arc::new(Mutex::new(InMemorySink::new()));
    let tap = animation.tap();
    tap.attach(
        Box::new(Arc::clone(&sink)),
        SinkConfig {
            width,
            height,
            fps: Fps::default(),
        },
    )?;
    animation.tick();
    tap.finish()?;

    let frame = sink
        .lock()
        .map_err(|_| anyhow::anyhow!("frame sink lock poisoned"))?
        .frames()
        .last()
        .map(|(_, f)| f.clone())
        .context("surface presented no frame")?
        .into_straight_alpha();

    ensure_parent(&args.out)?;
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

fn surface_physical_size(args: &SurfaceArgs) -> anyhow::Result<(u32, u32)> {
    Ok(SurfaceDesc::new(args.width, args.height, args.scale)?.physical_size())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if !is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg is required for recording, but was not found on PATH");
    }
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        anyhow::bail!("--seconds must be a positive number");
    }
    let config = styled_config(&args.style)?;
    let surface = make_surface(&args.surface)?;
    let (width, height) = surface_physical_size(&args.surface)?;
    let fps = Fps::new(args.fps, 1)?;
    let frames = fps.frames_for_secs(args.seconds);

    let mut animation = AnimationLoop::new(config, surface);
    let mut recorder = Recorder::new(animation.tap(), &args.out_dir);
    recorder = match args.codec {
        CodecChoice::Auto => recorder,
        CodecChoice::Webm => recorder.with_codec(CaptureCodec::Vp9Webm),
        CodecChoice::Mp4 => recorder.with_codec(CaptureCodec::H264Mp4),
    };

    info!(frames, codec = ?recorder.codec(), "recording");
    recorder.start(SinkConfig { width, height, fps })?;
    let stats = animation.run(&mut CountedTicker::new(frames), &CancelToken::new());
    let path = recorder
        .stop()?
        .context("recording finished without an output file")?;
    info!(ticks = stats.ticks, "recording done");

    println!("{}", path.display());
    Ok(())
}

fn cmd_suggest(args: SuggestArgs) -> anyhow::Result<()> {
    let request = SuggestionRequest::new(args.topic, args.mood)?;
    let phrases = match GeminiSuggester::from_env() {
        Ok(suggester) => suggest_or_fallback(&suggester, &request),
        Err(err) => {
            warn!(error = %err, "suggestion client unavailable, using fallback");
            FALLBACK_PHRASES.iter().map(|s| (*s).to_owned()).collect()
        }
    };

    for phrase in &phrases {
        println!("{phrase}");
    }

    if let Some(out) = &args.write {
        let base = load_config(args.config.as_deref())?;
        match apply_first_phrase(&base, &phrases) {
            Some(config) => {
                write_config(&config, out)?;
                eprintln!("wrote {}", out.display());
            }
            None => warn!("no phrases returned, config left unchanged"),
        }
    }
    Ok(())
}

fn write_config(config: &RenderConfig, out: &Path) -> anyhow::Result<()> {
    ensure_parent(out)?;
    std::fs::write(out, config.to_json_pretty()?)
        .with_context(|| format!("write config '{}'", out.display()))
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = RenderConfig::default();
    match &args.out {
        Some(out) => {
            write_config(&config, out)?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{}", config.to_json_pretty()?),
    }
    Ok(())
}
