mod cache;
mod colour;
mod config;
mod geometry;
mod model;
mod render;
mod view;

use crate::colour::ColourMap;
use crate::config::RenderConfig;
use crate::geometry::{LayerGeometryProvider, Viewport, ZoomLevel};
use crate::model::{DenseModel, GridModel, analyse, read_wav_mono};
use crate::render::{BinScale, Normalization, PlotRenderer, Sources};
use crate::view::PlotView;
use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use jiff::Zoned;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "spectroview")]
#[command(about = "Scrolling spectrogram renderer with incremental viewport caches")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log more detail to stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show audio properties and spectrogram dimensions
    Info {
        /// WAV file to analyse
        wav: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Config file (defaults to config.json in the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render one view of the spectrogram to PNG
    Render {
        #[command(flatten)]
        view: ViewArgs,

        /// Output PNG path (defaults to a timestamped name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Simulate panning across the spectrogram with budgeted repaints
    Scroll {
        #[command(flatten)]
        view: ViewArgs,

        /// Number of scroll steps
        #[arg(long, default_value = "20")]
        steps: u32,

        /// Pixels moved per step (negative scrolls back in time)
        #[arg(long, default_value = "16", allow_negative_numbers = true)]
        step_pixels: i32,

        /// Time budget per render fragment in milliseconds
        #[arg(long)]
        budget_ms: Option<u64>,

        /// Output PNG path for the final frame (defaults to a timestamped name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// WAV file to analyse
    wav: PathBuf,

    /// View width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// View height in pixels
    #[arg(long, default_value = "256")]
    height: u32,

    /// Frame shown at the left edge
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    start: i64,

    /// Horizontal zoom: frames per pixel (e.g. 256) or pixels per frame (e.g. 4ppf)
    #[arg(long, value_parser = parse_zoom)]
    zoom: Option<ZoomLevel>,

    /// Config file (defaults to config.json in the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    colour_map: Option<ColourMap>,

    #[arg(long, value_enum)]
    bin_scale: Option<BinScale>,

    #[arg(long, value_enum)]
    normalization: Option<Normalization>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_zoom(s: &str) -> Result<ZoomLevel, String> {
    let (digits, per_frame) = match s.strip_suffix("ppf") {
        Some(digits) => (digits, true),
        None => (s.strip_suffix("fpp").unwrap_or(s), false),
    };
    let n: u32 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid zoom level '{}'", s))?;
    if n == 0 {
        return Err("zoom level must be at least 1".to_string());
    }
    Ok(if per_frame {
        ZoomLevel::PixelsPerFrame(n)
    } else {
        ZoomLevel::FramesPerPixel(n)
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn default_output_path() -> PathBuf {
    let timestamp = Zoned::now().strftime("%Y-%m-%d_%H-%M-%S");
    PathBuf::from(format!("spectroview_{}.png", timestamp))
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    RenderConfig::load(path).map_err(|e| anyhow!("Failed to load config: {}", e))
}

fn load_model(wav: &Path, config: &RenderConfig) -> Result<(GridModel, hound::WavSpec)> {
    let (samples, spec) = read_wav_mono(wav)?;
    let model = analyse(&samples, config.spectrogram());
    tracing::info!(
        columns = model.width(),
        bins = model.height(),
        "analysed {}",
        wav.display()
    );
    Ok((model, spec))
}

/// Build a session for the requested view, with CLI flags overriding config
fn open_view(args: &ViewArgs, budget_ms: Option<u64>) -> Result<PlotView> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(colour_map) = args.colour_map {
        config.colour_map = colour_map;
    }
    if let Some(bin_scale) = args.bin_scale {
        config.bin_scale = bin_scale;
    }
    if let Some(normalization) = args.normalization {
        config.normalization = normalization;
    }
    if let Some(budget_ms) = budget_ms {
        config.time_budget_ms = budget_ms;
    }

    let (model, _) = load_model(&args.wav, &config)?;
    let zoom = args
        .zoom
        .unwrap_or(ZoomLevel::FramesPerPixel(config.hop_size.max(1) as u32));

    let mut viewport = Viewport::new(args.width, args.height, zoom);
    viewport.set_start_frame(args.start);

    let model: Rc<dyn DenseModel> = Rc::new(model);
    let renderer = PlotRenderer::new(Sources::new(model), config.parameters());
    PlotView::new(viewport, renderer)
}

fn run_info(wav: &Path, format: OutputFormat, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let (model, spec) = load_model(wav, &config)?;
    let frames = model.width() * model.resolution();
    let duration = frames as f64 / spec.sample_rate.max(1) as f64;

    match format {
        OutputFormat::Text => {
            println!("File:        {}", wav.display());
            println!("Sample rate: {} Hz", spec.sample_rate);
            println!("Channels:    {}", spec.channels);
            println!("Bits:        {} ({:?})", spec.bits_per_sample, spec.sample_format);
            println!("Duration:    {:.2}s", duration);
            println!(
                "Spectrogram: {} columns x {} bins ({} frames per column)",
                model.width(),
                model.height(),
                model.resolution()
            );
            println!("Peak value:  {:.4}", model.max_value());
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "file": wav.display().to_string(),
                "sample_rate": spec.sample_rate,
                "channels": spec.channels,
                "bits_per_sample": spec.bits_per_sample,
                "duration": duration,
                "columns": model.width(),
                "bins": model.height(),
                "resolution": model.resolution(),
                "peak": model.max_value(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn run_render(args: &ViewArgs, output: Option<PathBuf>) -> Result<()> {
    let mut view = open_view(args, None)?;

    let started = Instant::now();
    let result = view.paint()?;
    println!(
        "Rendered {}x{} in {:.1}ms",
        result.rendered.width,
        result.rendered.height,
        started.elapsed().as_secs_f64() * 1000.0
    );
    if let (Some(low), Some(high)) = (result.range.low(), result.range.high()) {
        println!("Visible range: {:.4} .. {:.4}", low, high);
    }

    let output = output.unwrap_or_else(default_output_path);
    view.save_png(&output)?;
    println!("Saved {}", output.display());
    Ok(())
}

fn run_scroll(
    args: &ViewArgs,
    steps: u32,
    step_pixels: i32,
    budget_ms: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut view = open_view(args, budget_ms)?;

    let started = Instant::now();
    let initial = view.paint_progressive()?;
    println!(
        "Initial frame: {} fragments, {:.1}ms",
        initial.fragments,
        started.elapsed().as_secs_f64() * 1000.0
    );

    let mut total = Duration::ZERO;
    for step in 1..=steps {
        view.scroll_by(step_pixels);
        let started = Instant::now();
        let progress = view.paint_progressive()?;
        let elapsed = started.elapsed();
        total += elapsed;
        println!(
            "Step {:>3}: start {:>8}, {} fragments, {:.1}ms",
            step,
            view.viewport().start_frame(),
            progress.fragments,
            elapsed.as_secs_f64() * 1000.0
        );
    }
    if steps > 0 {
        println!(
            "Average repaint: {:.1}ms",
            total.as_secs_f64() * 1000.0 / steps as f64
        );
    }

    let output = output.unwrap_or_else(default_output_path);
    view.save_png(&output)?;
    println!("Saved {}", output.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Info {
            wav,
            format,
            config,
        } => run_info(&wav, format, config.as_deref()),

        Commands::Render { view, output } => run_render(&view, output),

        Commands::Scroll {
            view,
            steps,
            step_pixels,
            budget_ms,
            output,
        } => run_scroll(&view, steps, step_pixels, budget_ms, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zoom() {
        assert_eq!(parse_zoom("256"), Ok(ZoomLevel::FramesPerPixel(256)));
        assert_eq!(parse_zoom("64fpp"), Ok(ZoomLevel::FramesPerPixel(64)));
        assert_eq!(parse_zoom("4ppf"), Ok(ZoomLevel::PixelsPerFrame(4)));
        assert!(parse_zoom("0").is_err());
        assert!(parse_zoom("fast").is_err());
    }

    #[test]
    fn test_cli_parses_scroll() {
        let cli = Cli::try_parse_from([
            "spectroview",
            "scroll",
            "in.wav",
            "--steps",
            "5",
            "--step-pixels",
            "-8",
            "--zoom",
            "2ppf",
        ])
        .unwrap();
        match cli.command {
            Commands::Scroll {
                view,
                steps,
                step_pixels,
                ..
            } => {
                assert_eq!(view.wav, PathBuf::from("in.wav"));
                assert_eq!(steps, 5);
                assert_eq!(step_pixels, -8);
                assert_eq!(view.zoom, Some(ZoomLevel::PixelsPerFrame(2)));
            }
            _ => panic!("expected scroll command"),
        }
    }

    #[test]
    fn test_default_output_is_png() {
        let path = default_output_path();
        let name = path.to_string_lossy();
        assert!(name.starts_with("spectroview_") && name.ends_with(".png"));
    }
}
