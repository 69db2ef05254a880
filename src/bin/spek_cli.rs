use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use spekview::audio::{sniff, synthetic, AudioDecoder, AudioSource, WavDecoder};
use spekview::config::AppConfig;
use spekview::engine::{InstanceStatus, SpectrogramEngine};
use spekview::error::ErrorCode;

#[derive(Parser, Debug)]
#[command(name = "spek_cli", about = "Render spectrograms of audio files to PNG")]
struct Cli {
    /// JSON configuration file (defaults to assets/spekview.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one or more files; several inputs are tiled into one image
    Render {
        #[arg(long, required = true)]
        input: Vec<PathBuf>,
        /// Defaults to the first input with a .png extension
        #[arg(long)]
        output: Option<PathBuf>,
        /// Plot width in pixels
        #[arg(long, default_value_t = 800)]
        width: u32,
        /// Plot height in pixels
        #[arg(long, default_value_t = 300)]
        height: u32,
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
        /// Wheel notches applied after --zoom, each by view.wheel_zoom_factor
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        zoom_steps: i32,
        /// Left edge of the visible window as a fraction of the duration
        #[arg(long, default_value_t = 0.0)]
        pan: f64,
        /// Logarithmic frequency axis
        #[arg(long)]
        log: bool,
        /// Print the telemetry snapshot to stderr when done
        #[arg(long)]
        telemetry: bool,
    },
    /// Write a synthetic test signal as 16-bit mono WAV
    Synth {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = SignalKind::Sine)]
        kind: SignalKind,
        #[arg(long, default_value_t = 440.0)]
        freq: f32,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
        #[arg(long, default_value_t = 2.0)]
        seconds: f32,
        #[arg(long, default_value_t = 44_100)]
        rate: u32,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Print container metadata and the info line as JSON
    Info {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SignalKind {
    Sine,
    Silence,
    Noise,
}

fn main() -> ExitCode {
    spekview::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);

    match cli.command {
        Commands::Render {
            input,
            output,
            width,
            height,
            zoom,
            zoom_steps,
            pan,
            log,
            telemetry,
        } => {
            let output = output.unwrap_or_else(|| input[0].with_extension("png"));
            let view = RenderView {
                width,
                height,
                zoom,
                zoom_steps,
                pan,
                log,
            };
            run_render(config, &input, &output, view, telemetry)
        }
        Commands::Synth {
            output,
            kind,
            freq,
            amplitude,
            seconds,
            rate,
            seed,
        } => {
            let source = match kind {
                SignalKind::Sine => synthetic::sine(freq, amplitude, seconds, rate),
                SignalKind::Silence => synthetic::silence(seconds, rate),
                SignalKind::Noise => synthetic::white_noise(amplitude, seconds, rate, seed),
            }
            .context("generating signal")?;
            write_wav(&source, &output)?;
            println!(
                "{}",
                serde_json::to_string(&SynthReport {
                    output: &output,
                    samples: source.len(),
                    sample_rate: source.sample_rate(),
                })?
            );
            Ok(ExitCode::from(0))
        }
        Commands::Info { input } => run_info(&input),
    }
}

struct RenderView {
    width: u32,
    height: u32,
    zoom: f64,
    zoom_steps: i32,
    pan: f64,
    log: bool,
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn run_render(
    config: AppConfig,
    inputs: &[PathBuf],
    output: &Path,
    view: RenderView,
    print_telemetry: bool,
) -> Result<ExitCode> {
    if view.width == 0 || view.height == 0 {
        bail!("plot size must be non-zero, got {}x{}", view.width, view.height);
    }

    let engine = SpectrogramEngine::with_config(config);
    engine.set_log_scale(view.log)?;

    let mut ids = Vec::with_capacity(inputs.len());
    let mut reports = Vec::with_capacity(inputs.len());
    for path in inputs {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let (id, status) = engine.open_bytes(&bytes, extension(path))?;
        engine.layout(id, 0, 0, view.width, view.height, view.width, view.height)?;
        engine.set_zoom(id, view.zoom)?;
        if view.zoom_steps != 0 {
            engine.wheel_zoom(id, f64::from(view.zoom_steps))?;
        }
        engine.set_pan(id, view.pan)?;

        if let InstanceStatus::Failed { message } = &status {
            eprintln!("{}: {}", path.display(), message);
        }
        reports.push(InputReport {
            input: path.display().to_string(),
            status,
        });
        ids.push(id);
    }

    let Some(png) = engine.export_composite(&ids)? else {
        for report in &reports {
            println!("{}", serde_json::to_string(report)?);
        }
        eprintln!("Nothing to render: no input could be decoded");
        return Ok(ExitCode::from(2));
    };

    fs::write(output, &png).with_context(|| format!("writing {}", output.display()))?;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    println!(
        "{}",
        serde_json::to_string(&RenderReport {
            output: &output.display().to_string(),
            bytes: png.len(),
        })?
    );

    if print_telemetry {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&engine.telemetry_snapshot())?
        );
    }
    Ok(ExitCode::from(0))
}

fn run_info(input: &Path) -> Result<ExitCode> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let metadata = sniff(&bytes, extension(input));

    let (info, error) = match WavDecoder.decode(&bytes) {
        Ok(decoded) => (Some(metadata.summary(&decoded, bytes.len())), None),
        Err(err) => (None, Some(format!("Error : {}", err.message()))),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&InfoReport {
            input: input.display().to_string(),
            container: metadata.container.label(),
            codec: &metadata.codec,
            sample_rate: metadata.sample_rate,
            channel_count: metadata.channel_count,
            bit_depth: metadata.bit_depth,
            info,
            error,
        })?
    );
    Ok(ExitCode::from(0))
}

fn write_wav(source: &AudioSource, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: source.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in source.samples() {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}

#[derive(Serialize)]
struct InputReport {
    input: String,
    status: InstanceStatus,
}

#[derive(Serialize)]
struct RenderReport<'a> {
    output: &'a str,
    bytes: usize,
}

#[derive(Serialize)]
struct SynthReport<'a> {
    output: &'a Path,
    samples: usize,
    sample_rate: u32,
}

#[derive(Serialize)]
struct InfoReport<'a> {
    input: String,
    container: &'a str,
    codec: &'a str,
    sample_rate: Option<u32>,
    channel_count: Option<u16>,
    bit_depth: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
