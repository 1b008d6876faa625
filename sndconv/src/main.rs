//! sndconv - command-line entry point
//!
//! Converts one input file to 8 kHz mono 16-bit WAV.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sndconv::audio::FlushPolicy;
use sndconv::{ConversionOptions, Pipeline};
use sndconv_common::config::{load_toml_config, resolve_config_path, CONFIG_ENV_VAR};
use sndconv_common::logging::{init_tracing, with_bootstrap_logging};
use tracing::info;

/// Command-line arguments for sndconv
#[derive(Parser, Debug)]
#[command(name = "sndconv")]
#[command(about = "Convert audio files to 8 kHz mono 16-bit WAV")]
#[command(version)]
struct Args {
    /// Input audio file
    input: PathBuf,

    /// Output WAV file (defaults to conversion.output, then result.wav)
    #[arg(short, long, env = "SNDCONV_OUTPUT")]
    output: Option<PathBuf>,

    /// Treat the input as a canonical PCM WAV file and skip probing
    #[arg(long)]
    raw_wav: bool,

    /// Do not drain the resampler at end of stream
    #[arg(long)]
    no_flush: bool,

    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    // The configured subscriber needs the config; warnings raised while
    // loading it go to stderr
    let config = with_bootstrap_logging(std::io::stderr, || {
        load_toml_config(config_path.as_deref())
    })
    .context("Failed to load configuration")?;

    init_tracing(&config.logging, args.log_level.as_deref())
        .context("Failed to initialize logging")?;

    info!("Starting sndconv v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Configuration: {}", path.display());
    }

    let mut options = ConversionOptions::from_config(&config.conversion);
    if args.no_flush {
        options = options.with_flush(FlushPolicy::Skip);
    }
    let output = args
        .output
        .unwrap_or_else(|| config.conversion.output.clone());

    let pipeline = Pipeline::new(options);
    let result = if args.raw_wav {
        pipeline.resample_wave(&args.input, &output)
    } else {
        pipeline.convert_sound(&args.input, &output)
    };
    let report = result.with_context(|| format!("Failed to convert {}", args.input.display()))?;

    info!(
        "Wrote {} ({} Hz {}ch source, {} bytes of PCM)",
        output.display(),
        report.stream.sample_rate,
        report.stream.channels,
        report.data_bytes
    );
    Ok(())
}
