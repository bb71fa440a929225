//! DropReel - capture a simulation run and turn it into a publishable video.
//!
//! `dropreel run` drives the built-in drop scene through a live session, then
//! mixes the recorded sound events and muxes the result. The offline stages are
//! also available on their own.

mod demo;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use demo::DropScene;
use dropreel_audio::SoundCatalog;
use dropreel_core::RunConfig;
use dropreel_media::{locate_ffmpeg, prepare_catalog_variants, Multiplexer};
use dropreel_session::{compose_audio, render_deliverable, RunSession};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "dropreel", version, about = "Simulation capture and soundtrack mixdown")]
struct Cli {
    /// JSON run configuration. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the default configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_default_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the drop scene, capture it and produce the final video
    Run {
        /// Seed for the scene; random when omitted
        #[arg(long)]
        seed: Option<u64>,
        /// Tick as fast as possible instead of at the frame rate
        #[arg(long)]
        no_realtime: bool,
        /// Stop after the soundtrack is mixed
        #[arg(long)]
        no_mux: bool,
    },
    /// Mix an exported event log into a WAV file
    Compose {
        /// Event log CSV
        #[arg(long)]
        events: PathBuf,
        /// Output WAV; the configured audio path when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Mux a captured video with a mixed soundtrack
    Mux {
        #[arg(long)]
        video: PathBuf,
        #[arg(long)]
        audio: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Create the missing pitch variants of every sound that declares them
    Variants,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    if let Some(path) = &cli.write_default_config {
        RunConfig::default()
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Default configuration written");
        return Ok(());
    }
    let Some(command) = cli.command else {
        bail!("No command given, see --help");
    };
    let config = load_config(cli.config.as_deref())?;

    match command {
        Commands::Run {
            seed,
            no_realtime,
            no_mux,
        } => run(config, seed, no_realtime, no_mux),
        Commands::Compose { events, out } => {
            let catalog = SoundCatalog::from_config(&config.sounds);
            let out = out.unwrap_or_else(|| config.audio_path());
            let report = compose_audio(&config, &catalog, &events, &out)
                .with_context(|| format!("Failed to mix {}", events.display()))?;
            info!(
                path = %out.display(),
                events = report.events_mixed,
                skipped = report.events_skipped,
                duration = report.duration_secs,
                "Soundtrack written"
            );
            Ok(())
        }
        Commands::Mux { video, audio, out } => {
            let ffmpeg = locate_ffmpeg(config.ffmpeg.as_deref())?;
            let muxer = Multiplexer::new(ffmpeg, config.delivery.clone(), config.video.frame_rate());
            let path = muxer.mux(&video, &audio, out.as_deref())?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Variants => {
            let ffmpeg = locate_ffmpeg(config.ffmpeg.as_deref())?;
            let report = prepare_catalog_variants(&ffmpeg, &config.sounds);
            info!(
                created = report.created,
                existing = report.existing,
                failed = report.failed,
                "Variant preparation done"
            );
            if report.failed > 0 {
                bail!("{} variant(s) could not be created", report.failed);
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => {
            RunConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(RunConfig::default()),
    }
}

fn run(mut config: RunConfig, seed: Option<u64>, no_realtime: bool, no_mux: bool) -> Result<()> {
    if no_realtime {
        config.realtime = false;
    }
    let seed = seed.unwrap_or_else(rand::random);
    info!(seed, output = %config.output_dir.display(), "Starting run");

    let ffmpeg = locate_ffmpeg(config.ffmpeg.as_deref())?;
    let catalog = SoundCatalog::from_config(&config.sounds);
    let mut scene = DropScene::new(&config.video, config.timing.run_duration_secs, seed);

    let mut session = RunSession::new(config.clone(), catalog.clone())?;
    session.begin(&ffmpeg).context("Failed to start capture")?;
    let artifacts = session.run(&mut scene)?;
    info!(
        outcome = ?artifacts.outcome,
        counts = ?scene.counts(),
        events = artifacts.event_log.len(),
        rerolls = artifacts.rerolls,
        "Run captured"
    );

    if no_mux {
        let audio = config.audio_path();
        compose_audio(&config, &catalog, &artifacts.events_path, &audio)?;
        if let Some(error) = artifacts.capture_error {
            warn!("Video unusable: {}", error);
        }
        println!("{}", audio.display());
        return Ok(());
    }

    let deliverable = render_deliverable(&config, &catalog, &artifacts, &ffmpeg)?;
    println!("{}", deliverable.video_path.display());
    Ok(())
}
