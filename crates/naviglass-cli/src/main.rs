//! `naviglass` – device entry point.
//!
//! This binary:
//!
//! 1. Loads `~/.naviglass/config.toml`, writing the defaults on first run.
//! 2. Starts the speech queue (silent when the synthesizer or its voice files
//!    are missing) and announces readiness.
//! 3. Reads detection frames and range readings as JSON lines on stdin.
//! 4. Runs the feedback loop until **Ctrl-C**, then idles the motors and
//!    stops speech.

mod config;
mod ingest;

use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use colored::Colorize;
use naviglass_hal::RangeBoard;
use naviglass_hal::sim::TracingActuator;
use naviglass_perception::{DetectionFeed, SensorFusion};
use naviglass_runtime::{FeedbackEngine, init_tracing, tick_loop};
use naviglass_speech::{ProcessBackend, SpeechQueue, SpeechSink};
use naviglass_types::{NaviError, TelemetrySnapshot};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How often the console telemetry reader samples the engine.
const TELEMETRY_LOG_INTERVAL: Duration = Duration::from_secs(1);

fn main() {
    let _tracing = init_tracing("naviglass");
    print_banner();

    let cfg = match resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cfg) {
        error!(error = %e, "naviglass stopped with an error");
        std::process::exit(1);
    }
}

/// Load the config file, or write the defaults when there is none.
fn resolve_config() -> Result<config::Config, NaviError> {
    if let Some(cfg) = config::load()? {
        println!("  Config loaded from {}", config::config_path().display().to_string().bold());
        return Ok(cfg);
    }

    let mut cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => warn!(error = %e, "could not write default config; continuing with defaults"),
    }
    config::apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

fn run(cfg: config::Config) -> Result<(), NaviError> {
    // ── Shutdown signal ──────────────────────────────────────────────────
    let (stop, shutdown) = watch::channel(false);
    let stop = Arc::new(stop);
    let stop_for_signal = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – idling motors …".yellow().bold());
        stop_for_signal.send_replace(true);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop the process with SIGKILL");
    }

    // ── Speech ───────────────────────────────────────────────────────────
    let speech = Arc::new(build_speech(&cfg));
    if !cfg.speech.startup_message.trim().is_empty() {
        speech.speak(&cfg.speech.startup_message, false);
    }

    // ── Inputs ───────────────────────────────────────────────────────────
    let feed = DetectionFeed::with_filter(cfg.candidate_filter());
    let board = RangeBoard::new([cfg.ranging.left_sensor.clone(), cfg.ranging.right_sensor.clone()]);
    {
        let feed = feed.clone();
        let board = board.clone();
        std::thread::Builder::new()
            .name("naviglass-ingest".to_string())
            .spawn(move || ingest::pump(BufReader::new(std::io::stdin()), &feed, &board))
            .map_err(|e| NaviError::HardwareFault {
                component: "ingest".to_string(),
                details: format!("failed to spawn input reader: {e}"),
            })?;
    }

    // ── Engine ───────────────────────────────────────────────────────────
    let fusion = SensorFusion::new(
        Box::new(board.sensor(cfg.ranging.left_sensor.clone(), cfg.read_timeout())),
        Box::new(board.sensor(cfg.ranging.right_sensor.clone(), cfg.read_timeout())),
        cfg.sampler(),
    );
    let engine = FeedbackEngine::new(
        cfg.feedback_config(),
        feed,
        fusion,
        Box::new(TracingActuator::new("temple_motors")),
        speech.clone(),
    );
    let telemetry = engine.telemetry();

    println!(
        "  {} feedback loop every {} ms; speech {}",
        "▶".green().bold(),
        cfg.feedback.tick_period_ms,
        if speech.is_silent() { "off".yellow() } else { "on".green() }
    );
    println!("  Press {} to stop.\n", "Ctrl-C".bold());

    let runtime = tokio::runtime::Runtime::new().map_err(|e| NaviError::HardwareFault {
        component: "runtime".to_string(),
        details: format!("failed to start tokio runtime: {e}"),
    })?;
    let result = runtime.block_on(async {
        let reporter = tokio::spawn(report_telemetry(telemetry, shutdown.clone()));
        let engine = tick_loop::run(engine, cfg.tick_period(), shutdown).await;
        reporter.abort();
        engine
    });

    speech.stop();
    match result {
        Ok(_) => {
            println!("{}", "  ✓ Motors idle. Goodbye.".green());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn build_speech(cfg: &config::Config) -> SpeechQueue {
    if !cfg.speech.enabled {
        info!("speech disabled by configuration");
        return SpeechQueue::silent();
    }
    match ProcessBackend::new(&cfg.speech.command, cfg.speech.assets.clone()) {
        Ok(backend) => SpeechQueue::spawn(Box::new(backend), cfg.speech_poll_interval()),
        Err(e) => {
            warn!(error = %e, "speech backend unusable; running silent");
            SpeechQueue::silent()
        }
    }
}

/// Log the engine's telemetry once a second, degraded to "nothing in range"
/// when it goes stale.
async fn report_telemetry(telemetry: watch::Receiver<TelemetrySnapshot>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(TELEMETRY_LOG_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => return,
        }
        let snapshot = telemetry.borrow().observed_at(Utc::now());
        debug!(
            distance_cm = snapshot.distance.cm(),
            urgent = snapshot.urgent,
            stale = snapshot.is_stale(Utc::now()),
            "telemetry"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _  __          _  _____ __             "#.bold().cyan());
    println!("{}", r#"  / |/ /__ __  __(_)/ ___// /__ ____ ___ "#.bold().cyan());
    println!("{}", r#" /    / _ `/ |/ / // (_ // / _ `(_-<(_-< "#.bold().cyan());
    println!("{}", r#"/_/|_/\_,_/|___/_/ \___//_/\_,_/___/___/ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "NaviGlass".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Proximity feedback for assistive glasses");
    println!();
}
