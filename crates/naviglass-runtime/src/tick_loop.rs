//! Periodic driver for [`FeedbackEngine`].
//!
//! Ranging blocks for tens of milliseconds per tick, so each tick runs on
//! Tokio's blocking pool.  The engine is moved into the blocking task and
//! handed back when the tick is done, which keeps it single-owner and makes
//! overlapping ticks impossible.  A tick that overruns its period delays the
//! next one rather than causing a burst of catch-up ticks.

use std::time::{Duration, Instant};

use naviglass_types::NaviError;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::feedback::FeedbackEngine;

/// Default tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Tick `engine` every `period` until `shutdown` flips to `true` (or its
/// sender is dropped), then idle the motors and hand the engine back.
///
/// # Errors
///
/// Returns [`NaviError::HardwareFault`] if a tick task is cancelled by the
/// runtime; the engine is lost with it.
pub async fn run(
    mut engine: FeedbackEngine,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<FeedbackEngine, NaviError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_ms = period.as_millis() as u64, "feedback loop started");

    let mut ticks: u64 = 0;
    while !*shutdown.borrow() {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("shutdown sender dropped");
                    break;
                }
                continue;
            }
        }

        let started = Instant::now();
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = engine.tick(Instant::now());
            (engine, outcome)
        })
        .await
        .map_err(|e| NaviError::HardwareFault {
            component: "tick_loop".to_string(),
            details: format!("tick task failed: {e}"),
        })?;
        engine = returned;
        ticks += 1;

        trace!(
            tick = ticks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            left = outcome.command.left_duty,
            right = outcome.command.right_duty,
            spoke = outcome.speech.is_some(),
            "tick"
        );
    }

    engine.shutdown();
    info!(ticks, "feedback loop stopped");
    Ok(engine)
}
