use super::sync::{self, PassOptions};
use super::{AppContext, PreconditionFailed};
use crate::output::Output;
use async_trait::async_trait;
use color_eyre::Result;
use list_sync_config::parse_interval;
use list_sync_core::{SyncOutcome, SyncReport};
use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Ctrl-C and SIGTERM, registered once so a signal that arrives mid-pass
/// is still seen when the pass ends.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(_) => std::future::pending().await,
        }
    }
}

fn resolve_interval(ctx: &AppContext, interval_override: Option<String>) -> Result<Duration> {
    let raw = interval_override.unwrap_or_else(|| ctx.config.daemon.interval.clone());
    parse_interval(&raw).map_err(|e| PreconditionFailed::new(format!("Invalid daemon interval: {}", e)).into())
}

/// One unit of scheduled work.
#[async_trait(?Send)]
trait ScheduledPass {
    async fn run(&mut self) -> Result<SyncReport>;
}

struct SyncPass<'a> {
    ctx: &'a mut AppContext,
    options: PassOptions,
}

#[async_trait(?Send)]
impl ScheduledPass for SyncPass<'_> {
    async fn run(&mut self) -> Result<SyncReport> {
        sync::run_pass(self.ctx, &self.options).await
    }
}

/// Sync immediately, then once per interval, until a shutdown signal.
/// Passes never overlap and a failed pass does not stop the loop.
pub async fn run_daemon(
    mut ctx: AppContext,
    interval_override: Option<String>,
    dry_run: bool,
    output: &Output,
) -> Result<ExitCode> {
    ctx.require_valid_config()?;
    let period = resolve_interval(&ctx, interval_override)?;
    let mut signals = ShutdownSignals::install()?;

    let every = humantime::format_duration(period).to_string();
    info!(operation = "daemon_start", interval = %every, dry_run, "Daemon started");
    output.info(format!("Syncing every {}. Press Ctrl-C to stop.", every));

    let mut pass = SyncPass {
        ctx: &mut ctx,
        options: PassOptions {
            lists: None,
            full_refresh: false,
            dry_run,
        },
    };
    let shutdown = async move { signals.recv().await };
    run_schedule(period, &mut pass, shutdown, dry_run, output).await;

    output.info("Daemon stopped.");
    Ok(ExitCode::SUCCESS)
}

/// Tick loop shared by the daemon. `shutdown` is only polled between passes.
/// Returns the number of passes run.
async fn run_schedule<P, S>(period: Duration, pass: &mut P, shutdown: S, dry_run: bool, output: &Output) -> u64
where
    P: ScheduledPass + ?Sized,
    S: Future<Output = &'static str>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut passes: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut shutdown => {
                info!(operation = "daemon_stop", signal, passes, "Shutdown signal received");
                break;
            }
        }

        passes += 1;
        info!(operation = "scheduled_sync_start", pass = passes, "Starting scheduled sync");
        match pass.run().await {
            Ok(report) => {
                let outcome = report.outcome();
                match outcome {
                    SyncOutcome::Success | SyncOutcome::NoOp => info!(
                        operation = "scheduled_sync_complete",
                        outcome = ?outcome,
                        successful = report.lists.len(),
                        duration_ms = report.duration.as_millis() as u64,
                        "Scheduled sync finished"
                    ),
                    _ => warn!(
                        operation = "scheduled_sync_complete",
                        outcome = ?outcome,
                        successful = report.lists.len(),
                        failed = report.failures.len(),
                        "Scheduled sync finished with failures"
                    ),
                }
                sync::print_report(&report, dry_run, output);
            }
            Err(e) => {
                error!(operation = "scheduled_sync_error", error = %e, "Scheduled sync failed");
            }
        }
    }

    passes
}
