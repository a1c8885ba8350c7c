//! The watch loop: `Init → Polling → Terminal`.
//!
//! - **Init**: one fetch. A settled status (`completed`, `failed`,
//!   `interrupted`, `none`) is reported immediately and no display is
//!   started.
//! - **Polling**: one renderer per disk of the first snapshot plus one for
//!   the VM state; the first snapshot is delivered, then every interval the
//!   loop fetches, distributes and checks the status.
//! - **Terminal**: renderers are finished, the display is released, and a
//!   final fetch decides the reported outcome.
//!
//! A transport failure in any phase ends the session with an error after
//! the renderers (if any) have been stopped.

use std::time::Duration;

use migwatch_core::config::DEFAULT_POLL_INTERVAL;
use migwatch_core::{MigrationStat, MigrationStatus, StatSource};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::display::{DisplayMode, DisplaySession};
use crate::distributor::ProgressDistributor;
use crate::error::WatchError;
use crate::fetcher::StatusFetcher;
use crate::renderer::TargetReport;

/// Successful end of a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalOutcome {
    /// Host the VM now runs on.
    pub dst_server: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Init,
    Polling,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub display: DisplayMode,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            display: DisplayMode::Terminal,
        }
    }
}

/// Everything a watch session did, for callers that need more than the
/// outcome.
#[derive(Debug)]
pub struct WatchReport {
    pub result: Result<FinalOutcome, WatchError>,
    /// Phases entered, in order.
    pub phases: Vec<WatchPhase>,
    /// Final state of every renderer; empty if Polling was never entered.
    pub targets: Vec<TargetReport>,
    /// Number of `GetMigrationStat` calls made.
    pub fetches: usize,
}

/// Outcome of a snapshot that needs no watching, or `None` while the
/// migration is still running.
///
/// This is the Init-phase decision, also used by one-shot status checks.
pub fn settled_outcome(stat: &MigrationStat) -> Option<Result<FinalOutcome, WatchError>> {
    match stat.status {
        MigrationStatus::Running => None,
        MigrationStatus::None => Some(Err(WatchError::NoMigration)),
        status => Some(terminal_outcome(status, stat)),
    }
}

/// Outcome once the session has been polling. `none` at this point means
/// the migration vanished under us.
fn terminal_outcome(status: MigrationStatus, stat: &MigrationStat) -> Result<FinalOutcome, WatchError> {
    match status {
        MigrationStatus::Completed => Ok(FinalOutcome {
            dst_server: stat.dst_server.clone(),
        }),
        MigrationStatus::Failed => Err(WatchError::MigrationFailed(stat.desc.clone())),
        MigrationStatus::Interrupted | MigrationStatus::None | MigrationStatus::Running => {
            Err(WatchError::MigrationInterrupted)
        }
    }
}

/// Watches one migration until it settles.
pub struct Watcher<S> {
    fetcher: StatusFetcher<S>,
    config: WatchConfig,
}

impl<S: StatSource> Watcher<S> {
    pub fn new(source: S, vm_name: &str, config: WatchConfig) -> Self {
        Self {
            fetcher: StatusFetcher::new(source, vm_name),
            config,
        }
    }

    /// Single fetch, no display, no polling.
    pub async fn check(&self) -> Result<MigrationStat, WatchError> {
        Ok(self.fetcher.fetch().await?)
    }

    pub async fn watch(&self) -> Result<FinalOutcome, WatchError> {
        self.watch_with_report().await.result
    }

    pub async fn watch_with_report(&self) -> WatchReport {
        let mut report = WatchReport {
            result: Err(WatchError::MigrationInterrupted),
            phases: vec![WatchPhase::Init],
            targets: Vec::new(),
            fetches: 0,
        };

        report.fetches += 1;
        let first = match self.fetcher.fetch().await {
            Ok(stat) => stat,
            Err(e) => {
                warn!(vm = %self.fetcher.name(), error = %e, "Initial status check failed");
                report.result = Err(e.into());
                return report;
            }
        };

        if let Some(result) = settled_outcome(&first) {
            debug!(vm = %self.fetcher.name(), status = %first.status, "Migration already settled");
            report.phases.push(WatchPhase::Terminal);
            report.result = result;
            return report;
        }

        report.phases.push(WatchPhase::Polling);
        info!(vm = %self.fetcher.name(), disks = first.disks.len(), "Watching migration");

        let display = DisplaySession::acquire(self.config.display);
        let distributor = ProgressDistributor::spawn(&display, self.fetcher.name(), &first);
        distributor.distribute(&first);

        let last = match self.poll_until_settled(&distributor, &mut report.fetches).await {
            Ok(stat) => stat,
            Err(e) => {
                report.targets = distributor.abandon().await;
                display.release();
                // Logged only now: a log line would tear the live bars.
                warn!(vm = %self.fetcher.name(), error = %e, "Watch aborted");
                report.result = Err(e);
                return report;
            }
        };

        report.phases.push(WatchPhase::Terminal);
        report.targets = distributor.finish().await;
        display.release();

        report.fetches += 1;
        report.result = match self.fetcher.fetch().await {
            Ok(final_stat) => self.conclude(final_stat, last),
            Err(e) => {
                warn!(vm = %self.fetcher.name(), error = %e, "Final status check failed");
                Err(e.into())
            }
        };
        report
    }

    /// Fetch and distribute on a fixed cadence until the status settles.
    /// Returns the settling snapshot.
    async fn poll_until_settled(
        &self,
        distributor: &ProgressDistributor,
        fetches: &mut usize,
    ) -> Result<MigrationStat, WatchError> {
        let period = self.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            *fetches += 1;
            let stat = self.fetcher.fetch().await?;
            distributor.distribute(&stat);
            if stat.status.is_settled() {
                debug!(vm = %self.fetcher.name(), status = %stat.status, "Migration settled");
                return Ok(stat);
            }
        }
    }

    /// The final fetch is authoritative, unless it claims the migration is
    /// running again, in which case the settling snapshot stands.
    fn conclude(&self, final_stat: MigrationStat, last: MigrationStat) -> Result<FinalOutcome, WatchError> {
        let stat = if final_stat.status.is_settled() {
            final_stat
        } else {
            warn!(
                vm = %self.fetcher.name(),
                polled = %last.status,
                "Final status check reports a running migration, keeping polled result"
            );
            last
        };
        terminal_outcome(stat.status, &stat)
    }
}
