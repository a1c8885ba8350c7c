use indicatif::ProgressBar;
use migwatch_core::StatInfo;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::classify::{TargetState, clamp_percent, classify};

/// Total width of the label column (name plus status text).
pub const LABEL_WIDTH: usize = 35;

/// Column the status text is right-aligned against.
const STATUS_COLUMN: usize = 32;

/// Message delivered to a renderer's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSignal {
    Update(StatInfo),
    /// Force the indicator to 100 and stop.
    Finish,
}

/// Final state of one renderer, returned when its task stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub name: String,
    pub percent: u8,
    pub state: TargetState,
    /// True if stopped by `finish()`, false if abandoned.
    pub finished: bool,
    /// Number of updates actually drawn.
    pub updates: usize,
}

impl TargetReport {
    fn new(name: String) -> Self {
        Self {
            name,
            percent: 0,
            state: TargetState::Waiting,
            finished: false,
            updates: 0,
        }
    }

    fn apply(&mut self, info: StatInfo) {
        if !(0..=100).contains(&info.percent) {
            debug!(target_name = %self.name, percent = info.percent, "Clamping out-of-range percent");
        }
        self.percent = clamp_percent(info.percent);
        self.state = classify(info.percent);
        self.updates += 1;
    }

    fn complete(&mut self) {
        self.percent = 100;
        self.state = TargetState::Completed;
        self.finished = true;
    }
}

/// Label shown left of the bar: `name: <status>`, status right-aligned,
/// padded or truncated to [`LABEL_WIDTH`].
pub fn format_label(name: &str, state: TargetState) -> String {
    let pad = STATUS_COLUMN.saturating_sub(name.chars().count());
    let label = format!("{}: {:>pad$}", name, state.as_str(), pad = pad);
    fit_width(&label, LABEL_WIDTH)
}

fn fit_width(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len <= width {
        return format!("{s:<width$}");
    }
    let keep = width.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(&".".repeat(width - keep));
    out
}

/// One progress indicator for one tracked resource, driven by its own task.
///
/// The task sleeps on a single-slot mailbox. A newer update overwrites an
/// unread one, so the poller never blocks on a slow renderer, and the first
/// update can be posted before the task has started running.
pub struct TargetRenderer {
    name: String,
    mailbox: watch::Sender<Option<RenderSignal>>,
    task: JoinHandle<TargetReport>,
}

impl TargetRenderer {
    pub fn spawn(name: &str, bar: ProgressBar) -> Self {
        let (mailbox, rx) = watch::channel(None);
        let task = tokio::spawn(render(name.to_string(), bar, rx));
        Self {
            name: name.to_string(),
            mailbox,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update(&self, info: StatInfo) {
        self.mailbox.send_replace(Some(RenderSignal::Update(info)));
    }

    /// Force the indicator to completion and wait for the task to stop.
    pub async fn finish(self) -> TargetReport {
        self.mailbox.send_replace(Some(RenderSignal::Finish));
        join(self.name, self.task).await
    }

    /// Stop without forcing completion; the bar is left where it was.
    pub async fn abandon(self) -> TargetReport {
        let Self {
            name,
            mailbox,
            task,
        } = self;
        // Closing the mailbox is the stop signal.
        drop(mailbox);
        join(name, task).await
    }

    pub(crate) fn abort(&self) {
        self.task.abort();
    }
}

async fn join(name: String, task: JoinHandle<TargetReport>) -> TargetReport {
    match task.await {
        Ok(report) => report,
        Err(e) => {
            warn!(target_name = %name, error = %e, "Renderer task did not stop cleanly");
            TargetReport::new(name)
        }
    }
}

async fn render(
    name: String,
    bar: ProgressBar,
    mut mailbox: watch::Receiver<Option<RenderSignal>>,
) -> TargetReport {
    let mut report = TargetReport::new(name);
    bar.set_prefix(format_label(&report.name, report.state));

    while mailbox.changed().await.is_ok() {
        let signal = *mailbox.borrow_and_update();
        match signal {
            Some(RenderSignal::Update(info)) => {
                report.apply(info);
                bar.set_prefix(format_label(&report.name, report.state));
                bar.set_position(u64::from(report.percent));
            }
            Some(RenderSignal::Finish) => {
                report.complete();
                bar.set_prefix(format_label(&report.name, report.state));
                bar.set_position(100);
                bar.finish();
                return report;
            }
            None => {}
        }
    }

    bar.abandon();
    report
}
