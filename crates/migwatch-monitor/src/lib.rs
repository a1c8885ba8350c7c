// migwatch-monitor: status polling and progress fan-out
// Depends on migwatch-core (types, StatSource port)

pub mod classify;
pub mod display;
pub mod distributor;
pub mod error;
pub mod fetcher;
pub mod renderer;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{TargetState, classify};
pub use display::DisplayMode;
pub use error::WatchError;
pub use fetcher::StatusFetcher;
pub use watch::{FinalOutcome, WatchConfig, WatchPhase, WatchReport, Watcher, settled_outcome};
