//! # migwatch: live migration client for kvmrun-style VM hosts
//!
//! Facade crate that re-exports the migwatch workspace crates so consumers
//! can depend on a single `migwatch` library.
//!
//! ## Crate breakdown
//!
//! | Module | Crate | Purpose |
//! |--------|-------|---------|
//! | [`core`] | migwatch-core | Migration types, RPC framing, config, errors |
//! | [`client`] | migwatch-client | Unix socket RPC client |
//! | [`monitor`] | migwatch-monitor | Status polling, progress fan-out, watch loop |
//! | [`cli`] | migwatch-cli | Commands, terminal UI, logging |

pub use migwatch_cli as cli;
pub use migwatch_client as client;
pub use migwatch_core as core;
pub use migwatch_monitor as monitor;
