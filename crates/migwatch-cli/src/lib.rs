// migwatch-cli: Clap commands, UI, logging
// Depends on migwatch-core, migwatch-client, migwatch-monitor

pub mod commands;
pub mod disks;
pub mod logging;
pub mod ui;

pub use commands::run;
