// migwatch-core: Pure types, RPC protocol, config
// No internal migwatch dependencies, this is the foundation crate.

pub mod config;
pub mod error;
pub mod migration;
pub mod protocol;
pub mod source;

pub use error::TransportError;
pub use migration::{MigrationStat, MigrationStatus, StatInfo};
pub use source::StatSource;
