use async_trait::async_trait;

use crate::error::TransportError;
use crate::migration::MigrationStat;

/// Anything that can answer `GetMigrationStat` for a VM.
///
/// The watch engine only ever talks to this port, so it can be driven by the
/// Unix-socket client in production and by scripted sequences in tests.
#[async_trait]
pub trait StatSource: Send + Sync {
    async fn get_migration_stat(&self, name: &str) -> Result<MigrationStat, TransportError>;
}
