use migwatch_core::{MigrationStat, StatSource, TransportError};
use tracing::debug;

/// One round trip to the daemon for one named migration.
///
/// No retries here: a failed fetch ends the watch session. Retry policy, if
/// any, belongs to the transport.
pub struct StatusFetcher<S> {
    source: S,
    name: String,
}

impl<S: StatSource> StatusFetcher<S> {
    pub fn new(source: S, name: &str) -> Self {
        Self {
            source,
            name: name.to_string(),
        }
    }

    /// Name of the VM whose migration is fetched.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn fetch(&self) -> Result<MigrationStat, TransportError> {
        match self.source.get_migration_stat(&self.name).await {
            Ok(stat) => {
                debug!(
                    vm = %self.name,
                    status = %stat.status,
                    disks = stat.disks.len(),
                    vm_state = stat.qemu.percent,
                    "Fetched migration stat"
                );
                Ok(stat)
            }
            Err(e) => {
                // The watch loop reports the failure once the display is gone.
                debug!(vm = %self.name, error = %e, "GetMigrationStat failed");
                Err(e)
            }
        }
    }
}
