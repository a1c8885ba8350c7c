use migwatch_core::TransportError;
use thiserror::Error;

/// Terminal outcome of a watch session other than success.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The daemon could not be reached or answered garbage. Never retried.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Nothing to watch: status was `none` on the first check.
    #[error("Migration is not running")]
    NoMigration,

    /// Carries the daemon's description verbatim.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// `interrupted`, or `none` after the session had started polling.
    #[error("Migration is interrupted")]
    MigrationInterrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(WatchError::NoMigration.to_string(), "Migration is not running");
        assert_eq!(
            WatchError::MigrationFailed("disk timeout".to_string()).to_string(),
            "Migration failed: disk timeout"
        );
        assert_eq!(
            WatchError::MigrationInterrupted.to_string(),
            "Migration is interrupted"
        );
    }

    #[test]
    fn test_transport_is_transparent() {
        let err: WatchError = TransportError::Remote("boom".to_string()).into();
        assert_eq!(err.to_string(), "remote error: boom");
    }
}
