use std::time::Duration;

/// Default Unix domain socket path of the migration daemon.
pub const DEFAULT_SOCKET_PATH: &str = "/run/kvmrun/rpc.sock";

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable overriding the daemon socket path.
pub const SOCKET_ENV: &str = "MIGWATCH_SOCKET";

/// Environment variable overriding the poll interval, in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "MIGWATCH_POLL_INTERVAL_MS";

/// Get the effective daemon socket path.
/// Priority: CLI `--socket` flag > runtime env `MIGWATCH_SOCKET` > default.
pub fn socket_path(flag: Option<&str>) -> String {
    if let Some(path) = flag {
        return path.to_string();
    }
    std::env::var(SOCKET_ENV).unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string())
}

/// Get the effective poll interval.
/// Unparseable or zero values fall back to the default.
pub fn poll_interval() -> Duration {
    parse_poll_interval(std::env::var(POLL_INTERVAL_ENV).ok().as_deref())
}

fn parse_poll_interval(raw: Option<&str>) -> Duration {
    match raw.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(ms)) if ms > 0 => Duration::from_millis(ms),
        Some(_) => {
            tracing::warn!(
                value = raw.unwrap_or_default(),
                "Ignoring invalid {}",
                POLL_INTERVAL_ENV
            );
            DEFAULT_POLL_INTERVAL
        }
        None => DEFAULT_POLL_INTERVAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_flag_wins() {
        assert_eq!(socket_path(Some("/tmp/x.sock")), "/tmp/x.sock");
    }

    #[test]
    fn test_socket_default_is_absolute() {
        assert!(DEFAULT_SOCKET_PATH.starts_with('/'));
    }

    #[test]
    fn test_poll_interval_parsing() {
        assert_eq!(parse_poll_interval(None), DEFAULT_POLL_INTERVAL);
        assert_eq!(parse_poll_interval(Some("250")), Duration::from_millis(250));
        assert_eq!(parse_poll_interval(Some(" 50 ")), Duration::from_millis(50));
        assert_eq!(parse_poll_interval(Some("0")), DEFAULT_POLL_INTERVAL);
        assert_eq!(parse_poll_interval(Some("fast")), DEFAULT_POLL_INTERVAL);
    }
}
