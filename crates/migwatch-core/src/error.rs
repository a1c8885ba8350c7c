use thiserror::Error;

/// A remote call that could not be completed.
///
/// Covers every way a single round trip to the daemon can fail: the socket
/// is unreachable, the frame is malformed, or the daemon answered with an
/// error of its own.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Codec {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    #[error("remote error: {0}")]
    Remote(String),

    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse {
        request: &'static str,
        response: String,
    },
}

impl TransportError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    pub(crate) fn codec(context: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Codec { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_message_is_verbatim() {
        let err = TransportError::Remote("instance not found: vm1".to_string());
        assert_eq!(err.to_string(), "remote error: instance not found: vm1");
    }

    #[test]
    fn test_connect_error_names_socket() {
        let err = TransportError::Connect {
            path: "/run/migwatch/rpc.sock".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/run/migwatch/rpc.sock"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
