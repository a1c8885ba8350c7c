// migwatch-client: RPC client for the migration daemon
// Depends on migwatch-core (types, framing)

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::debug;

use migwatch_core::config::DEFAULT_SOCKET_PATH;
use migwatch_core::migration::{MigrationParams, MigrationStat};
use migwatch_core::protocol::{self, RpcRequest, RpcResponse};
use migwatch_core::{StatSource, TransportError};

/// Client for the migration daemon over a Unix domain socket.
///
/// Opens a new connection per request (simple, reliable). The daemon
/// handles one request per connection.
#[derive(Debug, Clone)]
pub struct RpcClient {
    socket_path: String,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcClient {
    /// Create a new client targeting the default socket path.
    pub fn new() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
        }
    }

    /// Create a new client targeting a custom socket path.
    pub fn with_socket(path: &str) -> Self {
        Self {
            socket_path: path.to_string(),
        }
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Send a request and wait for the response.
    ///
    /// A daemon-side `Error` response is turned into
    /// [`TransportError::Remote`], so callers only ever see payloads.
    pub async fn send(&self, req: &RpcRequest) -> Result<RpcResponse, TransportError> {
        let data = self.exchange(req).await?;
        let resp: RpcResponse = serde_json::from_slice(&data).map_err(decode_error)?;
        match resp {
            RpcResponse::Error { message } => Err(TransportError::Remote(message)),
            resp => Ok(resp),
        }
    }

    /// One round trip, returning the raw response frame.
    async fn exchange(&self, req: &RpcRequest) -> Result<Vec<u8>, TransportError> {
        debug!(method = req.method(), socket = %self.socket_path, "Sending request");

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| TransportError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let (mut reader, mut writer) = stream.into_split();

        protocol::send_request(&mut writer, req).await?;

        // Shutdown write half to signal we're done sending
        writer.shutdown().await.map_err(|source| TransportError::Io {
            context: "failed to shutdown write half",
            source,
        })?;

        protocol::read_frame(&mut reader).await
    }

    /// Send a request whose only valid answer is `Ok`.
    async fn call(&self, req: RpcRequest) -> Result<(), TransportError> {
        match self.send(&req).await? {
            RpcResponse::Ok => Ok(()),
            other => Err(unexpected(&req, &other)),
        }
    }

    pub async fn migration_stat(&self, name: &str) -> Result<MigrationStat, TransportError> {
        let req = RpcRequest::GetMigrationStat {
            name: name.to_string(),
        };
        match self.send(&req).await? {
            RpcResponse::MigrationStat(stat) => Ok(stat),
            other => Err(unexpected(&req, &other)),
        }
    }

    /// The migration stat exactly as the daemon encoded it, without
    /// normalizing unknown statuses or filling in missing fields.
    pub async fn migration_stat_json(&self, name: &str) -> Result<serde_json::Value, TransportError> {
        let req = RpcRequest::GetMigrationStat {
            name: name.to_string(),
        };
        let data = self.exchange(&req).await?;
        let mut value: serde_json::Value = serde_json::from_slice(&data).map_err(decode_error)?;
        if let Some(stat) = value.get_mut("MigrationStat") {
            return Ok(stat.take());
        }
        match serde_json::from_value(value).map_err(decode_error)? {
            RpcResponse::Error { message } => Err(TransportError::Remote(message)),
            other => Err(unexpected(&req, &other)),
        }
    }

    pub async fn instance_json(&self, name: &str) -> Result<serde_json::Value, TransportError> {
        let req = RpcRequest::GetInstanceJson {
            name: name.to_string(),
        };
        match self.send(&req).await? {
            RpcResponse::InstanceJson(value) => Ok(value),
            other => Err(unexpected(&req, &other)),
        }
    }

    pub async fn start_migration(
        &self,
        name: &str,
        params: MigrationParams,
    ) -> Result<(), TransportError> {
        self.call(RpcRequest::StartMigrationProcess {
            name: name.to_string(),
            params,
        })
        .await
    }

    pub async fn cancel_migration(&self, name: &str) -> Result<(), TransportError> {
        self.call(RpcRequest::CancelMigrationProcess {
            name: name.to_string(),
        })
        .await
    }

    pub async fn copy_config(
        &self,
        name: &str,
        params: MigrationParams,
    ) -> Result<(), TransportError> {
        self.call(RpcRequest::CopyConfig {
            name: name.to_string(),
            params,
        })
        .await
    }

    pub async fn prepare_dst_disks(
        &self,
        dst_server: &str,
        disks: BTreeMap<String, u64>,
    ) -> Result<(), TransportError> {
        self.call(RpcRequest::PrepareDstDisks {
            dst_server: dst_server.to_string(),
            disks,
        })
        .await
    }
}

fn decode_error(source: serde_json::Error) -> TransportError {
    TransportError::Codec {
        context: "failed to deserialize response",
        source,
    }
}

fn unexpected(req: &RpcRequest, resp: &RpcResponse) -> TransportError {
    TransportError::UnexpectedResponse {
        request: req.method(),
        response: resp.kind().to_string(),
    }
}

#[async_trait]
impl StatSource for RpcClient {
    async fn get_migration_stat(&self, name: &str) -> Result<MigrationStat, TransportError> {
        self.migration_stat(name).await
    }
}
