use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::TransportError;
use crate::migration::{MigrationParams, MigrationStat};

/// Maximum frame size for daemon IPC (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

// ============================================================================
// Request/Response types
// ============================================================================

/// Request from the CLI to the migration daemon.
///
/// Each variant maps to exactly one remote operation. Only
/// `GetMigrationStat` is ever polled; the rest are issued at most once per
/// command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcRequest {
    /// Current progress of the named VM's migration.
    GetMigrationStat { name: String },
    /// Begin migrating a running VM.
    StartMigrationProcess {
        name: String,
        params: MigrationParams,
    },
    /// Abort a running migration.
    CancelMigrationProcess { name: String },
    /// Copy the VM configuration to another host without migrating.
    CopyConfig {
        name: String,
        params: MigrationParams,
    },
    /// Create destination volumes. `disks` maps volume name to size in bytes.
    PrepareDstDisks {
        dst_server: String,
        disks: BTreeMap<String, u64>,
    },
    /// Full instance description as JSON.
    GetInstanceJson { name: String },
}

impl RpcRequest {
    /// Method name, for log lines and error messages.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetMigrationStat { .. } => "GetMigrationStat",
            Self::StartMigrationProcess { .. } => "StartMigrationProcess",
            Self::CancelMigrationProcess { .. } => "CancelMigrationProcess",
            Self::CopyConfig { .. } => "CopyConfig",
            Self::PrepareDstDisks { .. } => "PrepareDstDisks",
            Self::GetInstanceJson { .. } => "GetInstanceJson",
        }
    }
}

/// Response from the migration daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RpcResponse {
    /// Operation succeeded, no payload.
    Ok,
    /// Answer to `GetMigrationStat`.
    MigrationStat(MigrationStat),
    /// Answer to `GetInstanceJson`.
    InstanceJson(serde_json::Value),
    /// Error with description.
    Error { message: String },
}

impl RpcResponse {
    /// Variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::MigrationStat(_) => "MigrationStat",
            Self::InstanceJson(_) => "InstanceJson",
            Self::Error { .. } => "Error",
        }
    }
}

// ============================================================================
// Frame protocol (length-prefixed JSON over Unix socket)
// ============================================================================

/// Read a length-prefixed JSON frame.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(TransportError::io("failed to read frame length"))?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(TransportError::io("failed to read frame body"))?;

    Ok(buf)
}

/// Write a length-prefixed JSON frame.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), TransportError> {
    if data.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            len: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let len = (data.len() as u32).to_be_bytes();
    writer
        .write_all(&len)
        .await
        .map_err(TransportError::io("failed to write frame length"))?;
    writer
        .write_all(data)
        .await
        .map_err(TransportError::io("failed to write frame body"))?;
    writer
        .flush()
        .await
        .map_err(TransportError::io("failed to flush frame"))?;
    Ok(())
}

/// Serialize and send a request.
pub async fn send_request<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    req: &RpcRequest,
) -> Result<(), TransportError> {
    let data = serde_json::to_vec(req).map_err(TransportError::codec("failed to serialize request"))?;
    write_frame(writer, &data).await
}

/// Read and deserialize a request.
pub async fn recv_request<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<RpcRequest, TransportError> {
    let data = read_frame(reader).await?;
    serde_json::from_slice(&data).map_err(TransportError::codec("failed to deserialize request"))
}

/// Serialize and send a response.
pub async fn send_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    resp: &RpcResponse,
) -> Result<(), TransportError> {
    let data =
        serde_json::to_vec(resp).map_err(TransportError::codec("failed to serialize response"))?;
    write_frame(writer, &data).await
}

/// Read and deserialize a response.
pub async fn recv_response<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<RpcResponse, TransportError> {
    let data = read_frame(reader).await?;
    serde_json::from_slice(&data).map_err(TransportError::codec("failed to deserialize response"))
}

// ============================================================================
// Tests
// ============================================================================
