// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control protocol between clients and the daemon.
//!
//! Each message is a 4-byte big-endian length followed by a JSON body.
//! A connection carries one request and one response.

use std::collections::HashMap;
use std::time::Duration;

use lw_core::{HealthStatus, WorkerStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Timeout for reading a request or writing a response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted message body
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Request from a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    /// Snapshot of every worker
    Status,
    /// Ready a worker for a build with the given properties
    Substantiate {
        worker: String,
        #[serde(default)]
        properties: HashMap<String, String>,
    },
    Insubstantiate {
        worker: String,
        #[serde(default)]
        fast: bool,
    },
    BindBuild {
        worker: String,
        #[serde(default)]
        properties: HashMap<String, String>,
    },
    UnbindBuild { worker: String },
    /// Probe one worker, or all of them
    CheckHealth {
        #[serde(default)]
        worker: Option<String>,
    },
    Shutdown,
}

/// Health of one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHealth {
    pub worker: String,
    pub health: HealthStatus,
}

/// Response from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Ok,
    Workers {
        uptime_secs: u64,
        workers: Vec<WorkerStatus>,
    },
    Health {
        workers: Vec<WorkerHealth>,
    },
    /// The build needs another kind; substantiate it to restart the worker
    RestartRequired {
        requested: String,
        current: String,
    },
    ShuttingDown,
    Error {
        message: String,
    },
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Serialize a message to JSON, without the length prefix
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let body = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&body)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let body = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &body))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
