// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.
//!
//! Every connection runs on its own task, so a substantiate waiting on a slow
//! backend never holds up requests for other workers.

use std::sync::Arc;
use std::time::Instant;

use lw_adapters::{Connector, Provisioner};
use lw_core::BuildContext;
use lw_engine::{Fleet, WorkerError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::protocol::{self, Request, Response, WorkerHealth, DEFAULT_TIMEOUT};

/// State shared by all connection tasks
pub struct ServerContext<P, C> {
    pub fleet: Arc<Fleet<P, C>>,
    pub start_time: Instant,
    shutdown: watch::Sender<bool>,
}

impl<P: Provisioner, C: Connector> ServerContext<P, C> {
    /// The receiver observes shutdown requests made over the socket
    pub fn new(fleet: Arc<Fleet<P, C>>) -> (Self, watch::Receiver<bool>) {
        let (shutdown, requested) = watch::channel(false);
        let context = Self {
            fleet,
            start_time: Instant::now(),
            shutdown,
        };
        (context, requested)
    }

    fn request_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Spawn a task serving one client connection
pub fn spawn_connection<P, C, S>(context: Arc<ServerContext<P, C>>, stream: S)
where
    P: Provisioner,
    C: Connector,
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = handle_connection(&context, stream).await {
            error!("Error handling connection: {}", e);
        }
    });
}

/// Handle a single client connection
pub async fn handle_connection<P, C, S>(
    context: &ServerContext<P, C>,
    stream: S,
) -> Result<(), ServerError>
where
    P: Provisioner,
    C: Connector,
    S: AsyncRead + AsyncWrite,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(context, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

fn error_response(error: impl std::fmt::Display) -> Response {
    Response::Error {
        message: error.to_string(),
    }
}

/// Handle a single request and return a response
pub async fn handle_request<P: Provisioner, C: Connector>(
    context: &ServerContext<P, C>,
    request: Request,
) -> Response {
    let fleet = &context.fleet;

    match request {
        Request::Ping => Response::Pong,

        Request::Status => Response::Workers {
            uptime_secs: context.start_time.elapsed().as_secs(),
            workers: fleet.statuses(),
        },

        Request::Substantiate { worker, properties } => {
            let worker = match fleet.worker(&worker) {
                Ok(w) => w,
                Err(e) => return error_response(e),
            };
            match worker.substantiate(&BuildContext { properties }).await {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }

        Request::Insubstantiate { worker, fast } => {
            let worker = match fleet.worker(&worker) {
                Ok(w) => w,
                Err(e) => return error_response(e),
            };
            let result = if fast {
                worker.insubstantiate_fast().await
            } else {
                worker.insubstantiate().await
            };
            match result {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }

        Request::BindBuild { worker, properties } => {
            let worker = match fleet.worker(&worker) {
                Ok(w) => w,
                Err(e) => return error_response(e),
            };
            match worker.bind_build(&BuildContext { properties }) {
                Ok(()) => Response::Ok,
                Err(WorkerError::IncompatibleKindPendingRestart { requested, current }) => {
                    Response::RestartRequired { requested, current }
                }
                Err(e) => error_response(e),
            }
        }

        Request::UnbindBuild { worker } => match fleet.worker(&worker) {
            Ok(w) => {
                w.unbind_build();
                Response::Ok
            }
            Err(e) => error_response(e),
        },

        Request::CheckHealth { worker: Some(name) } => match fleet.worker(&name) {
            Ok(w) => Response::Health {
                workers: vec![WorkerHealth {
                    health: w.check_health().await,
                    worker: name,
                }],
            },
            Err(e) => error_response(e),
        },

        Request::CheckHealth { worker: None } => Response::Health {
            workers: fleet
                .check_health_all()
                .await
                .into_iter()
                .map(|(worker, health)| WorkerHealth { worker, health })
                .collect(),
        },

        Request::Shutdown => {
            context.request_shutdown();
            Response::ShuttingDown
        }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
