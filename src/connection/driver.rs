//! Driver spawns the per-connection worker task.
//!
//! One task per connection: it reads raw bytes from the transport into the
//! communicator and drains the transmit queue back out, with a cancellation
//! token for graceful shutdown. Transient transport errors back off
//! exponentially and only a sustained error streak ends the task; a serial
//! hiccup must not tear the connection down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::Transport;
use super::communicator::Communicator;
use crate::framer::serialize;

/// Handle to a spawned driver task.
pub struct DriverHandle {
    cancel: CancellationToken,
}

impl DriverHandle {
    /// Request a graceful shutdown of the worker task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        debug!("dropping driver handle");
        self.cancel.cancel();
    }
}

/// Driver spawns and manages the connection worker task.
pub struct Driver;

const READ_CHUNK: usize = 512;
const MAX_ERRORS: u32 = 10;

impl Driver {
    /// Spawn the worker for `transport`, wired to `communicator`.
    ///
    /// Panics if the communicator's transmit queue was already taken; the
    /// queue belongs to whichever worker writes to the wire.
    pub fn spawn<T>(mut transport: T, communicator: Arc<Communicator>) -> DriverHandle
    where
        T: Transport,
    {
        let mut transmit_rx = communicator
            .take_transmit_queue()
            .expect("transmit queue already taken by another worker");

        let cancel = CancellationToken::new();
        let cancel_worker = cancel.clone();

        tokio::spawn(async move {
            info!("connection worker started");
            let mut read_buf = vec![0u8; READ_CHUNK];
            let mut error_count = 0u32;

            loop {
                let mut outbound = None;

                tokio::select! {
                    _ = cancel_worker.cancelled() => {
                        info!("connection worker cancelled");
                        break;
                    }
                    packet = transmit_rx.recv() => match packet {
                        Some(packet) => outbound = Some(packet),
                        None => {
                            debug!("transmit queue closed, shutting down");
                            break;
                        }
                    },
                    result = transport.read(&mut read_buf) => match result {
                        Ok(0) => {
                            info!("transport reached end of stream");
                            break;
                        }
                        Ok(n) => {
                            trace!(bytes = n, "transport bytes received");
                            error_count = 0;
                            communicator.push_bytes(&read_buf[..n]);
                        }
                        Err(e) => {
                            error_count += 1;
                            error!("transport read error ({}/{}): {}", error_count, MAX_ERRORS, e);
                            if error_count >= MAX_ERRORS {
                                error!("too many transport errors, shutting down");
                                break;
                            }
                            // Exponential backoff: 50ms, 100ms, 200ms, ...
                            let backoff = std::time::Duration::from_millis(
                                50 * (1 << error_count.min(5)),
                            );
                            tokio::time::sleep(backoff).await;
                        }
                    },
                }

                // Writes happen outside the select so the read future is
                // released before the transport is borrowed again
                if let Some(packet) = outbound {
                    match serialize(&packet) {
                        Ok(frame) => {
                            if let Err(e) = transport.write_all(&frame).await {
                                error_count += 1;
                                error!(
                                    "transport write error ({}/{}): {}",
                                    error_count, MAX_ERRORS, e
                                );
                                if error_count >= MAX_ERRORS {
                                    break;
                                }
                            } else {
                                trace!(bytes = frame.len(), "frame written");
                            }
                        }
                        Err(e) => {
                            // A malformed outbound packet is dropped, not fatal
                            warn!("unserializable packet dropped: {}", e);
                        }
                    }
                }
            }

            info!("connection worker ended");
        });

        DriverHandle { cancel }
    }
}
