//! Packet dispatch and request/response correlation.
//!
//! The [`Communicator`] sits between the transport collaborator and the
//! application: the transport feeds it raw bytes, it drains complete frames,
//! stamps them, auto-answers teach-ins, satisfies request/response waiters
//! and delivers everything to the receive queue.
//!
//! ## Request/response correlation
//!
//! Waiting for a specific response (base id, version info) uses a
//! per-request completion signal: a predicate plus a oneshot sender is
//! registered *before* the request is sent, and the single dispatch point
//! fulfils it when a matching packet arrives. Non-matching packets flow to
//! the receive queue exactly once, so independent waiters keep FIFO order
//! and nothing is popped and re-enqueued. Waits give up after the configured
//! timeout and return the last known value.

use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, trace, warn};

use super::version::VersionInfo;
use crate::framer::{ParseResult, parse_next};
use crate::packet::{Packet, PacketType, ReturnCode, UteResponseCode, common_command};
use crate::{Esp3Error, Result};

/// Tuning knobs for a [`Communicator`].
#[derive(Debug, Clone)]
pub struct CommunicatorConfig {
    /// Answer UTE teach-in queries automatically.
    pub teach_in: bool,
    /// Receive buffer bound; exceeding it discards the buffered bytes as a
    /// resource-exhaustion defense and keeps the connection open.
    pub max_buffer_len: usize,
    /// How long request/response waits block before giving up.
    pub response_timeout: Duration,
}

impl Default for CommunicatorConfig {
    fn default() -> Self {
        Self {
            teach_in: true,
            max_buffer_len: 64 * 1024,
            response_timeout: Duration::from_secs(1),
        }
    }
}

struct PendingRequest {
    predicate: Box<dyn Fn(&Packet) -> bool + Send>,
    tx: oneshot::Sender<Packet>,
}

/// Stream of inbound packets, taken once via [`Communicator::packets`].
pub struct PacketStream {
    inner: UnboundedReceiverStream<Packet>,
}

impl Stream for PacketStream {
    type Item = Packet;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Packet>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Shared packet dispatcher. Wrap in an `Arc` and hand one clone to the
/// driver; all methods take `&self`.
pub struct Communicator {
    config: CommunicatorConfig,
    buffer: Mutex<Vec<u8>>,
    pending: Mutex<Vec<PendingRequest>>,
    base_id: Mutex<Option<[u8; 4]>>,
    version_info: Mutex<Option<VersionInfo>>,
    receive_tx: mpsc::UnboundedSender<Packet>,
    receive_rx: Mutex<Option<mpsc::UnboundedReceiver<Packet>>>,
    transmit_tx: mpsc::UnboundedSender<Packet>,
    transmit_rx: Mutex<Option<mpsc::UnboundedReceiver<Packet>>>,
}

impl Communicator {
    pub fn new(config: CommunicatorConfig) -> Self {
        let (receive_tx, receive_rx) = mpsc::unbounded_channel();
        let (transmit_tx, transmit_rx) = mpsc::unbounded_channel();
        Self {
            config,
            buffer: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            base_id: Mutex::new(None),
            version_info: Mutex::new(None),
            receive_tx,
            receive_rx: Mutex::new(Some(receive_rx)),
            transmit_tx,
            transmit_rx: Mutex::new(Some(transmit_rx)),
        }
    }

    /// Append received transport bytes and drain every complete frame.
    ///
    /// Corrupt candidate frames are skipped (the framer already logged
    /// them); parsing continues on the remainder, so one bad frame never
    /// stalls the stream.
    pub fn push_bytes(&self, bytes: &[u8]) {
        let mut buffer = self.buffer.lock().expect("buffer lock poisoned");

        if buffer.len() + bytes.len() > self.config.max_buffer_len {
            error!(
                buffered = buffer.len(),
                incoming = bytes.len(),
                limit = self.config.max_buffer_len,
                "receive buffer overflow, discarding buffered bytes"
            );
            buffer.clear();
        }
        buffer.extend_from_slice(bytes);

        loop {
            match parse_next(&mut buffer) {
                ParseResult::Packet(packet) => self.deliver(packet),
                ParseResult::CrcMismatch => continue,
                ParseResult::Incomplete => break,
            }
        }
    }

    /// Queue a packet for transmission.
    pub fn send(&self, packet: Packet) -> Result<()> {
        debug!(packet_type = ?packet.packet_type(), "queueing packet for transmission");
        self.transmit_tx.send(packet).map_err(|_| Esp3Error::ConnectionClosed)
    }

    /// Take the inbound packet stream. Yields each received packet once;
    /// callable once per communicator.
    pub fn packets(&self) -> Option<PacketStream> {
        self.receive_rx
            .lock()
            .expect("receiver lock poisoned")
            .take()
            .map(|rx| PacketStream { inner: UnboundedReceiverStream::new(rx) })
    }

    /// Take the outbound queue. The driver (or an external transport
    /// worker) owns draining it; callable once per communicator.
    pub fn take_transmit_queue(&self) -> Option<mpsc::UnboundedReceiver<Packet>> {
        self.transmit_rx.lock().expect("transmit lock poisoned").take()
    }

    /// The module's base id, fetched with CO_RD_IDBASE on first use and
    /// cached. Returns the last known value (possibly `None`) on timeout.
    pub async fn base_id(&self) -> Option<[u8; 4]> {
        if let Some(id) = *self.base_id.lock().expect("base id lock poisoned") {
            return Some(id);
        }

        let request = Packet::common_command(common_command::CO_RD_IDBASE, &[])
            .expect("one-byte command fits a frame");
        let response = self
            .send_and_wait(request, |packet| {
                packet.return_code() == Some(ReturnCode::Ok)
                    && packet.response_data().is_some_and(|d| d.len() == 4)
            })
            .await;

        match response {
            Ok(packet) => {
                let data = packet.response_data().expect("predicate checked response data");
                let id = [data[0], data[1], data[2], data[3]];
                *self.base_id.lock().expect("base id lock poisoned") = Some(id);
                Some(id)
            }
            Err(error) => {
                error!(%error, "could not obtain base id from module");
                *self.base_id.lock().expect("base id lock poisoned")
            }
        }
    }

    /// The module's version info, fetched with CO_RD_VERSION on first use
    /// and cached. Returns the last known value (possibly `None`) on
    /// timeout.
    pub async fn version_info(&self) -> Option<VersionInfo> {
        if let Some(info) = self.version_info.lock().expect("version lock poisoned").clone() {
            return Some(info);
        }

        let request = Packet::common_command(common_command::CO_RD_VERSION, &[])
            .expect("one-byte command fits a frame");
        let response = self
            .send_and_wait(request, |packet| {
                packet.return_code() == Some(ReturnCode::Ok)
                    && packet.response_data().is_some_and(|d| d.len() == VersionInfo::RESPONSE_LEN)
            })
            .await;

        match response {
            Ok(packet) => {
                let data = packet.response_data().expect("predicate checked response data");
                match VersionInfo::parse(data) {
                    Ok(info) => {
                        info!(app = %info.app_version, chip_id = ?info.chip_id, "module version read");
                        *self.version_info.lock().expect("version lock poisoned") =
                            Some(info.clone());
                        Some(info)
                    }
                    Err(error) => {
                        warn!(%error, "version response did not parse");
                        None
                    }
                }
            }
            Err(error) => {
                warn!(%error, "could not obtain version info from module");
                self.version_info.lock().expect("version lock poisoned").clone()
            }
        }
    }

    /// The chip id from the cached version info, if any.
    pub async fn chip_id(&self) -> Option<[u8; 4]> {
        self.version_info().await.map(|info| info.chip_id)
    }

    /// Send `request` and wait for the first inbound packet matching
    /// `predicate`, bounded by the configured response timeout.
    ///
    /// The completion signal is registered before the request leaves, so the
    /// response cannot race the registration. The matching packet is also
    /// delivered to the receive queue, and non-matching packets are never
    /// consumed on a waiter's behalf.
    pub async fn send_and_wait<F>(&self, request: Packet, predicate: F) -> Result<Packet>
    where
        F: Fn(&Packet) -> bool + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .push(PendingRequest { predicate: Box::new(predicate), tx });

        self.send(request)?;

        match tokio::time::timeout(self.config.response_timeout, rx).await {
            Ok(Ok(packet)) => Ok(packet),
            Ok(Err(_)) => Err(Esp3Error::ConnectionClosed),
            Err(_) => Err(Esp3Error::Timeout { duration: self.config.response_timeout }),
        }
    }

    /// Single dispatch point for every parsed packet.
    fn deliver(&self, mut packet: Packet) {
        packet.set_received(SystemTime::now());
        trace!(packet_type = ?packet.packet_type(), "packet received");

        if self.config.teach_in && packet.packet_type() == PacketType::RadioErp1 {
            self.answer_teach_in(&packet);
        }

        // Fulfil at most one waiter, dropping any whose receiver timed out
        {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.retain(|p| !p.tx.is_closed());
            if let Some(index) = pending.iter().position(|p| (p.predicate)(&packet)) {
                let waiter = pending.swap_remove(index);
                let _ = waiter.tx.send(packet.clone());
            }
        }

        // The queue also gets matched responses, so the application can
        // observe them like the original re-enqueue behavior allowed
        if self.receive_tx.send(packet).is_err() {
            trace!("receive stream dropped, packet discarded");
        }
    }

    fn answer_teach_in(&self, packet: &Packet) {
        let Some(ute) = packet.ute() else {
            return;
        };
        let Some(base_id) = *self.base_id.lock().expect("base id lock poisoned") else {
            warn!("UTE teach-in received but base id is unknown, not answering");
            return;
        };
        match ute.create_response_packet(base_id, UteResponseCode::Accepted) {
            Ok(response) => {
                info!(device = ?ute.sender_id(), eep = ?ute.eep(), "answering UTE teach-in");
                let _ = self.send(response);
            }
            Err(error) => warn!(%error, "could not build UTE teach-in response"),
        }
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("config", &self.config)
            .field("base_id", &*self.base_id.lock().expect("base id lock poisoned"))
            .finish_non_exhaustive()
    }
}
