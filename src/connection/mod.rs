//! Connection layer: transport seam, packet dispatch and the worker task.
//!
//! The crate core never touches a serial port or socket. External transports
//! implement [`Transport`]; [`Driver::spawn`] runs the one worker per
//! connection that moves bytes between that transport and a shared
//! [`Communicator`], which owns frame draining, teach-in answering,
//! request/response correlation and the receive queue.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use esp3::connection::{Communicator, CommunicatorConfig, Driver, Transport};
//!
//! # async fn demo<T: Transport>(port: T) {
//! let communicator = Arc::new(Communicator::new(CommunicatorConfig::default()));
//! let driver = Driver::spawn(port, Arc::clone(&communicator));
//!
//! let base_id = communicator.base_id().await;
//! println!("module base id: {base_id:?}");
//! # driver.shutdown();
//! # }
//! ```
//!
//! Reconnect and retry policy stay with the transport implementation; the
//! worker only defends against transient errors with bounded backoff.

mod communicator;
mod driver;
mod version;


pub use communicator::{Communicator, CommunicatorConfig, PacketStream};
pub use driver::{Driver, DriverHandle};
pub use version::{Version, VersionInfo};

/// Byte transport to an EnOcean module (serial port, TCP socket, ...).
///
/// Implementations own their I/O resources and any reconnect policy. `read`
/// should be cancel-safe in the usual tokio sense: the worker may drop a
/// pending read to perform a write.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Read available bytes into `buf`, returning how many were read.
    /// Returning 0 signals end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write an entire serialized frame.
    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}
