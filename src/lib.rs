//! Modern, type-safe Rust library for EnOcean ESP3 telegrams.
//!
//! This crate parses and emits the framed ESP3 wire protocol and maps radio
//! telegram payloads to and from named sensor/actuator values, driven by a
//! declarative catalog of EnOcean Equipment Profiles (EEPs).
//!
//! # Features
//!
//! - **Incremental framing**: checksum-validated parsing over fragmented
//!   byte streams, with resynchronization on noise and corruption
//! - **Profile-driven decoding**: sub-byte fields, linear scaling and enum
//!   tables described as data, not code
//! - **Bit-exact serialization**: packets round-trip to the wire format
//! - **Transport-agnostic**: serial/TCP collaborators plug in behind a seam
//!
//! # Quick Start
//!
//! ```rust
//! use esp3::{ParseResult, ProfileCatalog, parse_next};
//!
//! let catalog = ProfileCatalog::from_yaml(
//!     r#"
//! profiles:
//!   - rorg: 165
//!     func: 2
//!     type: 5
//!     description: Temperature Sensor, 0C to +40C
//!     fields:
//!       - shortcut: TMP
//!         bit_offset: 16
//!         bit_size: 8
//!         raw_range: { min: 255, max: 0 }
//!         scale: { min: 0.0, max: 40.0 }
//! "#,
//! )
//! .expect("valid catalog");
//!
//! // One 4BS temperature telegram as read from the serial port
//! let mut buffer = vec![
//!     0x55, 0x00, 0x0a, 0x07, 0x01, 0xeb, 0xa5, 0x08, 0x28, 0x2a, 0x80, 0x01, 0x81, 0xb7,
//!     0x44, 0x00, 0x01, 0xff, 0xff, 0xff, 0xff, 0x31, 0x00, 0x1b,
//! ];
//!
//! let ParseResult::Packet(packet) = parse_next(&mut buffer) else {
//!     panic!("frame expected");
//! };
//! let user_data = packet.user_data().expect("radio telegram");
//!
//! let profile = catalog
//!     .find_profile(packet.rorg().unwrap(), 0x02, 0x05, Some(user_data))
//!     .expect("profile known");
//! let values = profile.get_values(user_data, packet.optional());
//!
//! let temperature = values["TMP"].as_f64().unwrap();
//! assert!((temperature - 33.41).abs() < 0.01);
//! ```
//!
//! The inverse path builds a payload with [`Profile::set_values`], wraps it
//! via [`Packet::radio_erp1`] and serializes it with [`serialize`].

// Core protocol modules
mod crc8;
mod error;
pub mod framer;
pub mod packet;

// Profile subsystem
pub mod eep;

// Transport-facing layer
pub mod connection;

// Core exports
pub use crc8::crc8;
pub use error::{Esp3Error, Result};
pub use framer::{ParseResult, SYNC_BYTE, parse_next, serialize};
pub use packet::{EventCode, Packet, PacketType, ReturnCode, UteRequestType, UteResponseCode, UteTeachIn};

// Profile exports
pub use eep::{
    Direction, Discriminator, EncodeStatus, Field, FieldValue, Profile, ProfileCatalog, Transform,
};

// Connection exports
pub use connection::{
    Communicator, CommunicatorConfig, Driver, DriverHandle, PacketStream, Transport, VersionInfo,
};
