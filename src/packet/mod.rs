//! ESP3 packet model.
//!
//! A [`Packet`] is one protocol telegram: a packet type plus the variable
//! length `data` and `optional` sections from the wire. Packets are created
//! either by the frame parser (inbound) or by a caller building a telegram
//! for transmission; they are immutable after construction except for the
//! receive timestamp, which the receiving side stamps once.
//!
//! The byte-level meaning of `data` depends on the packet type, so the
//! typed views (radio accessors, response accessors, the UTE teach-in view)
//! are exposed as bounds-checked methods returning `Option` rather than as
//! separate structs: a non-radio packet simply answers `None` to
//! [`Packet::rorg`].
//!
//! ## Radio telegram layout
//!
//! ```text
//! data     = [ RORG | user data ... | sender id (4) | status ]
//! optional = [ sub-telegrams | destination id (4) | dBm | security level ]
//! ```

mod consts;
mod types;
mod ute;

pub use consts::{common_command, radio_defaults, rorg};
pub use types::{EventCode, PacketType, ReturnCode};
pub use ute::{UteRequestType, UteResponseCode, UteTeachIn};

use std::time::SystemTime;

use crate::{Esp3Error, Result};

/// Maximum byte length of each frame section when building a packet for
/// transmission. The header encodes the optional length in one byte; the
/// same bound is applied to `data`.
pub const MAX_SECTION_LEN: usize = 255;

/// One ESP3 telegram.
#[derive(Debug, Clone)]
pub struct Packet {
    packet_type: PacketType,
    data: Vec<u8>,
    optional: Vec<u8>,
    received: Option<SystemTime>,
}

/// Structural equality: the receive timestamp is transport metadata and is
/// excluded on purpose, so a parsed packet compares equal to the packet that
/// was serialized.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.packet_type == other.packet_type
            && self.data == other.data
            && self.optional == other.optional
    }
}

impl Eq for Packet {}

impl Packet {
    /// Build a packet for transmission.
    ///
    /// Section lengths are checked here rather than at serialization time so
    /// an oversized packet never enters a transmit queue.
    pub fn new(packet_type: PacketType, data: Vec<u8>, optional: Vec<u8>) -> Result<Self> {
        if data.len() > MAX_SECTION_LEN {
            return Err(Esp3Error::SectionTooLong { section: "data", len: data.len() });
        }
        if optional.len() > MAX_SECTION_LEN {
            return Err(Esp3Error::SectionTooLong { section: "optional", len: optional.len() });
        }
        Ok(Self { packet_type, data, optional, received: None })
    }

    /// Build a packet from already-validated wire sections.
    ///
    /// Inbound lengths are bounded by the frame header, which allows a
    /// 16-bit data length, so this constructor does not re-check the
    /// transmit-side section bound.
    pub(crate) fn from_wire(type_byte: u8, data: Vec<u8>, optional: Vec<u8>) -> Self {
        Self { packet_type: PacketType::from_byte(type_byte), data, optional, received: None }
    }

    /// Build a common-command packet (`command` byte plus payload).
    pub fn common_command(command: u8, payload: &[u8]) -> Result<Self> {
        let mut data = Vec::with_capacity(1 + payload.len());
        data.push(command);
        data.extend_from_slice(payload);
        Self::new(PacketType::CommonCommand, data, Vec::new())
    }

    /// Build an ERP1 radio telegram with the standard transmit optional
    /// section (3 sub-telegrams, broadcast destination, 0xFF dBm, security
    /// off).
    pub fn radio_erp1(rorg: u8, user_data: &[u8], sender_id: [u8; 4], status: u8) -> Result<Self> {
        let mut data = Vec::with_capacity(1 + user_data.len() + 5);
        data.push(rorg);
        data.extend_from_slice(user_data);
        data.extend_from_slice(&sender_id);
        data.push(status);

        let optional = vec![
            radio_defaults::SUB_TEL_NUM,
            radio_defaults::BROADCAST,
            radio_defaults::BROADCAST,
            radio_defaults::BROADCAST,
            radio_defaults::BROADCAST,
            radio_defaults::DBM_SEND,
            radio_defaults::SECURITY_OFF,
        ];
        Self::new(PacketType::RadioErp1, data, optional)
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn optional(&self) -> &[u8] {
        &self.optional
    }

    /// When the packet was received, if it came from the wire.
    pub fn received(&self) -> Option<SystemTime> {
        self.received
    }

    /// Stamp the receive time. Called once by the receiving side; packets
    /// built for transmission stay unstamped.
    pub fn set_received(&mut self, at: SystemTime) {
        self.received = Some(at);
    }

    fn is_radio(&self) -> bool {
        matches!(
            self.packet_type,
            PacketType::RadioErp1 | PacketType::RadioSubTel | PacketType::RadioErp2
        )
    }

    // --- radio telegram accessors ---

    /// Radio organization code (first data byte of a radio telegram).
    pub fn rorg(&self) -> Option<u8> {
        if !self.is_radio() {
            return None;
        }
        self.data.first().copied()
    }

    /// Status byte (last data byte of a radio telegram).
    pub fn status(&self) -> Option<u8> {
        if !self.is_radio() {
            return None;
        }
        self.data.last().copied()
    }

    /// Repeater count: the low nibble of the status byte.
    pub fn repeater_count(&self) -> Option<u8> {
        self.status().map(|status| status & 0x0f)
    }

    /// Sender id: the four bytes preceding the status byte.
    pub fn sender_id(&self) -> Option<[u8; 4]> {
        if !self.is_radio() || self.data.len() < 6 {
            return None;
        }
        let start = self.data.len() - 5;
        self.data.get(start..start + 4).map(|b| [b[0], b[1], b[2], b[3]])
    }

    /// The RORG-specific bytes between the RORG byte and the sender id.
    pub fn user_data(&self) -> Option<&[u8]> {
        if !self.is_radio() || self.data.len() < 6 {
            return None;
        }
        self.data.get(1..self.data.len() - 5)
    }

    /// Destination id from the standard optional section.
    pub fn destination_id(&self) -> Option<[u8; 4]> {
        if !self.is_radio() {
            return None;
        }
        self.optional.get(1..5).map(|b| [b[0], b[1], b[2], b[3]])
    }

    /// Received signal strength from the standard optional section.
    pub fn dbm(&self) -> Option<i16> {
        if !self.is_radio() {
            return None;
        }
        // The module reports attenuation as a positive byte
        self.optional.get(5).map(|&b| -(i16::from(b)))
    }

    /// Security level from the standard optional section.
    pub fn security_level(&self) -> Option<u8> {
        if !self.is_radio() {
            return None;
        }
        self.optional.get(6).copied()
    }

    // --- response accessors ---

    /// Return code of a response packet.
    pub fn return_code(&self) -> Option<ReturnCode> {
        if self.packet_type != PacketType::Response {
            return None;
        }
        self.data.first().map(|&b| ReturnCode::from_byte(b))
    }

    /// Payload of a response packet (everything after the return code).
    pub fn response_data(&self) -> Option<&[u8]> {
        if self.packet_type != PacketType::Response {
            return None;
        }
        self.data.get(1..)
    }

    // --- event accessors ---

    /// Event code of an event packet.
    pub fn event_code(&self) -> Option<EventCode> {
        if self.packet_type != PacketType::Event {
            return None;
        }
        self.data.first().map(|&b| EventCode::from_byte(b))
    }

    /// View a UTE teach-in radio telegram, if this is one.
    pub fn ute(&self) -> Option<UteTeachIn<'_>> {
        UteTeachIn::from_packet(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio_fixture() -> Packet {
        // 4BS telegram: rorg A5, 4 user bytes, sender, status
        Packet::from_wire(
            0x01,
            vec![0xa5, 0x08, 0x28, 0x2a, 0x80, 0x01, 0x81, 0xb7, 0x44, 0x00],
            vec![0x01, 0xff, 0xff, 0xff, 0xff, 0x31, 0x00],
        )
    }

    #[test]
    fn radio_accessors() {
        let packet = radio_fixture();
        assert_eq!(packet.rorg(), Some(0xa5));
        assert_eq!(packet.status(), Some(0x00));
        assert_eq!(packet.repeater_count(), Some(0));
        assert_eq!(packet.sender_id(), Some([0x01, 0x81, 0xb7, 0x44]));
        assert_eq!(packet.user_data(), Some(&[0x08, 0x28, 0x2a, 0x80][..]));
        assert_eq!(packet.destination_id(), Some([0xff, 0xff, 0xff, 0xff]));
        assert_eq!(packet.dbm(), Some(-49));
        assert_eq!(packet.security_level(), Some(0));
    }

    #[test]
    fn repeater_count_reads_low_nibble() {
        let mut data = radio_fixture().data().to_vec();
        *data.last_mut().unwrap() = 0x2a;
        let packet = Packet::from_wire(0x01, data, vec![]);
        assert_eq!(packet.repeater_count(), Some(0x0a));
    }

    #[test]
    fn non_radio_packets_have_no_radio_view() {
        let response = Packet::from_wire(0x02, vec![0x00, 0xff, 0x9e, 0x80, 0x00], vec![]);
        assert_eq!(response.rorg(), None);
        assert_eq!(response.status(), None);
        assert_eq!(response.sender_id(), None);
        assert_eq!(response.return_code(), Some(ReturnCode::Ok));
        assert_eq!(response.response_data(), Some(&[0xff, 0x9e, 0x80, 0x00][..]));
    }

    #[test]
    fn event_accessor() {
        let event = Packet::from_wire(0x04, vec![0x04], vec![]);
        assert_eq!(event.event_code(), Some(EventCode::CoReady));
        assert_eq!(event.return_code(), None);
    }

    #[test]
    fn truncated_radio_data_degrades_to_none() {
        let packet = Packet::from_wire(0x01, vec![0xf6], vec![]);
        assert_eq!(packet.rorg(), Some(0xf6));
        assert_eq!(packet.sender_id(), None);
        assert_eq!(packet.user_data(), None);
    }

    #[test]
    fn construction_rejects_oversized_sections() {
        let err = Packet::new(PacketType::RadioErp1, vec![0; 256], vec![]).unwrap_err();
        assert!(matches!(err, Esp3Error::SectionTooLong { section: "data", len: 256 }));

        let err = Packet::new(PacketType::RadioErp1, vec![], vec![0; 300]).unwrap_err();
        assert!(matches!(err, Esp3Error::SectionTooLong { section: "optional", len: 300 }));
    }

    #[test]
    fn equality_ignores_receive_timestamp() {
        let mut received = radio_fixture();
        received.set_received(SystemTime::now());
        assert_eq!(received, radio_fixture());
    }

    #[test]
    fn common_command_layout() {
        let packet = Packet::common_command(common_command::CO_RD_IDBASE, &[]).unwrap();
        assert_eq!(packet.packet_type(), PacketType::CommonCommand);
        assert_eq!(packet.data(), &[0x08]);
        assert!(packet.optional().is_empty());
    }

    #[test]
    fn radio_erp1_builds_standard_optional() {
        let packet = Packet::radio_erp1(rorg::BS4, &[0x08, 0x28, 0x2a, 0x80], [0xde, 0xad, 0xbe, 0xef], 0x00)
            .unwrap();
        assert_eq!(packet.rorg(), Some(rorg::BS4));
        assert_eq!(packet.sender_id(), Some([0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(packet.optional().len(), 7);
        assert_eq!(packet.destination_id(), Some([0xff, 0xff, 0xff, 0xff]));
    }
}
