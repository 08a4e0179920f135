//! Universal teach-in (UTE) telegram view and response derivation.
//!
//! A UTE teach-in is an ERP1 radio telegram with RORG 0xD4 whose seven user
//! data bytes (DB6 down to DB0) announce a device and the EEP it speaks. The
//! view decodes the DB6 control bits and the embedded profile triple, and can
//! derive the answering telegram, the one packet-to-packet derivation the
//! model allows.

use tracing::debug;

use super::{Packet, PacketType, radio_defaults, rorg};
use crate::Result;

/// Response codes placed in DB6 bits 5..4 of a UTE response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UteResponseCode {
    NotAccepted,
    Accepted,
    DeletionAccepted,
    EepNotSupported,
}

impl UteResponseCode {
    fn bits(self) -> u8 {
        match self {
            UteResponseCode::NotAccepted => 0b00,
            UteResponseCode::Accepted => 0b01,
            UteResponseCode::DeletionAccepted => 0b10,
            UteResponseCode::EepNotSupported => 0b11,
        }
    }
}

/// Request type from DB6 bits 5..4 of a teach-in query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UteRequestType {
    TeachIn,
    Deletion,
    NotSpecified,
    Reserved,
}

/// Borrowed view over a UTE teach-in telegram.
#[derive(Debug, Clone, Copy)]
pub struct UteTeachIn<'a> {
    packet: &'a Packet,
    user_data: &'a [u8],
}

impl<'a> UteTeachIn<'a> {
    /// DB6 bit 7: whether the device communicates bidirectionally.
    pub fn bidirectional(&self) -> bool {
        self.user_data[0] & 0x80 != 0
    }

    /// DB6 bit 6: cleared means the device expects a response.
    pub fn response_expected(&self) -> bool {
        self.user_data[0] & 0x40 == 0
    }

    /// DB6 bits 5..4.
    pub fn request_type(&self) -> UteRequestType {
        match (self.user_data[0] >> 4) & 0b11 {
            0b00 => UteRequestType::TeachIn,
            0b01 => UteRequestType::Deletion,
            0b10 => UteRequestType::NotSpecified,
            _ => UteRequestType::Reserved,
        }
    }

    /// DB5: number of channels to be taught in.
    pub fn channel_count(&self) -> u8 {
        self.user_data[1]
    }

    /// Manufacturer id from DB4 plus the low bits of DB3.
    pub fn manufacturer_id(&self) -> u16 {
        u16::from(self.user_data[2]) | (u16::from(self.user_data[3] & 0x07) << 8)
    }

    /// The announced profile triple, in (rorg, func, type) order.
    /// DB0 carries the RORG, DB1 the FUNC, DB2 the TYPE.
    pub fn eep(&self) -> (u8, u8, u8) {
        (self.user_data[6], self.user_data[5], self.user_data[4])
    }

    /// Sender of the teach-in query.
    pub fn sender_id(&self) -> [u8; 4] {
        // user_data was validated to sit inside a well-formed radio telegram
        self.packet.sender_id().unwrap_or([0; 4])
    }

    /// Derive the answering UTE telegram.
    ///
    /// DB6 of the response carries the bidirectional flag, the response code
    /// in bits 5..4 and the teach-in-response command (0x1) in the low
    /// nibble; DB5..DB0 echo the query. The response is sent from `base_id`
    /// and addressed to the querying device.
    pub fn create_response_packet(
        &self,
        base_id: [u8; 4],
        response: UteResponseCode,
    ) -> Result<Packet> {
        let db6 = 0x80 | (response.bits() << 4) | 0x01;

        let mut data = Vec::with_capacity(13);
        data.push(rorg::UTE);
        data.push(db6);
        data.extend_from_slice(&self.user_data[1..7]);
        data.extend_from_slice(&base_id);
        data.push(0x00);

        let sender = self.sender_id();
        let mut optional = Vec::with_capacity(7);
        optional.push(radio_defaults::SUB_TEL_NUM);
        optional.extend_from_slice(&sender);
        optional.push(radio_defaults::DBM_SEND);
        optional.push(radio_defaults::SECURITY_OFF);

        debug!(?response, device = ?sender, "building UTE teach-in response");
        Packet::new(PacketType::RadioErp1, data, optional)
    }

    pub(super) fn from_packet(packet: &'a Packet) -> Option<Self> {
        if packet.rorg() != Some(rorg::UTE) {
            return None;
        }
        let user_data = packet.user_data()?;
        if user_data.len() != 7 {
            return None;
        }
        Some(Self { packet, user_data })
    }
}
