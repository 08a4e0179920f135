//! ESP3 packet type and return code definitions

use serde::{Deserialize, Serialize};

/// ESP3 packet types from the frame header's type byte.
///
/// Unrecognized type bytes are preserved in [`PacketType::Unknown`] so frames
/// of future packet types still round-trip through parse and serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    /// ERP1 radio telegram
    RadioErp1,
    /// Response to any command packet
    Response,
    /// Radio sub-telegram
    RadioSubTel,
    /// Asynchronous module event
    Event,
    /// Common command to the module
    CommonCommand,
    /// Smart Ack command
    SmartAckCommand,
    /// Remote management command
    RemoteManCommand,
    /// Radio message (chained telegrams)
    RadioMessage,
    /// ERP2 radio telegram
    RadioErp2,
    /// Any type byte this crate has no named variant for
    Unknown(u8),
}

impl PacketType {
    /// Map a wire type byte to a packet type.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => PacketType::RadioErp1,
            0x02 => PacketType::Response,
            0x03 => PacketType::RadioSubTel,
            0x04 => PacketType::Event,
            0x05 => PacketType::CommonCommand,
            0x06 => PacketType::SmartAckCommand,
            0x07 => PacketType::RemoteManCommand,
            0x09 => PacketType::RadioMessage,
            0x0a => PacketType::RadioErp2,
            other => PacketType::Unknown(other),
        }
    }

    /// The wire type byte for this packet type.
    pub fn to_byte(self) -> u8 {
        match self {
            PacketType::RadioErp1 => 0x01,
            PacketType::Response => 0x02,
            PacketType::RadioSubTel => 0x03,
            PacketType::Event => 0x04,
            PacketType::CommonCommand => 0x05,
            PacketType::SmartAckCommand => 0x06,
            PacketType::RemoteManCommand => 0x07,
            PacketType::RadioMessage => 0x09,
            PacketType::RadioErp2 => 0x0a,
            PacketType::Unknown(byte) => byte,
        }
    }
}

/// Return codes carried in the first data byte of a response packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnCode {
    Ok,
    Error,
    NotSupported,
    WrongParam,
    OperationDenied,
    Unknown(u8),
}

impl ReturnCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => ReturnCode::Ok,
            0x01 => ReturnCode::Error,
            0x02 => ReturnCode::NotSupported,
            0x03 => ReturnCode::WrongParam,
            0x04 => ReturnCode::OperationDenied,
            other => ReturnCode::Unknown(other),
        }
    }
}

/// Event codes carried in the first data byte of an event packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCode {
    SaReclaimNotSuccessful,
    SaConfirmLearn,
    SaLearnAck,
    CoReady,
    CoEventSecureDevices,
    Unknown(u8),
}

impl EventCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => EventCode::SaReclaimNotSuccessful,
            0x02 => EventCode::SaConfirmLearn,
            0x03 => EventCode::SaLearnAck,
            0x04 => EventCode::CoReady,
            0x05 => EventCode::CoEventSecureDevices,
            other => EventCode::Unknown(other),
        }
    }
}
