//! Constants for interpreting ESP3 telegram bytes
//!
//! This module contains the RORG discriminators, common-command codes and the
//! standard optional-section values used when building radio telegrams.

// Radio organization codes (first data byte of a radio telegram)
pub mod rorg {
    pub const UNDEFINED: u8 = 0x00;
    pub const RPS: u8 = 0xF6; // repeated switch
    pub const BS1: u8 = 0xD5; // 1-byte sensor
    pub const BS4: u8 = 0xA5; // 4-byte sensor
    pub const VLD: u8 = 0xD2; // variable length data
    pub const MSC: u8 = 0xD1; // manufacturer specific
    pub const ADT: u8 = 0xA6; // addressed telegram
    pub const SM_LRN_REQ: u8 = 0xC6;
    pub const SM_LRN_ANS: u8 = 0xC7;
    pub const SM_REC: u8 = 0xA7;
    pub const SYS_EX: u8 = 0xC5;
    pub const SEC: u8 = 0x30;
    pub const SEC_ENCAPS: u8 = 0x31;
    pub const UTE: u8 = 0xD4; // universal teach-in
}

// Common commands (first data byte of a COMMON_COMMAND packet)
pub mod common_command {
    pub const CO_WR_SLEEP: u8 = 0x01;
    pub const CO_WR_RESET: u8 = 0x02;
    pub const CO_RD_VERSION: u8 = 0x03;
    pub const CO_RD_SYS_LOG: u8 = 0x04;
    pub const CO_WR_SYS_LOG: u8 = 0x05;
    pub const CO_WR_BIST: u8 = 0x06;
    pub const CO_WR_IDBASE: u8 = 0x07;
    pub const CO_RD_IDBASE: u8 = 0x08;
    pub const CO_WR_LEARNMODE: u8 = 0x17;
    pub const CO_RD_LEARNMODE: u8 = 0x18;
}

// Standard optional section of an outbound ERP1 telegram
pub mod radio_defaults {
    /// Sub-telegram count for transmission
    pub const SUB_TEL_NUM: u8 = 0x03;
    /// Broadcast destination id byte
    pub const BROADCAST: u8 = 0xFF;
    /// Signal strength placeholder for transmission
    pub const DBM_SEND: u8 = 0xFF;
    /// No security
    pub const SECURITY_OFF: u8 = 0x00;
}
