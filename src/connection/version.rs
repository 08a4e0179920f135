//! Module version information from the CO_RD_VERSION response.

use std::fmt;

use crate::{Esp3Error, Result};

/// One four-part version number as reported by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub main: u8,
    pub beta: u8,
    pub alpha: u8,
    pub build: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.main, self.beta, self.alpha, self.build)
    }
}

/// Parsed CO_RD_VERSION response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub app_version: Version,
    pub api_version: Version,
    pub chip_id: [u8; 4],
    pub chip_version: u32,
    pub app_description: String,
}

impl VersionInfo {
    /// Byte length of the response payload this parses.
    pub const RESPONSE_LEN: usize = 32;

    /// Parse the 32-byte response payload of CO_RD_VERSION.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::RESPONSE_LEN {
            return Err(Esp3Error::parse_error(
                "version info",
                format!("expected {} response bytes, got {}", Self::RESPONSE_LEN, bytes.len()),
            ));
        }

        Ok(Self {
            app_version: Version { main: bytes[0], beta: bytes[1], alpha: bytes[2], build: bytes[3] },
            api_version: Version { main: bytes[4], beta: bytes[5], alpha: bytes[6], build: bytes[7] },
            chip_id: [bytes[8], bytes[9], bytes[10], bytes[11]],
            chip_version: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            app_description: null_terminated_string(&bytes[16..32]),
        })
    }
}

/// Extract a trimmed string from a null-terminated fixed-size byte field.
fn null_terminated_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
