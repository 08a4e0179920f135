//! Strongly-typed profile and field definitions.
//!
//! The catalog source is loosely-typed, externally supplied data; this
//! module is the validated in-memory form it is converted into exactly once
//! at load time. Bit ranges, transform exclusivity and shortcut uniqueness
//! are checked here, so decode and encode never re-validate per call. The
//! one check that *cannot* happen at load is whether a field fits the live
//! payload: payload lengths vary per telegram, so that is a codec-time
//! degradation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Esp3Error, Result};

/// Which frame section a field lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The telegram's data section (RORG-specific payload).
    Data,
    /// The telegram's optional section.
    Optional,
}

/// Value interpretation of a field's raw bits.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Unsigned integer passthrough.
    Raw,
    /// Linear map from the raw range onto `[min, max]`. Bounds may descend:
    /// several sensor profiles map a falling raw range onto a rising scale.
    Scale { min: f64, max: f64 },
    /// Symbolic labels per raw value.
    Enum(BTreeMap<u64, String>),
}

/// One named bit-region within a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Short name, unique within its profile.
    pub shortcut: String,
    /// Human-readable description.
    pub description: String,
    /// Position counted from the MSB of the section's first byte.
    pub bit_offset: usize,
    pub bit_size: usize,
    pub direction: Direction,
    /// Raw integer range the transform maps from. Defaults to the full bit
    /// range; the source may narrow or invert it.
    pub raw_min: u64,
    pub raw_max: u64,
    pub transform: Transform,
}

impl Field {
    /// Largest raw value representable in `bit_size` bits.
    pub fn bit_capacity(&self) -> u64 {
        if self.bit_size >= 64 { u64::MAX } else { (1u64 << self.bit_size) - 1 }
    }

    /// Clamp a raw value into `[raw_min, raw_max]` (bounds may descend).
    pub(crate) fn clamp_raw(&self, raw: u64) -> u64 {
        let (lo, hi) =
            if self.raw_min <= self.raw_max { (self.raw_min, self.raw_max) } else { (self.raw_max, self.raw_min) };
        raw.clamp(lo, hi)
    }

    fn validate(&self) -> Result<()> {
        if self.shortcut.is_empty() {
            return Err(Esp3Error::parse_error("Field validation", "empty shortcut"));
        }
        if self.bit_size == 0 || self.bit_size > 64 {
            return Err(Esp3Error::parse_error(
                "Field validation",
                format!("field '{}' has unusable bit size {}", self.shortcut, self.bit_size),
            ));
        }
        let capacity = self.bit_capacity();
        if self.raw_min > capacity || self.raw_max > capacity {
            return Err(Esp3Error::parse_error(
                "Field validation",
                format!(
                    "field '{}' raw range {}..{} exceeds {}-bit capacity",
                    self.shortcut, self.raw_min, self.raw_max, self.bit_size
                ),
            ));
        }
        if let Transform::Scale { min, max } = self.transform {
            if !min.is_finite() || !max.is_finite() {
                return Err(Esp3Error::parse_error(
                    "Field validation",
                    format!("field '{}' has a non-finite scale bound", self.shortcut),
                ));
            }
            if self.raw_min == self.raw_max {
                return Err(Esp3Error::parse_error(
                    "Field validation",
                    format!("field '{}' scales over an empty raw range", self.shortcut),
                ));
            }
        }
        if let Transform::Enum(table) = &self.transform {
            if table.is_empty() {
                return Err(Esp3Error::parse_error(
                    "Field validation",
                    format!("field '{}' has an empty enum table", self.shortcut),
                ));
            }
        }
        Ok(())
    }
}

/// A raw-byte range that selects between profiles sharing one triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub bit_offset: usize,
    pub bit_size: usize,
    pub min: u64,
    pub max: u64,
}

impl Discriminator {
    /// Whether the raw bytes carry a value inside this range.
    pub fn matches(&self, raw: &[u8]) -> bool {
        match super::bits::extract_bits(raw, self.bit_offset, self.bit_size) {
            Some(value) => (self.min..=self.max).contains(&value),
            None => false,
        }
    }
}

/// One device-type definition: a (rorg, func, type) triple owning an ordered
/// field list.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub rorg: u8,
    pub func: u8,
    pub ty: u8,
    /// Description from the catalog source, e.g. "Temperature Sensor".
    pub description: String,
    pub fields: Vec<Field>,
    /// All ranges must match the supplied raw bytes for this profile to be
    /// selected; an empty list matches unconditionally.
    pub discriminators: Vec<Discriminator>,
}

impl Profile {
    /// Validate a profile once at load time.
    pub(crate) fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            field.validate()?;
            if !seen.insert(field.shortcut.as_str()) {
                return Err(Esp3Error::parse_error(
                    "Profile validation",
                    format!(
                        "profile {:02X}-{:02X}-{:02X} has duplicate shortcut '{}'",
                        self.rorg, self.func, self.ty, field.shortcut
                    ),
                ));
            }
        }
        for disc in &self.discriminators {
            if disc.bit_size == 0 || disc.bit_size > 64 {
                return Err(Esp3Error::parse_error(
                    "Profile validation",
                    format!(
                        "profile {:02X}-{:02X}-{:02X} has a discriminator of unusable bit size {}",
                        self.rorg, self.func, self.ty, disc.bit_size
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Look up a field by its shortcut.
    pub fn field(&self, shortcut: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.shortcut == shortcut)
    }

    /// Whether this profile's discriminators accept the given raw bytes.
    /// Profiles without discriminators accept anything, including no bytes.
    pub fn discriminators_match(&self, raw: Option<&[u8]>) -> bool {
        if self.discriminators.is_empty() {
            return true;
        }
        let Some(raw) = raw else {
            return false;
        };
        self.discriminators.iter().all(|d| d.matches(raw))
    }
}
