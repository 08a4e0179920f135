//! Profile catalog: loading, validation and lookup.
//!
//! The catalog source is a YAML document of loosely-typed profile
//! definitions. It is deserialized with serde, converted into the validated
//! [`Profile`] tree exactly once, and is read-only from then on; lookups
//! from any number of threads need no synchronization.
//!
//! A catalog that fails to load is not fatal: [`ProfileCatalog::load`] logs
//! one warning and returns an empty catalog, so every subsequent lookup
//! reports not-found and callers skip semantic decoding for those telegrams.
//!
//! ## Source format
//!
//! ```yaml
//! profiles:
//!   - rorg: 246        # 0xF6
//!     func: 2
//!     type: 2
//!     description: Light and Blind Control
//!     fields:
//!       - shortcut: R1
//!         description: Rocker 1st action
//!         bit_offset: 0
//!         bit_size: 3
//!         enum:
//!           0: AI
//!           1: A0
//!           2: BI
//!           3: B0
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::profile::{Direction, Discriminator, Field, Profile, Transform};
use crate::{Esp3Error, Result};

/// Loosely-typed field definition as it appears in the source document.
#[derive(Debug, Deserialize)]
struct RawField {
    shortcut: String,
    #[serde(default)]
    description: String,
    bit_offset: usize,
    bit_size: usize,
    #[serde(default = "default_direction")]
    direction: Direction,
    #[serde(default)]
    raw_range: Option<RawRange>,
    #[serde(default)]
    scale: Option<ScaleRange>,
    #[serde(default, rename = "enum")]
    enum_table: Option<BTreeMap<u64, String>>,
}

fn default_direction() -> Direction {
    Direction::Data
}

#[derive(Debug, Deserialize)]
struct RawRange {
    min: u64,
    max: u64,
}

#[derive(Debug, Deserialize)]
struct ScaleRange {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct RawDiscriminator {
    bit_offset: usize,
    bit_size: usize,
    min: u64,
    max: u64,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    rorg: u8,
    func: u8,
    #[serde(rename = "type")]
    ty: u8,
    #[serde(default)]
    description: String,
    #[serde(default)]
    discriminators: Vec<RawDiscriminator>,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    profiles: Vec<RawProfile>,
}

impl RawField {
    fn build(self) -> Result<Field> {
        let transform = match (self.scale, self.enum_table) {
            (Some(_), Some(_)) => {
                return Err(Esp3Error::parse_error(
                    "Catalog validation",
                    format!("field '{}' declares both a scale and an enum table", self.shortcut),
                ));
            }
            (Some(scale), None) => Transform::Scale { min: scale.min, max: scale.max },
            (None, Some(table)) => Transform::Enum(table),
            (None, None) => Transform::Raw,
        };

        let capacity = if self.bit_size >= 64 {
            u64::MAX
        } else if self.bit_size > 0 {
            (1u64 << self.bit_size) - 1
        } else {
            0
        };
        let (raw_min, raw_max) = match self.raw_range {
            Some(range) => (range.min, range.max),
            None => (0, capacity),
        };

        Ok(Field {
            shortcut: self.shortcut,
            description: self.description,
            bit_offset: self.bit_offset,
            bit_size: self.bit_size,
            direction: self.direction,
            raw_min,
            raw_max,
            transform,
        })
    }
}

impl RawProfile {
    fn build(self) -> Result<Profile> {
        let fields =
            self.fields.into_iter().map(RawField::build).collect::<Result<Vec<_>>>()?;
        let discriminators = self
            .discriminators
            .into_iter()
            .map(|d| Discriminator {
                bit_offset: d.bit_offset,
                bit_size: d.bit_size,
                min: d.min,
                max: d.max,
            })
            .collect();

        let profile = Profile {
            rorg: self.rorg,
            func: self.func,
            ty: self.ty,
            description: self.description,
            fields,
            discriminators,
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// The in-memory profile catalog. Load once, share by reference.
#[derive(Debug, Default)]
pub struct ProfileCatalog {
    profiles: HashMap<(u8, u8, u8), Vec<Profile>>,
    count: usize,
}

impl ProfileCatalog {
    /// An empty catalog: every lookup reports not-found.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML catalog source.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let raw: RawCatalog = serde_yaml_ng::from_str(source).map_err(|e| {
            Esp3Error::catalog_error_with_source("catalog deserialization failed", Box::new(e))
        })?;

        let mut profiles: HashMap<(u8, u8, u8), Vec<Profile>> = HashMap::new();
        let mut count = 0;
        for raw_profile in raw.profiles {
            let profile = raw_profile.build()?;
            profiles.entry((profile.rorg, profile.func, profile.ty)).or_default().push(profile);
            count += 1;
        }

        debug!(profiles = count, "catalog loaded");
        Ok(Self { profiles, count })
    }

    /// Load a catalog from a file.
    ///
    /// Failure is downgraded to an empty catalog with a single warning, so a
    /// missing or broken catalog degrades semantic decoding instead of
    /// stopping the receiver.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| Esp3Error::transport_error(path.display().to_string(), e))
            .and_then(|source| Self::from_yaml(&source));

        match loaded {
            Ok(catalog) => {
                info!(path = %path.display(), profiles = catalog.count, "profile catalog loaded");
                catalog
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "profile catalog unavailable, continuing with an empty catalog"
                );
                Self::empty()
            }
        }
    }

    /// Number of profiles in the catalog.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Find the profile for a (rorg, func, type) triple.
    ///
    /// When several profiles share the triple, `raw` (typically the
    /// telegram's user data) selects the first candidate whose discriminator
    /// ranges all contain their extracted values. Absence is reported, not
    /// fatal: callers skip semantic decode for that telegram.
    pub fn find_profile(
        &self,
        rorg: u8,
        func: u8,
        ty: u8,
        raw: Option<&[u8]>,
    ) -> Option<&Profile> {
        let candidates = match self.profiles.get(&(rorg, func, ty)) {
            Some(candidates) => candidates,
            None => {
                warn!("no profile for EEP {rorg:02X}-{func:02X}-{ty:02X}");
                return None;
            }
        };

        let found = candidates.iter().find(|p| p.discriminators_match(raw));
        if found.is_none() {
            warn!(
                candidates = candidates.len(),
                "no discriminator matched for EEP {rorg:02X}-{func:02X}-{ty:02X}"
            );
        }
        found
    }
}
