//! Profile-driven bit-field codec.
//!
//! Decoding walks every field of a profile, pulls its bit-region out of the
//! section named by the field's direction and applies the field's transform;
//! encoding is the inverse, writing only the addressed bit spans. Both are
//! best-effort by contract: a field that cannot be decoded or encoded
//! degrades that field alone, never the whole telegram. Degradations are
//! logged at warn level so unexpected catalog/payload mismatches stay
//! visible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::bits::{extract_bits, insert_bits};
use super::profile::{Direction, Field, Profile, Transform};
use crate::{Esp3Error, Result};

/// A decoded (or to-be-encoded) field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Unsigned integer, either a raw passthrough or an enum code with no
    /// table entry.
    Raw(u64),
    /// Linearly scaled reading.
    Scaled(f64),
    /// Enum label.
    Symbol(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Raw(raw) => Some(*raw as f64),
            FieldValue::Scaled(value) => Some(*value),
            FieldValue::Symbol(_) => None,
        }
    }
}

/// Outcome of [`Profile::set_values`]. A failed shortcut means that entry
/// was skipped and the buffer left unchanged for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeStatus {
    pub failed: Vec<String>,
}

impl EncodeStatus {
    /// True when every requested field was written.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

fn scale_decode(field: &Field, min: f64, max: f64, raw: u64) -> f64 {
    let raw_span = field.raw_max as f64 - field.raw_min as f64;
    min + (raw as f64 - field.raw_min as f64) * (max - min) / raw_span
}

fn scale_encode(field: &Field, min: f64, max: f64, value: f64) -> u64 {
    let raw_span = field.raw_max as f64 - field.raw_min as f64;
    let raw = field.raw_min as f64 + (value - min) * raw_span / (max - min);
    // Round to nearest before clamping so boundary values stay exact
    field.clamp_raw(raw.round().max(0.0) as u64)
}

fn section<'a>(field: &Field, data: &'a [u8], optional: &'a [u8]) -> &'a [u8] {
    match field.direction {
        Direction::Data => data,
        Direction::Optional => optional,
    }
}

impl Profile {
    /// Decode a payload into a shortcut -> value mapping.
    ///
    /// Covers every field in the profile; decoding never fails outright.
    /// Fields that overrun the payload are skipped with a warning, and enum
    /// codes without a table entry come back as [`FieldValue::Raw`].
    pub fn get_values(&self, data: &[u8], optional: &[u8]) -> HashMap<String, FieldValue> {
        let mut values = HashMap::with_capacity(self.fields.len());

        for field in &self.fields {
            let payload = section(field, data, optional);
            let Some(raw) = extract_bits(payload, field.bit_offset, field.bit_size) else {
                warn!(
                    shortcut = %field.shortcut,
                    bit_offset = field.bit_offset,
                    bit_size = field.bit_size,
                    payload_len = payload.len(),
                    "field does not fit the payload, skipping"
                );
                continue;
            };

            let value = match &field.transform {
                Transform::Raw => FieldValue::Raw(raw),
                Transform::Scale { min, max } => {
                    FieldValue::Scaled(scale_decode(field, *min, *max, raw))
                }
                Transform::Enum(table) => match table.get(&raw) {
                    Some(label) => FieldValue::Symbol(label.clone()),
                    None => {
                        warn!(shortcut = %field.shortcut, raw, "enum value not in table");
                        FieldValue::Raw(raw)
                    }
                },
            };
            values.insert(field.shortcut.clone(), value);
        }

        values
    }

    /// Encode a shortcut -> value mapping into the payload sections.
    ///
    /// `bit_base` shifts data-section fields (pass 8 to skip the RORG byte
    /// of a radio payload when field offsets are relative to the user data).
    /// Bits outside each written span are preserved. Unknown shortcuts and
    /// unconvertible values fail that entry only; the returned status lists
    /// them.
    pub fn set_values(
        &self,
        data: &mut [u8],
        optional: &mut [u8],
        bit_base: usize,
        values: &HashMap<String, FieldValue>,
    ) -> EncodeStatus {
        let mut status = EncodeStatus::default();

        for (shortcut, value) in values {
            let Some(field) = self.field(shortcut) else {
                warn!(%shortcut, "cannot find data description for shortcut");
                status.failed.push(shortcut.clone());
                continue;
            };

            let raw = match field_raw_for(field, value) {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(%shortcut, %error, "cannot encode field value");
                    status.failed.push(shortcut.clone());
                    continue;
                }
            };

            let bit_offset = match field.direction {
                Direction::Data => field.bit_offset + bit_base,
                Direction::Optional => field.bit_offset,
            };
            let payload = match field.direction {
                Direction::Data => &mut *data,
                Direction::Optional => &mut *optional,
            };

            if !insert_bits(payload, bit_offset, field.bit_size, raw) {
                warn!(
                    %shortcut,
                    bit_offset,
                    bit_size = field.bit_size,
                    payload_len = payload.len(),
                    "field does not fit the payload, skipping"
                );
                status.failed.push(shortcut.clone());
            }
        }

        status
    }

    /// Inverse-transform one value into the raw integer its field stores,
    /// without touching any buffer. Useful for composing payloads by hand.
    pub fn raw_for(&self, shortcut: &str, value: &FieldValue) -> Result<u64> {
        let field = self
            .field(shortcut)
            .ok_or_else(|| Esp3Error::FieldNotFound { shortcut: shortcut.to_string() })?;
        field_raw_for(field, value)
    }
}

/// Inverse-transform one value into the raw integer to write.
fn field_raw_for(field: &Field, value: &FieldValue) -> Result<u64> {
    match (&field.transform, value) {
        (Transform::Scale { min, max }, FieldValue::Scaled(v)) => {
            Ok(scale_encode(field, *min, *max, *v))
        }
        (Transform::Scale { min, max }, FieldValue::Raw(raw)) => {
            // Integer input to a scaled field is taken as a scale-domain value
            Ok(scale_encode(field, *min, *max, *raw as f64))
        }
        (Transform::Enum(table), FieldValue::Symbol(label)) => table
            .iter()
            .find_map(|(raw, l)| (l == label).then_some(*raw))
            .ok_or_else(|| Esp3Error::ValueConversion {
                details: format!("enum label '{label}' not in table of field '{}'", field.shortcut),
            }),
        (Transform::Enum(table), FieldValue::Raw(raw)) => {
            // Raw codes are accepted as long as the table knows them
            if table.contains_key(raw) {
                Ok(*raw)
            } else {
                Err(Esp3Error::ValueConversion {
                    details: format!("enum value {raw} not in table of field '{}'", field.shortcut),
                })
            }
        }
        (Transform::Raw, FieldValue::Raw(raw)) => Ok(field.clamp_raw(*raw)),
        (Transform::Raw, FieldValue::Scaled(v)) => Ok(field.clamp_raw(v.round().max(0.0) as u64)),
        (_, value) => Err(Esp3Error::ValueConversion {
            details: format!(
                "value {value:?} does not match the transform of field '{}'",
                field.shortcut
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// A5-02-05 style profile: 8-bit temperature over a descending raw range.
    fn temperature_profile() -> Profile {
        Profile {
            rorg: 0xa5,
            func: 0x02,
            ty: 0x05,
            description: "Temperature Sensor, 0°C to +40°C".to_string(),
            fields: vec![
                Field {
                    shortcut: "TMP".to_string(),
                    description: "Temperature".to_string(),
                    bit_offset: 16,
                    bit_size: 8,
                    direction: Direction::Data,
                    raw_min: 255,
                    raw_max: 0,
                    transform: Transform::Scale { min: 0.0, max: 40.0 },
                },
                Field {
                    shortcut: "LRNB".to_string(),
                    description: "Learn bit".to_string(),
                    bit_offset: 28,
                    bit_size: 1,
                    direction: Direction::Data,
                    raw_min: 0,
                    raw_max: 1,
                    transform: Transform::Enum(BTreeMap::from([
                        (0, "pressed".to_string()),
                        (1, "not pressed".to_string()),
                    ])),
                },
            ],
            discriminators: Vec::new(),
        }
    }

    #[test]
    fn decodes_scaled_temperature() {
        let profile = temperature_profile();
        // 4BS user data with raw temperature 0x55 (85): 40 * (255-85)/255 = 26.66..
        let values = profile.get_values(&[0x00, 0x00, 0x55, 0x08], &[]);

        let tmp = values["TMP"].as_f64().unwrap();
        assert!((tmp - 26.666_666).abs() < 1e-3, "got {tmp}");
        assert_eq!(values["LRNB"], FieldValue::Symbol("not pressed".to_string()));
    }

    #[test]
    fn decode_covers_raw_extremes() {
        let profile = temperature_profile();
        let cold = profile.get_values(&[0x00, 0x00, 0xff, 0x08], &[]);
        let warm = profile.get_values(&[0x00, 0x00, 0x00, 0x08], &[]);
        assert!((cold["TMP"].as_f64().unwrap() - 0.0).abs() < f64::EPSILON);
        assert!((warm["TMP"].as_f64().unwrap() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_enum_code_degrades_to_raw() {
        let mut profile = temperature_profile();
        // Shrink the table so code 1 is unmapped
        profile.fields[1].transform =
            Transform::Enum(BTreeMap::from([(0, "pressed".to_string())]));

        let values = profile.get_values(&[0x00, 0x00, 0x55, 0x08], &[]);
        // Decoding of the other field must be unaffected
        assert!(values.contains_key("TMP"));
        assert_eq!(values["LRNB"], FieldValue::Raw(1));
    }

    #[test]
    fn field_beyond_payload_degrades_that_field_only() {
        let profile = temperature_profile();
        let values = profile.get_values(&[0x00, 0x00], &[]);
        assert!(values.is_empty() || !values.contains_key("TMP"));
    }

    #[test]
    fn encode_writes_only_the_addressed_span() {
        let profile = temperature_profile();
        let mut data = [0xaa, 0xaa, 0x00, 0xaa];

        let status = profile.set_values(
            &mut data,
            &mut [],
            0,
            &HashMap::from([("TMP".to_string(), FieldValue::Scaled(20.0))]),
        );
        assert!(status.is_ok());
        // 20°C on the descending range: 255 - 20 * 255/40 = 127.5, rounds to 128
        assert_eq!(data, [0xaa, 0xaa, 0x80, 0xaa]);
    }

    #[test]
    fn encode_unknown_shortcut_reports_failure_and_preserves_payload() {
        let profile = temperature_profile();
        let mut data = [0x12, 0x34, 0x56, 0x78];
        let before = data;

        let status = profile.set_values(
            &mut data,
            &mut [],
            0,
            &HashMap::from([("invalid_shortcut".to_string(), FieldValue::Raw(0))]),
        );
        assert!(!status.is_ok());
        assert_eq!(status.failed, vec!["invalid_shortcut".to_string()]);
        assert_eq!(data, before);
    }

    #[test]
    fn encode_clamps_scaled_values_to_raw_range() {
        let profile = temperature_profile();
        let mut data = [0x00, 0x00, 0x00, 0x00];

        let status = profile.set_values(
            &mut data,
            &mut [],
            0,
            &HashMap::from([("TMP".to_string(), FieldValue::Scaled(500.0))]),
        );
        assert!(status.is_ok());
        // Clamped to the raw range floor (scale max)
        assert_eq!(data[2], 0x00);
    }

    #[test]
    fn encode_enum_by_label_and_rejects_unknown_label() {
        let profile = temperature_profile();
        let mut data = [0x00, 0x00, 0x00, 0x00];

        let status = profile.set_values(
            &mut data,
            &mut [],
            0,
            &HashMap::from([("LRNB".to_string(), FieldValue::Symbol("not pressed".to_string()))]),
        );
        assert!(status.is_ok());
        assert_eq!(data[3], 0x08);

        let status = profile.set_values(
            &mut data,
            &mut [],
            0,
            &HashMap::from([("LRNB".to_string(), FieldValue::Symbol("bogus".to_string()))]),
        );
        assert_eq!(status.failed, vec!["LRNB".to_string()]);
    }

    #[test]
    fn encode_respects_bit_base() {
        let profile = temperature_profile();
        // Full radio data section: RORG byte first, then the 4BS user data
        let mut data = [0xa5, 0x00, 0x00, 0xff, 0x00];

        let status = profile.set_values(
            &mut data,
            &mut [],
            8,
            &HashMap::from([("TMP".to_string(), FieldValue::Scaled(0.0))]),
        );
        assert!(status.is_ok());
        assert_eq!(data, [0xa5, 0x00, 0x00, 0xff, 0x00]);

        let status = profile.set_values(
            &mut data,
            &mut [],
            8,
            &HashMap::from([("TMP".to_string(), FieldValue::Scaled(40.0))]),
        );
        assert!(status.is_ok());
        assert_eq!(data, [0xa5, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn optional_direction_fields_address_the_optional_section() {
        let mut profile = temperature_profile();
        profile.fields.push(Field {
            shortcut: "SUBTEL".to_string(),
            description: "Sub-telegram count".to_string(),
            bit_offset: 0,
            bit_size: 8,
            direction: Direction::Optional,
            raw_min: 0,
            raw_max: 255,
            transform: Transform::Raw,
        });

        let values = profile.get_values(&[0x00, 0x00, 0x55, 0x08], &[0x03]);
        assert_eq!(values["SUBTEL"], FieldValue::Raw(3));

        let mut optional = [0x00];
        let status = profile.set_values(
            &mut [0u8; 4],
            &mut optional,
            0,
            &HashMap::from([("SUBTEL".to_string(), FieldValue::Raw(3))]),
        );
        assert!(status.is_ok());
        assert_eq!(optional, [0x03]);
    }

    #[test]
    fn raw_for_reports_typed_errors() {
        let profile = temperature_profile();

        assert_eq!(profile.raw_for("TMP", &FieldValue::Scaled(0.0)).unwrap(), 255);

        let err = profile.raw_for("NOPE", &FieldValue::Raw(0)).unwrap_err();
        assert!(matches!(err, crate::Esp3Error::FieldNotFound { .. }));

        let err = profile.raw_for("TMP", &FieldValue::Symbol("warm".to_string())).unwrap_err();
        assert!(matches!(err, crate::Esp3Error::ValueConversion { .. }));
    }

    proptest! {
        #[test]
        fn prop_scale_roundtrip_within_one_step(raw in 0u64..=255) {
            let profile = temperature_profile();
            let field = profile.field("TMP").unwrap();

            // Decode an arbitrary raw reading, re-encode the scaled value
            let decoded = scale_decode(field, 0.0, 40.0, raw);
            let encoded = scale_encode(field, 0.0, 40.0, decoded);

            // Quantization may move the value by at most one raw step
            let delta = encoded.abs_diff(raw);
            prop_assert!(delta <= 1, "raw {} -> {} -> {}", raw, decoded, encoded);
        }

        #[test]
        fn prop_encode_decode_idempotent_within_quantization(value in 0.0f64..=40.0) {
            let profile = temperature_profile();
            let mut data = [0u8; 4];

            let status = profile.set_values(
                &mut data,
                &mut [],
                0,
                &HashMap::from([("TMP".to_string(), FieldValue::Scaled(value))]),
            );
            prop_assert!(status.is_ok());

            let values = profile.get_values(&data, &[]);
            let decoded = values["TMP"].as_f64().unwrap();

            // One scale step = 40 / 255
            let step = 40.0 / 255.0;
            prop_assert!((decoded - value).abs() <= step, "{} vs {}", decoded, value);
        }
    }
}
