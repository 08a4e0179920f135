//! EnOcean Equipment Profile (EEP) subsystem.
//!
//! Maps between raw telegram payloads and named sensor/actuator values,
//! driven entirely by declarative profile definitions:
//!
//! - [`ProfileCatalog`]: loads the profile source once and answers
//!   `(rorg, func, type)` lookups, disambiguated by raw-byte discriminators
//! - [`Profile`] / [`Field`]: the validated in-memory definitions
//! - the bit-field codec ([`Profile::get_values`] / [`Profile::set_values`]):
//!   MSB-first sub-byte extraction, linear scaling and enum tables
//!
//! The catalog is process-wide, read-only data after load; the codec holds
//! no state beyond its arguments, so everything here is safe to use from
//! multiple threads without locking.

mod bits;
mod catalog;
mod codec;
mod profile;

pub use catalog::ProfileCatalog;
pub use codec::{EncodeStatus, FieldValue};
pub use profile::{Direction, Discriminator, Field, Profile, Transform};
