//! Schema version: a validated positive integer.
//!
//! Bumping the version of a storage facade makes it address a fresh, empty
//! collection. Values are checked when constructed, so holding a
//! `SchemaVersion` means the value is already valid.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A positive schema version in `1..=u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    /// The version every facade starts with.
    pub const INITIAL: Self = Self(1);

    pub const MAX: u32 = u32::MAX;

    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::InvalidVersion(value.to_string()));
        }
        Ok(Self(value))
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Rebuild from a value already known to be valid (e.g. an atomic cell).
    pub(crate) const fn from_raw(value: u32) -> Self {
        Self(value)
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SchemaVersion> for u32 {
    fn from(version: SchemaVersion) -> Self {
        version.0
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for SchemaVersion {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ValidationError::InvalidVersion(value.to_string()));
        }
        let value =
            u32::try_from(value).map_err(|_| ValidationError::VersionOutOfRange(value as u64))?;
        Self::new(value)
    }
}

impl TryFrom<f64> for SchemaVersion {
    type Error = ValidationError;

    /// Rejects NaN, infinities, fractional and non-positive values.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 || value <= 0.0 {
            return Err(ValidationError::InvalidVersion(value.to_string()));
        }
        if value > f64::from(Self::MAX) {
            return Err(ValidationError::VersionOutOfRange(value as u64));
        }
        Ok(Self(value as u32))
    }
}

/// Atomic holder used by facades whose version is mutated through `&self`.
#[derive(Debug)]
pub struct VersionCell(AtomicU32);

impl VersionCell {
    pub fn new(version: SchemaVersion) -> Self {
        Self(AtomicU32::new(version.get()))
    }

    pub fn get(&self) -> SchemaVersion {
        SchemaVersion::from_raw(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, version: SchemaVersion) {
        self.0.store(version.get(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_one() {
        assert_eq!(SchemaVersion::default().get(), 1);
    }

    #[test]
    fn test_rejects_invalid_floats() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -1.0, 1.5] {
            assert!(
                matches!(
                    SchemaVersion::try_from(bad),
                    Err(ValidationError::InvalidVersion(_))
                ),
                "{} should be rejected",
                bad
            );
        }
        assert_eq!(SchemaVersion::try_from(2.0).unwrap().get(), 2);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            SchemaVersion::try_from(1i64 << 40),
            Err(ValidationError::VersionOutOfRange(_))
        ));
        assert!(matches!(
            SchemaVersion::try_from(1e12),
            Err(ValidationError::VersionOutOfRange(_))
        ));
        assert!(SchemaVersion::new(SchemaVersion::MAX).is_ok());
        assert!(SchemaVersion::new(0).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let v: SchemaVersion = serde_json::from_str("3").unwrap();
        assert_eq!(v.get(), 3);
        assert!(serde_json::from_str::<SchemaVersion>("0").is_err());
        assert!(serde_json::from_str::<SchemaVersion>("-4").is_err());
    }

    #[test]
    fn test_version_cell() {
        let cell = VersionCell::new(SchemaVersion::INITIAL);
        cell.set(SchemaVersion::new(5).unwrap());
        assert_eq!(cell.get().get(), 5);
    }

    proptest! {
        #[test]
        fn test_positive_integers_accepted(v in 1i64..=u32::MAX as i64) {
            let version = SchemaVersion::try_from(v).unwrap();
            prop_assert_eq!(i64::from(version.get()), v);
            prop_assert_eq!(SchemaVersion::try_from(v as f64).unwrap(), version);
        }

        #[test]
        fn test_non_positive_rejected(v in i64::MIN..=0i64) {
            prop_assert!(SchemaVersion::try_from(v).is_err());
        }
    }
}
