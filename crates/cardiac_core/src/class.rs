//! The enumerated diagnosis classes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Diagnosis class predicted for a cardiac scan.
///
/// The discriminant order is the network's output order: index 0 is
/// [`CardiacClass::Healthy`], index 1 is [`CardiacClass::Abnormal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardiacClass {
    /// No significant abnormality.
    Healthy,
    /// Cardiac abnormality present.
    Abnormal,
}

impl CardiacClass {
    /// All classes in network output order.
    pub const ALL: [CardiacClass; 2] = [CardiacClass::Healthy, CardiacClass::Abnormal];

    /// Number of classes.
    pub const COUNT: usize = Self::ALL.len();

    /// Output index of this class.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Healthy => 0,
            Self::Abnormal => 1,
        }
    }

    /// Look up a class by its output index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownClass`] when `index >= COUNT`.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| CoreError::UnknownClass(format!("index {index}")))
    }

    /// Lowercase class name as reported to callers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Abnormal => "abnormal",
        }
    }
}

impl fmt::Display for CardiacClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CardiacClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "abnormal" => Ok(Self::Abnormal),
            other => Err(CoreError::UnknownClass(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for class in CardiacClass::ALL {
            assert_eq!(CardiacClass::from_index(class.index()).unwrap(), class);
        }
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(matches!(
            CardiacClass::from_index(2),
            Err(CoreError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Healthy".parse::<CardiacClass>().unwrap(), CardiacClass::Healthy);
        assert_eq!(CardiacClass::Abnormal.to_string(), "abnormal");
        assert!("murmur".parse::<CardiacClass>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&CardiacClass::Abnormal).unwrap();
        assert_eq!(json, "\"abnormal\"");
    }
}
