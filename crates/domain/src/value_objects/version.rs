//! Semantic version stamp used to gate migration steps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Dotted integer triple compared component-wise (`1.2.10 > 1.2.9`).
///
/// Missing components parse as 0, so `"1.2"` equals `"1.2.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }
}

impl Default for Version {
    /// Stamp assumed for documents that have never been migrated.
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::parse("empty version"));
        }
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(DomainError::parse(format!(
                "too many version components: '{}'",
                trimmed
            )));
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(parts) {
            *slot = part.parse().map_err(|_| {
                DomainError::parse(format!("invalid version component '{}' in '{}'", part, trimmed))
            })?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl TryFrom<String> for Version {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert!(v("1.2.10") > v("1.2.9"));
        assert!(v("1.10.0") > v("1.9.9"));
        assert!(v("2.0.0") > v("1.99.99"));
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(v("1.2"), Version::new(1, 2, 0));
        assert_eq!(v("3"), Version::new(3, 0, 0));
        assert_eq!(v("1.2"), v("1.2.0"));
    }

    #[test]
    fn test_invalid_versions() {
        assert!("".parse::<Version>().is_err());
        assert!("1.x.0".parse::<Version>().is_err());
        assert!("1..0".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
    }

    #[test]
    fn test_default_is_one_zero_zero() {
        assert_eq!(Version::default().to_string(), "1.0.0");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Version::new(1, 2, 5)).unwrap();
        assert_eq!(json, "\"1.2.5\"");
        let parsed: Version = serde_json::from_str("\"1.3\"").unwrap();
        assert_eq!(parsed, Version::new(1, 3, 0));
    }
}
