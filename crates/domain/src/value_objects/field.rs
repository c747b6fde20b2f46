//! Typed field references - replaces raw dotted strings when addressing
//! ValueModel-bearing fields inside a document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// How a ValueModel combines its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Integer sum of enabled modifiers
    Numeric,
    /// Dice-formula concatenation of enabled modifiers
    Formula,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Formula => write!(f, "formula"),
        }
    }
}

/// A validated dotted address into a document (`system.threshold.major`).
///
/// Segments are non-empty and limited to ASCII alphanumerics and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        if path.is_empty() {
            return Err(DomainError::InvalidFieldPath("empty path".into()));
        }
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(DomainError::InvalidFieldPath(format!(
                    "empty segment in '{}'",
                    path
                )));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(DomainError::InvalidFieldPath(format!(
                    "invalid segment '{}' in '{}'",
                    segment, path
                )));
            }
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Path of a child key (`system.threshold.major` -> `...major.modifiers`).
    pub fn child(&self, key: &str) -> Result<Self, DomainError> {
        Self::new(format!("{}.{}", self.0, key))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FieldPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.0
    }
}

/// Fields the system knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownField {
    ThresholdMajor,
    ThresholdSevere,
    Evasion,
    Difficulty,
    AttackModifier,
    Damage,
}

impl KnownField {
    pub fn path(&self) -> &'static str {
        match self {
            Self::ThresholdMajor => "system.threshold.major",
            Self::ThresholdSevere => "system.threshold.severe",
            Self::Evasion => "system.evasion",
            Self::Difficulty => "system.difficulty",
            Self::AttackModifier => "system.attackModifier",
            Self::Damage => "system.damage",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Damage => FieldKind::Formula,
            _ => FieldKind::Numeric,
        }
    }

    /// The two fields carrying the Character Level modifier.
    pub fn thresholds() -> [KnownField; 2] {
        [Self::ThresholdMajor, Self::ThresholdSevere]
    }

    pub fn field_ref(&self) -> FieldRef {
        FieldRef {
            path: FieldPath(self.path().to_string()),
            kind: self.kind(),
        }
    }
}

/// A field path together with its combination rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub path: FieldPath,
    pub kind: FieldKind,
}

impl FieldRef {
    pub fn new(path: FieldPath, kind: FieldKind) -> Self {
        Self { path, kind }
    }

    /// Parse and validate a custom path.
    pub fn custom(path: &str, kind: FieldKind) -> Result<Self, DomainError> {
        Ok(Self {
            path: FieldPath::new(path)?,
            kind,
        })
    }

    pub fn numeric(path: &str) -> Result<Self, DomainError> {
        Self::custom(path, FieldKind::Numeric)
    }

    pub fn formula(path: &str) -> Result<Self, DomainError> {
        Self::custom(path, FieldKind::Formula)
    }
}

impl From<KnownField> for FieldRef {
    fn from(field: KnownField) -> Self {
        field.field_ref()
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.kind)
    }
}
