//! Modifier, ModifierValue and PermanentModifierEntry
//!
//! A modifier is one named adjustment to a ValueModel. Stored values are
//! loosely typed (number, string or null) and are interpreted by the field
//! kind when totals are computed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::fmt;

use crate::ModifierId;

/// The raw stored value of a modifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifierValue {
    /// Missing or null
    #[default]
    Empty,
    Number(Number),
    Text(String),
}

impl ModifierValue {
    /// Integer interpretation for numeric fields. Malformed values are 0.
    pub fn as_integer(&self) -> i64 {
        match self {
            Self::Empty => 0,
            Self::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .unwrap_or(0),
            Self::Text(s) => parse_integer_prefix(s),
        }
    }

    /// Sign-normalized dice/arithmetic term for formula fields.
    ///
    /// Returns `None` when there is nothing to append (empty text or a
    /// numeric zero).
    pub fn as_term(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Number(n) if n.as_f64() == Some(0.0) => None,
            Self::Number(n) => Some(normalize_term(&n.to_string())),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(normalize_term(trimmed))
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Convert an arbitrary stored JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Bool(b) => Self::Text(b.to_string()),
            _ => Self::Empty,
        }
    }
}

impl From<i64> for ModifierValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for ModifierValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ModifierValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for ModifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parse the leading integer of a string (`"3abc"` -> 3, `"abc"` -> 0).
pub fn parse_integer_prefix(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let mut total: i64 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else {
            break;
        };
        seen_digit = true;
        total = total.saturating_mul(10).saturating_add(i64::from(d));
    }
    if !seen_digit {
        return 0;
    }
    if negative {
        -total
    } else {
        total
    }
}

/// Prefix `+` when a term has no explicit sign.
pub fn normalize_term(term: &str) -> String {
    if term.starts_with('+') || term.starts_with('-') {
        term.to_string()
    } else {
        format!("+{}", term)
    }
}

fn default_enabled() -> bool {
    true
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    })
}

fn lenient_value<'de, D>(deserializer: D) -> Result<ModifierValue, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(ModifierValue::from_json).unwrap_or_default())
}

/// `true`/`false`, including their string spellings. Anything else is `None`.
fn parse_flag(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_flag).unwrap_or(true))
}

fn lenient_permanent<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_flag).unwrap_or(false))
}

fn lenient_color<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Keys of a stored modifier entry whose JSON type a read has to coerce.
///
/// A non-object entry reports `"entry"`: it is dropped on read.
pub fn coerced_keys(entry: &Value) -> Vec<&'static str> {
    let Some(map) = entry.as_object() else {
        return vec!["entry"];
    };
    fn text_or_null(v: &Value) -> bool {
        v.is_string() || v.is_null()
    }
    let checks: [(&'static str, fn(&Value) -> bool); 6] = [
        ("id", text_or_null),
        ("name", text_or_null),
        ("value", |v| v.is_number() || v.is_string() || v.is_null()),
        ("enabled", Value::is_boolean),
        ("permanent", Value::is_boolean),
        ("color", text_or_null),
    ];
    checks
        .into_iter()
        .filter(|(key, accepts)| map.get(*key).is_some_and(|v| !accepts(v)))
        .map(|(key, _)| key)
        .collect()
}

fn lenient_id<'de, D>(deserializer: D) -> Result<ModifierId, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(ModifierId::from)
}

/// One adjustment to a ValueModel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    #[serde(default, deserialize_with = "lenient_id")]
    id: ModifierId,
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_value")]
    value: ModifierValue,
    #[serde(default = "default_enabled", deserialize_with = "lenient_enabled")]
    enabled: bool,
    #[serde(default, deserialize_with = "lenient_permanent")]
    permanent: bool,
    #[serde(
        default,
        deserialize_with = "lenient_color",
        skip_serializing_if = "Option::is_none"
    )]
    color: Option<String>,
}

impl Modifier {
    /// Create an enabled, user-owned modifier with a fresh id.
    pub fn new(name: impl Into<String>, value: impl Into<ModifierValue>) -> Self {
        Self {
            id: ModifierId::new(),
            name: name.into(),
            value: value.into(),
            enabled: true,
            permanent: false,
            color: None,
        }
    }

    /// Create a system-managed modifier with a known id.
    pub fn permanent(
        id: ModifierId,
        name: impl Into<String>,
        value: impl Into<ModifierValue>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            value: value.into(),
            enabled: true,
            permanent: true,
            color: None,
        }
    }

    pub fn from_draft(id: ModifierId, draft: ModifierDraft) -> Self {
        Self {
            id,
            name: draft.name,
            value: draft.value,
            enabled: draft.enabled || draft.permanent,
            permanent: draft.permanent,
            color: draft.color,
        }
    }

    /// Rebuild a permanent modifier from its tracker entry.
    pub fn from_entry(entry: &PermanentModifierEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            value: entry.value.clone(),
            enabled: entry.enabled,
            permanent: true,
            color: entry.color.clone(),
        }
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Read accessors
    // ──────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ModifierId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ModifierValue {
        &self.value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Tracker entry mirroring this modifier.
    pub fn to_entry(&self) -> PermanentModifierEntry {
        PermanentModifierEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            value: self.value.clone(),
            enabled: self.enabled,
            color: self.color.clone(),
        }
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Builder-style methods (consume self, return new instance)
    // ──────────────────────────────────────────────────────────────────────────

    pub fn with_enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    pub fn with_color(self, color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..self
        }
    }

    // Mutation stays inside the crate so totals are always recomputed by the owner.

    pub(crate) fn set_id(&mut self, id: ModifierId) {
        self.id = id;
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_value(&mut self, value: ModifierValue) {
        self.value = value;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Ledger record of a permanent modifier, kept beside `modifiers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermanentModifierEntry {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: ModifierId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: ModifierValue,
    #[serde(default = "default_enabled", deserialize_with = "lenient_enabled")]
    pub enabled: bool,
    #[serde(
        default,
        deserialize_with = "lenient_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<String>,
}

/// Input for adding a modifier. A missing id is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierDraft {
    pub id: Option<ModifierId>,
    pub name: String,
    pub value: ModifierValue,
    pub enabled: bool,
    pub permanent: bool,
    pub color: Option<String>,
}

impl ModifierDraft {
    pub fn new(name: impl Into<String>, value: impl Into<ModifierValue>) -> Self {
        Self {
            id: None,
            name: name.into(),
            value: value.into(),
            enabled: true,
            permanent: false,
            color: None,
        }
    }

    pub fn with_id(self, id: ModifierId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    pub fn permanent(self) -> Self {
        Self {
            permanent: true,
            ..self
        }
    }
}
