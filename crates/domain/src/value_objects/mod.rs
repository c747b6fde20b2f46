//! Value objects - Immutable objects defined by their attributes

mod field;
mod modifier;
mod value_model;
mod version;

pub use field::{FieldKind, FieldPath, FieldRef, KnownField};
pub use modifier::{
    coerced_keys, normalize_term, parse_integer_prefix, Modifier, ModifierDraft, ModifierValue,
    PermanentModifierEntry,
};
pub use value_model::{Formula, ModifiedValue, Resolve, ValueModel};
pub use version::Version;
