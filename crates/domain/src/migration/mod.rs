//! Schema migration
//!
//! A [`MigrationPlan`] runs every step whose gate is above the document's
//! version stamp, then the safety scan, and folds everything into a single
//! [`DocumentUpdate`] for one atomic write.
//!
//! Gated steps are all-or-nothing per document: if one fails, none of their
//! updates are kept and the stamp stays where it was. Safety-scan repairs
//! are kept either way.

mod safety;
mod steps;

use serde_json::{json, Value};

use crate::entities::{Document, DocumentRef, DocumentUpdate};
use crate::error::DomainError;
use crate::value_objects::Version;

pub use safety::scan as safety_scan;
pub use steps::{
    standard_steps, DAMAGE_TO_VALUE_MODEL, DEFENSE_VALUE_MODELS, ITEM_LOCATION, MODIFIER_IDS,
    THRESHOLD_VALUE_MODELS, WEAPON_EQUIPPED,
};

/// Dotted path of the per-document version stamp.
pub const VERSION_FLAG_PATH: &str = "flags.dhsheet.migrationVersion";

/// Version documents are migrated to.
pub const CURRENT_VERSION: Version = Version::new(1, 3, 0);

pub type StepFn =
    fn(&Document, &mut Vec<String>) -> Result<Option<DocumentUpdate>, DomainError>;

/// One idempotent transform, run iff the document's stamp is below `gate`.
#[derive(Clone, Copy)]
pub struct MigrationStep {
    pub gate: Version,
    pub name: &'static str,
    pub apply: StepFn,
}

impl MigrationStep {
    pub fn new(gate: Version, name: &'static str, apply: StepFn) -> Self {
        Self { gate, name, apply }
    }
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("gate", &self.gate)
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: DomainError,
}

/// Everything one migration pass decided for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub document: DocumentRef,
    pub from: Version,
    /// Stamp after the write (equal to `from` when it did not advance).
    pub to: Version,
    pub update: DocumentUpdate,
    /// Whether the update touches anything besides the stamp.
    pub data_changed: bool,
    pub applied_steps: Vec<&'static str>,
    pub failures: Vec<StepFailure>,
    pub diagnostics: Vec<String>,
}

impl MigrationOutcome {
    pub fn needs_write(&self) -> bool {
        !self.update.is_empty()
    }

    pub fn stamped(&self) -> bool {
        self.to != self.from
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
    current: Version,
}

impl Default for MigrationPlan {
    fn default() -> Self {
        Self::standard()
    }
}

impl MigrationPlan {
    /// The shipped steps targeting [`CURRENT_VERSION`].
    pub fn standard() -> Self {
        Self::new(standard_steps(), CURRENT_VERSION)
    }

    /// Steps are ordered by gate; steps sharing a gate keep their given order.
    pub fn new(mut steps: Vec<MigrationStep>, current: Version) -> Self {
        steps.sort_by_key(|step| step.gate);
        Self { steps, current }
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn current(&self) -> Version {
        self.current
    }

    /// Stamp of `document`; absent or unreadable stamps count as 1.0.0.
    pub fn read_stamp(document: &Document, diagnostics: &mut Vec<String>) -> Version {
        match document.get(VERSION_FLAG_PATH) {
            None | Some(Value::Null) => Version::default(),
            Some(Value::String(raw)) => raw.parse().unwrap_or_else(|err| {
                diagnostics.push(format!(
                    "{}: unreadable version stamp '{}' ({}), assuming {}",
                    document.target(),
                    raw,
                    err,
                    Version::default()
                ));
                Version::default()
            }),
            Some(other) => {
                diagnostics.push(format!(
                    "{}: version stamp {} is not a string, assuming {}",
                    document.target(),
                    other,
                    Version::default()
                ));
                Version::default()
            }
        }
    }

    pub fn needs_migration(&self, document: &Document) -> bool {
        Self::read_stamp(document, &mut Vec::new()) < self.current
    }

    /// Decide the update for one document. Pure; the caller persists it.
    pub fn run(&self, document: &Document) -> MigrationOutcome {
        let mut diagnostics = Vec::new();
        let from = Self::read_stamp(document, &mut diagnostics);

        let mut working = document.clone();
        let mut gated = DocumentUpdate::new();
        let mut applied_steps = Vec::new();
        let mut failures = Vec::new();
        for step in self.steps.iter().filter(|step| from < step.gate) {
            match (step.apply)(&working, &mut diagnostics) {
                Ok(Some(update)) => {
                    working.apply(&update);
                    gated.merge(update);
                    applied_steps.push(step.name);
                }
                Ok(None) => applied_steps.push(step.name),
                Err(error) => {
                    failures.push(StepFailure {
                        step: step.name,
                        error,
                    });
                    break;
                }
            }
        }

        let (mut update, scanned) = if failures.is_empty() {
            (gated, working)
        } else {
            applied_steps.clear();
            (DocumentUpdate::new(), document.clone())
        };
        update.merge(safety_scan(&scanned, &mut diagnostics));
        let data_changed = !update.is_empty();

        let to = if failures.is_empty() && from < self.current {
            update.set(VERSION_FLAG_PATH, json!(self.current.to_string()));
            self.current
        } else {
            from
        };

        MigrationOutcome {
            document: document.target(),
            from,
            to,
            update,
            data_changed,
            applied_steps,
            failures,
            diagnostics,
        }
    }
}
