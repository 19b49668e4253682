//! Declarative description of every wizard step.
//!
//! A step is a list of [`FieldDescriptor`]s plus the dependent-field rules that run when a
//! controlling field changes. The generic validator in `validation` interprets these
//! descriptors; nothing about an individual step is hand-coded there.

mod options;
mod steps;

pub use options::*;
pub use steps::{StepKind, DOCUMENTS, STEP_COUNT};

use serde::Serialize;

use super::format::InputFilter;
use super::record::ApplicationRecord;

/// Broad shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Choice,
    Date,
    Year,
    Number,
    Flag,
    Attachment,
}

/// Predicate over the step's current slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Condition {
    Equals {
        field: &'static str,
        value: &'static str,
    },
    /// Holds whenever the field is not exactly `value`, including when it is empty.
    NotEquals {
        field: &'static str,
        value: &'static str,
    },
    OneOf {
        field: &'static str,
        values: &'static [&'static str],
    },
    Present {
        field: &'static str,
    },
    All {
        conditions: Vec<Condition>,
    },
}

impl Condition {
    pub fn holds(&self, slice: &ApplicationRecord) -> bool {
        match self {
            Condition::Equals { field, value } => slice.text(field).as_deref() == Some(*value),
            Condition::NotEquals { field, value } => slice.text(field).as_deref() != Some(*value),
            Condition::OneOf { field, values } => slice
                .text(field)
                .is_some_and(|current| values.iter().any(|value| *value == current)),
            Condition::Present { field } => slice.is_provided(field),
            Condition::All { conditions } => conditions.iter().all(|inner| inner.holds(slice)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "condition")]
pub enum Requirement {
    Always,
    Optional,
    When(Condition),
}

impl Requirement {
    pub fn applies(&self, slice: &ApplicationRecord) -> bool {
        match self {
            Requirement::Always => true,
            Requirement::Optional => false,
            Requirement::When(condition) => condition.holds(slice),
        }
    }
}

/// Which catalog lookup constrains a choice field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogField {
    Qualification,
    Program,
    Major,
    Campus,
}

/// Format check run against a provided value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldFormat {
    /// Letters in any script, spaces, apostrophes, and hyphens.
    PersonName,
    /// ASCII letters and spaces.
    LettersOnly,
    Email,
    /// At least ten digits, spaces, or `-+()` characters.
    Phone,
    /// `03` followed by nine digits.
    PakistaniMobile,
    /// `XXXXX-XXXXXXX-X`.
    Cnic,
    /// Five digits.
    PostalCode,
    /// Letters, digits, and hyphens.
    RollNumber,
    MinLength { min: usize },
    IntegerRange { min: i64, max: i64 },
    /// ISO date of birth whose age on the evaluation day falls in `min..=max`.
    Age { min: u32, max: u32 },
    /// Year at least `gap` years after the year in `field`.
    YearAfter {
        field: &'static str,
        label: &'static str,
        gap: i32,
    },
    /// Value must be one of the descriptor's options.
    OneOfOptions,
    Catalog { field: CatalogField },
}

/// One field of a step form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub requirement: Requirement,
    pub formats: Vec<FieldFormat>,
    pub options: &'static [&'static str],
    pub input: InputFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_message: Option<&'static str>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            requirement: Requirement::Always,
            formats: Vec::new(),
            options: &[],
            input: InputFilter::Verbatim,
            required_message: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }

    pub fn required_when(mut self, condition: Condition) -> Self {
        self.requirement = Requirement::When(condition);
        self
    }

    pub fn format(mut self, format: FieldFormat) -> Self {
        self.formats.push(format);
        self
    }

    pub fn options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self.formats.push(FieldFormat::OneOfOptions);
        self
    }

    pub fn input(mut self, input: InputFilter) -> Self {
        self.input = input;
        self
    }

    pub fn required_message(mut self, message: &'static str) -> Self {
        self.required_message = Some(message);
        self
    }

    pub fn missing_message(&self) -> String {
        match self.required_message {
            Some(message) => message.to_string(),
            None => format!("{} is required", self.label),
        }
    }
}

/// Fields removed from the slice when `trigger` is edited and `when` holds afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearRule {
    pub trigger: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    pub clears: &'static [&'static str],
}

/// Source fields mirrored onto target fields while `when` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyRule {
    pub when: Condition,
    pub pairs: &'static [(&'static str, &'static str)],
}

/// Backend endpoint a step persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// Local acknowledgement only.
    None,
    Json,
    Multipart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSchema {
    pub kind: StepKind,
    pub title: &'static str,
    pub persistence: Persistence,
    pub fields: Vec<FieldDescriptor>,
    pub clear_rules: Vec<ClearRule>,
    pub copy_rules: Vec<CopyRule>,
}

impl StepSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Restrict a record to this step's fields.
    pub fn slice_of(&self, record: &ApplicationRecord) -> ApplicationRecord {
        record.slice(self.field_names())
    }
}
