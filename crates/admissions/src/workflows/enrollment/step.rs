use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::attachments::{AttachmentError, AttachmentSet, DocumentAttachment};
use super::backend::{AdmissionCode, BackendError, EnrollmentBackend};
use super::payload;
use super::record::{value_text, ApplicationRecord};
use super::schema::{FieldDescriptor, FieldKind, Persistence, StepKind, StepSchema};
use super::validation::{validate, ValidationReport};

const REUPLOAD_MESSAGE: &str = "Please upload this file again before saving";

/// Receives a step form's callbacks. Implemented by whoever owns the aggregate record.
pub trait StepObserver {
    /// The step's full updated slice. `null` entries mark fields that were cleared.
    fn on_change(&mut self, slice: ApplicationRecord);

    fn on_validation(&mut self, valid: bool);
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{field} is not a field of the {step} step")]
    UnknownField { field: String, step: &'static str },
    #[error("{field} only accepts file uploads")]
    AttachmentOnly { field: String },
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error("step has {} invalid field(s)", .0.len())]
    Invalid(ValidationReport),
    #[error("saving step failed: {0}")]
    Backend(#[from] BackendError),
}

/// Identifiers the backend handed back while a step was saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_code: Option<AdmissionCode>,
}

impl SaveReceipt {
    fn absorb(&mut self, response: &Value) {
        if self.student_id.is_none() {
            self.student_id = ["student_id", "id"]
                .into_iter()
                .filter_map(|key| response.get(key))
                .find(|value| value_text(value).is_some())
                .cloned();
        }
        if self.admission_code.is_none() {
            self.admission_code = response
                .get("admission_code")
                .and_then(value_text)
                .and_then(|code| AdmissionCode::parse(&code));
        }
    }
}

/// The form for whichever step is active. Owns nothing but its schema and the last report;
/// values always come from the caller's record and go back through the observer.
#[derive(Debug, Clone)]
pub struct StepForm {
    schema: &'static StepSchema,
    today: NaiveDate,
    report: ValidationReport,
}

impl StepForm {
    pub fn new(kind: StepKind, today: NaiveDate) -> Self {
        Self {
            schema: kind.schema(),
            today,
            report: ValidationReport::default(),
        }
    }

    pub fn kind(&self) -> StepKind {
        self.schema.kind
    }

    pub fn schema(&self) -> &'static StepSchema {
        self.schema
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn slice(&self, record: &ApplicationRecord) -> ApplicationRecord {
        self.schema.slice_of(record)
    }

    /// Validate the incoming slice and report whether it already satisfies the step.
    pub fn mount(
        &mut self,
        record: &ApplicationRecord,
        observer: &mut impl StepObserver,
    ) -> &ValidationReport {
        let slice = self.slice(record);
        self.revalidate(&slice, observer)
    }

    /// Apply one field edit: normalize the input, run clear and copy rules, then hand the
    /// updated slice to the observer and revalidate.
    pub fn edit(
        &mut self,
        record: &ApplicationRecord,
        field: &str,
        raw: Value,
        observer: &mut impl StepObserver,
    ) -> Result<&ValidationReport, StepError> {
        let descriptor = self.descriptor(field)?;
        if descriptor.kind == FieldKind::Attachment && !raw.is_null() {
            return Err(StepError::AttachmentOnly {
                field: field.to_string(),
            });
        }

        let value = match raw {
            Value::Null => Value::Null,
            flag if descriptor.kind == FieldKind::Flag => Value::Bool(is_checked(&flag)),
            Value::String(text) => Value::String(descriptor.input.apply(&text)),
            other => other,
        };

        let mut slice = self.slice(record);
        let changed = slice.get(descriptor.name) != Some(&value);
        slice.set(descriptor.name, value);
        self.apply_rules(&mut slice, descriptor.name, changed);

        tracing::debug!(step = self.schema.kind.key(), field, "step field edited");
        observer.on_change(slice.clone());
        Ok(self.revalidate(&slice, observer))
    }

    /// Record `attachment`'s file name under its field. The caller keeps the bytes.
    pub fn attach(
        &mut self,
        record: &ApplicationRecord,
        attachment: &DocumentAttachment,
        observer: &mut impl StepObserver,
    ) -> Result<&ValidationReport, StepError> {
        let descriptor = self.descriptor(&attachment.field)?;
        if descriptor.kind != FieldKind::Attachment {
            return Err(AttachmentError::NotAnAttachment {
                field: attachment.field.clone(),
            }
            .into());
        }

        let mut slice = self.slice(record);
        slice.set(descriptor.name, Value::String(attachment.file_name.clone()));
        observer.on_change(slice.clone());
        Ok(self.revalidate(&slice, observer))
    }

    pub fn detach(
        &mut self,
        record: &ApplicationRecord,
        field: &str,
        observer: &mut impl StepObserver,
    ) -> Result<&ValidationReport, StepError> {
        let descriptor = self.descriptor(field)?;
        if descriptor.kind != FieldKind::Attachment {
            return Err(AttachmentError::NotAnAttachment {
                field: field.to_string(),
            }
            .into());
        }
        self.edit(record, field, Value::Null, observer)
    }

    /// Validate, then send the step's requests in order, stopping at the first failure.
    pub async fn save<B>(
        &mut self,
        record: &ApplicationRecord,
        attachments: &AttachmentSet,
        backend: &B,
        observer: &mut impl StepObserver,
    ) -> Result<SaveReceipt, StepError>
    where
        B: EnrollmentBackend + ?Sized,
    {
        let slice = self.slice(record);
        let mut report = validate(self.schema, &slice, self.today);
        if self.schema.persistence == Persistence::Multipart {
            for field in self.uploads_without_bytes(&slice, attachments) {
                report.insert(field, REUPLOAD_MESSAGE);
            }
        }
        self.report = report.clone();
        if !report.is_valid() {
            observer.on_validation(false);
            return Err(StepError::Invalid(report));
        }

        let mut receipt = SaveReceipt::default();
        for request in payload::requests_for(self.schema, &slice, record, attachments) {
            let endpoint = request.endpoint;
            match backend.send(request).await {
                Ok(response) => receipt.absorb(&response),
                Err(err) => {
                    tracing::warn!(step = self.schema.kind.key(), endpoint, error = %err, "step save failed");
                    observer.on_validation(false);
                    return Err(err.into());
                }
            }
        }

        tracing::info!(step = self.schema.kind.key(), "step saved");
        observer.on_validation(true);
        Ok(receipt)
    }

    /// Upload fields that name a file in the record but have no bytes in this session,
    /// as happens after resuming a saved application.
    fn uploads_without_bytes<'a>(
        &'a self,
        slice: &'a ApplicationRecord,
        attachments: &'a AttachmentSet,
    ) -> impl Iterator<Item = &'static str> + 'a {
        self.schema
            .fields
            .iter()
            .filter(|field| field.kind == FieldKind::Attachment)
            .filter(move |field| slice.is_provided(field.name) && attachments.get(field.name).is_none())
            .map(|field| field.name)
    }

    fn descriptor(&self, field: &str) -> Result<&'static FieldDescriptor, StepError> {
        self.schema
            .field(field)
            .ok_or_else(|| StepError::UnknownField {
                field: field.to_string(),
                step: self.schema.kind.key(),
            })
    }

    /// Clear rules fire only when `edited` took a new value; copy rules always run.
    fn apply_rules(&self, slice: &mut ApplicationRecord, edited: &str, changed: bool) {
        let triggered = self
            .schema
            .clear_rules
            .iter()
            .filter(|rule| changed && rule.trigger == edited);
        for rule in triggered {
            if rule.when.as_ref().map_or(true, |condition| condition.holds(slice)) {
                for cleared in rule.clears {
                    slice.set(*cleared, Value::Null);
                }
            }
        }

        for rule in &self.schema.copy_rules {
            if rule.when.holds(slice) {
                for (from, to) in rule.pairs {
                    let value = slice.get(from).cloned().unwrap_or(Value::Null);
                    slice.set(*to, value);
                }
            }
        }
    }

    fn revalidate(
        &mut self,
        slice: &ApplicationRecord,
        observer: &mut impl StepObserver,
    ) -> &ValidationReport {
        self.report = validate(self.schema, slice, self.today);
        observer.on_validation(self.report.is_valid());
        &self.report
    }
}

/// Only a literal `true` (or the string "true") ticks a checkbox.
fn is_checked(value: &Value) -> bool {
    match value {
        Value::Bool(checked) => *checked,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
