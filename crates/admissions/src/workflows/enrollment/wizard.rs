//! Step sequencing, aggregate record ownership, and checkpoint/resume.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;

use crate::session::SessionContext;

use super::attachments::{AttachmentError, AttachmentSet, AttachmentSummary, DocumentAttachment};
use super::backend::{
    AdmissionCode, ApplicationStatus, BackendError, Checkpoint, EnrollmentBackend,
};
use super::payload::STUDENT_ID_FIELD;
use super::record::ApplicationRecord;
use super::schema::{FieldDescriptor, StepKind, STEP_COUNT};
use super::step::{SaveReceipt, StepError, StepForm, StepObserver};
use super::validation::ValidationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum WizardState {
    Welcome,
    Step(StepKind),
    Completed,
}

/// Which steps currently satisfy their validation, by one-based position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepValidity {
    steps: BTreeMap<usize, bool>,
}

impl StepValidity {
    pub fn is_valid(&self, kind: StepKind) -> bool {
        self.steps.get(&kind.position()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, kind: StepKind, valid: bool) {
        self.steps.insert(kind.position(), valid);
    }

    /// Mark every step up to and including `last` as valid.
    pub fn mark_through(&mut self, last: usize) {
        for position in 1..=last.min(STEP_COUNT) {
            self.steps.insert(position, true);
        }
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("no step is active")]
    NotStarted,
    #[error("step {} is not complete", .step.position())]
    StepIncomplete { step: StepKind },
    #[error("admission code is empty")]
    InvalidAdmissionCode,
    #[error("application {code} is already complete")]
    AlreadyComplete { code: AdmissionCode },
    #[error("admission code lookup failed")]
    UnknownAdmissionCode(#[source] BackendError),
    #[error("checkpoint failed")]
    CheckpointFailed(#[source] BackendError),
    #[error("step save failed")]
    SaveFailed(#[source] BackendError),
    #[error("step has invalid fields")]
    Validation(ValidationReport),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error("{field} is not a field of the {step} step")]
    UnknownField { field: String, step: &'static str },
}

impl WizardError {
    /// Message shown inline to the applicant.
    pub fn user_message(&self) -> String {
        match self {
            WizardError::NotStarted => {
                "Please start a new application or resume an existing one.".to_string()
            }
            WizardError::StepIncomplete { .. } => {
                "Please complete all required fields before continuing.".to_string()
            }
            WizardError::InvalidAdmissionCode => "Please enter your admission code.".to_string(),
            WizardError::AlreadyComplete { .. } => {
                "This application is already complete. Please start a new application if needed."
                    .to_string()
            }
            WizardError::UnknownAdmissionCode(_) => {
                "Invalid admission code or no application found with this code.".to_string()
            }
            WizardError::CheckpointFailed(_) => {
                "Failed to save progress. Please try again.".to_string()
            }
            WizardError::SaveFailed(_) => {
                "Failed to save information. Please try again.".to_string()
            }
            WizardError::Validation(report) => report
                .first_message()
                .unwrap_or("Please correct the highlighted fields.")
                .to_string(),
            WizardError::Attachment(err) => err.to_string(),
            WizardError::UnknownField { field, .. } => format!("{field} is not part of this step."),
        }
    }
}

impl From<StepError> for WizardError {
    fn from(value: StepError) -> Self {
        match value {
            StepError::UnknownField { field, step } => WizardError::UnknownField { field, step },
            StepError::AttachmentOnly { field } => {
                WizardError::Attachment(AttachmentError::NotAnAttachment { field })
            }
            StepError::Attachment(err) => WizardError::Attachment(err),
            StepError::Invalid(report) => WizardError::Validation(report),
            StepError::Backend(err) => WizardError::SaveFailed(err),
        }
    }
}

/// Record and validity, kept apart from the form so both can be borrowed at once.
#[derive(Debug, Default)]
struct Progress {
    record: ApplicationRecord,
    validity: StepValidity,
    active: Option<StepKind>,
}

impl StepObserver for Progress {
    fn on_change(&mut self, slice: ApplicationRecord) {
        self.record.merge(slice);
    }

    fn on_validation(&mut self, valid: bool) {
        if let Some(kind) = self.active {
            self.validity.set(kind, valid);
        }
    }
}

/// Drives one applicant through the steps.
pub struct WizardController<B> {
    backend: B,
    context: SessionContext,
    state: WizardState,
    form: Option<StepForm>,
    progress: Progress,
    attachments: AttachmentSet,
    admission_code: Option<AdmissionCode>,
    error: Option<String>,
    today: Option<NaiveDate>,
}

impl<B> WizardController<B>
where
    B: EnrollmentBackend,
{
    pub fn new(backend: B, context: SessionContext) -> Self {
        Self {
            backend,
            context,
            state: WizardState::Welcome,
            form: None,
            progress: Progress::default(),
            attachments: AttachmentSet::default(),
            admission_code: None,
            error: None,
            today: None,
        }
    }

    /// Pin the date used for age checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn record(&self) -> &ApplicationRecord {
        &self.progress.record
    }

    pub fn validity(&self) -> &StepValidity {
        &self.progress.validity
    }

    pub fn admission_code(&self) -> Option<&AdmissionCode> {
        self.admission_code.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn active_step(&self) -> Result<StepKind, WizardError> {
        match self.state {
            WizardState::Step(kind) => Ok(kind),
            WizardState::Welcome | WizardState::Completed => Err(WizardError::NotStarted),
        }
    }

    fn enter(&mut self, kind: StepKind) {
        self.state = WizardState::Step(kind);
        self.progress.active = Some(kind);
        let mut form = StepForm::new(kind, self.today());
        let record = self.progress.record.clone();
        form.mount(&record, &mut self.progress);
        self.form = Some(form);
    }

    fn leave_steps(&mut self, state: WizardState) {
        self.state = state;
        self.progress.active = None;
        self.form = None;
    }

    fn discard_application(&mut self) {
        self.progress = Progress::default();
        self.attachments.clear();
        self.admission_code = None;
        self.error = None;
    }

    fn settle<T>(&mut self, outcome: Result<T, WizardError>) -> Result<T, WizardError> {
        match &outcome {
            Ok(_) => self.error = None,
            Err(err) => self.error = Some(err.user_message()),
        }
        outcome
    }

    /// Begin a fresh application at step one.
    pub fn start_new(&mut self) {
        self.discard_application();
        self.enter(StepKind::Student);
        tracing::info!("started new application");
    }

    /// Reopen a saved application by admission code.
    pub async fn resume(&mut self, raw_code: &str) -> Result<WizardState, WizardError> {
        let outcome = self.try_resume(raw_code).await;
        self.settle(outcome)
    }

    async fn try_resume(&mut self, raw_code: &str) -> Result<WizardState, WizardError> {
        let code = AdmissionCode::parse(raw_code).ok_or(WizardError::InvalidAdmissionCode)?;
        let status = self
            .backend
            .admission_status(&code)
            .await
            .map_err(WizardError::UnknownAdmissionCode)?;

        if status.status == ApplicationStatus::Complete {
            tracing::info!(%code, "resume refused for completed application");
            return Err(WizardError::AlreadyComplete { code });
        }

        let last_completed = status.last_completed_step.min(STEP_COUNT);
        self.discard_application();
        self.leave_steps(WizardState::Welcome);
        self.progress.record = status.form_data;
        self.progress.validity.mark_through(last_completed);
        self.admission_code = Some(code);

        let position = (last_completed + 1).min(STEP_COUNT);
        let kind = StepKind::from_position(position).unwrap_or(StepKind::Student);
        self.enter(kind);
        tracing::info!(step = kind.position(), "resumed application");
        Ok(self.state)
    }

    /// Apply a single field edit to the active step.
    pub fn edit(&mut self, field: &str, value: Value) -> Result<ValidationReport, WizardError> {
        let outcome = self.try_edit(field, value);
        self.settle(outcome)
    }

    fn try_edit(&mut self, field: &str, value: Value) -> Result<ValidationReport, WizardError> {
        self.active_step()?;
        let form = self.form.as_mut().ok_or(WizardError::NotStarted)?;
        let report = form.edit(&self.progress.record.clone(), field, value, &mut self.progress)?;
        Ok(report.clone())
    }

    /// Apply several edits in order; stops at the first rejected field.
    pub fn edit_many<I>(&mut self, edits: I) -> Result<ValidationReport, WizardError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut report = self.current_report();
        for (field, value) in edits {
            report = self.edit(&field, value)?;
        }
        Ok(report)
    }

    pub fn attach(
        &mut self,
        field: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<AttachmentSummary, WizardError> {
        let outcome = self.try_attach(field, file_name, content_type, bytes);
        self.settle(outcome)
    }

    fn try_attach(
        &mut self,
        field: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<AttachmentSummary, WizardError> {
        self.active_step()?;
        let attachment = DocumentAttachment::new(field, file_name, content_type, bytes)?;
        let form = self.form.as_mut().ok_or(WizardError::NotStarted)?;
        form.attach(&self.progress.record.clone(), &attachment, &mut self.progress)?;

        let summary = attachment.summary();
        self.attachments.insert(attachment);
        Ok(summary)
    }

    pub fn detach(&mut self, field: &str) -> Result<ValidationReport, WizardError> {
        let outcome = self.try_detach(field);
        self.settle(outcome)
    }

    fn try_detach(&mut self, field: &str) -> Result<ValidationReport, WizardError> {
        self.active_step()?;
        let form = self.form.as_mut().ok_or(WizardError::NotStarted)?;
        let report = form
            .detach(&self.progress.record.clone(), field, &mut self.progress)?
            .clone();
        self.attachments.remove(field);
        Ok(report)
    }

    /// Persist the active step and fold any returned identifiers into the application.
    pub async fn save(&mut self) -> Result<SaveReceipt, WizardError> {
        let outcome = self.try_save().await;
        self.settle(outcome)
    }

    async fn try_save(&mut self) -> Result<SaveReceipt, WizardError> {
        self.active_step()?;
        let form = self.form.as_mut().ok_or(WizardError::NotStarted)?;
        let record = self.progress.record.clone();
        let receipt = form
            .save(&record, &self.attachments, &self.backend, &mut self.progress)
            .await?;

        if let Some(student_id) = &receipt.student_id {
            self.progress
                .record
                .set(STUDENT_ID_FIELD, student_id.clone());
        }
        if self.admission_code.is_none() {
            if let Some(code) = &receipt.admission_code {
                tracing::info!(%code, "admission code issued");
                self.admission_code = Some(code.clone());
            }
        }
        Ok(receipt)
    }

    /// Advance past the active step, checkpointing first when an admission code exists.
    pub async fn next(&mut self) -> Result<WizardState, WizardError> {
        let outcome = self.try_next().await;
        self.settle(outcome)
    }

    async fn try_next(&mut self) -> Result<WizardState, WizardError> {
        let kind = self.active_step()?;
        if !self.progress.validity.is_valid(kind) {
            return Err(WizardError::StepIncomplete { step: kind });
        }

        if let Some(code) = &self.admission_code {
            let checkpoint = Checkpoint {
                admission_code: code.clone(),
                form_data: self.progress.record.clone(),
                current_step: kind.position(),
                status: if kind.is_last() {
                    ApplicationStatus::Complete
                } else {
                    ApplicationStatus::Incomplete
                },
            };
            self.backend
                .submit_checkpoint(&checkpoint)
                .await
                .map_err(WizardError::CheckpointFailed)?;
            tracing::debug!(step = kind.position(), "checkpoint saved");
        }

        match StepKind::from_position(kind.position() + 1) {
            Some(next) => self.enter(next),
            None => {
                self.leave_steps(WizardState::Completed);
                tracing::info!("application completed");
            }
        }
        Ok(self.state)
    }

    /// Step back one screen. Never fails and never touches the backend.
    pub fn previous(&mut self) -> WizardState {
        match self.state {
            WizardState::Welcome => {}
            WizardState::Step(kind) => match StepKind::from_position(kind.position() - 1) {
                Some(prior) => self.enter(prior),
                None => self.leave_steps(WizardState::Welcome),
            },
            WizardState::Completed => {
                if let Some(last) = StepKind::from_position(STEP_COUNT) {
                    self.enter(last);
                }
            }
        }
        self.error = None;
        self.state
    }

    /// Drop the application and session values, returning to the welcome screen.
    pub fn reset(&mut self) {
        self.discard_application();
        self.leave_steps(WizardState::Welcome);
        self.context.clear();
    }

    fn current_report(&self) -> ValidationReport {
        self.form
            .as_ref()
            .map(|form| form.report().clone())
            .unwrap_or_default()
    }

    pub fn view(&self) -> WizardView {
        let step = self.form.as_ref().map(|form| {
            let kind = form.kind();
            StepView {
                position: kind.position(),
                key: kind.key(),
                title: kind.title(),
                fields: &form.schema().fields,
                values: form.slice(&self.progress.record),
                errors: form.report().errors().clone(),
                valid: self.progress.validity.is_valid(kind),
            }
        });

        WizardView {
            state: self.state,
            step_count: STEP_COUNT,
            step,
            validity: self.progress.validity.clone(),
            admission_code: self.admission_code.clone(),
            error: self.error.clone(),
            welcome_name: self.context.welcome_name().map(str::to_string),
            record: self.progress.record.clone(),
            attachments: self.attachments.summaries(),
        }
    }
}

/// Serializable snapshot of a controller for the service API.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub state: WizardState,
    pub step_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepView>,
    pub validity: StepValidity,
    pub admission_code: Option<AdmissionCode>,
    pub error: Option<String>,
    pub welcome_name: Option<String>,
    pub record: ApplicationRecord,
    pub attachments: Vec<AttachmentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub position: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub values: ApplicationRecord,
    pub errors: BTreeMap<String, String>,
    pub valid: bool,
}
