use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::session::SessionContext;
use crate::workflows::enrollment::backend::InMemoryBackend;
use crate::workflows::enrollment::record::ApplicationRecord;
use crate::workflows::enrollment::schema::{StepKind, DOCUMENTS};
use crate::workflows::enrollment::step::StepObserver;
use crate::workflows::enrollment::wizard::WizardController;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

pub(super) fn jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]
}

pub(super) fn record(pairs: &[(&str, Value)]) -> ApplicationRecord {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}

/// Field edits that satisfy `kind`, in an order that survives its clear rules.
pub(super) fn valid_edits(kind: StepKind) -> Vec<(&'static str, Value)> {
    match kind {
        StepKind::Student => vec![
            ("first_name", json!("Ayesha")),
            ("last_name", json!("Khan")),
            ("email", json!("ayesha.khan@example.com")),
            ("phone_number", json!("0300 1234567")),
        ],
        StepKind::Admission => vec![
            ("qualification", json!("intermediate")),
            ("admission_type", json!("regular")),
            ("program", json!("bs")),
            ("major", json!("cs")),
            ("campus", json!("dha")),
            ("shift", json!("morning")),
        ],
        StepKind::Basic => vec![
            ("father_name", json!("Imran Khan")),
            ("gender", json!("Female")),
            ("date_of_birth", json!("2005-03-10")),
            ("nationality", json!("Pakistani")),
            ("religion", json!("Islam")),
            ("cnic", json!("42101-1234567-1")),
            ("province", json!("Sindh")),
        ],
        StepKind::Residence => vec![
            ("present_address", json!("House 12, Street 4")),
            ("present_city", json!("Karachi")),
            ("present_area", json!("Gulshan-e-Iqbal")),
            ("present_postal_code", json!("75300")),
            ("same_as_present_address", json!(true)),
            ("permanent_address", json!("House 12, Street 4")),
            ("permanent_city", json!("Karachi")),
            ("permanent_area", json!("Gulshan-e-Iqbal")),
            ("permanent_postal_code", json!("75300")),
        ],
        StepKind::Guardian => vec![
            ("guardian_name", json!("Imran Khan")),
            ("guardian_relationship", json!("Father")),
            ("guardian_contact_no", json!("03001234567")),
            ("guardian_cnic", json!("42101-9876543-1")),
        ],
        StepKind::Academic => vec![
            ("matric_system", json!("Matriculation")),
            ("matric_board", json!("Karachi Board")),
            ("matric_year", json!("2020")),
            ("matric_group", json!("Science (Pre-Engineering)")),
            ("matric_institute", json!("City School")),
            ("matric_roll_number", json!("KB-1001")),
            ("matric_obtained_marks", json!("950")),
            ("inter_system", json!("Intermediate")),
            ("inter_board", json!("Karachi Board")),
            ("inter_year", json!("2022")),
            ("inter_group", json!("Science (Pre-Engineering)")),
            ("inter_institute", json!("Adamjee College")),
            ("inter_result_status", json!("Passed")),
            ("inter_roll_number", json!("KB-2002")),
            ("inter_obtained_marks", json!("880")),
        ],
        StepKind::Documents => Vec::new(),
        StepKind::Agreement => vec![("agreement_accepted", json!(true))],
        StepKind::Processing => vec![("processing_acknowledged", json!(true))],
        StepKind::Test => vec![("test_acknowledged", json!(true))],
    }
}

/// Attachment fields `kind` needs before it validates.
pub(super) fn required_uploads(kind: StepKind) -> Vec<&'static str> {
    match kind {
        StepKind::Student => vec!["profile_image"],
        StepKind::Documents => DOCUMENTS
            .iter()
            .filter(|(_, _, required)| *required)
            .map(|(field, _, _)| *field)
            .collect(),
        _ => Vec::new(),
    }
}

pub(super) fn valid_slice(kind: StepKind) -> ApplicationRecord {
    let mut slice = record(&valid_edits(kind));
    for field in required_uploads(kind) {
        slice.set(field, json!(format!("{field}.jpg")));
    }
    slice
}

pub(super) fn wizard() -> WizardController<InMemoryBackend> {
    wizard_with(InMemoryBackend::new())
}

pub(super) fn wizard_with(backend: InMemoryBackend) -> WizardController<InMemoryBackend> {
    WizardController::new(backend, SessionContext::new(Some("Ayesha".to_string()), None))
        .with_today(today())
}

/// Fill and save the active step so it can be advanced past.
pub(super) async fn complete_active_step(wizard: &mut WizardController<InMemoryBackend>, kind: StepKind) {
    for (field, value) in valid_edits(kind) {
        wizard.edit(field, value).expect("edit accepted");
    }
    for field in required_uploads(kind) {
        wizard
            .attach(field, &format!("{field}.jpg"), "image/jpeg", jpeg())
            .expect("attachment accepted");
    }
    wizard.save().await.expect("step saves");
}

#[derive(Debug, Default)]
pub(super) struct RecordingObserver {
    pub(super) changes: Vec<ApplicationRecord>,
    pub(super) validations: Vec<bool>,
}

impl StepObserver for RecordingObserver {
    fn on_change(&mut self, slice: ApplicationRecord) {
        self.changes.push(slice);
    }

    fn on_validation(&mut self, valid: bool) {
        self.validations.push(valid);
    }
}

impl RecordingObserver {
    pub(super) fn last_change(&self) -> &ApplicationRecord {
        self.changes.last().expect("at least one change")
    }

    pub(super) fn last_validation(&self) -> bool {
        *self.validations.last().expect("at least one validation")
    }
}
