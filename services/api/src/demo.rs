use crate::infra::{
    guess_content_type, load_attachment, parse_attachment, parse_date, parse_step, read_record,
    AttachmentArg,
};
use admissions::config::AppConfig;
use admissions::error::AppError;
use admissions::session::SessionContext;
use admissions::telemetry;
use admissions::workflows::enrollment::schema::{FieldKind, Persistence, Requirement, DOCUMENTS};
use admissions::workflows::enrollment::{
    validate, AdmissionCode, ApplicationStatus, EnrollmentBackend, HttpBackend, InMemoryBackend,
    StepKind, WizardController, WizardError, WizardState, STEP_COUNT,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct StatusArgs {
    /// Admission code issued when the student step was saved
    #[arg(long)]
    pub(crate) code: String,
    /// Bearer token forwarded to the admissions backend
    #[arg(long)]
    pub(crate) token: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Step key (student, admission, basic, ...) or its position (1-10)
    #[arg(long, value_parser = parse_step)]
    pub(crate) step: StepKind,
    /// JSON object holding the field values to check
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Attach a local image to a document field, as FIELD=PATH. Repeatable.
    #[arg(long, value_parser = parse_attachment)]
    pub(crate) attach: Vec<AttachmentArg>,
    /// Date used for the minimum age check (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Name shown on the welcome screen
    #[arg(long, default_value = "Ayesha")]
    pub(crate) name: String,
    /// Leave after this many steps and pick the application back up by admission code
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..10))]
    pub(crate) pause_after: Option<u8>,
    /// Date used for the minimum age check (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_steps() -> Result<(), AppError> {
    println!("Enrollment wizard ({STEP_COUNT} steps)");
    for kind in StepKind::ALL {
        let schema = kind.schema();
        println!(
            "\n{}. {} [{}] persistence: {:?}",
            kind.position(),
            schema.title,
            kind.key(),
            schema.persistence
        );
        for field in &schema.fields {
            let requirement = match &field.requirement {
                Requirement::Always => "required",
                Requirement::Optional => "optional",
                Requirement::When(_) => "conditional",
            };
            let upload = if field.kind == FieldKind::Attachment {
                " (upload)"
            } else {
                ""
            };
            println!("   - {} ({}): {}{}", field.name, field.label, requirement, upload);
        }
    }
    Ok(())
}

pub(crate) async fn run_status(args: StatusArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let code = AdmissionCode::parse(&args.code).ok_or(WizardError::InvalidAdmissionCode)?;
    let backend = HttpBackend::new(&config.backend)?.with_bearer_token(args.token);
    let status = backend.admission_status(&code).await?;

    println!("Application {code} ({})", backend.base_url());
    println!("- status: {}", status_label(status.status));
    println!(
        "- last completed step: {} of {STEP_COUNT}",
        status.last_completed_step.min(STEP_COUNT)
    );
    if status.status == ApplicationStatus::Incomplete {
        let resume_at = (status.last_completed_step + 1).min(STEP_COUNT);
        if let Some(kind) = StepKind::from_position(resume_at) {
            println!("- resumes at: {}. {}", kind.position(), kind.title());
        }
    }
    println!("- saved fields: {}", status.form_data.len());
    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let ValidateArgs {
        step,
        file,
        attach,
        today,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let schema = step.schema();
    let mut record = read_record(&file)?;

    for arg in &attach {
        let is_upload = schema
            .field(&arg.field)
            .is_some_and(|field| field.kind == FieldKind::Attachment);
        if !is_upload {
            return Err(AppError::Input(format!(
                "{} is not an upload field of {}",
                arg.field,
                step.title()
            )));
        }
        let attachment = load_attachment(arg)?;
        println!(
            "Attached {} -> {} ({}, {} bytes)",
            attachment.field,
            attachment.file_name,
            attachment.content_type,
            attachment.bytes.len()
        );
        record.set(attachment.field, Value::String(attachment.file_name));
    }

    let report = validate(schema, &schema.slice_of(&record), today);
    if report.is_valid() {
        println!("{}. {}: all fields valid", step.position(), step.title());
        return Ok(());
    }

    println!("{}. {}: {} problem(s)", step.position(), step.title(), report.len());
    for (field, message) in report.errors() {
        println!("  - {field}: {message}");
    }
    Err(AppError::Input(format!(
        "{} failed validation",
        file.display()
    )))
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        name,
        pause_after,
        today,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let pause_after = pause_after.map(usize::from);

    let backend = InMemoryBackend::new();
    let mut wizard = WizardController::new(
        backend.clone(),
        SessionContext::new(Some(name.clone()), None),
    )
    .with_today(today);

    println!("Enrollment wizard demo (in-memory backend)");
    println!("Welcome, {name}!");
    wizard.start_new();

    while let WizardState::Step(kind) = wizard.state() {
        complete_step(&mut wizard, kind).await?;

        if pause_after == Some(kind.position()) {
            let code = wizard
                .admission_code()
                .cloned()
                .ok_or(WizardError::InvalidAdmissionCode)?;
            println!("\nApplicant leaves after step {} with code {code}", kind.position());

            wizard = WizardController::new(
                backend.clone(),
                SessionContext::new(Some(name.clone()), None),
            )
            .with_today(today);
            let resumed = wizard.resume(code.as_str()).await?;
            if let WizardState::Step(next) = resumed {
                println!(
                    "Resumed application {code} at {}. {}\n",
                    next.position(),
                    next.title()
                );
            }
        }
    }

    let checkpoints = backend.checkpoints();
    println!("\nApplication complete");
    if let Some(code) = wizard.admission_code() {
        println!("- admission code: {code}");
        if let Some(stored) = backend.application(code) {
            println!("- backend status: {}", status_label(stored.status));
        }
    }
    println!("- checkpoints recorded: {}", checkpoints.len());
    println!("- fields on record: {}", wizard.record().len());
    println!("- save endpoints called:");
    for endpoint in backend.endpoints_called() {
        println!("    {endpoint}");
    }
    Ok(())
}

async fn complete_step(
    wizard: &mut WizardController<InMemoryBackend>,
    kind: StepKind,
) -> Result<(), AppError> {
    wizard.edit_many(sample_edits(kind))?;
    for field in sample_uploads(kind) {
        let file_name = format!("{field}.jpg");
        let content_type = guess_content_type(Path::new(&file_name));
        wizard.attach(field, &file_name, &content_type, sample_image())?;
    }

    let receipt = wizard.save().await?;
    let state = wizard.next().await?;

    let saved = match receipt.admission_code {
        Some(code) => format!("saved, admission code {code} issued"),
        None if kind.schema().persistence == Persistence::None => "acknowledged".to_string(),
        None => "saved".to_string(),
    };
    let next = match state {
        WizardState::Step(next) => next.title(),
        WizardState::Completed => "done",
        WizardState::Welcome => "welcome",
    };
    println!(
        "[{}/{STEP_COUNT}] {}: {saved} -> {next}",
        kind.position(),
        kind.title()
    );
    Ok(())
}

fn status_label(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Incomplete => "incomplete",
        ApplicationStatus::Complete => "complete",
    }
}

fn sample_image() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46]
}

fn sample_uploads(kind: StepKind) -> Vec<&'static str> {
    match kind {
        StepKind::Student => vec!["profile_image"],
        StepKind::Documents => DOCUMENTS.iter().map(|(field, _, _)| *field).collect(),
        _ => Vec::new(),
    }
}

fn sample_edits(kind: StepKind) -> Vec<(String, Value)> {
    let pairs: Vec<(&str, Value)> = match kind {
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
            ("cnic", json!("4210112345671")),
            ("province", json!("Sindh")),
        ],
        StepKind::Residence => vec![
            ("present_address", json!("House 12, Street 4")),
            ("present_city", json!("Karachi")),
            ("present_area", json!("Gulshan-e-Iqbal")),
            ("present_postal_code", json!("75300")),
            ("same_as_present_address", json!(true)),
        ],
        StepKind::Guardian => vec![
            ("guardian_name", json!("Imran Khan")),
            ("guardian_relationship", json!("Father")),
            ("guardian_contact_no", json!("0300-1234567")),
            ("guardian_cnic", json!("4210198765431")),
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
    };
    pairs
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
    }

    #[tokio::test]
    async fn sample_applicant_completes_every_step() {
        let backend = InMemoryBackend::new();
        let mut wizard = WizardController::new(backend.clone(), SessionContext::default())
            .with_today(today());
        wizard.start_new();

        for kind in StepKind::ALL {
            complete_step(&mut wizard, kind)
                .await
                .unwrap_or_else(|err| panic!("{kind:?} failed: {err}"));
        }

        assert_eq!(wizard.state(), WizardState::Completed);
        assert_eq!(backend.checkpoints().len(), STEP_COUNT);
        assert_eq!(
            wizard.record().text("permanent_city").as_deref(),
            Some("Karachi")
        );
    }

    #[tokio::test]
    async fn demo_with_pause_resumes_and_finishes() {
        run_demo(DemoArgs {
            name: "Ayesha".to_string(),
            pause_after: Some(3),
            today: Some(today()),
        })
        .await
        .expect("demo completes");
    }

    #[test]
    fn validate_reports_missing_fields_as_input_error() {
        let path = std::env::temp_dir().join(format!(
            "admissions-guardian-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"guardian_name":"Imran Khan"}"#).expect("write fixture");

        let err = run_validate(ValidateArgs {
            step: StepKind::Guardian,
            file: path.clone(),
            attach: Vec::new(),
            today: Some(today()),
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn validate_rejects_uploads_on_plain_fields() {
        let path = std::env::temp_dir().join(format!(
            "admissions-basic-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{}").expect("write fixture");

        let err = run_validate(ValidateArgs {
            step: StepKind::Basic,
            file: path.clone(),
            attach: vec![AttachmentArg {
                field: "cnic".to_string(),
                path: PathBuf::from("cnic.png"),
            }],
            today: Some(today()),
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: cnic is not an upload field of Basic Info"
        );
        let _ = std::fs::remove_file(&path);
    }
}
