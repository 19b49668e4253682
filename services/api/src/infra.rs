use admissions::error::AppError;
use admissions::workflows::enrollment::{ApplicationRecord, DocumentAttachment, StepKind};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// A `field=path` pair naming a local image to attach to a document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttachmentArg {
    pub(crate) field: String,
    pub(crate) path: PathBuf,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts a step key (`guardian`) or its 1-based position (`5`).
pub(crate) fn parse_step(raw: &str) -> Result<StepKind, String> {
    let trimmed = raw.trim();
    if let Some(kind) = StepKind::from_key(trimmed) {
        return Ok(kind);
    }
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(StepKind::from_position)
        .ok_or_else(|| {
            let keys: Vec<&str> = StepKind::ALL.iter().map(|kind| kind.key()).collect();
            format!("unknown step '{raw}' (expected one of {} or 1-{})", keys.join(", "), keys.len())
        })
}

pub(crate) fn parse_attachment(raw: &str) -> Result<AttachmentArg, String> {
    match raw.split_once('=') {
        Some((field, path)) if !field.trim().is_empty() && !path.trim().is_empty() => {
            Ok(AttachmentArg {
                field: field.trim().to_string(),
                path: PathBuf::from(path.trim()),
            })
        }
        _ => Err(format!("expected FIELD=PATH, got '{raw}'")),
    }
}

pub(crate) fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub(crate) fn load_attachment(arg: &AttachmentArg) -> Result<DocumentAttachment, AppError> {
    let bytes = std::fs::read(&arg.path)?;
    let file_name = arg
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    DocumentAttachment::new(
        arg.field.clone(),
        file_name,
        guess_content_type(&arg.path),
        bytes,
    )
    .map_err(|err| AppError::Input(format!("{}: {}", arg.field, err)))
}

pub(crate) fn read_record(path: &Path) -> Result<ApplicationRecord, AppError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|err| AppError::Input(format!("{} is not a JSON object: {}", path.display(), err)))
}
