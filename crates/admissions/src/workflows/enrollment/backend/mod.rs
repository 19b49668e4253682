//! Persistence seam between the wizard and the admissions backend.

mod http;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionContext;

use super::record::ApplicationRecord;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

pub mod endpoints {
    pub const STUDENTS: &str = "/students";
    pub const ADMISSIONS: &str = "/admissions";
    pub const BASIC_INFO: &str = "/basic-info";
    pub const RESIDENCE_INFO: &str = "/residence-info";
    pub const GUARDIAN_INFO: &str = "/guardian-info";
    pub const MATRICULATION_INFO: &str = "/matriculation-info";
    pub const INTERMEDIATE_INFO: &str = "/intermediate-info";
    pub const DOCUMENTS_UPLOAD: &str = "/required-documents/upload";
    pub const SUBMIT_APPLICATION: &str = "/admissions/submit_application";

    /// Readable status path for logs. HTTP requests encode the code as a path segment.
    pub fn admission_status(code: &str) -> String {
        format!("/admissions/{code}/status")
    }
}

/// Trimmed, non-empty code identifying a saved application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdmissionCode(String);

impl AdmissionCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdmissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Incomplete,
    Complete,
}

/// Result of looking up an admission code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    pub status: ApplicationStatus,
    #[serde(default, alias = "form_data")]
    pub form_data: ApplicationRecord,
    #[serde(default, alias = "last_completed_step")]
    pub last_completed_step: usize,
}

/// Progress snapshot sent when the applicant advances past a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub admission_code: AdmissionCode,
    pub form_data: ApplicationRecord,
    pub current_step: usize,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

/// One POST issued while saving a step.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub endpoint: &'static str,
    pub body: RequestBody,
}

impl BackendRequest {
    pub fn json(endpoint: &'static str, body: Value) -> Self {
        Self {
            endpoint,
            body: RequestBody::Json(body),
        }
    }

    pub fn multipart(
        endpoint: &'static str,
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    ) -> Self {
        Self {
            endpoint,
            body: RequestBody::Multipart { fields, files },
        }
    }
}

/// Only success and failure are distinguished by callers; the variants exist for logs.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("backend returned {status} for {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("backend response from {endpoint} could not be decoded: {message}")]
    Decode { endpoint: String, message: String },
}

#[async_trait]
pub trait EnrollmentBackend: Send + Sync {
    /// Issue a step-save request, returning the decoded response body (`Null` when empty).
    async fn send(&self, request: BackendRequest) -> Result<Value, BackendError>;

    async fn admission_status(&self, code: &AdmissionCode)
        -> Result<AdmissionStatus, BackendError>;

    async fn submit_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), BackendError>;

    /// Copy of this backend acting on behalf of `session`.
    fn scoped(&self, _session: &SessionContext) -> Self
    where
        Self: Sized + Clone,
    {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn admission_code_rejects_blank_input() {
        assert_eq!(AdmissionCode::parse("   "), None);
        assert_eq!(
            AdmissionCode::parse("  ADM-2025-001 ").map(|code| code.to_string()),
            Some("ADM-2025-001".to_string())
        );
    }

    #[test]
    fn status_lookup_decodes_camel_case_payload() {
        let status: AdmissionStatus = serde_json::from_value(json!({
            "status": "incomplete",
            "formData": {"first_name": "Ayesha"},
            "lastCompletedStep": 3
        }))
        .expect("decodes");
        assert_eq!(status.status, ApplicationStatus::Incomplete);
        assert_eq!(status.last_completed_step, 3);
        assert_eq!(status.form_data.text("first_name").as_deref(), Some("Ayesha"));
    }

    #[test]
    fn checkpoint_serializes_wire_names() {
        let checkpoint = Checkpoint {
            admission_code: AdmissionCode::parse("ADM-1").expect("code"),
            form_data: ApplicationRecord::new(),
            current_step: 10,
            status: ApplicationStatus::Complete,
        };
        assert_eq!(
            serde_json::to_value(&checkpoint).expect("serializes"),
            json!({
                "admissionCode": "ADM-1",
                "formData": {},
                "currentStep": 10,
                "status": "complete"
            })
        );
    }
}
