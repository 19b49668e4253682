//! Multi-step admission enrollment: step schemas and validation, per-step persistence, and
//! the wizard that sequences steps with checkpoint and resume support.

pub mod attachments;
pub mod backend;
pub mod catalog;
pub mod format;
pub(crate) mod payload;
pub mod record;
pub mod router;
pub mod schema;
pub mod service;
pub mod step;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use attachments::{AttachmentError, AttachmentSummary, DocumentAttachment};
pub use backend::{
    AdmissionCode, AdmissionStatus, ApplicationStatus, BackendError, BackendRequest, Checkpoint,
    EnrollmentBackend, HttpBackend, InMemoryBackend,
};
pub use format::format_cnic;
pub use record::ApplicationRecord;
pub use router::enrollment_router;
pub use schema::{StepKind, StepSchema, STEP_COUNT};
pub use service::{EnrollmentService, SessionError, SessionId};
pub use step::{SaveReceipt, StepError, StepForm, StepObserver};
pub use validation::{validate, ValidationReport};
pub use wizard::{StepValidity, WizardController, WizardError, WizardState, WizardView};
