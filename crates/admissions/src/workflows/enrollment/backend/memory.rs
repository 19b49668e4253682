use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    endpoints, AdmissionCode, AdmissionStatus, ApplicationStatus, BackendError, BackendRequest,
    Checkpoint, EnrollmentBackend,
};

#[derive(Debug, Default)]
struct MemoryState {
    requests: Vec<BackendRequest>,
    checkpoints: Vec<Checkpoint>,
    applications: HashMap<AdmissionCode, AdmissionStatus>,
    failing: BTreeSet<String>,
    issued: u64,
}

/// Backend that keeps everything in process. Clones share state.
///
/// Saving the student step issues a `student_id` and an admission code, and every checkpoint
/// updates the stored status so a later resume sees it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an application as if it had been saved earlier.
    pub fn insert_application(&self, code: AdmissionCode, status: AdmissionStatus) {
        self.state().applications.insert(code, status);
    }

    /// Make every request to `endpoint` fail with a 500 until [`Self::recover`] is called.
    pub fn fail_endpoint(&self, endpoint: impl Into<String>) {
        self.state().failing.insert(endpoint.into());
    }

    pub fn recover(&self, endpoint: &str) {
        self.state().failing.remove(endpoint);
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.state().requests.clone()
    }

    pub fn endpoints_called(&self) -> Vec<&'static str> {
        self.state()
            .requests
            .iter()
            .map(|request| request.endpoint)
            .collect()
    }

    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.state().checkpoints.clone()
    }

    pub fn application(&self, code: &AdmissionCode) -> Option<AdmissionStatus> {
        self.state().applications.get(code).cloned()
    }

    fn check_available(state: &MemoryState, endpoint: &str) -> Result<(), BackendError> {
        if state.failing.contains(endpoint) {
            return Err(BackendError::Status {
                status: 500,
                endpoint: endpoint.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EnrollmentBackend for InMemoryBackend {
    async fn send(&self, request: BackendRequest) -> Result<Value, BackendError> {
        let mut state = self.state();
        Self::check_available(&state, request.endpoint)?;

        let response = if request.endpoint == endpoints::STUDENTS {
            state.issued += 1;
            let issued = state.issued;
            let code = format!("ADM-{issued:05}");
            if let Some(code) = AdmissionCode::parse(&code) {
                state.applications.insert(
                    code,
                    AdmissionStatus {
                        status: ApplicationStatus::Incomplete,
                        form_data: Default::default(),
                        last_completed_step: 0,
                    },
                );
            }
            json!({ "student_id": issued, "admission_code": code })
        } else {
            json!({ "status": "saved" })
        };

        state.requests.push(request);
        Ok(response)
    }

    async fn admission_status(
        &self,
        code: &AdmissionCode,
    ) -> Result<AdmissionStatus, BackendError> {
        let endpoint = endpoints::admission_status(code.as_str());
        let state = self.state();
        Self::check_available(&state, &endpoint)?;
        state
            .applications
            .get(code)
            .cloned()
            .ok_or(BackendError::Status {
                status: 404,
                endpoint,
            })
    }

    async fn submit_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), BackendError> {
        let mut state = self.state();
        Self::check_available(&state, endpoints::SUBMIT_APPLICATION)?;

        state.applications.insert(
            checkpoint.admission_code.clone(),
            AdmissionStatus {
                status: checkpoint.status,
                form_data: checkpoint.form_data.clone(),
                last_completed_step: checkpoint.current_step,
            },
        );
        state.checkpoints.push(checkpoint.clone());
        Ok(())
    }
}
