use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use crate::config::BackendConfig;
use crate::session::SessionContext;

use super::{
    endpoints, AdmissionCode, AdmissionStatus, BackendError, BackendRequest, Checkpoint,
    EnrollmentBackend, RequestBody,
};

/// `reqwest` client for the admissions REST backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| BackendError::Transport {
                endpoint: config.base_url.clone(),
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Status lookup URL with the code pushed as one percent-encoded path segment.
    fn status_url(&self, code: &AdmissionCode) -> Result<Url, BackendError> {
        let invalid = |message: String| BackendError::Transport {
            endpoint: self.base_url.clone(),
            message,
        };
        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["admissions", code.as_str(), "status"]);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, endpoint: &str, request: RequestBuilder) -> Result<Vec<u8>, BackendError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| BackendError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint, status = status.as_u16(), "admissions backend rejected request");
            return Err(BackendError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|err| BackendError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })?;
        Ok(body.to_vec())
    }
}

fn multipart_form(
    endpoint: &str,
    fields: Vec<(String, String)>,
    files: Vec<super::FilePart>,
) -> Result<Form, BackendError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    for file in files {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|err| BackendError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            })?;
        form = form.part(file.field, part);
    }
    Ok(form)
}

#[async_trait]
impl EnrollmentBackend for HttpBackend {
    async fn send(&self, request: BackendRequest) -> Result<Value, BackendError> {
        let endpoint = request.endpoint;
        let builder = self.client.post(self.url(endpoint));
        let builder = match request.body {
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart { fields, files } => {
                builder.multipart(multipart_form(endpoint, fields, files)?)
            }
        };

        let body = self.execute(endpoint, builder).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        match serde_json::from_slice(&body) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::debug!(endpoint, error = %err, "ignoring non-JSON save response");
                Ok(Value::Null)
            }
        }
    }

    async fn admission_status(
        &self,
        code: &AdmissionCode,
    ) -> Result<AdmissionStatus, BackendError> {
        let url = self.status_url(code)?;
        let endpoint = url.path().to_string();
        let builder = self.client.get(url);
        let body = self.execute(&endpoint, builder).await?;

        serde_json::from_slice(&body).map_err(|err| BackendError::Decode {
            endpoint,
            message: err.to_string(),
        })
    }

    async fn submit_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), BackendError> {
        let endpoint = endpoints::SUBMIT_APPLICATION;
        let builder = self.client.post(self.url(endpoint)).json(checkpoint);
        self.execute(endpoint, builder).await.map(|_| ())
    }

    fn scoped(&self, session: &SessionContext) -> Self {
        self.clone()
            .with_bearer_token(session.auth_token().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn joins_endpoints_onto_base_url() {
        let backend = HttpBackend::new(&BackendConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client builds");
        assert_eq!(backend.base_url(), "http://localhost:8000/api");
        assert_eq!(
            backend.url(endpoints::BASIC_INFO),
            "http://localhost:8000/api/basic-info"
        );
        let code = AdmissionCode::parse("ADM-7").expect("code");
        assert_eq!(
            backend.status_url(&code).expect("url builds").as_str(),
            "http://localhost:8000/api/admissions/ADM-7/status"
        );
    }

    #[test]
    fn status_url_keeps_reserved_characters_inside_the_code_segment() {
        let backend = HttpBackend::new(&BackendConfig::default()).expect("client builds");
        let code = AdmissionCode::parse("ADM/1?x=1#f").expect("code");
        let url = backend.status_url(&code).expect("url builds");

        assert_eq!(url.path(), "/api/admissions/ADM%2F1%3Fx=1%23f/status");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn scoped_copy_carries_session_token() {
        let backend = HttpBackend::new(&BackendConfig::default()).expect("client builds");
        let session = SessionContext::new(Some("Ayesha".to_string()), Some("token-1".to_string()));
        let scoped = backend.scoped(&session);
        assert_eq!(scoped.bearer_token.as_deref(), Some("token-1"));
        assert_eq!(backend.bearer_token, None);
    }
}
