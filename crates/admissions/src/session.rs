use serde::Serialize;

/// Per-applicant values that outlive a single request: the greeting name shown on the
/// welcome screen and the bearer token forwarded to the admissions backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    welcome_name: Option<String>,
    #[serde(skip)]
    auth_token: Option<String>,
}

impl SessionContext {
    pub fn new(welcome_name: Option<String>, auth_token: Option<String>) -> Self {
        Self {
            welcome_name: non_blank(welcome_name),
            auth_token: non_blank(auth_token),
        }
    }

    pub fn welcome_name(&self) -> Option<&str> {
        self.welcome_name.as_deref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Forget everything, as on logout.
    pub fn clear(&mut self) {
        self.welcome_name = None;
        self.auth_token = None;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_dropped_and_clear_forgets_token() {
        let mut session = SessionContext::new(Some("  ".to_string()), Some(" abc ".to_string()));
        assert_eq!(session.welcome_name(), None);
        assert_eq!(session.auth_token(), Some("abc"));

        session.clear();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn token_is_never_serialized() {
        let session = SessionContext::new(Some("Ayesha".to_string()), Some("secret".to_string()));
        let json = serde_json::to_value(&session).expect("serializes");
        assert_eq!(json, serde_json::json!({ "welcome_name": "Ayesha" }));
    }
}
