use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::session::SessionContext;

use super::backend::EnrollmentBackend;
use super::wizard::{WizardController, WizardView};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session {0} is busy with another request")]
    Busy(SessionId),
    #[error("too many open sessions (limit {0})")]
    Capacity(usize),
}

enum Slot<B> {
    Idle {
        wizard: Box<WizardController<B>>,
        last_used: Instant,
    },
    Busy,
}

impl<B> Slot<B> {
    fn idle(wizard: Box<WizardController<B>>) -> Self {
        Slot::Idle {
            wizard,
            last_used: Instant::now(),
        }
    }
}

/// Owns every live wizard. A controller is lent out for the length of one request.
pub struct EnrollmentService<B> {
    backend: B,
    sessions: Mutex<HashMap<SessionId, Slot<B>>>,
    next_id: AtomicU64,
    today: Option<NaiveDate>,
    limits: SessionConfig,
}

impl<B> EnrollmentService<B>
where
    B: EnrollmentBackend + Clone + 'static,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            today: None,
            limits: SessionConfig::default(),
        }
    }

    /// Idle timeout and session cap applied to the map.
    pub fn with_limits(mut self, limits: SessionConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Pin the date new sessions use for age checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Slot<B>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the map after dropping idle sessions past the timeout. Leased sessions are kept.
    fn swept_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Slot<B>>> {
        let mut sessions = self.sessions();
        let idle_timeout = self.limits.idle_timeout;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot {
            Slot::Idle { last_used, .. } => last_used.elapsed() < idle_timeout,
            Slot::Busy => true,
        });
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, remaining = sessions.len(), "expired idle enrollment sessions");
        }
        sessions
    }

    pub fn create(&self, context: SessionContext) -> Result<(SessionId, WizardView), SessionError> {
        let mut sessions = self.swept_sessions();
        if sessions.len() >= self.limits.max_sessions {
            tracing::warn!(limit = self.limits.max_sessions, "enrollment session limit reached");
            return Err(SessionError::Capacity(self.limits.max_sessions));
        }

        let id = SessionId(format!(
            "session-{:06}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ));
        let mut wizard = WizardController::new(self.backend.scoped(&context), context);
        if let Some(today) = self.today {
            wizard = wizard.with_today(today);
        }
        let view = wizard.view();
        sessions.insert(id.clone(), Slot::idle(Box::new(wizard)));
        tracing::info!(session = %id, "enrollment session created");
        Ok((id, view))
    }

    pub fn view(&self, id: &SessionId) -> Result<WizardView, SessionError> {
        match self.swept_sessions().get(id) {
            Some(Slot::Idle { wizard, .. }) => Ok(wizard.view()),
            Some(Slot::Busy) => Err(SessionError::Busy(id.clone())),
            None => Err(SessionError::NotFound(id.clone())),
        }
    }

    /// Reset the wizard and forget the session.
    pub fn remove(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions();
        match sessions.get_mut(id) {
            Some(Slot::Idle { wizard, .. }) => {
                wizard.reset();
                sessions.remove(id);
                tracing::info!(session = %id, "enrollment session cleared");
                Ok(())
            }
            Some(Slot::Busy) => Err(SessionError::Busy(id.clone())),
            None => Err(SessionError::NotFound(id.clone())),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the session's controller out of the map until the lease is dropped.
    pub fn lease(self: &Arc<Self>, id: &SessionId) -> Result<SessionLease<B>, SessionError> {
        let mut sessions = self.swept_sessions();
        let slot = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        match std::mem::replace(slot, Slot::Busy) {
            Slot::Idle { wizard, .. } => Ok(SessionLease {
                service: Arc::clone(self),
                id: id.clone(),
                wizard: Some(wizard),
            }),
            Slot::Busy => Err(SessionError::Busy(id.clone())),
        }
    }

    fn restore(&self, id: SessionId, wizard: Box<WizardController<B>>) {
        self.sessions().insert(id, Slot::idle(wizard));
    }
}

/// Exclusive access to one session's controller. Returned to the service on drop, so a
/// cancelled request never strands the session.
pub struct SessionLease<B>
where
    B: EnrollmentBackend + Clone + 'static,
{
    service: Arc<EnrollmentService<B>>,
    id: SessionId,
    wizard: Option<Box<WizardController<B>>>,
}

impl<B> SessionLease<B>
where
    B: EnrollmentBackend + Clone + 'static,
{
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

impl<B> Deref for SessionLease<B>
where
    B: EnrollmentBackend + Clone + 'static,
{
    type Target = WizardController<B>;

    fn deref(&self) -> &Self::Target {
        match &self.wizard {
            Some(wizard) => wizard,
            None => unreachable!("lease holds its controller until dropped"),
        }
    }
}

impl<B> DerefMut for SessionLease<B>
where
    B: EnrollmentBackend + Clone + 'static,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.wizard {
            Some(wizard) => wizard,
            None => unreachable!("lease holds its controller until dropped"),
        }
    }
}

impl<B> Drop for SessionLease<B>
where
    B: EnrollmentBackend + Clone + 'static,
{
    fn drop(&mut self) {
        if let Some(wizard) = self.wizard.take() {
            self.service.restore(self.id.clone(), wizard);
        }
    }
}
