use super::common::*;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::session::SessionContext;
use crate::workflows::enrollment::backend::InMemoryBackend;
use crate::workflows::enrollment::service::{EnrollmentService, SessionError};
use crate::workflows::enrollment::{StepKind, WizardState};

fn service_with(
    idle_timeout: Duration,
    max_sessions: usize,
) -> Arc<EnrollmentService<InMemoryBackend>> {
    Arc::new(
        EnrollmentService::new(InMemoryBackend::new())
            .with_today(today())
            .with_limits(SessionConfig {
                idle_timeout,
                max_sessions,
            }),
    )
}

#[test]
fn idle_sessions_expire_after_the_timeout() {
    let service = service_with(Duration::ZERO, 10);
    let (first, _) = service.create(SessionContext::default()).expect("created");
    let (second, _) = service.create(SessionContext::default()).expect("created");

    assert_eq!(service.len(), 1);
    assert_eq!(
        service.view(&first).unwrap_err(),
        SessionError::NotFound(first.clone())
    );
    assert!(matches!(service.lease(&second), Err(SessionError::NotFound(_))));
    assert!(service.is_empty());
}

#[test]
fn leased_sessions_survive_the_sweep() {
    let service = service_with(Duration::from_millis(300), 10);
    let (id, _) = service.create(SessionContext::default()).expect("created");
    let mut lease = service.lease(&id).expect("lease");

    std::thread::sleep(Duration::from_millis(400));
    service.create(SessionContext::default()).expect("created");
    assert_eq!(service.len(), 2);

    lease.start_new();
    drop(lease);
    let view = service.view(&id).expect("restored with a fresh timestamp");
    assert_eq!(view.state, WizardState::Step(StepKind::Student));
}

#[test]
fn cap_rejects_new_sessions_until_one_is_removed() {
    let service = service_with(Duration::from_secs(600), 2);
    let (first, _) = service.create(SessionContext::default()).expect("created");
    service.create(SessionContext::default()).expect("created");

    assert_eq!(
        service.create(SessionContext::default()).unwrap_err(),
        SessionError::Capacity(2)
    );

    service.remove(&first).expect("removed");
    service.create(SessionContext::default()).expect("room again");
    assert_eq!(service.len(), 2);
}
