use crate::infra::AppState;
use admissions::workflows::enrollment::{enrollment_router, EnrollmentBackend, EnrollmentService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_enrollment_routes<B>(service: Arc<EnrollmentService<B>>) -> axum::Router
where
    B: EnrollmentBackend + Clone + 'static,
{
    enrollment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use admissions::workflows::enrollment::InMemoryBackend;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn build_app(ready: bool) -> (axum::Router, Arc<AtomicBool>) {
        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let service = Arc::new(EnrollmentService::new(InMemoryBackend::new()));
        let app = with_enrollment_routes(service).layer(Extension(state));
        (app, readiness)
    }

    async fn get(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        let payload = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, payload)
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        let (app, readiness) = build_app(false);
        let (status, payload) = get(&app, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["status"], json!("initializing"));

        readiness.store(true, Ordering::Release);
        let (status, payload) = get(&app, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], json!("ready"));
    }

    #[tokio::test]
    async fn enrollment_and_health_routes_share_the_app() {
        let (app, _) = build_app(true);
        let (status, payload) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], json!("ok"));

        let (status, payload) = get(&app, "/api/v1/enrollment/steps").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["steps"].as_array().map(Vec::len), Some(10));
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let (app, _) = build_app(true);
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
