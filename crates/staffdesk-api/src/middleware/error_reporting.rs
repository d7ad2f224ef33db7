use crate::error::ReportedError;
use crate::middleware::RequestTenant;
use crate::state::ReportingState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use staffdesk_infra::get_request_id;
use staffdesk_worker::ErrorReport;

/// Forward server errors to the error report queue without delaying the response.
pub async fn error_reporting_middleware(
    State(reporting): State<ReportingState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(queue) = reporting.queue.clone() else {
        return next.run(request).await;
    };

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = get_request_id(&request);
    let tenant = request
        .extensions()
        .get::<RequestTenant>()
        .and_then(|t| t.tenant_key().map(str::to_string));

    let response = next.run(request).await;

    if let Some(reported) = response.extensions().get::<ReportedError>() {
        let report = ErrorReport::new(
            reported.status,
            reported.code,
            reported.message.clone(),
            method,
            path,
            reporting.environment.clone(),
        )
        .with_request_id(request_id)
        .with_tenant(tenant);
        queue.enqueue(report);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpAppError;
    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use staffdesk_core::AppError;
    use staffdesk_worker::{ErrorReportQueue, ErrorReportQueueConfig, ErrorReporter};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ErrorReport>>);

    #[async_trait]
    impl ErrorReporter for Recorder {
        async fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn app(recorder: Arc<Recorder>) -> Router {
        let queue = ErrorReportQueue::new(
            recorder,
            ErrorReportQueueConfig {
                max_attempts: 1,
                backoff: Duration::ZERO,
                ..ErrorReportQueueConfig::default()
            },
        );
        let reporting = ReportingState {
            queue: Some(queue),
            environment: "test".to_string(),
        };
        Router::new()
            .route(
                "/boom",
                get(|| async {
                    Err::<(), _>(HttpAppError(AppError::Internal("disk on fire".to_string())))
                }),
            )
            .route(
                "/missing",
                get(|| async {
                    Err::<(), _>(HttpAppError(AppError::NotFound("nothing".to_string())))
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                reporting,
                error_reporting_middleware,
            ))
    }

    async fn wait_for_reports(recorder: &Recorder, expected: usize) -> Vec<ErrorReport> {
        for _ in 0..50 {
            let reports = recorder.0.lock().unwrap().clone();
            if reports.len() >= expected {
                return reports;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        recorder.0.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_server_errors_are_enqueued() {
        let recorder = Arc::new(Recorder::default());
        let response = app(recorder.clone())
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let reports = wait_for_reports(&recorder, 1).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, 500);
        assert_eq!(reports[0].code, "INTERNAL_ERROR");
        assert_eq!(reports[0].path, "/boom");
        assert_eq!(reports[0].method, "GET");
    }

    #[tokio::test]
    async fn test_client_errors_are_not_reported() {
        let recorder = Arc::new(Recorder::default());
        let response = app(recorder.clone())
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(recorder.0.lock().unwrap().is_empty());
    }
}
