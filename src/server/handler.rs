// src/server/handler.rs
use crate::health::{HealthAggregator, OverallStatus};
use crate::metrics::MetricsRegistry;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::{error, Instrument};

/// Routes `GET {health_path}` and `GET {metrics_path}`.
#[derive(Clone)]
pub struct RequestHandler {
    health: HealthAggregator,
    metrics: Option<Arc<MetricsRegistry>>,
    health_path: Arc<str>,
    metrics_path: Arc<str>,
}

impl RequestHandler {
    pub fn new(health: HealthAggregator) -> Self {
        Self {
            health,
            metrics: None,
            health_path: Arc::from("/health"),
            metrics_path: Arc::from("/metrics"),
        }
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        self.health_path = Arc::from(path);
        self
    }

    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>, path: &str) -> Self {
        self.metrics = Some(registry);
        self.metrics_path = Arc::from(path);
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let path = req.uri().path().to_string();

        if path == *self.health_path {
            if req.method() != Method::GET {
                return text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            }
            let force_refresh = wants_refresh(req.uri().query());
            return self.health(force_refresh).await;
        }

        if let Some(registry) = self.metrics.as_ref().filter(|_| path == *self.metrics_path) {
            if req.method() != Method::GET {
                return text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            }
            return match registry.gather() {
                Ok(body) => with_content_type(
                    Response::new(Body::from(body)),
                    "text/plain; version=0.0.4",
                ),
                Err(e) => {
                    error!(error = %e, "failed to encode metrics");
                    text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                }
            };
        }

        text(StatusCode::NOT_FOUND, "Not Found")
    }

    async fn health(&self, force_refresh: bool) -> Response<Body> {
        let snapshot = self.health.get_status(force_refresh).await;

        let status = match snapshot.overall_status {
            OverallStatus::Ok => StatusCode::OK,
            OverallStatus::Degraded | OverallStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
        };

        match serde_json::to_vec(&*snapshot) {
            Ok(body) => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                with_content_type(response, "application/json")
            }
            Err(e) => {
                error!(error = %e, "failed to serialize health snapshot");
                text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

/// `?refresh=true`, `?refresh=1` or `?force=true`.
fn wants_refresh(query: Option<&str>) -> bool {
    let Some(query) = query else {
        return false;
    };
    url::form_urlencoded::parse(query.as_bytes()).any(|(key, value)| {
        (key == "refresh" || key == "force") && matches!(value.as_ref(), "true" | "1" | "")
    })
}

fn text(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    with_content_type(response, "text/plain; charset=utf-8")
}

fn with_content_type(mut response: Response<Body>, value: &'static str) -> Response<Body> {
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(value));
    response
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let mut response = handler.handle(req).await;
                tracing::debug!(status = response.status().as_u16(), "request complete");
                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert("x-request-id", value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
