//! Logging, tracing and metrics for the marketplace API.
//!
//! # Purpose
//! [`init_observability`] installs the `tracing` subscriber (text or JSON
//! lines), the W3C trace-context propagator, an OTLP span exporter when a
//! collector endpoint is configured, and the Prometheus recorder that backs
//! every `metrics::counter!` in the crate. [`serve_metrics`] exposes the
//! recorder on its own listener.
//!
//! # Notes
//! Every installer is guarded by a `OnceLock`; calling them again returns the
//! state installed first.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const INSTANCE_ID_ENV: &str = "MARKETPLACE_SERVICE_INSTANCE_ID";
const ENVIRONMENT_ENV: &str = "MARKETPLACE_ENVIRONMENT";

static SUBSCRIBER: OnceLock<()> = OnceLock::new();
static PROPAGATOR: OnceLock<()> = OnceLock::new();
static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install logging, tracing and the metrics recorder for `service_name`.
pub fn init_observability(service_name: &str, log_json: bool) -> PrometheusHandle {
    install_propagator();
    SUBSCRIBER.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let endpoint = otlp_endpoint();
        let provider = endpoint.as_ref().map(|_| tracer_provider(service_name));
        let otel_layer = match &provider {
            Some(Ok(provider)) => {
                let tracer = provider.tracer(service_name.to_string());
                global::set_tracer_provider(provider.clone());
                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            }
            _ => None,
        };
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(log_json.then(|| tracing_subscriber::fmt::layer().json()))
            .with((!log_json).then(tracing_subscriber::fmt::layer))
            .with(otel_layer)
            .try_init();
        match (endpoint, provider) {
            (Some(endpoint), Some(Ok(_))) => {
                tracing::info!(%endpoint, "exporting spans over OTLP");
            }
            (Some(endpoint), Some(Err(err))) => {
                tracing::warn!(%endpoint, error = %err, "OTLP exporter disabled");
            }
            _ => {}
        }
    });
    metrics_recorder()
}

fn install_propagator() {
    PROPAGATOR.get_or_init(|| global::set_text_map_propagator(TraceContextPropagator::new()));
}

fn otlp_endpoint() -> Option<String> {
    std::env::var(OTLP_ENDPOINT_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn tracer_provider(service_name: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;
    let resource = Resource::builder_empty()
        .with_attributes(service_resource(service_name))
        .build();
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Resource attributes attached to exported spans.
fn service_resource(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ];
    if let Ok(instance) = std::env::var(INSTANCE_ID_ENV) {
        attrs.push(KeyValue::new("service.instance.id", instance));
    }
    if let Ok(environment) = std::env::var(ENVIRONMENT_ENV) {
        attrs.push(KeyValue::new("deployment.environment", environment));
    }
    attrs
}

/// Parent context for the `http.request` span, from `traceparent`/`tracestate`.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&RequestHeaders(headers)))
}

struct RequestHeaders<'a>(&'a axum::http::HeaderMap);

impl Extractor for RequestHeaders<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

fn metrics_recorder() -> PrometheusHandle {
    RECORDER
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("install metrics recorder");
            describe_metrics();
            handle
        })
        .clone()
}

fn describe_metrics() {
    metrics::describe_counter!(
        "marketplace_rate_limit_decisions_total",
        "Rate-limit decisions by policy and outcome"
    );
    metrics::describe_counter!(
        "marketplace_authorization_denied_total",
        "Requests denied for a missing capability"
    );
    metrics::describe_counter!(
        "marketplace_cms_page_changes_total",
        "CMS page writes by operation"
    );
    metrics::describe_gauge!("marketplace_cms_pages_total", "Stored CMS pages");
}

/// Serve `GET /metrics` on `addr` until the task is dropped.
pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listener started");
    axum::serve(listener, metrics_router(handle)).await
}

fn metrics_router(handle: PrometheusHandle) -> axum::Router {
    axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || std::future::ready(handle.render())),
    )
}
