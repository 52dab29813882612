use crate::config::{OtlpConfig, OtlpProtocol, TelemetryConfig};
use opentelemetry::KeyValue;
#[cfg(not(target_arch = "wasm32"))]
use opentelemetry_http::{Bytes, HttpClient, HttpError, Request, Response};
use opentelemetry_otlp::{SpanExporter as OtlpSpanExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
#[cfg(not(target_arch = "wasm32"))]
use reqwest::Client as ReqwestClient;
#[cfg(not(target_arch = "wasm32"))]
use std::fmt;
use std::time::Duration;

const TRACES_PATH: &str = "/v1/traces";

/// Forwards every span batch to each configured backend.
#[derive(Debug, Default)]
pub(crate) struct FanoutSpanExporter {
    exporters: Vec<Backend>,
}

#[derive(Debug)]
enum Backend {
    Otlp(Box<OtlpSpanExporter>),
    Stdout(StdoutSpanExporter),
}

impl FanoutSpanExporter {
    pub(crate) fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.exporters.len()
    }
}

impl Backend {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        match self {
            Backend::Otlp(exporter) => exporter.export(batch).await,
            Backend::Stdout(exporter) => exporter.export(batch).await,
        }
    }

    fn as_exporter_mut(&mut self) -> &mut dyn DynExporterControl {
        match self {
            Backend::Otlp(exporter) => &mut **exporter,
            Backend::Stdout(exporter) => exporter,
        }
    }
}

// Object-safe slice of `SpanExporter` used to drive flush/shutdown uniformly.
trait DynExporterControl {
    fn flush(&mut self) -> OTelSdkResult;
    fn shutdown_within(&mut self, timeout: Duration) -> OTelSdkResult;
    fn attach_resource(&mut self, resource: &Resource);
}

impl<T: SpanExporter> DynExporterControl for T {
    fn flush(&mut self) -> OTelSdkResult {
        self.force_flush()
    }

    fn shutdown_within(&mut self, timeout: Duration) -> OTelSdkResult {
        self.shutdown_with_timeout(timeout)
    }

    fn attach_resource(&mut self, resource: &Resource) {
        self.set_resource(resource)
    }
}

impl SpanExporter for FanoutSpanExporter {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        let mut result = Ok(());
        for exporter in &self.exporters {
            if let Err(err) = exporter.export(batch.clone()).await {
                result = Err(err);
            }
        }
        result
    }

    fn shutdown_with_timeout(&mut self, timeout: Duration) -> OTelSdkResult {
        let mut result = Ok(());
        for exporter in &mut self.exporters {
            if let Err(err) = exporter.as_exporter_mut().shutdown_within(timeout) {
                result = Err(err);
            }
        }
        result
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        let mut result = Ok(());
        for exporter in &mut self.exporters {
            if let Err(err) = exporter.as_exporter_mut().flush() {
                result = Err(err);
            }
        }
        result
    }

    fn set_resource(&mut self, resource: &Resource) {
        for exporter in &mut self.exporters {
            exporter.as_exporter_mut().attach_resource(resource);
        }
    }
}

/// Span exporter that logs finished OpenInference spans to the tracing subscriber.
#[derive(Debug, Default)]
pub(crate) struct StdoutSpanExporter;

impl SpanExporter for StdoutSpanExporter {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        for span in batch {
            let kind = span
                .attributes
                .iter()
                .find(|kv| kv.key.as_str() == crate::semconv::OPENINFERENCE_SPAN_KIND)
                .map(|kv| kv.value.to_string());
            tracing::info!(
                target: "autoagents.openinference.stdout",
                name = %span.name,
                kind = kind.as_deref().unwrap_or("UNKNOWN"),
                trace_id = %span.span_context.trace_id(),
                span_id = %span.span_context.span_id(),
                parent_span_id = %span.parent_span_id,
                start = ?span.start_time,
                end = ?span.end_time,
                attributes = ?span.attributes,
                status = ?span.status,
            );
        }
        Ok(())
    }
}

// Sends OTLP requests through the workspace reqwest client and logs
// collector responses.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone)]
struct ReqwestHttpClient {
    inner: ReqwestClient,
    log_responses: bool,
}

#[cfg(not(target_arch = "wasm32"))]
impl fmt::Debug for ReqwestHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestHttpClient")
            .field("log_responses", &self.log_responses)
            .finish_non_exhaustive()
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let request = request.try_into()?;
        let mut response = self.inner.execute(request).await?;
        let status = response.status();
        let headers = std::mem::take(response.headers_mut());
        let body = response.bytes().await?;

        if !status.is_success() {
            let preview: String = String::from_utf8_lossy(&body).chars().take(4096).collect();
            tracing::warn!(
                target: "autoagents.openinference.otlp",
                status = %status,
                body = %preview,
                "OTLP trace export rejected"
            );
            return Err(format!("OTLP export failed with status {status}: {preview}").into());
        }
        if self.log_responses {
            tracing::debug!(
                target: "autoagents.openinference.otlp",
                status = %status,
                body_len = body.len(),
                "OTLP trace export accepted"
            );
        }

        let mut http_response = Response::builder().status(status.as_u16()).body(body)?;
        *http_response.headers_mut() = headers;
        Ok(http_response)
    }
}

pub(crate) fn build_span_exporter(
    config: &TelemetryConfig,
) -> Result<FanoutSpanExporter, opentelemetry_otlp::ExporterBuildError> {
    let mut exporters = Vec::new();
    if let Some(otlp) = &config.exporter.otlp {
        exporters.push(Backend::Otlp(Box::new(build_otlp_span_exporter(otlp)?)));
    }
    if config.exporter.stdout {
        exporters.push(Backend::Stdout(StdoutSpanExporter));
    }
    Ok(FanoutSpanExporter { exporters })
}

fn build_otlp_span_exporter(
    config: &OtlpConfig,
) -> Result<OtlpSpanExporter, opentelemetry_otlp::ExporterBuildError> {
    let mut builder = OtlpSpanExporter::builder()
        .with_http()
        .with_protocol(match config.protocol {
            OtlpProtocol::HttpBinary => opentelemetry_otlp::Protocol::HttpBinary,
            OtlpProtocol::HttpJson => opentelemetry_otlp::Protocol::HttpJson,
        });

    #[cfg(not(target_arch = "wasm32"))]
    {
        builder = builder.with_http_client(ReqwestHttpClient {
            inner: ReqwestClient::new(),
            log_responses: config.debug_http,
        });
    }

    if let Some(endpoint) = config
        .endpoint
        .as_deref()
        .map(|endpoint| resolve_signal_endpoint(endpoint, TRACES_PATH))
    {
        builder = builder.with_endpoint(endpoint);
    }
    if !config.headers.is_empty() {
        builder = builder.with_headers(config.headers.clone());
    }
    builder.build()
}

/// Appends the signal path unless the endpoint already names one.
pub(crate) fn resolve_signal_endpoint(endpoint: &str, signal_path: &str) -> String {
    if endpoint.contains("/v1/") || endpoint.ends_with(signal_path) {
        return endpoint.to_string();
    }
    let trimmed = endpoint.trim_end_matches('/');
    match signal_path.strip_prefix('/') {
        Some(path) => format!("{trimmed}/{path}"),
        None => format!("{trimmed}/{signal_path}"),
    }
}

pub(crate) fn resource_attributes(config: &TelemetryConfig) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    if let Some(version) = &config.service_version {
        attributes.push(KeyValue::new("service.version", version.clone()));
    }
    if let Some(environment) = &config.environment {
        attributes.push(KeyValue::new("deployment.environment", environment.clone()));
    }
    attributes
}
