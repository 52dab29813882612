use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::span_processor_with_async_runtime::BatchSpanProcessor;
use opentelemetry_sdk::trace::{BatchConfigBuilder, SdkTracer, SdkTracerProvider, SpanExporter};
use std::time::Duration;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{SpanProcessorConfig, TelemetryConfig};
use crate::error::TelemetryError;
use crate::exporter::{build_span_exporter, resource_attributes};

/// Instrumentation scope reported on every span.
pub const INSTRUMENTATION_NAME: &str = "autoagents.openinference";

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the tracer provider built by [`init_telemetry`].
#[derive(Debug)]
pub struct TelemetryHandle {
    tracer_provider: SdkTracerProvider,
}

impl TelemetryHandle {
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    pub fn tracer(&self) -> SdkTracer {
        self.tracer_provider.tracer(INSTRUMENTATION_NAME)
    }

    /// Flushes pending spans and shuts the exporters down.
    pub async fn shutdown(self) {
        let tracer_provider = self.tracer_provider;
        let flushed = timeout(
            SHUTDOWN_TIMEOUT,
            tokio::task::spawn_blocking(move || {
                let _ = tracer_provider.force_flush();
                tracer_provider.shutdown()
            }),
        )
        .await;
        match flushed {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => tracing::warn!(
                target: "autoagents.openinference",
                error = %err,
                "tracer provider shutdown failed"
            ),
            Ok(Err(err)) => tracing::warn!(
                target: "autoagents.openinference",
                error = %err,
                "tracer provider shutdown task panicked"
            ),
            Err(_) => tracing::warn!(
                target: "autoagents.openinference",
                "tracer provider shutdown timed out"
            ),
        }
    }
}

/// Builds the exporter pipeline and optionally installs the global subscriber.
///
/// The batch processor spawns its export loop on the ambient tokio runtime,
/// so call this from within one unless [`SpanProcessorConfig::Simple`] is used.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryHandle, TelemetryError> {
    let mut exporter = build_span_exporter(config)?;
    if exporter.is_empty() {
        return Err(TelemetryError::MissingExporter);
    }
    tracing::debug!(
        target: "autoagents.openinference",
        exporters = exporter.len(),
        service = %config.service_name,
        "building tracer provider"
    );

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes(resource_attributes(config))
        .build();
    exporter.set_resource(&resource);

    let builder = SdkTracerProvider::builder().with_resource(resource);
    let tracer_provider = match config.processor {
        SpanProcessorConfig::Simple => builder.with_simple_exporter(exporter).build(),
        SpanProcessorConfig::Batch(batch) => {
            let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
                .with_batch_config(
                    BatchConfigBuilder::default()
                        .with_max_queue_size(batch.max_queue_size)
                        .with_max_export_batch_size(batch.max_export_batch_size)
                        .with_scheduled_delay(batch.scheduled_delay)
                        .with_max_export_timeout(batch.max_export_timeout)
                        .with_max_concurrent_exports(batch.max_concurrent_exports)
                        .build(),
                )
                .build();
            builder.with_span_processor(processor).build()
        }
    };
    let handle = TelemetryHandle { tracer_provider };

    if config.install_tracing_subscriber {
        let otel_layer = tracing_opentelemetry::layer().with_tracer(handle.tracer());
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::Registry::default()
            .with(filter)
            .with(otel_layer)
            .with(tracing_subscriber::fmt::layer());
        if subscriber.try_init().is_err() {
            tracing::warn!(
                target: "autoagents.openinference",
                "tracing subscriber already set; OpenTelemetry layer not installed"
            );
            return Err(TelemetryError::SubscriberInstalled);
        }
    }

    Ok(handle)
}
