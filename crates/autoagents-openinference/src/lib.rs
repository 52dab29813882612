//! OpenInference tracing for autonomous-agent frameworks.
//!
//! Four wrappers sit around the framework's call sites (agent runs, agent
//! steps, model inferences and tool invocations) and turn every call into an
//! OpenTelemetry span that follows the OpenInference semantic conventions.
//! Spans are opened through `tracing` and reach OpenTelemetry through the
//! `tracing-opentelemetry` layer, so they nest under whatever span is current
//! when the call is made.
//!
//! The framework is only seen through the accessor traits in [`surface`]; the
//! arguments of an intercepted call are described with an [`Invocation`] and
//! normalized against its [`Signature`] before they are recorded.

mod binder;
mod config;
mod context;
mod encoder;
mod error;
mod exporter;
mod flatten;
mod instrumentor;
pub mod semconv;
pub mod surface;
mod telemetry;
mod value;
mod wrappers;

#[cfg(test)]
mod tests;

pub use binder::{BoundArguments, Invocation, Parameter, ParameterKind, Signature};
pub use config::{
    ExporterConfig, OtlpConfig, OtlpProtocol, REDACTED_VALUE, SpanBatchConfig,
    SpanProcessorConfig, TelemetryConfig, TraceConfig,
};
pub use context::{
    ContextAttributes, SuppressionGate, attributes_from_context, is_suppressed,
    suppress_instrumentation, using_attributes,
};
pub use encoder::safe_json_dumps;
pub use error::{BindingError, InstrumentError, TelemetryError};
pub use flatten::{flatten, to_attribute_value};
pub use instrumentor::Instrumentor;
pub use telemetry::{INSTRUMENTATION_NAME, TelemetryHandle, init_telemetry};
pub use value::{ArgMap, ArgValue, EnumMember, Inspect, Serialized, short_type_name};
pub use wrappers::{ModelWrapper, RunWrapper, StepWrapper, ToolWrapper};
