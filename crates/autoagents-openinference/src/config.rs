use std::collections::HashMap;
use std::time::Duration;

/// Placeholder written in place of a hidden input or output value.
pub const REDACTED_VALUE: &str = "[REDACTED]";

pub const OPENINFERENCE_HIDE_INPUTS: &str = "OPENINFERENCE_HIDE_INPUTS";
pub const OPENINFERENCE_HIDE_OUTPUTS: &str = "OPENINFERENCE_HIDE_OUTPUTS";
pub const OPENINFERENCE_HIDE_INPUT_MESSAGES: &str = "OPENINFERENCE_HIDE_INPUT_MESSAGES";
pub const OPENINFERENCE_HIDE_OUTPUT_MESSAGES: &str = "OPENINFERENCE_HIDE_OUTPUT_MESSAGES";
pub const OPENINFERENCE_HIDE_LLM_INVOCATION_PARAMETERS: &str =
    "OPENINFERENCE_HIDE_LLM_INVOCATION_PARAMETERS";

/// Which span attributes are masked before they leave the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceConfig {
    pub hide_inputs: bool,
    pub hide_outputs: bool,
    pub hide_input_messages: bool,
    pub hide_output_messages: bool,
    pub hide_llm_invocation_parameters: bool,
}

impl TraceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).as_deref().is_some_and(parse_flag);
        Self {
            hide_inputs: flag(OPENINFERENCE_HIDE_INPUTS),
            hide_outputs: flag(OPENINFERENCE_HIDE_OUTPUTS),
            hide_input_messages: flag(OPENINFERENCE_HIDE_INPUT_MESSAGES),
            hide_output_messages: flag(OPENINFERENCE_HIDE_OUTPUT_MESSAGES),
            hide_llm_invocation_parameters: flag(OPENINFERENCE_HIDE_LLM_INVOCATION_PARAMETERS),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    pub environment: Option<String>,
    pub exporter: ExporterConfig,
    pub processor: SpanProcessorConfig,
    pub install_tracing_subscriber: bool,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: None,
            environment: None,
            exporter: ExporterConfig::default(),
            processor: SpanProcessorConfig::default(),
            install_tracing_subscriber: true,
        }
    }

    pub fn with_otlp(mut self, otlp: OtlpConfig) -> Self {
        self.exporter.otlp = Some(otlp);
        self
    }

    pub fn with_stdout(mut self) -> Self {
        self.exporter.stdout = true;
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("autoagents-openinference")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExporterConfig {
    pub otlp: Option<OtlpConfig>,
    pub stdout: bool,
}

#[derive(Debug, Clone)]
pub struct OtlpConfig {
    pub endpoint: Option<String>,
    pub protocol: OtlpProtocol,
    pub headers: HashMap<String, String>,
    pub debug_http: bool,
}

impl OtlpConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            protocol: OtlpProtocol::HttpBinary,
            headers: HashMap::new(),
            debug_http: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum OtlpProtocol {
    #[default]
    HttpBinary,
    HttpJson,
}

/// How finished spans reach the exporters.
///
/// The wrappers never hold spans back: each span is ended and handed to the
/// SDK when its call returns. Queueing only happens inside the SDK processor
/// picked here, and `Simple` turns it off entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpanProcessorConfig {
    /// Export every span as it ends, on the thread that ended it.
    Simple,
    /// Queue spans and export them from a background task on the tokio runtime.
    Batch(SpanBatchConfig),
}

impl Default for SpanProcessorConfig {
    fn default() -> Self {
        Self::Batch(SpanBatchConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanBatchConfig {
    pub max_queue_size: usize,
    pub max_export_batch_size: usize,
    pub scheduled_delay: Duration,
    pub max_export_timeout: Duration,
    pub max_concurrent_exports: usize,
}

impl Default for SpanBatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(5),
            max_export_timeout: Duration::from_secs(30),
            max_concurrent_exports: 1,
        }
    }
}
