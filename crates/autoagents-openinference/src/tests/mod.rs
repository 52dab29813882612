use opentelemetry::Value;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::{
    InMemorySpanExporter, InMemorySpanExporterBuilder, SdkTracerProvider, SpanData,
};
use serde::Serialize;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::prelude::*;

use crate::surface::{
    AgentDescriptor, ManagedAgent, ModelOutput, ModelSurface, StepLog, TokenMonitor, ToolSurface,
};
use crate::value::{ArgMap, ArgValue, Inspect};

/// Routes spans opened on the current thread into an in-memory exporter.
pub(crate) struct SpanCapture {
    exporter: InMemorySpanExporter,
    _provider: SdkTracerProvider,
    _guard: DefaultGuard,
}

impl SpanCapture {
    pub(crate) fn install() -> Self {
        let exporter = InMemorySpanExporterBuilder::new().build();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("autoagents.openinference.test");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        let subscriber = tracing_subscriber::Registry::default().with(otel_layer);
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            exporter,
            _provider: provider,
            _guard: guard,
        }
    }

    pub(crate) fn spans(&self) -> Vec<SpanData> {
        self.exporter
            .get_finished_spans()
            .expect("finished spans")
    }

    pub(crate) fn span(&self, name: &str) -> SpanData {
        self.spans()
            .into_iter()
            .find(|span| span.name.as_ref() == name)
            .unwrap_or_else(|| panic!("missing span: {name}"))
    }
}

/// Last value recorded under `key`; later writes win.
pub(crate) fn attr_value(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .rev()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub(crate) struct RunFailure(pub(crate) String);

#[derive(Debug, Clone, Default)]
pub(crate) struct MockModel {
    model_id: Option<String>,
    kwargs: ArgMap,
    last_input: Option<u64>,
    last_output: Option<u64>,
}

impl MockModel {
    pub(crate) fn new(model_id: &str) -> Self {
        Self {
            model_id: Some(model_id.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn with_kwarg(mut self, key: &str, value: impl Into<ArgValue>) -> Self {
        self.kwargs.insert(key, value);
        self
    }

    pub(crate) fn record_usage(&mut self, input: u64, output: u64) {
        self.last_input = Some(input);
        self.last_output = Some(output);
    }
}

impl ModelSurface for MockModel {
    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    fn kwargs(&self) -> ArgMap {
        self.kwargs.clone()
    }

    fn last_input_token_count(&self) -> Option<u64> {
        self.last_input
    }

    fn last_output_token_count(&self) -> Option<u64> {
        self.last_output
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MockOutput {
    pub(crate) role: String,
    pub(crate) content: Option<String>,
}

impl MockOutput {
    pub(crate) fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.to_string()),
        }
    }
}

impl ModelOutput for MockOutput {
    fn role(&self) -> Option<&str> {
        Some(&self.role)
    }

    fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockMonitor {
    input: u64,
    output: u64,
}

impl MockMonitor {
    pub(crate) fn record(&mut self, input: u64, output: u64) {
        self.input += input;
        self.output += output;
    }
}

impl TokenMonitor for MockMonitor {
    fn total_input_token_count(&self) -> u64 {
        self.input
    }

    fn total_output_token_count(&self) -> u64 {
        self.output
    }
}

#[derive(Debug)]
pub(crate) struct MockAgent {
    task: Option<String>,
    model: MockModel,
    max_steps: usize,
    tools: Vec<String>,
    managed: Vec<MockManagedAgent>,
    pub(crate) monitor: MockMonitor,
}

impl MockAgent {
    pub(crate) fn new(task: &str) -> Self {
        Self {
            task: Some(task.to_string()),
            model: MockModel::new("mock-model-1"),
            max_steps: 5,
            tools: Vec::new(),
            managed: Vec::new(),
            monitor: MockMonitor::default(),
        }
    }

    pub(crate) fn with_model(mut self, model: MockModel) -> Self {
        self.model = model;
        self
    }

    pub(crate) fn with_tools<const N: usize>(mut self, tools: [&str; N]) -> Self {
        self.tools = tools.iter().map(|tool| tool.to_string()).collect();
        self
    }

    pub(crate) fn with_managed(mut self, managed: MockManagedAgent) -> Self {
        self.managed.push(managed);
        self
    }
}

impl AgentDescriptor for MockAgent {
    fn task(&self) -> Option<String> {
        self.task.clone()
    }

    fn model(&self) -> &dyn ModelSurface {
        &self.model
    }

    fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn tool_names(&self) -> Vec<String> {
        self.tools.clone()
    }

    fn managed_agents(&self) -> Vec<&dyn ManagedAgent> {
        self.managed
            .iter()
            .map(|managed| managed as &dyn ManagedAgent)
            .collect()
    }

    fn monitor(&self) -> &dyn TokenMonitor {
        &self.monitor
    }
}

#[derive(Debug)]
pub(crate) struct MockManagedAgent {
    name: String,
    description: String,
    agent: MockAgent,
}

impl MockManagedAgent {
    pub(crate) fn new(name: &str, description: &str, agent: MockAgent) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            agent,
        }
    }
}

impl ManagedAgent for MockManagedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn agent(&self) -> &dyn AgentDescriptor {
        &self.agent
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockTool {
    name: String,
    pub(crate) calls: usize,
}

impl MockTool {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: 0,
        }
    }
}

impl ToolSurface for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn json_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {"name": self.name, "parameters": {"type": "object"}}
        })
    }
}

impl Inspect for MockTool {
    fn as_tool(&self) -> Option<&dyn ToolSurface> {
        Some(self)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockStep {
    step_number: usize,
    pub(crate) error: Option<String>,
    pub(crate) observations: Option<String>,
}

impl MockStep {
    pub(crate) fn new(step_number: usize) -> Self {
        Self {
            step_number,
            ..Self::default()
        }
    }
}

impl StepLog for MockStep {
    fn step_number(&self) -> usize {
        self.step_number
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn observations(&self) -> Option<&str> {
        self.observations.as_deref()
    }
}
