//! Span lifecycle shared by every interception point.
//!
//! A wrapper builds its input attributes, opens a span, runs the wrapped call
//! inside it and then records either the output attributes or the failure.
//! Ambient context attributes are written last on both paths, so they win on
//! key collisions.

mod model;
mod run;
mod step;
mod tool;

pub use model::ModelWrapper;
pub use run::RunWrapper;
pub use step::StepWrapper;
pub use tool::ToolWrapper;

use opentelemetry::trace::Status;
use opentelemetry::{Key, KeyValue, Value};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::{REDACTED_VALUE, TraceConfig};
use crate::context::attributes_from_context;
use crate::flatten::flatten;
use crate::semconv::{
    ADDITIONAL_ARGS, EXCEPTION_EVENT, EXCEPTION_MESSAGE, EXCEPTION_TYPE, INPUT_MIME_TYPE,
    INPUT_VALUE, LLM_INPUT_MESSAGES, LLM_INVOCATION_PARAMETERS, LLM_OUTPUT_MESSAGES,
    OPENINFERENCE_SPAN_KIND, OUTPUT_MIME_TYPE, OUTPUT_VALUE, STEP_FINAL_ANSWER, STEP_OBSERVATIONS,
    SpanKind, TASK, TOOL_CALL_FUNCTION_ARGUMENTS_JSON,
};
use crate::value::ArgMap;

/// Attributes gathered for one phase of a span; setting a key twice keeps the
/// last value in the first position.
#[derive(Debug, Default, Clone)]
pub(crate) struct AttributeSet {
    entries: Vec<KeyValue>,
}

impl AttributeSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|kv| kv.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(KeyValue::new(key, value)),
        }
    }

    pub(crate) fn set_opt(&mut self, key: impl Into<Key>, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Flattens `mapping` and sets every resulting attribute.
    pub(crate) fn set_flattened(&mut self, mapping: &ArgMap) {
        self.extend(flatten(Some(mapping)));
    }

    pub(crate) fn extend(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        for kv in attributes {
            self.set(kv.key, kv.value);
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    fn redact(self, config: &TraceConfig) -> Vec<KeyValue> {
        self.entries
            .into_iter()
            .filter_map(|kv| redact_attribute(config, kv))
            .collect()
    }
}

fn under(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

fn redact_attribute(config: &TraceConfig, kv: KeyValue) -> Option<KeyValue> {
    let key = kv.key.as_str();
    let hide_input_messages = config.hide_inputs || config.hide_input_messages;
    let hide_output_messages = config.hide_outputs || config.hide_output_messages;

    if (hide_input_messages && under(key, LLM_INPUT_MESSAGES))
        || (hide_output_messages && under(key, LLM_OUTPUT_MESSAGES))
        || (config.hide_llm_invocation_parameters && key == LLM_INVOCATION_PARAMETERS)
        || (config.hide_inputs && key == INPUT_MIME_TYPE)
        || (config.hide_outputs && key == OUTPUT_MIME_TYPE)
    {
        return None;
    }

    let masked = match key {
        INPUT_VALUE | TASK | ADDITIONAL_ARGS | TOOL_CALL_FUNCTION_ARGUMENTS_JSON => {
            config.hide_inputs
        }
        OUTPUT_VALUE | STEP_FINAL_ANSWER | STEP_OBSERVATIONS => config.hide_outputs,
        _ => false,
    };
    if masked {
        return Some(KeyValue::new(kv.key, REDACTED_VALUE));
    }
    Some(kv)
}

/// One open span and the redaction rules applied to everything written to it.
pub(crate) struct SpanLifecycle<'c> {
    span: Span,
    config: &'c TraceConfig,
}

impl<'c> SpanLifecycle<'c> {
    pub(crate) fn open(
        name: &str,
        kind: SpanKind,
        inputs: AttributeSet,
        config: &'c TraceConfig,
    ) -> Self {
        let span = tracing::info_span!(
            target: "autoagents.openinference",
            "openinference.span",
            otel.name = %name,
        );
        let mut attributes = AttributeSet::new();
        attributes.set_flattened(&ArgMap::from([(OPENINFERENCE_SPAN_KIND, kind)]));
        attributes.extend(inputs.entries);

        let lifecycle = Self { span, config };
        lifecycle.record(attributes);
        lifecycle
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn in_scope<R>(&self, call: impl FnOnce() -> R) -> R {
        self.span.in_scope(call)
    }

    fn record(&self, attributes: AttributeSet) {
        for kv in attributes.redact(self.config) {
            self.span.set_attribute(kv.key, kv.value);
        }
    }

    fn succeed(self, outputs: AttributeSet) {
        self.record(outputs);
        self.span.set_status(Status::Ok);
        self.close();
    }

    fn fail<E>(self, err: &E)
    where
        E: std::error::Error,
    {
        let message = err.to_string();
        self.span.set_status(Status::error(message.clone()));
        self.span.add_event(
            EXCEPTION_EVENT,
            vec![
                KeyValue::new(EXCEPTION_TYPE, std::any::type_name::<E>()),
                KeyValue::new(EXCEPTION_MESSAGE, message),
            ],
        );
        self.close();
    }

    /// Records `result` on the span and hands it back untouched.
    pub(crate) fn settle<R, E>(
        self,
        result: Result<R, E>,
        outputs: impl FnOnce(&R) -> AttributeSet,
    ) -> Result<R, E>
    where
        E: std::error::Error,
    {
        match &result {
            Ok(value) => self.succeed(outputs(value)),
            Err(err) => self.fail(err),
        }
        result
    }

    fn close(self) {
        for kv in attributes_from_context() {
            self.span.set_attribute(kv.key, kv.value);
        }
    }
}
