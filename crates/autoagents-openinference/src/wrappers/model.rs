use tracing::Instrument;

use super::run::saturating_i64;
use super::{AttributeSet, SpanLifecycle};
use crate::binder::Invocation;
use crate::config::TraceConfig;
use crate::context::is_suppressed;
use crate::encoder::safe_json_dumps;
use crate::error::{BindingError, InstrumentError};
use crate::flatten::to_attribute_value;
use crate::semconv::{
    INPUT_MIME_TYPE, INPUT_VALUE, LLM_INPUT_MESSAGES, LLM_INVOCATION_PARAMETERS, LLM_MODEL_NAME,
    LLM_OUTPUT_MESSAGES, LLM_TOKEN_COUNT_COMPLETION, LLM_TOKEN_COUNT_PROMPT, LLM_TOKEN_COUNT_TOTAL,
    LLM_TOOLS, MESSAGE_CONTENT, MESSAGE_ROLE, MimeType, OUTPUT_MIME_TYPE, OUTPUT_VALUE, SpanKind,
    TOOL_JSON_SCHEMA,
};
use crate::surface::{ModelOutput, ModelSurface};
use crate::value::{ArgMap, ArgValue};

const PROMPT_ARG: &str = "prompt";
const MESSAGES_ARG: &str = "messages";
const TOOLS_ARG: &str = "tools_to_call_from";

/// Traces a single model inference as an `LLM` span.
#[derive(Debug, Clone, Default)]
pub struct ModelWrapper {
    config: TraceConfig,
}

impl ModelWrapper {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    pub fn call<M, O, E>(
        &self,
        model: &mut M,
        invocation: &Invocation<'_>,
        generate: impl FnOnce(&mut M) -> Result<O, E>,
    ) -> Result<O, InstrumentError<E>>
    where
        M: ModelSurface + ?Sized,
        O: ModelOutput,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return generate(model).map_err(InstrumentError::Call);
        }

        let (lifecycle, tools) = self.open(model, invocation)?;
        let result = lifecycle.in_scope(|| generate(model));
        lifecycle
            .settle(result, |output| model_outputs(model, output, tools))
            .map_err(InstrumentError::Call)
    }

    pub async fn call_async<M, O, E>(
        &self,
        model: &mut M,
        invocation: &Invocation<'_>,
        generate: impl AsyncFnOnce(&mut M) -> Result<O, E>,
    ) -> Result<O, InstrumentError<E>>
    where
        M: ModelSurface + ?Sized,
        O: ModelOutput,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return generate(model).await.map_err(InstrumentError::Call);
        }

        let (lifecycle, tools) = self.open(model, invocation)?;
        let result = generate(model).instrument(lifecycle.span().clone()).await;
        lifecycle
            .settle(result, |output| model_outputs(model, output, tools))
            .map_err(InstrumentError::Call)
    }

    // Offered tools only depend on the arguments, so their schemas are
    // resolved up front and recorded with the outputs.
    fn open<M>(
        &self,
        model: &M,
        invocation: &Invocation<'_>,
    ) -> Result<(SpanLifecycle<'_>, AttributeSet), BindingError>
    where
        M: ModelSurface + ?Sized,
    {
        let bound = invocation.bind()?;
        let arguments = bound.without_receiver();

        let mut inputs = AttributeSet::new();
        inputs.set(INPUT_MIME_TYPE, MimeType::Json.to_string());
        inputs.set(INPUT_VALUE, safe_json_dumps(&arguments));

        let mut parameters = model.kwargs();
        if let Some(captured) = bound.captured_keywords() {
            parameters.extend(captured.clone());
        }
        inputs.set(LLM_INVOCATION_PARAMETERS, safe_json_dumps(&parameters));
        inputs.extend(input_messages(&arguments).entries);

        let name = format!("{}.{}", model.type_name(), invocation.method);
        let lifecycle = SpanLifecycle::open(&name, SpanKind::Llm, inputs, &self.config);
        Ok((lifecycle, offered_tools(&arguments)))
    }
}

fn input_messages(arguments: &ArgMap) -> AttributeSet {
    let mut attributes = AttributeSet::new();
    if let Some(prompt) = arguments.get(PROMPT_ARG).and_then(ArgValue::as_str) {
        attributes.set(format!("{LLM_INPUT_MESSAGES}.0.{MESSAGE_ROLE}"), "user");
        attributes.set(format!("{LLM_INPUT_MESSAGES}.0.{MESSAGE_CONTENT}"), prompt.to_string());
        return attributes;
    }

    let Some(messages) = arguments.get(MESSAGES_ARG).and_then(ArgValue::as_list) else {
        return attributes;
    };
    for (index, message) in messages.iter().enumerate() {
        let Some(message) = message.as_map() else {
            continue;
        };
        for (field, key) in [("role", MESSAGE_ROLE), ("content", MESSAGE_CONTENT)] {
            if let Some(value) = message.get(field).and_then(to_attribute_value) {
                attributes.set(format!("{LLM_INPUT_MESSAGES}.{index}.{key}"), value);
            }
        }
    }
    attributes
}

fn offered_tools(arguments: &ArgMap) -> AttributeSet {
    let mut attributes = AttributeSet::new();
    let Some(tools) = arguments.get(TOOLS_ARG).and_then(ArgValue::as_list) else {
        return attributes;
    };
    for (index, tool) in tools.iter().enumerate() {
        let ArgValue::Object(object) = tool else {
            continue;
        };
        if let Some(tool) = object.as_tool() {
            attributes.set(
                format!("{LLM_TOOLS}.{index}.{TOOL_JSON_SCHEMA}"),
                safe_json_dumps(&tool.json_schema()),
            );
        }
    }
    attributes
}

fn model_outputs<M, O>(model: &M, output: &O, tools: AttributeSet) -> AttributeSet
where
    M: ModelSurface + ?Sized,
    O: ModelOutput,
{
    let prompt = model.last_input_token_count();
    let completion = model.last_output_token_count();

    let mut outputs = AttributeSet::new();
    outputs.set_opt(LLM_TOKEN_COUNT_PROMPT, prompt.map(saturating_i64));
    outputs.set_opt(LLM_TOKEN_COUNT_COMPLETION, completion.map(saturating_i64));
    if let (Some(prompt), Some(completion)) = (prompt, completion) {
        outputs.set(LLM_TOKEN_COUNT_TOTAL, saturating_i64(prompt.saturating_add(completion)));
    }
    outputs.set_opt(LLM_MODEL_NAME, model.model_id().map(str::to_string));
    outputs.set_opt(
        format!("{LLM_OUTPUT_MESSAGES}.0.{MESSAGE_ROLE}"),
        output.role().map(str::to_string),
    );
    outputs.set_opt(
        format!("{LLM_OUTPUT_MESSAGES}.0.{MESSAGE_CONTENT}"),
        output.content().map(str::to_string),
    );
    outputs.extend(tools.entries);
    outputs.set(OUTPUT_MIME_TYPE, MimeType::Json.to_string());
    outputs.set(OUTPUT_VALUE, output.to_json());
    outputs
}
