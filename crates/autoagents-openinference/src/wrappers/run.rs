use opentelemetry::{Array, StringValue, Value};
use std::fmt::Display;
use tracing::Instrument;

use super::{AttributeSet, SpanLifecycle};
use crate::binder::Invocation;
use crate::config::TraceConfig;
use crate::context::is_suppressed;
use crate::encoder::safe_json_dumps;
use crate::error::{BindingError, InstrumentError};
use crate::semconv::{
    ADDITIONAL_ARGS, AGENT_NAME, INPUT_VALUE, LLM_TOKEN_COUNT_COMPLETION, LLM_TOKEN_COUNT_PROMPT,
    LLM_TOKEN_COUNT_TOTAL, MANAGED_AGENTS, MAX_STEPS, MODEL, MimeType, OUTPUT_MIME_TYPE, OUTPUT_VALUE,
    SpanKind, TASK, TOOLS_NAMES,
};
use crate::surface::{AgentDescriptor, model_descriptor};
use crate::value::{ArgMap, ArgValue};

/// Keyword argument holding per-run variables passed to the agent.
const ADDITIONAL_ARGS_KWARG: &str = "additional_args";

/// Traces a full agent run as an `AGENT` span.
#[derive(Debug, Clone, Default)]
pub struct RunWrapper {
    config: TraceConfig,
}

impl RunWrapper {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    pub fn call<A, R, E>(
        &self,
        agent: &mut A,
        invocation: &Invocation<'_>,
        run: impl FnOnce(&mut A) -> Result<R, E>,
    ) -> Result<R, InstrumentError<E>>
    where
        A: AgentDescriptor + ?Sized,
        R: Display,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return run(agent).map_err(InstrumentError::Call);
        }

        let lifecycle = self.open(agent, invocation)?;
        let result = lifecycle.in_scope(|| run(agent));
        lifecycle
            .settle(result, |output| run_outputs(agent, output))
            .map_err(InstrumentError::Call)
    }

    pub async fn call_async<A, R, E>(
        &self,
        agent: &mut A,
        invocation: &Invocation<'_>,
        run: impl AsyncFnOnce(&mut A) -> Result<R, E>,
    ) -> Result<R, InstrumentError<E>>
    where
        A: AgentDescriptor + ?Sized,
        R: Display,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return run(agent).await.map_err(InstrumentError::Call);
        }

        let lifecycle = self.open(agent, invocation)?;
        let result = run(agent).instrument(lifecycle.span().clone()).await;
        lifecycle
            .settle(result, |output| run_outputs(agent, output))
            .map_err(InstrumentError::Call)
    }

    fn open<A>(
        &self,
        agent: &A,
        invocation: &Invocation<'_>,
    ) -> Result<SpanLifecycle<'_>, BindingError>
    where
        A: AgentDescriptor + ?Sized,
    {
        let bound = invocation.bind()?;
        let mut inputs = AttributeSet::new();
        inputs.set(INPUT_VALUE, safe_json_dumps(&bound.input_arguments()));

        let task = agent
            .task()
            .or_else(|| bound.get(TASK).and_then(|task| task.as_str()).map(str::to_string));
        if let Some(task) = task {
            inputs.set(INPUT_VALUE, task.clone());
            inputs.set(TASK, task);
        }
        inputs.set(AGENT_NAME, agent.type_name().to_string());

        let additional_args = invocation
            .kwarg_value(ADDITIONAL_ARGS_KWARG)
            .filter(|value| value.is_truthy())
            .map(safe_json_dumps)
            .unwrap_or_default();
        inputs.set(ADDITIONAL_ARGS, additional_args);

        inputs.set(MODEL, model_descriptor(agent.model()));
        inputs.set(MAX_STEPS, saturating_i64(agent.max_steps()));
        inputs.set(TOOLS_NAMES, string_array(agent.tool_names()));
        inputs.set(MANAGED_AGENTS, managed_agents_summary(agent));

        let name = format!("{}.{}", agent.type_name(), invocation.method);
        Ok(SpanLifecycle::open(&name, SpanKind::Agent, inputs, &self.config))
    }
}

fn run_outputs<A, R>(agent: &A, output: &R) -> AttributeSet
where
    A: AgentDescriptor + ?Sized,
    R: Display,
{
    let monitor = agent.monitor();
    let prompt = monitor.total_input_token_count();
    let completion = monitor.total_output_token_count();

    let mut outputs = AttributeSet::new();
    outputs.set(LLM_TOKEN_COUNT_PROMPT, saturating_i64(prompt));
    outputs.set(LLM_TOKEN_COUNT_COMPLETION, saturating_i64(completion));
    outputs.set(LLM_TOKEN_COUNT_TOTAL, saturating_i64(prompt.saturating_add(completion)));
    outputs.set(OUTPUT_MIME_TYPE, MimeType::Text.to_string());
    outputs.set(OUTPUT_VALUE, output.to_string());
    outputs
}

fn managed_agents_summary<A>(agent: &A) -> String
where
    A: AgentDescriptor + ?Sized,
{
    let summaries: Vec<ArgMap> = agent
        .managed_agents()
        .into_iter()
        .map(|managed| {
            let inner = managed.agent();
            ArgMap::from([
                ("name", ArgValue::from(managed.name())),
                ("description", ArgValue::from(managed.description())),
                (
                    "additional_prompting",
                    ArgValue::from(managed.additional_prompting()),
                ),
                ("model", ArgValue::from(model_descriptor(inner.model()))),
                ("max_steps", ArgValue::from(inner.max_steps())),
                ("tools_names", ArgValue::from(inner.tool_names())),
            ])
        })
        .collect();
    safe_json_dumps(&summaries)
}

pub(crate) fn saturating_i64<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

pub(crate) fn string_array(values: Vec<String>) -> Value {
    Value::Array(Array::String(
        values.into_iter().map(StringValue::from).collect(),
    ))
}
