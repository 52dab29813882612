use std::fmt::Display;
use tracing::Instrument;

use super::{AttributeSet, SpanLifecycle};
use crate::binder::Invocation;
use crate::config::TraceConfig;
use crate::context::is_suppressed;
use crate::encoder::safe_json_dumps;
use crate::error::{BindingError, InstrumentError};
use crate::semconv::{
    INPUT_VALUE, MimeType, OUTPUT_MIME_TYPE, OUTPUT_VALUE, SpanKind,
    TOOL_CALL_FUNCTION_ARGUMENTS_JSON, TOOL_CALL_FUNCTION_NAME,
};
use crate::surface::ToolSurface;
use crate::value::ArgMap;

/// Traces a tool invocation as a `TOOL` span named after the tool's type.
#[derive(Debug, Clone, Default)]
pub struct ToolWrapper {
    config: TraceConfig,
}

impl ToolWrapper {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    pub fn call<T, R, E>(
        &self,
        tool: &mut T,
        invocation: &Invocation<'_>,
        forward: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, InstrumentError<E>>
    where
        T: ToolSurface + ?Sized,
        R: Display,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return forward(tool).map_err(InstrumentError::Call);
        }

        let lifecycle = self.open(tool, invocation)?;
        let result = lifecycle.in_scope(|| forward(tool));
        lifecycle
            .settle(result, |response| tool_outputs(response))
            .map_err(InstrumentError::Call)
    }

    pub async fn call_async<T, R, E>(
        &self,
        tool: &mut T,
        invocation: &Invocation<'_>,
        forward: impl AsyncFnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, InstrumentError<E>>
    where
        T: ToolSurface + ?Sized,
        R: Display,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return forward(tool).await.map_err(InstrumentError::Call);
        }

        let lifecycle = self.open(tool, invocation)?;
        let result = forward(tool).instrument(lifecycle.span().clone()).await;
        lifecycle
            .settle(result, |response| tool_outputs(response))
            .map_err(InstrumentError::Call)
    }

    fn open<T>(
        &self,
        tool: &T,
        invocation: &Invocation<'_>,
    ) -> Result<SpanLifecycle<'_>, BindingError>
    where
        T: ToolSurface + ?Sized,
    {
        let bound = invocation.bind()?;
        let mut inputs = AttributeSet::new();
        inputs.set_flattened(&ArgMap::from([(
            INPUT_VALUE,
            safe_json_dumps(&bound.input_arguments()),
        )]));
        inputs.set(TOOL_CALL_FUNCTION_NAME, tool.name().to_string());
        inputs.set(
            TOOL_CALL_FUNCTION_ARGUMENTS_JSON,
            safe_json_dumps(&invocation.kwargs),
        );
        Ok(SpanLifecycle::open(
            tool.type_name(),
            SpanKind::Tool,
            inputs,
            &self.config,
        ))
    }
}

fn tool_outputs<R: Display>(response: &R) -> AttributeSet {
    let mut outputs = AttributeSet::new();
    outputs.set(OUTPUT_MIME_TYPE, MimeType::Text.to_string());
    outputs.set(OUTPUT_VALUE, response.to_string());
    outputs
}
