use std::fmt::Display;

use super::{AttributeSet, SpanLifecycle};
use crate::config::TraceConfig;
use crate::context::is_suppressed;
use crate::semconv::{OUTPUT_VALUE, STEP_ERROR, STEP_FINAL_ANSWER, STEP_OBSERVATIONS, SpanKind};
use crate::surface::StepLog;

/// Traces one reasoning step of an agent as a `CHAIN` span.
///
/// The step closure fills in the step log it is handed; whatever the log holds
/// once the closure returns is what gets recorded. An error written to the log
/// is reported as the `Error` attribute but leaves the span status `OK`, since
/// the agent recovers from it on the next step.
#[derive(Debug, Clone, Default)]
pub struct StepWrapper {
    config: TraceConfig,
}

impl StepWrapper {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    pub fn call<S, R, E>(
        &self,
        step_log: &mut S,
        step: impl FnOnce(&mut S) -> Result<Option<R>, E>,
    ) -> Result<Option<R>, E>
    where
        S: StepLog + ?Sized,
        R: Display,
        E: std::error::Error,
    {
        if is_suppressed() {
            tracing::debug!(target: "autoagents.openinference", "instrumentation suppressed");
            return step(step_log);
        }

        let name = format!("Step {}", step_log.step_number());
        let lifecycle = SpanLifecycle::open(&name, SpanKind::Chain, AttributeSet::new(), &self.config);
        let result = lifecycle.in_scope(|| step(step_log));
        lifecycle.settle(result, |final_answer| {
            let mut outputs = AttributeSet::new();
            outputs.set_opt(
                STEP_FINAL_ANSWER,
                final_answer.as_ref().map(ToString::to_string),
            );
            outputs.set_opt(STEP_ERROR, step_log.error());
            if let Some(observations) = step_log.observations() {
                outputs.set(STEP_OBSERVATIONS, observations.to_string());
                outputs.set(OUTPUT_VALUE, observations.to_string());
            }
            outputs
        })
    }
}
