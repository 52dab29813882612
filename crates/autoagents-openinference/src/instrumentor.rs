use crate::config::TraceConfig;
use crate::context::SuppressionGate;
use crate::wrappers::{ModelWrapper, RunWrapper, StepWrapper, ToolWrapper};

/// The four interception points of an agent framework, sharing one
/// [`TraceConfig`].
///
/// ```
/// use autoagents_openinference::{Instrumentor, TraceConfig};
///
/// let instrumentor = Instrumentor::new(TraceConfig::default());
/// let _run = instrumentor.run();
/// let _tool = instrumentor.tool();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Instrumentor {
    config: TraceConfig,
    run: RunWrapper,
    step: StepWrapper,
    model: ModelWrapper,
    tool: ToolWrapper,
}

impl Instrumentor {
    pub fn new(config: TraceConfig) -> Self {
        Self {
            config,
            run: RunWrapper::new(config),
            step: StepWrapper::new(config),
            model: ModelWrapper::new(config),
            tool: ToolWrapper::new(config),
        }
    }

    /// Reads the redaction switches from `OPENINFERENCE_HIDE_*` variables.
    pub fn from_env() -> Self {
        Self::new(TraceConfig::from_env())
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn run(&self) -> &RunWrapper {
        &self.run
    }

    pub fn step(&self) -> &StepWrapper {
        &self.step
    }

    pub fn model(&self) -> &ModelWrapper {
        &self.model
    }

    pub fn tool(&self) -> &ToolWrapper {
        &self.tool
    }

    /// Lets every interception point emit spans again.
    pub fn instrument(&self) {
        SuppressionGate::release();
        tracing::debug!(target: "autoagents.openinference", "instrumentation enabled");
    }

    /// Turns every interception point into a pass-through, process-wide.
    pub fn uninstrument(&self) {
        SuppressionGate::engage();
        tracing::debug!(target: "autoagents.openinference", "instrumentation disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{Invocation, Parameter, Signature};
    use crate::tests::{MockTool, RunFailure, SpanCapture};
    use serial_test::serial;

    #[test]
    #[serial]
    fn uninstrumented_calls_pass_through_without_spans() {
        let capture = SpanCapture::install();
        let instrumentor = Instrumentor::default();
        let signature = Signature::new([Parameter::positional("query")]);
        let invocation = Invocation::new("forward", &signature).arg("x");
        let mut tool = MockTool::new("web_search");

        instrumentor.uninstrument();
        let response = instrumentor
            .tool()
            .call(&mut tool, &invocation, |_| Ok::<_, RunFailure>("direct"));
        instrumentor.instrument();

        assert_eq!(response.expect("tool succeeds"), "direct");
        assert!(capture.spans().is_empty());

        instrumentor
            .tool()
            .call(&mut tool, &invocation, |_| Ok::<_, RunFailure>("traced"))
            .expect("tool succeeds");
        assert_eq!(capture.spans().len(), 1);
    }

    #[test]
    fn wrappers_share_the_config() {
        let config = TraceConfig {
            hide_outputs: true,
            ..TraceConfig::default()
        };
        let instrumentor = Instrumentor::new(config);
        assert_eq!(instrumentor.config(), &config);
    }
}
