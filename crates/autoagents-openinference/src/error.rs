/// Failures while binding a call to its declared signature.
///
/// These are programming errors on the integrator's side and are returned to
/// the caller before any span is opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("takes {accepted} positional arguments but {given} were given")]
    TooManyPositional { accepted: usize, given: usize },
    #[error("missing a required argument: '{0}'")]
    MissingArgument(String),
    #[error("multiple values for argument '{0}'")]
    MultipleValues(String),
    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),
    #[error("'{0}' parameter is positional only, but was passed as a keyword")]
    PositionalOnlyAsKeyword(String),
}

/// Errors emitted by telemetry startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("No telemetry exporter configured")]
    MissingExporter,
    #[error("Failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),
    #[error("Tracing subscriber already installed")]
    SubscriberInstalled,
}

/// Error returned by an instrumented call whose arguments could not be bound.
///
/// The wrapped call's own error passes through untouched in the `Call` variant.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError<E> {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Call(E),
}

impl<E> InstrumentError<E> {
    /// The wrapped call's error, if that is what failed.
    pub fn into_call_error(self) -> Option<E> {
        match self {
            Self::Call(err) => Some(err),
            Self::Binding(_) => None,
        }
    }
}
