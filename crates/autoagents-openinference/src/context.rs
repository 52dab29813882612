//! Ambient state consulted by every interception point: the suppression
//! switches and the attributes propagated through the OpenTelemetry context.

use opentelemetry::{Array, Context, ContextGuard, KeyValue, StringValue, Value};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::encoder::safe_json_dumps;
use crate::semconv::{
    LLM_PROMPT_TEMPLATE, LLM_PROMPT_TEMPLATE_VARIABLES, LLM_PROMPT_TEMPLATE_VERSION, METADATA,
    SESSION_ID, TAG_TAGS, USER_ID,
};

static SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Process-wide switch that turns every interception point into a plain
/// pass-through while engaged.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionGate;

impl SuppressionGate {
    pub fn engage() {
        SUPPRESSED.store(true, Ordering::Relaxed);
    }

    pub fn release() {
        SUPPRESSED.store(false, Ordering::Relaxed);
    }

    pub fn is_engaged() -> bool {
        SUPPRESSED.load(Ordering::Relaxed)
    }
}

/// Suppresses instrumentation for the current context until the guard drops.
#[must_use = "suppression ends when the guard is dropped"]
pub fn suppress_instrumentation() -> ContextGuard {
    Context::enter_telemetry_suppressed_scope()
}

/// Whether interception points should skip all span work right now.
pub fn is_suppressed() -> bool {
    SuppressionGate::is_engaged() || Context::is_current_telemetry_suppressed()
}

/// Request-scoped attributes attached to every span opened while they are in
/// the current context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextAttributes {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub tags: Option<Vec<String>>,
    pub prompt_template: Option<String>,
    pub prompt_template_version: Option<String>,
    pub prompt_template_variables: Option<serde_json::Value>,
}

impl ContextAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn prompt_template_version(mut self, version: impl Into<String>) -> Self {
        self.prompt_template_version = Some(version.into());
        self
    }

    pub fn prompt_template_variables(mut self, variables: serde_json::Value) -> Self {
        self.prompt_template_variables = Some(variables);
        self
    }

    /// Fields set on `inner` replace the ones set here.
    fn overlay(mut self, inner: Self) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if inner.$field.is_some() {
                    self.$field = inner.$field;
                })*
            };
        }
        take!(
            session_id,
            user_id,
            metadata,
            tags,
            prompt_template,
            prompt_template_version,
            prompt_template_variables
        );
        self
    }

    pub fn to_key_values(&self) -> Vec<KeyValue> {
        let mut attributes = Vec::new();
        if let Some(session_id) = &self.session_id {
            attributes.push(KeyValue::new(SESSION_ID, session_id.clone()));
        }
        if let Some(user_id) = &self.user_id {
            attributes.push(KeyValue::new(USER_ID, user_id.clone()));
        }
        if let Some(metadata) = &self.metadata {
            attributes.push(KeyValue::new(METADATA, safe_json_dumps(metadata)));
        }
        if let Some(tags) = &self.tags {
            let tags: Vec<StringValue> = tags.iter().cloned().map(StringValue::from).collect();
            attributes.push(KeyValue::new(TAG_TAGS, Value::Array(Array::String(tags))));
        }
        if let Some(template) = &self.prompt_template {
            attributes.push(KeyValue::new(LLM_PROMPT_TEMPLATE, template.clone()));
        }
        if let Some(version) = &self.prompt_template_version {
            attributes.push(KeyValue::new(LLM_PROMPT_TEMPLATE_VERSION, version.clone()));
        }
        if let Some(variables) = &self.prompt_template_variables {
            attributes.push(KeyValue::new(
                LLM_PROMPT_TEMPLATE_VARIABLES,
                safe_json_dumps(variables),
            ));
        }
        attributes
    }
}

/// Attaches `attributes` to the current context until the guard drops.
///
/// Nested calls layer on top of the enclosing attributes.
#[must_use = "the attributes are detached when the guard is dropped"]
pub fn using_attributes(attributes: ContextAttributes) -> ContextGuard {
    let current = Context::current();
    let merged = current
        .get::<ContextAttributes>()
        .cloned()
        .unwrap_or_default()
        .overlay(attributes);
    current.with_value(merged).attach()
}

/// Attributes carried by the current context, ready to set on a span.
pub fn attributes_from_context() -> Vec<KeyValue> {
    Context::current()
        .get::<ContextAttributes>()
        .map(ContextAttributes::to_key_values)
        .unwrap_or_default()
}
