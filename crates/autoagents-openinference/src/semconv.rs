//! OpenInference semantic-convention attribute keys and value vocabularies.

use strum::{AsRefStr, Display, IntoStaticStr};

use crate::value::{ArgValue, EnumMember};

// span attributes
pub const OPENINFERENCE_SPAN_KIND: &str = "openinference.span.kind";
pub const INPUT_VALUE: &str = "input.value";
pub const INPUT_MIME_TYPE: &str = "input.mime_type";
pub const OUTPUT_VALUE: &str = "output.value";
pub const OUTPUT_MIME_TYPE: &str = "output.mime_type";
pub const LLM_INPUT_MESSAGES: &str = "llm.input_messages";
pub const LLM_OUTPUT_MESSAGES: &str = "llm.output_messages";
pub const LLM_INVOCATION_PARAMETERS: &str = "llm.invocation_parameters";
pub const LLM_MODEL_NAME: &str = "llm.model_name";
pub const LLM_TOKEN_COUNT_PROMPT: &str = "llm.token_count.prompt";
pub const LLM_TOKEN_COUNT_COMPLETION: &str = "llm.token_count.completion";
pub const LLM_TOKEN_COUNT_TOTAL: &str = "llm.token_count.total";
pub const LLM_TOOLS: &str = "llm.tools";

// message attributes
pub const MESSAGE_ROLE: &str = "message.role";
pub const MESSAGE_CONTENT: &str = "message.content";

// tool attributes
pub const TOOL_JSON_SCHEMA: &str = "tool.json_schema";
pub const TOOL_CALL_FUNCTION_NAME: &str = "tool_call.function.name";
pub const TOOL_CALL_FUNCTION_ARGUMENTS_JSON: &str = "tool_call.function.arguments";

// context attributes
pub const SESSION_ID: &str = "session.id";
pub const USER_ID: &str = "user.id";
pub const METADATA: &str = "metadata";
pub const TAG_TAGS: &str = "tag.tags";
pub const LLM_PROMPT_TEMPLATE: &str = "llm.prompt_template.template";
pub const LLM_PROMPT_TEMPLATE_VARIABLES: &str = "llm.prompt_template.variables";
pub const LLM_PROMPT_TEMPLATE_VERSION: &str = "llm.prompt_template.version";

// agent run attributes
pub const AGENT_NAME: &str = "agent_name";
pub const TASK: &str = "task";
pub const ADDITIONAL_ARGS: &str = "additional_args";
pub const MODEL: &str = "model";
pub const MAX_STEPS: &str = "max_steps";
pub const TOOLS_NAMES: &str = "tools_names";
pub const MANAGED_AGENTS: &str = "managed_agents";

// agent step attributes
pub const STEP_FINAL_ANSWER: &str = "Final answer";
pub const STEP_ERROR: &str = "Error";
pub const STEP_OBSERVATIONS: &str = "Observations";

// exception event
pub const EXCEPTION_EVENT: &str = "exception";
pub const EXCEPTION_TYPE: &str = "exception.type";
pub const EXCEPTION_MESSAGE: &str = "exception.message";

/// What an interception represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SpanKind {
    Agent,
    Chain,
    Llm,
    Tool,
}

impl From<SpanKind> for ArgValue {
    fn from(kind: SpanKind) -> Self {
        let value: &'static str = kind.into();
        ArgValue::Enum(EnumMember::new(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, IntoStaticStr)]
pub enum MimeType {
    #[strum(serialize = "application/json")]
    Json,
    #[strum(serialize = "text/plain")]
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_kinds_render_uppercase() {
        assert_eq!(SpanKind::Agent.as_ref(), "AGENT");
        assert_eq!(SpanKind::Chain.to_string(), "CHAIN");
        assert_eq!(SpanKind::Llm.as_ref(), "LLM");
        assert_eq!(SpanKind::Tool.as_ref(), "TOOL");
    }

    #[test]
    fn mime_types_render_media_types() {
        assert_eq!(MimeType::Json.as_ref(), "application/json");
        assert_eq!(MimeType::Text.to_string(), "text/plain");
    }

    #[test]
    fn span_kind_is_an_enum_member() {
        match ArgValue::from(SpanKind::Tool) {
            ArgValue::Enum(member) => assert_eq!(*member.value, ArgValue::from("TOOL")),
            other => panic!("unexpected value: {other:?}"),
        }
    }
}
