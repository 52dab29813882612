//! Read-only views over the instrumented framework's objects.
//!
//! Wrappers never touch framework internals directly; integrators implement
//! these accessor traits for their agent, model, tool and step-log types.
//! Anything a framework object may not carry is an `Option` and is simply not
//! emitted when absent.

use crate::value::{ArgMap, short_type_name};

/// Cumulative token counters kept by an agent across a run.
pub trait TokenMonitor {
    fn total_input_token_count(&self) -> u64;
    fn total_output_token_count(&self) -> u64;
}

/// A language model as seen by the model and run wrappers.
pub trait ModelSurface {
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn model_id(&self) -> Option<&str> {
        None
    }

    /// Keyword configuration stored on the model (temperature, max tokens, ...).
    fn kwargs(&self) -> ArgMap {
        ArgMap::new()
    }

    /// Prompt tokens consumed by the most recent call.
    fn last_input_token_count(&self) -> Option<u64> {
        None
    }

    /// Completion tokens produced by the most recent call.
    fn last_output_token_count(&self) -> Option<u64> {
        None
    }
}

/// The message a model call returns.
pub trait ModelOutput {
    fn role(&self) -> Option<&str>;
    fn content(&self) -> Option<&str>;
    /// JSON export of the whole message.
    fn to_json(&self) -> String;
}

/// A tool, either being invoked or offered to a model.
pub trait ToolSurface {
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Registered tool name, as the model refers to it.
    fn name(&self) -> &str;

    /// Function-calling schema the framework derives for this tool.
    fn json_schema(&self) -> serde_json::Value;
}

/// A sub-agent managed by another agent.
pub trait ManagedAgent {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn additional_prompting(&self) -> Option<&str> {
        None
    }
    fn agent(&self) -> &dyn AgentDescriptor;
}

/// Live view over an agent instance for the duration of one interception.
pub trait AgentDescriptor {
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Task text of the current run, if one has been assigned.
    fn task(&self) -> Option<String>;

    fn model(&self) -> &dyn ModelSurface;

    fn max_steps(&self) -> usize;

    fn tool_names(&self) -> Vec<String>;

    fn managed_agents(&self) -> Vec<&dyn ManagedAgent> {
        Vec::new()
    }

    fn monitor(&self) -> &dyn TokenMonitor;
}

/// The per-step log an agent step fills in while it executes.
pub trait StepLog {
    fn step_number(&self) -> usize;
    fn error(&self) -> Option<String>;
    fn observations(&self) -> Option<&str>;
}

/// `<ModelType>` or `<ModelType> - <model_id>`.
pub fn model_descriptor(model: &dyn ModelSurface) -> String {
    match model.model_id() {
        Some(model_id) => format!("{} - {model_id}", model.type_name()),
        None => model.type_name().to_string(),
    }
}
