//! Sends one traced agent run to an OpenInference collector such as Phoenix.
//!
//! ```sh
//! cargo run -p autoagents-openinference --example phoenix -- --otlp-endpoint http://0.0.0.0:6006
//! ```

use autoagents_openinference::surface::{
    AgentDescriptor, ModelOutput, ModelSurface, TokenMonitor, ToolSurface,
};
use autoagents_openinference::{
    ArgMap, ArgValue, Instrumentor, InstrumentError, Invocation, OtlpConfig, OtlpProtocol,
    Parameter, Signature, TelemetryConfig, TelemetryError, init_telemetry,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = "What is 10 + 5?")]
    prompt: String,
    #[arg(long, default_value = "http://0.0.0.0:6006")]
    otlp_endpoint: String,
    #[arg(long, default_value = "http-binary")]
    otlp_protocol: String,
    #[arg(long)]
    otlp_header: Vec<String>,
    #[arg(long, default_value_t = false)]
    stdout: bool,
    #[arg(long, default_value_t = false)]
    otlp_debug: bool,
    #[arg(long, default_value = "openinference-example")]
    service_name: String,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    Agent(String),
}

impl<E: std::error::Error> From<InstrumentError<E>> for DemoError {
    fn from(err: InstrumentError<E>) -> Self {
        DemoError::Agent(err.to_string())
    }
}

#[derive(Debug, Default)]
struct Usage {
    input: u64,
    output: u64,
}

impl TokenMonitor for Usage {
    fn total_input_token_count(&self) -> u64 {
        self.input
    }

    fn total_output_token_count(&self) -> u64 {
        self.output
    }
}

#[derive(Debug, Default)]
struct ScriptedModel {
    usage: Option<(u64, u64)>,
}

impl ModelSurface for ScriptedModel {
    fn model_id(&self) -> Option<&str> {
        Some("scripted-1")
    }

    fn kwargs(&self) -> ArgMap {
        ArgMap::from([("temperature", 0.2)])
    }

    fn last_input_token_count(&self) -> Option<u64> {
        self.usage.map(|(input, _)| input)
    }

    fn last_output_token_count(&self) -> Option<u64> {
        self.usage.map(|(_, output)| output)
    }
}

struct Message(String);

impl ModelOutput for Message {
    fn role(&self) -> Option<&str> {
        Some("assistant")
    }

    fn content(&self) -> Option<&str> {
        Some(&self.0)
    }

    fn to_json(&self) -> String {
        serde_json::json!({"role": "assistant", "content": self.0}).to_string()
    }
}

#[derive(Debug, Default)]
struct Addition;

impl ToolSurface for Addition {
    fn name(&self) -> &str {
        "addition"
    }

    fn json_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": "addition",
                "parameters": {
                    "type": "object",
                    "properties": {"left": {"type": "integer"}, "right": {"type": "integer"}}
                }
            }
        })
    }
}

#[derive(Debug, Default)]
struct MathAgent {
    model: ScriptedModel,
    addition: Addition,
    usage: Usage,
}

impl AgentDescriptor for MathAgent {
    fn task(&self) -> Option<String> {
        None
    }

    fn model(&self) -> &dyn ModelSurface {
        &self.model
    }

    fn max_steps(&self) -> usize {
        4
    }

    fn tool_names(&self) -> Vec<String> {
        vec![self.addition.name().to_string()]
    }

    fn monitor(&self) -> &dyn TokenMonitor {
        &self.usage
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct StepFailure(String);

fn telemetry_config(args: &Args) -> TelemetryConfig {
    let mut otlp = OtlpConfig::new(args.otlp_endpoint.clone());
    otlp.protocol = match args.otlp_protocol.as_str() {
        "http-json" => OtlpProtocol::HttpJson,
        _ => OtlpProtocol::HttpBinary,
    };
    otlp.debug_http = args.otlp_debug;
    for header in &args.otlp_header {
        if let Some((name, value)) = header.split_once('=') {
            otlp = otlp.with_header(name.trim(), value.trim());
        }
    }

    let config = TelemetryConfig::new(args.service_name.clone()).with_otlp(otlp);
    if args.stdout { config.with_stdout() } else { config }
}

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    let args = Args::parse();
    let telemetry = init_telemetry(&telemetry_config(&args))?;
    let instrumentor = Instrumentor::from_env();

    let run_sig = Signature::new([
        Parameter::positional("self"),
        Parameter::positional("task"),
        Parameter::keyword_only("additional_args").with_default(ArgValue::None),
    ]);
    let generate_sig = Signature::new([
        Parameter::positional("self"),
        Parameter::positional("messages"),
        Parameter::keyword_only("tools_to_call_from").with_default(ArgValue::None),
        Parameter::var_keyword("kwargs"),
    ]);
    let forward_sig = Signature::new([
        Parameter::positional("self"),
        Parameter::positional("left"),
        Parameter::positional("right"),
    ]);

    let mut agent = MathAgent::default();
    let prompt = args.prompt.clone();
    let answer = instrumentor
        .run()
        .call_async(
            &mut agent,
            &Invocation::new("run", &run_sig).arg(prompt.as_str()),
            async |agent: &mut MathAgent| -> Result<String, StepFailure> {
                let messages = ArgValue::from(vec![ArgValue::from(ArgMap::from([
                    ("role", "user"),
                    ("content", prompt.as_str()),
                ]))]);
                let plan = instrumentor
                    .model()
                    .call_async(
                        &mut agent.model,
                        &Invocation::new("generate", &generate_sig).arg(messages),
                        async |model: &mut ScriptedModel| {
                            model.usage = Some((24, 9));
                            Ok::<_, StepFailure>(Message("addition(10, 5)".to_string()))
                        },
                    )
                    .await
                    .map_err(|err| StepFailure(err.to_string()))?;
                agent.usage.input += 24;
                agent.usage.output += 9;

                let sum = instrumentor
                    .tool()
                    .call_async(
                        &mut agent.addition,
                        &Invocation::new("forward", &forward_sig).arg(10).arg(5),
                        async |_: &mut Addition| Ok::<i64, StepFailure>(10 + 5),
                    )
                    .await
                    .map_err(|err| StepFailure(err.to_string()))?;
                Ok(format!("{} = {sum}", plan.0))
            },
        )
        .await?;

    println!("Result: {answer}");
    telemetry.shutdown().await;
    Ok(())
}
