use std::future::ready;

use agentic_flows_core::interrupt::InterruptDetails;
use agentic_flows_core::tool::{Error as ToolError, Tool};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TOOL_NAME: &str = "askUser";

#[derive(Deserialize, JsonSchema)]
pub struct AskUserParameters {
    #[schemars(description = "The clarifying question to ask.")]
    question: String,
}

/// The metadata of an `askUser` interrupt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskUserQuestion {
    /// The question the model wants answered.
    pub question: String,
}

impl InterruptDetails for AskUserQuestion {
    const TOOL_NAME: &'static str = TOOL_NAME;
}

/// A tool that lets the model ask the user a clarifying question.
///
/// The tool never answers by itself: every call suspends the turn, and the
/// user's answer becomes the tool output once the turn is resumed.
pub struct AskUserTool {
    parameter_schema: Value,
}

impl AskUserTool {
    /// Creates a new ask user tool.
    #[inline]
    pub fn new() -> Self {
        AskUserTool {
            parameter_schema: schema_for!(AskUserParameters).to_value(),
        }
    }
}

impl Default for AskUserTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for AskUserTool {
    type Input = AskUserParameters;
    type Output = String;

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Ask the user a clarifying question."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: AskUserParameters,
    ) -> impl Future<Output = Result<String, ToolError>> + Send + 'static {
        let mut metadata = Map::new();
        metadata.insert("question".to_owned(), Value::String(input.question));
        ready(Err(ToolError::interrupt(metadata)))
    }
}
