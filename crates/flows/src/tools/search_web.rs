use std::future::ready;

use agentic_flows_core::tool::{Error as ToolError, Tool};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, JsonSchema)]
pub struct SearchWebParameters {
    #[schemars(description = "What to search for.")]
    query: String,
}

/// A tool for searching the web.
///
/// Results are canned, no search engine is queried.
pub struct SearchWebTool {
    parameter_schema: Value,
}

impl SearchWebTool {
    /// Creates a new search tool.
    #[inline]
    pub fn new() -> Self {
        SearchWebTool {
            parameter_schema: schema_for!(SearchWebParameters).to_value(),
        }
    }
}

impl Default for SearchWebTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SearchWebTool {
    type Input = SearchWebParameters;
    type Output = String;

    fn name(&self) -> &str {
        "searchWeb"
    }

    fn description(&self) -> &str {
        "Search the web for information on a given topic."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: SearchWebParameters,
    ) -> impl Future<Output = Result<String, ToolError>> + Send + 'static {
        ready(Ok(format!("You found search results for: {}", input.query)))
    }
}
