use std::future::ready;

use agentic_flows_core::tool::{Error as ToolError, Tool};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, JsonSchema)]
pub struct WeatherParameters {
    #[schemars(description = "The city or region to look up.")]
    location: String,
}

/// A tool reporting the current weather of a location.
///
/// The report is canned, no weather service is queried.
pub struct WeatherTool {
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates a new weather tool.
    #[inline]
    pub fn new() -> Self {
        WeatherTool {
            parameter_schema: schema_for!(WeatherParameters).to_value(),
        }
    }
}

impl Default for WeatherTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherTool {
    type Input = WeatherParameters;
    type Output = String;

    fn name(&self) -> &str {
        "getWeather"
    }

    fn description(&self) -> &str {
        "Get the current weather in a given location."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WeatherParameters,
    ) -> impl Future<Output = Result<String, ToolError>> + Send + 'static {
        let location = input.location.trim();
        if location.is_empty() {
            return ready(Err(ToolError::invalid_input()
                .with_reason("`location` must not be empty")));
        }
        ready(Ok(format!("The weather in {location} is 75°F and sunny.")))
    }
}
