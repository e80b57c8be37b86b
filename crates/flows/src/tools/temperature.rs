use std::future::ready;

use agentic_flows_core::tool::{Error as ToolError, Tool};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

const CELSIUS: &str = "celsius";
const FAHRENHEIT: &str = "fahrenheit";

#[derive(Deserialize, JsonSchema)]
pub struct TemperatureParameters {
    #[serde(default)]
    #[schemars(description = "The temperature to convert.")]
    temperature: f64,
    #[schemars(description = "Unit to convert from (celsius or fahrenheit).")]
    from: String,
    #[schemars(description = "Unit to convert to (celsius or fahrenheit).")]
    to: String,
}

/// A tool for converting temperatures between celsius and fahrenheit.
pub struct TemperatureTool {
    parameter_schema: Value,
}

impl TemperatureTool {
    /// Creates a new temperature tool.
    #[inline]
    pub fn new() -> Self {
        TemperatureTool {
            parameter_schema: schema_for!(TemperatureParameters).to_value(),
        }
    }
}

impl Default for TemperatureTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for TemperatureTool {
    type Input = TemperatureParameters;
    type Output = f64;

    fn name(&self) -> &str {
        "convertTemperature"
    }

    fn description(&self) -> &str {
        "Converts temperature from one unit to another."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: TemperatureParameters,
    ) -> impl Future<Output = Result<f64, ToolError>> + Send + 'static {
        ready(convert(input.temperature, &input.from, &input.to))
    }
}

fn convert(temperature: f64, from: &str, to: &str) -> Result<f64, ToolError> {
    if from == to {
        return Ok(temperature);
    }
    match (from, to) {
        (CELSIUS, FAHRENHEIT) => Ok(temperature * 9.0 / 5.0 + 32.0),
        (FAHRENHEIT, CELSIUS) => Ok((temperature - 32.0) * 5.0 / 9.0),
        _ => Err(ToolError::execution_error()
            .with_reason("invalid temperature conversion units")),
    }
}

#[cfg(test)]
mod tests {
    use agentic_flows_core::tool::{ErrorKind, ToolRegistry};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_convert() {
        assert_eq!(convert(100.0, CELSIUS, FAHRENHEIT).unwrap(), 212.0);
        assert_eq!(convert(212.0, FAHRENHEIT, CELSIUS).unwrap(), 100.0);
        assert_eq!(convert(-40.0, CELSIUS, CELSIUS).unwrap(), -40.0);
        // Identical units pass through even when they're unknown.
        assert_eq!(convert(7.0, "kelvin", "kelvin").unwrap(), 7.0);

        let err = convert(1.0, "x", "y").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
        assert_eq!(err.reason(), "invalid temperature conversion units");
    }

    #[tokio::test]
    async fn test_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(TemperatureTool::new());

        let output = registry
            .invoke(
                "convertTemperature",
                json!({ "temperature": 100, "from": "celsius", "to": "fahrenheit" }),
            )
            .await
            .unwrap();
        assert_eq!(output, json!(212.0));

        // A missing temperature is zero.
        let output = registry
            .invoke(
                "convertTemperature",
                json!({ "from": "celsius", "to": "fahrenheit" }),
            )
            .await
            .unwrap();
        assert_eq!(output, json!(32.0));

        let err = registry
            .invoke("convertTemperature", json!({ "from": "celsius" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
