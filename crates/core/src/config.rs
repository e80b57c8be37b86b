//! Runtime configurations shared by every flow.

use std::time::Duration;

use agentic_flows_model::ModelConfig;
use serde::{Deserialize, Serialize};

/// How the turn engine treats a failing tool call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolErrorPolicy {
    /// The error text is sent back to the model as a tool-error response,
    /// so the model may correct itself and try again.
    #[default]
    ReportToModel,
    /// The run fails with the tool error.
    Escalate,
}

/// Exponential backoff applied to rate limited model calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds.
    pub initial_interval_ms: u64,
    /// Total time spent retrying before giving up, in milliseconds.
    pub max_elapsed_ms: u64,
}

impl RetryConfig {
    #[inline]
    pub(crate) fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    #[inline]
    pub(crate) fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_elapsed_ms: 10_000,
        }
    }
}

/// Configuration of the flows.
///
/// Missing fields take their default values when deserialized, so a
/// partial JSON document such as `{"maxTurns": 8}` is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    /// Maximum number of model calls in one turn engine run.
    pub max_turns: usize,
    /// Maximum number of evaluate/refine rounds of a refinement loop.
    pub max_iterations: usize,
    /// Maximum number of fan-out tasks running at the same time.
    pub fan_out_concurrency: usize,
    /// See [`ToolErrorPolicy`].
    pub tool_errors: ToolErrorPolicy,
    /// Text model name, left to the provider when unset.
    pub model: Option<String>,
    /// Image model name, left to the provider when unset.
    pub image_model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Retry policy for rate limited model calls. No retry when unset.
    pub retry: Option<RetryConfig>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_turns: 5,
            max_iterations: 3,
            fan_out_concurrency: 4,
            tool_errors: ToolErrorPolicy::default(),
            model: None,
            image_model: None,
            temperature: None,
            retry: None,
        }
    }
}

impl FlowConfig {
    /// Returns a builder starting from the default configuration.
    #[inline]
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder::default()
    }

    /// Model settings for text generation.
    pub fn text_model_config(&self) -> ModelConfig {
        ModelConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            output_schema: None,
        }
    }

    /// Model settings for image generation.
    pub fn image_model_config(&self) -> ModelConfig {
        ModelConfig {
            model: self.image_model.clone(),
            temperature: None,
            output_schema: None,
        }
    }
}

/// [`FlowConfig`] builder.
#[derive(Default)]
pub struct FlowConfigBuilder {
    config: FlowConfig,
}

impl FlowConfigBuilder {
    /// Sets the model call budget of a turn engine run.
    #[inline]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.config.max_turns = max_turns;
        self
    }

    /// Sets the round budget of a refinement loop.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Sets the concurrency limit of fan-out tasks.
    #[inline]
    pub fn with_fan_out_concurrency(mut self, limit: usize) -> Self {
        self.config.fan_out_concurrency = limit;
        self
    }

    /// Sets the tool error policy.
    #[inline]
    pub fn with_tool_errors(mut self, policy: ToolErrorPolicy) -> Self {
        self.config.tool_errors = policy;
        self
    }

    /// Sets the text model name.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Sets the image model name.
    #[inline]
    pub fn with_image_model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.image_model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Enables retrying rate limited model calls.
    #[inline]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> FlowConfig {
        self.config
    }
}
