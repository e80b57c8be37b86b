use std::sync::Arc;

use agentic_flows_model::ModelProvider;

use super::TurnEngine;
use crate::config::FlowConfig;
use crate::model_client::ModelClient;
use crate::tool::{Tool, ToolRegistry};

/// [`TurnEngine`] builder.
pub struct TurnEngineBuilder {
    model_client: ModelClient,
    tools: ToolRegistry,
    config: FlowConfig,
}

impl TurnEngineBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: ToolRegistry::new(),
            config: FlowConfig::default(),
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Replaces the toolset.
    #[inline]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the configuration.
    #[inline]
    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine.
    #[inline]
    pub fn build(self) -> TurnEngine {
        let Self {
            model_client,
            tools,
            config,
        } = self;
        TurnEngine {
            model_client: model_client.with_retry(config.retry),
            tools: Arc::new(tools),
            config,
        }
    }
}
