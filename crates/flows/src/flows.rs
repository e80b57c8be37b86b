use std::sync::Arc;

use agentic_flows_core::tool::ToolRegistry;
use agentic_flows_core::{
    FlowConfig, FlowError, InMemorySessionStore, SessionStore, TurnEngine,
    TurnEngineBuilder, TurnResult,
};
use agentic_flows_model::ModelProvider;

use crate::tools::*;

/// A flows builder.
///
/// See [`Flows`].
pub struct FlowsBuilder {
    engine_builder: TurnEngineBuilder,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl FlowsBuilder {
    /// Creates a flows builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let engine_builder = TurnEngineBuilder::with_model_provider(provider);
        Self {
            engine_builder,
            sessions: None,
        }
    }

    /// Sets the configuration shared by all flows.
    #[inline]
    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.engine_builder = self.engine_builder.with_config(config);
        self
    }

    /// Sets the store keeping chat histories. An in-memory store is used
    /// if none is set.
    #[inline]
    pub fn with_session_store<S: SessionStore + 'static>(
        mut self,
        store: S,
    ) -> Self {
        self.sessions = Some(Arc::new(store));
        self
    }

    /// Builds the flows.
    pub fn build(self) -> Flows {
        let engine = self.engine_builder.build();
        let sessions = self
            .sessions
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));

        let mut weather_tools = ToolRegistry::new();
        weather_tools.register(WeatherTool::new());

        let mut research_tools = ToolRegistry::new();
        research_tools.register(SearchWebTool::new());
        research_tools.register(AskUserTool::new());

        let mut chat_tools = ToolRegistry::new();
        chat_tools.register(TemperatureTool::new());

        let menu = MenuIndex::new();
        let mut rag_tools = ToolRegistry::new();
        rag_tools.register(MenuRagTool::new(menu.clone()));

        Flows {
            weather_engine: engine.with_tools(Arc::new(weather_tools)),
            research_engine: engine.with_tools(Arc::new(research_tools)),
            chat_engine: engine.with_tools(Arc::new(chat_tools)),
            rag_engine: engine.with_tools(Arc::new(rag_tools)),
            engine,
            sessions,
            menu,
        }
    }
}

/// The flow catalogue.
///
/// The value is cheap to clone, and clones share the model provider, the
/// session store and the menu index.
#[derive(Clone)]
pub struct Flows {
    /// Engine without tools, for single-shot generations.
    pub(crate) engine: TurnEngine,
    pub(crate) weather_engine: TurnEngine,
    pub(crate) research_engine: TurnEngine,
    pub(crate) chat_engine: TurnEngine,
    pub(crate) rag_engine: TurnEngine,
    pub(crate) sessions: Arc<dyn SessionStore>,
    pub(crate) menu: MenuIndex,
}

impl Flows {
    /// Returns the configuration shared by all flows.
    #[inline]
    pub fn config(&self) -> &FlowConfig {
        self.engine.config()
    }

    /// Returns the store keeping chat histories.
    #[inline]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Returns the menu index searched by [`Flows::agentic_rag`].
    #[inline]
    pub fn menu(&self) -> &MenuIndex {
        &self.menu
    }
}

/// Returns the final text of a run that isn't expected to suspend.
pub(crate) fn completed_text(result: TurnResult) -> Result<String, FlowError> {
    match result {
        TurnResult::Completed { text, .. } => Ok(text),
        TurnResult::Interrupted { .. } => Err(FlowError::unusable_output(
            "the turn was suspended but nothing can answer it",
        )),
        TurnResult::Failed(err) => Err(err),
    }
}
