//! Core logic of the flows: the turn engine, tool execution, interrupts,
//! fan-out, refinement, routing, sessions and streaming.
//!
//! Every flow talks to the model through the same narrow interface from
//! [`agentic_flows_model`], and every entry point observes a
//! [`CancellationToken`] so callers can layer deadlines on top.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod config;
mod engine;
pub mod error;
mod fanout;
mod generate;
pub mod history;
pub mod interrupt;
mod model_client;
mod refine;
mod route;
pub mod session;
pub mod stream;
pub mod structured;
pub mod tool;

pub use config::{FlowConfig, FlowConfigBuilder, RetryConfig, ToolErrorPolicy};
pub use engine::{TurnEngine, TurnEngineBuilder, TurnResult};
pub use error::{ErrorPayload, FlowError};
pub use fanout::{FanOutCoordinator, FanOutResult};
pub use generate::{GenerateRequest, Generation};
pub use history::History;
pub use interrupt::{Interrupt, InterruptDetails};
pub use refine::{Evaluation, RefinementLoop, RefinementState};
pub use route::{FALLBACK_RESPONSE, RouteDecision, RoutingClassifier};
pub use session::{InMemorySessionStore, SessionStore};
pub use stream::{Emitter, StreamChunk};
pub use tokio_util::sync::CancellationToken;

/// Awaits `fut` unless `cancel` fires first.
pub(crate) async fn or_cancel<T, F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, FlowError>
where
    F: Future<Output = Result<T, FlowError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("cancelled");
            Err(FlowError::Cancelled)
        }
        result = fut => result,
    }
}
