//! A catalogue of agentic flows built on the orchestration core.
//!
//! Every flow is an async method on [`Flows`] taking a serde request type
//! and a [`CancellationToken`](core::CancellationToken). Flows share one
//! model provider and one session store, and any number of them can run
//! concurrently on the same [`Flows`] value.
//!
//! The crate includes a few demo tools, see [`tools`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
mod chat;
mod flows;
mod media;
mod parallel;
mod rag;
mod refinement;
mod routing;
mod sequential;
mod storybook;
pub mod tools;

pub use agent::{
    PendingQuestion, ResearchAgentRequest, ResearchAgentResumeRequest,
    ResearchOutcome, ToolCallingRequest,
};
pub use chat::{ChatHistoryRequest, StatefulChatRequest};
pub use flows::{Flows, FlowsBuilder};
pub use media::{CartoonifyRequest, IllustrateRequest};
pub use parallel::{MarketingCopy, MarketingCopyRequest};
pub use rag::AgenticRagRequest;
pub use refinement::IterativeRefinementRequest;
pub use routing::RouterRequest;
pub use sequential::{ImageGeneratorRequest, StoryWriterRequest};
pub use storybook::{Storybook, StorybookPage, StorifyRequest};

/// Re-exports of [`agentic_flows_core`] crate.
pub mod core {
    pub use agentic_flows_core::*;
}
