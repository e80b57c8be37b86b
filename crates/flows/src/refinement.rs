use agentic_flows_core::{
    CancellationToken, Emitter, Evaluation, FlowError, GenerateRequest,
    RefinementLoop, RefinementState,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;

/// Input of [`Flows::iterative_refinement`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IterativeRefinementRequest {
    /// What the blog post is about.
    pub topic: String,
}

impl Flows {
    /// Writes a short blog post, then lets the model critique and revise
    /// it until the critique is satisfied or the configured number of
    /// rounds is used up.
    ///
    /// `emitter` receives the progress and every new draft.
    pub async fn iterative_refinement(
        &self,
        req: IterativeRefinementRequest,
        emitter: Option<&Emitter<RefinementState>>,
        cancel: &CancellationToken,
    ) -> Result<RefinementState, FlowError> {
        let engine = &self.engine;
        let seed = async {
            let prompt = format!(
                "Write a short, single-paragraph blog post about: {}.",
                req.topic
            );
            engine
                .generate(GenerateRequest::prompt(prompt), None, cancel)
                .await
                .map(|draft| draft.text())
        };
        let evaluate = |content: String| async move {
            let prompt = format!(
                "Critique the following blog post. Is it clear, concise, and \
                 engaging? Provide specific feedback for improvement. Post: \
                 \"{content}\""
            );
            engine
                .generate_data::<Evaluation>(
                    GenerateRequest::prompt(prompt),
                    None,
                    cancel,
                )
                .await
        };
        let refine = |content: String, evaluation: Evaluation| async move {
            let prompt = format!(
                "Revise the following blog post based on the feedback \
                 provided.\nPost: \"{content}\"\nFeedback: \"{}\"",
                evaluation.critique
            );
            engine
                .generate(GenerateRequest::prompt(prompt), None, cancel)
                .await
                .map(|draft| draft.text())
        };

        RefinementLoop::new(self.config().max_iterations)
            .run(seed, evaluate, refine, emitter, cancel)
            .await
    }
}
