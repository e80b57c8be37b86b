use agentic_flows_core::{
    CancellationToken, FlowError, GenerateRequest, RoutingClassifier,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;

/// Input of [`Flows::router`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouterRequest {
    /// The user's query.
    pub query: String,
}

impl Flows {
    /// Answers a query either as a question or as a creative request,
    /// depending on how the model classifies it.
    pub async fn router(
        &self,
        req: RouterRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let question = self.engine.clone();
        let question_cancel = cancel.clone();
        let creative = self.engine.clone();
        let creative_cancel = cancel.clone();

        RoutingClassifier::new(self.engine.clone())
            .with_instructions(
                "Classify the user's query as either a 'question' or a \
                 'creative' request.",
            )
            .branch("question", move |query| {
                let engine = question.clone();
                let cancel = question_cancel.clone();
                async move {
                    let prompt =
                        format!("Answer the following question: {query}");
                    engine
                        .generate(GenerateRequest::prompt(prompt), None, &cancel)
                        .await
                        .map(|answer| answer.text())
                }
            })
            .branch("creative", move |query| {
                let engine = creative.clone();
                let cancel = creative_cancel.clone();
                async move {
                    let prompt = format!("Write a short poem about: {query}");
                    engine
                        .generate(GenerateRequest::prompt(prompt), None, &cancel)
                        .await
                        .map(|poem| poem.text())
                }
            })
            .route(req.query, cancel)
            .await
    }
}
