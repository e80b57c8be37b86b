use std::pin::Pin;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::engine::TurnEngine;
use crate::error::FlowError;
use crate::generate::GenerateRequest;
use crate::or_cancel;
use crate::structured::parse_output;

/// What the fallback branch answers unless replaced.
pub const FALLBACK_RESPONSE: &str =
    "Sorry, I couldn't determine how to handle your request.";

const DEFAULT_INSTRUCTIONS: &str = "Classify the intent of the user's \
request. Answer with a JSON object whose `intent` is one of the allowed \
labels.";

type BranchFuture = Pin<Box<dyn Future<Output = Result<String, FlowError>> + Send>>;
type BranchFn = Box<dyn Fn(String) -> BranchFuture + Send + Sync>;

/// The branch a classification selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// A known label.
    Branch(String),
    /// The label was unknown or missing.
    Fallback {
        /// The label the model answered, if there was one.
        label: Option<String>,
    },
}

/// Classifies a request into one of a closed set of labels with a single
/// structured model call, then runs the branch registered for the label.
pub struct RoutingClassifier {
    engine: TurnEngine,
    instructions: String,
    branches: Vec<(String, BranchFn)>,
    fallback: Option<BranchFn>,
}

impl RoutingClassifier {
    /// Creates a classifier without any branch.
    #[inline]
    pub fn new(engine: TurnEngine) -> Self {
        Self {
            engine,
            instructions: DEFAULT_INSTRUCTIONS.to_owned(),
            branches: vec![],
            fallback: None,
        }
    }

    /// Replaces the system instructions of the classification call.
    #[inline]
    pub fn with_instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Adds a branch handling requests classified as `label`.
    pub fn branch<S, F, Fut>(mut self, label: S, handler: F) -> Self
    where
        S: Into<String>,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, FlowError>> + Send + 'static,
    {
        let handler: BranchFn = Box::new(move |input| Box::pin(handler(input)));
        self.branches.push((label.into(), handler));
        self
    }

    /// Replaces the branch handling unrecognized requests, which answers
    /// [`FALLBACK_RESPONSE`] by default.
    pub fn fallback<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, FlowError>> + Send + 'static,
    {
        self.fallback = Some(Box::new(move |input| Box::pin(handler(input))));
        self
    }

    /// Returns the labels in registration order.
    pub fn labels(&self) -> Vec<&str> {
        self.branches.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Returns the output schema of the classification call, which only
    /// admits the registered labels.
    pub fn classification_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "intent": { "type": "string", "enum": self.labels() }
            },
            "required": ["intent"],
            "additionalProperties": false
        })
    }

    /// Maps a classification output to a decision.
    pub fn decide(&self, output: &Value) -> RouteDecision {
        let label = output.get("intent").and_then(Value::as_str).map(str::trim);
        match label {
            Some(label) if self.branches.iter().any(|(l, _)| l == label) => {
                RouteDecision::Branch(label.to_owned())
            }
            label => {
                warn!("routing is ambiguous, falling back (label: {label:?})");
                RouteDecision::Fallback {
                    label: label.map(str::to_owned),
                }
            }
        }
    }

    /// Classifies `input`.
    ///
    /// Output that can't be parsed is routed to the fallback. A failed
    /// model call is an error.
    pub async fn classify(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<RouteDecision, FlowError> {
        let mut request =
            GenerateRequest::prompt(input).with_system(self.instructions.as_str());
        request.config.output_schema = Some(self.classification_schema());
        let generation = self.engine.generate(request, None, cancel).await?;
        match parse_output::<Value>(&generation.text()) {
            Ok(output) => Ok(self.decide(&output)),
            Err(err) => {
                warn!("routing is ambiguous, falling back: {err}");
                Ok(RouteDecision::Fallback { label: None })
            }
        }
    }

    /// Runs the branch `decision` selected.
    pub async fn dispatch(
        &self,
        decision: &RouteDecision,
        input: String,
    ) -> Result<String, FlowError> {
        let handler = match decision {
            RouteDecision::Branch(label) => self
                .branches
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, handler)| handler),
            RouteDecision::Fallback { .. } => None,
        };
        match handler.or(self.fallback.as_ref()) {
            Some(handler) => handler(input).await,
            None => Ok(FALLBACK_RESPONSE.to_owned()),
        }
    }

    /// Classifies `input` and runs the selected branch.
    pub async fn route(
        &self,
        input: String,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let decision = self.classify(&input, cancel).await?;
        debug!("routing decision: {decision:?}");
        or_cancel(cancel, self.dispatch(&decision, input)).await
    }
}
