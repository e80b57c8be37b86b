mod builder;

use std::sync::Arc;

use agentic_flows_model::{
    Message, ModelConfig, ModelFinishReason, ModelRequest, ToolCallRequest,
    ToolCallResponse, ToolOutput,
};
use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Map;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub use builder::TurnEngineBuilder;

use crate::config::{FlowConfig, ToolErrorPolicy};
use crate::error::FlowError;
use crate::generate::{GenerateRequest, Generation};
use crate::history::History;
use crate::interrupt::{Interrupt, prepare_resume};
use crate::model_client::ModelClient;
use crate::or_cancel;
use crate::stream::Emitter;
use crate::structured::{output_schema, parse_output};
use crate::tool::{ErrorKind as ToolErrorKind, ToolRegistry};

/// The outcome of a turn engine run.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnResult {
    /// The model finished answering.
    Completed {
        /// Text of the final model message.
        text: String,
        /// The history including the final model message.
        history: History,
    },
    /// One or more tool calls are waiting for outside input.
    ///
    /// Pass the history back to [`TurnEngine::resume`] together with a
    /// response for every interrupt.
    Interrupted {
        /// The suspended tool calls, in request order.
        interrupts: Vec<Interrupt>,
        /// The history up to the suspension.
        history: History,
    },
    /// The run failed.
    Failed(FlowError),
}

/// Drives multi-turn exchanges between the model and the tools.
///
/// An engine is cheap to clone and holds no per-run state, so one engine
/// can serve any number of concurrent runs.
#[derive(Clone)]
pub struct TurnEngine {
    model_client: ModelClient,
    tools: Arc<ToolRegistry>,
    config: FlowConfig,
}

enum Dispatch {
    Done(Vec<ToolCallResponse>),
    Suspended {
        responses: Vec<ToolCallResponse>,
        interrupts: Vec<Interrupt>,
    },
}

impl TurnEngine {
    /// Returns the configuration of this engine.
    #[inline]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Returns the tools offered to the model.
    #[inline]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Returns an engine sharing the model with a different toolset.
    #[inline]
    pub fn with_tools(&self, tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            ..self.clone()
        }
    }

    /// Returns an engine with a different model call budget.
    #[inline]
    pub fn with_max_turns(&self, max_turns: usize) -> Self {
        let mut engine = self.clone();
        engine.config.max_turns = max_turns;
        engine
    }

    /// Runs the exchange until the model stops, a tool interrupts, or the
    /// model call budget is used up.
    ///
    /// Text deltas of every model call are emitted to `sink` as data
    /// chunks.
    pub async fn run(
        &self,
        history: History,
        sink: Option<&Emitter<String>>,
        cancel: &CancellationToken,
    ) -> TurnResult {
        self.run_loop(history, sink, cancel)
            .instrument(debug_span!("turn engine run"))
            .await
    }

    /// Resumes an interrupted run with a response for every interrupt.
    ///
    /// Responses are matched by id, so their order doesn't matter.
    pub async fn resume(
        &self,
        history: History,
        resolved: Vec<ToolCallResponse>,
        sink: Option<&Emitter<String>>,
        cancel: &CancellationToken,
    ) -> TurnResult {
        let history = match prepare_resume(history, resolved) {
            Ok(history) => history,
            Err(err) => return TurnResult::Failed(err),
        };
        self.run_loop(history, sink, cancel)
            .instrument(debug_span!("turn engine resume"))
            .await
    }

    /// Issues exactly one model call without any tool.
    ///
    /// Settings left unset in the request are taken from the engine
    /// configuration.
    pub async fn generate(
        &self,
        request: GenerateRequest,
        sink: Option<&Emitter<String>>,
        cancel: &CancellationToken,
    ) -> Result<Generation, FlowError> {
        let GenerateRequest { messages, config } = request;
        let req = ModelRequest {
            messages,
            tools: vec![],
            config: self.merge_config(config),
        };
        let on_delta = sink.map(Emitter::delta_fn);
        or_cancel(cancel, self.model_client.send_request(req, on_delta)).await
    }

    /// Issues exactly one model call asking for output of type `T`.
    ///
    /// The JSON schema of `T` is attached to the request, and the reply is
    /// parsed into `T`. Output that doesn't parse is a
    /// [`FlowError::Generation`].
    pub async fn generate_data<T>(
        &self,
        mut request: GenerateRequest,
        sink: Option<&Emitter<String>>,
        cancel: &CancellationToken,
    ) -> Result<T, FlowError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        request.config.output_schema = Some(output_schema::<T>());
        let generation = self.generate(request, sink, cancel).await?;
        parse_output(&generation.text())
    }

    fn merge_config(&self, config: ModelConfig) -> ModelConfig {
        let defaults = self.config.text_model_config();
        ModelConfig {
            model: config.model.or(defaults.model),
            temperature: config.temperature.or(defaults.temperature),
            output_schema: config.output_schema,
        }
    }

    async fn run_loop(
        &self,
        mut history: History,
        sink: Option<&Emitter<String>>,
        cancel: &CancellationToken,
    ) -> TurnResult {
        let on_delta = sink.map(Emitter::delta_fn);
        let definitions = self.tools.definitions();
        let max_turns = self.config.max_turns;

        for turn in 0..max_turns {
            trace!("turn {turn}: calling the model");
            let req = ModelRequest {
                messages: history.messages().to_vec(),
                tools: definitions.clone(),
                config: self.config.text_model_config(),
            };
            let generation = match or_cancel(
                cancel,
                self.model_client.send_request(req, on_delta.clone()),
            )
            .await
            {
                Ok(generation) => generation,
                Err(err) => return TurnResult::Failed(err),
            };

            let text = generation.text();
            let requests: Vec<ToolCallRequest> =
                generation.tool_requests().cloned().collect();
            history.push(generation.message);

            match generation.finish_reason {
                ModelFinishReason::Stop if requests.is_empty() => {
                    return TurnResult::Completed { text, history };
                }
                ModelFinishReason::Stop => {
                    warn!(
                        "the model stopped with {} tool request(s), dispatching them",
                        requests.len()
                    );
                }
                ModelFinishReason::Interrupted => {
                    debug!(
                        "the model suspended the turn with {} tool request(s)",
                        requests.len()
                    );
                    let interrupts = requests
                        .into_iter()
                        .map(|request| Interrupt {
                            request,
                            metadata: Map::new(),
                        })
                        .collect();
                    return TurnResult::Interrupted {
                        interrupts,
                        history,
                    };
                }
                ModelFinishReason::ToolCalls if requests.is_empty() => {
                    return TurnResult::Failed(FlowError::unusable_output(
                        "the model asked for tool calls but requested none",
                    ));
                }
                ModelFinishReason::ToolCalls => {}
            }

            match self.dispatch(requests, cancel).await {
                Ok(Dispatch::Done(responses)) => {
                    history.push(Message::tool(responses));
                }
                Ok(Dispatch::Suspended {
                    responses,
                    interrupts,
                }) => {
                    debug!("{} tool call(s) interrupted", interrupts.len());
                    if !responses.is_empty() {
                        history.push(Message::tool(responses));
                    }
                    return TurnResult::Interrupted {
                        interrupts,
                        history,
                    };
                }
                Err(err) => return TurnResult::Failed(err),
            }
        }

        warn!("turn budget of {max_turns} model calls exceeded");
        TurnResult::Failed(FlowError::TurnBudgetExceeded { max_turns })
    }

    /// Runs a batch of tool calls concurrently. Results are recorded in
    /// request order.
    async fn dispatch(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> Result<Dispatch, FlowError> {
        let calls = requests
            .iter()
            .map(|req| self.tools.invoke(&req.name, req.arguments.clone()));
        let results = or_cancel(cancel, async { Ok(join_all(calls).await) }).await?;

        let mut responses = Vec::with_capacity(requests.len());
        let mut interrupts = vec![];
        for (req, result) in requests.into_iter().zip(results) {
            let output = match result {
                Ok(value) => ToolOutput::Value(value),
                Err(err) if err.is_interrupt() => {
                    interrupts.push(Interrupt {
                        request: req,
                        metadata: err.into_metadata(),
                    });
                    continue;
                }
                Err(err) => match self.config.tool_errors {
                    ToolErrorPolicy::ReportToModel => {
                        warn!("tool `{}` failed: {err}", req.name);
                        ToolOutput::Error(err.to_string())
                    }
                    ToolErrorPolicy::Escalate => {
                        error!("tool `{}` failed: {err}", req.name);
                        return Err(if err.kind() == ToolErrorKind::NotFound {
                            FlowError::ToolNotFound(req.name)
                        } else {
                            FlowError::ToolExecution {
                                name: req.name,
                                reason: err.reason().into_owned(),
                            }
                        });
                    }
                },
            };
            responses.push(ToolCallResponse {
                id: req.id,
                name: req.name,
                output,
            });
        }

        if interrupts.is_empty() {
            Ok(Dispatch::Done(responses))
        } else {
            Ok(Dispatch::Suspended {
                responses,
                interrupts,
            })
        }
    }
}
