//! Flows letting the model drive tools on its own.

use agentic_flows_core::{
    CancellationToken, FlowError, History, Interrupt, TurnResult,
};
use agentic_flows_model::{Message, ToolCallResponse};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Flows;
use crate::flows::completed_text;
use crate::tools::AskUserQuestion;

const RESEARCH_SYSTEM_PROMPT: &str = "You are a helpful research assistant. \
Your goal is to provide a comprehensive answer to the user's task.";

/// Input of [`Flows::tool_calling`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallingRequest {
    /// The user's prompt.
    pub prompt: String,
}

/// Input of [`Flows::research_agent`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchAgentRequest {
    /// The task to research.
    pub task: String,
}

/// Input of [`Flows::research_agent_resume`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchAgentResumeRequest {
    /// The history of the suspended run.
    pub history: History,
    /// The user's answers, one per pending question.
    pub answers: Vec<ToolCallResponse>,
}

/// A question the research agent waits for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuestion {
    /// The id to answer with.
    pub request_id: String,
    /// The question, if the interrupt came from `askUser`.
    pub question: Option<String>,
    /// The raw interrupt.
    pub interrupt: Interrupt,
}

impl PendingQuestion {
    /// Builds the response carrying the user's answer.
    #[inline]
    pub fn answer<S: Into<String>>(&self, answer: S) -> ToolCallResponse {
        self.interrupt.respond(Value::String(answer.into()))
    }
}

impl From<Interrupt> for PendingQuestion {
    fn from(interrupt: Interrupt) -> Self {
        let question = interrupt
            .details::<AskUserQuestion>()
            .map(|details| details.question);
        Self {
            request_id: interrupt.request_id().to_owned(),
            question,
            interrupt,
        }
    }
}

/// Outcome of a research agent run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResearchOutcome {
    /// The agent answered the task.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// The final answer.
        text: String,
        /// The whole exchange.
        history: History,
    },
    /// The agent waits for the user to answer some questions.
    ///
    /// Answer every question and pass the history back to
    /// [`Flows::research_agent_resume`].
    #[serde(rename_all = "camelCase")]
    Interrupted {
        /// The pending questions, in request order.
        questions: Vec<PendingQuestion>,
        /// The exchange up to the suspension.
        history: History,
    },
}

impl Flows {
    /// Answers a prompt with the weather tool at hand.
    pub async fn tool_calling(
        &self,
        req: ToolCallingRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let history = History::from(vec![Message::user(req.prompt)]);
        completed_text(self.weather_engine.run(history, None, cancel).await)
    }

    /// Works on a task with a web search tool, asking the user clarifying
    /// questions when needed.
    pub async fn research_agent(
        &self,
        req: ResearchAgentRequest,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, FlowError> {
        let history = History::from(vec![
            Message::system(RESEARCH_SYSTEM_PROMPT),
            Message::user(format!(
                "Your task is: {}. Use the available tools to accomplish this.",
                req.task
            )),
        ]);
        research_outcome(self.research_engine.run(history, None, cancel).await)
    }

    /// Continues a suspended research agent run with the user's answers.
    pub async fn research_agent_resume(
        &self,
        req: ResearchAgentResumeRequest,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, FlowError> {
        let result = self
            .research_engine
            .resume(req.history, req.answers, None, cancel)
            .await;
        research_outcome(result)
    }
}

fn research_outcome(result: TurnResult) -> Result<ResearchOutcome, FlowError> {
    match result {
        TurnResult::Completed { text, history } => {
            Ok(ResearchOutcome::Completed { text, history })
        }
        TurnResult::Interrupted {
            interrupts,
            history,
        } => {
            debug!("research agent waits for {} answer(s)", interrupts.len());
            Ok(ResearchOutcome::Interrupted {
                questions: interrupts.into_iter().map(Into::into).collect(),
                history,
            })
        }
        TurnResult::Failed(err) => Err(err),
    }
}
