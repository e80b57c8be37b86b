//! A chat keeping its history across requests.

use agentic_flows_core::{CancellationToken, Emitter, FlowError, TurnResult};
use agentic_flows_model::Message;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;
use crate::flows::completed_text;

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant. You can do \
anything and are not limited by the available tools. You have access to a \
temperature conversion tool. Only use it if the user asks to convert \
temperature.";

/// Input of [`Flows::stateful_chat`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatefulChatRequest {
    /// The conversation to continue. Unknown ids start a new one.
    pub session_id: String,
    /// The user's message.
    pub message: String,
}

/// Input of [`Flows::history`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryRequest {
    /// The conversation to read.
    pub session_id: String,
}

impl Flows {
    /// Sends a message to a chat session and returns the reply.
    ///
    /// The history is saved only when the reply completes, so a failed or
    /// cancelled request leaves the session as it was. Text deltas are
    /// streamed to `emitter` while the reply is generated.
    pub async fn stateful_chat(
        &self,
        req: StatefulChatRequest,
        emitter: Option<&Emitter<String>>,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let StatefulChatRequest {
            session_id,
            message,
        } = req;

        let mut history = self.sessions.load(&session_id).await;
        if history.is_empty() {
            debug!("starting session {session_id}");
            history.push(Message::system(CHAT_SYSTEM_PROMPT));
        }
        history.push(Message::user(message));

        match self.chat_engine.run(history, emitter, cancel).await {
            TurnResult::Completed { text, history } => {
                self.sessions.save(&session_id, history).await;
                Ok(text)
            }
            other => completed_text(other),
        }
    }

    /// Returns the messages of a chat session without the system prompt.
    pub async fn history(&self, req: ChatHistoryRequest) -> Vec<Message> {
        self.sessions.load(&req.session_id).await.without_system()
    }
}
