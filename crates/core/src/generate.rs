//! Single-shot generation requests and their results.

use agentic_flows_model::{
    MediaPart, Message, ModelConfig, ModelFinishReason, Part, Role,
    ToolCallRequest,
};
use serde::{Deserialize, Serialize};

/// A generation request that is sent to the model without any tool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Input messages.
    pub messages: Vec<Message>,
    /// Generation settings.
    #[serde(default)]
    pub config: ModelConfig,
}

impl GenerateRequest {
    /// Creates a request from input messages.
    #[inline]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ModelConfig::default(),
        }
    }

    /// Creates a request with a single user prompt.
    #[inline]
    pub fn prompt<S: Into<String>>(prompt: S) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    /// Prepends system instructions.
    pub fn with_system<S: Into<String>>(mut self, instructions: S) -> Self {
        self.messages.insert(0, Message::system(instructions));
        self
    }

    /// Attaches a media part to the last user message, adding an empty
    /// user message if there is none.
    pub fn with_media(mut self, media: MediaPart) -> Self {
        match self.messages.last_mut() {
            Some(msg) if msg.role == Role::User => {
                msg.content.push(Part::Media(media));
            }
            _ => {
                self.messages
                    .push(Message::new(Role::User, vec![Part::Media(media)]));
            }
        }
        self
    }

    /// Replaces the generation settings.
    #[inline]
    pub fn with_config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }
}

/// A completely received model output.
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    /// The message authored by the model.
    pub message: Message,
    /// Why the model stopped.
    pub finish_reason: ModelFinishReason,
}

impl Generation {
    /// Returns the text of the message.
    #[inline]
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Returns the first media part of the message.
    #[inline]
    pub fn media(&self) -> Option<&MediaPart> {
        self.message.media().next()
    }

    /// Returns the tool calls requested by the model.
    #[inline]
    pub fn tool_requests(&self) -> impl Iterator<Item = &ToolCallRequest> {
        self.message.tool_requests()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = GenerateRequest::prompt("Turn this into a cartoon.")
            .with_system("You are an illustrator.")
            .with_media(MediaPart::new("image/png", "https://example.com/a.png"));
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].text(), "Turn this into a cartoon.");
        assert_eq!(req.messages[1].media().count(), 1);

        let req = GenerateRequest::default()
            .with_media(MediaPart::new("image/png", "https://example.com/a.png"));
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, Role::User);
    }
}
