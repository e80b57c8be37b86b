use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system instructions.
    System,
    /// The user input.
    User,
    /// Output of the model.
    Model,
    /// Results of tool calls requested by the model.
    Tool,
}

/// A complete message.
///
/// Messages are values: once a message is part of a conversation it is
/// never edited, a new message is appended instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The author of this message.
    pub role: Role,
    /// Ordered content of this message.
    pub content: Vec<Part>,
}

impl Message {
    /// Creates a message with the given role and parts.
    #[inline]
    pub fn new(role: Role, content: Vec<Part>) -> Self {
        Self { role, content }
    }

    /// Creates a system message with a single text part.
    #[inline]
    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::new(Role::System, vec![Part::Text(text.into())])
    }

    /// Creates a user message with a single text part.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, vec![Part::Text(text.into())])
    }

    /// Creates a model message with a single text part.
    #[inline]
    pub fn model<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Model, vec![Part::Text(text.into())])
    }

    /// Creates a tool message carrying the given responses.
    pub fn tool(responses: impl IntoIterator<Item = ToolCallResponse>) -> Self {
        Self::new(
            Role::Tool,
            responses.into_iter().map(Part::ToolResponse).collect(),
        )
    }

    /// Returns the concatenation of all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns the media parts of this message.
    pub fn media(&self) -> impl Iterator<Item = &MediaPart> {
        self.content.iter().filter_map(|part| match part {
            Part::Media(media) => Some(media),
            _ => None,
        })
    }

    /// Returns the tool call requests of this message, in order.
    pub fn tool_requests(&self) -> impl Iterator<Item = &ToolCallRequest> {
        self.content.iter().filter_map(|part| match part {
            Part::ToolRequest(req) => Some(req),
            _ => None,
        })
    }

    /// Returns the tool call responses of this message, in order.
    pub fn tool_responses(&self) -> impl Iterator<Item = &ToolCallResponse> {
        self.content.iter().filter_map(|part| match part {
            Part::ToolResponse(resp) => Some(resp),
            _ => None,
        })
    }
}

/// A piece of content in a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text.
    Text(String),
    /// A reference to media, such as an image.
    Media(MediaPart),
    /// A tool call requested by the model.
    ToolRequest(ToolCallRequest),
    /// The result of a tool call.
    ToolResponse(ToolCallResponse),
}

/// A reference to a piece of media.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPart {
    /// MIME type of the media, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Location of the media, either a remote URL or a `data:` URI.
    pub url: String,
}

impl MediaPart {
    /// Creates a media part.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        content_type: S1,
        url: S2,
    ) -> Self {
        Self {
            content_type: Some(content_type.into()),
            url: url.into(),
        }
    }
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool, usually a JSON object.
    pub arguments: Value,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    /// The identifier of the request this response answers.
    pub id: String,
    /// The name of the tool that was called.
    pub name: String,
    /// The result of the tool call.
    pub output: ToolOutput,
}

/// Either the value a tool produced or the reason it failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolOutput {
    /// The tool succeeded.
    Value(Value),
    /// The tool failed, the message is shown to the model.
    Error(String),
}
