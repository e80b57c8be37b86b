use agentic_flows_model::{MediaPart, ModelFinishReason, ToolCallRequest};
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "media")]
    Media(MediaPart),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for a model step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default)]
    pub failures: Option<u64>,
    /// Overrides the finish reason, which is otherwise derived from the
    /// events (`ToolCalls` if any tool call is present, else `Stop`).
    #[serde(default)]
    pub finish_reason: Option<ModelFinishReason>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
            finish_reason: None,
        }
    }

    /// Creates a `PresetResponse` with a single text delta.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Creates a `PresetResponse` that streams the text in chunks of at
    /// most `chunk_len` characters.
    pub fn with_chunked_text(text: &str, chunk_len: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let events: Vec<_> = chars
            .chunks(chunk_len.max(1))
            .map(|chunk| PresetEvent::MessageDelta(chunk.iter().collect()))
            .collect();
        Self::with_events(events)
    }

    /// Creates a `PresetResponse` requesting the given tool calls.
    #[inline]
    pub fn with_tool_calls(calls: impl IntoIterator<Item = ToolCallRequest>) -> Self {
        Self::with_events(
            calls
                .into_iter()
                .map(PresetEvent::ToolCall)
                .collect::<Vec<_>>(),
        )
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Overrides the finish reason.
    #[inline]
    pub fn with_finish_reason(mut self, reason: ModelFinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub(crate) fn resolved_finish_reason(&self) -> ModelFinishReason {
        if let Some(reason) = self.finish_reason {
            return reason;
        }
        let has_tool_call = self
            .events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)));
        if has_tool_call {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_script() {
        let response: PresetResponse = serde_json::from_value(json!({
            "events": [
                { "type": "message_delta", "data": "Converting." },
                {
                    "type": "tool_call",
                    "data": {
                        "id": "1",
                        "name": "convertTemperature",
                        "arguments": { "temperature": 100 }
                    }
                }
            ]
        }))
        .unwrap();

        assert_eq!(response.failures, None);
        assert_eq!(
            response.resolved_finish_reason(),
            ModelFinishReason::ToolCalls
        );
    }

    #[test]
    fn test_chunked_text() {
        let response = PresetResponse::with_chunked_text("abcdefg", 3);
        assert_eq!(
            response.events,
            vec![
                PresetEvent::MessageDelta("abc".to_owned()),
                PresetEvent::MessageDelta("def".to_owned()),
                PresetEvent::MessageDelta("g".to_owned()),
            ]
        );
        assert_eq!(response.resolved_finish_reason(), ModelFinishReason::Stop);
    }
}
