//! A local fake model for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use agentic_flows_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, Role,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn message(&self) -> &str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    finish_reason: ModelFinishReason,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        if this.event_idx < this.events.len() {
            let event = match &this.events[this.event_idx] {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::Media(media) => {
                    ModelResponseEvent::Media(media.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            };
            this.event_idx += 1;
            Poll::Ready(Ok(Some(event)))
        } else if this.event_idx == this.events.len() {
            this.event_idx += 1;
            Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                this.finish_reason,
            ))))
        } else {
            // In case this method is called after completion.
            Poll::Ready(Ok(None))
        }
    }
}

#[derive(Clone)]
enum ConversationStep {
    Input,
    ModelResponse(PresetResponse),
}

#[derive(Default)]
struct Shared {
    attempts: Mutex<HashMap<String, u64>>,
    requests: Mutex<Vec<ModelRequest>>,
}

/// A local fake model for testing purpose.
///
/// Responses are chosen in two ways:
///
/// - Prompt rules are checked first. A rule matches when the text of the
///   last user message contains its needle, which makes the provider
///   usable for concurrent requests whose order is not known upfront.
/// - Otherwise the conversation script is consulted. The step is selected
///   according to the number of history messages in your request, so a
///   history of one user message picks the step at index 1. If there are
///   no enough steps in the script, an error will be returned.
///
/// Clones share the request log and the failure counters.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    prompt_rules: Vec<(String, PresetResponse)>,
    delay: Option<Duration>,
    shared: Arc<Shared>,
}

impl TestModelProvider {
    /// Adds a step for a message the model doesn't author (system, user
    /// or tool message).
    #[inline]
    pub fn add_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::Input);
    }

    /// Adds a step answered by the model.
    #[inline]
    pub fn add_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::ModelResponse(preset));
    }

    /// Responds with `preset` whenever the last user message contains
    /// `needle`. Rules are checked in insertion order.
    #[inline]
    pub fn add_prompt_rule<S: Into<String>>(
        &mut self,
        needle: S,
        preset: PresetResponse,
    ) {
        self.prompt_rules.push((needle.into(), preset));
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn select(
        &self,
        req: &ModelRequest,
    ) -> Result<(String, &PresetResponse), Error> {
        let last_user_text = req
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(|msg| msg.text());
        if let Some(text) = last_user_text {
            let rule = self
                .prompt_rules
                .iter()
                .enumerate()
                .find(|(_, (needle, _))| text.contains(needle.as_str()));
            if let Some((idx, (_, preset))) = rule {
                return Ok((format!("rule:{idx}"), preset));
            }
        }

        let step_idx = req.messages.len();
        match self.conversation_script.get(step_idx) {
            Some(ConversationStep::ModelResponse(preset)) => {
                Ok((format!("step:{step_idx}"), preset))
            }
            Some(ConversationStep::Input) => Err(Error {
                message: "not a model response step",
                kind: ErrorKind::Other,
            }),
            None => Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            }),
        }
    }

    fn should_fail(&self, key: String, preset: &PresetResponse) -> bool {
        let Some(failures) = preset.failures else {
            return false;
        };
        let mut attempts = self
            .shared
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let attempt = attempts.entry(key).or_default();
        *attempt += 1;
        failures == 0 || *attempt <= failures
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());

        let result = self.select(req).and_then(|(key, preset)| {
            if self.should_fail(key, preset) {
                return Err(Error {
                    message: "injected failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
            Ok(TestModelResponse {
                events: preset.events.clone(),
                finish_reason: preset.resolved_finish_reason(),
                event_idx: 0,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            })
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use agentic_flows_model::{Message, ModelTool, ToolCallRequest};
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Option<ToolCallRequest>, ModelFinishReason) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_call = None;
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await
                .unwrap()
                .unwrap();
            match event {
                ModelResponseEvent::Completed(reason) => {
                    return (msg, tool_call, reason);
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_call = Some(req),
                ModelResponseEvent::Media(_) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_input_step();
        provider.add_response_step(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_input_step();
        provider.add_response_step(PresetResponse::with_events([
            PresetEvent::MessageDelta("Sure, ".to_owned()),
            PresetEvent::MessageDelta("let me take a ".to_owned()),
            PresetEvent::MessageDelta("look.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "tool:1".to_owned(),
                name: "getWeather".to_owned(),
                arguments: json!({ "location": "Paris" }),
            }),
        ]));

        let mut req = ModelRequest {
            messages: vec![Message::user("Hi")],
            tools: vec![ModelTool {
                name: "getWeather".to_owned(),
                description: "Gets the weather".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "location": { "type": "string" }
                    }
                }),
            }],
            ..Default::default()
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert_eq!(reason, ModelFinishReason::Stop);

        req.messages.push(Message::model(msg));
        req.messages.push(Message::user("What's the weather?"));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Sure, let me take a look.");
        assert_eq!(reason, ModelFinishReason::ToolCalls);
        let tool_call = tool_call.unwrap();
        assert_eq!(tool_call.name, "getWeather");
        assert_eq!(tool_call.arguments, json!({ "location": "Paris" }));

        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_rules_take_precedence() {
        let mut provider = TestModelProvider::default();
        provider.add_input_step();
        provider.add_response_step(PresetResponse::with_text("scripted"));
        provider.add_prompt_rule("tagline", PresetResponse::with_text("ruled"));

        let req = ModelRequest {
            messages: vec![Message::user("Write a tagline")],
            ..Default::default()
        };
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.0, "ruled");

        let req = ModelRequest {
            messages: vec![Message::user("Write a name")],
            ..Default::default()
        };
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.0, "scripted");
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_input_step();
        provider.add_response_step(
            PresetResponse::with_text("finally").with_failures(2),
        );
        let req = ModelRequest {
            messages: vec![Message::user("Hi")],
            ..Default::default()
        };

        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(collect_response(resp).await.0, "finally");
    }

    #[tokio::test]
    async fn test_missing_steps() {
        let provider = TestModelProvider::default();
        let req = ModelRequest {
            messages: vec![Message::user("Hi")],
            ..Default::default()
        };
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "no enough steps");
    }
}
