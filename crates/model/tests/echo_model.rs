use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use agentic_flows_model::{
    ErrorKind, Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ModelTool, Role,
    ToolCallRequest,
};
use serde_json::json;
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoModelError(ErrorKind);

impl Display for EchoModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoModelError {}

impl ModelProviderError for EchoModelError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the last user message word by word. When tools are offered, it
/// asks for the first one instead.
#[derive(Debug)]
struct EchoModelResponse {
    pending: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EchoModelResponse {
    fn new(input: &str, tool: Option<&ModelTool>) -> Self {
        let mut pending: VecDeque<_> = format!("You said {input}")
            .split(' ')
            .map(|word| ModelResponseEvent::MessageDelta(word.to_owned()))
            .collect();
        let reason = match tool {
            Some(tool) => {
                pending.push_back(ModelResponseEvent::ToolCall(
                    ToolCallRequest {
                        id: "call:0".to_owned(),
                        name: tool.name.clone(),
                        arguments: json!({ "input": input }),
                    },
                ));
                ModelFinishReason::ToolCalls
            }
            None => ModelFinishReason::Stop,
        };
        pending.push_back(ModelResponseEvent::Completed(reason));
        Self {
            pending,
            sleep: None,
        }
    }
}

impl ModelResponse for EchoModelResponse {
    type Error = EchoModelError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.pending.pop_front()))
    }
}

struct EchoModelProvider;

impl ModelProvider for EchoModelProvider {
    type Error = EchoModelError;
    type Response = EchoModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let input = req
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(Message::text);
        let result = match input {
            Some(input) => Ok(EchoModelResponse::new(&input, req.tools.first())),
            None => Err(EchoModelError(ErrorKind::Other)),
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    async fn collect(
        mut resp: EchoModelResponse,
    ) -> (Vec<String>, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
        let mut words = vec![];
        let mut tool_calls = vec![];
        let mut reason = None;
        loop {
            let event = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
                .await
                .unwrap();
            match event {
                Some(ModelResponseEvent::MessageDelta(word)) => words.push(word),
                Some(ModelResponseEvent::ToolCall(req)) => tool_calls.push(req),
                Some(ModelResponseEvent::Completed(r)) => reason = Some(r),
                Some(event) => unreachable!("unexpected event: {event:?}"),
                None => break,
            }
        }
        (words, tool_calls, reason)
    }

    #[tokio::test]
    async fn test_completion() {
        let req = ModelRequest {
            messages: vec![
                Message::system("Be brief."),
                Message::user("Good morning"),
            ],
            ..Default::default()
        };
        let resp = EchoModelProvider.send_request(&req).await.unwrap();
        let (words, tool_calls, reason) = collect(resp).await;
        assert_eq!(words.join(" "), "You said Good morning");
        assert!(tool_calls.is_empty());
        assert_eq!(reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_tool_call() {
        let req = ModelRequest {
            messages: vec![Message::user("Paris")],
            tools: vec![ModelTool {
                name: "getWeather".to_owned(),
                description: "Gets the weather.".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
            ..Default::default()
        };
        let resp = EchoModelProvider.send_request(&req).await.unwrap();
        let (_, tool_calls, reason) = collect(resp).await;
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].name, "getWeather");
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));
    }

    #[tokio::test]
    async fn test_error() {
        let req = ModelRequest::default();
        let err = EchoModelProvider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
