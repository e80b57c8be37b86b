use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use agentic_flows_model::{
    ErrorKind, Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, Part, Role,
};
use backoff::ExponentialBackoffBuilder;
use tracing::Instrument;

use crate::config::RetryConfig;
use crate::error::FlowError;
use crate::generate::Generation;

/// A callback receiving text deltas in arrival order.
pub(crate) type DeltaFn = Arc<dyn Fn(String) + Send + Sync>;

type SendRequestResult = Result<Generation, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Option<DeltaFn>) -> BoxedSendRequestFuture
        + Send + Sync
>;

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub(crate) struct ModelClient {
    handler_fn: HandlerFn,
    retry: Option<RetryConfig>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry: None,
        }
    }

    #[inline]
    pub fn with_retry(mut self, retry: Option<RetryConfig>) -> Self {
        self.retry = retry;
        self
    }

    /// Sends a request and returns the complete response.
    ///
    /// Only rate limited requests are retried, and only when a retry
    /// policy is set.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_delta: Option<DeltaFn>,
    ) -> Result<Generation, FlowError> {
        let Some(retry) = self.retry else {
            return (self.handler_fn)(req, on_delta)
                .await
                .map_err(FlowError::from);
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(retry.initial_interval())
            .with_max_elapsed_time(Some(retry.max_elapsed()))
            .build();
        backoff::future::retry(policy, || {
            let fut = (self.handler_fn)(req.clone(), on_delta.clone());
            async move {
                fut.await.map_err(|err| {
                    if err.kind() == ErrorKind::RateLimitExceeded {
                        warn!("model is rate limited, will retry: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
        .map_err(FlowError::from)
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: Option<DeltaFn>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut content: Vec<Part> = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                if let Some(on_delta) = &on_delta {
                    on_delta(delta.clone());
                }
                // Consecutive deltas make up a single text part.
                if let Some(Part::Text(text)) = content.last_mut() {
                    text.push_str(&delta);
                } else {
                    content.push(Part::Text(delta));
                }
            }
            ModelResponseEvent::Media(media) => {
                content.push(Part::Media(media));
            }
            ModelResponseEvent::ToolCall(req) => {
                content.push(Part::ToolRequest(req));
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    let message = Message::new(Role::Model, content);
    let finish_reason = finish_reason.unwrap_or_else(|| {
        if message.tool_requests().next().is_some() {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        }
    });
    Ok(Generation {
        message,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use agentic_flows_model::MediaPart;
    use agentic_flows_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn hi_request() -> ModelRequest {
        ModelRequest {
            messages: vec![Message::user("Hi")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_input_step();
        model_provider.add_response_step(PresetResponse::with_events([
            PresetEvent::MessageDelta("How ".to_owned()),
            PresetEvent::MessageDelta("are ".to_owned()),
            PresetEvent::Media(MediaPart::new("image/png", "https://a.png")),
            PresetEvent::MessageDelta("you?".to_owned()),
        ]));

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let deltas = Arc::new(Mutex::new(Vec::new()));
            let on_delta: DeltaFn = {
                let deltas = Arc::clone(&deltas);
                Arc::new(move |delta| deltas.lock().unwrap().push(delta))
            };
            let generation = model_client
                .send_request(hi_request(), Some(on_delta))
                .await
                .unwrap();
            assert_eq!(generation.text(), "How are you?");
            assert_eq!(generation.message.content.len(), 3);
            assert_eq!(generation.media().unwrap().url, "https://a.png");
            assert_eq!(generation.finish_reason, ModelFinishReason::Stop);
            assert_eq!(*deltas.lock().unwrap(), ["How ", "are ", "you?"]);
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(hi_request(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Generation {
                kind: ErrorKind::Other,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_retry_rate_limited() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_input_step();
        model_provider.add_response_step(
            PresetResponse::with_text("finally").with_failures(2),
        );
        let requests = model_provider.clone();

        let model_client =
            ModelClient::new(model_provider).with_retry(Some(RetryConfig {
                initial_interval_ms: 1,
                max_elapsed_ms: 5_000,
            }));
        let generation =
            model_client.send_request(hi_request(), None).await.unwrap();
        assert_eq!(generation.text(), "finally");
        assert_eq!(requests.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_input_step();
        model_provider.add_response_step(
            PresetResponse::with_text("finally").with_failures(1),
        );
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(hi_request(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Generation {
                kind: ErrorKind::RateLimitExceeded,
                ..
            }
        ));
    }
}
