use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a model provider, which is an entry for getting
/// model information, sampling requests, etc.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
///
/// Providers never retry on their own behalf unless they document it;
/// callers decide the retry policy.
///
/// A response should end with [`ModelResponseEvent::Completed`]. Finishing
/// with [`ModelFinishReason::Interrupted`] suspends the turn: any tool requests
/// already emitted by that response are handed back to the caller as
/// pending interrupts, and each one must be answered before the turn is
/// resumed. When a response ends without a reason, callers infer
/// `ToolCalls` if it requested tools and `Stop` otherwise.
///
/// [`ModelResponseEvent::Completed`]: crate::ModelResponseEvent::Completed
/// [`ModelFinishReason::Interrupted`]: crate::ModelFinishReason::Interrupted
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a request to the model.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
