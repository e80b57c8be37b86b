//! Tool call supports.

mod error;
mod object;
mod registry;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use registry::{ToolFuture, ToolRegistry};

/// The result of a type-erased tool call.
pub type ToolResult = Result<Value, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as the current user. To do this,
/// make the context an immutable state of the tool, which can be set during
/// initialization, and copy it when executing.
///
/// A tool that needs a human (or any outside party) to answer before it can
/// produce a result returns [`Error::interrupt`] instead of a value. The turn
/// is then suspended and the answer is supplied when the turn is resumed.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    ///
    /// Raw arguments from the model are validated by deserializing into
    /// this type, so it should be the same type the parameter schema is
    /// generated from.
    type Input: DeserializeOwned;

    /// The type of output that the tool produces.
    type Output: Serialize;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, Error>> + Send + 'static;
}
