use std::future::ready;

use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolFuture};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(&self, arguments: Value) -> ToolFuture;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(&self, arguments: Value) -> ToolFuture {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(ready(Err(
                    Error::invalid_input().with_reason(reason)
                )));
            }
        };

        let fut = self.0.execute(input);
        Box::pin(
            async move {
                let output = fut.await?;
                serde_json::to_value(output).map_err(|err| {
                    Error::execution_error()
                        .with_reason(format!("unserializable output: {err}"))
                })
            }
            .instrument(debug_span!("tool execute", name = self.0.name())),
        )
    }
}
