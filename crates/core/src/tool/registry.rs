use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;

use agentic_flows_model::ModelTool;
use serde_json::Value;

use super::object::{ToolObject, ToolObjectImpl};
use super::{Error, Tool, ToolResult};

/// A boxed future of a type-erased tool call.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// A set of tools keyed by name.
///
/// Tools are registered while building, after that the registry is only
/// read, so it's usually shared behind an [`Arc`] without any locking.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        let tool: Arc<dyn ToolObject> = Arc::new(ToolObjectImpl(tool));
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("tool `{name}` is registered twice, replacing the old one");
        }
    }

    /// Returns `true` if a tool with the name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns `true` if there is no tool registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the definitions of all tools, sorted by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Invokes a tool by name with raw arguments.
    ///
    /// The returned future doesn't borrow the registry. Failures, including
    /// an unknown name, are reported through the result.
    pub fn invoke(&self, name: &str, arguments: Value) -> ToolFuture {
        let Some(tool) = self.tools.get(name) else {
            warn!("tool not found: {name}");
            return Box::pin(ready(Err(
                Error::not_found().with_reason(format!("no tool named `{name}`"))
            )));
        };
        trace!("invoking tool `{name}` with args: {arguments:?}");
        tool.execute(arguments)
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::ErrorKind;

    static EMPTY_SCHEMA: &Value = &Value::Null;

    #[derive(Deserialize)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    struct AddTool(&'static str);

    impl Tool for AddTool {
        type Input = AddInput;
        type Output = i64;

        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Adds two numbers"
        }

        fn parameter_schema(&self) -> &Value {
            EMPTY_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = Result<i64, Error>> + Send + 'static {
            ready(Ok(input.a + input.b))
        }
    }

    #[tokio::test]
    async fn test_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(AddTool("add"));

        let output = registry.invoke("add", json!({ "a": 1, "b": 2 })).await;
        assert_eq!(output, Ok(json!(3)));

        let err = registry
            .invoke("add", json!({ "a": "one" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = registry.invoke("sub", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(AddTool("zeta"));
        registry.register(AddTool("alpha"));
        registry.register(AddTool("zeta"));

        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|def| def.name)
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert!(registry.contains("alpha"));
        assert!(!registry.contains("beta"));
    }
}
