use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Message;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<Message>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Per-request generation settings.
    pub config: ModelConfig,
}

/// Generation settings for a single request.
///
/// Every field is optional; providers fall back to their own defaults
/// for anything left unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Name of the model to use, e.g. a text model or an image model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// A JSON schema the response text must conform to.
    ///
    /// When set, the model is expected to answer with a single JSON value
    /// instead of free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
