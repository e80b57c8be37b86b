//! Schema-typed model output.

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FlowError;
use crate::stream::repair_json;

/// Returns the JSON schema the model output of type `T` must conform to.
#[inline]
pub fn output_schema<T: JsonSchema>() -> Value {
    schema_for!(T).to_value()
}

/// Parses model output text into `T`.
///
/// Markdown code fences around the document are stripped. If the text is
/// still not valid JSON, it is repaired with [`repair_json`] before giving
/// up, which salvages output that was cut short.
pub fn parse_output<T: DeserializeOwned>(text: &str) -> Result<T, FlowError> {
    let text = strip_code_fence(text);
    let err = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    debug!("model output is not valid JSON ({err}), trying to repair it");
    repair_json(text)
        .and_then(|repaired| serde_json::from_str(&repaired).ok())
        .ok_or_else(|| {
            FlowError::unusable_output(format!(
                "model output doesn't match the requested schema: {err}"
            ))
        })
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string, e.g. "json".
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize, JsonSchema)]
    struct Idea {
        title: String,
        premise: String,
    }

    #[test]
    fn test_parse_output() {
        let expected = Idea {
            title: "Fox".to_owned(),
            premise: "A fox learns to fly.".to_owned(),
        };
        let plain = r#"{"title": "Fox", "premise": "A fox learns to fly."}"#;
        assert_eq!(parse_output::<Idea>(plain).unwrap(), expected);

        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(parse_output::<Idea>(&fenced).unwrap(), expected);

        let truncated = r#"{"title": "Fox", "premise": "A fox learns to fly."#;
        assert_eq!(parse_output::<Idea>(truncated).unwrap(), expected);

        let err = parse_output::<Idea>("I can't do that.").unwrap_err();
        assert_eq!(err.code(), "generation_error");
        let err = parse_output::<Idea>(r#"{"title": "Fox"}"#).unwrap_err();
        assert_eq!(err.code(), "generation_error");
    }

    #[test]
    fn test_output_schema() {
        let schema = output_schema::<Idea>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["premise"].is_object());
    }
}
