//! Suspending a turn on outside input, and resuming it.
//!
//! A tool suspends the turn by returning [`Error::interrupt`] with some
//! metadata, e.g. the question it wants answered. The turn engine collects
//! every interrupt of a model turn into a single interrupted result. The
//! responses of the calls that did complete in the same batch are kept in
//! a trailing tool message of the history, so they are never executed
//! twice.
//!
//! To resume, the caller answers every pending interrupt (in any order,
//! they are matched by id) and hands the history back. The tool message is
//! then rebuilt with all responses in the order of the original requests.
//!
//! [`Error::interrupt`]: crate::tool::Error::interrupt

use std::collections::{HashMap, HashSet};

use agentic_flows_model::{
    Message, Role, ToolCallRequest, ToolCallResponse, ToolOutput,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FlowError;
use crate::history::History;

/// Typed view of the metadata of a known interrupting tool.
pub trait InterruptDetails: DeserializeOwned {
    /// Name of the tool that produces these details.
    const TOOL_NAME: &'static str;
}

/// A suspended tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interrupt {
    /// The request that was suspended.
    pub request: ToolCallRequest,
    /// Metadata attached by the tool.
    pub metadata: Map<String, Value>,
}

impl Interrupt {
    /// Returns the name of the interrupting tool.
    #[inline]
    pub fn tool_name(&self) -> &str {
        &self.request.name
    }

    /// Returns the id to answer.
    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request.id
    }

    /// Returns the input the tool was called with.
    #[inline]
    pub fn input(&self) -> &Value {
        &self.request.arguments
    }

    /// Returns the raw metadata.
    #[inline]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the typed metadata if this interrupt comes from the tool
    /// `D` describes and the metadata has the expected shape.
    pub fn details<D: InterruptDetails>(&self) -> Option<D> {
        if self.tool_name() != D::TOOL_NAME {
            return None;
        }
        serde_json::from_value(Value::Object(self.metadata.clone()))
            .inspect_err(|err| {
                warn!("malformed metadata of `{}`: {err}", D::TOOL_NAME)
            })
            .ok()
    }

    /// Builds the resolved response of this interrupt.
    #[inline]
    pub fn respond(&self, output: Value) -> ToolCallResponse {
        ToolCallResponse {
            id: self.request.id.clone(),
            name: self.request.name.clone(),
            output: ToolOutput::Value(output),
        }
    }
}

/// Returns the ids of the tool calls still waiting for a response, in
/// request order.
pub fn pending_ids(history: &History) -> Vec<String> {
    match split_pending(history.messages()) {
        Some((requests, answered)) => requests
            .iter()
            .filter(|req| !answered.contains_key(req.id.as_str()))
            .map(|req| req.id.clone())
            .collect(),
        None => vec![],
    }
}

/// Completes the trailing tool calls of `history` with `resolved`.
///
/// Fails with [`FlowError::UnresolvedInterrupt`] unless `resolved` answers
/// every pending id exactly once and nothing else.
pub(crate) fn prepare_resume(
    mut history: History,
    resolved: Vec<ToolCallResponse>,
) -> Result<History, FlowError> {
    let Some((requests, answered)) = split_pending(history.messages()) else {
        if resolved.is_empty() {
            return Ok(history);
        }
        return Err(FlowError::UnresolvedInterrupt {
            missing: vec![],
            unexpected: resolved.into_iter().map(|resp| resp.id).collect(),
        });
    };

    let pending: HashSet<&str> = requests
        .iter()
        .map(|req| req.id.as_str())
        .filter(|id| !answered.contains_key(id))
        .collect();

    let mut unexpected = vec![];
    let mut by_id: HashMap<&str, &ToolCallResponse> = HashMap::new();
    for resp in &resolved {
        let id = resp.id.as_str();
        if !pending.contains(id) || by_id.insert(id, resp).is_some() {
            unexpected.push(resp.id.clone());
        }
    }
    let missing: Vec<String> = requests
        .iter()
        .filter(|req| pending.contains(req.id.as_str()))
        .filter(|req| !by_id.contains_key(req.id.as_str()))
        .map(|req| req.id.clone())
        .collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(FlowError::UnresolvedInterrupt {
            missing,
            unexpected,
        });
    }

    let responses: Vec<ToolCallResponse> = requests
        .iter()
        .filter_map(|req| {
            let id = req.id.as_str();
            answered.get(id).or_else(|| by_id.get(id)).copied().cloned()
        })
        .collect();
    if history.last().is_some_and(|msg| msg.role == Role::Tool) {
        history.pop();
    }
    history.push(Message::tool(responses));
    Ok(history)
}

/// Finds the requests of the trailing model message together with the
/// responses already recorded after it. Returns `None` if no tool call is
/// waiting for a response.
fn split_pending(
    messages: &[Message],
) -> Option<(Vec<ToolCallRequest>, HashMap<&str, &ToolCallResponse>)> {
    let (model_msg, partial) = match messages {
        [.., model_msg, partial] if partial.role == Role::Tool => {
            (model_msg, Some(partial))
        }
        [.., model_msg] => (model_msg, None),
        [] => return None,
    };
    if model_msg.role != Role::Model {
        return None;
    }

    let requests: Vec<ToolCallRequest> =
        model_msg.tool_requests().cloned().collect();
    let answered: HashMap<&str, &ToolCallResponse> = partial
        .into_iter()
        .flat_map(Message::tool_responses)
        .map(|resp| (resp.id.as_str(), resp))
        .collect();
    if requests.iter().all(|req| answered.contains_key(req.id.as_str())) {
        return None;
    }
    Some((requests, answered))
}

#[cfg(test)]
mod tests {
    use agentic_flows_model::Part;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Question {
        question: String,
    }

    impl InterruptDetails for Question {
        const TOOL_NAME: &'static str = "askUser";
    }

    fn request(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments: json!({}),
        }
    }

    fn response(id: &str, name: &str, output: Value) -> ToolCallResponse {
        ToolCallResponse {
            id: id.to_owned(),
            name: name.to_owned(),
            output: ToolOutput::Value(output),
        }
    }

    fn suspended_history() -> History {
        vec![
            Message::user("Research the market."),
            Message::new(
                Role::Model,
                vec![
                    Part::ToolRequest(request("a", "askUser")),
                    Part::ToolRequest(request("s", "searchWeb")),
                    Part::ToolRequest(request("b", "askUser")),
                ],
            ),
            Message::tool([response("s", "searchWeb", json!("results"))]),
        ]
        .into()
    }

    #[test]
    fn test_details() {
        let mut metadata = Map::new();
        metadata.insert("question".to_owned(), json!("Which region?"));
        let interrupt = Interrupt {
            request: request("a", "askUser"),
            metadata,
        };
        let question = interrupt.details::<Question>().unwrap();
        assert_eq!(question.question, "Which region?");

        let other = Interrupt {
            request: request("a", "approve"),
            ..interrupt
        };
        assert!(other.details::<Question>().is_none());
    }

    #[test]
    fn test_resume_rebuilds_in_request_order() {
        let history = suspended_history();
        assert_eq!(pending_ids(&history), ["a", "b"]);

        let history = prepare_resume(
            history,
            vec![
                response("b", "askUser", json!("Europe")),
                response("a", "askUser", json!("B2B")),
            ],
        )
        .unwrap();
        assert_eq!(history.len(), 3);
        let ids: Vec<_> = history
            .last()
            .unwrap()
            .tool_responses()
            .map(|resp| resp.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "s", "b"]);
        assert!(pending_ids(&history).is_empty());
    }

    #[test]
    fn test_resume_rejects_mismatch() {
        let err = prepare_resume(
            suspended_history(),
            vec![response("a", "askUser", json!("B2B"))],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FlowError::UnresolvedInterrupt {
                missing: vec!["b".to_owned()],
                unexpected: vec![],
            }
        );

        let err = prepare_resume(
            suspended_history(),
            vec![
                response("a", "askUser", json!("B2B")),
                response("a", "askUser", json!("B2C")),
                response("b", "askUser", json!("Europe")),
                response("s", "searchWeb", json!("again")),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FlowError::UnresolvedInterrupt {
                missing: vec![],
                unexpected: vec!["a".to_owned(), "s".to_owned()],
            }
        );
    }

    #[test]
    fn test_resume_without_pending() {
        let history: History = vec![Message::user("Hi"), Message::model("Hello")].into();
        let resumed = prepare_resume(history.clone(), vec![]).unwrap();
        assert_eq!(resumed, history);

        let err = prepare_resume(history, vec![response("x", "askUser", json!(1))])
            .unwrap_err();
        assert_eq!(err.code(), "unresolved_interrupt");
    }
}
