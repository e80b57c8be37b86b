//! Conversation history.

use agentic_flows_model::{Message, Role};
use serde::{Deserialize, Serialize};

/// An ordered sequence of messages.
///
/// A history only grows within a turn. It serializes as a plain JSON array
/// of messages, so it can travel across a transport and come back for a
/// resume.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<Message>);

impl History {
    /// Creates an empty history.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, msg: Message) {
        self.0.push(msg);
    }

    /// Returns all the messages.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    /// Returns the last message, if any.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Message> {
        self.0.pop()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the messages visible to an end user, i.e. everything except
    /// system instructions.
    pub fn without_system(&self) -> Vec<Message> {
        self.0
            .iter()
            .filter(|msg| msg.role != Role::System)
            .cloned()
            .collect()
    }

    /// Consumes the history and returns its messages.
    #[inline]
    pub fn into_messages(self) -> Vec<Message> {
        self.0
    }
}

impl From<Vec<Message>> for History {
    #[inline]
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl FromIterator<Message> for History {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
