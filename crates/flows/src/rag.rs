//! Answering questions about a restaurant menu with a retrieval tool the
//! model calls on its own.

use agentic_flows_core::{CancellationToken, FlowError, History};
use agentic_flows_model::Message;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;
use crate::flows::completed_text;

const MENU_ITEMS: [&str; 10] = [
    "Classic Burger: A juicy beef patty with lettuce, tomato, and our special sauce.",
    "Vegetarian Burger: A delicious plant-based patty with avocado and sprouts.",
    "Fries: Crispy golden fries, lightly salted.",
    "Milkshake: A thick and creamy milkshake, available in vanilla, chocolate, and strawberry.",
    "Salad: A fresh garden salad with your choice of dressing.",
    "Chicken Sandwich: Grilled chicken breast with honey mustard on a brioche bun.",
    "Fish and Chips: Beer-battered cod with a side of tartar sauce.",
    "Onion Rings: Thick-cut onion rings, fried to perfection.",
    "Ice Cream Sundae: Two scoops of vanilla ice cream with chocolate sauce and a cherry on top.",
    "Apple Pie: A classic apple pie with a flaky crust, served warm.",
];

const RAG_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that can \
answer questions about the food available on the menu at Genkit Grub Pub.
Use the provided tool to answer questions.
If you don't know, do not make up an answer.
Do not add or change items on the menu.";

/// Input of [`Flows::agentic_rag`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgenticRagRequest {
    /// The question about the menu.
    pub question: String,
}

impl Flows {
    /// Loads the menu into the index searched by [`Flows::agentic_rag`]
    /// and returns the number of indexed documents.
    ///
    /// Indexing again is a no-op.
    pub async fn index_menu(
        &self,
        cancel: &CancellationToken,
    ) -> Result<usize, FlowError> {
        if cancel.is_cancelled() {
            return Err(FlowError::Cancelled);
        }
        let count = self.menu.index(MENU_ITEMS);
        debug!("menu index holds {count} document(s)");
        Ok(count)
    }

    /// Answers a question about the menu, letting the model retrieve menu
    /// documents as it sees fit.
    pub async fn agentic_rag(
        &self,
        req: AgenticRagRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        if self.menu.is_empty() {
            warn!("answering a menu question before the menu was indexed");
        }
        let history = History::from(vec![
            Message::system(RAG_SYSTEM_PROMPT),
            Message::user(req.question),
        ]);
        completed_text(self.rag_engine.run(history, None, cancel).await)
    }
}
