use std::collections::HashSet;
use std::future::ready;
use std::sync::{Arc, PoisonError, RwLock};

use agentic_flows_core::tool::{Error as ToolError, Tool};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

/// Number of documents returned for a query.
const RETRIEVE_LIMIT: usize = 3;

/// A shared in-memory index of menu documents.
///
/// Documents are ranked by how many distinct query words they contain.
/// Clones share the same documents.
#[derive(Clone, Debug, Default)]
pub struct MenuIndex {
    documents: Arc<RwLock<Vec<String>>>,
}

impl MenuIndex {
    /// Creates an empty index.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds documents to the index, skipping ones already indexed, and
    /// returns the number of indexed documents.
    pub fn index<I, S>(&self, documents: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indexed = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for doc in documents {
            let doc = doc.into();
            if !indexed.contains(&doc) {
                indexed.push(doc);
            }
        }
        indexed.len()
    }

    /// Returns the number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been indexed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns at most `limit` documents sharing words with `query`, best
    /// match first. Ties keep indexing order.
    pub fn retrieve(&self, query: &str, limit: usize) -> Vec<String> {
        let terms = words(query);
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut scored: Vec<(usize, &String)> = documents
            .iter()
            .map(|doc| (words(doc).intersection(&terms).count(), doc))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Deserialize, JsonSchema)]
pub struct MenuRagParameters {
    #[schemars(description = "What to look up on the menu.")]
    query: String,
}

/// A tool retrieving menu documents relevant to a query.
pub struct MenuRagTool {
    index: MenuIndex,
    parameter_schema: Value,
}

impl MenuRagTool {
    /// Creates a new retrieval tool over `index`.
    #[inline]
    pub fn new(index: MenuIndex) -> Self {
        MenuRagTool {
            index,
            parameter_schema: schema_for!(MenuRagParameters).to_value(),
        }
    }
}

impl Tool for MenuRagTool {
    type Input = MenuRagParameters;
    type Output = Vec<String>;

    fn name(&self) -> &str {
        "menuRagTool"
    }

    fn description(&self) -> &str {
        "Use to retrieve information from the Genkit Grub Pub menu."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: MenuRagParameters,
    ) -> impl Future<Output = Result<Vec<String>, ToolError>> + Send + 'static
    {
        let docs = self.index.retrieve(&input.query, RETRIEVE_LIMIT);
        if docs.is_empty() {
            debug!("no menu document matches {:?}", input.query);
        }
        ready(Ok(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> MenuIndex {
        let index = MenuIndex::new();
        index.index([
            "Classic Burger: A juicy beef patty.",
            "Vegetarian Burger: A plant-based patty with avocado.",
            "Fries: Crispy golden fries.",
            "Veggie Wrap: Avocado and sprouts.",
        ]);
        index
    }

    #[test]
    fn test_index_skips_duplicates() {
        let index = index();
        assert_eq!(index.index(["Fries: Crispy golden fries."]), 4);
        assert_eq!(index.clone().index(["Apple Pie"]), 5);
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_retrieve_ranks_by_overlap() {
        let index = index();
        assert_eq!(
            index.retrieve("vegetarian burger with AVOCADO", 3),
            [
                "Vegetarian Burger: A plant-based patty with avocado.",
                "Classic Burger: A juicy beef patty.",
                "Veggie Wrap: Avocado and sprouts.",
            ]
        );
        assert_eq!(index.retrieve("burger", 1).len(), 1);
        assert!(index.retrieve("sushi", 3).is_empty());
        assert!(MenuIndex::new().retrieve("burger", 3).is_empty());
    }

    #[tokio::test]
    async fn test_tool_returns_top_matches() {
        let tool = MenuRagTool::new(index());
        let docs = tool
            .execute(MenuRagParameters {
                query: "fries".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(docs, ["Fries: Crispy golden fries."]);
    }
}
