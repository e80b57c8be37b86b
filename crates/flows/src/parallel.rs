use agentic_flows_core::{
    CancellationToken, FanOutCoordinator, FlowError, GenerateRequest,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;

const NAME: &str = "name";
const TAGLINE: &str = "tagline";

/// Input of [`Flows::marketing_copy`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketingCopyRequest {
    /// Description of the product.
    pub product: String,
}

/// Output of [`Flows::marketing_copy`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketingCopy {
    /// A creative product name.
    pub name: String,
    /// A catchy tagline.
    pub tagline: String,
}

impl Flows {
    /// Writes a product name and a tagline concurrently.
    ///
    /// Both generations always run to completion. If either fails, the
    /// error lists every failed part.
    pub async fn marketing_copy(
        &self,
        req: MarketingCopyRequest,
        cancel: &CancellationToken,
    ) -> Result<MarketingCopy, FlowError> {
        let product = req.product;
        let tasks = [
            (
                NAME,
                GenerateRequest::prompt(format!(
                    "Generate a creative name for a new product: {product}."
                )),
            ),
            (
                TAGLINE,
                GenerateRequest::prompt(format!(
                    "Generate a catchy tagline for a new product: {product}."
                )),
            ),
        ];
        let mut outputs = FanOutCoordinator::new(self.engine.clone())
            .run(tasks, cancel)
            .await
            .into_result()?;

        let mut take = |key: &str| {
            outputs
                .remove(key)
                .map(|generation| generation.text())
                .ok_or_else(|| FlowError::TaskFailed(format!("`{key}` is missing")))
        };
        Ok(MarketingCopy {
            name: take(NAME)?,
            tagline: take(TAGLINE)?,
        })
    }
}
