//! Flows chaining model calls one after another.

use agentic_flows_core::{CancellationToken, FlowError, GenerateRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;

/// Input of [`Flows::story_writer`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryWriterRequest {
    /// What the story is about.
    pub topic: String,
}

/// Input of [`Flows::image_generator`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageGeneratorRequest {
    /// A rough concept of the image.
    pub concept: String,
}

#[derive(Deserialize, JsonSchema)]
struct StoryIdea {
    #[schemars(description = "A short, compelling story concept")]
    idea: String,
}

impl Flows {
    /// Comes up with a story idea about a topic, then writes the opening
    /// paragraph of the story.
    pub async fn story_writer(
        &self,
        req: StoryWriterRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let StoryIdea { idea } = self
            .engine
            .generate_data(
                GenerateRequest::prompt(format!(
                    "Generate a unique story idea about a {}.",
                    req.topic
                )),
                None,
                cancel,
            )
            .await?;
        if idea.trim().is_empty() {
            return Err(FlowError::unusable_output("the story idea is empty"));
        }
        debug!("story idea: {idea}");

        let story = self
            .engine
            .generate(
                GenerateRequest::prompt(format!(
                    "Write the opening paragraph for a story based on this idea: {idea}"
                )),
                None,
                cancel,
            )
            .await?;
        Ok(story.text())
    }

    /// Lets the text model write a detailed image prompt for a concept,
    /// then renders it with the image model.
    ///
    /// Returns the URL of the first generated image.
    pub async fn image_generator(
        &self,
        req: ImageGeneratorRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let image_prompt = self
            .engine
            .generate(
                GenerateRequest::prompt(format!(
                    "Create a detailed, artistic prompt for an image generation model. The concept is: \"{}\".",
                    req.concept
                )),
                None,
                cancel,
            )
            .await?
            .text();
        debug!("image prompt: {image_prompt}");

        let image = self
            .engine
            .generate(
                GenerateRequest::prompt(image_prompt)
                    .with_config(self.config().image_model_config()),
                None,
                cancel,
            )
            .await?;
        image
            .media()
            .map(|media| media.url.clone())
            .ok_or(FlowError::NoMediaProduced)
    }
}
