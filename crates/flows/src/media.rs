//! Flows turning a picture of the user into cartoon illustrations.

use agentic_flows_core::{CancellationToken, FlowError, GenerateRequest};
use agentic_flows_model::{MediaPart, Message, Part, Role};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;

const CARTOONIFY_PROMPT: &str = "Transform the person in the following \
image into a full-body cartoon character in a neutral pose. The background \
should be white.";

/// Input of [`Flows::cartoonify`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartoonifyRequest {
    /// A data URI of an image of a person to cartoonify.
    pub image: String,
}

/// Input of [`Flows::illustrate`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IllustrateRequest {
    /// The user's image as a data URI.
    pub user_image: String,
    /// A description of the illustration to generate.
    pub illustration: String,
    /// The question the story is about.
    pub question: String,
}

impl Flows {
    /// Turns a picture of a person into a cartoon character.
    ///
    /// Returns the URL of the generated image.
    pub async fn cartoonify(
        &self,
        req: CartoonifyRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let request = GenerateRequest::prompt(CARTOONIFY_PROMPT)
            .with_media(media_part(req.image));
        self.render(request, cancel).await
    }

    /// Illustrates one page of a storybook starring the user.
    ///
    /// Returns the URL of the generated image.
    pub async fn illustrate(
        &self,
        req: IllustrateRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let instructions = format!(
            "You are illustrating a page in an educational storybook for a \
             child. The story is about the question \"{}\". Generate the \
             illustration described below in a friendly cartoon style. ONLY \
             illustrate exactly what is described below. The illustration \
             should be colorful with full-image backgrounds.\n\n{}",
            req.question, req.illustration
        );
        let message = Message::new(
            Role::User,
            vec![
                Part::Text("[USER]:\n".to_owned()),
                Part::Media(media_part(req.user_image)),
                Part::Text(instructions),
            ],
        );
        self.render(GenerateRequest::new(vec![message]), cancel).await
    }

    async fn render(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FlowError> {
        let generation = self
            .engine
            .generate(
                request.with_config(self.config().image_model_config()),
                None,
                cancel,
            )
            .await?;
        match generation.media() {
            Some(media) => Ok(media.url.clone()),
            None => {
                warn!("the image model answered without any media");
                Err(FlowError::NoMediaProduced)
            }
        }
    }
}

/// Wraps a URL as a media part, taking the content type from it if it's
/// a `data:` URI.
fn media_part(url: String) -> MediaPart {
    let content_type = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split([';', ',']).next())
        .filter(|content_type| !content_type.is_empty())
        .map(str::to_owned);
    MediaPart { content_type, url }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_part() {
        let media = media_part("data:image/png;base64,iVBORw0K".to_owned());
        assert_eq!(media.content_type.as_deref(), Some("image/png"));

        let media = media_part("data:,hello".to_owned());
        assert_eq!(media.content_type, None);

        let media = media_part("https://example.com/me.jpg".to_owned());
        assert_eq!(media.content_type, None);
        assert_eq!(media.url, "https://example.com/me.jpg");
    }
}
