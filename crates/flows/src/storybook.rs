//! Explaining a question as an illustrated storybook, streamed while it's
//! being written.

use agentic_flows_core::structured::{output_schema, parse_output};
use agentic_flows_core::{CancellationToken, Emitter, FlowError, GenerateRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Flows;

const LESSON_SYSTEM_PROMPT: &str = "You are a patient tutor explaining \
things to a five year old. Research the question and write a short, \
accurate lesson about it in plain language.";

const STORYBOOK_SYSTEM_PROMPT: &str = "Turn the lesson into a storybook for \
a child. Give it a fun title and split it into a few pages. Every page has \
1-2 paragraphs of text and a detailed description of the illustration \
that accompanies it.";

/// Input of [`Flows::storify`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorifyRequest {
    /// The question the storybook answers.
    pub question: String,
}

/// A page of a [`Storybook`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorybookPage {
    /// 1-2 paragraphs of text explaining a key concept or idea about the
    /// subject.
    #[serde(default)]
    pub text: String,
    /// A detailed description of the image that should accompany the text
    /// for this page of the lesson.
    #[serde(default)]
    pub illustration: String,
}

/// An illustrated lesson.
///
/// Streamed values are partial, so every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Storybook {
    /// A fun title for the lesson.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    /// The pages written so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<StorybookPage>>,
}

impl Flows {
    /// Researches a question, then writes a storybook explaining it.
    ///
    /// `emitter` receives a status chunk per phase and the storybook
    /// parsed so far whenever it grows. The complete storybook is emitted
    /// last, and returned.
    pub async fn storify(
        &self,
        req: StorifyRequest,
        emitter: Option<&Emitter<Storybook>>,
        cancel: &CancellationToken,
    ) -> Result<Storybook, FlowError> {
        let status = |message: &str| {
            if let Some(emitter) = emitter {
                emitter.status(message);
            }
        };

        status("Researching topic...");
        let lesson = self
            .engine
            .generate(
                GenerateRequest::prompt(req.question)
                    .with_system(LESSON_SYSTEM_PROMPT),
                None,
                cancel,
            )
            .await?
            .text();

        status("Research complete, generating lesson...");
        let mut request = GenerateRequest::prompt(lesson)
            .with_system(STORYBOOK_SYSTEM_PROMPT);
        request.config.output_schema = Some(output_schema::<Storybook>());
        let deltas = emitter.map(|emitter| emitter.json_deltas(|book| book));
        let output = self
            .engine
            .generate(request, deltas.as_ref(), cancel)
            .await?;

        let storybook: Storybook = parse_output(&output.text())?;
        if let Some(emitter) = emitter {
            emitter.data(storybook.clone());
        }
        Ok(storybook)
    }
}
