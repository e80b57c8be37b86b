use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::FlowError;
use crate::or_cancel;
use crate::stream::Emitter;

/// Progress of a refinement loop.
///
/// The state also owns the termination policy, see
/// [`should_continue`](RefinementState::should_continue).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementState {
    /// The current draft.
    pub content: String,
    /// Number of refinements applied so far.
    pub iteration: usize,
    /// Whether the evaluator accepted the current draft.
    pub satisfied: bool,
}

impl RefinementState {
    /// Creates the state of a freshly generated draft.
    #[inline]
    pub fn seeded<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            iteration: 0,
            satisfied: false,
        }
    }

    /// Returns `true` if another evaluate/refine round should run.
    #[inline]
    pub fn should_continue(&self, max_iterations: usize) -> bool {
        !self.satisfied && self.iteration < max_iterations
    }

    /// Records the verdict on the current draft.
    #[inline]
    pub fn apply_evaluation(&mut self, evaluation: &Evaluation) {
        self.satisfied = evaluation.satisfied;
    }

    /// Replaces the draft with a refined one.
    #[inline]
    pub fn apply_refinement(&mut self, content: String) {
        self.content = content;
        self.iteration += 1;
    }
}

/// The verdict of an evaluator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// What should be improved.
    pub critique: String,
    /// Whether the draft is good enough as it is.
    pub satisfied: bool,
}

/// Generate, then evaluate and refine until the evaluator is satisfied or
/// the round budget is used up.
#[derive(Clone, Copy, Debug)]
pub struct RefinementLoop {
    max_iterations: usize,
}

impl RefinementLoop {
    /// Creates a loop running at most `max_iterations` evaluate/refine
    /// rounds.
    #[inline]
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Runs the loop.
    ///
    /// The draft produced by `seed` is evaluated with `evaluate`. A
    /// satisfied verdict stops the loop right away, otherwise `refine`
    /// produces the next draft from the current one and the critique. When
    /// the budget is used up, the last draft is returned unsatisfied.
    ///
    /// `emitter` receives a status chunk per phase and the state after
    /// every new draft. Failures of any step are returned as is.
    pub async fn run<E, EFut, R, RFut>(
        &self,
        seed: impl Future<Output = Result<String, FlowError>>,
        evaluate: E,
        refine: R,
        emitter: Option<&Emitter<RefinementState>>,
        cancel: &CancellationToken,
    ) -> Result<RefinementState, FlowError>
    where
        E: Fn(String) -> EFut,
        EFut: Future<Output = Result<Evaluation, FlowError>>,
        R: Fn(String, Evaluation) -> RFut,
        RFut: Future<Output = Result<String, FlowError>>,
    {
        let status = |message: String| {
            if let Some(emitter) = emitter {
                emitter.status(message);
            }
        };
        let publish = |state: &RefinementState| {
            if let Some(emitter) = emitter {
                emitter.data(state.clone());
            }
        };

        status("Generating the first draft".to_owned());
        let mut state = RefinementState::seeded(or_cancel(cancel, seed).await?);
        publish(&state);

        while state.should_continue(self.max_iterations) {
            let round = state.iteration + 1;
            status(format!("Evaluating draft {round}"));
            let evaluation =
                or_cancel(cancel, evaluate(state.content.clone())).await?;
            state.apply_evaluation(&evaluation);
            if state.satisfied {
                debug!("draft {round} accepted");
                break;
            }

            status(format!("Refining draft {round}"));
            let content =
                or_cancel(cancel, refine(state.content.clone(), evaluation))
                    .await?;
            state.apply_refinement(content);
            publish(&state);
        }

        if !state.satisfied {
            debug!("refinement budget used up after {} round(s)", state.iteration);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::stream::StreamChunk;

    fn verdict(satisfied: bool) -> Evaluation {
        Evaluation {
            critique: "More detail.".to_owned(),
            satisfied,
        }
    }

    #[test]
    fn test_termination_policy() {
        let mut state = RefinementState::seeded("draft");
        assert!(state.should_continue(1));
        assert!(!state.should_continue(0));

        state.apply_evaluation(&verdict(false));
        state.apply_refinement("better draft".to_owned());
        assert_eq!(state.iteration, 1);
        assert!(!state.should_continue(1));
        assert!(state.should_continue(2));

        state.apply_evaluation(&verdict(true));
        assert!(!state.should_continue(2));
    }

    async fn run_counting(
        max_iterations: usize,
        satisfied_at: usize,
    ) -> (RefinementState, usize, usize) {
        let evaluations = AtomicUsize::new(0);
        let refinements = AtomicUsize::new(0);
        let state = RefinementLoop::new(max_iterations)
            .run(
                async { Ok("v0".to_owned()) },
                |_| {
                    let n = evaluations.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok(verdict(n >= satisfied_at)) }
                },
                |_, _| {
                    let n = refinements.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok(format!("v{n}")) }
                },
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        (
            state,
            evaluations.load(Ordering::SeqCst),
            refinements.load(Ordering::SeqCst),
        )
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let (state, evaluations, refinements) =
            run_counting(3, usize::MAX).await;
        assert_eq!(evaluations, 3);
        assert_eq!(refinements, 3);
        assert_eq!(state.content, "v3");
        assert_eq!(state.iteration, 3);
        assert!(!state.satisfied);
    }

    #[tokio::test]
    async fn test_early_stop() {
        let (state, evaluations, refinements) = run_counting(3, 2).await;
        assert_eq!(evaluations, 2);
        assert_eq!(refinements, 1);
        assert_eq!(state.content, "v1");
        assert!(state.satisfied);

        let (state, evaluations, refinements) = run_counting(0, 1).await;
        assert_eq!((evaluations, refinements), (0, 0));
        assert_eq!(state.content, "v0");
    }

    #[tokio::test]
    async fn test_step_error_and_emitter() {
        let (emitter, mut rx) = Emitter::channel();
        let err = RefinementLoop::new(3)
            .run(
                async { Ok("v0".to_owned()) },
                |_| async { Ok(verdict(false)) },
                |_, _| async { Err(FlowError::unusable_output("refiner broke")) },
                Some(&emitter),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::unusable_output("refiner broke"));

        let mut chunks = vec![];
        while let Ok(chunk) = rx.try_recv() {
            chunks.push(chunk);
        }
        assert_eq!(
            chunks,
            [
                StreamChunk::Status("Generating the first draft".to_owned()),
                StreamChunk::Data(RefinementState::seeded("v0")),
                StreamChunk::Status("Evaluating draft 1".to_owned()),
                StreamChunk::Status("Refining draft 1".to_owned()),
            ]
        );
    }
}
