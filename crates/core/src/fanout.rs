use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::TurnEngine;
use crate::error::FlowError;
use crate::generate::{GenerateRequest, Generation};
use crate::or_cancel;

/// Outcomes of a fan-out, one per task key.
#[derive(Debug)]
pub struct FanOutResult<K, T> {
    /// The outcome of every task, ordered by key.
    pub outcomes: BTreeMap<K, Result<T, FlowError>>,
}

impl<K: Ord + Display, T> FanOutResult<K, T> {
    /// Returns `true` if every task succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(Result::is_ok)
    }

    /// Returns all values if every task succeeded, otherwise a
    /// [`FlowError::FanOutPartialFailure`] listing every failed key.
    pub fn into_result(self) -> Result<BTreeMap<K, T>, FlowError> {
        let mut values = BTreeMap::new();
        let mut failures = vec![];
        for (key, outcome) in self.outcomes {
            match outcome {
                Ok(value) => {
                    values.insert(key, value);
                }
                Err(err) => failures.push((key.to_string(), err)),
            }
        }
        if failures.is_empty() {
            Ok(values)
        } else {
            Err(FlowError::FanOutPartialFailure { failures })
        }
    }
}

/// Runs independent generation tasks concurrently and collects all of
/// their outcomes.
///
/// Every task runs on its own tokio task, gated by a semaphore. The
/// coordinator always waits for every task to finish, a failing task
/// doesn't cancel its siblings. Cancelling the token passed to `run`
/// cancels all of them together.
#[derive(Clone)]
pub struct FanOutCoordinator {
    engine: TurnEngine,
    concurrency: usize,
}

impl FanOutCoordinator {
    /// Creates a coordinator issuing generation requests through `engine`,
    /// with the concurrency limit from its configuration.
    #[inline]
    pub fn new(engine: TurnEngine) -> Self {
        let concurrency = engine.config().fan_out_concurrency;
        Self {
            engine,
            concurrency,
        }
    }

    /// Sets the maximum number of tasks running at the same time. A limit
    /// of zero is treated as one.
    #[inline]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Issues one single-shot generation per task.
    pub async fn run<K>(
        &self,
        tasks: impl IntoIterator<Item = (K, GenerateRequest)>,
        cancel: &CancellationToken,
    ) -> FanOutResult<K, Generation>
    where
        K: Ord + Send + 'static,
    {
        self.run_with(tasks, cancel, |request, cancel| {
            let engine = self.engine.clone();
            async move { engine.generate(request, None, &cancel).await }
        })
        .await
    }

    /// Runs `f` once per task.
    ///
    /// `f` receives the task input and a token that fires when the fan-out
    /// is cancelled.
    pub async fn run_with<K, I, T, F, Fut>(
        &self,
        tasks: impl IntoIterator<Item = (K, I)>,
        cancel: &CancellationToken,
        f: F,
    ) -> FanOutResult<K, T>
    where
        K: Ord + Send + 'static,
        T: Send + 'static,
        F: Fn(I, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, FlowError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let token = cancel.child_token();
        // Tasks are detached from this future, so dropping it must still
        // stop them.
        let _guard = token.clone().drop_guard();

        let mut handles = vec![];
        for (idx, (key, input)) in tasks.into_iter().enumerate() {
            let fut = f(input, token.clone());
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            let handle = tokio::spawn(
                async move {
                    let _permit = tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(FlowError::Cancelled),
                        permit = semaphore.acquire_owned() => {
                            permit.map_err(|_| FlowError::Cancelled)?
                        }
                    };
                    trace!("task started");
                    or_cancel(&token, fut).await
                }
                .instrument(debug_span!("fan-out task", idx)),
            );
            handles.push((key, handle));
        }
        debug!("spawned {} fan-out task(s)", handles.len());

        let mut outcomes = BTreeMap::new();
        for (key, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("fan-out task failed: {err}");
                    Err(FlowError::TaskFailed(err.to_string()))
                }
            };
            if outcomes.insert(key, outcome).is_some() {
                warn!("duplicated fan-out key, keeping the last outcome");
            }
        }
        FanOutResult { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use agentic_flows_model::ErrorKind;
    use agentic_flows_test_model::{PresetResponse, TestModelProvider};
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::engine::TurnEngineBuilder;

    fn coordinator(model_provider: TestModelProvider) -> FanOutCoordinator {
        FanOutCoordinator::new(
            TurnEngineBuilder::with_model_provider(model_provider).build(),
        )
    }

    #[tokio::test]
    async fn test_all_success() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_prompt_rule("name", PresetResponse::with_text("Glowly"));
        model_provider
            .add_prompt_rule("tagline", PresetResponse::with_text("Light up."));

        let result = coordinator(model_provider)
            .run(
                [
                    ("tagline", GenerateRequest::prompt("Write a tagline")),
                    ("name", GenerateRequest::prompt("Write a name")),
                ],
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_success());
        let values = result.into_result().unwrap();
        let texts: Vec<_> = values
            .iter()
            .map(|(key, generation)| (*key, generation.text()))
            .collect();
        assert_eq!(
            texts,
            [("name", "Glowly".to_owned()), ("tagline", "Light up.".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_partial_failure_waits_for_all() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_prompt_rule("name", PresetResponse::with_text("Glowly"));
        model_provider.add_prompt_rule(
            "tagline",
            PresetResponse::with_text("unused").with_failures(0),
        );

        let result = coordinator(model_provider)
            .run(
                [
                    ("name", GenerateRequest::prompt("Write a name")),
                    ("tagline", GenerateRequest::prompt("Write a tagline")),
                ],
                &CancellationToken::new(),
            )
            .await;
        assert!(!result.is_success());
        assert!(result.outcomes["name"].is_ok());

        let Err(FlowError::FanOutPartialFailure { failures }) =
            result.into_result()
        else {
            panic!("expected a partial failure");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "tagline");
        assert!(matches!(
            failures[0].1,
            FlowError::Generation {
                kind: ErrorKind::RateLimitExceeded,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_completion_order_doesnt_matter() {
        let result = coordinator(TestModelProvider::default())
            .run_with(
                (0..5u64).map(|idx| (idx, idx)),
                &CancellationToken::new(),
                |idx, _| async move {
                    // Later keys finish first.
                    sleep(Duration::from_millis(50 - idx * 10)).await;
                    Ok(idx * 10)
                },
            )
            .await;
        let values = result.into_result().unwrap();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|(key, value)| *value == key * 10));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let result = coordinator(TestModelProvider::default())
            .with_concurrency(2)
            .run_with((0..8).map(|idx| (idx, ())), &CancellationToken::new(), |_, _| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;
        assert!(result.is_success());
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let cancel = CancellationToken::new();
        let coordinator = coordinator(TestModelProvider::default());
        let run = coordinator.run_with(
            ["a", "b", "c"].map(|key| (key, ())),
            &cancel,
            |_, _| async {
                sleep(Duration::from_secs(10)).await;
                Ok(())
            },
        );
        let canceller = {
            let cancel = cancel.clone();
            async move {
                sleep(Duration::from_millis(10)).await;
                cancel.cancel();
            }
        };
        let (result, ()) = timeout(Duration::from_secs(1), async {
            tokio::join!(run, canceller)
        })
        .await
        .unwrap();
        assert_eq!(result.outcomes.len(), 3);
        assert!(
            result
                .outcomes
                .values()
                .all(|outcome| matches!(outcome, Err(FlowError::Cancelled)))
        );
    }

    #[tokio::test]
    async fn test_panicking_task() {
        let result = coordinator(TestModelProvider::default())
            .run_with([("ok", false), ("boom", true)], &CancellationToken::new(), |panics, _| async move {
                if panics {
                    panic!("boom");
                }
                Ok(1)
            })
            .await;
        assert!(result.outcomes["ok"].is_ok());
        assert!(matches!(result.outcomes["boom"], Err(FlowError::TaskFailed(_))));
    }
}
