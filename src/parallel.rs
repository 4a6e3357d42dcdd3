//! Fan-out of per-target tasks.
//!
//! Every target gets its own tokio task. A task that returns an error or
//! panics becomes [`TaskOutcome::OrchestrationError`] for its target instead
//! of disappearing from the results, and never affects its siblings.

use crate::core::{Target, TaskOutcome};
use std::any::Any;
use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tracing::error;

/// Runs one task per target concurrently and waits for all of them.
///
/// Outcomes are returned in completion order.
pub async fn run_parallel<T, F, Fut>(targets: &[Target], make_task: F) -> Vec<TaskOutcome<T>>
where
    F: Fn(Target) -> Fut,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut workers = JoinSet::new();

    for &target in targets {
        let worker = tokio::spawn(make_task(target));
        workers.spawn(async move { (target, worker.await) });
    }

    let mut outcomes = Vec::with_capacity(targets.len());
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((target, result)) => outcomes.push(into_outcome(target, result)),
            // The supervising task only awaits its worker, so this is a runtime shutdown.
            Err(e) => error!("Worker supervisor failed: {}", e),
        }
    }

    outcomes
}

/// Runs the tasks one after another, in target order, with the same error
/// containment as [`run_parallel`].
pub async fn run_sequential<T, F, Fut>(targets: &[Target], make_task: F) -> Vec<TaskOutcome<T>>
where
    F: Fn(Target) -> Fut,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut outcomes = Vec::with_capacity(targets.len());

    for &target in targets {
        let result = tokio::spawn(make_task(target)).await;
        outcomes.push(into_outcome(target, result));
    }

    outcomes
}

fn into_outcome<T>(target: Target, joined: Result<anyhow::Result<T>, JoinError>) -> TaskOutcome<T> {
    let message = match joined {
        Ok(Ok(result)) => return TaskOutcome::Completed(result),
        Ok(Err(e)) => format!("{:#}", e),
        Err(e) if e.is_panic() => format!("task panicked: {}", panic_message(e.into_panic())),
        Err(e) => e.to_string(),
    };

    error!("❌ {} task exception: {}", target, message);
    TaskOutcome::OrchestrationError { target, message }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
