use std::future::Future;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use super::types::{PhaseId, PhaseResult};

/// Execute a single wave of phases concurrently
///
/// All phases are polled from the calling task, so no phase needs to be
/// `'static` and a wave never outlives the run that launched it. The wave is
/// only complete once every member has produced a result; a failing phase
/// does not cancel its siblings.
///
/// # Arguments
///
/// * `wave` - Phases to launch
/// * `max_parallel` - Optional cap on phases in flight; `None` launches all
/// * `executor_fn` - Async function running one phase to a result
///
/// # Returns
///
/// One result per phase, in completion order
pub async fn execute_wave<P, F, Fut>(
    wave: &[P],
    max_parallel: Option<usize>,
    executor_fn: F,
) -> Vec<PhaseResult<P>>
where
    P: PhaseId,
    F: Fn(P) -> Fut,
    Fut: Future<Output = PhaseResult<P>>,
{
    // A cap above the wave size changes nothing and may exceed the semaphore limit.
    let permits = max_parallel
        .unwrap_or(wave.len())
        .min(wave.len())
        .max(1);
    let sem = Semaphore::new(permits);
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for phase in wave {
        let phase = *phase;
        let sem = &sem;
        let run = &executor_fn;

        futs.push(async move {
            // The semaphore lives for the whole wave and is never closed.
            let _permit = sem.acquire().await.ok();
            run(phase).await
        });
    }

    let mut results = Vec::with_capacity(wave.len());
    while let Some(result) = futs.next().await {
        results.push(result);
    }

    results
}
