use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span, warn};

use super::{MatchDirection, RankedList, RecommendRequest, RecommendationEngine};
use crate::error::{ErrorReport, MatchError, Result};
use crate::{Entity, run_id};

/// Cooperative cancellation for a running batch. Queries already in flight finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// One entry per query id that was started, successful or not; a task
    /// that panicked is recorded as `Cancelled`
    pub results: BTreeMap<String, Result<RankedList>>,
    /// Queries without an id, or with an id already seen in the batch
    pub skipped: usize,
    /// Query ids that never started because the batch was cancelled
    pub cancelled: Vec<String>,
}

/// Serializable per-query outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntryReport {
    Ok { recommendations: RankedList },
    Error { error: ErrorReport },
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.values().filter(|r| r.is_err()).count()
    }

    pub fn report(&self) -> BTreeMap<String, BatchEntryReport> {
        self.results
            .iter()
            .map(|(id, outcome)| {
                let entry = match outcome {
                    Ok(recommendations) => BatchEntryReport::Ok {
                        recommendations: recommendations.clone(),
                    },
                    Err(err) => BatchEntryReport::Error { error: err.report() },
                };
                (id.clone(), entry)
            })
            .collect()
    }
}

impl RecommendationEngine {
    /// Run [`recommend`](Self::recommend) for every query against one shared pool.
    ///
    /// At most `batch_concurrency` queries run at once. A failing query is
    /// recorded under its id and does not affect the others.
    pub async fn batch_recommend(
        self: &Arc<Self>,
        direction: MatchDirection,
        queries: Vec<Entity>,
        pool: Arc<Vec<Entity>>,
        request: RecommendRequest,
        cancel: &CancellationHandle,
    ) -> BatchOutcome {
        let span = info_span!(
            "batch_recommend",
            run_id = %run_id::generate(),
            direction = direction.as_str(),
            queries = queries.len(),
            pool_size = pool.len(),
        );

        async {
            let permits = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
            let request = Arc::new(request);
            let mut outcome = BatchOutcome::default();
            let mut seen = BTreeSet::new();
            let mut running = BTreeSet::new();
            let mut tasks = JoinSet::new();

            for query in queries {
                let Some(id) = query.id().map(str::to_string) else {
                    warn!("skipping query without id");
                    outcome.skipped += 1;
                    continue;
                };
                if !seen.insert(id.clone()) {
                    warn!(%id, "skipping duplicate query id");
                    outcome.skipped += 1;
                    continue;
                }
                if cancel.is_cancelled() {
                    outcome.cancelled.push(id);
                    continue;
                }

                let Ok(permit) = permits.clone().acquire_owned().await else {
                    outcome.cancelled.push(id);
                    continue;
                };
                if cancel.is_cancelled() {
                    outcome.cancelled.push(id);
                    continue;
                }

                running.insert(id.clone());
                let engine = Arc::clone(self);
                let pool = Arc::clone(&pool);
                let request = Arc::clone(&request);
                tasks.spawn(
                    async move {
                        let _permit = permit;
                        let ranked = engine.recommend(direction, &query, &pool, &request).await;
                        (id, ranked)
                    }
                    .in_current_span(),
                );
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((id, ranked)) => {
                        if let Err(err) = &ranked {
                            warn!(%id, error = %err, "query failed");
                        }
                        running.remove(&id);
                        outcome.results.insert(id, ranked);
                    }
                    Err(err) => error!(error = %err, "batch task aborted"),
                }
            }

            // whatever is still running never returned its id
            for id in running {
                outcome
                    .results
                    .insert(id, Err(MatchError::Cancelled("task aborted".into())));
            }

            info!(
                succeeded = outcome.succeeded(),
                failed = outcome.failed(),
                skipped = outcome.skipped,
                cancelled = outcome.cancelled.len(),
                "batch finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }
}
