//! Friends-of-friends expansion for one search.
//!
//! The seed's direct follows are walked first. Each direct follow's own following
//! list is then walked on a bounded pool of tasks. Every finished walk sends its
//! batch over a channel to the single loop that owns aggregation, so no batch is
//! ever shared between tasks.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregate::aggregate;
use crate::fetch::{fetch_following, FollowApi};
use crate::handle::{resolve_id, Handle};
use crate::rank::rank;
use crate::schedule::{sleep_until_deadline, RecomputeScheduler};
use crate::{Account, EngineEvent, SearchError, SearchId, SearchStage, SearchSummary};

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionSettings {
    pub direct_follow_cap: usize,
    pub second_degree_cap: usize,
    /// Outbound page walks allowed in flight at once.
    pub max_concurrent_requests: usize,
    pub recompute_window: Duration,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            direct_follow_cap: 2000,
            second_degree_cap: 200,
            max_concurrent_requests: 16,
            recompute_window: Duration::from_secs(2),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Runs one search to completion, reporting through `sink`.
///
/// Only an unparsable or unresolvable seed handle fails the search. Every later
/// failure becomes an [`EngineEvent::Warning`] and the search still finishes with
/// whatever was gathered.
pub async fn search(
    api: Arc<dyn FollowApi>,
    settings: &ExpansionSettings,
    search_id: SearchId,
    raw_handle: &str,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) -> Result<SearchSummary, SearchError> {
    let session = Session {
        search_id,
        sink,
        warnings: Arc::new(AtomicUsize::new(0)),
    };

    session.stage(SearchStage::ResolvingHandle);
    let seed = match Handle::parse(raw_handle) {
        Ok(seed) => seed,
        Err(err) => return Err(session.fail(err)),
    };
    let resolved = match cancel
        .run_until_cancelled(resolve_id(api.as_ref(), &seed))
        .await
    {
        Some(Ok(resolved)) => resolved,
        Some(Err(err)) => return Err(session.fail(err)),
        None => return Err(SearchError::Superseded),
    };

    session.stage(SearchStage::FetchingDirect);
    let warn = session.warning_sink();
    let start_url = api.following_url(&resolved);
    let direct = cancel
        .run_until_cancelled(fetch_following(
            api.as_ref(),
            &seed,
            &start_url,
            settings.direct_follow_cap,
            &warn,
        ))
        .await
        .ok_or(SearchError::Superseded)?;

    let mut excluded: HashSet<String> = HashSet::with_capacity(direct.len() + 1);
    excluded.insert(seed.acct());
    let direct_handles: Vec<String> = direct
        .into_iter()
        .filter_map(|account| excluded.insert(account.acct.clone()).then_some(account.acct))
        .collect();
    let total = direct_handles.len();
    engine_info!("Search {search_id}: {seed} follows {total} accounts");
    session.emit(EngineEvent::Progress {
        search_id,
        completed: 0,
        total,
    });

    session.stage(SearchStage::ExpandingSecondDegree);
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<Vec<Account>>();
    let permits = Arc::new(Semaphore::new(settings.max_concurrent_requests.max(1)));
    let mut walks = JoinSet::new();
    for direct_handle in direct_handles {
        let api = api.clone();
        let permits = permits.clone();
        let batch_tx = batch_tx.clone();
        let warn = session.warning_sink();
        let cap = settings.second_degree_cap;
        walks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let batch = second_degree(api.as_ref(), &direct_handle, cap, &warn).await;
            let _ = batch_tx.send(batch);
        });
    }
    drop(batch_tx);

    // Sole owner of the accumulated batches.
    let mut batches: Vec<Vec<Account>> = Vec::with_capacity(total);
    let mut completed = 0;
    let mut scheduler = RecomputeScheduler::new(settings.recompute_window);
    loop {
        let deadline = scheduler.deadline();
        tokio::select! {
            _ = cancel.cancelled() => {
                engine_info!("Search {search_id} superseded after {completed}/{total} walks");
                walks.abort_all();
                return Err(SearchError::Superseded);
            }
            received = batch_rx.recv() => match received {
                Some(batch) => {
                    batches.push(batch);
                    completed += 1;
                    session.emit(EngineEvent::Progress { search_id, completed, total });
                    scheduler.mark_dirty(Instant::now());
                }
                None => break,
            },
            _ = sleep_until_deadline(deadline) => {
                scheduler.flushed();
                session.publish(&batches, &excluded);
            }
        }
    }

    // Final flush, whether or not a window is still open.
    scheduler.flushed();
    let candidates = session.publish(&batches, &excluded);
    session.stage(SearchStage::Done);

    let summary = SearchSummary {
        seed: seed.acct(),
        direct_follows: total,
        candidates,
        warnings: session.warnings.load(Ordering::Relaxed),
    };
    engine_info!(
        "Search {search_id} done: {} candidates, {} warnings",
        summary.candidates,
        summary.warnings
    );
    session.emit(EngineEvent::Finished {
        search_id,
        summary: summary.clone(),
    });
    Ok(summary)
}

/// Resolves one direct follow at its home server and walks its following list,
/// tagging every account found with that direct follow's handle.
async fn second_degree(
    api: &dyn FollowApi,
    direct_handle: &str,
    cap: usize,
    on_error: &(dyn Fn(String) + Send + Sync),
) -> Vec<Account> {
    let Ok(handle) = Handle::parse(direct_handle) else {
        on_error(format!("Cannot find handle {direct_handle}."));
        return Vec::new();
    };
    let Ok(resolved) = resolve_id(api, &handle).await else {
        on_error(format!("Cannot find handle {direct_handle}."));
        return Vec::new();
    };

    let start_url = api.following_url(&resolved);
    let mut follows = fetch_following(api, &handle, &start_url, cap, on_error).await;
    for account in &mut follows {
        account.followed_by.clear();
        account.followed_by.insert(direct_handle.to_string());
    }
    engine_debug!("{direct_handle} follows {} accounts", follows.len());
    follows
}

struct Session {
    search_id: SearchId,
    sink: Arc<dyn EventSink>,
    warnings: Arc<AtomicUsize>,
}

impl Session {
    fn emit(&self, event: EngineEvent) {
        self.sink.emit(event);
    }

    fn stage(&self, stage: SearchStage) {
        engine_debug!("Search {} stage {:?}", self.search_id, stage);
        self.emit(EngineEvent::Stage {
            search_id: self.search_id,
            stage,
        });
    }

    fn fail(&self, error: SearchError) -> SearchError {
        self.stage(SearchStage::Failed);
        self.emit(EngineEvent::Failed {
            search_id: self.search_id,
            error: error.clone(),
        });
        error
    }

    fn warning_sink(&self) -> impl Fn(String) + Send + Sync + 'static {
        let search_id = self.search_id;
        let sink = self.sink.clone();
        let warnings = self.warnings.clone();
        move |message: String| {
            warnings.fetch_add(1, Ordering::Relaxed);
            sink.emit(EngineEvent::Warning { search_id, message });
        }
    }

    /// Re-aggregates, re-ranks and publishes. Returns the candidate count.
    fn publish(&self, batches: &[Vec<Account>], excluded: &HashSet<String>) -> usize {
        let ranked = rank(aggregate(batches, excluded).into_accounts());
        let count = ranked.len();
        engine_debug!("Search {} publishing {count} candidates", self.search_id);
        self.emit(EngineEvent::Results {
            search_id: self.search_id,
            ranked,
        });
        count
    }
}
