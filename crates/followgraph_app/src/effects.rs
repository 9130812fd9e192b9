use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use followgraph_core::{CandidateRow, Effect, Msg, SessionStatus};
use followgraph_engine::{note_to_plain_text, Account, EngineEvent, EngineHandle, SearchStage};

/// Executes core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    last_ranked: Vec<Account>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            last_ranked: Vec::new(),
        }
    }

    /// Runs `effects`; returns the messages they produce right away.
    pub fn enqueue(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut msgs = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartSearch { handle } => {
                    self.last_ranked.clear();
                    let search_id = self.engine.search(handle.clone());
                    engine_info!("StartSearch search_id={} handle={}", search_id, handle);
                    msgs.push(Msg::SearchStarted { search_id });
                }
            }
        }
        msgs
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&mut self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        if let EngineEvent::Results { ranked, .. } = &event {
            self.last_ranked = ranked.clone();
        }
        Some(map_event(event))
    }

    /// Most recent ranked list, in engine form.
    pub fn last_ranked(&self) -> &[Account] {
        &self.last_ranked
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Stage { search_id, stage } => Msg::StageChanged {
            search_id,
            status: map_stage(stage),
        },
        EngineEvent::Progress {
            search_id,
            completed,
            total,
        } => Msg::Progress {
            search_id,
            completed,
            total,
        },
        EngineEvent::Results { search_id, ranked } => Msg::Results {
            search_id,
            candidates: ranked.iter().map(candidate_row).collect(),
        },
        EngineEvent::Warning { search_id, message } => {
            engine_warn!("Search {}: {}", search_id, message);
            Msg::Warning { search_id, message }
        }
        EngineEvent::Finished { search_id, summary } => {
            engine_info!(
                "Search {} finished: {} direct follows, {} candidates, {} warnings",
                search_id,
                summary.direct_follows,
                summary.candidates,
                summary.warnings
            );
            Msg::Finished { search_id }
        }
        EngineEvent::Failed { search_id, error } => Msg::Failed {
            search_id,
            reason: error.to_string(),
        },
    }
}

fn map_stage(stage: SearchStage) -> SessionStatus {
    match stage {
        SearchStage::ResolvingHandle => SessionStatus::ResolvingHandle,
        SearchStage::FetchingDirect => SessionStatus::FetchingDirect,
        SearchStage::ExpandingSecondDegree => SessionStatus::ExpandingSecondDegree,
        SearchStage::Done => SessionStatus::Done,
        SearchStage::Failed => SessionStatus::Failed,
    }
}

fn candidate_row(account: &Account) -> CandidateRow {
    CandidateRow {
        acct: account.acct.clone(),
        display_name: account.display_name.clone(),
        followers_count: account.followers_count,
        followed_by: account.followed_by.iter().cloned().collect(),
        bio: note_to_plain_text(&account.note),
        avatar_url: account.avatar_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use followgraph_core::{Msg, SessionStatus};
    use followgraph_engine::{Account, EngineEvent, SearchError, SearchStage};

    use super::map_event;

    #[test]
    fn results_become_rows_with_plain_bios() {
        let account = Account {
            id: "1".to_string(),
            acct: "ann@a.social".to_string(),
            followed_by: BTreeSet::from(["bob@b.social".to_string()]),
            followers_count: 12,
            discoverable: true,
            display_name: "Ann".to_string(),
            note: "<p>Hi &amp; welcome</p>".to_string(),
            avatar_url: "https://a.social/ann.png".to_string(),
        };
        let msg = map_event(EngineEvent::Results {
            search_id: 3,
            ranked: vec![account],
        });

        let Msg::Results {
            search_id,
            candidates,
        } = msg
        else {
            panic!("expected results, got {msg:?}");
        };
        assert_eq!(search_id, 3);
        assert_eq!(candidates[0].bio, "Hi & welcome");
        assert_eq!(candidates[0].followed_by, vec!["bob@b.social".to_string()]);
    }

    #[test]
    fn stages_and_failures_map_across() {
        assert_eq!(
            map_event(EngineEvent::Stage {
                search_id: 1,
                stage: SearchStage::ExpandingSecondDegree
            }),
            Msg::StageChanged {
                search_id: 1,
                status: SessionStatus::ExpandingSecondDegree
            }
        );
        assert_eq!(
            map_event(EngineEvent::Failed {
                search_id: 2,
                error: SearchError::InvalidHandle("nope".to_string()),
            }),
            Msg::Failed {
                search_id: 2,
                reason: "incorrect handle: nope".to_string(),
            }
        );
    }
}
