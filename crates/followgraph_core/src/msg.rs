use crate::{CandidateRow, SearchId, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the handle input.
    InputChanged(String),
    /// User submitted the current handle input.
    SearchSubmitted,
    /// The engine accepted the search and assigned it an id.
    SearchStarted { search_id: SearchId },
    /// Engine moved the search to another stage.
    StageChanged {
        search_id: SearchId,
        status: SessionStatus,
    },
    /// Second-degree walks finished so far.
    Progress {
        search_id: SearchId,
        completed: usize,
        total: usize,
    },
    /// A newer ranked candidate list.
    Results {
        search_id: SearchId,
        candidates: Vec<CandidateRow>,
    },
    /// A recoverable problem; the search carries on.
    Warning { search_id: SearchId, message: String },
    Finished { search_id: SearchId },
    /// The seed handle could not be parsed or resolved.
    Failed { search_id: SearchId, reason: String },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

impl Msg {
    /// The search a message belongs to, for messages produced by the engine.
    pub fn search_id(&self) -> Option<SearchId> {
        match self {
            Msg::StageChanged { search_id, .. }
            | Msg::Progress { search_id, .. }
            | Msg::Results { search_id, .. }
            | Msg::Warning { search_id, .. }
            | Msg::Finished { search_id }
            | Msg::Failed { search_id, .. } => Some(*search_id),
            Msg::InputChanged(_)
            | Msg::SearchSubmitted
            | Msg::SearchStarted { .. }
            | Msg::Tick
            | Msg::NoOp => None,
        }
    }
}
