use crate::view_model::{AppViewModel, RESULT_LIMIT};

pub type SearchId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    ResolvingHandle,
    FetchingDirect,
    ExpandingSecondDegree,
    Done,
    Failed,
}

impl SessionStatus {
    pub fn is_running(self) -> bool {
        matches!(
            self,
            SessionStatus::ResolvingHandle
                | SessionStatus::FetchingDirect
                | SessionStatus::ExpandingSecondDegree
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Done | SessionStatus::Failed)
    }
}

/// A ranked candidate as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub acct: String,
    pub display_name: String,
    pub followers_count: u64,
    /// Handles of the user's direct follows that follow this candidate.
    pub followed_by: Vec<String>,
    /// Plain-text biography.
    pub bio: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    seed: Option<String>,
    search_id: Option<SearchId>,
    status: SessionStatus,
    progress: (usize, usize),
    warnings: Vec<String>,
    candidates: Vec<CandidateRow>,
    failure: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        self.view_with_limit(RESULT_LIMIT)
    }

    pub fn view_with_limit(&self, limit: usize) -> AppViewModel {
        AppViewModel::build(
            self.status,
            self.seed.as_deref(),
            self.progress,
            &self.warnings,
            &self.candidates,
            self.failure.as_deref(),
            limit,
            self.dirty,
        )
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn search_id(&self) -> Option<SearchId> {
        self.search_id
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn candidates(&self) -> &[CandidateRow] {
        &self.candidates
    }

    /// Returns whether anything visible changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, input: String) {
        self.input = input;
    }

    /// Resets every per-search field for a new search of `seed`.
    pub(crate) fn begin_search(&mut self, seed: String) {
        self.seed = Some(seed);
        self.search_id = None;
        self.status = SessionStatus::ResolvingHandle;
        self.progress = (0, 0);
        self.warnings.clear();
        self.candidates.clear();
        self.failure = None;
        self.mark_dirty();
    }

    pub(crate) fn attach_search_id(&mut self, search_id: SearchId) {
        self.search_id = Some(search_id);
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        if self.status.is_terminal() || self.status == status {
            return;
        }
        self.status = status;
        self.mark_dirty();
    }

    /// Progress never moves backwards within a search.
    pub(crate) fn apply_progress(&mut self, completed: usize, total: usize) {
        let next = (completed.max(self.progress.0), total);
        if next != self.progress {
            self.progress = next;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_candidates(&mut self, candidates: Vec<CandidateRow>) {
        self.candidates = candidates;
        self.mark_dirty();
    }

    pub(crate) fn push_warning(&mut self, message: String) {
        self.warnings.push(message);
        self.mark_dirty();
    }

    pub(crate) fn finish(&mut self) {
        self.set_status(SessionStatus::Done);
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.set_status(SessionStatus::Failed);
        self.failure = Some(reason);
        self.mark_dirty();
    }
}

/// Trims the input and drops a single leading `@`, as in `@user@example.social`.
/// Returns `None` when what remains cannot be a handle.
pub fn normalize_handle_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed);
    match handle.split_once('@') {
        Some((username, domain))
            if !username.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Some(handle.to_string())
        }
        _ => None,
    }
}
