//! Followgraph core: pure search-session state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{normalize_handle_input, AppState, CandidateRow, SearchId, SessionStatus};
pub use update::update;
pub use view_model::{
    compact_count, follow_url, followed_by_summary, AppViewModel, Banner, CandidateRowView,
    RESULT_LIMIT,
};
