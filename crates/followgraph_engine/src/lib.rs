//! Followgraph engine: follow-graph expansion, aggregation and ranking.
mod aggregate;
mod bio;
mod engine;
mod expand;
mod export;
mod fetch;
mod handle;
mod rank;
mod schedule;
mod types;

pub use aggregate::{aggregate, CandidateSet};
pub use bio::note_to_plain_text;
pub use engine::{EngineHandle, EngineSettings};
pub use expand::{search, EventSink, ExpansionSettings};
pub use export::{export_filename, export_results, ExportError};
pub use fetch::{fetch_following, next_page_from_link, FetchSettings, FollowApi, ReqwestFollowApi};
pub use handle::{qualify_acct, resolve_id, Handle};
pub use rank::rank;
pub use schedule::RecomputeScheduler;
pub use types::{
    Account, EngineEvent, FailureKind, FetchError, Page, ResolvedAccount, SearchError, SearchId,
    SearchStage, SearchSummary,
};
