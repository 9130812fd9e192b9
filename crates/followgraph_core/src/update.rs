use engine_logging::engine_debug;

use crate::state::normalize_handle_input;
use crate::{AppState, Effect, Msg, SessionStatus};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    // Anything from a search other than the current one is stale.
    if let Some(search_id) = msg.search_id() {
        if state.search_id() != Some(search_id) {
            engine_debug!("Dropping message for stale search {search_id}");
            return (state, Vec::new());
        }
    }

    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::SearchSubmitted => match normalize_handle_input(state.input()) {
            Some(handle) => {
                state.begin_search(handle.clone());
                vec![Effect::StartSearch { handle }]
            }
            None => Vec::new(),
        },
        Msg::SearchStarted { search_id } => {
            if state.status() == SessionStatus::ResolvingHandle && state.search_id().is_none() {
                state.attach_search_id(search_id);
            }
            Vec::new()
        }
        // Terminal states come from Finished/Failed, which carry the outcome.
        Msg::StageChanged { status, .. } => {
            if !status.is_terminal() {
                state.set_status(status);
            }
            Vec::new()
        }
        Msg::Progress {
            completed, total, ..
        } => {
            state.apply_progress(completed, total);
            Vec::new()
        }
        Msg::Results { candidates, .. } => {
            state.set_candidates(candidates);
            Vec::new()
        }
        Msg::Warning { message, .. } => {
            state.push_warning(message);
            Vec::new()
        }
        Msg::Finished { .. } => {
            state.finish();
            Vec::new()
        }
        Msg::Failed { reason, .. } => {
            state.fail(reason);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
