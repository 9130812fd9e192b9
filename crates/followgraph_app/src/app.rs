use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::{engine_error, engine_info};
use followgraph_core::{update, AppState, AppViewModel, Msg, SessionStatus};
use followgraph_engine::{export_results, EngineHandle};

use crate::args::Args;
use crate::config::load_settings;
use crate::effects::EffectRunner;
use crate::render;

const POLL_INTERVAL: Duration = Duration::from_millis(75);

pub fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = load_settings(args.config.as_deref())?;
    let engine = EngineHandle::new(settings).context("failed to set up the HTTP client")?;
    let mut runner = EffectRunner::new(engine);

    let mut progress = StderrProgress::default();
    let state = drive(&mut runner, &args.handle, args.limit, |view| progress.show(view))?;

    let view = state.view_with_limit(args.limit);
    print!("{}", render::report(&view));

    if let (Some(dir), SessionStatus::Done) = (&args.output, state.status()) {
        let path = export(&runner, dir, state.seed().unwrap_or(&args.handle))?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(match state.status() {
        SessionStatus::Failed => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    })
}

/// Submits `input` and pumps engine events through `update` until the search ends.
/// `on_view` sees every view that changed along the way.
pub(crate) fn drive(
    runner: &mut EffectRunner,
    input: &str,
    limit: usize,
    mut on_view: impl FnMut(&AppViewModel),
) -> anyhow::Result<AppState> {
    let mut state = AppState::new();
    state = dispatch(state, runner, Msg::InputChanged(input.to_string()));
    state = dispatch(state, runner, Msg::SearchSubmitted);
    if state.status() == SessionStatus::Idle {
        bail!("incorrect handle: {input} (expected user@domain)");
    }

    while !state.status().is_terminal() {
        let msg = runner.next_msg(POLL_INTERVAL).unwrap_or(Msg::Tick);
        state = dispatch(state, runner, msg);
        if state.consume_dirty() {
            on_view(&state.view_with_limit(limit));
        }
    }
    engine_info!("Search for {:?} ended as {:?}", state.seed(), state.status());
    Ok(state)
}

fn dispatch(mut state: AppState, runner: &mut EffectRunner, msg: Msg) -> AppState {
    let mut queue = VecDeque::from([msg]);
    while let Some(msg) = queue.pop_front() {
        let (next, effects) = update(state, msg);
        state = next;
        queue.extend(runner.enqueue(effects));
    }
    state
}

fn export(runner: &EffectRunner, dir: &Path, seed: &str) -> anyhow::Result<PathBuf> {
    let generated_utc = chrono::Utc::now().to_rfc3339();
    export_results(dir, seed, runner.last_ranked(), &generated_utc).map_err(|err| {
        engine_error!("Export to {:?} failed: {}", dir, err);
        anyhow::Error::new(err).context(format!("failed to export to {}", dir.display()))
    })
}

/// Prints stage changes and new warnings to stderr, once each.
#[derive(Default)]
struct StderrProgress {
    last_line: Option<String>,
    warnings_seen: usize,
}

impl StderrProgress {
    fn show(&mut self, view: &AppViewModel) {
        for warning in view.warnings.iter().skip(self.warnings_seen) {
            eprintln!("Warning: {warning}");
        }
        self.warnings_seen = view.warnings.len();

        let line = render::status_line(view);
        if let Some(text) = line.as_ref().filter(|_| line != self.last_line) {
            eprintln!("{text}");
        }
        self.last_line = line;
    }
}
