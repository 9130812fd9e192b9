use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::engine_info;
use tokio_util::sync::CancellationToken;

use crate::expand::{search, EventSink, ExpansionSettings};
use crate::fetch::{FetchSettings, FollowApi, ReqwestFollowApi};
use crate::{EngineEvent, FetchError, SearchId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub fetch: FetchSettings,
    pub expansion: ExpansionSettings,
}

enum EngineCommand {
    Search { search_id: SearchId, handle: String },
}

/// Runs searches on a background tokio runtime.
///
/// Only the most recently started search publishes: starting a new one cancels the
/// previous search and drops any event it still emits.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    current: Arc<AtomicU64>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, FetchError> {
        let api = Arc::new(ReqwestFollowApi::new(settings.fetch)?);
        Ok(Self::with_api(api, settings.expansion))
    }

    pub fn with_api(api: Arc<dyn FollowApi>, expansion: ExpansionSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let current = Arc::new(AtomicU64::new(0));
        let sink: Arc<dyn EventSink> = Arc::new(CurrentSearchSink {
            tx: event_tx,
            current: current.clone(),
        });

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut active: Option<CancellationToken> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Search { search_id, handle } => {
                        if let Some(previous) = active.take() {
                            previous.cancel();
                        }
                        let cancel = CancellationToken::new();
                        active = Some(cancel.clone());
                        let api = api.clone();
                        let sink = sink.clone();
                        let expansion = expansion.clone();
                        runtime.spawn(async move {
                            let _ = search(api, &expansion, search_id, &handle, sink, cancel).await;
                        });
                    }
                }
            }
        });

        Self {
            cmd_tx,
            event_rx,
            current,
        }
    }

    /// Starts a search for `handle`, superseding any search still running.
    pub fn search(&self, handle: impl Into<String>) -> SearchId {
        let search_id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = handle.into();
        engine_info!("Search {search_id} started for {handle}");
        let _ = self.cmd_tx.send(EngineCommand::Search { search_id, handle });
        search_id
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

/// Forwards events of the current search only.
struct CurrentSearchSink {
    tx: mpsc::Sender<EngineEvent>,
    current: Arc<AtomicU64>,
}

impl EventSink for CurrentSearchSink {
    fn emit(&self, event: EngineEvent) {
        if event.search_id() == self.current.load(Ordering::SeqCst) {
            let _ = self.tx.send(event);
        }
    }
}
