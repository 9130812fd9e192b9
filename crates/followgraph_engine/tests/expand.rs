use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use followgraph_engine::{
    search, Account, EngineEvent, EngineHandle, EventSink, ExpansionSettings, FailureKind,
    FetchError, FollowApi, Handle, Page, ResolvedAccount, SearchError, SearchStage,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// In-memory server: one page per account, optional delay per page.
#[derive(Default)]
struct FakeApi {
    ids: HashMap<String, String>,
    pages: HashMap<String, Result<Page, FetchError>>,
    delays: HashMap<String, Duration>,
    lookup_delay: HashMap<String, Duration>,
    lookups: AtomicUsize,
}

impl FakeApi {
    fn account(mut self, acct: &str, follows: &[Account]) -> Self {
        let id = format!("id-{acct}");
        self.ids.insert(acct.to_string(), id.clone());
        self.pages.insert(
            format!("mem://{id}"),
            Ok(Page {
                accounts: Some(follows.to_vec()),
                next: None,
            }),
        );
        self
    }

    fn failing(mut self, acct: &str) -> Self {
        let id = format!("id-{acct}");
        self.ids.insert(acct.to_string(), id.clone());
        self.pages.insert(
            format!("mem://{id}"),
            Err(FetchError {
                kind: FailureKind::HttpStatus(503),
                message: "503 Service Unavailable".to_string(),
            }),
        );
        self
    }

    fn delayed(mut self, acct: &str, delay: Duration) -> Self {
        self.delays.insert(format!("mem://id-{acct}"), delay);
        self
    }

    fn slow_lookup(mut self, acct: &str, delay: Duration) -> Self {
        self.lookup_delay.insert(acct.to_string(), delay);
        self
    }
}

#[async_trait::async_trait]
impl FollowApi for FakeApi {
    async fn lookup(&self, handle: &Handle) -> Result<String, FetchError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay.get(&handle.acct()) {
            tokio::time::sleep(*delay).await;
        }
        self.ids.get(&handle.acct()).cloned().ok_or(FetchError {
            kind: FailureKind::HttpStatus(404),
            message: "404 Not Found".to_string(),
        })
    }

    async fn page(&self, url: &str) -> Result<Page, FetchError> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.pages.get(url).cloned().unwrap_or_else(|| {
            Ok(Page {
                accounts: Some(Vec::new()),
                next: None,
            })
        })
    }

    fn following_url(&self, account: &ResolvedAccount) -> String {
        format!("mem://{}", account.id)
    }
}

fn acct(handle: &str, followers_count: u64) -> Account {
    Account {
        id: format!("id-{handle}"),
        acct: handle.to_string(),
        followed_by: Default::default(),
        followers_count,
        discoverable: true,
        display_name: handle.to_string(),
        note: String::new(),
        avatar_url: String::new(),
    }
}

fn hidden(handle: &str) -> Account {
    Account {
        discoverable: false,
        ..acct(handle, 1_000_000)
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn results(events: &[EngineEvent]) -> Vec<Vec<String>> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Results { ranked, .. } => {
                Some(ranked.iter().map(|a| a.acct.clone()).collect())
            }
            _ => None,
        })
        .collect()
}

fn progress(events: &[EngineEvent]) -> Vec<(usize, usize)> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress {
                completed, total, ..
            } => Some((*completed, *total)),
            _ => None,
        })
        .collect()
}

fn warnings(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Warning { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

fn stages(events: &[EngineEvent]) -> Vec<SearchStage> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Stage { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

fn three_friends_one_broken() -> FakeApi {
    FakeApi::default()
        .account(
            "me@home.social",
            &[acct("ann", 1), acct("bob@two.social", 1), acct("cat@three.social", 1)],
        )
        .account(
            "ann@home.social",
            &[
                acct("xavier@far.social", 100),
                acct("yara", 5000),
                acct("bob@two.social", 1),
                hidden("ghost@far.social"),
            ],
        )
        .account(
            "bob@two.social",
            &[
                acct("xavier@far.social", 100),
                acct("zed@far.social", 50),
                acct("wil", 10),
                acct("me@home.social", 1),
                acct("cat@three.social", 1),
                hidden("ghost@far.social"),
            ],
        )
        .failing("cat@three.social")
}

#[tokio::test]
async fn partial_failure_still_publishes_merged_ranking() {
    init_logging();
    let sink = Arc::new(TestSink::default());
    let summary = search(
        Arc::new(three_friends_one_broken()),
        &ExpansionSettings::default(),
        7,
        "me@home.social",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("search completes");

    let events = sink.take();
    assert!(events.iter().all(|event| event.search_id() == 7));

    let published = results(&events);
    assert_eq!(
        published.last().unwrap(),
        &vec![
            "xavier@far.social".to_string(),
            "yara@home.social".to_string(),
            "zed@far.social".to_string(),
            // Bare usernames take the listing account's domain, not the seed's.
            "wil@two.social".to_string(),
        ]
    );

    let warnings = warnings(&events);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("cat@three.social"));

    let progress = progress(&events);
    assert_eq!(progress.first(), Some(&(0, 3)));
    assert_eq!(progress.last(), Some(&(3, 3)));
    assert!(progress.windows(2).all(|pair| pair[0].0 <= pair[1].0));

    assert_eq!(
        stages(&events),
        vec![
            SearchStage::ResolvingHandle,
            SearchStage::FetchingDirect,
            SearchStage::ExpandingSecondDegree,
            SearchStage::Done,
        ]
    );
    assert_eq!(summary.seed, "me@home.social");
    assert_eq!(summary.direct_follows, 3);
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.warnings, 1);
    assert!(matches!(events.last(), Some(EngineEvent::Finished { .. })));
}

#[tokio::test]
async fn mutual_connections_are_unioned_across_direct_follows() {
    init_logging();
    let sink = Arc::new(TestSink::default());
    search(
        Arc::new(three_friends_one_broken()),
        &ExpansionSettings::default(),
        1,
        "me@home.social",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("search completes");

    let ranked = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Results { ranked, .. } => Some(ranked),
            _ => None,
        })
        .last()
        .unwrap();
    let xavier = &ranked[0];
    assert_eq!(
        xavier.followed_by.iter().cloned().collect::<Vec<_>>(),
        vec!["ann@home.social".to_string(), "bob@two.social".to_string()]
    );
    assert!(ranked.iter().all(|a| a.acct != "ghost@far.social"));
}

#[tokio::test]
async fn malformed_handle_fails_without_network() {
    init_logging();
    let api = Arc::new(FakeApi::default());
    let sink = Arc::new(TestSink::default());
    let err = search(
        api.clone(),
        &ExpansionSettings::default(),
        1,
        "no-domain-here",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err, SearchError::InvalidHandle("no-domain-here".to_string()));
    assert_eq!(api.lookups.load(Ordering::SeqCst), 0);
    let events = sink.take();
    assert_eq!(
        stages(&events),
        vec![SearchStage::ResolvingHandle, SearchStage::Failed]
    );
    assert!(results(&events).is_empty());
    assert!(matches!(events.last(), Some(EngineEvent::Failed { .. })));
}

#[tokio::test]
async fn unknown_seed_is_terminal() {
    init_logging();
    let sink = Arc::new(TestSink::default());
    let err = search(
        Arc::new(FakeApi::default()),
        &ExpansionSettings::default(),
        1,
        "nobody@home.social",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SearchError::Lookup { ref handle, .. } if handle == "nobody@home.social"));
    assert!(results(&sink.take()).is_empty());
}

#[tokio::test]
async fn no_candidates_is_done_not_failed() {
    init_logging();
    let api = FakeApi::default()
        .account("me@home.social", &[acct("ann", 1)])
        .account("ann@home.social", &[acct("me@home.social", 1)]);
    let sink = Arc::new(TestSink::default());
    let summary = search(
        Arc::new(api),
        &ExpansionSettings::default(),
        1,
        "me@home.social",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("empty result is still a result");

    assert_eq!(summary.candidates, 0);
    let events = sink.take();
    assert_eq!(results(&events).last(), Some(&Vec::new()));
    assert_eq!(stages(&events).last(), Some(&SearchStage::Done));
}

#[tokio::test]
async fn unresolvable_direct_follow_counts_as_completed() {
    init_logging();
    let api = FakeApi::default().account("me@home.social", &[acct("vanished@gone.social", 1)]);
    let sink = Arc::new(TestSink::default());
    search(
        Arc::new(api),
        &ExpansionSettings::default(),
        1,
        "me@home.social",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("search completes");

    let events = sink.take();
    assert_eq!(progress(&events), vec![(0, 1), (1, 1)]);
    assert_eq!(
        warnings(&events),
        vec!["Cannot find handle vanished@gone.social.".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn completions_within_a_window_share_one_recompute() {
    init_logging();
    let api = FakeApi::default()
        .account(
            "me@home.social",
            &[acct("a", 1), acct("b", 1), acct("c", 1), acct("d", 1)],
        )
        .account("a@home.social", &[acct("p@x.social", 1)])
        .account("b@home.social", &[acct("q@x.social", 1)])
        .account("c@home.social", &[acct("r@x.social", 1)])
        .account("d@home.social", &[acct("s@x.social", 1)])
        .delayed("a@home.social", Duration::from_millis(100))
        .delayed("b@home.social", Duration::from_millis(200))
        .delayed("c@home.social", Duration::from_millis(300))
        .delayed("d@home.social", Duration::from_secs(5));
    let settings = ExpansionSettings {
        recompute_window: Duration::from_secs(1),
        ..ExpansionSettings::default()
    };
    let sink = Arc::new(TestSink::default());
    search(
        Arc::new(api),
        &settings,
        1,
        "me@home.social",
        sink.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("search completes");

    let events = sink.take();
    let published = results(&events);
    assert_eq!(published.len(), 2, "{published:?}");
    assert_eq!(published[0].len(), 3);
    assert_eq!(published[1].len(), 4);
    assert_eq!(progress(&events).len(), 5);
}

#[tokio::test]
async fn cancelled_search_stops_without_failing() {
    init_logging();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = Arc::new(TestSink::default());
    let err = search(
        Arc::new(three_friends_one_broken()),
        &ExpansionSettings::default(),
        1,
        "me@home.social",
        sink.clone(),
        cancel,
    )
    .await
    .unwrap_err();

    assert_eq!(err, SearchError::Superseded);
    let events = sink.take();
    assert!(results(&events).is_empty());
    assert!(!events.iter().any(|e| matches!(e, EngineEvent::Failed { .. })));
}

#[test]
fn newer_search_silences_the_superseded_one() {
    init_logging();
    let api = three_friends_one_broken()
        .account("slow@home.social", &[acct("ann", 1)])
        .slow_lookup("slow@home.social", Duration::from_secs(2));
    let engine = EngineHandle::with_api(Arc::new(api), ExpansionSettings::default());

    let first = engine.search("slow@home.social");
    let second = engine.search("me@home.social");
    assert!(second > first);

    let mut received = Vec::new();
    loop {
        let event = engine
            .recv_timeout(Duration::from_secs(10))
            .expect("second search finishes");
        let finished = matches!(event, EngineEvent::Finished { search_id, .. } if search_id == second);
        received.push(event);
        if finished {
            break;
        }
    }
    // Give the first search time to reach the point where it would have published.
    std::thread::sleep(Duration::from_millis(2500));
    while let Some(event) = engine.try_recv() {
        received.push(event);
    }

    assert!(received
        .iter()
        .filter(|event| event.search_id() == first)
        .all(|event| matches!(event, EngineEvent::Stage { .. })));
    assert!(!results(
        &received
            .iter()
            .filter(|e| e.search_id() == second)
            .cloned()
            .collect::<Vec<_>>()
    )
    .is_empty());
}
