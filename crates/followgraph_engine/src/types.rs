use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer};

/// Generation number of one search. A newer search always has a larger id.
pub type SearchId = u64;

/// An account as reported by a following listing, either a direct follow of the
/// seed or a second-degree candidate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    /// Opaque platform identifier. Never parsed as a number: some servers use
    /// 128-bit ids.
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    /// Fully-qualified `username@domain` once it has passed through the fetcher.
    #[serde(default, deserialize_with = "null_as_default")]
    pub acct: String,
    /// Direct follows of the seed that also follow this account.
    #[serde(skip)]
    pub followed_by: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followers_count: u64,
    /// Servers send `null` for accounts that never answered the opt-in question;
    /// that counts as not discoverable.
    #[serde(default, deserialize_with = "null_as_default")]
    pub discoverable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    /// Biography markup. Render through [`crate::note_to_plain_text`] before display.
    #[serde(default, deserialize_with = "null_as_default")]
    pub note: String,
    #[serde(
        default,
        rename = "avatar_static",
        deserialize_with = "null_as_default"
    )]
    pub avatar_url: String,
}

/// Result of resolving a handle at its home server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub id: String,
    pub domain: String,
}

/// One page of a following listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    /// `None` when the payload was not a list; the walk ends there without error.
    pub accounts: Option<Vec<Account>>,
    /// URL of the next page, `None` on the terminal page.
    pub next: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    ResolvingHandle,
    FetchingDirect,
    ExpandingSecondDegree,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub seed: String,
    pub direct_follows: usize,
    pub candidates: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Stage {
        search_id: SearchId,
        stage: SearchStage,
    },
    Progress {
        search_id: SearchId,
        completed: usize,
        total: usize,
    },
    Results {
        search_id: SearchId,
        ranked: Vec<Account>,
    },
    Warning {
        search_id: SearchId,
        message: String,
    },
    Finished {
        search_id: SearchId,
        summary: SearchSummary,
    },
    Failed {
        search_id: SearchId,
        error: SearchError,
    },
}

impl EngineEvent {
    pub fn search_id(&self) -> SearchId {
        match self {
            EngineEvent::Stage { search_id, .. }
            | EngineEvent::Progress { search_id, .. }
            | EngineEvent::Results { search_id, .. }
            | EngineEvent::Warning { search_id, .. }
            | EngineEvent::Finished { search_id, .. }
            | EngineEvent::Failed { search_id, .. } => *search_id,
        }
    }
}

/// Terminal failures of a search. Everything else is reported as a warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("incorrect handle: {0}")]
    InvalidHandle(String),
    #[error("cannot find handle {handle}: {reason}")]
    Lookup { handle: String, reason: String },
    #[error("search superseded by a newer one")]
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "unexpected payload"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Accepts ids sent either as JSON strings or as bare integers and keeps them as text.
pub(crate) fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Unsigned(value) => value.to_string(),
        RawId::Signed(value) => value.to_string(),
    })
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
