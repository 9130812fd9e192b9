use std::fmt;

use engine_logging::{engine_debug, engine_warn};

use crate::fetch::FollowApi;
use crate::{ResolvedAccount, SearchError};

/// A `username@domain` account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub username: String,
    pub domain: String,
}

impl Handle {
    /// Splits `username@domain`. Exactly one `@` with non-empty text on both sides;
    /// anything else is rejected before any request is made.
    pub fn parse(raw: &str) -> Result<Self, SearchError> {
        let mut parts = raw.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(username), Some(domain), None) if !username.is_empty() && !domain.is_empty() => {
                Ok(Self {
                    username: username.to_string(),
                    domain: domain.to_string(),
                })
            }
            _ => Err(SearchError::InvalidHandle(raw.to_string())),
        }
    }

    pub fn acct(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.domain)
    }
}

/// Appends `@domain` to a bare username. Already-qualified values pass through.
pub fn qualify_acct(acct: &str, domain: &str) -> String {
    if acct.contains('@') {
        acct.to_string()
    } else {
        format!("{acct}@{domain}")
    }
}

/// Looks the handle up at its home server.
pub async fn resolve_id(api: &dyn FollowApi, handle: &Handle) -> Result<ResolvedAccount, SearchError> {
    engine_debug!("Lookup {handle}");
    match api.lookup(handle).await {
        Ok(id) => Ok(ResolvedAccount {
            id,
            domain: handle.domain.clone(),
        }),
        Err(err) => {
            engine_warn!("Lookup of {handle} failed: {err}");
            Err(SearchError::Lookup {
                handle: handle.acct(),
                reason: err.kind.to_string(),
            })
        }
    }
}
