use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::header::LINK;
use serde::Deserialize;
use url::Url;

use crate::handle::{qualify_acct, Handle};
use crate::{Account, FailureKind, FetchError, Page, ResolvedAccount};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// `https` in production; tests point it at a plain-http mock server.
    pub scheme: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// The two calls the engine needs from a server.
#[async_trait::async_trait]
pub trait FollowApi: Send + Sync {
    /// Returns the platform id of `handle` at its home domain.
    async fn lookup(&self, handle: &Handle) -> Result<String, FetchError>;

    /// Fetches one page of a following listing.
    async fn page(&self, url: &str) -> Result<Page, FetchError>;

    /// First page of the following listing of a resolved account.
    fn following_url(&self, account: &ResolvedAccount) -> String;
}

#[derive(Debug, Clone)]
pub struct ReqwestFollowApi {
    settings: FetchSettings,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(deserialize_with = "crate::types::opaque_id")]
    id: String,
}

impl ReqwestFollowApi {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn base_url(&self, domain: &str) -> String {
        format!("{}://{}", self.settings.scheme, domain)
    }

    /// GET `url` and return the body together with the `Link` header, if any.
    async fn get(&self, url: Url) -> Result<(Vec<u8>, Option<String>), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(Some(content_len)));
            }
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok((bytes, link))
    }

    fn too_large(&self, actual: Option<u64>) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl FollowApi for ReqwestFollowApi {
    async fn lookup(&self, handle: &Handle) -> Result<String, FetchError> {
        let mut url = parse_url(&format!(
            "{}/api/v1/accounts/lookup",
            self.base_url(&handle.domain)
        ))?;
        url.query_pairs_mut().append_pair("acct", &handle.username);

        let (body, _) = self.get(url).await?;
        let found: LookupResponse = serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        Ok(found.id)
    }

    async fn page(&self, url: &str) -> Result<Page, FetchError> {
        let (body, link) = self.get(parse_url(url)?).await?;
        let payload: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        let accounts = match payload {
            serde_json::Value::Array(items) => Some(decode_accounts(items, url)),
            _ => None,
        };
        Ok(Page {
            accounts,
            next: next_page_from_link(link.as_deref()),
        })
    }

    fn following_url(&self, account: &ResolvedAccount) -> String {
        format!(
            "{}/api/v1/accounts/{}/following",
            self.base_url(&account.domain),
            account.id
        )
    }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

/// Extracts the `rel="next"` target from a `Link` header such as
/// `<https://a/x?max_id=7>; rel="next", <https://a/x?since_id=9>; rel="prev"`.
pub fn next_page_from_link(header: Option<&str>) -> Option<String> {
    let mut rest = header?;
    while let Some(open) = rest.find('<') {
        let after_open = &rest[open + 1..];
        let close = after_open.find('>')?;
        let target = &after_open[..close];
        let params_and_rest = &after_open[close + 1..];
        let params_end = params_and_rest.find('<').unwrap_or(params_and_rest.len());
        let params = &params_and_rest[..params_end];
        if has_next_relation(params) {
            return Some(target.to_string());
        }
        rest = &params_and_rest[params_end..];
    }
    None
}

fn has_next_relation(params: &str) -> bool {
    params
        .split(';')
        .filter_map(|param| param.split_once('='))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("rel"))
        .any(|(_, value)| {
            value
                .trim()
                .trim_end_matches(',')
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .any(|relation| relation.eq_ignore_ascii_case("next"))
        })
}

/// Decodes each listed account on its own; an entry that does not decode is skipped.
fn decode_accounts(items: Vec<serde_json::Value>, url: &str) -> Vec<Account> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Account>(item) {
            Ok(account) => Some(account),
            Err(err) => {
                engine_debug!("Skipping undecodable account on {url}: {err}");
                None
            }
        })
        .collect()
}

/// Walks a following listing from `start_url` until the terminal page or until more
/// than `cap` accounts have been collected.
///
/// Never fails: a broken page stops the walk, reports a message through `on_error`,
/// and whatever was collected so far is returned.
pub async fn fetch_following(
    api: &dyn FollowApi,
    owner: &Handle,
    start_url: &str,
    cap: usize,
    on_error: &(dyn Fn(String) + Send + Sync),
) -> Vec<Account> {
    let mut accounts: Vec<Account> = Vec::new();
    let mut next_page = Some(start_url.to_string());

    while let Some(url) = next_page.take() {
        if accounts.len() > cap {
            break;
        }
        engine_debug!("Get page: {url}");
        let page = match api.page(&url).await {
            Ok(page) => page,
            Err(err) => {
                engine_warn!("Page {url} for {owner} failed: {err}");
                on_error(format!(
                    "Error while retrieving followers for {owner} ({}).",
                    err.kind
                ));
                break;
            }
        };
        let Some(items) = page.accounts else {
            engine_debug!("Page {url} for {owner} is not a list; stopping");
            break;
        };
        for mut account in items {
            if account.acct.is_empty() {
                engine_debug!("Dropping account {} without a handle on {url}", account.id);
                continue;
            }
            account.acct = qualify_acct(&account.acct, &owner.domain);
            accounts.push(account);
        }
        next_page = page.next;
    }

    accounts
}
