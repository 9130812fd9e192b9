use crate::{CandidateRow, SessionStatus};

/// Rows shown by default; the full list is still kept in state.
pub const RESULT_LIMIT: usize = 100;

/// Above this many mutual connections the names are summarised as a count.
const FOLLOWED_BY_NAME_LIMIT: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// The search could not start: bad handle or unknown account.
    Failed(String),
    /// The search finished but found nobody to suggest.
    NoResults,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub status: SessionStatus,
    pub seed: Option<String>,
    /// `Loaded N from M...` while the second-degree walks run.
    pub progress_text: Option<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<CandidateRowView>,
    pub total_candidates: usize,
    pub banner: Option<Banner>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRowView {
    pub acct: String,
    pub display_name: String,
    pub followers: String,
    pub followed_by: String,
    pub follow_url: Option<String>,
    pub bio: String,
}

impl AppViewModel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        status: SessionStatus,
        seed: Option<&str>,
        progress: (usize, usize),
        warnings: &[String],
        candidates: &[CandidateRow],
        failure: Option<&str>,
        limit: usize,
        dirty: bool,
    ) -> Self {
        let progress_text = status
            .is_running()
            .then(|| format!("Loaded {} from {}...", progress.0, progress.1));
        let banner = match status {
            SessionStatus::Failed => Some(Banner::Failed(
                failure.unwrap_or("search failed").to_string(),
            )),
            SessionStatus::Done if candidates.is_empty() => Some(Banner::NoResults),
            _ => None,
        };
        let seed_domain = seed.and_then(|seed| seed.split_once('@')).map(|(_, domain)| domain);
        let rows = candidates
            .iter()
            .take(limit)
            .map(|row| CandidateRowView {
                acct: row.acct.clone(),
                display_name: row.display_name.clone(),
                followers: format!("{} followers", compact_count(row.followers_count)),
                followed_by: followed_by_summary(&row.followed_by),
                follow_url: seed_domain.map(|domain| follow_url(domain, &row.acct)),
                bio: row.bio.clone(),
            })
            .collect();

        Self {
            status,
            seed: seed.map(str::to_string),
            progress_text,
            warnings: warnings.to_vec(),
            rows,
            total_candidates: candidates.len(),
            banner,
            dirty,
        }
    }
}

impl Banner {
    pub fn message(&self) -> String {
        match self {
            Banner::Failed(reason) => format!("Search failed: {reason}"),
            Banner::NoResults => "No results found. Check the handle, follow more people, \
                or try again later: the servers may be throttling requests."
                .to_string(),
        }
    }
}

/// Short human form of a count: `999`, `1.2K`, `34K`, `5.6M`.
pub fn compact_count(count: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    for (index, (size, suffix)) in UNITS.iter().enumerate() {
        if count < *size {
            continue;
        }
        let scaled = count as f64 / *size as f64;
        let rounded = if scaled < 10.0 {
            (scaled * 10.0).round() / 10.0
        } else {
            scaled.round()
        };
        // 999_950 rounds to 1000K; show it as 1M instead.
        if rounded >= 1000.0 && index > 0 {
            let (bigger, bigger_suffix) = UNITS[index - 1];
            return format!("{}{}", trim_decimal(count as f64 / bigger as f64), bigger_suffix);
        }
        return format!("{}{}", trim_decimal(rounded), suffix);
    }
    count.to_string()
}

fn trim_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

/// `Followed by ann, bob.` or `Followed by 12 of your contacts.`
pub fn followed_by_summary(followed_by: &[String]) -> String {
    if followed_by.len() >= FOLLOWED_BY_NAME_LIMIT {
        return format!("Followed by {} of your contacts.", followed_by.len());
    }
    let names: Vec<&str> = followed_by
        .iter()
        .map(|handle| handle.split('@').next().unwrap_or(handle))
        .collect();
    format!("Followed by {}.", names.join(", "))
}

/// Link that opens `acct` on the user's own server, where they can follow it.
pub fn follow_url(seed_domain: &str, acct: &str) -> String {
    let local = acct
        .strip_suffix(&format!("@{seed_domain}"))
        .unwrap_or(acct);
    format!("https://{seed_domain}/@{local}")
}
