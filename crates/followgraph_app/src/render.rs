use std::fmt::Write as _;

use followgraph_core::{AppViewModel, CandidateRowView, SessionStatus};

/// One status line for stderr while a search runs.
pub fn status_line(view: &AppViewModel) -> Option<String> {
    let stage = match view.status {
        SessionStatus::ResolvingHandle => "Resolving handle",
        SessionStatus::FetchingDirect => "Fetching the accounts you follow",
        SessionStatus::ExpandingSecondDegree => "Fetching who they follow",
        SessionStatus::Idle | SessionStatus::Done | SessionStatus::Failed => return None,
    };
    Some(match &view.progress_text {
        Some(progress) if view.status == SessionStatus::ExpandingSecondDegree => {
            format!("{stage}. {progress}")
        }
        _ => format!("{stage}..."),
    })
}

/// The final report for stdout: ranked rows, or the banner.
pub fn report(view: &AppViewModel) -> String {
    if let Some(banner) = &view.banner {
        return format!("{}\n", banner.message());
    }

    let mut out = String::new();
    for (rank, row) in view.rows.iter().enumerate() {
        write_row(&mut out, rank + 1, row);
    }
    if view.total_candidates > view.rows.len() {
        let _ = writeln!(
            out,
            "Showing {} of {} suggestions.",
            view.rows.len(),
            view.total_candidates
        );
    }
    out
}

fn write_row(out: &mut String, rank: usize, row: &CandidateRowView) {
    let name = if row.display_name.is_empty() {
        row.acct.as_str()
    } else {
        row.display_name.as_str()
    };
    let _ = writeln!(out, "{rank:>3}. {name} (@{}) {}", row.acct, row.followers);
    let _ = writeln!(out, "     {}", row.followed_by);
    if let Some(url) = &row.follow_url {
        let _ = writeln!(out, "     {url}");
    }
    for line in row.bio.lines().filter(|line| !line.trim().is_empty()) {
        let _ = writeln!(out, "     | {line}");
    }
    out.push('\n');
}
