use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::NamedTempFile;

use crate::Account;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Writes the ranked candidates of one search to `{dir}/followgraph-{seed}.json`.
///
/// The file is written to a temporary sibling first and renamed into place, so a
/// reader never observes a half-written export.
pub fn export_results(
    dir: &Path,
    seed: &str,
    ranked: &[Account],
    generated_utc: &str,
) -> Result<PathBuf, ExportError> {
    ensure_output_dir(dir)?;

    let document = json!({
        "seed": seed,
        "generated_utc": generated_utc,
        "candidate_count": ranked.len(),
        "candidates": ranked.iter().map(|account| {
            json!({
                "id": account.id,
                "acct": account.acct,
                "display_name": account.display_name,
                "followers_count": account.followers_count,
                "followed_by": account.followed_by,
                "avatar_url": account.avatar_url,
            })
        }).collect::<Vec<_>>(),
    });
    let content = serde_json::to_string_pretty(&document).map_err(io::Error::from)?;

    let target = dir.join(export_filename(seed));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|err| ExportError::Io(err.error))?;
    Ok(target)
}

/// File name for a seed handle, with characters unsafe in paths replaced.
pub fn export_filename(seed: &str) -> String {
    let safe: String = seed
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '@' | '.' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    format!("followgraph-{safe}.json")
}

fn ensure_output_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    }
    Ok(())
}
