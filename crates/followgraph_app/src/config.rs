//! Optional RON settings file.
//!
//! Every field is optional; anything left out keeps the engine default.
//!
//! ```ron
//! (
//!     direct_follow_cap: Some(500),
//!     max_concurrent_requests: Some(8),
//!     recompute_window_ms: Some(1000),
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use followgraph_engine::EngineSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub scheme: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_response_bytes: Option<u64>,
    pub direct_follow_cap: Option<usize>,
    pub second_degree_cap: Option<usize>,
    pub max_concurrent_requests: Option<usize>,
    pub recompute_window_ms: Option<u64>,
}

impl FileConfig {
    pub fn apply(self, settings: &mut EngineSettings) {
        let fetch = &mut settings.fetch;
        if let Some(scheme) = self.scheme {
            fetch.scheme = scheme;
        }
        if let Some(secs) = self.connect_timeout_secs {
            fetch.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            fetch.request_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = self.max_response_bytes {
            fetch.max_bytes = bytes;
        }

        let expansion = &mut settings.expansion;
        if let Some(cap) = self.direct_follow_cap {
            expansion.direct_follow_cap = cap;
        }
        if let Some(cap) = self.second_degree_cap {
            expansion.second_degree_cap = cap;
        }
        if let Some(limit) = self.max_concurrent_requests {
            expansion.max_concurrent_requests = limit.max(1);
        }
        if let Some(ms) = self.recompute_window_ms {
            expansion.recompute_window = Duration::from_millis(ms);
        }
    }
}

/// Engine settings from defaults plus the file at `path`, if any.
/// A file that does not exist is not an error.
pub fn load_settings(path: Option<&Path>) -> Result<EngineSettings, ConfigError> {
    let mut settings = EngineSettings::default();
    let Some(path) = path else {
        return Ok(settings);
    };

    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            engine_warn!("Config {:?} not found; using defaults", path);
            return Ok(settings);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let file: FileConfig = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    file.apply(&mut settings);
    engine_info!("Loaded config from {:?}", path);
    Ok(settings)
}
