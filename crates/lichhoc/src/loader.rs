//! Loading the schedule JSON array from a local file or an HTTP(S) URL.
//!
//! Records are validated one by one; a single bad record fails the whole load
//! so the engine never works on partial data.

use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::Session;

/// Errors surfaced to the presentation layer when the schedule cannot be loaded
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed schedule JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Where the schedule JSON lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    /// Interpret a command-line value: `http://` and `https://` prefixes mean a URL,
    /// anything else is a file path
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Source::Url(raw.to_string())
        } else {
            Source::File(PathBuf::from(raw))
        }
    }

    /// The file path, for sources that can be watched
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Source::File(path) => Some(path),
            Source::Url(_) => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

/// Fetch and validate the full session collection
pub async fn load(source: &Source) -> Result<Vec<Session>, LoadError> {
    let body = match source {
        Source::File(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?
        }
        Source::Url(url) => fetch(url).await?,
    };

    let sessions = parse_sessions(&body)?;
    info!(count = sessions.len(), source = %source, "Schedule loaded");
    Ok(sessions)
}

async fn fetch(url: &str) -> Result<String, LoadError> {
    debug!(url = %url, "Fetching schedule");
    let response = reqwest::get(url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status(status));
    }

    Ok(response.text().await?)
}

/// Parse a JSON array of sessions, validating each record
pub fn parse_sessions(json: &str) -> Result<Vec<Session>, LoadError> {
    let records: Vec<Value> = serde_json::from_str(json)?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let session: Session = serde_json::from_value(record).map_err(|e| {
                LoadError::InvalidRecord {
                    index,
                    reason: e.to_string(),
                }
            })?;
            validate(&session).map_err(|reason| LoadError::InvalidRecord { index, reason })?;
            Ok(session)
        })
        .collect()
}

/// Check the date and time fields of a deserialized session
pub fn validate(session: &Session) -> Result<(), String> {
    if !(1..=12).contains(&session.month) {
        return Err(format!("month {} is out of range 1-12", session.month));
    }

    if session.date().is_none() {
        return Err(format!(
            "{}-{:02}-{:02} is not a calendar date",
            session.year, session.month, session.day
        ));
    }

    let start = session
        .start()
        .ok_or_else(|| format!("invalid start time '{}', expected HH:MM", session.start_time))?;
    let end = session
        .end()
        .ok_or_else(|| format!("invalid end time '{}', expected HH:MM", session.end_time))?;

    if end <= start {
        return Err(format!(
            "end time {} is not after start time {}",
            session.end_time, session.start_time
        ));
    }

    Ok(())
}
