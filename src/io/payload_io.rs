use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::payload::{CompletedPayload, SyncPayload};
use crate::sync::engine::{CompletedRequest, Fetcher, SyncRequest};

/// File name of the primary payload inside a watched directory
pub const SYNC_FILE: &str = "sync.json";
/// File name of the completed-tasks payload inside a watched directory
pub const COMPLETED_FILE: &str = "completed.json";

/// Error type for reading payload files
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read and deserialize a JSON payload file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FetchError> {
    let text = fs::read_to_string(path).map_err(|e| FetchError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| FetchError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn read_sync_payload(path: &Path) -> Result<SyncPayload, FetchError> {
    read_json(path)
}

pub fn read_completed_payload(path: &Path) -> Result<CompletedPayload, FetchError> {
    read_json(path)
}

/// Fetch collaborator backed by JSON files on disk. Payloads that carry no
/// credential are stamped with the one this fetcher was built with, the way
/// a network fetcher stamps the token it sent.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    pub sync_path: PathBuf,
    pub completed_path: Option<PathBuf>,
    access_token: String,
}

impl FileFetcher {
    pub fn new(sync_path: PathBuf, completed_path: Option<PathBuf>, access_token: &str) -> Self {
        FileFetcher {
            sync_path,
            completed_path,
            access_token: access_token.to_string(),
        }
    }

    /// Fetcher for `<dir>/sync.json`, with `<dir>/completed.json` when present
    pub fn in_dir(dir: &Path, access_token: &str) -> Self {
        let completed = dir.join(COMPLETED_FILE);
        FileFetcher::new(
            dir.join(SYNC_FILE),
            completed.exists().then_some(completed),
            access_token,
        )
    }
}

impl Fetcher for FileFetcher {
    fn fetch_sync(&mut self, request: &SyncRequest) -> Result<SyncPayload, FetchError> {
        debug!(path = %self.sync_path.display(), sync_token = %request.sync_token, "reading sync payload");
        let mut payload = read_sync_payload(&self.sync_path)?;
        if payload.access_token.is_none() {
            payload.access_token = Some(self.access_token.clone());
        }
        Ok(payload)
    }

    fn fetch_completed(&mut self, request: &CompletedRequest) -> Result<CompletedPayload, FetchError> {
        let Some(path) = &self.completed_path else {
            debug!(since = %request.since, "no completed payload file, nothing to add");
            return Ok(CompletedPayload {
                items: Vec::new(),
                access_token: Some(self.access_token.clone()),
            });
        };
        let mut payload = read_completed_payload(path)?;
        if payload.access_token.is_none() {
            payload.access_token = Some(self.access_token.clone());
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request() -> SyncRequest {
        SyncRequest {
            access_token: "secret".into(),
            sync_token: "*".into(),
        }
    }

    #[test]
    fn stamps_missing_credential() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SYNC_FILE), r#"{"full_sync": true, "items": []}"#).unwrap();

        let mut fetcher = FileFetcher::in_dir(tmp.path(), "secret");
        let payload = fetcher.fetch_sync(&request()).unwrap();
        assert_eq!(payload.access_token.as_deref(), Some("secret"));
        assert!(fetcher.completed_path.is_none());
    }

    #[test]
    fn keeps_foreign_credential() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SYNC_FILE),
            r#"{"full_sync": true, "access_token": "other"}"#,
        )
        .unwrap();
        let mut fetcher = FileFetcher::in_dir(tmp.path(), "secret");
        let payload = fetcher.fetch_sync(&request()).unwrap();
        assert_eq!(payload.access_token.as_deref(), Some("other"));
    }

    #[test]
    fn missing_completed_file_yields_empty_payload() {
        let tmp = TempDir::new().unwrap();
        let mut fetcher = FileFetcher::new(tmp.path().join(SYNC_FILE), None, "secret");
        let completed = fetcher
            .fetch_completed(&CompletedRequest {
                generation: 1,
                since: "2024-05-01T00:00:00.000000Z".into(),
            })
            .unwrap();
        assert!(completed.items.is_empty());
    }

    #[test]
    fn reports_read_and_parse_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SYNC_FILE);
        assert!(matches!(read_sync_payload(&path), Err(FetchError::ReadError { .. })));
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_sync_payload(&path), Err(FetchError::ParseError { .. })));
    }
}
