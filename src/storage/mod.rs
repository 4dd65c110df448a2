//! Stored recordings.
//!
//! Normalized audio is kept as plain files under `<data_dir>/recordings/`.
//! Files are named after the job that owns them. Callers only ever see the
//! relative reference (`recordings/<owner>_<name>`), which
//! is what the meeting record stores.

use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::global::RECORDINGS_DIR;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid recording reference: {0}")]
    InvalidReference(String),
    #[error("failed to write recording {reference}: {source}")]
    Write {
        reference: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read recording {reference}: {source}")]
    Read {
        reference: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to delete recording {reference}: {source}")]
    Delete {
        reference: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Store rooted at a data directory; recordings go in its `recordings/`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into(),
        }
    }

    /// Save `bytes` as `recordings/<owner>_<name>`. Each owner keeps one
    /// recording per name; saving again replaces it.
    pub async fn save(&self, owner: &str, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let reference = format!(
            "{}/{}{}",
            RECORDINGS_DIR,
            owner_prefix(owner),
            sanitize_file_name(name)
        );
        let path = self.resolve(&reference)?;

        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, bytes).await
        };
        write.await.map_err(|source| StorageError::Write {
            reference: reference.clone(),
            source,
        })?;

        debug!("Stored recording {} ({} bytes)", reference, bytes.len());
        Ok(reference)
    }

    pub async fn read(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| StorageError::Read {
                reference: reference.to_string(),
                source,
            })
    }

    /// Delete a stored recording. Deleting a missing file is not an error.
    pub async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted recording {}", reference);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete {
                reference: reference.to_string(),
                source,
            }),
        }
    }

    /// Delete every recording saved for `owner`, returning how many went.
    pub async fn delete_owned_by(&self, owner: &str) -> Result<usize, StorageError> {
        let dir = self.root.join(RECORDINGS_DIR);
        let prefix = owner_prefix(owner);
        let listing_error = |source: io::Error| StorageError::Delete {
            reference: format!("{}/{}*", RECORDINGS_DIR, prefix),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(listing_error(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(&listing_error)? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) {
                self.delete(&format!("{}/{}", RECORDINGS_DIR, name)).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Absolute path of a reference. Only plain paths inside the
    /// recordings namespace are accepted.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(reference);
        let mut components = relative.components();

        let in_namespace = matches!(
            components.next(),
            Some(Component::Normal(first)) if first == RECORDINGS_DIR
        );
        let rest_is_plain = components.all(|c| matches!(c, Component::Normal(_)));

        if !in_namespace || !rest_is_plain || relative.components().count() < 2 {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

fn owner_prefix(owner: &str) -> String {
    format!("{}_", sanitize_file_name(owner))
}

/// Reduce an uploaded filename to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "recording".to_string()
    } else {
        trimmed.to_string()
    }
}
