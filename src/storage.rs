//! Object storage for product images and verification documents.
//!
//! Objects are addressed by slash-separated keys. The public URL of an object
//! is `{public_base}/{key}`, and deletions resolve the key back from a stored URL.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Keys of every object under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn public_url(&self, key: &str) -> String;

    fn key_from_url(&self, url: &str) -> Option<String>;
}

pub type SharedStore = Arc<dyn ObjectStore>;

/// Filesystem-backed store; `root` is also what `/files` serves.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        let public_base = public_base.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let normalized = normalize_key(key);
        if normalized.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let relative = Path::new(&normalized);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = normalize_key(prefix);
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.path_for(&prefix)?
        };
        if !fs::try_exists(&start).await? {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![(start, prefix)];
        while let Some((dir, dir_key)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                let key = child(&dir_key, &name);
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), key));
                } else {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, normalize_key(key))
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
        let key = normalize_key(rest);
        (!key.is_empty()).then_some(key)
    }
}

/// Deletes every key, logging and skipping failures. Missing objects count as deleted.
/// Returns the number of keys that could not be removed.
pub async fn delete_best_effort(store: &dyn ObjectStore, keys: &[String]) -> usize {
    let mut failed = 0;
    for key in keys {
        match store.delete(key).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(err) => {
                failed += 1;
                tracing::warn!(key = %key, error = %err, "object delete failed, skipping");
            }
        }
    }
    failed
}

/// Resolves stored URLs to keys, dropping URLs that do not belong to this store.
pub fn keys_from_urls<'a>(
    store: &dyn ObjectStore,
    urls: impl IntoIterator<Item = &'a String>,
) -> Vec<String> {
    urls.into_iter()
        .filter_map(|url| {
            let key = store.key_from_url(url);
            if key.is_none() {
                tracing::warn!(url = %url, "url is not a stored object");
            }
            key
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Photo,
    Selfie,
    IdCard,
    License,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Photo => "photo",
            DocType::Selfie => "selfie",
            DocType::IdCard => "id_card",
            DocType::License => "license",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "photo" => Some(DocType::Photo),
            "selfie" => Some(DocType::Selfie),
            "id_card" => Some(DocType::IdCard),
            "license" => Some(DocType::License),
            _ => None,
        }
    }

    /// Identity documents are subject to the re-upload cooldown; the profile photo is not.
    pub fn is_identity_document(&self) -> bool {
        !matches!(self, DocType::Photo)
    }
}

/// `products/{userId}/{timestamp}-{filename}`
pub fn product_image_key(user_id: Uuid, timestamp_millis: i64, filename: &str) -> String {
    format!(
        "products/{user_id}/{timestamp_millis}-{}",
        sanitize_filename(filename)
    )
}

/// `verification_docs/{userId}/{docType}_{timestamp}`
pub fn verification_doc_key(user_id: Uuid, doc_type: DocType, timestamp_millis: i64) -> String {
    format!(
        "verification_docs/{user_id}/{}_{timestamp_millis}",
        doc_type.as_str()
    )
}

pub fn verification_prefix(user_id: Uuid) -> String {
    format!("verification_docs/{user_id}")
}

fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
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
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

fn normalize_key(key: &str) -> String {
    key.split('/')
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_keys_follow_layout() {
        let user = Uuid::nil();
        assert_eq!(
            product_image_key(user, 1700000000000, "my shirt.jpg"),
            format!("products/{user}/1700000000000-my_shirt.jpg")
        );
        assert_eq!(
            product_image_key(user, 1, "../../etc/passwd"),
            format!("products/{user}/1-passwd")
        );
    }

    #[test]
    fn verification_keys_follow_layout() {
        let user = Uuid::nil();
        assert_eq!(
            verification_doc_key(user, DocType::IdCard, 42),
            format!("verification_docs/{user}/id_card_42")
        );
    }

    #[test]
    fn urls_round_trip_to_keys() {
        let store = LocalObjectStore::new("/tmp/unused", "http://cdn.local/files/");
        let url = store.public_url("products/a/1-b.png");
        assert_eq!(url, "http://cdn.local/files/products/a/1-b.png");
        assert_eq!(store.key_from_url(&url).as_deref(), Some("products/a/1-b.png"));
        assert_eq!(store.key_from_url("https://elsewhere.com/x.png"), None);
    }

    #[test]
    fn rejects_escaping_keys() {
        let store = LocalObjectStore::new("/tmp/unused", "/files");
        assert!(matches!(
            store.path_for("products/../../secret"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(store.path_for("").is_err());
    }

    #[test]
    fn doc_types_parse_from_field_names() {
        assert_eq!(DocType::from_field("selfie"), Some(DocType::Selfie));
        assert_eq!(DocType::from_field("passport"), None);
        assert!(!DocType::Photo.is_identity_document());
        assert!(DocType::License.is_identity_document());
    }
}
