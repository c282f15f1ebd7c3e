use std::io::{Read, Write};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Favorite, UploadMetadata};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const UPLOAD_KEY: &str = "listings.upload";
pub const FAVORITES_KEY: &str = "listings.favorites";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
    #[error("storage quota exceeded: record needs {needed} bytes, quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Flat byte store the persistence layer writes through.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredUpload {
    metadata: UploadMetadata,
    /// base64 of the gzip-compressed CSV text
    content: String,
}

/// Persists the latest upload (compressed) and the favorites (plain JSON).
#[derive(Clone)]
pub struct ListingStore {
    kv: Arc<dyn KeyValueStore>,
    quota_bytes: usize,
}

impl ListingStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, quota_bytes: usize) -> Self {
        Self { kv, quota_bytes }
    }

    pub fn load_upload(&self) -> Result<Option<(String, UploadMetadata)>, StoreError> {
        let bytes = match self.kv.get(UPLOAD_KEY)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let stored: StoredUpload = serde_json::from_slice(&bytes)?;
        let compressed = STANDARD
            .decode(stored.content.as_bytes())
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let content = decompress(&compressed)?;

        info!(
            "Loaded stored upload {} ({} bytes)",
            stored.metadata.file_name,
            content.len()
        );
        Ok(Some((content, stored.metadata)))
    }

    pub fn save_upload(&self, content: &str, metadata: &UploadMetadata) -> Result<(), StoreError> {
        let compressed = compress(content)?;
        let record = StoredUpload {
            metadata: metadata.clone(),
            content: STANDARD.encode(&compressed),
        };
        let bytes = serde_json::to_vec(&record)?;
        debug!(
            "Compressed upload from {} to {} bytes",
            content.len(),
            compressed.len()
        );
        self.put_within_quota(UPLOAD_KEY, &bytes)
    }

    pub fn clear_upload(&self) -> Result<(), StoreError> {
        self.kv.remove(UPLOAD_KEY)
    }

    pub fn load_favorites(&self) -> Result<Vec<Favorite>, StoreError> {
        match self.kv.get(FAVORITES_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_favorites(&self, favorites: &[Favorite]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(favorites)?;
        self.put_within_quota(FAVORITES_KEY, &bytes)
    }

    fn put_within_quota(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.len() > self.quota_bytes {
            return Err(StoreError::QuotaExceeded {
                needed: bytes.len(),
                quota: self.quota_bytes,
            });
        }
        self.kv.put(key, bytes)
    }
}

fn compress(text: &str) -> Result<Vec<u8>, StoreError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

fn decompress(bytes: &[u8]) -> Result<String, StoreError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, Row};

    fn metadata() -> UploadMetadata {
        UploadMetadata {
            file_name: "listings.csv".into(),
            size: 42,
            last_modified: Some(1_700_000_000_000),
            uploaded_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    fn store(quota: usize) -> (Arc<MemoryStore>, ListingStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), ListingStore::new(kv, quota))
    }

    #[test]
    fn upload_is_stored_compressed_and_restored() {
        let (kv, store) = store(1024 * 1024);
        let content = "Price,Beds\n100,2\n".repeat(200);
        store.save_upload(&content, &metadata()).unwrap();

        let raw = kv.get(UPLOAD_KEY).unwrap().unwrap();
        assert!(raw.len() < content.len());

        let (restored, meta) = store.load_upload().unwrap().unwrap();
        assert_eq!(restored, content);
        assert_eq!(meta, metadata());

        store.clear_upload().unwrap();
        assert!(store.load_upload().unwrap().is_none());
    }

    #[test]
    fn quota_rejects_without_writing() {
        let (kv, store) = store(16);
        let err = store.save_upload("Price\n1\n", &metadata()).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { quota: 16, .. }));
        assert!(kv.get(UPLOAD_KEY).unwrap().is_none());
    }

    #[test]
    fn favorites_are_plain_json() {
        let (kv, store) = store(1024);
        assert!(store.load_favorites().unwrap().is_empty());

        let favorite = Favorite {
            id: "0-abc".into(),
            row: Row::from([("Beds".to_string(), CellValue::Text("3".into()))]),
        };
        store.save_favorites(&[favorite.clone()]).unwrap();

        let raw = kv.get(FAVORITES_KEY).unwrap().unwrap();
        assert!(String::from_utf8(raw).unwrap().contains("\"Beds\":\"3\""));
        assert_eq!(store.load_favorites().unwrap(), vec![favorite]);
    }

    #[test]
    fn corrupt_upload_is_an_error() {
        let (kv, store) = store(1024);
        kv.put(UPLOAD_KEY, br#"{"metadata":{"file_name":"a.csv","size":1,"uploaded_at":"x"},"content":"!!"}"#)
            .unwrap();
        assert!(matches!(store.load_upload(), Err(StoreError::Corrupt(_))));
    }
}
