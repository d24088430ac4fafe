//! In-memory store that makes submitted and generated binaries locally
//! addressable. Keys are content hashes; entries are revoked when the
//! workflow resets or a new image is submitted.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const MEDIA_ROUTE_PREFIX: &str = "/media";

pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Reference to a materialized resource, safe to hand to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceHandle {
    pub key: String,
    pub url: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct StoredResource {
    pub data: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Default)]
pub struct ResourceStore {
    entries: HashMap<String, StoredResource>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, data: Bytes, mime_type: &str) -> ResourceHandle {
        let key = compute_hash(&data);
        let handle = ResourceHandle {
            url: Self::public_url(&key),
            key: key.clone(),
            mime_type: mime_type.to_string(),
            size: data.len(),
        };
        self.entries.insert(
            key,
            StoredResource {
                data,
                mime_type: mime_type.to_string(),
            },
        );
        handle
    }

    pub fn get(&self, key: &str) -> Option<&StoredResource> {
        self.entries.get(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn revoke(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn public_url(key: &str) -> String {
        format!("{MEDIA_ROUTE_PREFIX}/{}", key.trim_start_matches('/'))
    }
}
