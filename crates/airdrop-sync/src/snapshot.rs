// Copyright 2025 Airdrop Sync contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The proofs file wire type and the snapshot store clients.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use alloy::primitives::{Address, B256, U256};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::RebuildError;

/// One account's entitlement and inclusion proof for a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub account: Address,
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    pub proof: Vec<B256>,
}

/// The public proofs file, written atomically as one JSON document.
///
/// Key names and field order are a compatibility surface for the claim UIs
/// that consume this file. The root is the Merkle root over exactly the
/// leaves derivable from `claims`; a payload failing that check is corrupt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofsPayload {
    pub round: u64,
    pub root: B256,
    pub claims: Vec<Claim>,
}

/// Amounts travel as decimal-string integers on the wire.
mod decimal_u256 {
    use std::str::FromStr;

    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Keyed blob store holding the publicly fetchable proofs files.
///
/// Absence of a key is not an error, just "no prior snapshot". Writes are
/// idempotent overwrites.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<ProofsPayload>, RebuildError>;
    async fn write(&self, key: &str, payload: &ProofsPayload) -> Result<String, RebuildError>;

    /// Public location of `key`, stable whether or not this run wrote it.
    fn location(&self, key: &str) -> String;
}

/// Snapshot store backed by an S3-compatible bucket.
pub struct S3SnapshotStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3SnapshotStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    /// Build a client from ambient AWS configuration (env, profile, IMDS).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn read(&self, key: &str) -> Result<Option<ProofsPayload>, RebuildError> {
        let resp = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(err) => {
                if err.as_service_error().map(|e| e.is_no_such_key()).unwrap_or(false) {
                    return Ok(None);
                }
                return Err(RebuildError::Store(err.into()));
            }
        };

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| RebuildError::Store(e.into()))?
            .into_bytes();
        let payload = serde_json::from_slice(&bytes).map_err(|e| RebuildError::Store(e.into()))?;
        Ok(Some(payload))
    }

    async fn write(&self, key: &str, payload: &ProofsPayload) -> Result<String, RebuildError> {
        let body = serde_json::to_vec_pretty(payload).map_err(|e| RebuildError::Store(e.into()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| RebuildError::Store(e.into()))?;
        Ok(self.location(key))
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// In-memory snapshot store for tests and dry runs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<HashMap<String, ProofsPayload>>,
    writes: Mutex<u64>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Seed a stored snapshot, bypassing the write counter.
    pub async fn seed(&self, key: impl Into<String>, payload: ProofsPayload) {
        self.blobs.lock().await.insert(key.into(), payload);
    }

    /// Number of writes performed through [SnapshotStore::write].
    pub async fn write_count(&self) -> u64 {
        *self.writes.lock().await
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn read(&self, key: &str) -> Result<Option<ProofsPayload>, RebuildError> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: &ProofsPayload) -> Result<String, RebuildError> {
        self.blobs.lock().await.insert(key.to_string(), payload.clone());
        *self.writes.lock().await += 1;
        Ok(self.location(key))
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}

/// Best-effort local mirror of the proofs file, written outside hardened
/// production contexts. The canonical publication path is the remote store;
/// callers treat a mirror failure as a warning, never fatal.
pub fn write_local_mirror(
    dir: &Path,
    slug: &str,
    payload: &ProofsPayload,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create mirror directory {}", dir.display()))?;
    let path = dir.join(format!("{slug}.json"));
    let body = serde_json::to_vec_pretty(payload)?;
    std::fs::write(&path, body)
        .with_context(|| format!("failed to write mirror file {}", path.display()))?;
    Ok(path)
}
