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

//! Merkle airdrop synchronization engine.
//!
//! A periodic job that derives the airdrop eligibility set from on-chain mint
//! events, commits to it with a sorted-pair Merkle tree, and reconciles three
//! pieces of state per chain: the on-chain distributor root, the public proofs
//! snapshot in the blob store, and the freshly computed tree. Updates are
//! published only when necessary, through the transitions in [rebuild].

// Declare modules
pub mod config;
pub mod contracts;
pub mod events;
mod error;
pub mod rebuild;
pub mod snapshot;
pub mod tree;

// Re-export commonly used types
pub use config::{ChainConfig, ChainRegistry};

pub use contracts::{read_distributor_state, DistributorState, IMerkleDistributor};

pub use error::RebuildError;

pub use events::{derive_minters, query_logs_chunked, scan_mint_logs};

pub use rebuild::{
    current_round, needs_onchain_update, rebuild_all, rebuild_chain, snapshot_unchanged,
    RebuildBatchItem, RebuildOptions, RebuildReason, RebuildResult,
};

pub use snapshot::{
    write_local_mirror, Claim, MemorySnapshotStore, ProofsPayload, S3SnapshotStore, SnapshotStore,
};

pub use tree::{build_claims, build_flat_claims, empty_root, leaf_hash, verify_proof, MerkleTree};

/// Chunk size for log queries, to respect provider limits on a single query's block span
pub const LOG_QUERY_CHUNK_SIZE: u64 = 10;
/// Default number of blocks in the sliding eligibility window
pub const DEFAULT_BLOCKS_PER_WINDOW: u64 = 300;
/// Seconds per round bucket; rounds advance hourly
pub const ROUND_SECONDS: u64 = 3600;
