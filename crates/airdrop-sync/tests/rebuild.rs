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

//! Batch runner failure isolation and, against a local node, the empty-window
//! reconciler path.

use airdrop_sync::{
    empty_root, rebuild_all, rebuild_chain, ChainConfig, MemorySnapshotStore, ProofsPayload,
    RebuildOptions, RebuildReason, SnapshotStore,
};
use alloy::primitives::{Address, B256};
use url::Url;

#[tokio::test]
async fn hard_rpc_failure_is_isolated_per_chain() {
    // First chain points at a dead endpoint; second is unconfigured. Both
    // must come back as clean per-chain failures, in configuration order,
    // with nothing written to the store.
    let dead = ChainConfig::builder()
        .chain_id(31337u64)
        .slug("dead")
        .rpc_url(Url::parse("http://127.0.0.1:1").unwrap())
        .nft_address(Address::repeat_byte(0x01))
        .distributor_address(Address::repeat_byte(0x02))
        .build()
        .unwrap();
    let unconfigured = ChainConfig::builder().chain_id(31338u64).slug("bare").build().unwrap();

    let store = MemorySnapshotStore::new();
    let items = rebuild_all(&[dead, unconfigured], &store, &RebuildOptions::default()).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].slug, "dead");
    assert_eq!(items[1].slug, "bare");
    assert!(items.iter().all(|item| !item.result.ok && !item.result.updated));
    assert!(items[0].result.warnings[0].contains("rpc error"));
    assert!(items[1].result.warnings[0].contains("missing RPC"));
    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
#[ignore = "requires anvil in PATH"]
async fn empty_window_publishes_snapshot_but_no_transaction() {
    use alloy::{
        node_bindings::Anvil,
        primitives::Bytes,
        providers::{ext::AnvilApi, ProviderBuilder},
    };

    let anvil = Anvil::new().spawn();
    let provider = ProviderBuilder::new().connect_http(anvil.endpoint_url());

    // Minimal runtime that returns 32 zero bytes for any call, so all three
    // distributor reads yield zero values.
    let distributor = Address::repeat_byte(0x42);
    provider
        .anvil_set_code(distributor, Bytes::from(vec![0x60, 0x20, 0x60, 0x00, 0xf3]))
        .await
        .unwrap();

    let chain = ChainConfig::builder()
        .chain_id(31337u64)
        .slug("anvil")
        .rpc_url(anvil.endpoint_url())
        .nft_address(Address::repeat_byte(0x77))
        .distributor_address(distributor)
        .build()
        .unwrap();

    // A stale snapshot from an old round must be replaced.
    let store = MemorySnapshotStore::new();
    store
        .seed(
            "claims/anvil.json",
            ProofsPayload { round: 1, root: B256::repeat_byte(0x01), claims: Vec::new() },
        )
        .await;
    let opts = RebuildOptions::default();

    let item = rebuild_chain(&chain, &store, &opts).await.unwrap();
    let result = &item.result;

    assert!(result.ok);
    assert!(!result.updated);
    assert_eq!(result.reason, Some(RebuildReason::Empty));
    assert_eq!(result.count, 0);
    assert_eq!(result.file_root, empty_root());
    assert!(result.tx_hash.is_none());
    // Zero on-chain reward triggers the fallback warning.
    assert!(result.warnings.iter().any(|w| w.contains("rewardAmount is 0")));
    // The stale snapshot is overwritten with the empty one.
    assert_eq!(store.write_count().await, 1);
    assert_eq!(result.snapshot_url.as_deref(), Some("memory://claims/anvil.json"));
    let stored = store.read("claims/anvil.json").await.unwrap().unwrap();
    assert!(stored.claims.is_empty());
    assert_eq!(stored.root, empty_root());

    // A rerun within the same round writes nothing but still reports the
    // location of the already-current snapshot.
    let rerun = rebuild_chain(&chain, &store, &opts).await.unwrap();
    assert_eq!(rerun.result.reason, Some(RebuildReason::Empty));
    assert_eq!(rerun.result.snapshot_url.as_deref(), Some("memory://claims/anvil.json"));
    assert_eq!(store.write_count().await, 1);
}
