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

//! The per-chain reconciler and the batch runner.
//!
//! One run per chain walks a fixed sequence: configuration and bytecode
//! checks, an atomic distributor state read, scan/derive/build, the
//! idempotence short-circuit against the stored snapshot, and the two
//! independent publication targets (snapshot store, on-chain root). State
//! mutations happen only at the end of the pipeline, so a killed run leaves
//! prior state untouched.

use std::{
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy::{
    network::EthereumWallet,
    primitives::{Address, TxHash, B256, U256},
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use serde::Serialize;
use url::Url;

use crate::{
    config::ChainConfig,
    contracts,
    error::RebuildError,
    events,
    snapshot::{self, ProofsPayload, SnapshotStore},
    tree, ROUND_SECONDS,
};

/// Timeout for watching the root-update transaction.
const TX_TIMEOUT: Duration = Duration::from_secs(180);

/// Why a run finished the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildReason {
    /// No eligible accounts in the scan window.
    Empty,
    /// The stored snapshot already matches the computed (root, round).
    Unchanged,
    /// A new snapshot was uploaded to the store.
    Pushed,
}

/// Per-chain output contract of the engine, immutable once returned.
#[derive(Clone, Debug, Serialize)]
pub struct RebuildResult {
    pub ok: bool,
    /// Whether a root-update transaction was mined. Independent of whether
    /// the snapshot write succeeded.
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RebuildReason>,
    pub count: usize,
    pub round: u64,
    pub file_root: B256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_root: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

impl RebuildResult {
    /// Clean negative result for soft terminations and synthetic failures.
    fn failed(warning: String) -> Self {
        Self {
            ok: false,
            updated: false,
            reason: None,
            count: 0,
            round: 0,
            file_root: B256::ZERO,
            onchain_root: None,
            snapshot_url: None,
            local_path: None,
            warnings: vec![warning],
            tx_hash: None,
        }
    }
}

/// One batch entry: the chain's identity plus its [RebuildResult].
#[derive(Clone, Debug, Serialize)]
pub struct RebuildBatchItem {
    pub chain_id: u64,
    pub slug: String,
    pub label: String,
    pub result: RebuildResult,
}

impl RebuildBatchItem {
    fn new(chain: &ChainConfig, result: RebuildResult) -> Self {
        Self {
            chain_id: chain.chain_id,
            slug: chain.chain_slug(),
            label: chain.chain_label(),
            result,
        }
    }
}

/// Options shared by every chain in a run.
#[derive(Clone, Debug)]
pub struct RebuildOptions {
    /// Reward substituted when the on-chain reward amount reads as zero.
    pub reward_fallback: U256,
    /// Credential for root-update transactions; absent means read-only sync.
    pub signer: Option<PrivateKeySigner>,
    /// Whether to mirror each proofs file to the local filesystem.
    pub write_local: bool,
    /// Directory for local mirror writes.
    pub local_dir: PathBuf,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            // 5 tokens at 18 decimals
            reward_fallback: U256::from(5) * U256::from(10).pow(U256::from(18)),
            signer: None,
            write_local: false,
            local_dir: PathBuf::from("public/claims"),
        }
    }
}

/// The current hour-bucketed round.
pub fn current_round() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
        / ROUND_SECONDS
}

/// The idempotence short-circuit: a stored snapshot matching the freshly
/// computed `(root, round)` means the run has nothing to publish.
pub fn snapshot_unchanged(current: Option<&ProofsPayload>, file_root: B256, round: u64) -> bool {
    current.is_some_and(|payload| payload.root == file_root && payload.round == round)
}

/// Whether a root-update transaction is required.
///
/// The distributor's round counter only moves forward: the same or an older
/// round is never re-published, even when the freshly built root differs (a
/// sliding scan window can change the root within a round). The next round
/// picks up the new root, so the decision depends on the rounds alone.
pub fn needs_onchain_update(round: u64, onchain_round: u64) -> bool {
    round > onchain_round
}

/// Rebuild one chain's airdrop state and publish what changed.
///
/// Soft problems (missing config, missing bytecode, store or transaction
/// failures) produce a clean result with warnings. Hard RPC failures abort
/// the run with an error for [rebuild_all] to catch.
pub async fn rebuild_chain(
    chain: &ChainConfig,
    store: &impl SnapshotStore,
    opts: &RebuildOptions,
) -> Result<RebuildBatchItem, RebuildError> {
    let label = chain.chain_label();
    let slug = chain.chain_slug();
    let mut warnings = Vec::new();

    // Step 1: configured?
    let (Some(rpc_url), Some(nft_address), Some(distributor_address)) =
        (chain.rpc_url.clone(), chain.nft_address, chain.distributor_address)
    else {
        tracing::warn!(chain = %label, "missing RPC endpoint or contract addresses; skipping");
        return Ok(RebuildBatchItem::new(
            chain,
            RebuildResult::failed(format!("missing RPC/NFT/distributor configuration for {label}")),
        ));
    };

    // Per-chain client bundle, constructed fresh each run.
    let provider = ProviderBuilder::new().connect_http(rpc_url.clone());

    // Step 2: distributor bytecode present?
    if !contracts::has_code(&provider, distributor_address).await? {
        tracing::warn!(chain = %label, distributor = %distributor_address, "no contract bytecode");
        return Ok(RebuildBatchItem::new(
            chain,
            RebuildResult::failed(format!("no contract bytecode at {distributor_address}")),
        ));
    }

    // Step 3: atomic on-chain state read. Failures here are hard.
    let onchain = contracts::read_distributor_state(&provider, distributor_address).await?;

    let reward_amount = if onchain.reward_amount.is_zero() {
        warnings.push(format!(
            "on-chain rewardAmount is 0; using fallback {}",
            opts.reward_fallback
        ));
        opts.reward_fallback
    } else {
        onchain.reward_amount
    };

    // Step 4: scan the sliding window, derive eligibility, build the tree.
    let to_block = provider.get_block_number().await?;
    let from_block = to_block.saturating_sub(chain.blocks_per_window);
    tracing::info!(chain = %label, from_block, to_block, "scanning mint transfers");

    let logs = events::scan_mint_logs(&provider, nft_address, from_block, to_block).await?;
    let minters = events::derive_minters(&logs);

    let round = current_round();
    let (file_root, claims) = tree::build_flat_claims(&minters, reward_amount, round);
    let count = claims.len();
    tracing::info!(
        chain = %label,
        count,
        round,
        root = %file_root,
        onchain_root = %onchain.root,
        onchain_round = onchain.round,
        "built claim tree"
    );

    // Step 5: compare against the stored snapshot. A read failure is soft;
    // the run continues as if no snapshot existed.
    let key = chain.snapshot_key();
    let current = match store.read(&key).await {
        Ok(current) => current,
        Err(err) => {
            warnings.push(format!("could not fetch current snapshot: {err}"));
            None
        }
    };

    if snapshot_unchanged(current.as_ref(), file_root, round) {
        tracing::info!(chain = %label, round, "snapshot unchanged; nothing to publish");
        let reason = if count == 0 { RebuildReason::Empty } else { RebuildReason::Unchanged };
        return Ok(RebuildBatchItem::new(
            chain,
            RebuildResult {
                ok: true,
                updated: false,
                reason: Some(reason),
                count,
                round,
                file_root,
                onchain_root: Some(onchain.root),
                // The stored snapshot is already current; point at it.
                snapshot_url: Some(store.location(&key)),
                local_path: None,
                warnings,
                tx_hash: None,
            },
        ));
    }

    // Step 6: publish the snapshot. Store and mirror failures are soft and
    // do not block the on-chain decision.
    let payload = ProofsPayload { round, root: file_root, claims };

    let mut snapshot_url = None;
    let mut pushed = false;
    match store.write(&key, &payload).await {
        Ok(location) => {
            tracing::info!(chain = %label, %location, "snapshot uploaded");
            snapshot_url = Some(location);
            pushed = true;
        }
        Err(err) => warnings.push(format!("snapshot upload failed: {err}")),
    }

    let mut local_path = None;
    if opts.write_local {
        match snapshot::write_local_mirror(&opts.local_dir, &slug, &payload) {
            Ok(path) => local_path = Some(path),
            Err(err) => warnings.push(format!("local mirror write failed: {err:#}")),
        }
    }

    // Steps 7 and 8: decide and publish the on-chain root. The sentinel root
    // for an empty set is never published on-chain.
    let need_update = !payload.claims.is_empty() && needs_onchain_update(round, onchain.round);

    let mut tx_hash = None;
    if need_update {
        if let Some(signer) = &opts.signer {
            match submit_root_update(rpc_url, signer.clone(), distributor_address, file_root, round)
                .await
            {
                Ok(hash) => {
                    tracing::info!(chain = %label, tx = %hash, round, "root update mined");
                    tx_hash = Some(hash);
                }
                Err(err) => warnings.push(format!("on-chain setRoot failed: {err}")),
            }
        } else {
            warnings.push(
                "setRoot needed but no publisher key configured; skipping on-chain update"
                    .to_string(),
            );
        }
    }

    // Step 9: assemble the result. `updated` reports the transaction alone.
    let reason = if count == 0 {
        RebuildReason::Empty
    } else if pushed {
        RebuildReason::Pushed
    } else {
        RebuildReason::Unchanged
    };

    Ok(RebuildBatchItem::new(
        chain,
        RebuildResult {
            ok: true,
            updated: tx_hash.is_some(),
            reason: Some(reason),
            count,
            round,
            file_root,
            onchain_root: Some(onchain.root),
            snapshot_url,
            local_path,
            warnings,
            tx_hash,
        },
    ))
}

/// Submit `setRoot(root, round)` and wait for inclusion.
async fn submit_root_update(
    rpc_url: Url,
    signer: PrivateKeySigner,
    distributor: Address,
    root: B256,
    round: u64,
) -> Result<TxHash, RebuildError> {
    let wallet = EthereumWallet::from(signer);
    let provider = ProviderBuilder::new().wallet(wallet).connect_http(rpc_url);
    let dist = contracts::IMerkleDistributor::new(distributor, &provider);

    let pending = dist
        .setRoot(root, round)
        .send()
        .await
        .map_err(|e| RebuildError::Transaction(e.into()))?;
    let hash = pending
        .with_timeout(Some(TX_TIMEOUT))
        .watch()
        .await
        .map_err(|e| RebuildError::Transaction(e.into()))?;
    Ok(hash)
}

/// Run the reconciler over every configured chain, strictly sequentially.
///
/// A hard failure in one chain's run is converted into a synthetic failed
/// item for that chain only; remaining chains still run. One item is
/// returned per configured chain, in configuration order.
pub async fn rebuild_all(
    chains: &[ChainConfig],
    store: &impl SnapshotStore,
    opts: &RebuildOptions,
) -> Vec<RebuildBatchItem> {
    let mut items = Vec::with_capacity(chains.len());
    for chain in chains {
        let label = chain.chain_label();
        match rebuild_chain(chain, store, opts).await {
            Ok(item) => {
                for warning in &item.result.warnings {
                    tracing::warn!(chain = %label, "{warning}");
                }
                items.push(item);
            }
            Err(err) => {
                tracing::error!(chain = %label, "rebuild failed: {err}");
                items.push(RebuildBatchItem::new(chain, RebuildResult::failed(err.to_string())));
            }
        }
    }
    items
}
