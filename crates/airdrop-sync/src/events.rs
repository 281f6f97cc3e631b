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

//! Mint event fetching and eligibility derivation.

use std::collections::BTreeSet;

use alloy::{
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Filter, Log},
    sol_types::SolEvent,
};

use crate::{contracts::IERC721, error::RebuildError, LOG_QUERY_CHUNK_SIZE};

/// Query logs in chunks to avoid hitting provider limits.
///
/// Sub-windows are queried strictly in ascending order and concatenated in
/// provider order. Any chunk failure aborts the whole scan; partial results
/// are never returned.
pub async fn query_logs_chunked<P: Provider>(
    provider: &P,
    filter: Filter,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Log>, RebuildError> {
    let mut all_logs = Vec::new();

    let mut current_from = from_block;
    while current_from <= to_block {
        let current_to = (current_from + LOG_QUERY_CHUNK_SIZE - 1).min(to_block);

        let chunk_filter = filter
            .clone()
            .from_block(BlockNumberOrTag::Number(current_from))
            .to_block(BlockNumberOrTag::Number(current_to));

        let logs = provider.get_logs(&chunk_filter).await?;
        all_logs.extend(logs);

        current_from = current_to + 1;
    }

    Ok(all_logs)
}

/// Fetch mint transfers (`Transfer` events from the zero address) emitted by
/// the NFT contract within `[from_block, to_block]`.
pub async fn scan_mint_logs<P: Provider>(
    provider: &P,
    nft_address: Address,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Log>, RebuildError> {
    let filter = Filter::new()
        .address(nft_address)
        .event_signature(IERC721::Transfer::SIGNATURE_HASH)
        .topic1(B256::ZERO);
    query_logs_chunked(provider, filter, from_block, to_block).await
}

/// Reduce mint logs to the deduplicated, canonically ordered eligibility set.
///
/// The recipient is the third topic slot, right-aligned. An account minting
/// more than once in the window counts once. Byte-ascending address order is
/// the canonical order leaves are built in.
pub fn derive_minters(logs: &[Log]) -> Vec<Address> {
    let mut minters = BTreeSet::new();
    for log in logs {
        let topics = log.topics();
        if topics.len() >= 3 {
            minters.insert(Address::from_slice(&topics[2][12..]));
        }
    }
    minters.into_iter().collect()
}
