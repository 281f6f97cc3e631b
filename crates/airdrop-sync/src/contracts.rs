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

//! Smart contract interfaces and distributor state reads.

use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    sol,
};

use crate::error::RebuildError;

sol! {
    #[sol(rpc)]
    contract IERC721 {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

sol! {
    #[sol(rpc)]
    contract IMerkleDistributor {
        function merkleRoot() external view returns (bytes32);
        function round() external view returns (uint64);
        function rewardAmount() external view returns (uint256);
        function setRoot(bytes32 newRoot, uint64 newRound) external;
        function claim(uint64 round, address account, uint256 amount, bytes32[] calldata proof) external;

        event RootUpdated(bytes32 indexed newRoot, uint64 newRound);
        event Claimed(uint64 indexed round, address indexed account, uint256 amount);
    }
}

/// The distributor's authoritative on-chain state.
///
/// Mutated only by a successful `setRoot` transaction; the engine otherwise
/// treats it as read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistributorState {
    pub root: B256,
    pub round: u64,
    pub reward_amount: U256,
}

/// Whether the given address has deployed bytecode.
pub async fn has_code<P: Provider>(provider: &P, address: Address) -> Result<bool, RebuildError> {
    let code = provider.get_code_at(address).await?;
    Ok(!code.is_empty())
}

/// Read the distributor's root, round, and reward amount as one snapshot.
///
/// The three reads are physically separate calls but treated atomically: if
/// any of them fails, none of the partial results are used.
pub async fn read_distributor_state<P: Provider>(
    provider: &P,
    distributor: Address,
) -> Result<DistributorState, RebuildError> {
    let dist = IMerkleDistributor::new(distributor, provider);
    let root_call = dist.merkleRoot();
    let round_call = dist.round();
    let reward_call = dist.rewardAmount();
    let (root, round, reward_amount) =
        tokio::try_join!(root_call.call(), round_call.call(), reward_call.call())?;
    Ok(DistributorState { root, round, reward_amount })
}
