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

use alloy::transports::TransportError;

/// Errors raised while rebuilding a chain's airdrop state.
///
/// `Rpc` and `Contract` are hard failures: they abort the chain's run and are
/// caught only by the batch runner. `Store` and `Transaction` are soft: the
/// reconciler records them as warnings and keeps going, since the snapshot
/// store and the on-chain root are independent publication targets.
#[derive(thiserror::Error, Debug)]
pub enum RebuildError {
    /// Transport-level RPC failure during a log scan or block read.
    #[error("rpc error: {0}")]
    Rpc(#[from] TransportError),

    /// Contract call failure while reading distributor state.
    #[error("contract call error: {0}")]
    Contract(#[from] alloy::contract::Error),

    /// Snapshot store transport or auth failure.
    #[error("snapshot store error: {0}")]
    Store(#[source] anyhow::Error),

    /// Root-update transaction submission or confirmation failure.
    #[error("transaction error: {0}")]
    Transaction(#[source] anyhow::Error),
}
