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

//! Per-chain configuration and the chain registry.

use std::path::Path;

use alloy::primitives::Address;
use anyhow::Context;
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::DEFAULT_BLOCKS_PER_WINDOW;

/// Configuration for one chain's airdrop deployment.
///
/// Loaded once at process start, either from a registry file or from
/// environment-bound CLI flags for a single chain. Missing RPC or contract
/// addresses are not a parse error; the reconciler routes such chains to a
/// clean negative result.
#[non_exhaustive]
#[derive(Clone, Debug, Builder, Args, Serialize, Deserialize)]
#[group(requires = "chain_id")]
pub struct ChainConfig {
    /// EIP-155 chain ID of the network.
    #[clap(long, env = "CHAIN_ID")]
    #[builder(setter(into))]
    pub chain_id: u64,

    /// Human-readable network label used in logs and batch results.
    #[clap(long, env = "CHAIN_LABEL")]
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub label: Option<String>,

    /// Short identifier used in snapshot keys and mirror paths.
    #[clap(long, env = "CHAIN_SLUG")]
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub slug: Option<String>,

    /// URL of the chain's JSON-RPC endpoint.
    #[clap(long, env = "RPC_URL")]
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub rpc_url: Option<Url>,

    /// Address of the airdrop ERC-20 token contract.
    #[clap(long, env = "TOKEN_ADDRESS")]
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub token_address: Option<Address>,

    /// Address of the NFT contract whose mints define eligibility.
    #[clap(long, env = "NFT_ADDRESS")]
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub nft_address: Option<Address>,

    /// Address of the MerkleDistributor contract.
    #[clap(long, env = "DISTRIBUTOR_ADDRESS")]
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub distributor_address: Option<Address>,

    /// Number of blocks in the sliding eligibility window.
    #[clap(long, env = "BLOCKS_PER_WINDOW", default_value_t = DEFAULT_BLOCKS_PER_WINDOW)]
    #[serde(default = "default_blocks_per_window")]
    #[builder(default = "DEFAULT_BLOCKS_PER_WINDOW")]
    pub blocks_per_window: u64,
}

fn default_blocks_per_window() -> u64 {
    DEFAULT_BLOCKS_PER_WINDOW
}

impl ChainConfig {
    /// Create a new [ChainConfigBuilder].
    pub fn builder() -> ChainConfigBuilder {
        Default::default()
    }

    /// The chain's slug, falling back to `chain-{id}` when none is configured.
    pub fn chain_slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| format!("chain-{}", self.chain_id))
    }

    /// The chain's display label, falling back to the slug.
    pub fn chain_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.chain_slug())
    }

    /// Key of this chain's proofs file in the snapshot store.
    pub fn snapshot_key(&self) -> String {
        format!("claims/{}.json", self.chain_slug())
    }
}

/// The set of chains a sync run iterates over, in configuration order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainRegistry {
    pub chains: Vec<ChainConfig>,
}

impl ChainRegistry {
    /// Load a registry from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open chain registry {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("failed to parse chain registry {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn registry_parses_with_defaults() {
        let yaml = r#"
chains:
  - chain_id: 11155111
    label: "Ethereum Sepolia"
    slug: eth-sepolia
    rpc_url: "https://sepolia.example.com/rpc"
    nft_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
    distributor_address: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
  - chain_id: 421614
"#;
        let registry: ChainRegistry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(registry.chains.len(), 2);

        let sepolia = &registry.chains[0];
        assert_eq!(sepolia.chain_slug(), "eth-sepolia");
        assert_eq!(sepolia.chain_label(), "Ethereum Sepolia");
        assert_eq!(sepolia.snapshot_key(), "claims/eth-sepolia.json");
        assert_eq!(sepolia.blocks_per_window, DEFAULT_BLOCKS_PER_WINDOW);
        assert_eq!(
            sepolia.nft_address,
            Some(address!("5FbDB2315678afecb367f032d93F642f64180aa3"))
        );

        // Second entry has no slug, label, or contracts configured.
        let arb = &registry.chains[1];
        assert_eq!(arb.chain_slug(), "chain-421614");
        assert_eq!(arb.chain_label(), "chain-421614");
        assert!(arb.rpc_url.is_none());
        assert!(arb.distributor_address.is_none());
    }

    #[test]
    fn builder_constructs_minimal_config() {
        let config = ChainConfig::builder()
            .chain_id(1u64)
            .slug("mainnet")
            .build()
            .unwrap();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.snapshot_key(), "claims/mainnet.json");
        assert!(config.nft_address.is_none());
    }
}
