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

use std::{path::PathBuf, time::Duration};

use airdrop_sync::{
    rebuild_all, ChainConfig, ChainRegistry, RebuildOptions, S3SnapshotStore,
};
use alloy::{primitives::utils::parse_units, signers::local::PrivateKeySigner};
use anyhow::{bail, Result};
use clap::Parser;

/// Arguments of the airdrop sync runner.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct MainArgs {
    /// Path to the chain registry file (YAML). Mutually exclusive with the
    /// single-chain flags below.
    #[clap(long, env = "CHAIN_REGISTRY")]
    config: Option<PathBuf>,

    /// Single-chain configuration via flags or environment.
    #[clap(flatten, next_help_heading = "Single chain")]
    chain: Option<ChainConfig>,

    /// S3 bucket holding the public proofs files.
    #[clap(long, env = "SNAPSHOT_BUCKET")]
    bucket: String,

    /// Private key used to submit root updates; omit for read-only sync.
    #[clap(long, env = "PUBLISHER_PRIVATE_KEY")]
    private_key: Option<PrivateKeySigner>,

    /// Fallback reward in whole tokens (18 decimals), substituted when the
    /// on-chain reward amount is zero.
    #[clap(long, env = "REWARD_AMOUNT", default_value = "5")]
    reward_fallback: String,

    /// Mirror each proofs file to the local filesystem.
    #[clap(long, env = "WRITE_LOCAL", default_value_t = false)]
    write_local: bool,

    /// Directory for local mirror writes.
    #[clap(long, env = "LOCAL_DIR", default_value = "public/claims")]
    local_dir: PathBuf,

    /// Interval in seconds between runs; run once if not set.
    #[clap(long, env)]
    interval: Option<u64>,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = MainArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt().with_ansi(false).json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_ansi(false).with_env_filter(filter).init();
    }

    let chains = match (&args.config, &args.chain) {
        (Some(path), _) => ChainRegistry::load(path)?.chains,
        (None, Some(chain)) => vec![chain.clone()],
        (None, None) => bail!("provide --config or the single-chain flags"),
    };
    tracing::info!("syncing {} chain(s)", chains.len());

    let store = S3SnapshotStore::from_env(&args.bucket).await;

    let opts = RebuildOptions {
        reward_fallback: parse_units(&args.reward_fallback, 18)?.into(),
        signer: args.private_key.clone(),
        write_local: args.write_local,
        local_dir: args.local_dir.clone(),
    };

    loop {
        let items = rebuild_all(&chains, &store, &opts).await;
        for item in &items {
            tracing::info!(
                chain = %item.label,
                ok = item.result.ok,
                updated = item.result.updated,
                reason = ?item.result.reason,
                count = item.result.count,
                round = item.result.round,
                root = %item.result.file_root,
                "rebuild finished"
            );
        }

        let Some(interval) = args.interval else {
            break;
        };
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }

    Ok(())
}
