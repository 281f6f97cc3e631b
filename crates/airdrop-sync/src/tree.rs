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

//! Leaf hashing, sorted-pair Merkle tree construction, and proof verification.

use alloy::primitives::{keccak256, Address, B256, U256};

use crate::snapshot::Claim;

/// Root published in the proofs file when no accounts are eligible.
///
/// Consumers must branch on an empty claim list to detect the empty case, not
/// compare roots against this value.
pub fn empty_root() -> B256 {
    keccak256(b"empty")
}

/// Hash committing one account's entitlement for a round.
///
/// Fixed-width packed encoding: 20-byte account, 32-byte big-endian amount,
/// 8-byte big-endian round. Bit-exact across implementations; the round
/// component prevents proof reuse across rounds.
pub fn leaf_hash(account: Address, amount: U256, round: u64) -> B256 {
    let mut packed = [0u8; 60];
    packed[..20].copy_from_slice(account.as_slice());
    packed[20..52].copy_from_slice(&amount.to_be_bytes::<32>());
    packed[52..].copy_from_slice(&round.to_be_bytes());
    keccak256(packed)
}

/// Hash two sibling nodes in ascending numeric order.
///
/// Ordering by value rather than position is what lets a verifier reconstruct
/// the root from `(leaf, proof)` alone, without sibling positions.
fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Binary Merkle tree with sorted-pair hashing at every level.
///
/// An odd trailing node is promoted to the next level unchanged.
pub struct MerkleTree {
    levels: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Build a tree over the given leaves. `leaves` must be non-empty.
    pub fn new(leaves: Vec<B256>) -> Self {
        debug_assert!(!leaves.is_empty(), "tree requires at least one leaf");
        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let next = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => hash_pair(*a, *b),
                    [a] => *a,
                    _ => unreachable!(),
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    /// The single top hash.
    pub fn root(&self) -> B256 {
        self.levels[self.levels.len() - 1][0]
    }

    /// Sibling hashes from the leaf at `index` up to the root.
    pub fn proof(&self, mut index: usize) -> Vec<B256> {
        let mut proof = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if sibling < level.len() {
                proof.push(level[sibling]);
            }
            index /= 2;
        }
        proof
    }
}

/// Reconstruct the root from a leaf and its proof and compare.
pub fn verify_proof(leaf: B256, proof: &[B256], root: B256) -> bool {
    proof.iter().fold(leaf, |acc, sibling| hash_pair(acc, *sibling)) == root
}

/// Build the commitment for a set of per-account entitlements.
///
/// Entitlements are sorted into canonical (byte-ascending account) order and
/// deduplicated by account, so the resulting root is deterministic for a given
/// input set, amounts, and round. An empty set yields the sentinel
/// [empty_root] and no claims.
pub fn build_claims(entitlements: &[(Address, U256)], round: u64) -> (B256, Vec<Claim>) {
    let mut entitlements: Vec<(Address, U256)> = entitlements.to_vec();
    entitlements.sort_unstable_by_key(|(account, _)| *account);
    entitlements.dedup_by_key(|(account, _)| *account);

    if entitlements.is_empty() {
        return (empty_root(), Vec::new());
    }

    let leaves: Vec<B256> =
        entitlements.iter().map(|(account, amount)| leaf_hash(*account, *amount, round)).collect();
    let tree = MerkleTree::new(leaves);

    let claims = entitlements
        .iter()
        .enumerate()
        .map(|(i, (account, amount))| Claim {
            account: *account,
            amount: *amount,
            proof: tree.proof(i),
        })
        .collect();

    (tree.root(), claims)
}

/// [build_claims] with one flat reward amount for every account.
pub fn build_flat_claims(
    addresses: &[Address],
    reward_amount: U256,
    round: u64,
) -> (B256, Vec<Claim>) {
    let entitlements: Vec<(Address, U256)> =
        addresses.iter().map(|account| (*account, reward_amount)).collect();
    build_claims(&entitlements, round)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tail: u8) -> Address {
        let mut bytes = [0xaau8; 20];
        bytes[19] = tail;
        Address::from(bytes)
    }

    fn flat_amount() -> U256 {
        // 5e18
        U256::from(5) * U256::from(10).pow(U256::from(18))
    }

    #[test]
    fn empty_set_yields_sentinel() {
        let (root, claims) = build_flat_claims(&[], flat_amount(), 100_000);
        assert_eq!(root, empty_root());
        assert!(claims.is_empty());
        assert_eq!(empty_root(), keccak256(b"empty"));
    }

    #[test]
    fn single_leaf_root_is_leaf() {
        let (root, claims) = build_flat_claims(&[addr(1)], flat_amount(), 100_000);
        assert_eq!(claims.len(), 1);
        assert!(claims[0].proof.is_empty());
        assert_eq!(root, leaf_hash(addr(1), flat_amount(), 100_000));
    }

    #[test]
    fn every_claim_proof_verifies() {
        let addresses: Vec<Address> = (1..=7).map(addr).collect();
        let (root, claims) = build_flat_claims(&addresses, flat_amount(), 100_000);

        assert_eq!(claims.len(), addresses.len());
        for claim in &claims {
            let leaf = leaf_hash(claim.account, claim.amount, 100_000);
            assert!(verify_proof(leaf, &claim.proof, root));
        }
    }

    #[test]
    fn root_is_deterministic_and_order_independent() {
        let sorted: Vec<Address> = (1..=5).map(addr).collect();
        let mut shuffled = sorted.clone();
        shuffled.swap(0, 4);
        shuffled.swap(1, 3);

        let (root_a, _) = build_flat_claims(&sorted, flat_amount(), 100_000);
        let (root_b, _) = build_flat_claims(&shuffled, flat_amount(), 100_000);
        let (root_c, _) = build_flat_claims(&sorted, flat_amount(), 100_000);

        assert_eq!(root_a, root_b);
        assert_eq!(root_a, root_c);
    }

    #[test]
    fn duplicate_accounts_count_once() {
        let (root_a, claims) =
            build_flat_claims(&[addr(1), addr(2), addr(1)], flat_amount(), 100_000);
        let (root_b, _) = build_flat_claims(&[addr(1), addr(2)], flat_amount(), 100_000);

        assert_eq!(claims.len(), 2);
        assert_eq!(root_a, root_b);
    }

    #[test]
    fn two_member_scenario() {
        // Two members, flat 5e18, round 100000: the member proof verifies, a
        // non-member leaf does not.
        let (root, claims) = build_flat_claims(&[addr(1), addr(2)], flat_amount(), 100_000);

        let member_leaf = leaf_hash(addr(1), flat_amount(), 100_000);
        assert!(verify_proof(member_leaf, &claims[0].proof, root));
        assert!(!claims.iter().any(|c| c.account == addr(9)));

        let outsider_leaf = leaf_hash(addr(9), flat_amount(), 100_000);
        assert!(!verify_proof(outsider_leaf, &claims[0].proof, root));
    }

    #[test]
    fn round_changes_the_root() {
        let addresses = vec![addr(1), addr(2), addr(3)];
        let (root_a, _) = build_flat_claims(&addresses, flat_amount(), 100_000);
        let (root_b, _) = build_flat_claims(&addresses, flat_amount(), 100_001);
        assert_ne!(root_a, root_b);
    }

    #[test]
    fn per_account_amounts_commit_independently() {
        let entitlements = vec![(addr(1), U256::from(7)), (addr(2), U256::from(11))];
        let (root, claims) = build_claims(&entitlements, 42);

        for claim in &claims {
            let leaf = leaf_hash(claim.account, claim.amount, 42);
            assert!(verify_proof(leaf, &claim.proof, root));
        }

        // Swapping one amount changes the commitment.
        let altered = vec![(addr(1), U256::from(8)), (addr(2), U256::from(11))];
        let (altered_root, _) = build_claims(&altered, 42);
        assert_ne!(root, altered_root);
    }

    #[test]
    fn odd_leaf_counts_promote_the_trailing_node() {
        // With three leaves the last one pairs against the hash of the first
        // two at the top level; its proof has a single element.
        let addresses = vec![addr(1), addr(2), addr(3)];
        let (root, claims) = build_flat_claims(&addresses, flat_amount(), 100_000);

        let last = &claims[2];
        assert_eq!(last.proof.len(), 1);
        let leaf = leaf_hash(last.account, last.amount, 100_000);
        assert!(verify_proof(leaf, &last.proof, root));
    }
}
