//! Binary Keccak-256 Merkle trees.

use rayon::prelude::*;
use zk_evm_common::keccak256;
use zk_evm_multiprecision::FftField;

use crate::error::{CommitmentError, Result};
use crate::pool::{PoolLevel, PARALLEL_THRESHOLD};

pub type Digest = [u8; 32];

/// Compresses two child digests into their parent.
pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    keccak256(buf)
}

/// Serializes a stream of field elements into leaf bytes, each element in its
/// fixed-width big-endian encoding.
pub fn field_elements_to_bytes<'a, F: FftField>(values: impl IntoIterator<Item = &'a F>) -> Vec<u8> {
    values
        .into_iter()
        .flat_map(|v| v.to_be_bytes())
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    /// `layers[0]` are the leaf hashes, the last layer is the root.
    layers: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Hashes every leaf and builds the tree. The number of leaves must be a
    /// power of two.
    pub fn new<L: AsRef<[u8]> + Sync>(leaves: &[L]) -> Result<Self> {
        let hashes = if leaves.len() >= PARALLEL_THRESHOLD {
            PoolLevel::Low.install(|| leaves.par_iter().map(keccak256).collect())
        } else {
            leaves.iter().map(keccak256).collect()
        };
        Self::from_leaf_hashes(hashes)
    }

    pub fn from_leaf_hashes(leaf_hashes: Vec<Digest>) -> Result<Self> {
        if !leaf_hashes.len().is_power_of_two() {
            return Err(CommitmentError::SizeNotPowerOfTwo(leaf_hashes.len()));
        }
        let mut layers = vec![leaf_hashes];
        while let Some(last) = layers.last().filter(|layer| layer.len() > 1) {
            let compress = |pair: &[Digest]| hash_pair(&pair[0], &pair[1]);
            let next: Vec<Digest> = if last.len() >= PARALLEL_THRESHOLD {
                PoolLevel::Low.install(|| last.par_chunks(2).map(compress).collect())
            } else {
                last.chunks(2).map(compress).collect()
            };
            layers.push(next);
        }
        Ok(Self { layers })
    }

    pub fn root(&self) -> Digest {
        self.layers.last().map(|layer| layer[0]).unwrap_or_default()
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn prove(&self, index: usize) -> Result<MerkleProof> {
        if index >= self.leaf_count() {
            return Err(CommitmentError::InvalidLeafIndex {
                index,
                leaves: self.leaf_count(),
            });
        }
        let path = self.layers[..self.depth()]
            .iter()
            .enumerate()
            .map(|(level, layer)| {
                let position = index >> level;
                MerklePathStep {
                    sibling: layer[position ^ 1],
                    is_right: position & 1 == 1,
                }
            })
            .collect();
        Ok(MerkleProof { path })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MerklePathStep {
    pub sibling: Digest,
    /// Whether the node on the path is the right child at this level.
    pub is_right: bool,
}

/// Authentication path from a leaf to the root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub path: Vec<MerklePathStep>,
}

impl MerkleProof {
    /// The leaf index encoded by the orientation bits, or `None` when the
    /// path is too deep for the index to fit in a `usize`.
    pub fn leaf_index(&self) -> Option<usize> {
        if self.depth() > usize::BITS as usize {
            return None;
        }
        Some(
            self.path
                .iter()
                .enumerate()
                .fold(0, |acc, (level, step)| acc | (usize::from(step.is_right) << level)),
        )
    }

    /// Whether the path leads to leaf `index` of a tree with `leaves` leaves.
    pub fn opens(&self, index: usize, leaves: usize) -> bool {
        leaves.is_power_of_two()
            && self.depth() == leaves.trailing_zeros() as usize
            && self.leaf_index() == Some(index)
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn compute_root(&self, leaf: &[u8]) -> Digest {
        self.path.iter().fold(keccak256(leaf), |node, step| {
            if step.is_right {
                hash_pair(&step.sibling, &node)
            } else {
                hash_pair(&node, &step.sibling)
            }
        })
    }

    pub fn verify(&self, leaf: &[u8], root: &Digest) -> bool {
        self.compute_root(leaf) == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| (i as u64).to_be_bytes().to_vec()).collect()
    }

    #[test]
    fn test_every_leaf_verifies() -> anyhow::Result<()> {
        let data = leaves(16);
        let tree = MerkleTree::new(&data)?;
        assert_eq!(tree.depth(), 4);
        for (i, leaf) in data.iter().enumerate() {
            let proof = tree.prove(i)?;
            assert_eq!(proof.leaf_index(), Some(i));
            assert!(proof.opens(i, 16));
            assert!(!proof.opens(i, 32));
            assert!(proof.verify(leaf, &tree.root()));
            assert!(!proof.verify(b"other", &tree.root()));
        }
        assert!(tree.prove(16).is_err());
        Ok(())
    }

    #[test]
    fn test_over_deep_path_has_no_index() -> anyhow::Result<()> {
        let data = leaves(4);
        let tree = MerkleTree::new(&data)?;
        let mut proof = tree.prove(3)?;
        let step = proof.path[0];
        proof.path.resize(usize::BITS as usize + 6, step);
        assert_eq!(proof.leaf_index(), None);
        assert!(!proof.opens(3, 4));
        assert!(!proof.opens(3, 1 << 20));
        assert!(!proof.verify(&data[3], &tree.root()));
        Ok(())
    }

    #[test]
    fn test_root_of_small_trees() -> anyhow::Result<()> {
        let one = MerkleTree::new(&leaves(1))?;
        assert_eq!(one.root(), keccak256(0u64.to_be_bytes()));
        assert!(one.prove(0)?.path.is_empty());

        let two = MerkleTree::new(&leaves(2))?;
        assert_eq!(
            two.root(),
            hash_pair(
                &keccak256(0u64.to_be_bytes()),
                &keccak256(1u64.to_be_bytes())
            )
        );
        assert!(MerkleTree::new(&leaves(3)).is_err());
        Ok(())
    }

    #[test]
    fn test_large_tree_matches_sequential_build() -> anyhow::Result<()> {
        let data = leaves(1 << 13);
        let tree = MerkleTree::new(&data)?;
        let hashes = data.iter().map(keccak256).collect();
        let mut sequential = vec![hashes];
        while sequential.last().map_or(0, Vec::len) > 1 {
            let next = sequential
                .last()
                .map(|l: &Vec<Digest>| l.chunks(2).map(|p| hash_pair(&p[0], &p[1])).collect())
                .unwrap_or_default();
            sequential.push(next);
        }
        assert_eq!(tree.root(), sequential.last().unwrap()[0]);
        let proof = tree.prove(4097)?;
        assert!(proof.verify(&data[4097], &tree.root()));
        Ok(())
    }
}
