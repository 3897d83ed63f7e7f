use super::HashMethod;
use sha2::{digest::FixedOutput, Digest, Sha256};

/// Salt prepended to leaf data before hashing.
pub const LEAF_TAG: u8 = 0x00;
/// Salt prepended to a pair of child digests before hashing.
pub const NODE_TAG: u8 = 0x01;

/// SHA-256 with domain separation between leaves and internal nodes.
///
/// The distinct tags keep every internal-node preimage out of the leaf
/// preimage space, so a proof cannot pass off an internal node as a leaf or
/// vice versa.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Tagged;

impl HashMethod for Sha256Tagged {
    fn hash_leaf(data: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update([LEAF_TAG]);
        hasher.update(data);
        hasher.finalize_fixed().to_vec()
    }

    fn hash_nodes(left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update([NODE_TAG]);
        hasher.update(left);
        hasher.update(right);
        hasher.finalize_fixed().to_vec()
    }
}
