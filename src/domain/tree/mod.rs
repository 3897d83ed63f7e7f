use log::debug;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use super::error::MerkleTreeError;
use super::hash::{sha256::Sha256Tagged, HashMethod};
use super::proof::incremental::{IncrementalProof, Skeleton};
use super::proof::membership::MembershipProof;

/// A node of the hash tree. Immutable once built; appends share every
/// untouched subtree between versions through the `Arc` children.
#[derive(Debug, PartialEq, Eq)]
pub enum Node {
    Leaf {
        digest: Vec<u8>,
    },
    Inner {
        digest: Vec<u8>,
        left: Arc<Node>,
        right: Arc<Node>,
    },
}

impl Node {
    fn leaf<Method: HashMethod>(data: &[u8]) -> Self {
        Node::Leaf {
            digest: Method::hash_leaf(data),
        }
    }

    fn join<Method: HashMethod>(left: Arc<Node>, right: Arc<Node>) -> Self {
        let digest = Method::hash_nodes(left.digest(), right.digest());
        Node::Inner {
            digest,
            left,
            right,
        }
    }

    pub fn digest(&self) -> &[u8] {
        match self {
            Node::Leaf { digest } | Node::Inner { digest, .. } => digest,
        }
    }
}

/// Leaf slots available at `height`.
fn capacity(height: usize) -> u64 {
    1u64 << height
}

/// Height of the canonical tree over `n` real leaves: `ceil(log2 n)`, with
/// the empty tree pinned at height 1 (a pair of default leaves).
pub fn height_for_size(n: u64) -> usize {
    if n == 0 {
        1
    } else {
        n.next_power_of_two().trailing_zeros() as usize
    }
}

/// Big-endian descent path of leaf `index` in a tree of `height`:
/// `false` = left, `true` = right, most significant bit first.
pub fn leaf_path(height: usize, index: u64) -> Vec<bool> {
    (0..height)
        .rev()
        .map(|level| (index >> level) & 1 == 1)
        .collect()
}

/// Digests of all-default subtrees: entry `k` is the digest of a depth-`k`
/// subtree holding only default leaves. Entry 0 is the default-leaf digest.
pub(crate) fn default_digests<Method: HashMethod>(levels: usize) -> Vec<Vec<u8>> {
    let mut digests = Vec::with_capacity(levels + 1);
    digests.push(Method::hash_leaf(&[]));
    for k in 1..=levels {
        let below = &digests[k - 1];
        digests.push(Method::hash_nodes(below, below));
    }
    digests
}

/// A depth-`height` subtree of default leaves. Children at each level are
/// the same shared node.
fn default_subtree<Method: HashMethod>(height: usize) -> Arc<Node> {
    let mut node = Arc::new(Node::leaf::<Method>(&[]));
    for _ in 0..height {
        node = Arc::new(Node::join::<Method>(Arc::clone(&node), node));
    }
    node
}

fn build_subtree<Method: HashMethod>(leaves: &[Arc<Node>]) -> Arc<Node> {
    if leaves.len() == 1 {
        return Arc::clone(&leaves[0]);
    }
    let (left_half, right_half) = leaves.split_at(leaves.len() / 2);
    let (left, right) = rayon::join(
        || build_subtree::<Method>(left_half),
        || build_subtree::<Method>(right_half),
    );
    Arc::new(Node::join::<Method>(left, right))
}

/// An append-only Merkle tree over an ordered sequence of byte blocks.
///
/// All leaves sit at depth `height`; the `2^height - size` slots past the
/// last real block hold default leaves (the hash of the empty string).
/// `append` returns a new value and never mutates its input, so any version
/// of the history can be kept alive for proof generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTree<Method: HashMethod> {
    root: Arc<Node>,
    height: usize,
    size: u64,
    method: PhantomData<Method>,
}

pub type HistoryTreeSha256 = HistoryTree<Sha256Tagged>;

impl<Method: HashMethod> HistoryTree<Method> {
    /// Build a tree over `blocks`. Leaves are hashed in parallel and the
    /// block list is padded with default leaves up to the next power of two.
    pub fn new(blocks: Vec<Vec<u8>>) -> Self {
        if blocks.is_empty() {
            return Self {
                root: default_subtree::<Method>(1),
                height: 1,
                size: 0,
                method: PhantomData,
            };
        }

        let total_start = Instant::now();
        let size = blocks.len() as u64;
        let height = height_for_size(size);

        let mut leaves: Vec<Arc<Node>> = blocks
            .par_iter()
            .map(|block| Arc::new(Node::leaf::<Method>(block)))
            .collect();
        let default_leaf = Arc::new(Node::leaf::<Method>(&[]));
        leaves.resize(capacity(height) as usize, default_leaf);

        let root = build_subtree::<Method>(&leaves);
        debug!(
            "built height-{height} tree over {size} blocks in {:?}",
            total_start.elapsed()
        );

        Self {
            root,
            height,
            size,
            method: PhantomData,
        }
    }

    /// Number of real leaves.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Depth from the root to every leaf.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Root digest, the commitment to the whole history.
    pub fn root_digest(&self) -> Vec<u8> {
        self.root.digest().to_vec()
    }

    /// Root digest in its external form: lowercase hex, 64 characters.
    pub fn root_hex(&self) -> String {
        hex::encode(self.root.digest())
    }

    /// Append `block` as leaf `size`, returning the successor tree. The
    /// rebuilt spine is O(log n); everything else is shared with `self`.
    ///
    /// A full tree first doubles its height by pairing the old root with a
    /// default subtree of the same shape. The destination slot must still
    /// hold a default leaf; anything else is an invariant violation and
    /// leaves `self` untouched.
    pub fn append(&self, block: &[u8]) -> Result<Self, MerkleTreeError> {
        if self.size == 0 {
            // The first real block replaces the placeholder pair outright,
            // keeping append-built histories digest-equal to batch-built
            // trees at every prefix length.
            return Ok(Self {
                root: Arc::new(Node::leaf::<Method>(block)),
                height: 0,
                size: 1,
                method: PhantomData,
            });
        }

        let mut root = Arc::clone(&self.root);
        let mut height = self.height;
        if self.size == capacity(height) {
            debug!("tree full at height {height}; doubling under a default sibling");
            let padding = default_subtree::<Method>(height);
            root = Arc::new(Node::join::<Method>(root, padding));
            height += 1;
        }

        let path = leaf_path(height, self.size);
        let root = Self::graft(&root, &path, Node::leaf::<Method>(block), self.size, height)?;
        Ok(Self {
            root,
            height,
            size: self.size + 1,
            method: PhantomData,
        })
    }

    fn graft(
        node: &Arc<Node>,
        path: &[bool],
        leaf: Node,
        index: u64,
        height: usize,
    ) -> Result<Arc<Node>, MerkleTreeError> {
        match (node.as_ref(), path.split_first()) {
            (Node::Inner { left, right, .. }, Some((goes_right, rest))) => {
                if *goes_right {
                    let right = Self::graft(right, rest, leaf, index, height)?;
                    Ok(Arc::new(Node::join::<Method>(Arc::clone(left), right)))
                } else {
                    let left = Self::graft(left, rest, leaf, index, height)?;
                    Ok(Arc::new(Node::join::<Method>(left, Arc::clone(right))))
                }
            }
            (Node::Leaf { digest }, None) => {
                if *digest != Method::hash_leaf(&[]) {
                    return Err(MerkleTreeError::LeafOccupied { index });
                }
                Ok(Arc::new(leaf))
            }
            _ => Err(MerkleTreeError::DepthMismatch { height }),
        }
    }

    /// Sibling digests along the path to leaf `index`, closest to the leaf
    /// first. The root digest is not part of the proof.
    pub fn membership_proof(&self, index: u64) -> Result<MembershipProof<Method>, MerkleTreeError> {
        if index >= self.size {
            return Err(MerkleTreeError::IndexOutOfRange {
                index,
                limit: self.size,
            });
        }

        let mut siblings = Vec::with_capacity(self.height);
        let mut node = &self.root;
        for goes_right in leaf_path(self.height, index) {
            let Node::Inner { left, right, .. } = node.as_ref() else {
                return Err(MerkleTreeError::DepthMismatch {
                    height: self.height,
                });
            };
            if goes_right {
                siblings.push(left.digest().to_vec());
                node = right;
            } else {
                siblings.push(right.digest().to_vec());
                node = left;
            }
        }
        siblings.reverse();
        Ok(MembershipProof::new(index, siblings))
    }

    /// Witness that the first `earlier + 1` leaves of this tree are exactly
    /// the leaves behind the version-`earlier` root. The proof is a pruned
    /// copy of this tree: stubs for every subtree the verifier takes on
    /// digest authority, expanded branches along the two leaf paths.
    ///
    /// A proof about version `later` must be generated from the tree value
    /// of size `later + 1`.
    pub fn incremental_proof(
        &self,
        earlier: u64,
        later: u64,
    ) -> Result<IncrementalProof<Method>, MerkleTreeError> {
        if later >= self.size {
            return Err(MerkleTreeError::IndexOutOfRange {
                index: later,
                limit: self.size,
            });
        }
        if earlier > later {
            return Err(MerkleTreeError::IndexOutOfRange {
                index: earlier,
                limit: later + 1,
            });
        }
        if earlier == later {
            // Same version on both sides: the root alone is the witness.
            return Ok(IncrementalProof::new(Skeleton::stub(self.root.digest())));
        }

        let earlier_path = leaf_path(self.height, earlier);
        let later_path = leaf_path(self.height, later);
        let skeleton = Self::skeleton(&self.root, &earlier_path, &later_path, earlier, later)?;
        Ok(IncrementalProof::new(skeleton))
    }

    fn skeleton(
        node: &Node,
        earlier_path: &[bool],
        later_path: &[bool],
        earlier: u64,
        later: u64,
    ) -> Result<Skeleton, MerkleTreeError> {
        let (
            Node::Inner { left, right, .. },
            Some((&earlier_right, earlier_rest)),
            Some((&later_right, later_rest)),
        ) = (node, earlier_path.split_first(), later_path.split_first())
        else {
            return Err(MerkleTreeError::DepthMismatch {
                height: earlier_path.len(),
            });
        };

        match (earlier_right, later_right) {
            (false, false) => Ok(Skeleton::Branch {
                left: Box::new(Self::skeleton(
                    left,
                    earlier_rest,
                    later_rest,
                    earlier,
                    later,
                )?),
                right: Box::new(Skeleton::stub(right.digest())),
            }),
            (true, true) => Ok(Skeleton::Branch {
                left: Box::new(Skeleton::stub(left.digest())),
                right: Box::new(Self::skeleton(
                    right,
                    earlier_rest,
                    later_rest,
                    earlier,
                    later,
                )?),
            }),
            (false, true) => Ok(Skeleton::Branch {
                left: Box::new(Self::spine(left, earlier_rest)),
                right: Box::new(Self::spine(right, later_rest)),
            }),
            (true, false) => Err(MerkleTreeError::PathDivergence { earlier, later }),
        }
    }

    /// Single-path descent after the two paths split: every off-path sibling
    /// collapses into a stub, and so does the leaf itself.
    fn spine(node: &Node, path: &[bool]) -> Skeleton {
        match (node, path.split_first()) {
            (Node::Inner { left, right, .. }, Some((&goes_right, rest))) => {
                if goes_right {
                    Skeleton::Branch {
                        left: Box::new(Skeleton::stub(left.digest())),
                        right: Box::new(Self::spine(right, rest)),
                    }
                } else {
                    Skeleton::Branch {
                        left: Box::new(Self::spine(left, rest)),
                        right: Box::new(Skeleton::stub(right.digest())),
                    }
                }
            }
            _ => Skeleton::stub(node.digest()),
        }
    }
}

impl<Method: HashMethod> Default for HistoryTree<Method> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
