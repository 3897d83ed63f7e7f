use std::marker::PhantomData;

use crate::domain::hash::{sha256::Sha256Tagged, HashMethod};
use crate::domain::tree::{default_digests, height_for_size};

/// A pruned copy of the later tree. Subtrees the verifier never descends
/// into are collapsed to [`Skeleton::Stub`], carrying only their digest;
/// nodes on the witnessed spine are [`Skeleton::Branch`], whose digest is
/// omitted and recomputed by the verifier from the children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skeleton {
    Stub {
        digest: Vec<u8>,
    },
    Branch {
        left: Box<Skeleton>,
        right: Box<Skeleton>,
    },
}

impl Skeleton {
    pub(crate) fn stub(digest: &[u8]) -> Self {
        Skeleton::Stub {
            digest: digest.to_vec(),
        }
    }
}

/// Witness that the tree at version `earlier` is a prefix of the tree at
/// version `later`. Verifiable from the two root digests and the two
/// indices alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalProof<Method: HashMethod> {
    skeleton: Skeleton,
    method: PhantomData<Method>,
}

pub type IncrementalProofSha256 = IncrementalProof<Sha256Tagged>;

impl<Method: HashMethod> IncrementalProof<Method> {
    pub fn new(skeleton: Skeleton) -> Self {
        Self {
            skeleton,
            method: PhantomData,
        }
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Check that `earlier_root` commits to the first `earlier + 1` leaves
    /// of the tree behind `later_root`.
    ///
    /// Both roots are recomputed from the same skeleton: the later root
    /// bottom-up over every node, the earlier root along the earlier leaf's
    /// path. A skeleton forged from either tree alone fails the other
    /// recomputation; any structural mismatch is a plain `false`.
    pub fn verify(
        &self,
        earlier: u64,
        later: u64,
        earlier_root: &[u8],
        later_root: &[u8],
    ) -> bool {
        if earlier > later {
            return false;
        }
        let height = height_for_size(later + 1);
        let earlier_height = height_for_size(earlier + 1);

        if Self::recompute(&self.skeleton) != later_root {
            return false;
        }

        let defaults = default_digests::<Method>(height);
        match Self::earlier_root(
            &self.skeleton,
            0,
            height,
            earlier_height,
            earlier,
            &defaults,
        ) {
            Some(digest) => digest == earlier_root,
            None => false,
        }
    }

    /// Digest of a skeleton subtree: stubs are authoritative, branches are
    /// recomputed bottom-up.
    fn recompute(skeleton: &Skeleton) -> Vec<u8> {
        match skeleton {
            Skeleton::Stub { digest } => digest.clone(),
            Skeleton::Branch { left, right } => {
                Method::hash_nodes(&Self::recompute(left), &Self::recompute(right))
            }
        }
    }

    /// Digest the earlier tree's root had, reconstructed from the skeleton.
    ///
    /// A tree of `earlier_height` occupies the leftmost subtree at depth
    /// `height - earlier_height`; the descent above that level is all left
    /// branches. Below it the earlier leaf's path decides the turns.
    fn earlier_root(
        skeleton: &Skeleton,
        depth: usize,
        height: usize,
        earlier_height: usize,
        earlier: u64,
        defaults: &[Vec<u8>],
    ) -> Option<Vec<u8>> {
        if depth < height - earlier_height {
            match skeleton {
                Skeleton::Branch { left, .. } => {
                    Self::earlier_root(left, depth + 1, height, earlier_height, earlier, defaults)
                }
                Skeleton::Stub { .. } => None,
            }
        } else {
            Self::within_earlier(skeleton, depth, height, earlier, defaults)
        }
    }

    fn within_earlier(
        skeleton: &Skeleton,
        depth: usize,
        height: usize,
        earlier: u64,
        defaults: &[Vec<u8>],
    ) -> Option<Vec<u8>> {
        match skeleton {
            // The earlier leaf itself, or the whole committed subtree when
            // the proof degenerates (earlier == later).
            Skeleton::Stub { digest } => Some(digest.clone()),
            Skeleton::Branch { left, right } => {
                if depth >= height {
                    return None;
                }
                let child_depth = height - depth - 1;
                if (earlier >> child_depth) & 1 == 0 {
                    // Everything right of the earlier path was still default
                    // leaves at version `earlier`.
                    let below =
                        Self::within_earlier(left, depth + 1, height, earlier, defaults)?;
                    Some(Method::hash_nodes(&below, &defaults[child_depth]))
                } else {
                    let below =
                        Self::within_earlier(right, depth + 1, height, earlier, defaults)?;
                    Some(Method::hash_nodes(&Self::recompute(left), &below))
                }
            }
        }
    }
}
