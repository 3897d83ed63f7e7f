use thiserror::Error;

/// Errors raised by tree mutation and proof generation.
///
/// Proof *verification* never raises: a proof that fails to reproduce the
/// expected root is an ordinary `false` from `verify`, not an error. A failed
/// operation leaves every input value intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MerkleTreeError {
    /// A leaf index is outside the tree or outside the asserted version range.
    #[error("index {index} out of range (limit {limit})")]
    IndexOutOfRange { index: u64, limit: u64 },

    /// An append landed on a leaf that already holds real data.
    #[error("leaf {index} already holds data")]
    LeafOccupied { index: u64 },

    /// The earlier path branched right of the later path; impossible while
    /// `earlier <= later`.
    #[error("path for leaf {earlier} diverges right of path for leaf {later}")]
    PathDivergence { earlier: u64, later: u64 },

    /// A descent ran out of tree before (or after) the recorded height.
    #[error("node depth disagrees with tree height {height}")]
    DepthMismatch { height: usize },
}
