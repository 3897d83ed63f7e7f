#![deny(clippy::all)]

//! An append-only, history-authenticating Merkle tree.
//!
//! A [`HistoryTree`] commits to an ordered sequence of byte blocks. Appending
//! never mutates an existing tree value: `append` returns a new tree that shares
//! every untouched subtree with its predecessor. Any version can produce a
//! [`MembershipProof`] (block `i` is a leaf of this tree) or an
//! [`IncrementalProof`] (an earlier root commits to a prefix of this tree's
//! leaves), both verifiable from root digests alone.

use env_logger::Builder;
use log::LevelFilter;
use std::sync::Once;

mod domain;

pub use domain::{
    error::MerkleTreeError,
    hash::{sha256::Sha256Tagged, HashMethod},
    proof::{
        incremental::{IncrementalProof, IncrementalProofSha256, Skeleton},
        membership::{MembershipProof, MembershipProofSha256},
    },
    store::{Entry, KvStore, KvStoreSha256},
    tree::{height_for_size, leaf_path, HistoryTree, HistoryTreeSha256},
};

static INIT: Once = Once::new();

/// One-time logger initialization for binaries and tests that want the
/// tree-construction diagnostics on stderr. Safe to call more than once.
pub fn init_logging() {
    INIT.call_once(|| {
        Builder::new().filter_level(LevelFilter::Error).init();
    });
}
