use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::collections::HashMap;
use std::io::{Read, Write};

use super::error::MerkleTreeError;
use super::hash::{sha256::Sha256Tagged, HashMethod};
use super::proof::membership::MembershipProof;
use super::tree::HistoryTree;

/// One key-value record, stored as a Merkle leaf of its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Write the envelope: `u32` key length, key bytes, `u32` value length,
    /// value bytes, lengths little-endian. Deterministic and injective.
    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<usize> {
        w.write_u32::<LittleEndian>(self.key.len() as u32)?;
        w.write_all(&self.key)?;
        w.write_u32::<LittleEndian>(self.value.len() as u32)?;
        w.write_all(&self.value)?;
        Ok(4 + self.key.len() + 4 + self.value.len())
    }

    pub fn read<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let key_len = r.read_u32::<LittleEndian>()? as usize;
        let mut key = vec![0u8; key_len];
        r.read_exact(&mut key)?;

        let value_len = r.read_u32::<LittleEndian>()? as usize;
        let mut value = vec![0u8; value_len];
        r.read_exact(&mut value)?;

        Ok(Entry { key, value })
    }

    /// Envelope as a byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(8 + self.key.len() + self.value.len());
        self.write(&mut buffer).expect("writing to a Vec cannot fail");
        buffer
    }
}

/// Append-only key-value overlay over a [`HistoryTree`].
///
/// Every `put` becomes a new leaf; nothing is ever deleted or rewritten in
/// place. `hist` tracks, per key, the ordinals that wrote it, most recent
/// first, so `get` is the newest entry and older values stay provable.
#[derive(Debug, Clone)]
pub struct KvStore<Method: HashMethod> {
    tree: HistoryTree<Method>,
    entries: Vec<Entry>,
    hist: HashMap<Vec<u8>, Vec<u64>>,
}

pub type KvStoreSha256 = KvStore<Sha256Tagged>;

impl<Method: HashMethod> KvStore<Method> {
    pub fn new() -> Self {
        Self {
            tree: HistoryTree::new(Vec::new()),
            entries: Vec::new(),
            hist: HashMap::new(),
        }
    }

    /// Append `(key, value)`. Returns the entry's leaf ordinal, 0-indexed
    /// and assigned before the insert.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<u64, MerkleTreeError> {
        let ordinal = self.tree.size();
        let entry = Entry::new(key, value);
        self.tree = self.tree.append(&entry.encode())?;
        debug!("kv put: {} byte key at ordinal {ordinal}", entry.key.len());
        self.hist.entry(entry.key.clone()).or_default().insert(0, ordinal);
        self.entries.push(entry);
        Ok(ordinal)
    }

    /// Most recent entry written under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        let ordinal = *self.hist.get(key)?.first()?;
        self.entries.get(ordinal as usize)
    }

    /// Entry at a leaf ordinal.
    pub fn entry_at(&self, ordinal: u64) -> Option<&Entry> {
        self.entries.get(ordinal as usize)
    }

    /// Ordinals that wrote `key`, most recent first.
    pub fn history(&self, key: &[u8]) -> Option<&[u64]> {
        self.hist.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> u64 {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commitment to every entry ever written.
    pub fn root_digest(&self) -> Vec<u8> {
        self.tree.root_digest()
    }

    /// The backing tree, for proof generation against older roots.
    pub fn tree(&self) -> &HistoryTree<Method> {
        &self.tree
    }

    /// Membership proof for the entry at `ordinal` against the current root.
    pub fn membership_proof(
        &self,
        ordinal: u64,
    ) -> Result<MembershipProof<Method>, MerkleTreeError> {
        self.tree.membership_proof(ordinal)
    }
}

impl<Method: HashMethod> Default for KvStore<Method> {
    fn default() -> Self {
        Self::new()
    }
}
