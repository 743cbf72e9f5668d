//! The hard-coded checkpoint table for mainnet.


use std::{
    collections::{BTreeMap, HashSet},
    str::FromStr,
};

use bittern_chain::block;

use crate::BoxError;

/// The hard-coded checkpoints for mainnet.
///
/// The heights and hashes are fixed by the protocol; they cover the
/// canonical chain through the covered heights and must be carried
/// verbatim.
const MAINNET_CHECKPOINTS: &str = include_str!("main-checkpoints.txt");

/// A list of block height and hash checkpoints.
///
/// Checkpoints are chosen to avoid forks or chain reorganizations, which
/// only happen in the last few hundred blocks in the chain.
///
/// This is actually a bijective map, but since it is read-only, we use a
/// BTreeMap, and do the value uniqueness check on initialisation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckpointList(BTreeMap<block::Height, block::Hash>);

impl FromStr for CheckpointList {
    type Err = BoxError;

    /// Parse a string into a CheckpointList.
    ///
    /// Each line has one checkpoint, consisting of a `block::Height` and
    /// `block::Hash`, separated by a single space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut checkpoint_list: Vec<(block::Height, block::Hash)> = Vec::new();

        for checkpoint in s.lines() {
            let fields = checkpoint.split(' ').collect::<Vec<_>>();
            if let [height, hash] = fields[..] {
                checkpoint_list.push((block::Height(height.parse()?), hash.parse()?));
            } else {
                Err(format!("invalid checkpoint format: expected 2 space-separated fields but found {}: '{checkpoint}'", fields.len()))?;
            }
        }

        CheckpointList::from_list(checkpoint_list)
    }
}

impl CheckpointList {
    /// Returns the hard-coded checkpoint list for mainnet.
    pub fn hard_coded() -> Self {
        MAINNET_CHECKPOINTS
            .parse()
            .expect("hard-coded checkpoint list parses and validates")
    }

    /// Create a new checkpoint list from `checkpoint_list`.
    fn from_list(
        checkpoint_list: impl IntoIterator<Item = (block::Height, block::Hash)>,
    ) -> Result<Self, BoxError> {
        // BTreeMap silently ignores duplicates, so we count the checkpoints
        // before adding them to the map
        let original_checkpoints: Vec<(block::Height, block::Hash)> =
            checkpoint_list.into_iter().collect();
        let original_len = original_checkpoints.len();

        let checkpoints: BTreeMap<block::Height, block::Hash> =
            original_checkpoints.into_iter().collect();

        // Check that the list has no duplicate heights
        if checkpoints.len() != original_len {
            Err("checkpoint heights must be unique")?;
        }

        // Check that the list has no duplicate hashes
        let hashes: HashSet<&block::Hash> = checkpoints.values().collect();
        if hashes.len() != original_len {
            Err("checkpoint hashes must be unique")?;
        }

        if checkpoints.is_empty() {
            Err("checkpoint lists must not be empty")?;
        }
        if checkpoints
            .keys()
            .any(|height| *height > block::Height::MAX)
        {
            Err("checkpoint heights must be valid block heights")?;
        }

        Ok(CheckpointList(checkpoints))
    }

    /// Is there a checkpoint at `height`?
    pub fn contains(&self, height: block::Height) -> bool {
        self.0.contains_key(&height)
    }

    /// Returns the hash corresponding to the checkpoint at `height`, or
    /// None if there is no checkpoint at that height.
    pub fn hash(&self, height: block::Height) -> Option<block::Hash> {
        self.0.get(&height).copied()
    }

    /// Returns the largest checkpointed height.
    pub fn max_height(&self) -> block::Height {
        *self
            .0
            .keys()
            .next_back()
            .expect("checkpoint lists are never empty")
    }
}
