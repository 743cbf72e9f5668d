//! The Merkle tree of transactions.
#![allow(clippy::unit_arg)]

use std::{fmt, io::Write};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::serialization::sha256d;
use crate::transaction::{self, Transaction};

/// The root of the transaction Merkle tree, binding the block header to the
/// transactions in the block.
///
/// Note that because of a flaw in the tree's design, the `merkle_root` does
/// not always precisely bind the contents of the block (CVE-2012-2459). It
/// is sometimes possible for an attacker to create multiple distinct sets of
/// transactions with the same Merkle root, although only one set will be
/// valid.
///
/// # Malleability
///
/// If the number of hashes in the list at a given time is odd, the last one
/// is duplicated before computing the next level (which is unusual in Merkle
/// trees). This results in certain sequences of transactions leading to the
/// same merkle root. For example, the transaction lists `[1,2,3,4,5,6]` and
/// `[1,2,3,4,5,6,5,6]` (where 5 and 6 are repeated) result in the same root,
/// because the hash of both `(F)` and `(F,F)` is the same.
///
/// This duplication tolerance is accepted here; block validation's
/// duplicate-transaction check guards against the lists it can confuse.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Root(pub [u8; 32]);

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.debug_tuple("merkle::Root")
            .field(&hex::encode(reversed))
            .finish()
    }
}

impl std::str::FromStr for Root {
    type Err = crate::serialization::SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 32];
        if hex::decode_to_slice(s, &mut bytes[..]).is_err() {
            Err(crate::serialization::SerializationError::Parse(
                "hex decoding error",
            ))
        } else {
            bytes.reverse();
            Ok(Root(bytes))
        }
    }
}

fn hash(h1: &[u8; 32], h2: &[u8; 32]) -> [u8; 32] {
    let mut w = sha256d::Writer::default();
    w.write_all(h1).unwrap();
    w.write_all(h2).unwrap();
    w.finish()
}

impl<T> std::iter::FromIterator<T> for Root
where
    T: std::convert::AsRef<Transaction>,
{
    fn from_iter<I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        transactions
            .into_iter()
            .map(|tx| tx.as_ref().hash())
            .collect()
    }
}

impl std::iter::FromIterator<transaction::Hash> for Root {
    /// # Panics
    ///
    /// When there are no transactions in the iterator. This is impossible
    /// for valid blocks, where the first transaction is the coinbase
    /// transaction.
    fn from_iter<I>(hashes: I) -> Self
    where
        I: IntoIterator<Item = transaction::Hash>,
    {
        let mut hashes = hashes.into_iter().map(|hash| hash.0).collect::<Vec<_>>();

        while hashes.len() > 1 {
            hashes = hashes
                .chunks(2)
                .map(|chunk| match chunk {
                    [h1, h2] => hash(h1, h2),
                    [h1] => hash(h1, h1),
                    _ => unreachable!("chunks(2)"),
                })
                .collect();
        }

        Self(hashes[0])
    }
}
