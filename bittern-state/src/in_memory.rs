//! An in-memory implementation of the chain state interfaces.
//!
//! [`Chain`] answers the asynchronous oracle [`Request`]s and implements the
//! synchronous [`ChainView`], backed by shared immutable indexes. Cloning a
//! `Chain` is cheap, and clones taken before a [`commit`](Chain::commit) see
//! the chain as it was: a clone is a frozen snapshot.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use chrono::{DateTime, TimeZone, Utc};
use futures::future::FutureExt;
use tower::Service;

use bittern_chain::{
    block::{self, Block},
    transaction::{self, Transaction},
    transparent,
    work::difficulty::CompactDifficulty,
};

use crate::{BoxError, ChainView, Request, Response};

/// An in-memory index of the best chain.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    inner: Arc<Inner>,
}

#[derive(Clone, Debug, Default)]
struct Inner {
    blocks: BTreeMap<block::Height, Arc<Block>>,
    transactions: HashMap<transaction::Hash, (Arc<Transaction>, block::Height)>,
    spends: HashMap<transparent::OutPoint, transaction::Hash>,
}

impl Chain {
    /// Create an empty chain index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `block` to the chain at `height`, indexing its transactions
    /// and the outputs they spend.
    ///
    /// # Panics
    ///
    /// If `height` does not extend the indexed chain. The first committed
    /// block may use any height, so tests can index a chain suffix.
    pub fn commit(&mut self, height: block::Height, block: Arc<Block>) {
        let inner = Arc::make_mut(&mut self.inner);

        if let Some((tip_height, _)) = inner.blocks.iter().next_back() {
            assert_eq!(
                height.0,
                tip_height.0 + 1,
                "committed blocks must extend the chain tip"
            );
        }

        for tx in &block.transactions {
            let tx_hash = tx.hash();
            inner.transactions.insert(tx_hash, (tx.clone(), height));

            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    inner.spends.insert(input.outpoint, tx_hash);
                }
            }
        }

        inner.blocks.insert(height, block);
        tracing::trace!(?height, "committed block to in-memory chain");
    }

    /// The current tip, if the chain is not empty.
    pub fn tip(&self) -> Option<(block::Height, block::Hash)> {
        self.inner
            .blocks
            .iter()
            .next_back()
            .map(|(height, block)| (*height, block.hash()))
    }

    fn block_at(&self, height: block::Height) -> Option<&Arc<Block>> {
        self.inner.blocks.get(&height)
    }
}

impl Service<Request> for Chain {
    type Response = Response;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let response = match req {
            Request::Tip => Response::Tip(self.tip()),
            Request::Transaction(hash) => Response::Transaction(
                self.inner
                    .transactions
                    .get(&hash)
                    .map(|(tx, _height)| tx.clone()),
            ),
            Request::TransactionHeight(hash) => Response::TransactionHeight(
                self.inner
                    .transactions
                    .get(&hash)
                    .map(|(_tx, height)| *height),
            ),
            Request::Spend(outpoint) => {
                Response::Spend(self.inner.spends.get(&outpoint).copied())
            }
        };

        futures::future::ready(Ok(response)).boxed()
    }
}

impl ChainView for Chain {
    fn previous_block_bits(&self) -> CompactDifficulty {
        let (_, block) = self
            .inner
            .blocks
            .iter()
            .next_back()
            .expect("difficulty is only queried on a non-empty view");
        block.header.difficulty_threshold
    }

    fn actual_timespan(&self, interval: u32) -> i64 {
        let (tip_height, tip_block) = self
            .inner
            .blocks
            .iter()
            .next_back()
            .expect("timespans are only queried on a non-empty view");

        let first_height = block::Height(
            tip_height
                .0
                .checked_add(1)
                .and_then(|next| next.checked_sub(interval))
                .expect("timespans are only queried when the interval exists"),
        );
        let first_block = self
            .block_at(first_height)
            .expect("timespans are only queried when the interval is indexed");

        (tip_block.header.time - first_block.header.time).num_seconds()
    }

    fn median_time_past(&self) -> DateTime<Utc> {
        let mut times: Vec<DateTime<Utc>> = self
            .inner
            .blocks
            .iter()
            .rev()
            .take(11)
            .map(|(_, block)| block.header.time)
            .collect();

        if times.is_empty() {
            // An empty view is only consulted for the block at height 0,
            // whose timestamp is always past the epoch.
            return Utc.timestamp_opt(0, 0).unwrap();
        }

        times.sort_unstable();
        times[times.len() / 2]
    }

    fn transaction_exists(&self, hash: &transaction::Hash) -> bool {
        self.inner.transactions.contains_key(hash)
    }

    fn transaction(
        &self,
        hash: &transaction::Hash,
    ) -> Option<(Arc<Transaction>, block::Height)> {
        self.inner.transactions.get(hash).cloned()
    }

    fn is_output_spent(&self, outpoint: &transparent::OutPoint) -> bool {
        self.inner.spends.contains_key(outpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use tower::ServiceExt;

    use bittern_chain::block::{merkle, Header};

    fn coinbase(height_tag: u8) -> Arc<Transaction> {
        Arc::new(Transaction {
            version: 1,
            inputs: vec![transparent::Input {
                outpoint: transparent::OutPoint::NULL,
                unlock_script: transparent::Script::new(&[height_tag, 0x00]),
                sequence: u32::MAX,
            }],
            outputs: vec![transparent::Output {
                value: 50 * 100_000_000,
                lock_script: transparent::Script::new(&[0x51]),
            }],
            lock_time: 0,
        })
    }

    fn block_at(height: u32, time_offset: i64) -> Arc<Block> {
        let transactions = vec![coinbase(height as u8)];
        Arc::new(Block {
            header: Header {
                version: 1,
                previous_block_hash: block::Hash([height as u8; 32]),
                merkle_root: merkle::Root([0; 32]),
                time: Utc.timestamp_opt(1_300_000_000 + time_offset, 0).unwrap(),
                difficulty_threshold: CompactDifficulty::from_bits(0x1d00ffff),
                nonce: 0,
            },
            transactions,
        })
    }

    fn chain_of(heights: std::ops::Range<u32>) -> Chain {
        let mut chain = Chain::new();
        for height in heights {
            chain.commit(block::Height(height), block_at(height, height as i64 * 600));
        }
        chain
    }

    #[tokio::test]
    async fn answers_tip_and_transaction_queries() {
        let chain = chain_of(0..3);
        let (tip_height, _) = chain.tip().unwrap();
        assert_eq!(tip_height, block::Height(2));

        let response = chain.clone().oneshot(Request::Tip).await.unwrap();
        assert!(matches!(response, Response::Tip(Some((height, _))) if height == tip_height));

        let known = block_at(1, 600).transactions[0].hash();
        let response = chain
            .clone()
            .oneshot(Request::TransactionHeight(known))
            .await
            .unwrap();
        assert_eq!(
            response,
            Response::TransactionHeight(Some(block::Height(1)))
        );

        let unknown = transaction::Hash([0xee; 32]);
        let response = chain
            .clone()
            .oneshot(Request::Transaction(unknown))
            .await
            .unwrap();
        assert_eq!(response, Response::Transaction(None));
    }

    #[tokio::test]
    async fn records_spends_of_committed_inputs() {
        let mut chain = chain_of(0..2);

        let parent_hash = block_at(0, 0).transactions[0].hash();
        let outpoint = transparent::OutPoint {
            hash: parent_hash,
            index: 0,
        };

        let spender = Arc::new(Transaction {
            version: 1,
            inputs: vec![transparent::Input {
                outpoint,
                unlock_script: transparent::Script::new(&[]),
                sequence: u32::MAX,
            }],
            outputs: vec![transparent::Output {
                value: 1,
                lock_script: transparent::Script::new(&[]),
            }],
            lock_time: 0,
        });
        let mut block = (*block_at(2, 1200)).clone();
        block.transactions.push(spender.clone());
        chain.commit(block::Height(2), Arc::new(block));

        assert!(chain.is_output_spent(&outpoint));
        let response = chain.clone().oneshot(Request::Spend(outpoint)).await.unwrap();
        assert_eq!(response, Response::Spend(Some(spender.hash())));
    }

    #[test]
    fn view_reports_timespan_and_median() {
        // Heights 0..=10, spaced 600 seconds apart.
        let chain = chain_of(0..11);

        // An interval of 5 spans from the block at height 6 to the tip at
        // height 10: 4 spacings.
        assert_eq!(chain.actual_timespan(5), 4 * 600);

        // With 11 evenly spaced blocks, the median is the 6th block's time.
        let median = chain.median_time_past();
        assert_eq!(
            median,
            Utc.timestamp_opt(1_300_000_000 + 5 * 600, 0).unwrap()
        );
    }

    #[test]
    fn snapshots_are_frozen() {
        let mut chain = chain_of(0..2);
        let snapshot = chain.clone();

        chain.commit(block::Height(2), block_at(2, 1200));

        assert_eq!(chain.tip().unwrap().0, block::Height(2));
        assert_eq!(snapshot.tip().unwrap().0, block::Height(1));
    }
}
