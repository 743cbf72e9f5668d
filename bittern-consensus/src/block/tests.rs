//! Tests for block verification.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, TimeZone, Utc};

use bittern_chain::{
    amount::COIN,
    block::{self, merkle, Block, Header},
    transaction::{self, Transaction},
    transparent,
    work::difficulty::{CompactDifficulty, ExpandedDifficulty},
};
use bittern_state::{in_memory, ChainView};

use crate::{
    error::{BlockError, TransactionError},
    parameters::{RETARGETING_INTERVAL, TARGET_TIMESPAN},
    script::ScriptEngine,
};

use super::*;

/// A script engine that authorizes everything.
struct AcceptAll;

impl ScriptEngine for AcceptAll {
    fn run(&self, _: &transparent::Script, _: &transparent::Script, _: &Transaction, _: usize, _: bool) -> bool {
        true
    }
}

/// A script engine that authorizes nothing.
struct RejectAll;

impl ScriptEngine for RejectAll {
    fn run(&self, _: &transparent::Script, _: &transparent::Script, _: &Transaction, _: usize, _: bool) -> bool {
        false
    }
}

/// A script engine that records the pay-to-script-hash flags it is run
/// with.
#[derive(Default)]
struct FlagProbe {
    flags: Mutex<Vec<bool>>,
}

impl ScriptEngine for FlagProbe {
    fn run(
        &self,
        _: &transparent::Script,
        _: &transparent::Script,
        _: &Transaction,
        _: usize,
        bip16_active: bool,
    ) -> bool {
        self.flags.lock().unwrap().push(bip16_active);
        true
    }
}

/// A hand-settable chain view.
#[derive(Clone)]
struct FakeView {
    bits: CompactDifficulty,
    timespan: i64,
    median_time_past: DateTime<Utc>,
    transactions: HashMap<transaction::Hash, (Arc<Transaction>, block::Height)>,
    spent: HashSet<transparent::OutPoint>,
}

impl Default for FakeView {
    fn default() -> Self {
        FakeView {
            bits: CompactDifficulty::from_bits(0x1d00ffff),
            timespan: TARGET_TIMESPAN,
            median_time_past: Utc.timestamp_opt(0, 0).unwrap(),
            transactions: HashMap::new(),
            spent: HashSet::new(),
        }
    }
}

impl FakeView {
    fn with_transaction(mut self, tx: Arc<Transaction>, height: block::Height) -> Self {
        self.transactions.insert(tx.hash(), (tx, height));
        self
    }

    fn with_spent(mut self, outpoint: transparent::OutPoint) -> Self {
        self.spent.insert(outpoint);
        self
    }
}

impl ChainView for FakeView {
    fn previous_block_bits(&self) -> CompactDifficulty {
        self.bits
    }

    fn actual_timespan(&self, _interval: u32) -> i64 {
        self.timespan
    }

    fn median_time_past(&self) -> DateTime<Utc> {
        self.median_time_past
    }

    fn transaction_exists(&self, hash: &transaction::Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    fn transaction(
        &self,
        hash: &transaction::Hash,
    ) -> Option<(Arc<Transaction>, block::Height)> {
        self.transactions.get(hash).cloned()
    }

    fn is_output_spent(&self, outpoint: &transparent::OutPoint) -> bool {
        self.spent.contains(outpoint)
    }
}

fn coinbase(tag: &[u8], value: u64) -> Arc<Transaction> {
    assert!(tag.len() >= 2 && tag.len() <= 100);
    Arc::new(Transaction {
        version: 1,
        inputs: vec![transparent::Input {
            outpoint: transparent::OutPoint::NULL,
            unlock_script: transparent::Script::new(tag),
            sequence: u32::MAX,
        }],
        outputs: vec![transparent::Output {
            value,
            lock_script: transparent::Script::new(&[0x51]),
        }],
        lock_time: 0,
    })
}

fn spend_of(outpoint: transparent::OutPoint, value: u64) -> Arc<Transaction> {
    Arc::new(Transaction {
        version: 1,
        inputs: vec![transparent::Input {
            outpoint,
            unlock_script: transparent::Script::new(&[0x51]),
            sequence: u32::MAX,
        }],
        outputs: vec![transparent::Output {
            value,
            lock_script: transparent::Script::new(&[0x51]),
        }],
        lock_time: 0,
    })
}

fn first_output(tx: &Arc<Transaction>) -> transparent::OutPoint {
    transparent::OutPoint {
        hash: tx.hash(),
        index: 0,
    }
}

fn block_with(transactions: Vec<Arc<Transaction>>, time: DateTime<Utc>) -> Block {
    let merkle_root: merkle::Root = transactions.iter().collect();
    Block {
        header: Header {
            version: 1,
            previous_block_hash: block::Hash([0; 32]),
            merkle_root,
            time,
            difficulty_threshold: CompactDifficulty::from_bits(0x1d00ffff),
            nonce: 0,
        },
        transactions,
    }
}

/// A timestamp safely before the pay-to-script-hash switchover.
fn early_2011() -> DateTime<Utc> {
    Utc.timestamp_opt(1_300_000_000, 0).unwrap()
}

/// The mainnet genesis block, constructed field by field.
fn genesis_block() -> Block {
    let unlock_script = hex::decode(
        "04ffff001d0104455468652054696d65732030332f4a616e2f323030392043686\
         16e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f\
         757420666f722062616e6b73",
    )
    .expect("hard-coded script parses");
    let lock_script = hex::decode(
        "4104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61d\
         eb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d\
         5fac",
    )
    .expect("hard-coded script parses");

    let coinbase = Arc::new(Transaction {
        version: 1,
        inputs: vec![transparent::Input {
            outpoint: transparent::OutPoint::NULL,
            unlock_script: transparent::Script::new(&unlock_script),
            sequence: u32::MAX,
        }],
        outputs: vec![transparent::Output {
            value: 50 * COIN,
            lock_script: transparent::Script::new(&lock_script),
        }],
        lock_time: 0,
    });

    Block {
        header: Header {
            version: 1,
            previous_block_hash: block::Hash([0; 32]),
            merkle_root: "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
                .parse()
                .expect("hard-coded root parses"),
            time: Utc.timestamp_opt(1_231_006_505, 0).unwrap(),
            difficulty_threshold: CompactDifficulty::from_bits(0x1d00ffff),
            nonce: 2_083_236_893,
        },
        transactions: vec![coinbase],
    }
}

#[test]
fn genesis_block_verifies() {
    let genesis = genesis_block();
    let view = in_memory::Chain::new();
    let engine = AcceptAll;
    let verifier = BlockVerifier::new(block::Height(0), &genesis, &view, &engine);

    assert_eq!(verifier.verify_at(genesis.header.time), Ok(()));
    assert_eq!(
        genesis.hash().to_string(),
        "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
    );
}

#[test]
fn future_timestamps_are_rejected() {
    let genesis = genesis_block();
    let view = in_memory::Chain::new();
    let engine = AcceptAll;
    let verifier = BlockVerifier::new(block::Height(0), &genesis, &view, &engine);

    // Exactly two hours of clock skew is tolerated.
    let now = genesis.header.time - chrono::Duration::seconds(7200);
    assert_eq!(verifier.verify_at(now), Ok(()));

    // One second more is not.
    let now = genesis.header.time - chrono::Duration::seconds(7201);
    assert_eq!(verifier.verify_at(now), Err(BlockError::TimeTooFarAhead));
}

#[test]
fn size_limits_are_enforced() {
    // No transactions at all.
    let empty = Block {
        header: genesis_block().header,
        transactions: vec![],
    };
    assert_eq!(check::size_is_valid(&empty), Err(BlockError::SizeLimit));

    // A block serializing over the maximum size. The coinbase carries an
    // oversized lock script; the size rule fires before any script rule
    // could.
    let mut oversized_coinbase = (*coinbase(&[1, 0], 50 * COIN)).clone();
    oversized_coinbase.outputs[0].lock_script =
        transparent::Script::new(&vec![0u8; block::MAX_BLOCK_SIZE]);
    let oversized = block_with(vec![Arc::new(oversized_coinbase)], early_2011());
    assert_eq!(check::size_is_valid(&oversized), Err(BlockError::SizeLimit));

    // The genesis block is comfortably inside the limits.
    assert_eq!(check::size_is_valid(&genesis_block()), Ok(()));
}

#[test]
fn coinbase_must_be_first_and_only() {
    let cb = coinbase(&[1, 0], 50 * COIN);
    let spender = spend_of(first_output(&cb), 10);

    let missing = block_with(vec![spender.clone()], early_2011());
    assert_eq!(
        check::coinbase_is_first(&missing),
        Err(BlockError::CoinbasePosition)
    );

    let extra = block_with(
        vec![cb.clone(), coinbase(&[2, 0], 50 * COIN)],
        early_2011(),
    );
    assert_eq!(
        check::coinbase_is_first(&extra),
        Err(BlockError::CoinbaseAfterFirst)
    );

    let valid = block_with(vec![cb, spender], early_2011());
    assert_eq!(check::coinbase_is_first(&valid), Ok(()));
}

#[test]
fn duplicate_transactions_are_rejected() {
    let cb = coinbase(&[1, 0], 50 * COIN);
    let spender = spend_of(first_output(&cb), 10);

    let duplicated = block_with(vec![cb.clone(), spender.clone(), spender], early_2011());
    assert_eq!(
        check::transactions_are_valid_and_unique(&duplicated),
        Err(BlockError::DuplicateTransaction)
    );

    // Transaction-level failures bubble out of the same check.
    let bad_tx = Arc::new(Transaction {
        version: 1,
        inputs: vec![],
        outputs: vec![],
        lock_time: 0,
    });
    let invalid = block_with(vec![cb, bad_tx], early_2011());
    assert_eq!(
        check::transactions_are_valid_and_unique(&invalid),
        Err(BlockError::Transaction(TransactionError::Empty))
    );
}

#[test]
fn sigop_heavy_blocks_are_rejected() {
    // One over the limit: 20_001 bare OP_CHECKSIGs in the coinbase's lock
    // script, counted with the legacy (inaccurate) rules.
    let mut cb = (*coinbase(&[1, 0], 50 * COIN)).clone();
    cb.outputs[0].lock_script =
        transparent::Script::new(&vec![0xac; crate::parameters::MAX_BLOCK_SIGOPS + 1]);
    let heavy = block_with(vec![Arc::new(cb)], early_2011());

    assert_eq!(
        check::sigops_are_in_limit(&heavy),
        Err(BlockError::TooManySigops)
    );
    assert_eq!(check::sigops_are_in_limit(&genesis_block()), Ok(()));
}

#[test]
fn merkle_mismatches_are_rejected() {
    let mut genesis = genesis_block();
    let expected = genesis.header.merkle_root;
    genesis.header.merkle_root = merkle::Root([0x42; 32]);

    match check::merkle_root_is_valid(&genesis) {
        Err(BlockError::BadMerkleRoot { actual, expected: claimed }) => {
            assert_eq!(actual, expected);
            assert_eq!(claimed, merkle::Root([0x42; 32]));
        }
        other => panic!("expected a merkle root mismatch, got {other:?}"),
    }
}

#[test]
fn proof_of_work_is_enforced() {
    let genesis = genesis_block();
    assert_eq!(
        check::difficulty_is_valid(&genesis.header, &genesis.hash()),
        Ok(())
    );

    // Changing the nonce invalidates the hash.
    let mut tweaked = genesis.clone();
    tweaked.header.nonce += 1;
    assert_eq!(
        check::difficulty_is_valid(&tweaked.header, &tweaked.hash()),
        Err(BlockError::InvalidProofOfWork)
    );

    // A negative threshold never validates.
    let mut negative = genesis.clone();
    negative.header.difficulty_threshold = CompactDifficulty::from_bits(0x1d80ffff);
    assert_eq!(
        check::difficulty_is_valid(&negative.header, &negative.hash()),
        Err(BlockError::InvalidProofOfWork)
    );

    // A threshold easier than the proof-of-work limit never validates,
    // even for a hash below it.
    let mut too_easy = genesis.clone();
    too_easy.header.difficulty_threshold = CompactDifficulty::from_bits(0x1e00ffff);
    assert_eq!(
        check::difficulty_is_valid(&too_easy.header, &too_easy.hash()),
        Err(BlockError::InvalidProofOfWork)
    );
}

#[test]
fn work_required_at_genesis_is_the_limit() {
    let view = FakeView::default();
    assert_eq!(
        check::work_required(block::Height(0), &view),
        ExpandedDifficulty::target_difficulty_limit().to_compact()
    );
}

#[test]
fn work_required_between_intervals_is_inherited() {
    let view = FakeView {
        bits: CompactDifficulty::from_bits(0x1c00ffff),
        ..FakeView::default()
    };

    assert_eq!(
        check::work_required(block::Height(1), &view),
        CompactDifficulty::from_bits(0x1c00ffff)
    );
    assert_eq!(
        check::work_required(block::Height(RETARGETING_INTERVAL + 5), &view),
        CompactDifficulty::from_bits(0x1c00ffff)
    );
}

#[test]
fn work_required_retargets_by_actual_timespan() {
    let previous = CompactDifficulty::from_bits(0x1c00ffff);
    let previous_target = previous.to_expanded().unwrap();
    let boundary = block::Height(RETARGETING_INTERVAL);

    // An interval taking exactly the intended time leaves the target
    // unchanged.
    let view = FakeView {
        bits: previous,
        timespan: TARGET_TIMESPAN,
        ..FakeView::default()
    };
    assert_eq!(check::work_required(boundary, &view), previous);

    // Twice as slow: the target doubles (difficulty halves).
    let view = FakeView {
        bits: previous,
        timespan: 2 * TARGET_TIMESPAN,
        ..FakeView::default()
    };
    assert_eq!(
        check::work_required(boundary, &view),
        (previous_target * 2u64).to_compact()
    );
}

#[test]
fn work_required_clamps_the_timespan() {
    let previous = CompactDifficulty::from_bits(0x1c00ffff);
    let previous_target = previous.to_expanded().unwrap();
    let boundary = block::Height(RETARGETING_INTERVAL);

    // An eighth of the intended time clamps to a quarter: the new target
    // is a quarter of the previous one.
    let view = FakeView {
        bits: previous,
        timespan: TARGET_TIMESPAN / 8,
        ..FakeView::default()
    };
    let quartered = check::work_required(boundary, &view);
    assert_eq!(quartered, (previous_target / 4u64).to_compact());
    assert_eq!(quartered, CompactDifficulty::from_bits(0x1b3fffc0));

    // Eight times the intended time clamps to four times the target.
    let view = FakeView {
        bits: previous,
        timespan: 8 * TARGET_TIMESPAN,
        ..FakeView::default()
    };
    assert_eq!(
        check::work_required(boundary, &view),
        (previous_target * 4u64).to_compact()
    );
}

proptest::proptest! {
    /// No interval duration, however absurd, retargets past the
    /// proof-of-work limit or below a quarter of the previous target.
    #[test]
    fn work_required_is_always_bounded(timespan in proptest::prelude::any::<i64>()) {
        let previous = CompactDifficulty::from_bits(0x1c00ffff);
        let previous_target = previous.to_expanded().unwrap();
        let view = FakeView {
            bits: previous,
            timespan,
            ..FakeView::default()
        };

        let required = check::work_required(block::Height(RETARGETING_INTERVAL), &view)
            .to_expanded()
            .unwrap();

        proptest::prop_assert!(required >= previous_target / 4u64);
        proptest::prop_assert!(required <= ExpandedDifficulty::target_difficulty_limit());
    }
}

#[test]
fn work_required_caps_at_the_limit() {
    // The previous target is already the easiest allowed; slowing down
    // cannot ease it further.
    let view = FakeView {
        bits: ExpandedDifficulty::target_difficulty_limit().to_compact(),
        timespan: 4 * TARGET_TIMESPAN,
        ..FakeView::default()
    };
    assert_eq!(
        check::work_required(block::Height(RETARGETING_INTERVAL), &view),
        ExpandedDifficulty::target_difficulty_limit().to_compact()
    );
}

#[test]
fn accepted_blocks_declare_the_required_difficulty() {
    let cb = coinbase(&[1, 0], 50 * COIN);
    let block = block_with(vec![cb], early_2011());
    let engine = AcceptAll;

    // The view says the chain requires harder work than the header
    // declares.
    let view = FakeView {
        bits: CompactDifficulty::from_bits(0x1c00ffff),
        ..FakeView::default()
    };
    let verifier = BlockVerifier::new(block::Height(5), &block, &view, &engine);
    assert_eq!(
        verifier.accept_block(&block.hash()),
        Err(BlockError::WrongDifficulty)
    );
}

#[test]
fn accepted_blocks_are_past_the_median_time() {
    let cb = coinbase(&[1, 0], 50 * COIN);
    let block = block_with(vec![cb], early_2011());
    let engine = AcceptAll;

    // The block's own timestamp is not strictly later than the median.
    let view = FakeView {
        median_time_past: block.header.time,
        ..FakeView::default()
    };
    let verifier = BlockVerifier::new(block::Height(5), &block, &view, &engine);
    assert_eq!(
        verifier.accept_block(&block.hash()),
        Err(BlockError::TimeTooEarly)
    );

    // One second of progress is enough.
    let view = FakeView {
        median_time_past: block.header.time - chrono::Duration::seconds(1),
        ..FakeView::default()
    };
    let verifier = BlockVerifier::new(block::Height(5), &block, &view, &engine);
    assert_eq!(verifier.accept_block(&block.hash()), Ok(()));
}

#[test]
fn accepted_blocks_contain_only_final_transactions() {
    let cb = coinbase(&[1, 0], 50 * COIN);
    let mut pending = (*spend_of(first_output(&cb), 10)).clone();
    pending.lock_time = 1_000_000;
    pending.inputs[0].sequence = 0;
    let block = block_with(vec![cb, Arc::new(pending)], early_2011());
    let engine = AcceptAll;

    let view = FakeView::default();
    let verifier = BlockVerifier::new(block::Height(5), &block, &view, &engine);
    assert_eq!(
        verifier.accept_block(&block.hash()),
        Err(BlockError::NonFinalTransaction)
    );
}

#[test]
fn checkpointed_heights_pin_the_block_hash() {
    // A synthetic block can never hash to the canonical checkpoint value.
    let cb = coinbase(&[1, 0], 50 * COIN);
    let block = block_with(vec![cb], early_2011());
    let engine = AcceptAll;
    let view = FakeView::default();

    let verifier = BlockVerifier::new(block::Height(11111), &block, &view, &engine);
    assert_eq!(
        verifier.accept_block(&block.hash()),
        Err(BlockError::CheckpointMismatch)
    );

    // One height over, no checkpoint applies.
    let verifier = BlockVerifier::new(block::Height(11112), &block, &view, &engine);
    assert_eq!(verifier.accept_block(&block.hash()), Ok(()));
}

#[test]
fn coinbase_claims_are_bounded_by_subsidy() {
    let engine = AcceptAll;
    let view = FakeView::default();

    // At the first halving the subsidy is 25 coins; claiming a satoshi
    // more fails.
    let greedy = block_with(vec![coinbase(&[1, 0], 25 * COIN + 1)], early_2011());
    let verifier = BlockVerifier::new(block::Height(210_000), &greedy, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::CoinbaseTooLarge));

    let exact = block_with(vec![coinbase(&[1, 0], 25 * COIN)], early_2011());
    let verifier = BlockVerifier::new(block::Height(210_000), &exact, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));
}

#[test]
fn fees_fund_the_coinbase() {
    let engine = AcceptAll;

    let parent = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([3; 32]),
            index: 0,
        },
        10_000,
    );
    let view = FakeView::default().with_transaction(parent.clone(), block::Height(50));

    // The spender pays a 1_000 satoshi fee, which the coinbase may claim.
    let spender = spend_of(first_output(&parent), 9_000);
    let funded = block_with(
        vec![coinbase(&[1, 0], 50 * COIN + 1_000), spender.clone()],
        early_2011(),
    );
    let verifier = BlockVerifier::new(block::Height(100), &funded, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));

    // One satoshi beyond subsidy plus fees fails.
    let over = block_with(
        vec![coinbase(&[1, 0], 50 * COIN + 1_001), spender],
        early_2011(),
    );
    let verifier = BlockVerifier::new(block::Height(100), &over, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::CoinbaseTooLarge));
}

#[test]
fn coinbase_spends_must_mature() {
    let engine = AcceptAll;

    let parent = coinbase(&[9, 9], 50 * COIN);
    let parent_height = block::Height(1_000);
    let view = FakeView::default().with_transaction(parent.clone(), parent_height);

    let spender = spend_of(first_output(&parent), 10);
    let block = block_with(
        vec![coinbase(&[1, 0], 50 * COIN), spender],
        early_2011(),
    );

    // 99 blocks of depth difference is one short.
    let verifier = BlockVerifier::new(block::Height(1_099), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::InvalidInputs));

    // 100 blocks of depth difference spends.
    let verifier = BlockVerifier::new(block::Height(1_100), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));
}

#[test]
fn double_spends_within_a_block_are_rejected() {
    let engine = AcceptAll;

    let parent = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([3; 32]),
            index: 0,
        },
        10_000,
    );
    let view = FakeView::default().with_transaction(parent.clone(), block::Height(50));

    let spender_a = spend_of(first_output(&parent), 4_000);
    let spender_b = spend_of(first_output(&parent), 3_000);
    // Distinct hashes, same outpoint.
    assert_ne!(spender_a.hash(), spender_b.hash());

    let block = block_with(
        vec![coinbase(&[1, 0], 50 * COIN), spender_a, spender_b],
        early_2011(),
    );
    let verifier = BlockVerifier::new(block::Height(100), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::InvalidInputs));
}

#[test]
fn chain_spent_outputs_cannot_be_respent() {
    let engine = AcceptAll;

    let parent = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([3; 32]),
            index: 0,
        },
        10_000,
    );
    let view = FakeView::default()
        .with_transaction(parent.clone(), block::Height(50))
        .with_spent(first_output(&parent));

    let spender = spend_of(first_output(&parent), 4_000);
    let block = block_with(vec![coinbase(&[1, 0], 50 * COIN), spender], early_2011());
    let verifier = BlockVerifier::new(block::Height(100), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::InvalidInputs));
}

#[test]
fn unknown_parents_fail_connection() {
    let engine = AcceptAll;
    let view = FakeView::default();

    let spender = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([0xaa; 32]),
            index: 0,
        },
        4_000,
    );
    let block = block_with(vec![coinbase(&[1, 0], 50 * COIN), spender], early_2011());
    let verifier = BlockVerifier::new(block::Height(100), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::InvalidInputs));
}

#[test]
fn failing_scripts_fail_connection() {
    let engine = RejectAll;

    let parent = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([3; 32]),
            index: 0,
        },
        10_000,
    );
    let view = FakeView::default().with_transaction(parent.clone(), block::Height(50));

    let spender = spend_of(first_output(&parent), 4_000);
    let block = block_with(vec![coinbase(&[1, 0], 50 * COIN), spender], early_2011());
    let verifier = BlockVerifier::new(block::Height(100), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::InvalidInputs));
}

#[test]
fn spending_more_than_consumed_is_rejected() {
    let engine = AcceptAll;

    let parent = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([3; 32]),
            index: 0,
        },
        10_000,
    );
    let view = FakeView::default().with_transaction(parent.clone(), block::Height(50));

    let overspender = spend_of(first_output(&parent), 10_001);
    let block = block_with(
        vec![coinbase(&[1, 0], 50 * COIN), overspender],
        early_2011(),
    );
    let verifier = BlockVerifier::new(block::Height(100), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::FeesOutOfRange));
}

#[test]
fn duplicate_hashes_with_unspent_outputs_are_rejected() {
    let engine = AcceptAll;

    // The block's own coinbase duplicates a confirmed transaction whose
    // output is still unspent.
    let cb = coinbase(&[1, 0], 50 * COIN);
    let view = FakeView::default().with_transaction(cb.clone(), block::Height(1_000));

    let block = block_with(vec![cb.clone()], early_2011());
    let verifier = BlockVerifier::new(block::Height(91_843), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Err(BlockError::DuplicateOrSpent));

    // The two historic heights predate the rule.
    let verifier = BlockVerifier::new(block::Height(91_842), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));
    let verifier = BlockVerifier::new(block::Height(91_880), &block, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));

    // Once every prior output is spent, the hash may be reused anywhere.
    let spent_view = view.with_spent(first_output(&cb));
    let verifier = BlockVerifier::new(block::Height(91_843), &block, &spent_view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));
}

#[test]
fn script_hash_evaluation_switches_on_by_timestamp() {
    let parent = spend_of(
        transparent::OutPoint {
            hash: transaction::Hash([3; 32]),
            index: 0,
        },
        10_000,
    );
    let view = FakeView::default().with_transaction(parent.clone(), block::Height(50));
    let spender = spend_of(first_output(&parent), 4_000);
    let coinbase_tx = coinbase(&[1, 0], 50 * COIN);

    // Before the switchover timestamp the engine runs with the flag off.
    let engine = FlagProbe::default();
    let before = block_with(vec![coinbase_tx.clone(), spender.clone()], early_2011());
    let verifier = BlockVerifier::new(block::Height(200_000), &before, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));
    assert_eq!(*engine.flags.lock().unwrap(), vec![false]);

    // At the switchover timestamp the flag turns on.
    let engine = FlagProbe::default();
    let switchover = Utc
        .timestamp_opt(crate::parameters::BIP16_SWITCHOVER_TIMESTAMP, 0)
        .unwrap();
    let after = block_with(vec![coinbase_tx, spender], switchover);
    let verifier = BlockVerifier::new(block::Height(200_000), &after, &view, &engine);
    assert_eq!(verifier.connect_block(), Ok(()));
    assert_eq!(*engine.flags.lock().unwrap(), vec![true]);
}
