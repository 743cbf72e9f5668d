//! The consensus parameters for block and transaction verification.
//!
//! These parameters are fixed for the network; changing any of them forks
//! the node off the chain. Chain-level constants (the money range, the
//! maximum block size, the proof-of-work limit, and the lock-time
//! threshold) live in `bittern-chain`, next to the types they constrain.

use bittern_chain::{amount::COIN, block::Height, block::MAX_BLOCK_SIZE};

/// The maximum number of counted signature operations in a block.
pub const MAX_BLOCK_SIGOPS: usize = MAX_BLOCK_SIZE / 50;

/// The number of blocks a coinbase output must be buried under before it
/// may be spent.
pub const COINBASE_MATURITY: u32 = 100;

/// The intended spacing between blocks, in seconds.
pub const TARGET_SPACING: i64 = 10 * 60;

/// The intended duration of a retargeting interval, in seconds: two weeks.
pub const TARGET_TIMESPAN: i64 = 14 * 24 * 60 * 60;

/// The number of blocks between difficulty adjustments.
pub const RETARGETING_INTERVAL: u32 = (TARGET_TIMESPAN / TARGET_SPACING) as u32;

/// The number of blocks between block subsidy halvings.
pub const SUBSIDY_HALVING_INTERVAL: u32 = 210_000;

/// The block subsidy before the first halving.
pub const BASE_BLOCK_SUBSIDY: u64 = 50 * COIN;

/// The header timestamp at which pay-to-script-hash evaluation activates
/// for block connection, as a Unix epoch time: 2012-04-01 00:00:00 UTC.
pub const BIP16_SWITCHOVER_TIMESTAMP: i64 = 1_333_238_400;

/// The height by which every header timestamp is past
/// [`BIP16_SWITCHOVER_TIMESTAMP`].
///
/// Blocks below this height never evaluate pay-to-script-hash scripts.
/// (Block 170060 contains an invalid pay-to-script-hash transaction from
/// before the switchover date.)
pub const BIP16_SWITCHOVER_HEIGHT: Height = Height(173_805);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_parameter_values() {
        assert_eq!(MAX_BLOCK_SIGOPS, 20_000);
        assert_eq!(RETARGETING_INTERVAL, 2016);
        assert_eq!(BASE_BLOCK_SUBSIDY, 5_000_000_000);
    }
}
