//! Monetary amounts.
//!
//! Values are `u64` satoshi counts. The consensus rules bound individual
//! output values and several running sums by [`MAX_MONEY`]; those comparisons
//! are performed explicitly at each rule site, so this module only carries
//! the constants.

/// The number of satoshis in one coin.
pub const COIN: u64 = 100_000_000;

/// The maximum number of satoshis that can ever exist.
///
/// No single output value, output-value sum, input-value sum, or fee total
/// may exceed this bound.
pub const MAX_MONEY: u64 = 21_000_000 * COIN;
