//! Block subsidy: the new coin supply a block's coinbase may claim.

use bittern_chain::block::Height;

use crate::parameters::{BASE_BLOCK_SUBSIDY, SUBSIDY_HALVING_INTERVAL};

/// The number of halvings that have happened at `height`.
pub fn halvings(height: Height) -> u32 {
    height.0 / SUBSIDY_HALVING_INTERVAL
}

/// The block subsidy at `height`: the base subsidy halved once per
/// completed halving interval, reaching zero once the halvings exhaust the
/// base subsidy's bits.
pub fn block_subsidy(height: Height) -> u64 {
    BASE_BLOCK_SUBSIDY.checked_shr(halvings(height)).unwrap_or(0)
}
