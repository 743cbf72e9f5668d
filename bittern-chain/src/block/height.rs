use crate::transaction::LOCK_TIME_THRESHOLD;

/// The height of a block is the length of the chain back to the genesis
/// block.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[cfg_attr(
    any(test, feature = "proptest-impl"),
    derive(proptest_derive::Arbitrary)
)]
pub struct Height(pub u32);

impl Height {
    /// The minimum Height.
    ///
    /// Due to the underlying type, it is impossible to construct block
    /// heights less than `Height::MIN`.
    pub const MIN: Height = Height(0);

    /// The maximum Height.
    ///
    /// Users should not construct block heights greater than `Height::MAX`:
    /// lock time fields at or above [`LOCK_TIME_THRESHOLD`] are timestamps,
    /// not heights.
    pub const MAX: Height = Height(LOCK_TIME_THRESHOLD - 1);
}
