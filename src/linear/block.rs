//! Block values stored per row of an overlapping vector.

use bytemuck::Pod;
use std::fmt::Debug;

/// One row of a block vector: a plain-old-data value that can travel on the
/// wire as bytes and be accumulated.
pub trait BlockValue: Pod + Debug + Send + Sync {
    /// `self += other`, component-wise.
    fn add_assign_block(&mut self, other: &Self);

    /// The additive identity.
    #[inline]
    fn zero() -> Self {
        Self::zeroed()
    }
}

macro_rules! scalar_block {
    ($($t:ty),*) => {$(
        impl BlockValue for $t {
            #[inline]
            fn add_assign_block(&mut self, other: &Self) {
                *self += *other;
            }
        }
    )*};
}

scalar_block!(f32, f64, i32, i64, u32, u64);

impl<T, const N: usize> BlockValue for [T; N]
where
    T: BlockValue,
    [T; N]: Pod,
{
    #[inline]
    fn add_assign_block(&mut self, other: &Self) {
        for (a, b) in self.iter_mut().zip(other) {
            a.add_assign_block(b);
        }
    }
}
