//! Fixed, little-endian wire types for the overlapping-vector setup exchange.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Copy a received byte payload into a typed buffer of exactly matching size.
///
/// Received `Vec<u8>` payloads carry no alignment guarantee, so the bytes are
/// copied into `dst` instead of being reinterpreted in place.
pub fn copy_into<T: Pod>(dst: &mut [T], raw: &[u8]) -> Result<(), (usize, usize)> {
    let bytes = cast_slice_mut(dst);
    expect_exact_len(raw.len(), bytes.len())?;
    bytes.copy_from_slice(raw);
    Ok(())
}

/// `Err((expected, actual))` unless the lengths agree.
pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), (usize, usize)> {
    if actual == expected {
        Ok(())
    } else {
        Err((expected, actual))
    }
}

/// Number of records that follow in the next message.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}

impl WireCount {
    /// `None` if `n` does not fit the 32-bit count field.
    pub fn new(n: usize) -> Option<Self> {
        u32::try_from(n).ok().map(|n| Self { n_le: n.to_le() })
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// A global dof index carried on the wire.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct WireIndex {
    pub idx_le: u64,
}

impl WireIndex {
    pub fn of(idx: usize) -> Self {
        Self {
            idx_le: (idx as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.idx_le) as usize
    }
}

const_assert_eq!(size_of::<WireCount>(), 4);
const_assert_eq!(size_of::<WireIndex>(), 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_into_checks_length() {
        let mut dst = [WireIndex::default(); 2];
        let src = [WireIndex::of(7), WireIndex::of(11)];
        copy_into(&mut dst, cast_slice(&src)).unwrap();
        assert_eq!(dst[1].get(), 11);
        assert_eq!(copy_into(&mut dst, &[0u8; 3]), Err((16, 3)));
    }

    #[test]
    fn counts_beyond_u32_are_refused() {
        assert_eq!(WireCount::new(u32::MAX as usize).map(|c| c.get()), Some(u32::MAX as usize));
        #[cfg(target_pointer_width = "64")]
        assert!(WireCount::new(u32::MAX as usize + 1).is_none());
    }
}
