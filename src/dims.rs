//! Axis selection: wrap possibly negative axis indices and collect them into a
//! fixed-capacity set.

use crate::{Result, StridedError, MAX_DIMS};

/// Wrap an axis index in `[-ndim, ndim - 1]` to `[0, ndim)`.
#[inline]
pub fn wrap_dim(dim: isize, ndim: usize) -> Result<usize> {
    let n = ndim as isize;
    if dim < -n || dim >= n {
        return Err(StridedError::DimOutOfRange { dim, ndim });
    }
    Ok(if dim < 0 { (dim + n) as usize } else { dim as usize })
}

/// Set of axes of an `ndim`-dimensional array, at most [`MAX_DIMS`] wide.
///
/// Invariant: no axis at or beyond `ndim` is ever a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimSet {
    bits: u64,
    ndim: usize,
}

impl DimSet {
    /// Empty set for an array of rank `ndim`.
    pub fn empty(ndim: usize) -> Result<Self> {
        if ndim > MAX_DIMS {
            return Err(StridedError::TooManyDims(ndim));
        }
        Ok(Self { bits: 0, ndim })
    }

    /// Add an axis. Inserting an axis twice is a no-op.
    pub fn insert(&mut self, axis: usize) -> Result<()> {
        if axis >= self.ndim {
            return Err(StridedError::InvalidAxis {
                axis,
                rank: self.ndim,
            });
        }
        self.bits |= 1u64 << axis;
        Ok(())
    }

    #[inline]
    pub fn contains(&self, axis: usize) -> bool {
        axis < self.ndim && self.bits & (1u64 << axis) != 0
    }

    /// Number of selected axes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Rank of the array this set describes.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Selected axes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.ndim).filter(move |&d| self.contains(d))
    }
}

/// Normalize a list of axis indices into a [`DimSet`].
///
/// Negative indices count from the end. Duplicates collapse.
pub fn dim_list_to_set(dims: &[isize], ndim: usize) -> Result<DimSet> {
    let mut set = DimSet::empty(ndim)?;
    for &dim in dims {
        set.insert(wrap_dim(dim, ndim)?)?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_dim() {
        assert_eq!(wrap_dim(0, 3).unwrap(), 0);
        assert_eq!(wrap_dim(2, 3).unwrap(), 2);
        assert_eq!(wrap_dim(-1, 3).unwrap(), 2);
        assert_eq!(wrap_dim(-3, 3).unwrap(), 0);
        assert_eq!(
            wrap_dim(3, 3),
            Err(StridedError::DimOutOfRange { dim: 3, ndim: 3 })
        );
        assert!(wrap_dim(-4, 3).is_err());
        assert!(wrap_dim(0, 0).is_err());
    }

    #[test]
    fn test_dim_list_to_set() {
        let set = dim_list_to_set(&[0, -1], 4).unwrap();
        assert!(set.contains(0));
        assert!(set.contains(3));
        assert!(!set.contains(1));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = dim_list_to_set(&[1, 1, -2], 3).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_empty_list() {
        let set = dim_list_to_set(&[], 5).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.ndim(), 5);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            dim_list_to_set(&[0, 2], 2),
            Err(StridedError::DimOutOfRange { dim: 2, ndim: 2 })
        ));
    }

    #[test]
    fn test_rank_limit() {
        assert!(DimSet::empty(MAX_DIMS).is_ok());
        assert_eq!(
            DimSet::empty(MAX_DIMS + 1),
            Err(StridedError::TooManyDims(MAX_DIMS + 1))
        );
        let mut set = DimSet::empty(MAX_DIMS).unwrap();
        set.insert(MAX_DIMS - 1).unwrap();
        assert!(set.contains(63));
        assert!(set.insert(MAX_DIMS).is_err());
    }
}
