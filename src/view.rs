//! Dynamic-rank strided view types.
//!
//! - [`StridedView`]: Immutable dynamic-rank strided view over a borrowed slice
//! - [`StridedArray`]: Owned strided multidimensional array
//!
//! Strides and offsets are counted in elements. Every view is bounds-checked
//! once at construction, so kernels reading through a view may index
//! unchecked afterwards.

use std::sync::Arc;

use crate::{Result, StridedError};

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate that all accessed offsets stay within `[0, len)`.
pub(crate) fn validate_bounds(
    len: usize,
    dims: &[usize],
    strides: &[isize],
    offset: isize,
) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    // Empty array - no access needed
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(StridedError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 {
        return Err(StridedError::OffsetOverflow);
    }
    if max_offset as usize >= len {
        return Err(StridedError::OffsetOverflow);
    }
    Ok(())
}

/// Compute row-major strides (C default: last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Advance a row-major odometer. Returns `false` once every index wrapped.
#[inline]
pub(crate) fn next_index(idx: &mut [usize], dims: &[usize]) -> bool {
    for d in (0..dims.len()).rev() {
        idx[d] += 1;
        if idx[d] < dims[d] {
            return true;
        }
        idx[d] = 0;
    }
    false
}

fn check_axis(axis: usize, rank: usize) -> Result<()> {
    if axis >= rank {
        return Err(StridedError::InvalidAxis { axis, rank });
    }
    Ok(())
}

// ============================================================================
// StridedView
// ============================================================================

/// Dynamic-rank immutable strided view.
///
/// Dims and strides live behind `Arc`, so cloning a view and the zero-copy
/// transformations (permute, transpose, narrow, restride) never touch the data.
pub struct StridedView<'a, T> {
    data: &'a [T],
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T> Clone for StridedView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T> std::fmt::Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedView")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> StridedView<'a, T> {
    /// Create a new immutable strided view from a borrowed slice.
    pub fn new(data: &'a [T], dims: &[usize], strides: &[isize], offset: isize) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    /// Create a packed row-major view over the whole slice.
    pub fn row_major(data: &'a [T], dims: &[usize]) -> Result<Self> {
        let total: usize = dims.iter().product();
        if total != data.len() {
            return Err(StridedError::ReshapeMismatch {
                from: data.len(),
                to: dims.to_vec(),
            });
        }
        Self::new(data, dims, &row_major_strides(dims), 0)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// The whole borrowed buffer, not just the viewed elements.
    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Size in bytes of one element.
    #[inline]
    pub fn element_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Restride: a new view over the same buffer with the given geometry.
    ///
    /// Bounds are re-validated against the borrowed buffer.
    pub fn as_strided(
        &self,
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<StridedView<'a, T>> {
        StridedView::new(self.data, dims, strides, offset)
    }

    /// Permute dimensions.
    pub fn permute(&self, perm: &[usize]) -> Result<StridedView<'a, T>> {
        let rank = self.dims.len();
        if perm.len() != rank {
            return Err(StridedError::RankMismatch(perm.len(), rank));
        }
        let mut seen = vec![false; rank];
        for &p in perm {
            if p >= rank || seen[p] {
                return Err(StridedError::InvalidAxis { axis: p, rank });
            }
            seen[p] = true;
        }
        let new_dims: Vec<usize> = perm.iter().map(|&p| self.dims[p]).collect();
        let new_strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(new_dims),
            strides: Arc::from(new_strides),
            offset: self.offset,
        })
    }

    /// Swap two axes (zero-copy).
    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<StridedView<'a, T>> {
        let rank = self.dims.len();
        check_axis(dim0, rank)?;
        check_axis(dim1, rank)?;
        let mut dims = self.dims.to_vec();
        let mut strides = self.strides.to_vec();
        dims.swap(dim0, dim1);
        strides.swap(dim0, dim1);
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset: self.offset,
        })
    }

    /// Contiguous sub-range `start..start + len` along `dim` (zero-copy).
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<StridedView<'a, T>> {
        let rank = self.dims.len();
        check_axis(dim, rank)?;
        let size = self.dims[dim];
        if start.checked_add(len).map_or(true, |end| end > size) {
            return Err(StridedError::NarrowOutOfRange {
                dim,
                start,
                len,
                size,
            });
        }
        let mut dims = self.dims.to_vec();
        dims[dim] = len;
        // An empty narrow keeps the original offset so it never points past the buffer.
        let offset = if len == 0 {
            self.offset
        } else {
            self.offset + start as isize * self.strides[dim]
        };
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(dims),
            strides: self.strides.clone(),
            offset,
        })
    }

    /// Insert a size-1 axis at position `dim` (`0..=ndim`).
    pub fn unsqueeze(&self, dim: usize) -> Result<StridedView<'a, T>> {
        let rank = self.dims.len();
        if dim > rank {
            return Err(StridedError::InvalidAxis {
                axis: dim,
                rank: rank + 1,
            });
        }
        // Stride of a size-1 axis is never used for addressing; pick the packed value.
        let stride = if dim < rank {
            self.strides[dim] * self.dims[dim].max(1) as isize
        } else {
            1
        };
        let mut dims = self.dims.to_vec();
        let mut strides = self.strides.to_vec();
        dims.insert(dim, 1);
        strides.insert(dim, stride);
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset: self.offset,
        })
    }

    /// Broadcast this view to a target shape.
    ///
    /// Size-1 dimensions are expanded (stride set to 0) to match target.
    pub fn broadcast(&self, target_dims: &[usize]) -> Result<StridedView<'a, T>> {
        if self.dims.len() != target_dims.len() {
            return Err(StridedError::RankMismatch(
                self.dims.len(),
                target_dims.len(),
            ));
        }
        let mut new_strides = Vec::with_capacity(self.dims.len());
        for i in 0..self.dims.len() {
            if self.dims[i] == target_dims[i] {
                new_strides.push(self.strides[i]);
            } else if self.dims[i] == 1 {
                new_strides.push(0);
            } else {
                return Err(StridedError::ShapeMismatch(
                    self.dims.to_vec(),
                    target_dims.to_vec(),
                ));
            }
        }
        Ok(StridedView {
            data: self.data,
            dims: Arc::from(target_dims),
            strides: Arc::from(new_strides),
            offset: self.offset,
        })
    }

    /// Buffer index of the element at `indices`, without range checks.
    #[inline]
    pub(crate) fn linear_index(&self, indices: &[usize]) -> usize {
        let mut idx = self.offset;
        for (i, &index) in indices.iter().enumerate() {
            idx += index as isize * self.strides[i];
        }
        idx as usize
    }
}

impl<'a, T: Copy> StridedView<'a, T> {
    /// Get an element.
    ///
    /// # Panics
    /// Panics if the index is out of bounds.
    pub fn get(&self, indices: &[usize]) -> T {
        assert_eq!(indices.len(), self.dims.len(), "wrong number of indices");
        for (i, &index) in indices.iter().enumerate() {
            assert!(
                index < self.dims[i],
                "index {} out of bounds for dim {}",
                index,
                self.dims[i]
            );
        }
        self.data[self.linear_index(indices)]
    }

    /// Collect the viewed elements in row-major logical order.
    pub fn to_vec(&self) -> Vec<T> {
        let total = self.len();
        let mut out = Vec::with_capacity(total);
        if total == 0 {
            return out;
        }
        let mut idx = vec![0usize; self.ndim()];
        loop {
            out.push(self.data[self.linear_index(&idx)]);
            if !next_index(&mut idx, &self.dims) {
                break;
            }
        }
        out
    }

    /// Deep copy into a packed row-major array.
    pub fn to_row_major(&self) -> StridedArray<T> {
        let dims = self.dims.to_vec();
        StridedArray {
            data: self.to_vec(),
            strides: Arc::from(row_major_strides(&dims)),
            dims: Arc::from(dims),
            offset: 0,
        }
    }
}

/// Concatenate views along `dim` into a packed row-major array.
///
/// All parts must share rank and every extent except `dim`.
pub fn concat<T: Copy>(parts: &[StridedView<'_, T>], dim: usize) -> Result<StridedArray<T>> {
    // Nothing to concatenate: report it as a zero-rank input.
    let first = parts.first().ok_or(StridedError::RankMismatch(0, 1))?;
    let rank = first.ndim();
    check_axis(dim, rank)?;
    let mut out_dims = first.dims().to_vec();
    out_dims[dim] = 0;
    for part in parts {
        if part.ndim() != rank {
            return Err(StridedError::RankMismatch(part.ndim(), rank));
        }
        for d in 0..rank {
            if d != dim && part.dims()[d] != first.dims()[d] {
                return Err(StridedError::ShapeMismatch(
                    part.dims().to_vec(),
                    first.dims().to_vec(),
                ));
            }
        }
        out_dims[dim] += part.dims()[dim];
    }

    let out_strides = row_major_strides(&out_dims);
    let total: usize = out_dims.iter().product();
    // Every slot is written exactly once below.
    let mut slots: Vec<Option<T>> = vec![None; total];
    let mut start = 0usize;
    for part in parts {
        if !part.is_empty() {
            let mut idx = vec![0usize; rank];
            loop {
                let mut pos = 0isize;
                for d in 0..rank {
                    let i = if d == dim { idx[d] + start } else { idx[d] };
                    pos += i as isize * out_strides[d];
                }
                slots[pos as usize] = Some(part.data[part.linear_index(&idx)]);
                if !next_index(&mut idx, part.dims()) {
                    break;
                }
            }
        }
        start += part.dims()[dim];
    }
    let data: Vec<T> = slots.into_iter().flatten().collect();
    StridedArray::from_parts(data, &out_dims, &out_strides, 0)
}

// ============================================================================
// StridedArray
// ============================================================================

/// Owned strided multidimensional array.
///
/// Freshly allocated arrays are packed row-major; metadata-only operations such
/// as [`StridedArray::transpose`] may leave them with permuted strides.
pub struct StridedArray<T> {
    data: Vec<T>,
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedArray")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T: Clone> Clone for StridedArray<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Clone + Default> StridedArray<T> {
    /// Create a row-major (C default) array filled with Default values.
    pub fn row_major(dims: &[usize]) -> Self {
        let total: usize = dims.iter().product();
        Self {
            data: vec![T::default(); total],
            strides: Arc::from(row_major_strides(dims)),
            dims: Arc::from(dims),
            offset: 0,
        }
    }

    /// Create a row-major array with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order.
    pub fn from_fn_row_major(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = dims.iter().product();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; dims.len()];
        for _ in 0..total {
            data.push(f(&idx));
            next_index(&mut idx, dims);
        }
        Self {
            data,
            strides: Arc::from(row_major_strides(dims)),
            dims: Arc::from(dims),
            offset: 0,
        }
    }
}

impl<T> StridedArray<T> {
    /// Create from raw parts.
    pub fn from_parts(
        data: Vec<T>,
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    /// Wrap a row-major buffer. `data.len()` must equal the product of `dims`.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        let total: usize = dims.iter().product();
        if total != data.len() {
            return Err(StridedError::ReshapeMismatch {
                from: data.len(),
                to: dims.to_vec(),
            });
        }
        Self::from_parts(data, dims, &row_major_strides(dims), 0)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// The backing buffer in memory order.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Whether the array is packed row-major from offset 0.
    pub fn is_row_major(&self) -> bool {
        self.offset == 0 && crate::layout::is_row_major_packed(&self.dims, &self.strides)
    }

    /// Create an immutable view over this array.
    pub fn view(&self) -> StridedView<'_, T> {
        StridedView {
            data: &self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Swap two axes by exchanging their dims and strides. No data moves.
    pub fn transpose(mut self, dim0: usize, dim1: usize) -> Result<Self> {
        let rank = self.dims.len();
        check_axis(dim0, rank)?;
        check_axis(dim1, rank)?;
        let mut dims = self.dims.to_vec();
        let mut strides = self.strides.to_vec();
        dims.swap(dim0, dim1);
        strides.swap(dim0, dim1);
        self.dims = Arc::from(dims);
        self.strides = Arc::from(strides);
        Ok(self)
    }
}

impl<T: Copy> StridedArray<T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.view().get(indices)
    }

    /// Elements in row-major logical order, whatever the memory layout.
    pub fn to_vec(&self) -> Vec<T> {
        if self.is_row_major() {
            return self.data[..self.len()].to_vec();
        }
        self.view().to_vec()
    }

    /// Reinterpret as `dims`, packing the data first if the layout requires it.
    pub fn reshape(self, dims: &[usize]) -> Result<Self> {
        let total: usize = dims.iter().product();
        if total != self.len() {
            return Err(StridedError::ReshapeMismatch {
                from: self.len(),
                to: dims.to_vec(),
            });
        }
        let data = if self.is_row_major() {
            let mut data = self.data;
            data.truncate(total);
            data
        } else {
            self.view().to_vec()
        };
        Self::from_vec(data, dims)
    }
}

// ============================================================================
// Tests
// ============================================================================
