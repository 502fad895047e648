//! Public flip, rotation, roll and shape-promotion operations.

use crate::dims::{dim_list_to_set, wrap_dim};
use crate::index::IterationPlan;
use crate::kernel::flip_direct_into;
use crate::view::{concat, StridedArray, StridedView};
use crate::{Result, StridedError, DIRECT_GRAIN_SIZE, INDEX_GRAIN_SIZE};

/// Which kernel computes a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipStrategy {
    /// Per-element coordinate decomposition ([`flip_direct_into`]).
    Direct,
    /// Offset tables summed over a broadcast iteration ([`IterationPlan`]).
    #[default]
    Index,
}

/// Options for [`flip_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipConfig {
    /// Kernel that computes the flip.
    pub strategy: FlipStrategy,
    /// Chunk size for [`FlipStrategy::Direct`].
    pub direct_grain: usize,
    /// Chunk size for [`FlipStrategy::Index`].
    pub index_grain: usize,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            strategy: FlipStrategy::default(),
            direct_grain: DIRECT_GRAIN_SIZE,
            index_grain: INDEX_GRAIN_SIZE,
        }
    }
}

impl FlipConfig {
    pub fn with_strategy(mut self, strategy: FlipStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_direct_grain(mut self, grain: usize) -> Self {
        self.direct_grain = grain;
        self
    }

    pub fn with_index_grain(mut self, grain: usize) -> Self {
        self.index_grain = grain;
        self
    }
}

/// Reverse `src` along every axis in `dims` (negative indices count from the end).
///
/// Returns a packed row-major copy. An empty `dims` yields a plain copy.
pub fn flip<T>(src: &StridedView<'_, T>, dims: &[isize]) -> Result<StridedArray<T>>
where
    T: Copy + Default + Send + Sync,
{
    flip_with(src, dims, &FlipConfig::default())
}

/// [`flip`] with an explicit kernel choice and grain sizes.
pub fn flip_with<T>(
    src: &StridedView<'_, T>,
    dims: &[isize],
    config: &FlipConfig,
) -> Result<StridedArray<T>>
where
    T: Copy + Default + Send + Sync,
{
    let set = dim_list_to_set(dims, src.ndim())?;
    tracing::debug!(
        strategy = ?config.strategy,
        shape = ?src.dims(),
        flipped = set.len(),
        "flip"
    );

    let mut out = StridedArray::row_major(src.dims());
    match config.strategy {
        FlipStrategy::Direct => {
            flip_direct_into(src, &set, out.data_mut(), config.direct_grain)?
        }
        FlipStrategy::Index => {
            IterationPlan::new(src, &set)?.run_into(out.data_mut(), config.index_grain)?
        }
    }
    Ok(out)
}

/// Rotate by `k` quarter turns in the plane of the two axes in `dims`.
///
/// Rotation goes from the first axis towards the second. `k` may be any
/// integer; it is taken modulo 4. Odd `k` returns a transposed (non-packed)
/// array; no second copy is made.
pub fn rot90<T>(src: &StridedView<'_, T>, k: i64, dims: &[isize]) -> Result<StridedArray<T>>
where
    T: Copy + Default + Send + Sync,
{
    let total_dims = src.ndim();
    if dims.len() != 2 {
        return Err(StridedError::RotationArity(dims.len()));
    }
    if total_dims < 2 {
        return Err(StridedError::RankTooSmall {
            required: 2,
            actual: total_dims,
        });
    }
    let (dim0, dim1) = (dims[0], dims[1]);
    if dim0 == dim1 || dim0.abs_diff(dim1) == total_dims {
        return Err(StridedError::DegenerateRotationAxes { dim0, dim1 });
    }
    let axis0 = wrap_dim(dim0, total_dims)?;
    let axis1 = wrap_dim(dim1, total_dims)?;

    // k into 0..4, negative k included
    let k = (4 + k % 4) % 4;
    tracing::debug!(k, axis0, axis1, "rot90");

    match k {
        1 => flip(src, &[dim1])?.transpose(axis0, axis1),
        2 => flip(src, dims),
        3 => flip(src, &[dim0])?.transpose(axis0, axis1),
        _ => Ok(src.to_row_major()),
    }
}

/// Reverse axis 1 (columns). Requires at least two dimensions.
pub fn fliplr<T>(src: &StridedView<'_, T>) -> Result<StridedArray<T>>
where
    T: Copy + Default + Send + Sync,
{
    if src.ndim() < 2 {
        return Err(StridedError::RankTooSmall {
            required: 2,
            actual: src.ndim(),
        });
    }
    flip(src, &[1])
}

/// Reverse axis 0 (rows). Requires at least one dimension.
pub fn flipud<T>(src: &StridedView<'_, T>) -> Result<StridedArray<T>>
where
    T: Copy + Default + Send + Sync,
{
    if src.ndim() < 1 {
        return Err(StridedError::RankTooSmall {
            required: 1,
            actual: 0,
        });
    }
    flip(src, &[0])
}

/// Circularly shift elements by `shifts[i]` along `dims[i]`.
///
/// With empty `dims`, a single shift applies to the flattened array and the
/// original shape is restored afterwards.
pub fn roll<T: Copy>(
    src: &StridedView<'_, T>,
    shifts: &[i64],
    dims: &[isize],
) -> Result<StridedArray<T>> {
    if dims.is_empty() {
        if shifts.len() != 1 {
            return Err(StridedError::RollArity {
                shifts: shifts.len(),
                dims: 0,
            });
        }
        let flat = src.to_row_major().reshape(&[src.len()])?;
        return roll_axis(&flat.view(), shifts[0], 0)?.reshape(src.dims());
    }
    if shifts.len() != dims.len() {
        return Err(StridedError::RollArity {
            shifts: shifts.len(),
            dims: dims.len(),
        });
    }
    let axes = dims
        .iter()
        .map(|&d| wrap_dim(d, src.ndim()))
        .collect::<Result<Vec<_>>>()?;
    // Empty input: nothing to rotate.
    if src.is_empty() {
        return Ok(src.to_row_major());
    }

    let mut result = roll_axis(src, shifts[0], axes[0])?;
    for (&shift, &axis) in shifts.iter().zip(axes.iter()).skip(1) {
        let next = roll_axis(&result.view(), shift, axis)?;
        result = next;
    }
    Ok(result)
}

/// Single-axis roll: the tail starting at `size - shift` followed by the head.
fn roll_axis<T: Copy>(src: &StridedView<'_, T>, shift: i64, axis: usize) -> Result<StridedArray<T>> {
    let size = src.dims()[axis];
    if size == 0 {
        return Ok(src.to_row_major());
    }
    let n = size as i64;
    let start = ((n - shift.rem_euclid(n)) % n) as usize;
    let tail = src.narrow(axis, start, size - start)?;
    let head = src.narrow(axis, 0, start)?;
    concat(&[tail, head], axis)
}

/// View with at least one dimension: a 0-d view becomes shape `[1]`.
pub fn atleast_1d<'a, T>(src: &StridedView<'a, T>) -> Result<StridedView<'a, T>> {
    match src.ndim() {
        0 => src.unsqueeze(0),
        _ => Ok(src.clone()),
    }
}

/// View with at least two dimensions: `[]` → `[1, 1]`, `[n]` → `[1, n]`.
pub fn atleast_2d<'a, T>(src: &StridedView<'a, T>) -> Result<StridedView<'a, T>> {
    match src.ndim() {
        0 => src.unsqueeze(0)?.unsqueeze(0),
        1 => src.unsqueeze(0),
        _ => Ok(src.clone()),
    }
}

/// View with at least three dimensions: `[]` → `[1, 1, 1]`, `[n]` → `[1, n, 1]`,
/// `[m, n]` → `[m, n, 1]`.
pub fn atleast_3d<'a, T>(src: &StridedView<'a, T>) -> Result<StridedView<'a, T>> {
    match src.ndim() {
        0 => src.unsqueeze(0)?.unsqueeze(0)?.unsqueeze(0),
        1 => src.unsqueeze(0)?.unsqueeze(2),
        2 => src.unsqueeze(2),
        _ => Ok(src.clone()),
    }
}

/// [`atleast_1d`] over every view.
pub fn atleast_1d_all<'a, T>(srcs: &[StridedView<'a, T>]) -> Result<Vec<StridedView<'a, T>>> {
    srcs.iter().map(atleast_1d).collect()
}

/// [`atleast_2d`] over every view.
pub fn atleast_2d_all<'a, T>(srcs: &[StridedView<'a, T>]) -> Result<Vec<StridedView<'a, T>>> {
    srcs.iter().map(atleast_2d).collect()
}

/// [`atleast_3d`] over every view.
pub fn atleast_3d_all<'a, T>(srcs: &[StridedView<'a, T>]) -> Result<Vec<StridedView<'a, T>>> {
    srcs.iter().map(atleast_3d).collect()
}
