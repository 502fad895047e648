//! Axis reversal for dynamic-rank strided arrays.
//!
//! This crate reverses ("flips") any subset of the axes of an N-dimensional
//! strided view, and builds 90-degree rotation, left-right / up-down flips and
//! circular shifts on top of that primitive.
//!
//! # Core Types
//!
//! - [`StridedView`]: Zero-copy strided view over existing data
//! - [`StridedArray`]: Owned strided array, the result of every operation
//! - [`DimSet`]: Fixed-capacity set of axes to reverse
//! - [`Tensor`]: Dynamically typed array, dispatched by [`DType`] at run time
//!
//! # Two kernels, one contract
//!
//! - [`flip_direct_into`]: decomposes each flat output position into coordinates
//!   and recomposes a source offset with the input's real strides.
//! - [`IterationPlan`]: precomputes one byte-offset table per flipped axis and
//!   sums table entries over a broadcast iteration, reading from an input whose
//!   flipped strides are forced to zero.
//!
//! Both produce bit-identical output. [`FlipConfig`] selects between them.
//!
//! # Example
//!
//! ```rust
//! use strided_flip::{flip, fliplr, rot90, StridedArray};
//!
//! let a = StridedArray::from_fn_row_major(&[2, 3], |idx| (idx[0] * 3 + idx[1] + 1) as i32);
//!
//! let lr = fliplr(&a.view()).unwrap();
//! assert_eq!(lr.to_vec(), vec![3, 2, 1, 6, 5, 4]);
//!
//! let both = flip(&a.view(), &[0, -1]).unwrap();
//! assert_eq!(both.to_vec(), vec![6, 5, 4, 3, 2, 1]);
//!
//! let r = rot90(&a.view(), 1, &[0, 1]).unwrap();
//! assert_eq!(r.dims(), &[3, 2]);
//! ```

mod dims;
pub mod element;
mod index;
mod kernel;
mod layout;
mod ops;
pub mod tensor;
mod threading;
pub mod view;

// ============================================================================
// Dimension selection and stride planning
// ============================================================================
pub use dims::{dim_list_to_set, wrap_dim, DimSet};
pub use layout::{contiguous_strides, is_row_major_packed};

// ============================================================================
// Kernels
// ============================================================================
pub use index::{build_offset_tables, IterationPlan, OffsetTable};
pub use kernel::flip_direct_into;

// ============================================================================
// High-level operations
// ============================================================================
pub use ops::{
    atleast_1d, atleast_1d_all, atleast_2d, atleast_2d_all, atleast_3d, atleast_3d_all, flip,
    flip_with, fliplr, flipud, roll, rot90, FlipConfig, FlipStrategy,
};

// ============================================================================
// Views, elements and dynamic tensors
// ============================================================================
pub use element::{DType, Element, QInt32, QInt8, QUInt2x4, QUInt4x2, QUInt8};
pub use tensor::{QuantParams, Storage, StorageElement, Tensor};
pub use view::{concat, row_major_strides, StridedArray, StridedView};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of dimensions a [`DimSet`] can describe.
///
/// Arrays of higher rank are rejected with [`StridedError::TooManyDims`].
pub const MAX_DIMS: usize = 64;

/// Elements per parallel chunk for the direct strided kernel.
pub const DIRECT_GRAIN_SIZE: usize = 1000;

/// Elements per parallel chunk for the offset-composition kernel.
///
/// Finer than [`DIRECT_GRAIN_SIZE`]: the per-element table lookups make each
/// element more expensive, so smaller chunks balance better across threads.
pub const INDEX_GRAIN_SIZE: usize = 3000;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during strided flip operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StridedError {
    /// Axis index outside `[-ndim, ndim - 1]`.
    #[error("dimension out of range (expected to be in range of [-{ndim}, {ndim}), but got {dim})")]
    DimOutOfRange { dim: isize, ndim: usize },

    /// Rotation requires exactly two axes.
    #[error("expected total rotation dims == 2, but got dims = {0}")]
    RotationArity(usize),

    /// The two rotation axes name the same physical axis.
    #[error("expected rotation dims to be different, but got dim0 = {dim0} and dim1 = {dim1}")]
    DegenerateRotationAxes { dim0: isize, dim1: isize },

    /// The operation needs more dimensions than the input has.
    #[error("input must be >= {required}-d, but got {actual}-d")]
    RankTooSmall { required: usize, actual: usize },

    /// Rank exceeds [`MAX_DIMS`].
    #[error("rank {0} exceeds the supported maximum of 64 dimensions")]
    TooManyDims(usize),

    /// `roll` was given mismatched shift and dim lists.
    #[error("shifts and dimensions must align: shifts = {shifts}, dims = {dims}")]
    RollArity { shifts: usize, dims: usize },

    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Array shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// Integer overflow while computing array offset, or an offset outside the buffer.
    #[error("offset overflow while computing pointer")]
    OffsetOverflow,

    /// `narrow` range does not fit in the axis.
    #[error("narrow range {start}..{start}+{len} exceeds size {size} of dim {dim}")]
    NarrowOutOfRange {
        dim: usize,
        start: usize,
        len: usize,
        size: usize,
    },

    /// Reshape target has a different number of elements.
    #[error("cannot reshape {from} elements into shape {to:?}")]
    ReshapeMismatch { from: usize, to: Vec<usize> },

    /// Two dynamically typed tensors have different element kinds.
    #[error("dtype mismatch: expected {expected:?}, got {actual:?}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// Quantization parameters were attached to a non-quantized kind.
    #[error("{0:?} is not a quantized dtype")]
    NotQuantized(DType),
}

/// Result type for strided flip operations.
pub type Result<T> = std::result::Result<T, StridedError>;
