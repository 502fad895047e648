//! Direct strided flip kernel.
//!
//! Every flat output position is decomposed into per-dimension coordinates
//! with packed strides, flagged coordinates are mirrored, and the source offset
//! is recomposed with the input's actual strides.

use smallvec::SmallVec;

use crate::dims::DimSet;
use crate::layout::contiguous_strides;
use crate::threading::for_each_chunk;
use crate::view::StridedView;
use crate::{Result, StridedError};

/// Stack-allocated Vec for per-dimension scratch.
/// 8 elements covers up to 8-dimensional arrays without spilling.
type SVec<T> = SmallVec<[T; 8]>;

/// Write `src` with the axes in `flip` reversed into the packed row-major `out`.
///
/// `out.len()` must equal `src.len()` and `flip` must describe `src`'s rank.
/// Work is split into chunks of `grain` output elements.
pub fn flip_direct_into<T>(
    src: &StridedView<'_, T>,
    flip: &DimSet,
    out: &mut [T],
    grain: usize,
) -> Result<()>
where
    T: Copy + Send + Sync,
{
    if flip.ndim() != src.ndim() {
        return Err(StridedError::RankMismatch(flip.ndim(), src.ndim()));
    }
    if out.len() != src.len() {
        return Err(StridedError::ShapeMismatch(
            vec![out.len()],
            src.dims().to_vec(),
        ));
    }

    let rank = src.ndim();
    let sizes = src.dims();
    let strides = src.strides();
    let packed = contiguous_strides(sizes);
    let flagged: SVec<bool> = (0..rank).map(|d| flip.contains(d)).collect();
    let data = src.data();
    let base = src.offset();

    for_each_chunk(out, grain, &|start, chunk: &mut [T]| {
        for (j, slot) in chunk.iter_mut().enumerate() {
            let mut rem = start + j;
            let mut offset = base;
            for d in 0..rank {
                let coord = rem / packed[d];
                rem -= coord * packed[d];
                let src_coord = if flagged[d] {
                    sizes[d] - 1 - coord
                } else {
                    coord
                };
                offset += src_coord as isize * strides[d];
            }
            // SAFETY: the view was bounds-checked at construction and
            // `src_coord < sizes[d]` on every axis.
            *slot = unsafe { *data.get_unchecked(offset as usize) };
        }
    });
    Ok(())
}
