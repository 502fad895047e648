//! Offset-composition flip kernel.
//!
//! Instead of decomposing every flat position, this kernel precomputes, for
//! each flipped axis, a table of byte displacements `(S-1-c) * stride * size_of::<T>()`
//! and reads from an input whose flipped strides are forced to zero. At each
//! output position the source address is the restrided input's address plus
//! one table entry per flipped axis. Unflipped axes cost nothing extra.

use smallvec::SmallVec;

use crate::dims::DimSet;
use crate::layout::contiguous_strides;
use crate::threading::for_each_chunk;
use crate::view::{StridedArray, StridedView};
use crate::{Result, StridedError};

type SVec<T> = SmallVec<[T; 8]>;

/// Byte displacements for one flipped axis.
///
/// Shaped like the input with every extent 1 except `axis`, so it broadcasts
/// against the output shape along its own axis only.
#[derive(Debug, Clone)]
pub struct OffsetTable {
    axis: usize,
    table: StridedArray<i64>,
}

impl OffsetTable {
    /// The flipped axis this table corrects.
    #[inline]
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Displacements indexed by coordinate along [`OffsetTable::axis`].
    #[inline]
    pub fn offsets(&self) -> &[i64] {
        self.table.data()
    }

    /// The table as an array of rank `ndim` (size 1 off-axis).
    #[inline]
    pub fn as_array(&self) -> &StridedArray<i64> {
        &self.table
    }
}

/// Build one [`OffsetTable`] per axis in `flip`, in ascending axis order.
pub fn build_offset_tables<T>(src: &StridedView<'_, T>, flip: &DimSet) -> Result<Vec<OffsetTable>> {
    if flip.ndim() != src.ndim() {
        return Err(StridedError::RankMismatch(flip.ndim(), src.ndim()));
    }
    let elem_size = src.element_size() as i64;
    let mut tables = Vec::with_capacity(flip.len());
    for axis in flip.iter() {
        let size = src.dims()[axis];
        let stride = src.strides()[axis] as i64;
        let mut shape = vec![1usize; src.ndim()];
        shape[axis] = size;
        let offsets: Vec<i64> = (0..size)
            .map(|c| (size - 1 - c) as i64 * stride * elem_size)
            .collect();
        tables.push(OffsetTable {
            axis,
            table: StridedArray::from_vec(offsets, &shape)?,
        });
    }
    Ok(tables)
}

/// Joint iteration over the packed output, the restrided input and the
/// offset tables, all broadcast to the output shape.
#[derive(Debug)]
pub struct IterationPlan<'a, T> {
    dims: Vec<usize>,
    input: StridedView<'a, T>,
    tables: Vec<OffsetTable>,
    /// Per-table strides in the output coordinate space (0 off-axis).
    table_strides: Vec<Vec<isize>>,
}

impl<'a, T> IterationPlan<'a, T> {
    /// Plan a flip of `src` over the axes in `flip`.
    pub fn new(src: &StridedView<'a, T>, flip: &DimSet) -> Result<Self> {
        let tables = build_offset_tables(src, flip)?;

        // Set stride to zero on the flipped axes; the tables supply the displacement.
        let mut strides = src.strides().to_vec();
        for table in &tables {
            strides[table.axis] = 0;
        }
        let input = src.as_strided(src.dims(), &strides, src.offset())?;

        let mut table_strides = Vec::with_capacity(tables.len());
        for table in &tables {
            let view = table.table.view();
            let broadcast = view.broadcast(src.dims())?;
            table_strides.push(broadcast.strides().to_vec());
        }

        tracing::trace!(
            dims = ?src.dims(),
            input_strides = ?input.strides(),
            ntables = tables.len(),
            "built flip iteration plan"
        );

        Ok(Self {
            dims: src.dims().to_vec(),
            input,
            tables,
            table_strides,
        })
    }

    /// Iteration shape (the output shape).
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The input with every flipped stride forced to zero.
    #[inline]
    pub fn input(&self) -> &StridedView<'a, T> {
        &self.input
    }

    #[inline]
    pub fn tables(&self) -> &[OffsetTable] {
        &self.tables
    }

    /// Number of output positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> IterationPlan<'_, T>
where
    T: Copy + Send + Sync,
{
    /// Execute the plan into the packed row-major `out`.
    pub fn run_into(&self, out: &mut [T], grain: usize) -> Result<()> {
        if out.len() != self.len() {
            return Err(StridedError::ShapeMismatch(
                vec![out.len()],
                self.dims.clone(),
            ));
        }

        let rank = self.dims.len();
        let dims = &self.dims[..];
        let packed = contiguous_strides(dims);
        let in_strides = self.input.strides();
        let elem_size = std::mem::size_of::<T>() as isize;
        let data = self.input.data();
        let byte_len = std::mem::size_of_val(data);

        for_each_chunk(out, grain, &|start, chunk: &mut [T]| {
            // Seed the odometer at the chunk's first flat position.
            let mut coord: SVec<usize> = SmallVec::from_elem(0, rank);
            let mut rem = start;
            for d in 0..rank {
                coord[d] = rem / packed[d];
                rem -= coord[d] * packed[d];
            }
            let mut in_off = self.input.offset();
            let mut pos: SVec<isize> = SmallVec::from_elem(0, self.tables.len());
            for d in 0..rank {
                in_off += coord[d] as isize * in_strides[d];
                for (t, ts) in self.table_strides.iter().enumerate() {
                    pos[t] += coord[d] as isize * ts[d];
                }
            }

            for slot in chunk.iter_mut() {
                let mut bytes = in_off * elem_size;
                for (t, table) in self.tables.iter().enumerate() {
                    bytes += table.offsets()[pos[t] as usize] as isize;
                }
                debug_assert!(bytes >= 0 && (bytes + elem_size) as usize <= byte_len);
                // SAFETY: `bytes` is the element offset of an in-bounds element
                // of the validated input, scaled by the element size.
                *slot = unsafe { data.as_ptr().cast::<u8>().offset(bytes).cast::<T>().read() };

                // Advance the odometer, last axis fastest.
                for d in (0..rank).rev() {
                    coord[d] += 1;
                    in_off += in_strides[d];
                    for (t, ts) in self.table_strides.iter().enumerate() {
                        pos[t] += ts[d];
                    }
                    if coord[d] < dims[d] {
                        break;
                    }
                    let wrap = dims[d] as isize;
                    coord[d] = 0;
                    in_off -= wrap * in_strides[d];
                    for (t, ts) in self.table_strides.iter().enumerate() {
                        pos[t] -= wrap * ts[d];
                    }
                }
            }
        });
        Ok(())
    }
}
