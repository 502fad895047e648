//! Fork-join parallel-for over disjoint output chunks.
//!
//! The output slice is split recursively in half with `rayon::join` until a
//! subtree has a single thread or at most one grain of work left. Splits are
//! always made on multiples of the grain size, so every leaf sees the same
//! fixed-size chunks a sequential run would.

/// Run `f(start, chunk)` for every `grain`-sized chunk of `out`.
///
/// `start` is the flat position of `chunk[0]` in `out`. Chunks are disjoint
/// `&mut` sub-slices, so leaves never alias each other's writes.
pub(crate) fn for_each_chunk<T, F>(out: &mut [T], grain: usize, f: &F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    let grain = grain.max(1);
    #[cfg(feature = "parallel")]
    let nthreads = rayon::current_num_threads();
    #[cfg(not(feature = "parallel"))]
    let nthreads = 1;

    tracing::trace!(len = out.len(), grain, nthreads, "for_each_chunk");
    chunked_threaded(out, 0, grain, nthreads, f);
}

fn sequential_chunks<T, F>(out: &mut [T], start: usize, grain: usize, f: &F)
where
    F: Fn(usize, &mut [T]),
{
    for (i, chunk) in out.chunks_mut(grain).enumerate() {
        f(start + i * grain, chunk);
    }
}

#[cfg(feature = "parallel")]
fn chunked_threaded<T, F>(out: &mut [T], start: usize, grain: usize, nthreads: usize, f: &F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    // Base case: single thread or at most one chunk
    if nthreads <= 1 || out.len() <= grain {
        sequential_chunks(out, start, grain, f);
        return;
    }

    let nchunks = out.len().div_ceil(grain);
    let mid = (nchunks / 2) * grain;
    let nt_left = nthreads / 2;
    let nt_right = nthreads - nt_left;
    let (left, right) = out.split_at_mut(mid);

    rayon::join(
        || chunked_threaded(left, start, grain, nt_left, f),
        || chunked_threaded(right, start + mid, grain, nt_right, f),
    );
}

#[cfg(not(feature = "parallel"))]
fn chunked_threaded<T, F>(out: &mut [T], start: usize, grain: usize, _nthreads: usize, f: &F)
where
    F: Fn(usize, &mut [T]),
{
    sequential_chunks(out, start, grain, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_chunks_cover_every_position_once() {
        let mut out = vec![0usize; 10_007];
        for_each_chunk(&mut out, 1000, &|start, chunk| {
            for (i, slot) in chunk.iter_mut().enumerate() {
                *slot += start + i + 1;
            }
        });
        for (i, &v) in out.iter().enumerate() {
            assert_eq!(v, i + 1);
        }
    }

    #[test]
    fn test_chunk_starts_are_grain_aligned() {
        let calls = AtomicUsize::new(0);
        let mut out = vec![0u8; 2500];
        for_each_chunk(&mut out, 1000, &|start, chunk| {
            assert_eq!(start % 1000, 0);
            assert!(chunk.len() <= 1000);
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_empty_output_runs_nothing() {
        let calls = AtomicUsize::new(0);
        let mut out: Vec<u8> = Vec::new();
        for_each_chunk(&mut out, 1000, &|_, _| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_grain_is_clamped() {
        let mut out = vec![0u32; 5];
        for_each_chunk(&mut out, 0, &|start, chunk| {
            assert_eq!(chunk.len(), 1);
            chunk[0] = start as u32;
        });
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }
}
