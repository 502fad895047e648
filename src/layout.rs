//! Packed-layout stride planning.

/// Strides of a packed row-major array with the given shape.
///
/// `s[D-1] = 1` and `s[d] = max(dims[d+1], 1) * s[d+1]`. Zero-size axes count
/// as size 1, so every stride stays positive and a flat position can be
/// decomposed by successive division.
pub fn contiguous_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for d in (0..dims.len().saturating_sub(1)).rev() {
        strides[d] = dims[d + 1].max(1) * strides[d + 1];
    }
    strides
}

/// Check if `strides` describe a packed row-major layout for `dims`.
///
/// Size-1 axes are ignored; any shape with a zero-size axis is trivially packed.
pub fn is_row_major_packed(dims: &[usize], strides: &[isize]) -> bool {
    if dims.contains(&0) {
        return true;
    }
    let mut expected = 1isize;
    for (&d, &s) in dims.iter().rev().zip(strides.iter().rev()) {
        if d <= 1 {
            continue;
        }
        if s != expected {
            return false;
        }
        expected = expected.saturating_mul(d as isize);
    }
    true
}
