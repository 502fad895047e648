//! Element kinds the flip kernels operate on.
//!
//! Every kind is a plain `Copy` value; the kernels only move elements, so the
//! one thing that differs between kinds is the width of the storage unit.
//! Quantized kinds wrap their integer representation. Sub-byte kinds pack
//! several values into one byte and are moved one storage byte at a time.

use half::{bf16, f16};
use num_complex::{Complex32, Complex64};

/// Bounds shared by every element a kernel can move.
pub trait Element: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Run-time tag for this element type.
    const DTYPE: DType;
}

/// Run-time element kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    U8,
    I8,
    I16,
    I32,
    I64,
    F16,
    BF16,
    F32,
    F64,
    Complex32,
    Complex64,
    QInt8,
    QUInt8,
    QInt32,
    QUInt4x2,
    QUInt2x4,
}

impl DType {
    /// Width in bytes of one storage unit.
    pub fn element_size(self) -> usize {
        match self {
            DType::Bool | DType::U8 | DType::I8 => 1,
            DType::QInt8 | DType::QUInt8 | DType::QUInt4x2 | DType::QUInt2x4 => 1,
            DType::I16 | DType::F16 | DType::BF16 => 2,
            DType::I32 | DType::F32 | DType::QInt32 => 4,
            DType::I64 | DType::F64 | DType::Complex32 => 8,
            DType::Complex64 => 16,
        }
    }

    /// Whether values carry affine quantization parameters.
    pub fn is_quantized(self) -> bool {
        matches!(
            self,
            DType::QInt8 | DType::QUInt8 | DType::QInt32 | DType::QUInt4x2 | DType::QUInt2x4
        )
    }

    /// Whether one storage byte packs more than one logical value.
    pub fn is_sub_byte(self) -> bool {
        matches!(self, DType::QUInt4x2 | DType::QUInt2x4)
    }

    /// Logical values packed into one storage unit.
    pub fn values_per_unit(self) -> usize {
        match self {
            DType::QUInt4x2 => 2,
            DType::QUInt2x4 => 4,
            _ => 1,
        }
    }
}

macro_rules! impl_element {
    ($($t:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$tag;
            }
        )*
    };
}

impl_element!(
    bool => Bool,
    u8 => U8,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f16 => F16,
    bf16 => BF16,
    f32 => F32,
    f64 => F64,
    Complex32 => Complex32,
    Complex64 => Complex64,
);

macro_rules! quantized {
    ($(#[$doc:meta] $name:ident($repr:ty)),* $(,)?) => {
        $(
            #[$doc]
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            #[repr(transparent)]
            pub struct $name(pub $repr);

            impl Element for $name {
                const DTYPE: DType = DType::$name;
            }
        )*
    };
}

quantized!(
    /// Signed 8-bit quantized value.
    QInt8(i8),
    /// Unsigned 8-bit quantized value.
    QUInt8(u8),
    /// Signed 32-bit quantized value.
    QInt32(i32),
    /// Two unsigned 4-bit values packed into one byte (low nibble first).
    QUInt4x2(u8),
    /// Four unsigned 2-bit values packed into one byte (lowest bits first).
    QUInt2x4(u8),
);

impl QUInt4x2 {
    /// Pack two 4-bit values. Upper bits of each input are discarded.
    pub fn pack(lo: u8, hi: u8) -> Self {
        Self((lo & 0x0f) | (hi & 0x0f) << 4)
    }

    /// Unpack to `[lo, hi]`.
    pub fn unpack(self) -> [u8; 2] {
        [self.0 & 0x0f, self.0 >> 4]
    }
}

impl QUInt2x4 {
    /// Pack four 2-bit values. Upper bits of each input are discarded.
    pub fn pack(values: [u8; 4]) -> Self {
        let mut byte = 0u8;
        for (i, v) in values.iter().enumerate() {
            byte |= (v & 0x03) << (2 * i);
        }
        Self(byte)
    }

    /// Unpack to four values, lowest bits first.
    pub fn unpack(self) -> [u8; 4] {
        [0, 1, 2, 3].map(|i| (self.0 >> (2 * i)) & 0x03)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_size<T: Element>() {
        assert_eq!(std::mem::size_of::<T>(), T::DTYPE.element_size(), "{:?}", T::DTYPE);
    }

    #[test]
    fn test_element_size_matches_storage() {
        assert_size::<bool>();
        assert_size::<u8>();
        assert_size::<i8>();
        assert_size::<i16>();
        assert_size::<i32>();
        assert_size::<i64>();
        assert_size::<f16>();
        assert_size::<bf16>();
        assert_size::<f32>();
        assert_size::<f64>();
        assert_size::<Complex32>();
        assert_size::<Complex64>();
        assert_size::<QInt8>();
        assert_size::<QUInt8>();
        assert_size::<QInt32>();
        assert_size::<QUInt4x2>();
        assert_size::<QUInt2x4>();
    }

    #[test]
    fn test_kind_predicates() {
        assert!(DType::QInt8.is_quantized());
        assert!(!DType::QInt8.is_sub_byte());
        assert!(DType::QUInt4x2.is_quantized());
        assert!(DType::QUInt4x2.is_sub_byte());
        assert!(!DType::F32.is_quantized());
        assert_eq!(DType::QUInt2x4.values_per_unit(), 4);
        assert_eq!(DType::I64.values_per_unit(), 1);
    }

    #[test]
    fn test_sub_byte_packing() {
        let q = QUInt4x2::pack(0x3, 0xa);
        assert_eq!(q.0, 0xa3);
        assert_eq!(q.unpack(), [0x3, 0xa]);

        let q = QUInt2x4::pack([1, 2, 3, 0]);
        assert_eq!(q.0, 0b00_11_10_01);
        assert_eq!(q.unpack(), [1, 2, 3, 0]);
    }
}
