//! Dynamically typed arrays.
//!
//! [`Tensor`] holds one [`StridedArray`] of any supported element kind and
//! forwards every operation to the typed implementation after a single match
//! on the storage tag. Quantized kinds keep their [`QuantParams`] through every
//! operation; the kernels never look at them.
//!
//! Sub-byte kinds ([`QUInt4x2`], [`QUInt2x4`]) are moved one storage byte at a
//! time. The values packed inside a byte keep their relative order.

use half::{bf16, f16};
use num_complex::{Complex32, Complex64};

use crate::element::{DType, Element, QInt32, QInt8, QUInt2x4, QUInt4x2, QUInt8};
use crate::ops::{self, FlipConfig};
use crate::view::StridedArray;
use crate::{Result, StridedError};

/// Affine quantization parameters: `real = scale * (q - zero_point)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f64,
    pub zero_point: i64,
}

impl QuantParams {
    pub fn new(scale: f64, zero_point: i64) -> Self {
        Self { scale, zero_point }
    }
}

/// Typed backing array of a [`Tensor`], one variant per [`DType`].
#[derive(Debug, Clone)]
pub enum Storage {
    Bool(StridedArray<bool>),
    U8(StridedArray<u8>),
    I8(StridedArray<i8>),
    I16(StridedArray<i16>),
    I32(StridedArray<i32>),
    I64(StridedArray<i64>),
    F16(StridedArray<f16>),
    BF16(StridedArray<bf16>),
    F32(StridedArray<f32>),
    F64(StridedArray<f64>),
    Complex32(StridedArray<Complex32>),
    Complex64(StridedArray<Complex64>),
    QInt8(StridedArray<QInt8>),
    QUInt8(StridedArray<QUInt8>),
    QInt32(StridedArray<QInt32>),
    QUInt4x2(StridedArray<QUInt4x2>),
    QUInt2x4(StridedArray<QUInt2x4>),
}

/// Evaluate `$body` with `$a` bound to the typed array, whatever its kind.
macro_rules! match_storage {
    ($storage:expr, |$a:ident| $body:expr) => {
        match $storage {
            Storage::Bool($a) => $body,
            Storage::U8($a) => $body,
            Storage::I8($a) => $body,
            Storage::I16($a) => $body,
            Storage::I32($a) => $body,
            Storage::I64($a) => $body,
            Storage::F16($a) => $body,
            Storage::BF16($a) => $body,
            Storage::F32($a) => $body,
            Storage::F64($a) => $body,
            Storage::Complex32($a) => $body,
            Storage::Complex64($a) => $body,
            Storage::QInt8($a) => $body,
            Storage::QUInt8($a) => $body,
            Storage::QInt32($a) => $body,
            Storage::QUInt4x2($a) => $body,
            Storage::QUInt2x4($a) => $body,
        }
    };
}

/// Run a typed operation on a tensor and rewrap the resulting array.
///
/// `$body` must evaluate to a `StridedArray` of the same element type as `$a`.
/// Plain kinds produce a tensor without quantization parameters; quantized and
/// sub-byte kinds copy the input's parameters into the result.
macro_rules! dispatch_storage {
    (@arms $tensor:ident, $a:ident, $body:expr,
        plain: [$($plain:ident),*],
        quantized: [$($quant:ident),*]) => {
        match &$tensor.storage {
            $(
                Storage::$plain($a) => Tensor {
                    storage: Storage::$plain($body),
                    quant: None,
                },
            )*
            $(
                Storage::$quant($a) => Tensor {
                    storage: Storage::$quant($body),
                    quant: $tensor.quant,
                },
            )*
        }
    };
    ($tensor:expr, |$a:ident| $body:expr) => {{
        let tensor: &Tensor = $tensor;
        tracing::debug!(dtype = ?tensor.dtype(), shape = ?tensor.dims(), "dispatch");
        dispatch_storage!(
            @arms tensor, $a, $body,
            plain: [Bool, U8, I8, I16, I32, I64, F16, BF16, F32, F64, Complex32, Complex64],
            quantized: [QInt8, QUInt8, QInt32, QUInt4x2, QUInt2x4]
        )
    }};
}

fn dtype_of<T: Element>(_: &StridedArray<T>) -> DType {
    T::DTYPE
}

impl Storage {
    pub fn dtype(&self) -> DType {
        match_storage!(self, |a| dtype_of(a))
    }

    pub fn dims(&self) -> &[usize] {
        match_storage!(self, |a| a.dims())
    }

    pub fn strides(&self) -> &[isize] {
        match_storage!(self, |a| a.strides())
    }
}

/// Element types that have a [`Storage`] variant.
pub trait StorageElement: Element {
    fn into_storage(array: StridedArray<Self>) -> Storage;

    /// The typed array, if `storage` holds this element type.
    fn from_storage(storage: &Storage) -> Option<&StridedArray<Self>>;
}

macro_rules! impl_storage_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl StorageElement for $t {
                fn into_storage(array: StridedArray<Self>) -> Storage {
                    Storage::$variant(array)
                }

                fn from_storage(storage: &Storage) -> Option<&StridedArray<Self>> {
                    match storage {
                        Storage::$variant(a) => Some(a),
                        _ => None,
                    }
                }
            }

            impl From<StridedArray<$t>> for Storage {
                fn from(array: StridedArray<$t>) -> Self {
                    Storage::$variant(array)
                }
            }
        )*
    };
}

impl_storage_element!(
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
    QInt8 => QInt8,
    QUInt8 => QUInt8,
    QInt32 => QInt32,
    QUInt4x2 => QUInt4x2,
    QUInt2x4 => QUInt2x4,
);

/// An array whose element kind is known only at run time.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: Storage,
    quant: Option<QuantParams>,
}

impl Tensor {
    /// Wrap a typed array without quantization parameters.
    pub fn new<T: StorageElement>(array: StridedArray<T>) -> Self {
        Self {
            storage: T::into_storage(array),
            quant: None,
        }
    }

    /// Wrap a quantized array together with its parameters.
    ///
    /// Fails with [`StridedError::NotQuantized`] for plain element kinds.
    pub fn quantized<T: StorageElement>(array: StridedArray<T>, params: QuantParams) -> Result<Self> {
        if !T::DTYPE.is_quantized() {
            return Err(StridedError::NotQuantized(T::DTYPE));
        }
        Ok(Self {
            storage: T::into_storage(array),
            quant: Some(params),
        })
    }

    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[inline]
    pub fn into_storage(self) -> Storage {
        self.storage
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        self.storage.dims()
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.storage.strides()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims().len()
    }

    /// Number of storage units (bytes for sub-byte kinds).
    #[inline]
    pub fn len(&self) -> usize {
        self.dims().iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn quant_params(&self) -> Option<QuantParams> {
        self.quant
    }

    /// Borrow the typed array. Fails if `T` is not this tensor's kind.
    pub fn as_array<T: StorageElement>(&self) -> Result<&StridedArray<T>> {
        T::from_storage(&self.storage).ok_or(StridedError::DTypeMismatch {
            expected: T::DTYPE,
            actual: self.dtype(),
        })
    }

    /// Elements in row-major logical order.
    pub fn to_vec<T: StorageElement>(&self) -> Result<Vec<T>> {
        Ok(self.as_array::<T>()?.to_vec())
    }

    /// See [`ops::flip`].
    pub fn flip(&self, dims: &[isize]) -> Result<Tensor> {
        self.flip_with(dims, &FlipConfig::default())
    }

    /// See [`ops::flip_with`].
    pub fn flip_with(&self, dims: &[isize], config: &FlipConfig) -> Result<Tensor> {
        Ok(dispatch_storage!(self, |a| ops::flip_with(&a.view(), dims, config)?))
    }

    /// See [`ops::rot90`].
    pub fn rot90(&self, k: i64, dims: &[isize]) -> Result<Tensor> {
        Ok(dispatch_storage!(self, |a| ops::rot90(&a.view(), k, dims)?))
    }

    /// See [`ops::fliplr`].
    pub fn fliplr(&self) -> Result<Tensor> {
        Ok(dispatch_storage!(self, |a| ops::fliplr(&a.view())?))
    }

    /// See [`ops::flipud`].
    pub fn flipud(&self) -> Result<Tensor> {
        Ok(dispatch_storage!(self, |a| ops::flipud(&a.view())?))
    }

    /// See [`ops::roll`].
    pub fn roll(&self, shifts: &[i64], dims: &[isize]) -> Result<Tensor> {
        Ok(dispatch_storage!(self, |a| ops::roll(&a.view(), shifts, dims)?))
    }
}

impl<T: StorageElement> From<StridedArray<T>> for Tensor {
    fn from(array: StridedArray<T>) -> Self {
        Tensor::new(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::FlipStrategy;

    fn arange<T: StorageElement>(dims: &[usize], f: impl Fn(usize) -> T) -> StridedArray<T> {
        let len: usize = dims.iter().product();
        StridedArray::from_vec((0..len).map(f).collect(), dims).unwrap()
    }

    #[test]
    fn test_dtype_and_shape() {
        let t = Tensor::new(arange(&[2, 3], |i| i as f32));
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.dims(), &[2, 3]);
        assert_eq!(t.strides(), &[3, 1]);
        assert_eq!(t.len(), 6);
        assert!(t.quant_params().is_none());
    }

    #[test]
    fn test_typed_access_checks_kind() {
        let t = Tensor::new(arange(&[3], |i| i as i64));
        assert_eq!(t.to_vec::<i64>().unwrap(), vec![0, 1, 2]);
        assert_eq!(
            t.as_array::<i32>().unwrap_err(),
            StridedError::DTypeMismatch {
                expected: DType::I32,
                actual: DType::I64
            }
        );
    }

    #[test]
    fn test_flip_dispatches_by_kind() {
        let t = Tensor::new(arange(&[2, 3], |i| f16::from_f32(i as f32)));
        let f = t.flip(&[1]).unwrap();
        assert_eq!(f.dtype(), DType::F16);
        let got: Vec<f32> = f.to_vec::<f16>().unwrap().into_iter().map(f32::from).collect();
        assert_eq!(got, vec![2.0, 1.0, 0.0, 5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_complex_flip() {
        let t = Tensor::new(arange(&[3], |i| Complex64::new(i as f64, -(i as f64))));
        let f = t.flipud().unwrap();
        assert_eq!(
            f.to_vec::<Complex64>().unwrap(),
            vec![
                Complex64::new(2.0, -2.0),
                Complex64::new(1.0, -1.0),
                Complex64::new(0.0, 0.0)
            ]
        );
    }

    #[test]
    fn test_quantized_keeps_params() {
        let params = QuantParams::new(0.5, 3);
        let t = Tensor::quantized(arange(&[2, 2], |i| QInt8(i as i8)), params).unwrap();
        for out in [
            t.flip(&[0]).unwrap(),
            t.rot90(1, &[0, 1]).unwrap(),
            t.fliplr().unwrap(),
            t.roll(&[1], &[]).unwrap(),
        ] {
            assert_eq!(out.dtype(), DType::QInt8);
            assert_eq!(out.quant_params(), Some(params));
        }
        let f = t.flip(&[0]).unwrap();
        assert_eq!(
            f.to_vec::<QInt8>().unwrap(),
            vec![QInt8(2), QInt8(3), QInt8(0), QInt8(1)]
        );
    }

    #[test]
    fn test_quantized_rejects_plain_kind() {
        let a = arange(&[2], |i| i as f32);
        assert_eq!(
            Tensor::quantized(a, QuantParams::new(1.0, 0)).unwrap_err(),
            StridedError::NotQuantized(DType::F32)
        );
    }

    #[test]
    fn test_sub_byte_moves_whole_bytes() {
        let params = QuantParams::new(0.1, 0);
        let a = StridedArray::from_vec(
            vec![
                QUInt4x2::pack(1, 2),
                QUInt4x2::pack(3, 4),
                QUInt4x2::pack(5, 6),
            ],
            &[3],
        )
        .unwrap();
        let t = Tensor::quantized(a, params).unwrap();
        let f = t.flip(&[0]).unwrap();
        assert_eq!(f.dtype(), DType::QUInt4x2);
        assert_eq!(f.quant_params(), Some(params));
        let unpacked: Vec<[u8; 2]> = f
            .to_vec::<QUInt4x2>()
            .unwrap()
            .into_iter()
            .map(QUInt4x2::unpack)
            .collect();
        assert_eq!(unpacked, vec![[5, 6], [3, 4], [1, 2]]);
    }

    #[test]
    fn test_strategies_agree_on_tensor() {
        let t = Tensor::new(arange(&[4, 5, 6], |i| i as u8));
        let direct = FlipConfig::default().with_strategy(FlipStrategy::Direct);
        let x = t.flip_with(&[0, 2], &direct).unwrap();
        let y = t.flip(&[0, 2]).unwrap();
        assert_eq!(x.to_vec::<u8>().unwrap(), y.to_vec::<u8>().unwrap());
    }

    #[test]
    fn test_errors_pass_through_dispatch() {
        let t = Tensor::new(arange(&[3], |i| i % 2 == 0));
        assert!(matches!(
            t.fliplr(),
            Err(StridedError::RankTooSmall { required: 2, actual: 1 })
        ));
        assert!(t.flip(&[1]).is_err());
        assert!(t.rot90(1, &[0, 1]).is_err());
    }
}
