use crate::error::CastError;
use std::collections::BTreeMap;

/// Weight mapping: parameter name → tensor, ordered by name.
pub type WeightMap = BTreeMap<String, Tensor>;

/// Element types expressible in both file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dtype {
    Bool,
    U8,
    I8,
    U16,
    I16,
    F16,
    BF16,
    U32,
    I32,
    F32,
    F64,
    U64,
    I64,
}

impl Dtype {
    /// Bytes per element.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 | Self::F16 | Self::BF16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Canonical name, as spelled in both file formats.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::U8 => "U8",
            Self::I8 => "I8",
            Self::U16 => "U16",
            Self::I16 => "I16",
            Self::F16 => "F16",
            Self::BF16 => "BF16",
            Self::U32 => "U32",
            Self::I32 => "I32",
            Self::F32 => "F32",
            Self::F64 => "F64",
            Self::U64 => "U64",
            Self::I64 => "I64",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CastError> {
        Ok(match name {
            "BOOL" => Self::Bool,
            "U8" => Self::U8,
            "I8" => Self::I8,
            "U16" => Self::U16,
            "I16" => Self::I16,
            "F16" => Self::F16,
            "BF16" => Self::BF16,
            "U32" => Self::U32,
            "I32" => Self::I32,
            "F32" => Self::F32,
            "F64" => Self::F64,
            "U64" => Self::U64,
            "I64" => Self::I64,
            _ => return Err(CastError::UnsupportedDtype(name.to_string())),
        })
    }
}

/// A tensor as carried across conversion: dtype, shape and the raw
/// little-endian byte buffer, preserved exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tensor {
    dtype: Dtype,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl Tensor {
    /// The buffer length must equal element count × element size.
    pub fn new(dtype: Dtype, shape: Vec<usize>, data: Vec<u8>) -> Result<Self, CastError> {
        let expected = shape.iter().product::<usize>() * dtype.size();
        if data.len() != expected {
            return Err(CastError::DataLen {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    #[inline]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[test]
fn test_dtype_names() {
    const ALL: [Dtype; 13] = [
        Dtype::Bool,
        Dtype::U8,
        Dtype::I8,
        Dtype::U16,
        Dtype::I16,
        Dtype::F16,
        Dtype::BF16,
        Dtype::U32,
        Dtype::I32,
        Dtype::F32,
        Dtype::F64,
        Dtype::U64,
        Dtype::I64,
    ];
    for dtype in ALL {
        assert_eq!(Dtype::parse(dtype.name()).unwrap(), dtype);
    }
    assert!(matches!(
        Dtype::parse("Q4_0"),
        Err(CastError::UnsupportedDtype(_))
    ));
}

#[test]
fn test_tensor_len_check() {
    let data = [1.0f32, 2.0].iter().flat_map(|x| x.to_le_bytes()).collect();
    let tensor = Tensor::new(Dtype::F32, vec![2], data).unwrap();
    assert_eq!(tensor.shape(), &[2]);
    assert_eq!(tensor.data().len(), 8);

    assert!(matches!(
        Tensor::new(Dtype::F32, vec![3], vec![0; 8]),
        Err(CastError::DataLen {
            expected: 12,
            actual: 8,
        })
    ));
    // scalars have one element, zero-sized tensors none
    assert!(Tensor::new(Dtype::F64, vec![], vec![0; 8]).is_ok());
    assert!(Tensor::new(Dtype::F32, vec![0], vec![]).is_ok());
}
