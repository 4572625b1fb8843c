//! Container (safetensors) load/save.
//!
//! All layout work goes through the `safetensors` crate; reads map the
//! source file and copy every tensor into owned host buffers.

use crate::{
    error::CastError,
    weights::{Dtype, Tensor, WeightMap},
};
use memmap2::Mmap;
use safetensors::tensor::{Dtype as StDtype, SafeTensors, TensorView};
use std::{fs::File, path::Path};

/// Reads a container file into a weight mapping.
pub fn read(path: impl AsRef<Path>) -> Result<WeightMap, CastError> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file) }?;
    let tensors = SafeTensors::deserialize(&mmap)?;

    let mut weights = WeightMap::new();
    for (name, view) in tensors.tensors() {
        let dtype = from_st(view.dtype())?;
        let tensor = Tensor::new(dtype, view.shape().to_vec(), view.data().to_vec())?;
        weights.insert(name, tensor);
    }
    Ok(weights)
}

/// Writes a weight mapping as a container file, overwriting the destination.
pub fn write(path: impl AsRef<Path>, weights: &WeightMap) -> Result<(), CastError> {
    let views = weights
        .iter()
        .map(|(name, tensor)| {
            let view = TensorView::new(to_st(tensor.dtype()), tensor.shape().to_vec(), tensor.data())?;
            Ok((name.as_str(), view))
        })
        .collect::<Result<Vec<_>, CastError>>()?;
    safetensors::serialize_to_file(views, &None, path.as_ref())?;
    Ok(())
}

#[inline]
const fn to_st(dtype: Dtype) -> StDtype {
    match dtype {
        Dtype::Bool => StDtype::BOOL,
        Dtype::U8 => StDtype::U8,
        Dtype::I8 => StDtype::I8,
        Dtype::U16 => StDtype::U16,
        Dtype::I16 => StDtype::I16,
        Dtype::F16 => StDtype::F16,
        Dtype::BF16 => StDtype::BF16,
        Dtype::U32 => StDtype::U32,
        Dtype::I32 => StDtype::I32,
        Dtype::F32 => StDtype::F32,
        Dtype::F64 => StDtype::F64,
        Dtype::U64 => StDtype::U64,
        Dtype::I64 => StDtype::I64,
    }
}

#[inline]
fn from_st(dtype: StDtype) -> Result<Dtype, CastError> {
    Ok(match dtype {
        StDtype::BOOL => Dtype::Bool,
        StDtype::U8 => Dtype::U8,
        StDtype::I8 => Dtype::I8,
        StDtype::U16 => Dtype::U16,
        StDtype::I16 => Dtype::I16,
        StDtype::F16 => Dtype::F16,
        StDtype::BF16 => Dtype::BF16,
        StDtype::U32 => Dtype::U32,
        StDtype::I32 => Dtype::I32,
        StDtype::F32 => Dtype::F32,
        StDtype::F64 => Dtype::F64,
        StDtype::U64 => Dtype::U64,
        StDtype::I64 => Dtype::I64,
        _ => return Err(CastError::UnsupportedDtype(format!("{dtype:?}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckpt;
    use std::{collections::HashMap, ops::Range};

    fn f32_tensor(values: &[f32]) -> Tensor {
        let data = values.iter().flat_map(|x| x.to_le_bytes()).collect();
        Tensor::new(Dtype::F32, vec![values.len()], data).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");

        let mut weights = WeightMap::new();
        weights.insert("a".to_string(), f32_tensor(&[1.0, 2.0, 3.0]));
        weights.insert(
            "b".to_string(),
            Tensor::new(Dtype::U8, vec![2, 2], vec![1, 2, 3, 4]).unwrap(),
        );

        write(&path, &weights).unwrap();
        assert_eq!(read(&path).unwrap(), weights);
    }

    #[test]
    fn test_roundtrip_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.safetensors");

        write(&path, &WeightMap::new()).unwrap();
        assert!(read(&path).unwrap().is_empty());
    }

    #[derive(serde::Deserialize, Debug)]
    struct MetaJson {
        #[serde(flatten)]
        tensors: HashMap<String, TensorMeta>,
        #[serde(rename = "__metadata__", default)]
        #[allow(dead_code)]
        meta: HashMap<String, serde_json::Value>,
    }

    #[derive(serde::Deserialize, Debug)]
    struct TensorMeta {
        dtype: String,
        shape: Vec<usize>,
        data_offsets: Range<usize>,
    }

    #[test]
    fn test_written_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.safetensors");

        let mut weights = WeightMap::new();
        weights.insert("layer.weight".to_string(), f32_tensor(&[1.0, 2.0]));
        write(&path, &weights).unwrap();

        // fixed layout: u64 header length, JSON header, contiguous data
        let raw = std::fs::read(&path).unwrap();
        let (len, tail) = raw.split_at(std::mem::size_of::<u64>());
        let len = u64::from_le_bytes(len.try_into().unwrap()) as usize;
        let (meta_json, data) = tail.split_at(len);
        let meta_json = serde_json::from_slice::<MetaJson>(meta_json).unwrap();

        let tensor = &meta_json.tensors["layer.weight"];
        assert_eq!(tensor.dtype, "F32");
        assert_eq!(tensor.shape, [2]);
        assert_eq!(tensor.data_offsets, 0..8);
        let mut bytes = 1.0f32.to_le_bytes().to_vec();
        bytes.extend(2.0f32.to_le_bytes());
        assert_eq!(&data[tensor.data_offsets.clone()], bytes.as_slice());
    }

    #[test]
    fn test_truncated_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trunc.safetensors");

        std::fs::write(&path, [0xffu8; 4]).unwrap();
        assert!(matches!(read(&path), Err(CastError::SafeTensors(_))));
    }

    #[test]
    fn test_cast_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt_path = dir.path().join("model.ckpt");
        let st_path = dir.path().join("model.safetensors");
        let back_path = dir.path().join("back.ckpt");

        let mut weights = WeightMap::new();
        weights.insert("layer.weight".to_string(), f32_tensor(&[1.0, 2.0]));
        ckpt::write(&ckpt_path, &weights).unwrap();

        // checkpoint → container → checkpoint reproduces the mapping exactly
        write(&st_path, &ckpt::read(&ckpt_path).unwrap()).unwrap();
        ckpt::write(&back_path, &read(&st_path).unwrap()).unwrap();
        assert_eq!(ckpt::read(&back_path).unwrap(), weights);
    }
}
