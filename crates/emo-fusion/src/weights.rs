//! Weight file access.
//!
//! Weights are a single safetensors file. The convolution towers and the
//! fusion head read `F32` tensors into ndarray with [`TensorStore::take`];
//! the text encoder reads the same buffer through a candle `VarBuilder`.

use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use ndarray::{Array, Dimension, IxDyn};
use safetensors::{Dtype, SafeTensorError, SafeTensors};
use tracing::debug;

use crate::error::{FusionError, FusionResult};

/// Validated safetensors buffer.
#[derive(Debug, Clone)]
pub struct TensorStore {
    bytes: Vec<u8>,
}

impl TensorStore {
    pub fn load(path: impl AsRef<Path>) -> FusionResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| FusionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    /// Parse and validate the header; tensor data is decoded lazily.
    pub fn from_bytes(bytes: Vec<u8>) -> FusionResult<Self> {
        let count = SafeTensors::deserialize(&bytes)?.len();
        debug!(tensors = count, bytes = bytes.len(), "Parsed weight file header");
        Ok(Self { bytes })
    }

    fn tensors(&self) -> FusionResult<SafeTensors<'_>> {
        Ok(SafeTensors::deserialize(&self.bytes)?)
    }

    pub fn len(&self) -> usize {
        self.tensors().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a tensor, checking dtype and shape.
    pub fn take<D: Dimension>(&self, name: &str, expected: &[usize]) -> FusionResult<Array<f32, D>> {
        let tensors = self.tensors()?;
        let view = tensors.tensor(name).map_err(|e| match e {
            SafeTensorError::TensorNotFound(_) => FusionError::MissingTensor(name.to_string()),
            other => FusionError::Safetensors(other),
        })?;

        if view.dtype() != Dtype::F32 {
            return Err(FusionError::UnsupportedDtype {
                name: name.to_string(),
                dtype: format!("{:?}", view.dtype()),
            });
        }
        if view.shape() != expected {
            return Err(FusionError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: view.shape().to_vec(),
            });
        }

        let values: Vec<f32> = view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Array::from_shape_vec(IxDyn(expected), values)
            .and_then(|a| a.into_dimensionality::<D>())
            .map_err(|e| FusionError::ShapeMismatch {
                name: format!("{} ({})", name, e),
                expected: expected.to_vec(),
                actual: view.shape().to_vec(),
            })
    }

    /// Hand the buffer to candle for the text encoder.
    pub fn into_var_builder(self, device: &Device) -> FusionResult<VarBuilder<'static>> {
        Ok(VarBuilder::from_buffered_safetensors(self.bytes, DType::F32, device)?)
    }
}

/// Serialize `F32` tensors to safetensors bytes.
#[cfg(any(test, feature = "test-support"))]
pub fn serialize_tensors<'a, I>(tensors: I) -> FusionResult<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [usize], &'a [f32])>,
{
    use safetensors::tensor::TensorView;

    let encoded: Vec<(&str, Vec<usize>, Vec<u8>)> = tensors
        .into_iter()
        .map(|(name, shape, values)| {
            let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            (name, shape.to_vec(), bytes)
        })
        .collect();

    let views = encoded
        .iter()
        .map(|(name, shape, bytes)| Ok((*name, TensorView::new(Dtype::F32, shape.clone(), bytes)?)))
        .collect::<FusionResult<Vec<_>>>()?;

    Ok(safetensors::serialize(views, &None)?)
}
