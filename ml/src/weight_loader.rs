use crate::WeightPrecision;
use ndarray::{Array, ArrayBase, Dimension, ShapeError, StrideShape};
use ndarray_npy::{NpzReader, ReadNpzError};
use serde_json::{self, Map, Value};
use std::io::{Cursor, Read, Seek};
use std::{fs, path::Path};
use thiserror::Error;

type WeightResult<T> = Result<T, WeightError>;

#[derive(Error, Debug)]
pub enum WeightError {
    #[error("No weights with name {0} found")]
    WeightKeyError(String),
    #[error("Weight file didn't have the correct format (required: JSON dict of pairs (key, flattened array of weights))")]
    WeightFormatError,
    #[error("Weight file not found. Filesystem reported error\n {0}.")]
    WeightFileNotFoundError(#[from] std::io::Error),
    #[error("Weight file not readable. Filesystem reported error\n {0}.")]
    WeightFileNpzError(#[from] ReadNpzError),
    #[error("Wrong shape for weight:\n {0}.")]
    WeightShapeError(#[from] ShapeError),
    #[error("Weight {0} stored with shape {2:?}, expected {1:?}")]
    WeightDimensionError(String, Vec<usize>, Vec<usize>),
    #[error("Requested feature stack depth {0}, architecture table has {1} layers")]
    WeightDepthError(usize, usize),
}

/// Backend-agnostic access to named weight tensors. The feature stack is
/// built against this trait so tests can feed it hand-written JSON weights
/// while production runs load npz exports.
pub trait WeightLoader {
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>;
}

pub struct JsonWeightLoader {
    content: Map<String, Value>,
}

impl JsonWeightLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> WeightResult<JsonWeightLoader> {
        let raw_file = fs::read_to_string(path)?;
        JsonWeightLoader::from_content(&raw_file)
    }

    pub fn from_content(raw: &str) -> WeightResult<JsonWeightLoader> {
        let parsed: Value =
            serde_json::from_str(raw).map_err(|_| WeightError::WeightFormatError)?;
        let content = parsed
            .as_object()
            .ok_or(WeightError::WeightFormatError)?
            .clone();
        Ok(JsonWeightLoader { content })
    }
}

impl WeightLoader for JsonWeightLoader {
    /// Returns weights with the given name from the weight loader. Weights are stored in a
    /// FLATTENED form (to facilitate working with JSON, as then all arrays have the same length)
    /// and reshaped on the way out.
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>,
    {
        let raw_arr = self
            .content
            .get(param_name)
            .ok_or_else(|| WeightError::WeightKeyError(param_name.to_string()))?;

        let raw_value_vector = match raw_arr {
            Value::Array(v) => v,
            _ => return Err(WeightError::WeightFormatError),
        };

        let weight_vector: Result<Vec<_>, _> = raw_value_vector
            .iter()
            .map(|j| {
                j.as_f64()
                    .map(|v| v as f32)
                    .ok_or(WeightError::WeightFormatError)
            })
            .collect();

        let weights = Array::from_shape_vec(shape, weight_vector?)?;

        Ok(weights)
    }
}

pub struct NpzWeightLoader<R>
where
    R: Seek + Read,
{
    handle: R,
}

impl NpzWeightLoader<std::fs::File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> WeightResult<NpzWeightLoader<std::fs::File>> {
        let handle = std::fs::File::open(path)?;
        Ok(NpzWeightLoader { handle })
    }
}

impl NpzWeightLoader<Cursor<&[u8]>> {
    pub fn from_buffer(bytes_array: &[u8]) -> WeightResult<NpzWeightLoader<Cursor<&[u8]>>> {
        Ok(NpzWeightLoader {
            handle: Cursor::new(bytes_array),
        })
    }
}

impl<R> WeightLoader for NpzWeightLoader<R>
where
    R: Seek + Read,
{
    fn get_weight<D, Sh>(
        &mut self,
        param_name: &str,
        shape: Sh,
    ) -> WeightResult<Array<WeightPrecision, D>>
    where
        D: Dimension,
        Sh: Into<StrideShape<D>>,
    {
        // The reader in the npy package has to be mut, so we recreate it per
        // lookup instead of making get_weight take the loader apart.
        let mut reader = NpzReader::new(&mut self.handle)?;

        let arr: ArrayBase<_, D> = reader.by_name(param_name)?;

        let expected: StrideShape<D> = shape.into();
        if &arr.raw_dim() != expected.raw_dim() {
            return Err(WeightError::WeightDimensionError(
                param_name.to_string(),
                expected.raw_dim().slice().to_vec(),
                arr.raw_dim().slice().to_vec(),
            ));
        }
        Ok(arr)
    }
}
