// ONNX Runtime inference for exported forecasting networks.
//
// Uses the `ort` crate to run Keras/PyTorch models converted to ONNX
// (dense, LSTM, GRU) directly in Rust.
//
// This module is only compiled when the `onnx` feature is enabled.
// Enable with: cargo build --features onnx

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array3};
use ort::session::Session;
use ort::value::Tensor;

use stockcast_core::error::{Result, StockcastError};
use stockcast_core::traits::PriceModel;

/// Single-output regression network loaded from an `.onnx` file.
pub struct OnnxModel {
    session: Mutex<Session>,
    /// Feed `[1, W, 1]` (sequence models) instead of `[1, W]`.
    recurrent_input: bool,
}

impl OnnxModel {
    pub fn load<P: AsRef<Path>>(path: P, recurrent_input: bool) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StockcastError::ArtifactNotFound(format!("model {}", path.display())));
        }
        let session = Session::builder()
            .map_err(|e| StockcastError::ModelError(format!("Session builder: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| StockcastError::ModelError(format!("Load ONNX: {}", e)))?;

        tracing::info!("ONNX model loaded from {} (recurrent_input={})", path.display(), recurrent_input);

        Ok(Self {
            session: Mutex::new(session),
            recurrent_input,
        })
    }

    fn run(&self, window: &[f32]) -> Result<f64> {
        let n = window.len();
        let tensor = if self.recurrent_input {
            let input = Array3::from_shape_vec((1, n, 1), window.to_vec())
                .map_err(|e| StockcastError::ModelError(format!("Array shape: {}", e)))?;
            Tensor::from_array(input)
        } else {
            let input = Array2::from_shape_vec((1, n), window.to_vec())
                .map_err(|e| StockcastError::ModelError(format!("Array shape: {}", e)))?;
            Tensor::from_array(input)
        }
        .map_err(|e| StockcastError::ModelError(format!("Tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| StockcastError::ModelError("ONNX session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| StockcastError::ModelError(format!("Run: {}", e)))?;

        // Regression head: first element of the first output, [1, 1] or [1].
        if let Ok(view) = outputs[0].try_extract_array::<f32>() {
            if let Some(v) = view.iter().next() {
                return Ok(*v as f64);
            }
        }
        if let Ok(view) = outputs[0].try_extract_array::<f64>() {
            if let Some(v) = view.iter().next() {
                return Ok(*v);
            }
        }

        Err(StockcastError::ModelError("cannot extract prediction from ONNX output".into()))
    }
}

impl PriceModel for OnnxModel {
    fn name(&self) -> &str {
        "onnx"
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        let input: Vec<f32> = window.iter().map(|v| *v as f32).collect();
        self.run(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = OnnxModel::load("/nonexistent/model.onnx", false).err().unwrap();
        assert!(matches!(err, StockcastError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_load_onnx_if_exists() {
        let path = "../../stock_model/AAPL/model.onnx";
        if !Path::new(path).exists() {
            return;
        }
        let model = OnnxModel::load(path, false).unwrap();
        let pred = model.predict(&[0.5; 4]);
        assert!(pred.is_ok(), "Prediction failed: {:?}", pred.err());
    }
}
