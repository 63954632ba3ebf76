use std::path::Path;

use stockcast_core::error::{Result, StockcastError};
use stockcast_core::traits::PriceModel;

use crate::gbdt_inference::GbdtModel;

/// Backend-specific loading options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOptions {
    pub onnx_recurrent_input: bool,
}

/// Load a forecasting model, choosing the backend by file extension.
///
/// `.txt` / `.model` → native GBDT, `.onnx` → ONNX Runtime (needs the `onnx` feature).
pub fn load_model(path: &Path, options: ModelOptions) -> Result<Box<dyn PriceModel>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "model" => Ok(Box::new(GbdtModel::load(path)?)),
        "onnx" => load_onnx(path, options),
        other => Err(StockcastError::ModelError(format!(
            "unsupported model format '{}' for {}",
            other,
            path.display()
        ))),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, options: ModelOptions) -> Result<Box<dyn PriceModel>> {
    let model = crate::onnx_inference::OnnxModel::load(path, options.onnx_recurrent_input)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path, _options: ModelOptions) -> Result<Box<dyn PriceModel>> {
    Err(StockcastError::ModelError(format!(
        "{} is an ONNX model but this build lacks the `onnx` feature",
        path.display()
    )))
}
