// Autoregressive multi-step forecasting.
//
// Each prediction is appended to the working buffer and becomes part of the
// next input window, so errors compound with the horizon.

use stockcast_core::error::{Result, StockcastError};
use stockcast_core::traits::PriceModel;

/// Roll `model` forward `steps` times over the trailing `window_size` values.
///
/// Operates in the model's own numeric space; callers normalize and
/// denormalize around it. Returns only the predicted values, oldest first.
/// `window_size` must not exceed `series.len()`.
pub fn extended_forecast(
    model: &dyn PriceModel,
    series: &[f64],
    window_size: usize,
    steps: usize,
) -> Result<Vec<f64>> {
    if steps == 0 {
        return Ok(Vec::new());
    }
    if window_size == 0 || window_size > series.len() {
        return Err(StockcastError::InsufficientHistory {
            window: window_size,
            available: series.len(),
        });
    }

    let mut buffer = Vec::with_capacity(window_size + steps);
    buffer.extend_from_slice(&series[series.len() - window_size..]);

    for _ in 0..steps {
        let input = &buffer[buffer.len() - window_size..];
        let next = model.predict(input)?;
        if !next.is_finite() {
            return Err(StockcastError::ModelError(format!(
                "{} produced a non-finite prediction",
                model.name()
            )));
        }
        buffer.push(next);
    }

    tracing::debug!(model = model.name(), window_size, steps, "Forecast rollout complete");
    Ok(buffer.split_off(window_size))
}
