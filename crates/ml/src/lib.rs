pub mod forecast;
pub mod gbdt_inference;
pub mod kmeans;
pub mod model;
pub mod scaler;
#[cfg(feature = "onnx")]
pub mod onnx_inference;

pub use forecast::extended_forecast;
pub use gbdt_inference::GbdtModel;
pub use kmeans::{silhouette_score, KMeans, KMeansConfig};
pub use model::{load_model, ModelOptions};
pub use scaler::{MinMaxScaler, StandardScaler};
