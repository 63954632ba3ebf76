pub mod error;
pub mod models;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{Result, StockcastError};
pub use models::{Bar, Fundamentals, PricePoint, PriceSeries};
pub use traits::{ArtifactSource, MarketDataProvider, PriceModel};
pub use types::{ArtifactPaths, RiskLabel};
