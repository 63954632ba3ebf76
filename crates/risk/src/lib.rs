pub mod features;
pub mod indicators;
pub mod labels;
pub mod system;

pub use features::{FeatureRow, FEATURE_NAMES};
pub use labels::{label_clusters, ClusterProfile};
pub use system::StockClusteringSystem;
