pub mod artifacts;
pub mod series;
pub mod yahoo;

pub use artifacts::{
    build_artifact_source, load_artifacts, LocalArtifactSource, ObjectStoreArtifactSource,
    TickerArtifacts,
};
pub use series::{parse_price_csv, read_price_csv};
pub use yahoo::YahooClient;
