pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use service::ForecastService;
pub use state::AppState;
