pub mod accounts;
pub mod api;
pub mod config;
pub mod error;
pub mod predictions;
pub mod scoring;
pub mod storage;
pub mod telemetry;

pub use api::credit_router;
pub use error::AppError;
