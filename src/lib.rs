pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
pub use repositories::DeviceRegistry;
pub use services::{DeviceService, ResultSynthesizer};
