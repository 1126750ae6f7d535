pub mod chat;
pub mod config;
pub mod error;
pub mod ids;
pub mod ports;
pub mod types;

pub use error::{AppError, ErrorCode, StoreError};
