pub mod audit;
pub mod auth;
pub mod capture;
pub mod config;
pub mod error;
pub mod matcher;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

pub use error::Error;

// Re-export vision types for convenience
pub use facegate_vision::{Embedding, EncodeError, FaceEncoder, OnnxEncoder};
