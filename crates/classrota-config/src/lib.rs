//! # Classrota Config
//!
//! Environment-driven configuration for the classrota API.
//!
//! - [`cors`]: allowed-origin list for the CORS layer
//! - [`server`]: bind addresses for the API and metrics listeners

pub mod cors;
pub mod server;

pub use cors::CorsConfig;
pub use server::ServerConfig;
