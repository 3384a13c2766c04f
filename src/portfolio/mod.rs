//! Portfolio REST API integration: health check, document bundle, structured lookups.

pub mod client;
pub mod types;

pub use client::{PortfolioApi, PortfolioClient};
pub use types::{Lookup, PortfolioApiError};
