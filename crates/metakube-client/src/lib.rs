//! Typed client for the MetaKube managed Kubernetes API
//!
//! - [`models`]: request and response bodies
//! - [`MetakubeApi`]: the operations the provider calls, one HTTP round trip each
//! - [`HttpClient`]: bearer-token authenticated reqwest implementation
//! - [`ApiError`]: failure of a single call, keeping status and error body
//! - [`patch`]: JSON merge patch construction

pub mod api;
pub mod error;
pub mod http;
pub mod models;
pub mod patch;

pub use api::{ApiResult, MetakubeApi};
#[cfg(any(test, feature = "mock"))]
pub use api::MockMetakubeApi;
pub use error::{ApiError, ErrorDetails, ErrorResponse};
pub use http::HttpClient;
