pub mod client;
pub mod common;
pub mod utils;

pub use client::config::ClientConfig;
pub use client::error::{ApiError, ApiResult};
pub use client::services::api_client::{ApiClient, Body, Payload, RequestOptions};
pub use client::utils::session_store::{SessionHandle, SessionStore};
