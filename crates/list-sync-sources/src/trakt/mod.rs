pub mod api;
pub mod auth;
pub mod client;
pub mod rate_limit;
pub mod types;

pub use auth::{poll_for_token, DeviceCode, DeviceFlow, DeviceFlowState, DevicePoller, PollOutcome, TokenSet};
pub use client::{ApiResponse, TraktClient, TraktCredentials, DEFAULT_BASE_URL};
pub use rate_limit::{RateLimitState, RetryPolicy};
pub use types::TraktList;
