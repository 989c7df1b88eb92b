//! Shared `reqwest` client construction for the three upstream clients.

use std::time::Duration;

/// Builds the shared HTTP client used by all upstream clients. One client is
/// constructed per process and shared (it pools connections internally).
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client configuration is always valid")
}
