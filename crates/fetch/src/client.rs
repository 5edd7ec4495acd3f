use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::error::FetchError;

/// Connect and idle-read bound for origin calls, also the deadline for the
/// HEAD probe.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Client builder preloaded with browser-like headers.
///
/// `timeout` bounds connecting and each read; body transfers run as long as
/// bytes keep arriving. Some file hosts refuse requests that do not look
/// like a browser.
pub fn http_client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .connect_timeout(timeout)
        .read_timeout(timeout)
}

/// Builds the shared origin client.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    Ok(http_client_builder(timeout).build()?)
}
