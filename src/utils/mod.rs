//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Extract the host of a URL string, dropping a leading `www.`.
pub fn stream_host(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}
