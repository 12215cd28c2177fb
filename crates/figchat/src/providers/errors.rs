use reqwest::header::HeaderMap;
use thiserror::Error;

/// Failures reported by the upstream model API before or while streaming.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered 429. Header values are copied verbatim so they can be
    /// relayed to the caller.
    #[error("Rate limited by model provider")]
    RateLimited {
        retry_after: Option<String>,
        limit: Option<String>,
        remaining: Option<String>,
        reset: Option<String>,
    },

    #[error("Model provider request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model provider stream interrupted: {0}")]
    Stream(String),
}

impl ProviderError {
    pub fn rate_limited(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        ProviderError::RateLimited {
            retry_after: header("retry-after"),
            limit: header("x-ratelimit-limit"),
            remaining: header("x-ratelimit-remaining"),
            reset: header("x-ratelimit-reset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_rate_limited_copies_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("12"));
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("100"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));

        match ProviderError::rate_limited(&headers) {
            ProviderError::RateLimited {
                retry_after,
                limit,
                remaining,
                reset,
            } => {
                assert_eq!(retry_after.as_deref(), Some("12"));
                assert_eq!(limit.as_deref(), Some("100"));
                assert_eq!(remaining.as_deref(), Some("0"));
                assert_eq!(reset, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
