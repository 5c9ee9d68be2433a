use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::debug;

use crate::config::HeaderProfile;
use crate::error::{AppError, FetchError, Result};

/// Single-attempt page fetcher. Retries are the scheduler's next tick.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    /// Builds the client once at startup; an invalid header profile is a
    /// configuration error.
    pub fn new(profile: &HeaderProfile, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(header_map(profile)?)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    /// GET `url` once. Non-2xx, transport failure, timeout and an empty body
    /// are all failures.
    pub async fn fetch(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        debug!(url, bytes = body.len(), "fetched source page");
        Ok(body)
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e)
        }
    }
}

fn header_map(profile: &HeaderProfile) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value(&profile.user_agent)?);
    headers.insert(ACCEPT, header_value(&profile.accept)?);
    headers.insert(ACCEPT_LANGUAGE, header_value(&profile.accept_language)?);

    for (name, value) in &profile.extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::Config(format!("invalid header name '{name}': {e}")))?;
        headers.insert(name, header_value(value)?);
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Config(format!("invalid header value '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap as AxumHeaders, http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn fetcher(timeout: Duration) -> Fetcher {
        Fetcher::new(&HeaderProfile::default(), timeout).unwrap()
    }

    #[tokio::test]
    async fn returns_body_and_sends_header_profile() {
        let app = Router::new().route(
            "/page",
            get(|headers: AxumHeaders| async move {
                headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );
        let base = serve(app).await;

        let body = fetcher(Duration::from_secs(5)).fetch(&format!("{base}/page")).await.unwrap();
        assert!(String::from_utf8_lossy(&body).starts_with("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route("/page", get(|| async { (StatusCode::FORBIDDEN, "blocked") }));
        let base = serve(app).await;

        let err = fetcher(Duration::from_secs(5)).fetch(&format!("{base}/page")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s == StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let app = Router::new().route("/page", get(|| async { "" }));
        let base = serve(app).await;

        let err = fetcher(Duration::from_secs(5)).fetch(&format!("{base}/page")).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let app = Router::new().route(
            "/page",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let base = serve(app).await;

        let err = fetcher(Duration::from_millis(100)).fetch(&format!("{base}/page")).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[test]
    fn invalid_extra_header_is_a_config_error() {
        let profile = HeaderProfile {
            extra: vec![("bad header".to_string(), "x".to_string())],
            ..HeaderProfile::default()
        };
        assert!(matches!(
            Fetcher::new(&profile, Duration::from_secs(1)),
            Err(AppError::Config(_))
        ));
    }
}
