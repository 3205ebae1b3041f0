use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

// max body bytes kept for matching
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// region:        --- Models

#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub target: String,
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Hosts reached beyond the requested one, i.e. the final host of a
    /// redirect chain. Never holds the requested host itself.
    pub host_aliases: Vec<String>,
}

impl ProbeResult {
    pub fn is_success_or_redirect(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Per-target failure, never fatal for the scan.
#[derive(Debug)]
pub enum ProbeError {
    InvalidUrl(String),
    Request(reqwest::Error),
    Status(u16),
}

impl core::fmt::Display for ProbeError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            ProbeError::InvalidUrl(url) => write!(fmt, "malformed url {:?}", url),
            ProbeError::Request(err) if err.is_timeout() => write!(fmt, "timed out: {}", err),
            ProbeError::Request(err) => write!(fmt, "request failed: {}", err),
            ProbeError::Status(status) => write!(fmt, "unexpected status {}", status),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::Request(err)
    }
}

// endregion:     --- Models

// region:        --- Probers

#[async_trait]
pub trait Prober: Send + Sync {
    /// Sends one request for `target` at `url` (already validated).
    async fn probe(&self, target: &str, url: &str) -> Result<ProbeResult, ProbeError>;
}

pub struct HttpProber {
    http_client: Client,
}

impl HttpProber {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    /// `accept_invalid_certs` lets https probes reach hosts serving a
    /// certificate for another name, like an unclaimed custom domain.
    pub fn with_options(timeout: Duration, accept_invalid_certs: bool) -> reqwest::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        debug!("HTTP Client created: {:?}", http_client);
        Ok(Self::new(http_client))
    }
}

#[async_trait]
impl Prober for HttpProber {
    #[instrument(name = "probe", level = "debug", skip_all, fields(url = url))]
    async fn probe(&self, target: &str, url: &str) -> Result<ProbeResult, ProbeError> {
        let mut res = self.http_client.get(url).send().await?;
        let status = res.status().as_u16();
        debug!("Receive with status: {}", status);

        let requested_host = Url::parse(url).ok().and_then(|u| u.host_str().map(String::from));
        let host_aliases = match res.url().host_str() {
            Some(host) if requested_host.as_deref() != Some(host) => vec![host.to_string()],
            _ => Vec::new(),
        };

        // read the body in chunks so a huge page can't exhaust memory
        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await? {
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ProbeResult {
            target: target.to_string(),
            url: url.to_string(),
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
            host_aliases,
        })
    }
}

// endregion:     --- Probers

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn records_the_redirect_target_host() {
        let mock_server = MockServer::start().await;
        let landing = format!("http://localhost:{}/landing", mock_server.address().port());
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", landing.as_str()))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&mock_server)
            .await;

        let prober = HttpProber::with_options(Duration::from_secs(5), false).unwrap();
        let result = prober.probe("local", &mock_server.uri()).await.unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.body, "moved");
        assert_eq!(result.host_aliases, vec!["localhost".to_string()]);
    }

    #[test]
    fn builds_client_accepting_invalid_certs() {
        assert!(HttpProber::with_options(Duration::from_secs(1), true).is_ok());
    }

    #[tokio::test]
    async fn captures_status_body_and_host() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<h1>NoSuchBucket</h1>"))
            .mount(&mock_server)
            .await;

        let prober = HttpProber::with_options(Duration::from_secs(5), false).unwrap();
        let url = mock_server.uri();
        let result = prober.probe("local", &url).await.unwrap();

        assert_eq!(result.status, 404);
        assert!(!result.is_success_or_redirect());
        assert_eq!(result.body, "<h1>NoSuchBucket</h1>");
        // the requested host is not an alias of itself
        assert!(result.host_aliases.is_empty());
    }

    #[tokio::test]
    async fn truncates_large_bodies() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a".repeat(MAX_BODY_BYTES + 10)))
            .mount(&mock_server)
            .await;

        let prober = HttpProber::with_options(Duration::from_secs(5), false).unwrap();
        let result = prober.probe("local", &mock_server.uri()).await.unwrap();

        assert_eq!(result.body.len(), MAX_BODY_BYTES);
    }

    #[tokio::test]
    async fn slow_host_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let prober = HttpProber::with_options(Duration::from_millis(200), false).unwrap();
        let err = prober.probe("local", &mock_server.uri()).await.unwrap_err();

        assert!(matches!(err, ProbeError::Request(ref err) if err.is_timeout()));
    }
}
