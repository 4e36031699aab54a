//! The PubMed (NCBI E-utilities) client.

use crate::error::{PubMedError, Result};
use crate::rate_limit::{RateLimiter, ANONYMOUS_RATE, KEYED_RATE};
use reqwest::blocking::{Client, Response};
use std::path::PathBuf;
use std::time::Duration;

/// Default E-utilities endpoint.
pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Default Europe PMC endpoint used to render PMC PDFs.
pub const PDF_BASE_URL: &str = "https://europepmc.org";

/// Directory PDFs are written to unless configured otherwise.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Tool name reported to NCBI with every request.
const TOOL_NAME: &str = "pubmed-mcp";

/// Blocking client for PubMed.
///
/// All calls block the current thread. Async callers should run them on a
/// blocking pool (the MCP dispatcher uses `tokio::task::spawn_blocking`).
///
/// # Example
///
/// ```no_run
/// # fn example() -> pubmed_mcp::error::Result<()> {
/// let client = pubmed_mcp::PubMedClient::from_env()?;
/// for article in client.search_keywords("crispr off-target", 5)? {
///     println!("{} - {}", article.pmid, article.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PubMedClient {
    pub(crate) http: Client,
    pub(crate) api_key: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) base_url: String,
    pub(crate) pdf_base_url: String,
    pub(crate) download_dir: PathBuf,
    pub(crate) rate_limiter: RateLimiter,
}

impl PubMedClient {
    /// Create a client without an API key.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pubmed-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key: None,
            email: None,
            base_url: EUTILS_BASE_URL.to_string(),
            pdf_base_url: PDF_BASE_URL.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            rate_limiter: RateLimiter::new(ANONYMOUS_RATE),
        })
    }

    /// Create a client configured from `NCBI_API_KEY`, `NCBI_EMAIL` and
    /// `PUBMED_DOWNLOAD_DIR`. All three are optional.
    pub fn from_env() -> Result<Self> {
        let mut client = Self::new()?;
        if let Some(key) = env_non_empty("NCBI_API_KEY") {
            client = client.with_api_key(key);
        }
        if let Some(email) = env_non_empty("NCBI_EMAIL") {
            client = client.with_email(email);
        }
        if let Some(dir) = env_non_empty("PUBMED_DOWNLOAD_DIR") {
            client = client.with_download_dir(dir);
        }
        Ok(client)
    }

    /// Set the NCBI API key. Raises the rate limit to 10 requests/second.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self.rate_limiter = RateLimiter::new(KEYED_RATE);
        self
    }

    /// Set the contact email NCBI asks heavy users to provide.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Override the E-utilities base URL (useful for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the Europe PMC base URL used for PDF downloads.
    pub fn with_pdf_base_url(mut self, url: impl Into<String>) -> Self {
        self.pdf_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Directory downloaded PDFs are written to.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Override the rate limit (requests per second).
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limiter = RateLimiter::new(per_second);
        self
    }

    /// The configured download directory.
    pub fn download_dir(&self) -> &std::path::Path {
        &self.download_dir
    }

    /// GET an E-utilities endpoint (`esearch.fcgi`, `efetch.fcgi`, ...) and
    /// return the body as text.
    pub(crate) fn eutils_get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        self.rate_limiter.acquire();

        let url = format!("{}/{}", self.base_url, endpoint);
        let query = self.identified(params);

        tracing::debug!(%url, "GET");
        let response = self.http.get(&url).query(&query).send()?;
        Ok(check_status(response)?.text()?)
    }

    /// POST form parameters to an E-utilities endpoint. NCBI asks for POST
    /// when a request carries more than a few hundred ids.
    pub(crate) fn eutils_post(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        self.rate_limiter.acquire();

        let url = format!("{}/{}", self.base_url, endpoint);
        let form = self.identified(params);

        tracing::debug!(%url, "POST");
        let response = self.http.post(&url).form(&form).send()?;
        Ok(check_status(response)?.text()?)
    }

    /// Append the `tool`, `api_key` and `email` parameters NCBI uses to
    /// identify callers.
    fn identified<'a>(&'a self, params: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut all = params.to_vec();
        all.push(("tool", TOOL_NAME));
        if let Some(key) = &self.api_key {
            all.push(("api_key", key.as_str()));
        }
        if let Some(email) = &self.email {
            all.push(("email", email.as_str()));
        }
        all
    }

    /// GET an absolute URL and return the raw body.
    pub(crate) fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send()?;
        Ok(check_status(response)?.bytes()?.to_vec())
    }
}

/// Map HTTP status codes to errors, passing successful responses through.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response),
        404 => Err(PubMedError::NotFound(format!(
            "Resource not found: {}",
            response.url()
        ))),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(PubMedError::RateLimited { retry_after })
        }
        _ => {
            let body = response.text().unwrap_or_default();
            Err(PubMedError::Api {
                status,
                message: body,
            })
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl PubMedClient {
    /// Client pointed at a local mock server, with the rate limit relaxed.
    pub(crate) fn for_mock_server(base_url: &str) -> Self {
        Self::new()
            .expect("build client")
            .with_base_url(base_url)
            .with_pdf_base_url(base_url)
            .with_rate_limit(1000.0)
    }
}
