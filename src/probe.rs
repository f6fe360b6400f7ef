//! Outbound queries to a deployment's data endpoint.

use std::collections::HashSet;
use std::error::Error as _;

use thiserror::Error;
use tracing::debug;

use crate::paths::ProbeSettings;

/// Path of the entity listing endpoint, relative to a deployment's base URL.
pub const DATA_PATH: &str = "/v0/data";

/// Queries a deployment to check it is reachable or to count its entities.
pub trait EndpointProbe {
    /// Succeeds only if `GET <url>/v0/data` answers HTTP 200.
    fn validate(&self, url: &str) -> Result<(), ProbeError>;

    /// Total number of entities the deployment declares.
    fn count_entities(
        &self,
        url: &str,
        first_page_only: bool,
        authenticate: bool,
    ) -> Result<u64, ProbeError>;
}

/// Full URL of the data endpoint for a deployment base URL.
pub fn data_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), DATA_PATH)
}

fn build_http_client(settings: &ProbeSettings) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("nexus-deployments/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.timeout)
        .build()
}

/// Entities fetched from a data endpoint, with the total the service declares.
#[derive(Debug, Clone, Default)]
pub struct DataPage {
    pub results: Vec<serde_json::Value>,
    pub total: u64,
}

/// [`EndpointProbe`] over blocking HTTP.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::blocking::Client,
    access_token: Option<String>,
}

impl HttpProbe {
    pub fn new(settings: &ProbeSettings) -> Result<Self, ProbeError> {
        let client = build_http_client(settings).map_err(ProbeError::HttpClient)?;
        Ok(Self {
            client,
            access_token: settings.access_token.clone(),
        })
    }

    /// Fetch entities from `<url>/v0/data`.
    /// Unless `first_page_only` is set, follows `links.next` until the last page.
    /// The total is the one declared by the first page. A `next` link pointing
    /// at a page already fetched is a [`ProbeError::PageCycle`].
    pub fn fetch_results(
        &self,
        url: &str,
        first_page_only: bool,
        authenticate: bool,
    ) -> Result<DataPage, ProbeError> {
        let token = if authenticate {
            Some(self.access_token.as_deref().ok_or(ProbeError::MissingToken)?)
        } else {
            None
        };

        let mut next = Some(data_url(url));
        let mut page = DataPage::default();
        let mut first = true;
        let mut visited = HashSet::new();

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.clone()) {
                return Err(ProbeError::PageCycle { url: page_url });
            }
            let body = self.get_json(&page_url, token)?;

            if first {
                page.total = body
                    .get("total")
                    .and_then(|t| t.as_u64())
                    .ok_or_else(|| ProbeError::MissingTotal {
                        url: page_url.clone(),
                    })?;
                first = false;
            }
            if let Some(items) = body.get("results").and_then(|r| r.as_array()) {
                page.results.extend(items.iter().cloned());
            }

            if first_page_only {
                break;
            }
            next = body
                .get("links")
                .and_then(|l| l.get("next"))
                .and_then(|n| n.as_str())
                .map(String::from);
        }

        debug!(
            "Fetched {} of {} entities from {}",
            page.results.len(),
            page.total,
            url
        );
        Ok(page)
    }

    fn get_json(&self, url: &str, token: Option<&str>) -> Result<serde_json::Value, ProbeError> {
        debug!("GET {} (authenticated: {})", url, token.is_some());
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().map_err(|source| ProbeError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        debug!("{} answered {}", url, status);
        if status != reqwest::StatusCode::OK {
            return Err(ProbeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json().map_err(|source| ProbeError::Body {
            url: url.to_string(),
            source,
        })
    }
}

impl EndpointProbe for HttpProbe {
    fn validate(&self, url: &str) -> Result<(), ProbeError> {
        let data_url = data_url(url);
        debug!("Validating {}", data_url);
        let resp = self
            .client
            .get(&data_url)
            .send()
            .map_err(|source| ProbeError::Request {
                url: data_url.clone(),
                source,
            })?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(ProbeError::Status {
                url: data_url,
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    fn count_entities(
        &self,
        url: &str,
        first_page_only: bool,
        authenticate: bool,
    ) -> Result<u64, ProbeError> {
        self.fetch_results(url, first_page_only, authenticate)
            .map(|page| page.total)
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP client error: {}", describe(.0))]
    HttpClient(#[source] reqwest::Error),
    #[error("Failed to reach {url}: {}", describe(source))]
    Request { url: String, source: reqwest::Error },
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("Unreadable response from {url}: {source}")]
    Body { url: String, source: reqwest::Error },
    #[error("Response from {url} has no total count")]
    MissingTotal { url: String },
    #[error("Pagination of {url} loops back to a page already fetched")]
    PageCycle { url: String },
    #[error("No access token set (NEXUS_ACCESS_TOKEN) for an authenticated request")]
    MissingToken,
}

impl ProbeError {
    /// HTTP status, when the service answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error text with its cause chain, for diagnostics on connection failures.
fn describe(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_joins_without_double_slash() {
        assert_eq!(data_url("http://x"), "http://x/v0/data");
        assert_eq!(data_url("http://x/"), "http://x/v0/data");
        assert_eq!(data_url("https://x/nexus"), "https://x/nexus/v0/data");
    }

    #[test]
    fn authenticated_fetch_without_token_fails_before_sending() {
        let probe = HttpProbe::new(&ProbeSettings::default()).unwrap();
        let err = probe
            .count_entities("http://127.0.0.1:9", true, true)
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingToken));
    }

    #[test]
    fn status_is_exposed() {
        let err = ProbeError::Status {
            url: "http://x/v0/data".to_string(),
            status: 503,
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("503"));
        assert_eq!(ProbeError::MissingToken.status(), None);
    }
}
