//! Count-then-fetch retrieval of building permits from a Socrata resource.
//!
//! Each call to [`OpenDataClient::fetch_permits`] issues exactly two GET
//! requests, in order:
//!
//! 1. `$select=count(*) AS count&$where=<filter>` for the total number of
//!    matches (not limited).
//! 2. `$where=<filter>&$limit=<limit>` for a single page of records.
//!
//! The page is sorted by address before it is returned. Only one page is
//! ever fetched, so `total_count` may exceed the number of permits.

use std::time::Duration;

use permit_map_permit_models::{BuildingPermit, QueryResult, sort_by_address};
use serde_json::Value;

use crate::transport::{ReqwestTransport, SodaTransport};
use crate::{Phase, SocrataError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an [`OpenDataClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Socrata resource URL, with or without the `.json` suffix
    /// (e.g., `"https://data.seattle.gov/resource/76t5-zqzr"`).
    pub endpoint: String,
    /// Application token. `None` or empty means unauthenticated,
    /// rate-limited access.
    pub app_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a config for `endpoint` with no token and the default timeout.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            app_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the application token.
    #[must_use]
    pub fn with_app_token(mut self, app_token: Option<String>) -> Self {
        self.app_token = app_token;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for a single Socrata building permit resource.
pub struct OpenDataClient<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
}

impl OpenDataClient<ReqwestTransport> {
    /// Creates a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`SocrataError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, SocrataError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: SodaTransport> OpenDataClient<T> {
    /// Creates a client over an arbitrary transport.
    pub const fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Returns the client's configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Counts all permits matching `filter`, then fetches up to `limit` of
    /// them sorted by address.
    ///
    /// The fetch request is only sent once the count has succeeded.
    ///
    /// # Errors
    ///
    /// * [`SocrataError::Configuration`] if `limit` is zero or the endpoint
    ///   or filter is empty. No request is sent.
    /// * A transport-kind error if either request fails.
    /// * [`SocrataError::Decode`] or [`SocrataError::UnexpectedShape`] if
    ///   either response body cannot be decoded, or the page holds more
    ///   than `limit` records.
    pub async fn fetch_permits(
        &self,
        filter: &str,
        limit: u64,
    ) -> Result<QueryResult, SocrataError> {
        self.validate(filter, limit)?;

        let url = resource_url(&self.config.endpoint);
        let token = self.app_token();
        if token.is_none() {
            log::warn!("No app token configured; requests will be rate limited");
        }

        log::info!("Counting matching permits");
        let total_count = self.count(&url, filter, token).await?;
        log::info!("{total_count} permits match");

        log::info!("Fetching up to {limit} permits");
        let mut permits = self.fetch_page(&url, filter, limit, token).await?;
        if permits.len() as u64 > limit {
            return Err(SocrataError::UnexpectedShape {
                phase: Phase::Fetch,
                message: format!("requested at most {limit} rows, got {}", permits.len()),
            });
        }
        sort_by_address(&mut permits);

        log::info!("Fetched {} permits", permits.len());
        if total_count > permits.len() as u64 {
            log::warn!(
                "Result truncated: showing {} of {total_count} matching permits",
                permits.len()
            );
        }

        Ok(QueryResult {
            permits,
            total_count,
        })
    }

    fn validate(&self, filter: &str, limit: u64) -> Result<(), SocrataError> {
        if limit == 0 {
            return Err(SocrataError::configuration("page limit must be positive"));
        }
        if self.config.endpoint.trim().is_empty() {
            return Err(SocrataError::configuration("endpoint must not be empty"));
        }
        if filter.trim().is_empty() {
            return Err(SocrataError::configuration("filter must not be empty"));
        }
        Ok(())
    }

    fn app_token(&self) -> Option<&str> {
        self.config
            .app_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }

    async fn count(
        &self,
        url: &str,
        filter: &str,
        token: Option<&str>,
    ) -> Result<u64, SocrataError> {
        let params = [
            ("$select", "count(*) AS count".to_string()),
            ("$where", filter.to_string()),
        ];
        log::debug!("GET {url} {params:?}");
        let body = self.transport.get(url, &params, token).await?;
        parse_count(&body)
    }

    async fn fetch_page(
        &self,
        url: &str,
        filter: &str,
        limit: u64,
        token: Option<&str>,
    ) -> Result<Vec<BuildingPermit>, SocrataError> {
        let params = [("$where", filter.to_string()), ("$limit", limit.to_string())];
        log::debug!("GET {url} {params:?}");
        let body = self.transport.get(url, &params, token).await?;
        serde_json::from_str(&body).map_err(|source| SocrataError::Decode {
            phase: Phase::Fetch,
            source,
        })
    }
}

/// Appends the `.json` format suffix unless the endpoint already has it.
fn resource_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.ends_with(".json") {
        endpoint.to_string()
    } else {
        format!("{endpoint}.json")
    }
}

/// Parses `[{"count": "1500"}]`. Socrata sends the count as a string but
/// a bare number is accepted too.
fn parse_count(body: &str) -> Result<u64, SocrataError> {
    let rows: Vec<serde_json::Map<String, Value>> =
        serde_json::from_str(body).map_err(|source| SocrataError::Decode {
            phase: Phase::Count,
            source,
        })?;

    let shape_error = |message: String| SocrataError::UnexpectedShape {
        phase: Phase::Count,
        message,
    };

    let value = rows
        .first()
        .and_then(|row| row.get("count"))
        .ok_or_else(|| shape_error("no count column in response".to_string()))?;

    match value {
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| shape_error(format!("count {s:?} is not an integer: {e}"))),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| shape_error(format!("count {n} is not an integer"))),
        other => Err(shape_error(format!("count has unexpected type: {other}"))),
    }
}
