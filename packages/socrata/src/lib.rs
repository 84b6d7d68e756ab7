#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! SoQL filter construction and Socrata retrieval for building permits.
//!
//! [`query::build_filter`] turns a status exclusion set and a bounding box
//! into a `$where` expression. [`client::OpenDataClient`] runs the
//! count-then-fetch protocol against a Socrata resource and returns the
//! decoded, address-sorted page along with the server-side total.
//!
//! Every failure is surfaced as a [`SocrataError`]; nothing in this crate
//! retries or exits the process.

pub mod client;
pub mod query;
pub mod registry;
pub mod transport;

use permit_map_permit_models::ModelError;
use strum::{AsRefStr, Display};

pub use client::{ClientConfig, OpenDataClient};
pub use query::{FilterColumns, build_filter, build_filter_with};
pub use transport::{ReqwestTransport, SodaTransport};

/// Which request of the count-then-fetch protocol an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// The `count(*)` request.
    Count,
    /// The page request.
    Fetch,
}

/// Coarse classification of a [`SocrataError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ErrorKind {
    /// The request could not be completed or the server refused it.
    Transport,
    /// The response body was not the expected JSON.
    Decode,
    /// The inputs were invalid; no request was sent.
    Configuration,
}

/// Errors that can occur while querying a Socrata dataset.
#[derive(Debug, thiserror::Error)]
pub enum SocrataError {
    /// HTTP request failed (connection, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request did not finish within the configured timeout.
    #[error("Request to {url} timed out")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The response body was not valid JSON for the expected type.
    #[error("Failed to decode {phase} response: {source}")]
    Decode {
        /// Request the body belonged to.
        phase: Phase,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The response body was JSON but not in the expected shape.
    #[error("Unexpected {phase} response: {message}")]
    UnexpectedShape {
        /// Request the body belonged to.
        phase: Phase,
        /// Description of what was wrong.
        message: String,
    },

    /// Query inputs were rejected before any request was made.
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Description of what went wrong.
        message: String,
    },
}

impl SocrataError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::Timeout { .. } => ErrorKind::Transport,
            Self::Decode { .. } | Self::UnexpectedShape { .. } => ErrorKind::Decode,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Shorthand for building a [`SocrataError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<ModelError> for SocrataError {
    fn from(e: ModelError) -> Self {
        Self::configuration(e.to_string())
    }
}
