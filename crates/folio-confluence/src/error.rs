//! Error types for Confluence integration.

use std::path::PathBuf;
use std::str::Utf8Error;

/// Error from Confluence API operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfluenceError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("HTTP error: {status} - {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Request URL could not be parsed for signing.
    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// RSA key loading/parsing error.
    #[error("RSA key error: {0}")]
    RsaKey(#[from] RsaKeyError),

    /// Key file could not be read.
    #[error("Failed to read key file {}: {source}", path.display())]
    KeyFile {
        /// Key file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// RSA key loading/parsing error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsaKeyError {
    /// Invalid UTF-8 in key file.
    #[error("invalid UTF-8 in key")]
    InvalidUtf8(#[from] Utf8Error),

    /// PKCS#1 key parsing error.
    #[error("PKCS#1 key error: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    /// PKCS#8 key parsing error.
    #[error("PKCS#8 key error: {0}")]
    Pkcs8(#[from] rsa::pkcs8::Error),
}
