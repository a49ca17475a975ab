//! Error handling for username probing operations.
//!
//! This module defines a single error type that covers the ways a scan can
//! fail, from malformed catalog entries to network issues. Only catalog and
//! configuration errors ever reach a caller as `Err`; transport failures are
//! folded into a probe's verdict.

use std::fmt;
use std::time::Duration;

/// Main error type for handle-check operations.
#[derive(Debug, Clone)]
pub enum HandleCheckError {
    /// A catalog entry that cannot be turned into a site descriptor
    InvalidDescriptor { site: String, reason: String },

    /// Username rejected before any probe is launched
    InvalidUsername { username: String, reason: String },

    /// Substituting the username produced something that is not a URL
    InvalidUrl { url: String, reason: String },

    /// Connection, TLS, redirect or body read failures
    Transport { url: String, message: String },

    /// An operation ran past its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The catalog as a whole could not be loaded
    CatalogLoad { source: String, message: String },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading config files
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl HandleCheckError {
    /// Create a new invalid descriptor error.
    pub fn invalid_descriptor<S: Into<String>, R: Into<String>>(site: S, reason: R) -> Self {
        Self::InvalidDescriptor {
            site: site.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid username error.
    pub fn invalid_username<U: Into<String>, R: Into<String>>(username: U, reason: R) -> Self {
        Self::InvalidUsername {
            username: username.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid URL error.
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new transport error.
    pub fn transport<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new catalog load error.
    pub fn catalog_load<S: Into<String>, M: Into<String>>(source: S, message: M) -> Self {
        Self::CatalogLoad {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error belongs to a single probe's network exchange.
    ///
    /// These never abort a scan; the probe reports them as an `Error` verdict.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::InvalidUrl { .. }
        )
    }

    /// Whether this error came from validating a single catalog entry.
    pub fn is_descriptor(&self) -> bool {
        matches!(self, Self::InvalidDescriptor { .. })
    }
}

impl fmt::Display for HandleCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDescriptor { site, reason } => {
                write!(f, "Invalid site descriptor '{}': {}", site, reason)
            }
            Self::InvalidUsername { username, reason } => {
                write!(f, "Invalid username '{}': {}", username, reason)
            }
            Self::InvalidUrl { url, reason } => {
                write!(f, "Invalid URL '{}': {}", url, reason)
            }
            Self::Transport { url, message } => {
                write!(f, "Request to '{}' failed: {}", url, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::CatalogLoad { source, message } => {
                write!(f, "Failed to load site catalog from '{}': {}", source, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for HandleCheckError {}

impl From<reqwest::Error> for HandleCheckError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            Self::timeout(format!("HTTP request to {}", url), Duration::ZERO)
        } else if err.is_redirect() {
            Self::transport(url, "Too many redirects")
        } else if err.is_connect() {
            Self::transport(url, format!("Connection failed: {}", err))
        } else if err.is_body() || err.is_decode() {
            Self::transport(url, format!("Malformed response body: {}", err))
        } else {
            Self::transport(url, err.to_string())
        }
    }
}

impl From<serde_json::Error> for HandleCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::catalog_load("<json>", format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for HandleCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<regex::Error> for HandleCheckError {
    fn from(err: regex::Error) -> Self {
        Self::Internal {
            message: format!("Regex error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(HandleCheckError::transport("https://a.test/x", "reset").is_transport());
        assert!(HandleCheckError::timeout("probe", Duration::from_secs(5)).is_transport());
        assert!(HandleCheckError::invalid_url("ht!tp://", "bad scheme").is_transport());
        assert!(!HandleCheckError::catalog_load("sites.json", "empty").is_transport());
        assert!(!HandleCheckError::config("bad").is_transport());
    }

    #[test]
    fn test_descriptor_classification() {
        let err = HandleCheckError::invalid_descriptor("GitHub", "missing url");
        assert!(err.is_descriptor());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_display_messages() {
        let err = HandleCheckError::invalid_descriptor("GitHub", "missing url");
        assert_eq!(
            err.to_string(),
            "Invalid site descriptor 'GitHub': missing url"
        );

        let err = HandleCheckError::catalog_load("sites.json", "no usable site descriptors");
        assert!(err.to_string().contains("sites.json"));
        assert!(err.to_string().contains("no usable site descriptors"));

        let err = HandleCheckError::timeout("GET https://a.test/bob", Duration::from_secs(5));
        assert!(err.to_string().starts_with("Timeout after 5s"));
    }
}
