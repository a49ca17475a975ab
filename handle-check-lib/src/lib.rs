//! # Handle Check Library
//!
//! A fast, robust library for checking which websites have an account for a
//! given username.
//!
//! Each site is described by a URL template and a rule that tells an
//! existing profile apart from a missing one. The library probes many sites
//! concurrently with a hard bound on requests in flight, yields outcomes as
//! they complete, and reports progress over a non-blocking channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use handle_check_lib::{Catalog, ScanMode, Scanner};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::load_file("data.json")?;
//!     let scanner = Scanner::new()?;
//!     let session = scanner.session("bob", catalog.select(ScanMode::Full).to_vec())?;
//!
//!     let mut outcomes = scanner.scan(&session);
//!     while let Some(outcome) = outcomes.next().await {
//!         if outcome.is_found() {
//!             println!("{}: {}", outcome.site, outcome.url);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Detection rules**: status code, body marker or final-URL comparison
//! - **Bounded concurrency**: never more than the configured probes in flight
//! - **Cooperative cancellation**: stop a scan and keep partial results
//! - **Progress snapshots**: coalescing channel, final snapshot guaranteed
//! - **Configurable**: TOML files and `HC_*` environment variables

// Re-export main public API types and functions
// This makes them available as handle_check_lib::TypeName
pub use aggregate::{collect_found, ResultAggregator, ScanReport};
pub use catalog::Catalog;
pub use checker::Scanner;
pub use concurrent::{dispatch, ScanSession, ScanStream};
pub use config::{
    env_config_from, load_env_config, parse_mode, parse_timeout_string, ConfigManager,
    DefaultsConfig, EnvConfig, FileConfig, OutputConfig,
};
pub use descriptor::{DetectionRule, SiteDescriptor, USERNAME_PLACEHOLDER};
pub use error::HandleCheckError;
pub use probe::{classify, probe};
pub use progress::{ProgressReceiver, ProgressReporter, ProgressSnapshot, ProgressStride};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    FoundProfile, ProbeOutcome, ScanConfig, ScanMode, Verdict, DEFAULT_CONCURRENCY,
    DEFAULT_FAST_LIMIT, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, MAX_CONCURRENCY, MAX_TIMEOUT,
};
pub use utils::validate_username;

// Re-exported so callers can cancel sessions without naming tokio-util.
pub use tokio_util::sync::CancellationToken;

// Internal modules - these are not part of the public API
mod aggregate;
mod catalog;
mod checker;
mod concurrent;
mod config;
mod descriptor;
mod error;
mod probe;
mod progress;
mod transport;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HandleCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
}
