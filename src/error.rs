// Error taxonomy for the adapter
//
// Every fatal failure class gets its own variant so the exit path (and the
// tests) can tell them apart. Per-record extraction problems never surface
// here; the scrape layer skips the record and logs instead.

use thiserror::Error;

/// Fatal failures of a single adapter invocation.
///
/// Authentication, connectivity, page-structure, and unknown-method failures
/// all abort the run with a non-zero exit and no stdout output. The external
/// cron scheduler is the retry mechanism; nothing here retries.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The login response carried neither logout marker, meaning the
    /// appliance rejected the credentials (or served an unexpected page).
    #[error("authentication rejected by {host}: no logout marker in login response")]
    Authentication { host: String },

    /// Transport failure: unreachable host, timeout, or a non-success HTTP
    /// status from the management interface.
    #[error("appliance request failed: {0}")]
    Connectivity(#[from] reqwest::Error),

    /// A page did not contain the structure an operation depends on,
    /// usually a firmware variant this adapter does not know.
    #[error("unrecognized {page} page structure: {reason}")]
    Extraction { page: &'static str, reason: String },

    /// Unknown `--method` value.
    #[error(
        "unsupported method `{0}`; expected one of discovery:volumes, \
         discovery:disks, discovery:ports, stats:volumes, stats:disks, \
         stats:storage, stats:all"
    )]
    UnsupportedMethod(String),
}

/// Convenience alias so the scraping layers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, AdapterError>;
