//! Defaults for the API server, call budget, pagination and timeouts
// Constants for version and binary identification

/// Binary name used in user agents and usage text
pub const BINARY_NAME: &str = "almatoolkit";

/// Package version from Cargo.toml (set at compile time)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the user agent string for HTTP requests
pub fn user_agent() -> String {
    format!("{}/{}", BINARY_NAME, VERSION)
}

// ============================================================================
// API Server Constants
// ============================================================================

/// Default Alma API server
pub const DEFAULT_API_URL: &str = "https://api-ca.hosted.exlibrisgroup.com";

/// Response header carrying the number of API calls left for the day
pub const REMAINING_CALLS_HEADER: &str = "X-Exl-Api-Remaining";

/// Prefix of the Authorization header value, followed by the key
pub const AUTHORIZATION_PREFIX: &str = "apikey ";

/// Circulation desk used when scanning items in, unless overridden
pub const DEFAULT_CIRC_DESK: &str = "DEFAULT_CIRC_DESK";

// ============================================================================
// Budget and Pagination Constants
// ============================================================================

/// Minimum number of remaining API calls before a run is cancelled
pub const DEFAULT_THRESHOLD: u64 = 50_000;

/// The `limit` parameter for offset+limit pagination
pub const PAGE_SIZE: usize = 100;

// ============================================================================
// Timeout Constants (in seconds)
// ============================================================================

/// Window in which one API call (including all its retries) must complete
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Linear backoff step: the Nth retry waits N times this
pub const BACKOFF_STEP_SECS: u64 = 1;

/// Number of workers used when none is configured: one per logical CPU
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
