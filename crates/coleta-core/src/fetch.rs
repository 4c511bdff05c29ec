//! Page fetching with bounded retry.
//!
//! Uses async reqwest internally through a shared tokio runtime but
//! presents a sync interface so rayon workers can call it directly.

use std::sync::LazyLock;
use std::time::Duration;

use crate::backoff::Backoff;

/// Connect timeout for all outgoing requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(8)
        .build()
        .expect("failed to build HTTP client")
});

/// Get the shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// A single failed fetch attempt.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O or timeout error
    Io(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create from a reqwest error, keeping the status when known.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Terminal outcome after every attempt failed.
///
/// Returned as a value rather than propagated: the caller decides
/// whether an exhausted page skips or aborts the language.
#[derive(Debug)]
pub struct FetchExhausted {
    pub url: String,
    pub attempts: u32,
    pub last: FetchError,
}

impl std::fmt::Display for FetchExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gave up on {} after {} attempts: {}",
            self.url, self.attempts, self.last
        )
    }
}

impl std::error::Error for FetchExhausted {}

/// Fetch one URL to a text payload, retrying internally.
pub trait Fetch: Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchExhausted>;
}

/// GET with bounded retry and configurable backoff.
///
/// An attempt succeeds only on a 2xx response; transport errors,
/// timeouts, and non-success statuses all count as failed attempts.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    timeout: Duration,
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryingFetcher {
    pub fn new(timeout: Duration, max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            timeout,
            max_attempts,
            backoff,
        }
    }

    fn attempt(&self, url: &str) -> Result<String, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .get(url)
                .timeout(self.timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| FetchError::from_reqwest(&e))?;
            resp.text().await.map_err(|e| FetchError::from_reqwest(&e))
        })
    }
}

impl Fetch for RetryingFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchExhausted> {
        let mut last = None;
        for attempt in 1..=self.max_attempts {
            match self.attempt(url) {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    log::warn!(
                        "fetch failed ({e}), attempt {attempt}/{} for {url}",
                        self.max_attempts
                    );
                    last = Some(e);
                    if attempt < self.max_attempts {
                        std::thread::sleep(self.backoff.delay(attempt));
                    }
                }
            }
        }
        Err(FetchExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last: last.unwrap_or(FetchError::Http {
                status: None,
                message: "no attempts made".to_string(),
            }),
        })
    }
}
