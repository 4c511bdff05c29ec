//! Cheap availability probes for candidate asset URLs.

use std::time::Duration;

use crate::fetch::{http_client, SHARED_RUNTIME};
use crate::record::LinkStatus;

/// Probe a URL without downloading it. Never fails: every transport
/// error, timeout, or non-success status resolves to `Unavailable`.
pub trait Probe: Sync {
    fn probe(&self, url: &str) -> LinkStatus;
}

/// HTTP probe that resolves at the response header boundary.
///
/// The GET is issued but the body is never read, so a probe costs one
/// round trip regardless of asset size. An optional content-type
/// prefix rejects soft-404 pages served with a 200.
#[derive(Debug, Clone)]
pub struct LinkVerifier {
    timeout: Duration,
    content_type: Option<String>,
}

impl LinkVerifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            content_type: None,
        }
    }

    /// Require the response content-type to start with `prefix`.
    pub fn expecting_content_type(mut self, prefix: impl Into<String>) -> Self {
        self.content_type = Some(prefix.into());
        self
    }
}

impl Probe for LinkVerifier {
    fn probe(&self, url: &str) -> LinkStatus {
        let outcome = SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client().get(url).timeout(self.timeout).send().await?;
            let ok = resp.status().is_success();
            let type_ok = match &self.content_type {
                None => true,
                Some(prefix) => resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(prefix.as_str())),
            };
            Ok::<_, reqwest::Error>(ok && type_ok)
        });

        match outcome {
            Ok(true) => LinkStatus::Available,
            Ok(false) => LinkStatus::Unavailable,
            Err(e) => {
                log::debug!("probe failed for {url}: {e}");
                LinkStatus::Unavailable
            }
        }
    }
}
