//! Pre-flight reachability check for the site under test

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Delay between two probes
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-request limit, shorter than the overall wait
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SiteProbe {
    client: reqwest::Client,
}

impl SiteProbe {
    pub fn new() -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Poll `GET url` until it answers 2xx or 3xx, or `timeout` elapses
    pub async fn wait_until_reachable(&self, url: &str, timeout: Duration) -> E2eResult<()> {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(url).send().await {
                Ok(resp) if is_reachable(resp.status()) => {
                    debug!("{} answered {} after {} attempt(s)", url, resp.status(), attempts);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("{} returned {}", url, resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to respond...", url);
                    }
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("Probe error: {}", e);
                    }
                }
            }

            if start.elapsed() + POLL_INTERVAL >= timeout {
                break;
            }
            sleep(POLL_INTERVAL).await;
        }

        Err(E2eError::SiteUnreachable {
            url: url.to_string(),
            attempts,
        })
    }
}

fn is_reachable(status: reqwest::StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use test_case::test_case;

    #[test_case(StatusCode::OK, true ; "ok")]
    #[test_case(StatusCode::MOVED_PERMANENTLY, true ; "redirect")]
    #[test_case(StatusCode::NOT_FOUND, false ; "not found")]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE, false ; "unavailable")]
    fn test_is_reachable(status: StatusCode, expected: bool) {
        assert_eq!(is_reachable(status), expected);
    }

    #[tokio::test]
    async fn test_unreachable_reports_attempts() {
        // Port 9 on loopback refuses connections
        let probe = SiteProbe::new().unwrap();
        let err = probe
            .wait_until_reachable("http://127.0.0.1:9/", Duration::from_millis(1200))
            .await
            .unwrap_err();
        match err {
            E2eError::SiteUnreachable { url, attempts } => {
                assert_eq!(url, "http://127.0.0.1:9/");
                assert!(attempts >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
