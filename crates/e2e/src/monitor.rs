//! Network and console bookkeeping for one scenario

use tracing::warn;

use crate::playwright::{ConsoleError, FailedRequest, Page, PageEvent};

const THIRD_PARTY_MARKERS: &[&str] = &[
    "google-analytics",
    "googletagmanager",
    "facebook.com",
    "doubleclick",
    "ads",
    "analytics",
    "g/collect",
];

const TRACKING_MARKERS: &[&str] = &["analytics", "tracking", "ads"];

const CONNECTIVITY_MARKERS: &[&str] = &["net::ERR_", "DNS", "timeout"];

const THIRD_PARTY_CONSOLE_MARKERS: &[&str] = &["google", "facebook", "gtag", "analytics"];

/// Analytics, ads and social beacons that may fail without hurting the page
pub fn is_third_party(url: &str) -> bool {
    let url = url.to_lowercase();
    THIRD_PARTY_MARKERS.iter().any(|m| url.contains(m))
}

pub fn is_tracking(url: &str) -> bool {
    TRACKING_MARKERS.iter().any(|m| url.contains(m))
}

/// Failure texts that mean the browser could not reach a host at all
pub fn is_connectivity_failure(error_text: &str) -> bool {
    CONNECTIVITY_MARKERS.iter().any(|m| error_text.contains(m))
}

/// Console errors raised by third-party scripts
pub fn is_third_party_console(error: &ConsoleError) -> bool {
    let text = error.text.to_lowercase();
    let url = error.url.as_deref().unwrap_or_default().to_lowercase();
    THIRD_PARTY_CONSOLE_MARKERS.iter().any(|m| text.contains(m))
        || url.contains("google")
        || url.contains("facebook")
}

/// Noise every browser logs for a static site
pub fn is_ignorable_console(error: &ConsoleError) -> bool {
    error.text.contains("favicon.ico")
        || error.text.contains("robots.txt")
        || error.text.to_lowercase().contains("warning")
}

pub fn describe_requests(requests: &[&FailedRequest]) -> String {
    requests
        .iter()
        .map(|r| {
            format!(
                "{} {} - {}",
                r.method,
                r.url,
                r.error_text.as_deref().unwrap_or("Unknown error")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_console(errors: &[&ConsoleError]) -> String {
    errors
        .iter()
        .map(|e| {
            format!(
                "{} at {}:{}",
                e.text,
                e.url.as_deref().unwrap_or("unknown"),
                e.line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failed requests and console errors seen since monitoring started
#[derive(Debug, Default, Clone)]
pub struct PageMonitor {
    failed_requests: Vec<FailedRequest>,
    console_errors: Vec<ConsoleError>,
}

impl PageMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far, including events still queued in the driver
    pub fn start(&mut self, page: &Page) {
        page.drain_events();
        self.failed_requests.clear();
        self.console_errors.clear();
    }

    /// Pull newly recorded events from the driver
    pub fn refresh(&mut self, page: &Page) {
        self.record(page.drain_events());
    }

    pub fn record(&mut self, events: impl IntoIterator<Item = PageEvent>) {
        for event in events {
            match event {
                PageEvent::RequestFailed(req) => self.failed_requests.push(req),
                PageEvent::ConsoleError(err) => self.console_errors.push(err),
                PageEvent::Ready { .. } => {}
            }
        }
    }

    pub fn failed_requests(&self) -> &[FailedRequest] {
        &self.failed_requests
    }

    pub fn console_errors(&self) -> &[ConsoleError] {
        &self.console_errors
    }

    /// Failures of first-party resources
    pub fn critical_failures(&self) -> Vec<&FailedRequest> {
        self.keep_requests("first-party request failures", |r| !is_third_party(&r.url))
    }

    /// Failures outside analytics, tracking and ad hosts
    pub fn untracked_failures(&self) -> Vec<&FailedRequest> {
        self.keep_requests("untracked request failures", |r| !is_tracking(&r.url))
    }

    /// Requests that failed because a host could not be reached
    pub fn connectivity_failures(&self) -> Vec<&FailedRequest> {
        self.keep_requests("connectivity failures", |r| {
            r.error_text.as_deref().map(is_connectivity_failure).unwrap_or(false)
        })
    }

    /// Console errors not caused by third-party scripts
    pub fn critical_console_errors(&self) -> Vec<&ConsoleError> {
        self.keep_console("critical console errors", |e| !is_third_party_console(e))
    }

    /// Console errors that are neither static-asset noise nor warnings
    pub fn significant_console_errors(&self) -> Vec<&ConsoleError> {
        self.keep_console("console errors", |e| !is_ignorable_console(e))
    }

    fn keep_requests(&self, what: &str, keep: impl Fn(&FailedRequest) -> bool) -> Vec<&FailedRequest> {
        let kept: Vec<_> = self.failed_requests.iter().filter(|r| keep(r)).collect();
        if !kept.is_empty() {
            warn!("{} {} detected:\n{}", kept.len(), what, describe_requests(&kept));
        }
        kept
    }

    fn keep_console(&self, what: &str, keep: impl Fn(&ConsoleError) -> bool) -> Vec<&ConsoleError> {
        let kept: Vec<_> = self.console_errors.iter().filter(|e| keep(e)).collect();
        if !kept.is_empty() {
            warn!("{} {} detected:\n{}", kept.len(), what, describe_console(&kept));
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn failed(url: &str, error: Option<&str>) -> PageEvent {
        PageEvent::RequestFailed(FailedRequest {
            url: url.to_string(),
            method: "GET".to_string(),
            error_text: error.map(str::to_string),
        })
    }

    fn console(text: &str, url: Option<&str>) -> PageEvent {
        PageEvent::ConsoleError(ConsoleError {
            text: text.to_string(),
            url: url.map(str::to_string),
            line: Some(1),
        })
    }

    #[test_case("https://www.google-analytics.com/collect", true ; "google analytics")]
    #[test_case("https://www.GoogleTagManager.com/gtm.js", true ; "case insensitive")]
    #[test_case("https://region1.google.com/g/collect?v=2", true ; "gtag collect")]
    #[test_case("https://connect.facebook.com/en_US/fbevents.js", true ; "facebook")]
    #[test_case("https://www.pinecresthomegoods.com/wp-content/app.js", false ; "first party")]
    fn test_is_third_party(url: &str, expected: bool) {
        assert_eq!(is_third_party(url), expected);
    }

    #[test_case("net::ERR_NAME_NOT_RESOLVED", true ; "dns resolution")]
    #[test_case("net::ERR_CONNECTION_REFUSED", true ; "refused")]
    #[test_case("DNS lookup failed", true ; "dns text")]
    #[test_case("Navigation timeout of 30000 ms", true ; "timeout")]
    #[test_case("NS_BINDING_ABORTED", false ; "aborted")]
    fn test_is_connectivity_failure(text: &str, expected: bool) {
        assert_eq!(is_connectivity_failure(text), expected);
    }

    #[test]
    fn test_critical_failures_skip_third_party() {
        let mut monitor = PageMonitor::new();
        monitor.record(vec![
            failed("https://www.googletagmanager.com/gtag/js", Some("net::ERR_FAILED")),
            failed("https://www.pinecresthomegoods.com/app.css", Some("net::ERR_FAILED")),
        ]);
        let critical = monitor.critical_failures();
        assert_eq!(critical.len(), 1);
        assert!(critical[0].url.ends_with("app.css"));
    }

    #[test]
    fn test_connectivity_failures_need_error_text() {
        let mut monitor = PageMonitor::new();
        monitor.record(vec![
            failed("https://cdn.example.com/a.js", Some("net::ERR_NAME_NOT_RESOLVED")),
            failed("https://cdn.example.com/b.js", None),
            failed("https://cdn.example.com/c.js", Some("NS_BINDING_ABORTED")),
        ]);
        assert_eq!(monitor.connectivity_failures().len(), 1);
    }

    #[test]
    fn test_untracked_failures() {
        let mut monitor = PageMonitor::new();
        monitor.record(vec![
            failed("https://tracking.example.com/pixel", None),
            failed("https://www.pinecresthomegoods.com/guide.pdf", None),
        ]);
        assert_eq!(monitor.untracked_failures().len(), 1);
    }

    #[test]
    fn test_console_filters() {
        let mut monitor = PageMonitor::new();
        monitor.record(vec![
            console("Failed to load resource: favicon.ico", None),
            console("gtag is not defined", None),
            console("Uncaught TypeError: x is undefined", Some("https://www.google.com/recaptcha.js")),
            console("Uncaught ReferenceError: jQuery is not defined", Some("https://www.pinecresthomegoods.com/")),
            console("Warning: deprecated API", None),
        ]);

        let critical = monitor.critical_console_errors();
        let texts: Vec<_> = critical.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "Failed to load resource: favicon.ico",
                "Uncaught ReferenceError: jQuery is not defined",
                "Warning: deprecated API"
            ]
        );

        let significant = monitor.significant_console_errors();
        assert_eq!(significant.len(), 3);
        assert!(significant.iter().all(|e| !e.text.contains("favicon")));
    }

    #[test]
    fn test_describe_console_handles_missing_location() {
        let err = ConsoleError {
            text: "boom".to_string(),
            url: None,
            line: None,
        };
        assert_eq!(describe_console(&[&err]), "boom at unknown:unknown");
    }
}
