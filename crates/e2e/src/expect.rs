//! Auto-retrying assertions
//!
//! Every expectation polls the page until it holds or its timeout expires,
//! mirroring Playwright's web-first assertions. The named helpers on top
//! produce the error messages the step definitions report.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::trace;

use crate::error::{E2eError, E2eResult};
use crate::locator::{BoundingBox, Locator, TextMatch};
use crate::playwright::{Page, WaitState};

pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll `probe` until it reports success or `timeout_ms` passes.
///
/// The probe returns whether the condition holds plus a description of what
/// it observed; probe errors count as "not yet" and their message becomes
/// the observation.
async fn poll_until<F, Fut>(timeout_ms: u64, mut probe: F) -> Result<(), String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<(bool, String)>>,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        let observed = match probe().await {
            Ok((true, _)) => return Ok(()),
            Ok((false, observed)) => observed,
            Err(e) => e.to_string(),
        };
        if Instant::now() >= deadline {
            return Err(observed);
        }
        trace!("expectation not met yet: {}", observed);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Assertions on a locator
pub fn expect(locator: &Locator) -> LocatorAssertions<'_> {
    LocatorAssertions {
        locator,
        timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
        negate: false,
    }
}

/// Assertions on the page itself
pub fn expect_page(page: &Page) -> PageAssertions<'_> {
    PageAssertions {
        page,
        timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
    }
}

pub struct LocatorAssertions<'a> {
    locator: &'a Locator,
    timeout_ms: u64,
    negate: bool,
}

impl<'a> LocatorAssertions<'a> {
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Invert the next check
    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    async fn check<F, Fut>(&self, expectation: &str, mut probe: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<(bool, String)>>,
    {
        let negate = self.negate;
        let result = poll_until(self.timeout_ms, || {
            let fut = probe();
            async move {
                let (holds, observed) = fut.await?;
                Ok((holds != negate, observed))
            }
        })
        .await;

        result.map_err(|observed| {
            E2eError::AssertionFailed(format!(
                "expected {} {}{} within {}ms, last observed: {}",
                self.locator.describe(),
                if negate { "not " } else { "" },
                expectation,
                self.timeout_ms,
                observed
            ))
        })
    }

    pub async fn to_be_visible(&self) -> E2eResult<()> {
        let loc = self.locator;
        self.check("to be visible", || async move {
            let visible = loc.is_visible().await?;
            Ok((visible, format!("visible={}", visible)))
        })
        .await
    }

    pub async fn to_be_hidden(&self) -> E2eResult<()> {
        let loc = self.locator;
        self.check("to be hidden", || async move {
            let visible = loc.is_visible().await?;
            Ok((!visible, format!("visible={}", visible)))
        })
        .await
    }

    pub async fn to_be_enabled(&self) -> E2eResult<()> {
        let loc = self.locator;
        self.check("to be enabled", || async move {
            let enabled = loc.is_enabled().await?;
            Ok((enabled, format!("enabled={}", enabled)))
        })
        .await
    }

    pub async fn to_be_focused(&self) -> E2eResult<()> {
        let loc = self.locator;
        self.check("to be focused", || async move {
            let focused = loc.is_focused().await?;
            Ok((focused, format!("focused={}", focused)))
        })
        .await
    }

    pub async fn to_contain_text(&self, expected: impl Into<TextMatch>) -> E2eResult<()> {
        let expected = expected.into();
        let loc = self.locator;
        let matcher = &expected;
        self.check(&format!("to contain text {}", expected), || async move {
            let text = loc.text_content().await?.unwrap_or_default();
            Ok((matcher.matches(&text)?, format!("\"{}\"", text.trim())))
        })
        .await
    }

    pub async fn to_have_value(&self, expected: &str) -> E2eResult<()> {
        let loc = self.locator;
        self.check(&format!("to have value \"{}\"", expected), || async move {
            let value = loc.input_value().await?;
            Ok((value == expected, format!("\"{}\"", value)))
        })
        .await
    }

    pub async fn to_have_count(&self, expected: usize) -> E2eResult<()> {
        let loc = self.locator;
        self.check(&format!("to have count {}", expected), || async move {
            let count = loc.count().await?;
            Ok((count == expected, format!("count={}", count)))
        })
        .await
    }

    pub async fn to_have_attribute(&self, name: &str, expected: impl Into<TextMatch>) -> E2eResult<()> {
        let expected = expected.into();
        let loc = self.locator;
        let matcher = &expected;
        self.check(&format!("to have attribute {}={}", name, expected), || async move {
            match loc.get_attribute(name).await? {
                Some(value) => Ok((matcher.matches(&value)?, format!("{}=\"{}\"", name, value))),
                None => Ok((false, format!("no {} attribute", name))),
            }
        })
        .await
    }
}

/// Expected document title
#[derive(Debug, Clone)]
pub enum TitleMatch {
    Exact(String),
    Pattern(TextMatch),
}

impl TitleMatch {
    fn matches(&self, title: &str) -> E2eResult<bool> {
        match self {
            TitleMatch::Exact(expected) => Ok(title == expected),
            TitleMatch::Pattern(m) => m.matches(title),
        }
    }
}

impl std::fmt::Display for TitleMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TitleMatch::Exact(s) => write!(f, "\"{}\"", s),
            TitleMatch::Pattern(m) => write!(f, "{}", m),
        }
    }
}

impl From<&str> for TitleMatch {
    fn from(s: &str) -> Self {
        TitleMatch::Exact(s.to_string())
    }
}

impl From<String> for TitleMatch {
    fn from(s: String) -> Self {
        TitleMatch::Exact(s)
    }
}

impl From<TextMatch> for TitleMatch {
    fn from(m: TextMatch) -> Self {
        TitleMatch::Pattern(m)
    }
}

/// Expected page URL
#[derive(Debug, Clone)]
pub enum UrlMatch {
    Contains(String),
    Pattern(TextMatch),
}

impl UrlMatch {
    pub fn pattern(source: impl Into<String>) -> Self {
        UrlMatch::Pattern(TextMatch::regex(source))
    }

    pub fn matches(&self, url: &str) -> E2eResult<bool> {
        match self {
            UrlMatch::Contains(s) => Ok(url.contains(s.as_str())),
            UrlMatch::Pattern(m) => m.matches(url),
        }
    }
}

impl std::fmt::Display for UrlMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlMatch::Contains(s) => write!(f, "*{}*", s),
            UrlMatch::Pattern(m) => write!(f, "{}", m),
        }
    }
}

pub struct PageAssertions<'a> {
    page: &'a Page,
    timeout_ms: u64,
}

impl<'a> PageAssertions<'a> {
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub async fn to_have_title(&self, expected: impl Into<TitleMatch>) -> E2eResult<()> {
        let expected = expected.into();
        let page = self.page;
        let matcher = &expected;
        poll_until(self.timeout_ms, || async move {
            let title = page.title().await?;
            Ok((matcher.matches(&title)?, format!("\"{}\"", title)))
        })
        .await
        .map_err(|observed| {
            E2eError::AssertionFailed(format!(
                "expected page title {} within {}ms, last observed: {}",
                expected, self.timeout_ms, observed
            ))
        })
    }

    pub async fn to_have_url(&self, expected: UrlMatch) -> E2eResult<()> {
        let page = self.page;
        let matcher = &expected;
        poll_until(self.timeout_ms, || async move {
            let url = page.url().await?;
            Ok((matcher.matches(&url)?, url))
        })
        .await
        .map_err(|observed| {
            E2eError::AssertionFailed(format!(
                "expected page URL {} within {}ms, last observed: {}",
                expected, self.timeout_ms, observed
            ))
        })
    }
}

/// Fail unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message.into()))
    }
}

pub fn ensure_eq<T: PartialEq + std::fmt::Debug>(actual: T, expected: T, what: &str) -> E2eResult<()> {
    ensure(
        actual == expected,
        format!("{}: expected {:?}, got {:?}", what, expected, actual),
    )
}

pub async fn assert_element_visible(locator: &Locator, name: &str, timeout_ms: u64) -> E2eResult<()> {
    expect(locator)
        .timeout(timeout_ms)
        .to_be_visible()
        .await
        .map_err(|e| {
            E2eError::AssertionFailed(format!("{} is not visible within {}ms. {}", name, timeout_ms, e))
        })
}

/// `assert_element_visible` with the ten second default
pub async fn assert_visible(locator: &Locator, name: &str) -> E2eResult<()> {
    assert_element_visible(locator, name, 10_000).await
}

pub async fn assert_element_enabled(locator: &Locator, name: &str) -> E2eResult<()> {
    expect(locator)
        .to_be_enabled()
        .await
        .map_err(|e| E2eError::AssertionFailed(format!("{} is not enabled. {}", name, e)))
}

pub async fn assert_element_text(locator: &Locator, expected: &str, name: &str) -> E2eResult<()> {
    if expect(locator).to_contain_text(expected).await.is_ok() {
        return Ok(());
    }
    let actual = locator.text_content().await.ok().flatten().unwrap_or_default();
    Err(E2eError::AssertionFailed(format!(
        "{} does not contain expected text. Expected: \"{}\", Actual: \"{}\"",
        name, expected, actual
    )))
}

pub async fn assert_url(page: &Page, expected: UrlMatch, description: &str) -> E2eResult<()> {
    if expect_page(page).to_have_url(expected.clone()).await.is_ok() {
        return Ok(());
    }
    let actual = page.url().await.unwrap_or_default();
    Err(E2eError::AssertionFailed(format!(
        "{} does not match expected pattern. Expected: {}, Actual: {}",
        description, expected, actual
    )))
}

pub async fn assert_page_title(page: &Page, expected: impl Into<TitleMatch>) -> E2eResult<()> {
    let expected = expected.into();
    if expect_page(page).to_have_title(expected.clone()).await.is_ok() {
        return Ok(());
    }
    let actual = page.title().await.unwrap_or_default();
    Err(E2eError::AssertionFailed(format!(
        "Page title does not match expected. Expected: {}, Actual: \"{}\"",
        expected, actual
    )))
}

pub async fn assert_element_count(locator: &Locator, expected: usize, name: &str) -> E2eResult<()> {
    if expect(locator).to_have_count(expected).await.is_ok() {
        return Ok(());
    }
    let actual = locator.count().await.unwrap_or(0);
    Err(E2eError::AssertionFailed(format!(
        "{} count does not match expected. Expected: {}, Actual: {}",
        name, expected, actual
    )))
}

/// Collects failures so a step can report all of them at once
#[derive(Debug, Default)]
pub struct SoftAssertions {
    errors: Vec<String>,
}

impl SoftAssertions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await an assertion, recording its failure instead of returning it
    pub async fn check<Fut>(&mut self, description: impl AsRef<str>, assertion: Fut)
    where
        Fut: Future<Output = E2eResult<()>>,
    {
        if let Err(e) = assertion.await {
            self.record(description, e.to_string());
        }
    }

    pub fn record(&mut self, description: impl AsRef<str>, message: impl AsRef<str>) {
        self.errors
            .push(format!("{}: {}", description.as_ref(), message.as_ref()));
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fail with every recorded message
    pub fn validate(self, test_description: &str) -> E2eResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(E2eError::SoftAssertions(format!(
            "{} failed with {} assertion(s):\n{}",
            test_description,
            self.errors.len(),
            self.errors.join("\n")
        )))
    }
}

/// Counts consecutive identical bounding boxes
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    previous: Option<BoundingBox>,
    stable_count: usize,
    required: usize,
}

impl StabilityTracker {
    pub fn new(initial: Option<BoundingBox>, required: usize) -> Self {
        Self {
            previous: initial,
            stable_count: 0,
            required,
        }
    }

    /// Feed the next sample; true once it has been stable long enough
    pub fn observe(&mut self, current: Option<BoundingBox>) -> bool {
        if current == self.previous {
            self.stable_count += 1;
        } else {
            self.stable_count = 0;
        }
        self.previous = current;
        self.stable_count >= self.required
    }
}

/// Wait until an element is visible and has stopped moving
pub async fn wait_for_element_stable(locator: &Locator, timeout_ms: u64) -> E2eResult<()> {
    const MAX_CHECKS: usize = 10;
    const REQUIRED_STABLE: usize = 3;

    locator.wait_for(WaitState::Visible, timeout_ms).await?;

    let mut tracker = StabilityTracker::new(locator.bounding_box().await?, REQUIRED_STABLE);
    for _ in 0..MAX_CHECKS {
        tokio::time::sleep(POLL_INTERVAL).await;
        if tracker.observe(locator.bounding_box().await?) {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn bbox(y: f64) -> Option<BoundingBox> {
        Some(BoundingBox {
            x: 0.0,
            y,
            width: 100.0,
            height: 40.0,
        })
    }

    #[test]
    fn test_stability_needs_three_identical_samples() {
        let mut tracker = StabilityTracker::new(bbox(0.0), 3);
        assert!(!tracker.observe(bbox(10.0)));
        assert!(!tracker.observe(bbox(10.0)));
        assert!(!tracker.observe(bbox(10.0)));
        assert!(tracker.observe(bbox(10.0)));
    }

    #[test]
    fn test_stability_resets_on_movement() {
        let mut tracker = StabilityTracker::new(bbox(0.0), 3);
        assert!(!tracker.observe(bbox(0.0)));
        assert!(!tracker.observe(bbox(0.0)));
        assert!(!tracker.observe(bbox(5.0)));
        assert!(!tracker.observe(bbox(5.0)));
        assert!(!tracker.observe(bbox(5.0)));
        assert!(tracker.observe(bbox(5.0)));
    }

    #[test]
    fn test_detached_element_counts_as_stable() {
        let mut tracker = StabilityTracker::new(None, 3);
        assert!(!tracker.observe(None));
        assert!(!tracker.observe(None));
        assert!(tracker.observe(None));
    }

    #[test]
    fn test_soft_assertions_pass_when_empty() {
        assert!(SoftAssertions::new().validate("Header elements verification").is_ok());
    }

    #[test]
    fn test_soft_assertions_report_every_failure() {
        let mut soft = SoftAssertions::new();
        soft.record("Logo visibility check", "Logo is not visible within 10000ms.");
        soft.record("Cart link visibility check", "Cart Link is not visible within 10000ms.");

        let err = soft.validate("Header elements verification").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Header elements verification failed with 2 assertion(s):\n\
             Logo visibility check: Logo is not visible within 10000ms.\n\
             Cart link visibility check: Cart Link is not visible within 10000ms."
        );
    }

    #[tokio::test]
    async fn test_soft_check_collects_async_failures() {
        let mut soft = SoftAssertions::new();
        soft.check("passes", async { Ok(()) }).await;
        soft.check("fails", async { Err(E2eError::assertion("nope")) }).await;
        assert_eq!(soft.errors(), ["fails: Assertion failed: nope"]);
    }

    #[tokio::test]
    async fn test_poll_until_retries_then_succeeds() {
        let calls = Cell::new(0);
        let result = poll_until(2_000, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok((n >= 3, format!("call {}", n))) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_poll_until_reports_last_observation() {
        let result = poll_until(250, || async { Ok((false, "visible=false".to_string())) }).await;
        assert_eq!(result.unwrap_err(), "visible=false");
    }

    #[tokio::test]
    async fn test_poll_until_treats_errors_as_pending() {
        let result = poll_until(150, || async {
            Err::<(bool, String), _>(E2eError::Timeout("element".into()))
        })
        .await;
        assert_eq!(result.unwrap_err(), "Timeout waiting for: element");
    }

    #[test]
    fn test_url_and_title_matchers() {
        assert!(UrlMatch::pattern(r".*/shop.*").matches("https://x.com/shop/").unwrap());
        assert!(!UrlMatch::Contains("/cart".into()).matches("https://x.com/shop/").unwrap());
        assert!(TitleMatch::from("Pinecrest Home Goods").matches("Pinecrest Home Goods").unwrap());
        assert!(!TitleMatch::from("Pinecrest").matches("Pinecrest Home Goods").unwrap());
        assert!(TitleMatch::Pattern(TextMatch::regex("Shop|Products.*Pinecrest"))
            .matches("Shop - Pinecrest Home Goods")
            .unwrap());
    }

    #[test]
    fn test_ensure_eq_message() {
        let err = ensure_eq(2, 3, "cart items").unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: cart items: expected 3, got 2");
    }
}
