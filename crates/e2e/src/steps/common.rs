//! Steps shared by several features, plus helpers the area modules reuse

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use super::{StepArgs, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::expect::ensure;
use crate::monitor::{describe_console, describe_requests};
use crate::playwright::Page;
use crate::world::World;

/// Tolerated connectivity failures before a page counts as broken
const MAX_CONNECTIVITY_FAILURES: usize = 2;

/// Tolerated console errors once asset noise and warnings are dropped
const MAX_SIGNIFICANT_CONSOLE_ERRORS: usize = 1;

pub(super) fn register(r: &mut StepRegistry) {
    r.then("there should be no critical network failures", no_critical_network_failures);
    r.then("there should be no console errors", no_console_errors);
}

fn no_critical_network_failures(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let failures = world.monitor.connectivity_failures();
        ensure(
            failures.len() <= MAX_CONNECTIVITY_FAILURES,
            format!(
                "{} connectivity failures (at most {} allowed):\n{}",
                failures.len(),
                MAX_CONNECTIVITY_FAILURES,
                describe_requests(&failures)
            ),
        )
    }
    .boxed()
}

fn no_console_errors(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let errors = world.monitor.significant_console_errors();
        ensure(
            errors.len() <= MAX_SIGNIFICANT_CONSOLE_ERRORS,
            format!(
                "{} console errors (at most {} allowed):\n{}",
                errors.len(),
                MAX_SIGNIFICANT_CONSOLE_ERRORS,
                describe_console(&errors)
            ),
        )
    }
    .boxed()
}

/// Visible images without alt text, by src. Images whose src matches one of
/// `skip_src` are not checked.
pub(super) async fn images_missing_alt(page: &Page, skip_src: &[&str]) -> E2eResult<Vec<String>> {
    let mut missing = Vec::new();
    for image in page.locator("img").all().await? {
        if !image.is_visible().await.unwrap_or(false) {
            continue;
        }
        let src = image.get_attribute("src").await?.unwrap_or_default();
        if skip_src.iter().any(|s| src.contains(s)) {
            continue;
        }
        let alt = image.get_attribute("alt").await?.unwrap_or_default();
        if alt.trim().is_empty() {
            missing.push(src);
        }
    }
    Ok(missing)
}

/// Focus the first `limit` visible matches of `selector` and report the
/// ones that did not take focus
pub(super) async fn unfocusable(page: &Page, selector: &str, limit: usize) -> E2eResult<Vec<String>> {
    let mut failures = Vec::new();
    for element in page.locator(selector).all().await?.into_iter().take(limit) {
        if !element.is_visible().await.unwrap_or(false) {
            continue;
        }
        if element.get_attribute("tabindex").await?.as_deref() == Some("-1") {
            continue;
        }
        if let Err(e) = element.focus().await {
            debug!("Could not focus {}: {}", element.describe(), e);
            continue;
        }
        if page.locator(":focus").count().await? == 0 {
            let label = element
                .get_attribute("href")
                .await?
                .unwrap_or_else(|| element.describe());
            failures.push(label);
        }
    }
    Ok(failures)
}

/// Headings on the page in document order, as (level, text)
pub(super) async fn headings(page: &Page) -> E2eResult<Vec<(u8, String)>> {
    let value = page
        .evaluate(
            r#"() => Array.from(document.querySelectorAll("h1, h2, h3, h4, h5, h6"))
                .map((h) => [Number(h.tagName.substring(1)), (h.textContent || "").trim()])"#,
        )
        .await?;
    Ok(serde_json::from_value(value)?)
}

/// At least one h1, and no heading skips more than one level down
pub(super) fn check_heading_structure(headings: &[(u8, String)]) -> E2eResult<()> {
    ensure(!headings.is_empty(), "page has no headings")?;
    ensure(
        headings.iter().any(|(level, _)| *level == 1),
        "page has no h1 heading",
    )?;
    let mut skipped = Vec::new();
    for pair in headings.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.0 > prev.0 + 1 {
            skipped.push(format!("h{} '{}' follows h{} '{}'", next.0, next.1, prev.0, prev.1));
        }
    }
    if !skipped.is_empty() {
        // Theme builders routinely jump levels; only log it
        warn!("Heading levels skipped:\n{}", skipped.join("\n"));
    }
    Ok(())
}

pub(super) fn missing_alt_error(missing: &[String]) -> E2eError {
    E2eError::assertion(format!(
        "Accessibility violation - Images missing alt text:\n{}",
        missing.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(level: u8, text: &str) -> (u8, String) {
        (level, text.to_string())
    }

    #[test]
    fn test_heading_structure_needs_h1() {
        assert!(check_heading_structure(&[h(2, "Intro"), h(3, "Detail")]).is_err());
        assert!(check_heading_structure(&[]).is_err());
    }

    #[test]
    fn test_heading_structure_messages() {
        let none = check_heading_structure(&[]).unwrap_err();
        assert!(matches!(none, E2eError::AssertionFailed(ref m) if m == "page has no headings"));

        let no_h1 = check_heading_structure(&[h(2, "Our Story")]).unwrap_err();
        assert!(matches!(no_h1, E2eError::AssertionFailed(ref m) if m == "page has no h1 heading"));
    }

    #[test]
    fn test_heading_rows_from_page_json() {
        let rows: Vec<(u8, String)> =
            serde_json::from_value(serde_json::json!([[1, "About Us"], [2, "Our Story"]])).unwrap();
        assert!(check_heading_structure(&rows).is_ok());
    }

    #[test]
    fn test_heading_structure_tolerates_skips() {
        assert!(check_heading_structure(&[h(1, "About Us"), h(4, "Family owned")]).is_ok());
    }
}
