//! Scenario runner: feature files in, browser sessions and a result report out

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use pinecrest_common::SiteConfig;

use crate::error::{E2eError, E2eResult};
use crate::feature::{Feature, Scenario, Step};
use crate::playwright::{Page, PlaywrightConfig, Session};
use crate::site::SiteProbe;
use crate::steps::{BoundStep, StepRegistry};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    Undefined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub keyword: String,
    pub text: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl StepResult {
    fn new(step: &Step, status: StepStatus, duration_ms: u64, error: Option<String>) -> Self {
        Self {
            keyword: step.keyword.as_str().to_string(),
            text: step.text.clone(),
            status,
            duration_ms,
            error,
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub feature: String,
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
}

/// Result of running all selected scenarios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    fn record(&mut self, result: ScenarioResult) {
        self.total += 1;
        if result.success {
            self.passed += 1;
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
        } else {
            self.failed += 1;
            error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        self.results.push(result);
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub site: SiteConfig,
    pub playwright: PlaywrightConfig,
    pub features_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Run scenarios carrying any of these tags (all when empty)
    pub tags: Vec<String>,

    /// Never run scenarios carrying one of these tags
    pub skip_tags: Vec<String>,

    /// Substring the scenario name must contain
    pub name: Option<String>,

    /// Wait for the site to answer before launching any browser
    pub preflight: bool,
    pub preflight_timeout: Duration,

    pub screenshot_on_failure: bool,
    pub fail_fast: bool,

    /// Bind every step without opening a browser
    pub dry_run: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            playwright: PlaywrightConfig::default(),
            features_dir: PathBuf::from("crates/e2e/features"),
            output_dir: PathBuf::from("test-results"),
            tags: Vec::new(),
            skip_tags: Vec::new(),
            name: None,
            preflight: true,
            preflight_timeout: Duration::from_secs(30),
            screenshot_on_failure: true,
            fail_fast: false,
            dry_run: false,
        }
    }
}

/// A scenario picked for this run, with its feature's background
#[derive(Debug, Clone)]
pub struct SelectedScenario {
    pub feature: String,
    pub tags: Vec<String>,
    pub background: Vec<Step>,
    pub scenario: Scenario,
}

impl SelectedScenario {
    /// Background steps first, then the scenario's own
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.background.iter().chain(self.scenario.steps.iter())
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
    site: Arc<SiteConfig>,
    registry: StepRegistry,
}

impl TestRunner {
    pub fn new() -> E2eResult<Self> {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        let registry = StepRegistry::new()?;
        debug!("Registered {} step definitions", registry.len());
        Ok(Self {
            site: Arc::new(config.site.clone()),
            config,
            registry,
        })
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Load the feature files and keep the scenarios the filters select
    pub fn select(&self) -> E2eResult<Vec<SelectedScenario>> {
        let features = Feature::load_all(&self.config.features_dir)?;
        debug!(
            "Loaded {} feature file(s) from {}",
            features.len(),
            self.config.features_dir.display()
        );
        Ok(filter_scenarios(&features, &self.config))
    }

    /// Run every selected scenario
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let selected = self.select()?;
        self.run_scenarios(&selected).await
    }

    pub async fn run_scenarios(&mut self, selected: &[SelectedScenario]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut suite = TestSuiteResult::default();

        if self.config.dry_run {
            info!("Binding {} scenario(s) (dry run)...", selected.len());
            for scenario in selected {
                suite.record(self.bind_only(scenario));
            }
            return Ok(self.finish(suite, start));
        }

        // Undefined or ambiguous steps fail the run before any browser starts
        for scenario in selected {
            for step in scenario.steps() {
                self.registry.bind(step)?;
            }
        }

        if self.config.preflight {
            let url = self.site.url_of(pinecrest_common::SitePage::Home);
            SiteProbe::new()?
                .wait_until_reachable(&url, self.config.preflight_timeout)
                .await?;
            info!("Site is reachable at {}", url);
        }

        info!("Running {} scenario(s)...", selected.len());

        for (index, scenario) in selected.iter().enumerate() {
            let result = match self.run_scenario(scenario).await {
                Ok(result) => result,
                Err(e) => failed_to_start(scenario, e),
            };
            let failed = !result.success;
            suite.record(result);

            if failed && self.config.fail_fast {
                let remaining = selected.len() - index - 1;
                if remaining > 0 {
                    warn!("Stopping after first failure, {} scenario(s) not run", remaining);
                }
                suite.skipped += remaining;
                break;
            }
        }

        Ok(self.finish(suite, start))
    }

    /// Run one scenario in a fresh browser session
    pub async fn run_scenario(&self, selected: &SelectedScenario) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        debug!("Running scenario: {}", selected.scenario.name);

        let session = Session::launch(&self.config.playwright).await?;
        let mut world = World::new(session.page(), self.site.clone());

        let mut steps = Vec::new();
        let mut scenario_error: Option<String> = None;

        for step in selected.steps() {
            if scenario_error.is_some() {
                steps.push(StepResult::new(step, StepStatus::Skipped, 0, None));
                continue;
            }

            let step_start = Instant::now();
            let outcome = match self.registry.bind(step) {
                Ok(bound) => run_step(&mut world, bound).await,
                Err(e) => Err(e),
            };
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    debug!("  {} {} ({} ms)", step.keyword.as_str(), step.text, duration_ms);
                    steps.push(StepResult::new(step, StepStatus::Passed, duration_ms, None));
                }
                Err(e) => {
                    let message = format!("{} {}: {}", step.keyword.as_str(), step.text, e);
                    steps.push(StepResult::new(
                        step,
                        status_of(&e),
                        duration_ms,
                        Some(e.to_string()),
                    ));
                    scenario_error = Some(message);
                }
            }
        }

        let mut screenshot = None;
        if scenario_error.is_some() && self.config.screenshot_on_failure {
            match self.failure_screenshot(&world.page, &selected.scenario.name).await {
                Ok(path) => {
                    info!("Failure screenshot: {}", path.display());
                    screenshot = Some(path);
                }
                Err(e) => warn!("Could not capture failure screenshot: {}", e),
            }
        }

        drop(world);
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        Ok(ScenarioResult {
            feature: selected.feature.clone(),
            name: selected.scenario.name.clone(),
            tags: selected.tags.clone(),
            success: scenario_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: scenario_error,
            screenshot,
        })
    }

    /// Bind every step of a scenario without running it
    fn bind_only(&self, selected: &SelectedScenario) -> ScenarioResult {
        let mut steps = Vec::new();
        let mut errors = Vec::new();

        for step in selected.steps() {
            match self.registry.bind(step) {
                Ok(_) => steps.push(StepResult::new(step, StepStatus::Passed, 0, None)),
                Err(e) => {
                    errors.push(format!("line {}: {}", step.line, e));
                    steps.push(StepResult::new(step, status_of(&e), 0, Some(e.to_string())));
                }
            }
        }

        ScenarioResult {
            feature: selected.feature.clone(),
            name: selected.scenario.name.clone(),
            tags: selected.tags.clone(),
            success: errors.is_empty(),
            duration_ms: 0,
            steps,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
            screenshot: None,
        }
    }

    async fn failure_screenshot(&self, page: &Page, scenario: &str) -> E2eResult<PathBuf> {
        let dir = self.config.output_dir.join("screenshots");
        std::fs::create_dir_all(&dir)?;
        let file = format!("{}-{}.png", slug(scenario), Utc::now().format("%Y%m%dT%H%M%S%3f"));
        page.screenshot(&dir.join(file), true).await
    }

    fn finish(&self, mut suite: TestSuiteResult, start: Instant) -> TestSuiteResult {
        suite.duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        suite
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

async fn run_step(world: &mut World, bound: BoundStep<'_>) -> E2eResult<()> {
    (bound.definition.handler)(world, bound.args).await
}

fn status_of(error: &E2eError) -> StepStatus {
    match error {
        E2eError::UndefinedStep(_) | E2eError::AmbiguousStep { .. } => StepStatus::Undefined,
        _ => StepStatus::Failed,
    }
}

fn failed_to_start(selected: &SelectedScenario, e: E2eError) -> ScenarioResult {
    ScenarioResult {
        feature: selected.feature.clone(),
        name: selected.scenario.name.clone(),
        tags: selected.tags.clone(),
        success: false,
        duration_ms: 0,
        steps: selected
            .steps()
            .map(|s| StepResult::new(s, StepStatus::Skipped, 0, None))
            .collect(),
        error: Some(e.to_string()),
        screenshot: None,
    }
}

/// Apply the tag and name filters to every scenario of every feature
pub fn filter_scenarios(features: &[Feature], config: &RunnerConfig) -> Vec<SelectedScenario> {
    let mut selected = Vec::new();
    for feature in features {
        for scenario in &feature.scenarios {
            let tags = feature.effective_tags(scenario);
            if !tags_match(&tags, &config.tags, &config.skip_tags) {
                continue;
            }
            if let Some(name) = &config.name {
                if !scenario.name.contains(name.as_str()) {
                    continue;
                }
            }
            selected.push(SelectedScenario {
                feature: feature.name.clone(),
                tags,
                background: feature.background.clone(),
                scenario: scenario.clone(),
            });
        }
    }
    selected
}

/// Tags compare without their leading `@`
fn tags_match(tags: &[String], wanted: &[String], skipped: &[String]) -> bool {
    let has = |t: &String| {
        let t = t.trim_start_matches('@');
        tags.iter().any(|own| own.trim_start_matches('@') == t)
    };
    if skipped.iter().any(has) {
        return false;
    }
    wanted.is_empty() || wanted.iter().any(has)
}

/// Lowercase alphanumerics joined by single dashes
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const FEATURE: &str = r#"@regression
Feature: Cart

  Background:
    Given I am on the Pinecrest Home Goods website

  @smoke
  Scenario: Empty cart
    When I navigate to the cart page
    Then I should see the empty cart message

  @slow
  Scenario: Apply a coupon
    When I navigate to the cart page
    Then I pick a colour nobody defined
"#;

    fn features() -> Vec<Feature> {
        vec![Feature::parse(FEATURE, Path::new("cart.feature")).unwrap()]
    }

    fn names(selected: &[SelectedScenario]) -> Vec<&str> {
        selected.iter().map(|s| s.scenario.name.as_str()).collect()
    }

    #[test_case(&[], &[], None, &["Empty cart", "Apply a coupon"] ; "no filters")]
    #[test_case(&["@smoke"], &[], None, &["Empty cart"] ; "tag")]
    #[test_case(&["regression"], &[], None, &["Empty cart", "Apply a coupon"] ; "feature tag without at")]
    #[test_case(&[], &["@slow"], None, &["Empty cart"] ; "skip tag")]
    #[test_case(&["@smoke"], &["@regression"], None, &[] ; "skip wins")]
    #[test_case(&[], &[], Some("coupon"), &["Apply a coupon"] ; "name substring")]
    fn test_filter_scenarios(tags: &[&str], skip: &[&str], name: Option<&str>, expected: &[&str]) {
        let config = RunnerConfig {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            skip_tags: skip.iter().map(|t| t.to_string()).collect(),
            name: name.map(String::from),
            ..Default::default()
        };
        let selected = filter_scenarios(&features(), &config);
        assert_eq!(names(&selected), expected);
    }

    #[test]
    fn test_selected_steps_include_background() {
        let selected = filter_scenarios(&features(), &RunnerConfig::default());
        let texts: Vec<_> = selected[0].steps().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "I am on the Pinecrest Home Goods website",
                "I navigate to the cart page",
                "I should see the empty cart message",
            ]
        );
        assert_eq!(selected[0].tags, ["@regression", "@smoke"]);
    }

    #[tokio::test]
    async fn test_dry_run_reports_undefined_steps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cart.feature"), FEATURE).unwrap();

        let mut runner = TestRunner::with_config(RunnerConfig {
            features_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            dry_run: true,
            ..Default::default()
        })
        .unwrap();
        let suite = runner.run_all().await.unwrap();

        assert_eq!(suite.total, 2);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        let failed = &suite.results[1];
        assert_eq!(failed.steps[2].status, StepStatus::Undefined);
        assert!(failed.error.as_deref().unwrap().contains("line 15"));

        let path = runner.write_results(&suite).unwrap();
        let written: TestSuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.failed, 1);
    }

    #[test_case("Apply a valid coupon code", "apply-a-valid-coupon-code")]
    #[test_case("Cart (example 2)", "cart-example-2")]
    #[test_case("  --Hello--  ", "hello")]
    fn test_slug(name: &str, expected: &str) {
        assert_eq!(slug(name), expected);
    }
}
