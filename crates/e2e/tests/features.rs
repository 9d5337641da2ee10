use std::collections::HashSet;
use std::path::PathBuf;

use pinecrest_e2e::runner::{filter_scenarios, RunnerConfig};
use pinecrest_e2e::{Feature, StepRegistry, TestRunner};

fn features_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("features")
}

/// Shipped Feature Files Test
///
/// Every `.feature` file under `features/` parses, and every step of every
/// scenario (background included) binds to exactly one step definition.
/// Runs offline: nothing here starts a browser.
#[test]
fn every_shipped_step_binds_to_one_definition() {
    let features = Feature::load_all(&features_dir()).expect("feature files parse");
    assert!(features.len() >= 7, "expected one feature per site area, found {}", features.len());

    let registry = StepRegistry::new().expect("registry builds");
    let mut problems = Vec::new();

    for feature in &features {
        assert!(!feature.scenarios.is_empty(), "{} has no scenarios", feature.path.display());
        for scenario in &feature.scenarios {
            for step in feature.background.iter().chain(&scenario.steps) {
                if let Err(e) = registry.bind(step) {
                    problems.push(format!("{}:{}: {}", feature.path.display(), step.line, e));
                }
            }
        }
    }

    assert!(problems.is_empty(), "unbound steps:\n{}", problems.join("\n"));
}

#[test]
fn scenario_names_are_unique_per_feature() {
    for feature in Feature::load_all(&features_dir()).unwrap() {
        let mut seen = HashSet::new();
        for scenario in &feature.scenarios {
            assert!(
                seen.insert(scenario.name.as_str()),
                "{} repeats scenario '{}'",
                feature.path.display(),
                scenario.name
            );
        }
    }
}

#[test]
fn smoke_tag_selects_a_subset() {
    let features = Feature::load_all(&features_dir()).unwrap();
    let all = filter_scenarios(&features, &RunnerConfig::default());
    let smoke = filter_scenarios(
        &features,
        &RunnerConfig {
            tags: vec!["@smoke".to_string()],
            ..Default::default()
        },
    );

    assert!(!smoke.is_empty());
    assert!(smoke.len() < all.len());
    assert!(smoke.iter().all(|s| s.tags.iter().any(|t| t == "@smoke")));
}

#[tokio::test]
async fn dry_run_passes_for_every_shipped_scenario() {
    let output = tempfile::tempdir().unwrap();
    let mut runner = TestRunner::with_config(RunnerConfig {
        features_dir: features_dir(),
        output_dir: output.path().to_path_buf(),
        dry_run: true,
        ..Default::default()
    })
    .unwrap();

    let results = runner.run_all().await.unwrap();
    assert!(results.total > 0);
    assert_eq!(results.failed, 0, "{:#?}", results.results.iter().filter(|r| !r.success).collect::<Vec<_>>());

    let path = runner.write_results(&results).unwrap();
    assert!(path.ends_with("test-results.json"));
}
