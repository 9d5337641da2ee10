//! Pinecrest E2E Test Suite
//!
//! Browser end-to-end tests for the Pinecrest Home Goods storefront:
//! - Parses Gherkin feature files and binds every step to one definition
//! - Drives Chromium, Firefox or WebKit through a Node Playwright driver
//! - Wraps each site page in a page object with auto-retrying assertions
//! - Records console errors and failed requests per scenario
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── Feature::load_all(dir) -> [Feature]                  │
//! │    ├── StepRegistry::bind(step) -> BoundStep                │
//! │    ├── SiteProbe::wait_until_reachable(url)                 │
//! │    └── run_scenario(scenario) -> ScenarioResult             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  World (one per scenario)                                   │
//! │    ├── Page ── driver.js (JSON lines) ── Playwright         │
//! │    ├── HomePage, AboutPage, ProductsPage, CartPage, ...     │
//! │    │     └── Locator + expect(..).to_be_visible()           │
//! │    ├── PageMonitor { failed requests, console errors }      │
//! │    └── ScenarioState                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod expect;
pub mod feature;
pub mod locator;
pub mod monitor;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod site;
pub mod steps;
pub mod world;

pub use error::{E2eError, E2eResult};
pub use feature::{DataTable, Feature, Scenario, Step};
pub use runner::{RunnerConfig, TestRunner, TestSuiteResult};
pub use steps::StepRegistry;
pub use world::World;
