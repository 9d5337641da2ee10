//! E2E test harness entry point
//!
//! This file is the test binary that runs the Gherkin features against the
//! live site. Run with: cargo test --package pinecrest-e2e --test e2e -- --tag @smoke

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pinecrest_common::SiteConfig;
use pinecrest_e2e::playwright::{Browser, PlaywrightConfig};
use pinecrest_e2e::{RunnerConfig, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "pinecrest-e2e")]
#[command(about = "Browser end-to-end suite for the Pinecrest Home Goods site")]
struct Args {
    /// Directory holding the .feature files
    #[arg(short, long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/features"))]
    features: PathBuf,

    /// Run only scenarios with this tag (repeatable, any of)
    #[arg(short, long)]
    tag: Vec<String>,

    /// Skip scenarios with this tag (repeatable)
    #[arg(long)]
    skip_tag: Vec<String>,

    /// Run only scenarios whose name contains this text
    #[arg(short, long)]
    name: Option<String>,

    /// Site configuration file
    #[arg(long, env = "PINECREST_CONFIG", default_value_os_t = pinecrest_common::default_config_path())]
    config: PathBuf,

    /// Override the site base URL
    #[arg(long, env = "PINECREST_BASE_URL")]
    base_url: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, env = "PINECREST_BROWSER", default_value = "chromium")]
    browser: String,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Output directory for results and failure screenshots
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Bind every step without starting a browser
    #[arg(long)]
    dry_run: bool,

    /// Do not wait for the site before running
    #[arg(long)]
    no_preflight: bool,

    /// Seconds to wait for the site to answer
    #[arg(long, default_value = "30")]
    preflight_timeout: u64,

    /// Stop at the first failing scenario
    #[arg(long)]
    fail_fast: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<bool> {
    let mut site = SiteConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(base_url) = args.base_url {
        site = site.with_base_url(base_url);
        site.validate()?;
    }
    info!("Testing {}", site.base_url);

    let browser: Browser = args.browser.parse()?;

    let config = RunnerConfig {
        site,
        playwright: PlaywrightConfig {
            browser,
            headless: !args.headed,
            viewport_width: args.viewport_width,
            viewport_height: args.viewport_height,
            screenshot_dir: args.output.join("screenshots"),
            ..Default::default()
        },
        features_dir: args.features,
        output_dir: args.output,
        tags: args.tag,
        skip_tags: args.skip_tag,
        name: args.name,
        preflight: !args.no_preflight,
        preflight_timeout: Duration::from_secs(args.preflight_timeout),
        fail_fast: args.fail_fast,
        dry_run: args.dry_run,
        ..Default::default()
    };

    let mut runner = TestRunner::with_config(config)?;
    let results = runner.run_all().await?;
    runner.write_results(&results)?;

    Ok(results.success())
}
