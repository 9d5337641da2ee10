//! Error types for E2E testing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Driver process exited")]
    DriverClosed,

    #[error("{command} failed: {message}")]
    Browser { command: String, message: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("{0}")]
    SoftAssertions(String),

    #[error("{}:{line}: {message}", path.display())]
    FeatureParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Undefined step: {0}")]
    UndefinedStep(String),

    #[error("Ambiguous step '{text}' matches: {}", candidates.join(", "))]
    AmbiguousStep {
        text: String,
        candidates: Vec<String>,
    },

    #[error("Invalid step argument: {0}")]
    InvalidStepArgument(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Site {url} unreachable after {attempts} attempts")]
    SiteUnreachable { url: String, attempts: usize },

    #[error(transparent)]
    Config(#[from] pinecrest_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl E2eError {
    pub fn assertion(message: impl Into<String>) -> Self {
        E2eError::AssertionFailed(message.into())
    }

    pub fn step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::StepFailed {
            step: step.into(),
            reason: reason.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
