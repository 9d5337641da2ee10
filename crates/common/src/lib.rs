//! Pinecrest Common Library
//!
//! Site configuration and small helpers shared by the browser suite.

pub mod config;
pub mod error;
pub mod money;

pub use config::{SiteConfig, SitePage, Timeouts};
pub use error::{Error, Result};

/// Default location of the site configuration file
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("pinecrest.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_is_relative() {
        let path = default_config_path();
        assert!(path.is_relative());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }
}
