//! Site configuration
//!
//! Every URL, expected title, timeout and piece of test data the suite relies
//! on lives here so page objects never hard-code them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::{Error, Result};

/// Storefront under test
pub const DEFAULT_BASE_URL: &str = "https://www.pinecresthomegoods.com";

/// Top-level site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host, without a trailing slash
    pub base_url: String,

    /// Page paths relative to the base URL
    pub urls: PageUrls,

    /// Expected document titles
    pub titles: PageTitles,

    /// Wait budgets in milliseconds
    pub timeouts: Timeouts,

    /// Fixed data the scenarios submit or look for
    pub test_data: TestData,

    /// Product catalogue facts shown on the home page
    pub product_specs: ProductSpecs,

    /// SEO length limits
    pub seo: SeoLimits,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            urls: PageUrls::default(),
            titles: PageTitles::default(),
            timeouts: Timeouts::default(),
            test_data: TestData::default(),
            product_specs: ProductSpecs::default(),
            seo: SeoLimits::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageUrls {
    pub home: String,
    pub about: String,
    pub products: String,
    pub installations: String,
    pub gallery: String,
    pub contact: String,
    pub my_account: String,
    pub cart: String,
}

impl Default for PageUrls {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            about: "/about-us/".to_string(),
            products: "/shop/".to_string(),
            installations: "/installations/".to_string(),
            gallery: "/gallery/".to_string(),
            contact: "/contact/".to_string(),
            my_account: "/my-account/".to_string(),
            cart: "/cart/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageTitles {
    pub home: String,
    pub about: String,
    pub products: String,
    pub installations: String,
    pub gallery: String,
    pub contact: String,
    pub my_account: String,
    pub cart: String,
}

impl Default for PageTitles {
    fn default() -> Self {
        let suffixed = |name: &str| format!("{} - Pinecrest Home Goods", name);
        Self {
            home: "Pinecrest Home Goods".to_string(),
            about: suffixed("About Us"),
            products: suffixed("Shop"),
            installations: suffixed("Installations"),
            gallery: suffixed("Gallery"),
            contact: suffixed("Contact"),
            my_account: suffixed("My Account"),
            cart: suffixed("Cart"),
        }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub short: u64,
    pub medium: u64,
    pub long: u64,
    pub network_idle: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            short: 5_000,
            medium: 10_000,
            long: 15_000,
            network_idle: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestData {
    pub contact_email: String,
    pub facebook_url: String,
    pub instagram_url: String,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,

    /// Product added through `/?add-to-cart=<id>` when the shop UI path fails
    pub fallback_product_id: u64,

    /// Coupon that the coupon scenarios submit
    pub test_coupon: String,
}

impl Default for TestData {
    fn default() -> Self {
        Self {
            contact_email: "info@pinecresthomegoods.com".to_string(),
            facebook_url: "facebook.com/profile.php?id=100089755204379".to_string(),
            instagram_url: "instagram.com/pinecresthomegoods".to_string(),
            company_phone: None,
            company_address: None,
            fallback_product_id: 26179,
            test_coupon: "pinecrest10".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSpecs {
    pub min_width: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub material: String,
    pub features: Vec<String>,
    pub guarantee_days: u32,
}

impl Default for ProductSpecs {
    fn default() -> Self {
        Self {
            min_width: 20,
            max_width: 96,
            max_height: 78,
            material: "100% Premium Polyester".to_string(),
            features: vec![
                "Dual-Layer Design".to_string(),
                "Custom Size Availability".to_string(),
            ],
            guarantee_days: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoLimits {
    pub min_title_length: usize,
    pub max_title_length: usize,
    pub min_meta_description_length: usize,
    pub max_meta_description_length: usize,
}

impl Default for SeoLimits {
    fn default() -> Self {
        Self {
            min_title_length: 10,
            max_title_length: 60,
            min_meta_description_length: 120,
            max_meta_description_length: 160,
        }
    }
}

impl SeoLimits {
    pub fn title_ok(&self, title: &str) -> bool {
        let len = title.chars().count();
        len >= self.min_title_length && len <= self.max_title_length
    }

    pub fn meta_description_ok(&self, description: &str) -> bool {
        let len = description.chars().count();
        len >= self.min_meta_description_length && len <= self.max_meta_description_length
    }
}

/// Pages the configuration knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitePage {
    Home,
    About,
    Products,
    Installations,
    Gallery,
    Contact,
    MyAccount,
    Cart,
}

impl SitePage {
    pub const ALL: [SitePage; 8] = [
        SitePage::Home,
        SitePage::About,
        SitePage::Products,
        SitePage::Installations,
        SitePage::Gallery,
        SitePage::Contact,
        SitePage::MyAccount,
        SitePage::Cart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SitePage::Home => "home",
            SitePage::About => "about",
            SitePage::Products => "products",
            SitePage::Installations => "installations",
            SitePage::Gallery => "gallery",
            SitePage::Contact => "contact",
            SitePage::MyAccount => "my_account",
            SitePage::Cart => "cart",
        }
    }
}

impl fmt::Display for SitePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SitePage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();
        match key.as_str() {
            "home" => Ok(SitePage::Home),
            "about" | "aboutus" => Ok(SitePage::About),
            "products" | "shop" => Ok(SitePage::Products),
            "installations" => Ok(SitePage::Installations),
            "gallery" => Ok(SitePage::Gallery),
            "contact" => Ok(SitePage::Contact),
            "myaccount" => Ok(SitePage::MyAccount),
            "cart" => Ok(SitePage::Cart),
            _ => Err(Error::UnknownPage(s.to_string())),
        }
    }
}

impl SiteConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            debug!("Loaded site config from {}", path.display());
            config
        } else {
            debug!("No site config at {}, using defaults", path.display());
            Self::default()
        };
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        let t = &self.timeouts;
        if t.short == 0 || t.medium == 0 || t.long == 0 || t.network_idle == 0 {
            return Err(Error::InvalidConfig("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Override the base URL, dropping any trailing slash
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.normalize();
        self
    }

    fn normalize(&mut self) {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
    }

    pub fn path_of(&self, page: SitePage) -> &str {
        let urls = &self.urls;
        match page {
            SitePage::Home => &urls.home,
            SitePage::About => &urls.about,
            SitePage::Products => &urls.products,
            SitePage::Installations => &urls.installations,
            SitePage::Gallery => &urls.gallery,
            SitePage::Contact => &urls.contact,
            SitePage::MyAccount => &urls.my_account,
            SitePage::Cart => &urls.cart,
        }
    }

    pub fn title_of(&self, page: SitePage) -> &str {
        let titles = &self.titles;
        match page {
            SitePage::Home => &titles.home,
            SitePage::About => &titles.about,
            SitePage::Products => &titles.products,
            SitePage::Installations => &titles.installations,
            SitePage::Gallery => &titles.gallery,
            SitePage::Contact => &titles.contact,
            SitePage::MyAccount => &titles.my_account,
            SitePage::Cart => &titles.cart,
        }
    }

    pub fn url_of(&self, page: SitePage) -> String {
        format!("{}{}", self.base_url, self.path_of(page))
    }

    /// Full URL for a page given by name
    pub fn full_url(&self, page: &str) -> Result<String> {
        Ok(self.url_of(page.parse()?))
    }

    /// Expected title for a page given by name
    pub fn page_title(&self, page: &str) -> Result<String> {
        Ok(self.title_of(page.parse()?).to_string())
    }

    /// Resolve an href against the base URL
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    /// Whether a URL points at the storefront host
    pub fn is_on_site(&self, url: &str) -> bool {
        match (host_of(&self.base_url), host_of(url)) {
            (Some(site), Some(host)) => bare_host(&site) == bare_host(&host),
            _ => false,
        }
    }
}

/// Lower-cased host of an absolute http(s) URL, without userinfo or port
fn host_of(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = authority.split(':').next().unwrap_or_default();
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("home", "https://www.pinecresthomegoods.com/" ; "home")]
    #[test_case("ABOUT", "https://www.pinecresthomegoods.com/about-us/" ; "upper case")]
    #[test_case("shop", "https://www.pinecresthomegoods.com/shop/" ; "shop alias")]
    #[test_case("my_account", "https://www.pinecresthomegoods.com/my-account/" ; "snake case")]
    #[test_case("My Account", "https://www.pinecresthomegoods.com/my-account/" ; "spaced")]
    fn test_full_url(page: &str, expected: &str) {
        let config = SiteConfig::default();
        assert_eq!(config.full_url(page).unwrap(), expected);
    }

    #[test]
    fn test_unknown_page_is_an_error() {
        let config = SiteConfig::default();
        let err = config.full_url("checkout").unwrap_err();
        assert!(matches!(err, Error::UnknownPage(ref p) if p == "checkout"));
        assert!(config.page_title("blog").is_err());
    }

    #[test]
    fn test_page_titles() {
        let config = SiteConfig::default();
        assert_eq!(config.page_title("home").unwrap(), "Pinecrest Home Goods");
        assert_eq!(config.page_title("cart").unwrap(), "Cart - Pinecrest Home Goods");
        assert_eq!(config.page_title("about").unwrap(), "About Us - Pinecrest Home Goods");
    }

    #[test]
    fn test_every_page_resolves() {
        let config = SiteConfig::default();
        for page in SitePage::ALL {
            assert_eq!(page.as_str().parse::<SitePage>().unwrap(), page);
            assert!(config.url_of(page).starts_with(DEFAULT_BASE_URL));
            assert!(config.title_of(page).ends_with("Pinecrest Home Goods"));
        }
    }

    #[test]
    fn test_absolute_url() {
        let config = SiteConfig::default().with_base_url("http://localhost:8080/");
        assert_eq!(config.absolute_url("/cart/"), "http://localhost:8080/cart/");
        assert_eq!(config.absolute_url("shop/"), "http://localhost:8080/shop/");
        assert_eq!(config.absolute_url("https://example.com/x"), "https://example.com/x");
    }

    #[test_case("https://pinecresthomegoods.com/gallery/", true ; "bare host")]
    #[test_case("https://www.pinecresthomegoods.com/", true ; "www host")]
    #[test_case("http://WWW.PinecrestHomeGoods.com:443/cart/?x=1", true ; "case and port")]
    #[test_case("https://www.facebook.com/pinecrest", false ; "other site")]
    #[test_case("https://evil.test/?pinecresthomegoods.com", false ; "host in query")]
    #[test_case("https://evil.test/#www.pinecresthomegoods.com", false ; "host in fragment")]
    #[test_case("https://pinecresthomegoods.com@evil.test/", false ; "host as userinfo")]
    #[test_case("https://pinecresthomegoods.com.evil.test/", false ; "host as prefix")]
    #[test_case("/gallery/", false ; "relative path")]
    fn test_is_on_site(url: &str, expected: bool) {
        let config = SiteConfig::default();
        assert_eq!(config.is_on_site(url), expected);
    }

    #[test]
    fn test_load_trims_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "base_url = \"https://staging.example.com/\"\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.url_of(SitePage::About), "https://staging.example.com/about-us/");
        assert_eq!(config.full_url("cart").unwrap(), "https://staging.example.com/cart/");
    }

    #[test]
    fn test_seo_limits() {
        let seo = SeoLimits::default();
        assert!(seo.title_ok("Pinecrest Home Goods"));
        assert!(!seo.title_ok("Short"));
        assert!(!seo.meta_description_ok("too short"));
        assert!(seo.meta_description_ok(&"x".repeat(140)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiteConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeouts.long, 15_000);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://staging.pinecresthomegoods.com"

[timeouts]
long = 20000
"#,
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://staging.pinecresthomegoods.com");
        assert_eq!(config.timeouts.long, 20_000);
        assert_eq!(config.timeouts.short, 5_000);
        assert_eq!(config.urls.cart, "/cart/");
        assert_eq!(config.test_data.fallback_product_id, 26179);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("site.toml");
        let mut config = SiteConfig::default();
        config.test_data.test_coupon = "spring20".to_string();
        config.save(&path).unwrap();

        let loaded = SiteConfig::load(&path).unwrap();
        assert_eq!(loaded.test_data.test_coupon, "spring20");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "base_url = \"ftp://pinecrest\"\n").unwrap();
        assert!(matches!(SiteConfig::load(&path), Err(Error::InvalidConfig(_))));
    }
}
