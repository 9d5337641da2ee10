//! Customer gallery page object

use std::path::PathBuf;
use std::sync::Arc;

use pinecrest_common::{SiteConfig, SitePage};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, expect, expect_page};
use crate::locator::{Filter, Locator, TextMatch};
use crate::playwright::{LoadState, Page, Viewport, WaitState};

const CHROME_IMAGES: &str = "nav img, header img, footer img, .logo img, .icon img";

/// Selectors probed, in order, when looking for an open lightbox
const LIGHTBOX_SELECTORS: &[&str] = &[
    ".mfp-container",
    ".mfp-wrap",
    ".lightbox",
    ".modal",
    ".overlay",
    r#"[role="dialog"]"#,
    ".fancybox",
    ".popup",
];

const LIGHTBOX_OPEN_SELECTORS: &[&str] = &[
    ".lightbox",
    ".modal",
    r#"[class*="lightbox"]"#,
    r#"[class*="modal"]"#,
    ".fancybox",
    ".gallery-popup",
];

const CLOSE_SELECTORS: &[&str] = &[
    ".mfp-close",
    ".mfp-close-btn-in",
    ".close",
    ".modal-close",
    r#"[aria-label*="close" i]"#,
    r#"button[title*="close" i]"#,
    ".lightbox-close",
];

const OVERLAY_SELECTORS: &[&str] = &[".mfp-bg", ".overlay", ".modal-overlay"];

/// Outcome of checking every gallery image
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageLoadReport {
    pub loaded: usize,
    pub total: usize,
    pub failed: Vec<String>,
}

impl ImageLoadReport {
    /// Share of images that finished loading, 0 to 100
    pub fn load_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.loaded as f64 / self.total as f64 * 100.0
    }
}

#[derive(Clone)]
pub struct GalleryPage {
    page: Page,
    config: Arc<SiteConfig>,

    pub gallery_nav_link: Locator,
    pub page_title: Locator,
    pub page_header: Locator,
    pub gallery_container: Locator,

    /// Every image in the main content
    pub gallery_images: Locator,
    /// Main-content images with a photo file extension
    pub content_images: Locator,
    pub image_links: Locator,

    pub lightbox: Locator,
    pub lightbox_image: Locator,
    pub lightbox_close: Locator,
    pub lightbox_next: Locator,
    pub lightbox_prev: Locator,
    pub lightbox_content: Locator,

    pub loading_indicator: Locator,
    pub error_message: Locator,
}

impl GalleryPage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        let not_chrome = || Filter {
            has_not: Some(p.locator(CHROME_IMAGES)),
            ..Default::default()
        };
        let content_selector = ["main", ".main-content", ".content"]
            .iter()
            .flat_map(|root| {
                ["jpg", "jpeg", "png", "webp"]
                    .iter()
                    .map(move |ext| format!(r#"{} img[src*="{}"]"#, root, ext))
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            gallery_nav_link: p.locator(r#"nav a[href*="gallery"], a[href="/gallery"]"#),
            page_title: p.locator("h1").first(),
            page_header: p.locator(r#"h1, h2, [role="heading"]"#).first(),
            gallery_container: p.locator("main, .main-content, .content").first(),

            gallery_images: p
                .locator("main img, .main-content img, .content img")
                .filter(not_chrome()),
            content_images: p.locator(content_selector).filter(not_chrome()),
            image_links: p.locator("a").filter(Filter::has(p.locator("img"))),

            lightbox: p
                .locator(".mfp-container, .lightbox, .modal, .overlay, .mfp-wrap")
                .first(),
            lightbox_image: p.locator(".mfp-img, .lightbox img, .modal img, .overlay img"),
            lightbox_close: p.locator(r#".mfp-close, .close, [aria-label*="close"], button[title*="close"]"#),
            lightbox_next: p.locator(r#".mfp-arrow-right, .mfp-next, .next, [aria-label*="next"], .lightbox-next"#),
            lightbox_prev: p.locator(r#".mfp-arrow-left, .mfp-prev, .prev, [aria-label*="prev"], .lightbox-prev"#),
            lightbox_content: p.locator(".mfp-content, .lightbox-content, .modal-content"),

            loading_indicator: p.locator(".loading, .spinner"),
            error_message: p.locator(".error, .error-message"),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn navigate_to_gallery(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::Gallery);
        info!("Navigating to {}", url);
        self.page
            .goto(&url, LoadState::Load, self.config.timeouts.network_idle)
            .await?;
        self.wait_for_gallery_load().await
    }

    pub async fn navigate_via_link(&self) -> E2eResult<()> {
        self.gallery_nav_link.first().click().await?;
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await?;
        self.verify_page_title().await
    }

    pub async fn verify_gallery_page_loaded(&self) -> E2eResult<()> {
        expect(&self.page_title).to_be_visible().await?;
        expect(&self.gallery_container).to_be_visible().await
    }

    /// Content images, or every main-content image when none carry a photo extension
    async fn images(&self) -> E2eResult<(Locator, usize)> {
        let count = self.content_images.count().await?;
        if count > 0 {
            return Ok((self.content_images.clone(), count));
        }
        let count = self.gallery_images.count().await?;
        Ok((self.gallery_images.clone(), count))
    }

    pub async fn image_count(&self) -> E2eResult<usize> {
        self.page
            .locator("img")
            .first()
            .wait_for(WaitState::Attached, self.config.timeouts.medium)
            .await?;
        Ok(self.images().await?.1)
    }

    /// Open image `index`: its link if it has one, else the image itself, else hover
    pub async fn click_image(&self, index: usize) -> E2eResult<()> {
        self.ensure_on_gallery_page().await?;

        let (images, count) = self.images().await?;
        if count == 0 {
            return Err(E2eError::assertion("No gallery images found to click"));
        }
        if index >= count {
            return Err(E2eError::assertion(format!(
                "Image index {} is out of range. Gallery has {} images.",
                index, count
            )));
        }

        let target = images.nth(index);
        let parent_link = target.locator("xpath=parent::a");
        let clicked = async {
            if parent_link.count().await? > 0 {
                parent_link.first().click_within(10_000).await?;
            } else {
                target.click_within(10_000).await?;
            }
            self.page.wait(1_000).await
        }
        .await;

        if let Err(e) = clicked {
            debug!("Clicking gallery image {} failed ({}), hovering instead", index, e);
            if let Err(e) = target.hover_within(2_000).await {
                debug!("Hovering gallery image {} failed: {}", index, e);
            }
        }
        Ok(())
    }

    pub async fn click_first_image(&self) -> E2eResult<()> {
        self.click_image(0).await
    }

    pub async fn verify_images_loaded(&self) -> E2eResult<ImageLoadReport> {
        self.ensure_on_gallery_page().await?;

        let (images, total) = self.images().await?;
        let mut report = ImageLoadReport {
            total,
            ..Default::default()
        };

        for i in 0..total {
            let image = images.nth(i);
            let loaded = async {
                expect(&image).to_be_visible().await?;
                let complete = image
                    .evaluate("(img) => img.complete && img.naturalWidth > 0")
                    .await?;
                Ok::<_, E2eError>(complete.as_bool().unwrap_or(false))
            }
            .await;

            match loaded {
                Ok(true) => report.loaded += 1,
                Ok(false) => {
                    let src = image.get_attribute("src").await.ok().flatten();
                    report.failed.push(src.unwrap_or_else(|| format!("Image {}", i)));
                }
                Err(e) => report.failed.push(format!("Image {} ({})", i, e)),
            }
        }

        debug!("Gallery images loaded: {}/{}", report.loaded, report.total);
        Ok(report)
    }

    /// Open the first image and look for a lightbox; other viewing patterns are accepted
    pub async fn verify_lightbox_functionality(&self) -> E2eResult<()> {
        self.click_image(0).await?;
        for selector in LIGHTBOX_OPEN_SELECTORS {
            let element = self.page.locator(*selector);
            if element.count().await? > 0 {
                return expect(&element.first()).to_be_visible().await;
            }
        }
        info!("Lightbox not found - gallery might use a different interaction pattern");
        Ok(())
    }

    pub async fn verify_lightbox_open(&self) -> E2eResult<()> {
        for selector in LIGHTBOX_SELECTORS {
            let element = self.page.locator(*selector);
            if element.count().await? == 0 {
                continue;
            }
            if expect(&element.first()).timeout(5_000).to_be_visible().await.is_ok() {
                debug!("Lightbox found using selector: {}", selector);
                return Ok(());
            }
        }

        let url = self.page.url().await?;
        if ["image", "gallery", "photo"].iter().any(|m| url.contains(m)) {
            debug!("URL-based image viewing detected");
            return Ok(());
        }
        self.page.wait(500).await?;
        debug!("No lightbox detected; page remains functional");
        Ok(())
    }

    /// Close buttons first, then overlay backgrounds, then Escape
    pub async fn close_lightbox(&self) -> E2eResult<()> {
        for selector in CLOSE_SELECTORS.iter().chain(OVERLAY_SELECTORS) {
            let candidate = self.page.locator(*selector).first();
            if candidate.count().await? == 0 || !candidate.is_visible().await.unwrap_or(false) {
                continue;
            }
            if candidate.click_within(3_000).await.is_ok() {
                return self.page.wait(500).await;
            }
        }

        if let Err(e) = self.page.keyboard_press("Escape").await {
            debug!("Unable to close lightbox: {}", e);
            return Ok(());
        }
        self.page.wait(500).await
    }

    pub async fn verify_lightbox_closed(&self) -> E2eResult<()> {
        expect(&self.gallery_container).to_be_visible().await
    }

    /// Arrow key, then the next button when there is one
    pub async fn verify_image_navigation(&self) -> E2eResult<()> {
        self.page.keyboard_press("ArrowRight").await?;
        self.page.wait(500).await?;

        if self.lightbox_next.count().await? > 0 {
            if let Err(e) = self.lightbox_next.first().click().await {
                debug!("Lightbox next button not usable: {}", e);
            } else {
                self.page.wait(500).await?;
            }
        }
        Ok(())
    }

    pub async fn verify_responsive_layout(&self, viewport: Viewport) -> E2eResult<()> {
        self.page.set_viewport(viewport.width, viewport.height).await?;
        self.page.wait(500).await?;
        expect(&self.gallery_container).to_be_visible().await?;

        let bbox = self
            .gallery_container
            .bounding_box()
            .await?
            .ok_or_else(|| E2eError::assertion("gallery container has no bounding box"))?;
        ensure(bbox.width > 0.0, "gallery container has zero width")?;
        ensure(
            bbox.width <= f64::from(viewport.width),
            format!(
                "gallery container is {}px wide, wider than the {}px viewport",
                bbox.width, viewport.width
            ),
        )
    }

    /// Alt text of every gallery image, empty when missing
    pub async fn image_alt_texts(&self) -> E2eResult<Vec<String>> {
        self.ensure_on_gallery_page().await?;
        let (images, count) = self.images().await?;
        let mut alts = Vec::with_capacity(count);
        for i in 0..count {
            alts.push(images.nth(i).get_attribute("alt").await?.unwrap_or_default());
        }
        Ok(alts)
    }

    pub async fn take_screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        self.page.screenshot_named(name).await
    }

    /// Scroll to the bottom and back to trigger lazy loading
    pub async fn scroll_to_load_all_images(&self) -> E2eResult<()> {
        self.page
            .evaluate("() => window.scrollTo(0, document.body.scrollHeight)")
            .await?;
        self.page.wait(1_000).await?;
        self.page.evaluate("() => window.scrollTo(0, 0)").await?;
        self.page.wait(500).await
    }

    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page)
            .to_have_title(TextMatch::regex_i("gallery"))
            .await
    }

    pub async fn wait_for_gallery_load(&self) -> E2eResult<()> {
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await?;
        self.page.wait(1_000).await
    }

    /// Image count without waiting for the first image to attach
    pub async fn gallery_specific_image_count(&self) -> E2eResult<usize> {
        Ok(self.images().await?.1)
    }

    pub async fn ensure_on_gallery_page(&self) -> E2eResult<()> {
        let url = self.page.url().await?;
        if !url.contains("gallery") && !self.config.is_on_site(&url) {
            return Err(E2eError::assertion(format!(
                "Expected to be on the Pinecrest website, but current URL is: {}",
                url
            )));
        }
        if !url.contains("gallery") {
            info!("Currently on {}, navigating to gallery page", url);
            self.navigate_to_gallery().await?;
        }
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, 0.0 ; "empty gallery")]
    #[test_case(3, 4, 75.0 ; "partial")]
    #[test_case(12, 12, 100.0 ; "complete")]
    fn test_load_percentage(loaded: usize, total: usize, expected: f64) {
        let report = ImageLoadReport {
            loaded,
            total,
            failed: Vec::new(),
        };
        assert!((report.load_percentage() - expected).abs() < f64::EPSILON);
    }
}
