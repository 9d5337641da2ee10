//! Installation guide page object

use std::path::PathBuf;
use std::sync::Arc;

use pinecrest_common::{SiteConfig, SitePage};
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, expect, expect_page};
use crate::locator::{Locator, TextMatch};
use crate::playwright::{LoadState, Page, Viewport};

/// Tools listed under "What You'll Need"
pub const REQUIRED_TOOLS: [&str; 5] = ["Electric Drill", "Screwdriver", "Pencil", "Measuring Tape", "Ladder"];

#[derive(Clone)]
pub struct InstallationsPage {
    page: Page,
    config: Arc<SiteConfig>,

    pub installations_nav_link: Locator,
    pub page_title: Locator,
    pub page_header: Locator,
    pub content_container: Locator,
    pub hero_image: Locator,

    // Thank you
    pub thank_you_heading: Locator,
    pub intro_text: Locator,
    pub videos_callout: Locator,
    pub see_videos_button: Locator,

    // Tools
    pub tools_heading: Locator,
    pub tools: Vec<(&'static str, Locator)>,
    pub tool_icons: Locator,
    pub individual_tool_icons: Vec<Locator>,

    pub outside_mount_heading: Locator,
    pub inside_mount_heading: Locator,

    pub install_guide_download: Locator,
    pub pdf_link: Locator,

    pub installation_videos: Locator,
    pub video_container: Locator,
    pub back_to_top_button: Locator,
    pub loading_indicator: Locator,
    pub error_message: Locator,
}

impl InstallationsPage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        let thank_you_heading = p.locator(r#"h2:has-text("Thank You For Your Purchase!")"#);
        Self {
            installations_nav_link: p.locator(r#"a[href*="/installations"]"#).first(),
            page_title: p.locator(r#"h1:has-text("Installations")"#).first(),
            page_header: p.locator("h1").first(),
            content_container: p.locator("main, .main-content, .content, body").first(),
            hero_image: p.locator(r#"img[src*="Photo-colors"]"#).first(),

            thank_you_heading,
            intro_text: p.locator("text=Thank you for purchasing our blinds"),
            videos_callout: p.locator("text=Below are videos to guide you"),
            see_videos_button: p.locator("text=SEE INSTALLATIONS VIDEOS BELOW"),

            tools_heading: p.locator(r#"h2:has-text("What You'll Need")"#),
            tools: REQUIRED_TOOLS
                .iter()
                .map(|tool| (*tool, p.locator(format!(r#"h5:has-text("{}")"#, tool))))
                .collect(),
            tool_icons: p.locator(r#"img[src*="what-icon"]"#),
            individual_tool_icons: [
                "what-icon-.png",
                "what-icon-1-1.png",
                "what-icon-1-2.png",
                "what-icon-1-3",
                "what-icon-1-4",
            ]
            .iter()
            .map(|src| p.locator(format!(r#"img[src*="{}"]"#, src)))
            .collect(),

            outside_mount_heading: p.locator(r#"h2:has-text("Installing Outside Mount Shades")"#),
            inside_mount_heading: p.locator(r#"h2:has-text("Installing Inside Mount Shades")"#),

            install_guide_download: p.locator(r#"a:has-text("Install Guide Download")"#),
            pdf_link: p.locator(r#"a[href*="Pinecrest-Installation"]"#),

            installation_videos: p.locator(r#"video, iframe[src*="youtube"], iframe[src*="vimeo"]"#),
            video_container: p.locator(".video-container, .video-wrapper"),
            back_to_top_button: p.locator(r#"text=keyboard_arrow_up, [aria-label*="back to top"]"#),
            loading_indicator: p.locator(".loading, .spinner"),
            error_message: p.locator(".error, .error-message"),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn navigate_to_installations(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::Installations);
        info!("Navigating to {}", url);
        self.page
            .goto(&url, LoadState::Load, self.config.timeouts.network_idle)
            .await?;
        self.wait_for_page_load().await
    }

    pub async fn navigate_via_link(&self) -> E2eResult<()> {
        self.installations_nav_link.click().await?;
        self.wait_for_page_load().await
    }

    pub async fn verify_installations_page_loaded(&self) -> E2eResult<()> {
        expect(&self.page_title).to_be_visible().await?;
        expect(&self.content_container).to_be_visible().await?;
        expect(&self.thank_you_heading).to_be_visible().await
    }

    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page)
            .to_have_title(TextMatch::regex_i("installations"))
            .await
    }

    /// Network idle plus a second for the entrance animations
    pub async fn wait_for_page_load(&self) -> E2eResult<()> {
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await?;
        self.page.wait(1_000).await
    }

    pub async fn verify_tools_section(&self) -> E2eResult<()> {
        expect(&self.tools_heading).to_be_visible().await?;
        for (_, tool) in &self.tools {
            expect(tool).to_be_visible().await?;
        }
        Ok(())
    }

    pub async fn verify_tool_icons(&self) -> E2eResult<()> {
        let count = self.tool_icons.count().await?;
        ensure(count >= 5, format!("expected at least 5 tool icons, found {}", count))?;
        for icon in &self.individual_tool_icons {
            expect(icon).to_be_visible().await?;
        }
        Ok(())
    }

    pub async fn verify_installation_sections(&self) -> E2eResult<()> {
        expect(&self.outside_mount_heading).to_be_visible().await?;
        expect(&self.inside_mount_heading).to_be_visible().await
    }

    /// The guide link is visible and points at a PDF
    pub async fn verify_pdf_download(&self) -> E2eResult<()> {
        expect(&self.install_guide_download).to_be_visible().await?;
        let href = self
            .install_guide_download
            .get_attribute("href")
            .await?
            .unwrap_or_default();
        ensure(href.contains(".pdf"), format!("install guide href '{}' is not a PDF", href))
    }

    /// Click the guide link and return the downloaded file name
    pub async fn click_pdf_download(&self) -> E2eResult<String> {
        self.install_guide_download
            .click_for_download(self.config.timeouts.network_idle)
            .await
    }

    pub async fn verify_thank_you_section(&self) -> E2eResult<()> {
        expect(&self.thank_you_heading).to_be_visible().await?;
        expect(&self.intro_text).to_be_visible().await?;
        expect(&self.videos_callout).to_be_visible().await?;
        expect(&self.see_videos_button).to_be_visible().await
    }

    pub async fn click_see_videos_button(&self) -> E2eResult<()> {
        self.see_videos_button.click().await?;
        self.page.wait(1_000).await
    }

    pub async fn videos_present(&self) -> E2eResult<bool> {
        Ok(self.installation_videos.count().await? > 0)
    }

    /// Resize and check the content still fits the viewport
    pub async fn verify_responsive_layout(&self, viewport: Viewport) -> E2eResult<()> {
        self.page.set_viewport(viewport.width, viewport.height).await?;
        self.page.wait(500).await?;
        expect(&self.content_container).to_be_visible().await?;

        let bbox = self
            .content_container
            .bounding_box()
            .await?
            .ok_or_else(|| E2eError::assertion("content container has no bounding box"))?;
        ensure(bbox.width > 0.0, "content container has zero width")?;
        ensure(
            bbox.width <= f64::from(viewport.width),
            format!(
                "content container is {}px wide, wider than the {}px viewport",
                bbox.width, viewport.width
            ),
        )
    }

    pub async fn take_screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        self.page.screenshot_named(name).await
    }

    pub async fn scroll_to_section(&self, section: &str) -> E2eResult<()> {
        let target = match section.to_lowercase().as_str() {
            "tools" => &self.tools_heading,
            "outside" => &self.outside_mount_heading,
            "inside" => &self.inside_mount_heading,
            "thankyou" => &self.thank_you_heading,
            _ => return Err(E2eError::assertion(format!("Section '{}' not found", section))),
        };
        target.scroll_into_view().await?;
        self.page.wait(500).await
    }

    /// Section headings are visible and the tool icons carry alt text
    pub async fn verify_accessibility(&self) -> E2eResult<()> {
        expect(&self.thank_you_heading).to_be_visible().await?;
        expect(&self.tools_heading).to_be_visible().await?;
        expect(&self.outside_mount_heading).to_be_visible().await?;
        expect(&self.inside_mount_heading).to_be_visible().await?;

        let with_alt = self
            .tool_icons
            .evaluate_all(r#"(imgs) => imgs.filter((img) => img.alt && img.alt.trim() !== "").length"#)
            .await?
            .as_u64()
            .unwrap_or(0);
        ensure(with_alt > 0, "no tool icon has alt text")
    }

    /// Navigate to the guide unless already there; refuse to leave a foreign site
    pub async fn ensure_on_installations_page(&self) -> E2eResult<()> {
        let url = self.page.url().await?;
        if !url.contains("installations") && !self.config.is_on_site(&url) {
            return Err(E2eError::assertion(format!(
                "Expected to be on the Pinecrest website, but current URL is: {}",
                url
            )));
        }
        if !url.contains("installations") {
            self.navigate_to_installations().await?;
        }
        self.wait_for_page_load().await
    }
}
