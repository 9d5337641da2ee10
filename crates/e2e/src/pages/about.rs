//! About Us page object

use std::path::PathBuf;
use std::sync::Arc;

use pinecrest_common::{SiteConfig, SitePage};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, expect, expect_page};
use crate::locator::{Locator, TextMatch};
use crate::playwright::{LoadState, Page, PerformanceMetrics, UrlPattern};

#[derive(Clone)]
pub struct AboutPage {
    page: Page,
    config: Arc<SiteConfig>,

    pub about_nav_link: Locator,
    pub page_heading: Locator,
    pub main_title: Locator,

    // Company introduction
    pub company_intro_heading: Locator,
    pub welcome_text: Locator,
    pub family_business_text: Locator,
    pub zebra_shades_mention: Locator,
    pub premium_polyester_text: Locator,
    pub custom_sizing_text: Locator,
    pub turkey_italy_text: Locator,

    pub company_showcase_image: Locator,
    pub cream_zebra_shades_image: Locator,

    // Why choose Pinecrest
    pub why_choose_heading: Locator,
    pub quality_manufactured_benefit: Locator,
    pub best_prices_benefit: Locator,
    pub satisfaction_benefit: Locator,
    pub custom_areas_benefit: Locator,
    pub quality_icon: Locator,
    pub prices_icon: Locator,
    pub satisfaction_icon: Locator,
    pub custom_areas_icon: Locator,

    pub private_label_heading: Locator,
    pub private_label_description: Locator,

    // Testimonials
    pub testimonials_section: Locator,
    pub testimonials_heading: Locator,
    pub testimonial_cards: Locator,
    pub testimonial_navigation: Locator,
    pub named_testimonials: Vec<(&'static str, Locator)>,

    // Footer
    pub footer_logo: Locator,
    pub facebook_link: Locator,
    pub instagram_link: Locator,
    pub email_contact: Locator,

    pub body_content: Locator,
}

/// Customers quoted in the testimonial carousel
pub const TESTIMONIAL_CUSTOMERS: [&str; 4] = ["Anney Dom", "Omar Felix", "John Dolson", "Noman Ali"];

impl AboutPage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        let benefit = |pattern: &str| p.locator("h3, h4, h5").filter_text(TextMatch::regex_i(pattern)).first();
        let email_contact = p
            .locator("footer")
            .filter_text(config.test_data.contact_email.as_str())
            .first();

        Self {
            about_nav_link: p.locator(r#"a[href*="/about-us"]"#).first(),
            page_heading: p.locator("h1").filter_text(TextMatch::regex_i("About Us")).first(),
            main_title: p.locator(r#"h1:has-text("About Us")"#).first(),

            company_intro_heading: p.locator("h2").filter_text(TextMatch::regex_i("Who is Pinecrest")).first(),
            welcome_text: text_block(p, "Welcome to Pinecrest HomeGoods"),
            family_business_text: text_block(p, "small family-owned business"),
            zebra_shades_mention: text_block(p, "Corded Window Zebra Shades"),
            premium_polyester_text: text_block(p, "premium polyester with aluminum valences"),
            custom_sizing_text: text_block(p, "up to 96 inches wide to 78 inches in length"),
            turkey_italy_text: text_block(p, "Turkey and Italy"),

            company_showcase_image: p.locator(r#"img[src*="WhiteMain"]"#),
            cream_zebra_shades_image: p.locator(r#"img[src*="Cream-Zebra-Shades"]"#),

            why_choose_heading: p
                .locator("h2")
                .filter_text(TextMatch::regex_i("See Why Customers.*Love Pinecrest|Love Pinecrest"))
                .first(),
            quality_manufactured_benefit: benefit("Quality Manufactured Shades"),
            best_prices_benefit: benefit("Always Best Prices"),
            satisfaction_benefit: benefit("60-Day Satisfaction"),
            custom_areas_benefit: benefit("Easily Fit Custom Areas"),
            quality_icon: p.locator(r#"img[src*="why-icon-1-2"]"#),
            prices_icon: p.locator(r#"img[src*="why-icon-1-1"]"#),
            satisfaction_icon: p.locator(r#"img[src*="why-icon-1-3"]"#),
            custom_areas_icon: p.locator(r#"img[src*="why-icon-"]"#),

            private_label_heading: p
                .locator("h2")
                .filter_text(TextMatch::regex_i("Pinecrest Home Goods a private-label"))
                .first(),
            private_label_description: text_block(p, "Find an eclectic selection of home fashions"),

            testimonials_section: p.locator("text=See Why Customers Choose Pinecrest for Window Coverings"),
            testimonials_heading: p
                .locator("h2")
                .filter_text(TextMatch::regex_i(
                    "See Why Customers (Love Pinecrest|Choose Pinecrest for Window Coverings)",
                ))
                .first(),
            testimonial_cards: p.locator(r#"[class*="testimonial"], .us_testimonial, .testimonial"#),
            testimonial_navigation: p.locator(
                r#".owl-carousel .owl-nav button, .testimonial-navigation button, [class*="carousel"] [class*="arrow"]"#,
            ),
            named_testimonials: TESTIMONIAL_CUSTOMERS
                .iter()
                .map(|name| (*name, text_block(p, name)))
                .collect(),

            footer_logo: p.locator(r#"footer img[src*="pinecrest-logo"]"#).first(),
            facebook_link: p.locator(r#"footer a[href*="facebook"]"#).first(),
            instagram_link: p.locator(r#"footer a[href*="instagram"]"#).first(),
            email_contact,

            body_content: p.locator("body"),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    fn title(&self) -> &str {
        self.config.titles.about.as_str()
    }

    pub async fn navigate_to_about(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::About);
        info!("Navigating to {}", url);
        self.page
            .goto(&url, LoadState::Load, self.config.timeouts.network_idle)
            .await?;
        self.wait_for_page_load().await
    }

    pub async fn wait_for_page_load(&self) -> E2eResult<()> {
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await?;
        expect_page(&self.page)
            .to_have_title(TextMatch::regex("About Us.*Pinecrest Home Goods"))
            .await
    }

    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page).to_have_title(self.title()).await
    }

    pub async fn verify_page_header(&self) -> E2eResult<()> {
        expect(&self.page_heading).to_be_visible().await?;
        expect(&self.main_title).to_be_visible().await
    }

    pub async fn verify_company_introduction(&self) -> E2eResult<()> {
        expect(&self.company_intro_heading).to_be_visible().await?;
        expect(&self.welcome_text).to_be_visible().await?;
        expect(&self.family_business_text).to_be_visible().await?;
        expect(&self.zebra_shades_mention).to_be_visible().await?;
        expect(&self.premium_polyester_text).to_be_visible().await
    }

    pub async fn verify_product_details(&self) -> E2eResult<()> {
        expect(&self.custom_sizing_text).to_be_visible().await?;
        expect(&self.turkey_italy_text).to_be_visible().await
    }

    pub async fn verify_company_images(&self) -> E2eResult<()> {
        expect(&self.company_showcase_image).to_be_visible().await?;
        expect(&self.cream_zebra_shades_image).to_be_visible().await
    }

    pub fn benefits(&self) -> [&Locator; 4] {
        [
            &self.quality_manufactured_benefit,
            &self.best_prices_benefit,
            &self.satisfaction_benefit,
            &self.custom_areas_benefit,
        ]
    }

    /// Benefit heading and its icon, if the benefit has a dedicated one
    pub fn benefit(&self, name: &str) -> E2eResult<(&Locator, Option<&Locator>)> {
        match name.to_lowercase().as_str() {
            "quality manufactured shades" => Ok((&self.quality_manufactured_benefit, Some(&self.quality_icon))),
            "always best prices" => Ok((&self.best_prices_benefit, Some(&self.prices_icon))),
            "60-day satisfaction" => Ok((&self.satisfaction_benefit, Some(&self.satisfaction_icon))),
            "easily fit custom areas" => Ok((&self.custom_areas_benefit, None)),
            _ => Err(E2eError::assertion(format!("Unknown benefit: {}", name))),
        }
    }

    pub async fn verify_why_choose_pinecrest_section(&self) -> E2eResult<()> {
        expect(&self.why_choose_heading).to_be_visible().await?;
        for benefit in self.benefits() {
            expect(benefit).to_be_visible().await?;
        }
        Ok(())
    }

    pub async fn verify_benefit_icons(&self) -> E2eResult<()> {
        expect(&self.quality_icon).to_be_visible().await?;
        expect(&self.prices_icon).to_be_visible().await?;
        expect(&self.satisfaction_icon).to_be_visible().await
    }

    pub async fn verify_private_label_section(&self) -> E2eResult<()> {
        expect(&self.private_label_heading).to_be_visible().await?;
        expect(&self.private_label_description).to_be_visible().await
    }

    /// Testimonials heading (exact text, else the looser heading) and at least one card
    pub async fn verify_testimonials_section(&self) -> E2eResult<()> {
        if expect(&self.testimonials_section).to_be_visible().await.is_err() {
            expect(&self.testimonials_heading).to_be_visible().await?;
        }
        let count = self.testimonial_cards.count().await?;
        ensure(count > 0, "expected at least one testimonial card")
    }

    pub async fn verify_specific_testimonials(&self) -> E2eResult<()> {
        for (_, testimonial) in &self.named_testimonials {
            expect(testimonial).to_be_visible().await?;
        }
        Ok(())
    }

    pub async fn verify_footer_elements(&self) -> E2eResult<()> {
        expect(&self.footer_logo).to_be_visible().await?;
        expect(&self.facebook_link).to_be_visible().await?;
        expect(&self.instagram_link).to_be_visible().await?;
        expect(&self.email_contact).to_be_visible().await
    }

    /// Follow the About link, falling back to the About URL
    pub async fn click_about_navigation(&self) -> E2eResult<()> {
        let timeouts = self.config.timeouts;
        if let Err(e) = self.follow_about_link().await {
            warn!("About navigation link not usable ({}), navigating directly", e);
            self.page
                .goto(
                    &self.config.url_of(SitePage::About),
                    LoadState::DomContentLoaded,
                    timeouts.network_idle,
                )
                .await?;
        }
        self.page.wait(500).await
    }

    async fn follow_about_link(&self) -> E2eResult<()> {
        let timeouts = self.config.timeouts;
        expect(&self.about_nav_link)
            .timeout(timeouts.medium)
            .to_be_visible()
            .await?;
        expect(&self.about_nav_link).to_be_enabled().await?;
        self.about_nav_link.click().await?;
        self.page
            .wait_for_url(UrlPattern::regex(".*about.*"), timeouts.long)
            .await?;
        self.page
            .wait_for_load_state(LoadState::DomContentLoaded, timeouts.long)
            .await
    }

    pub async fn scroll_to_section(&self, name: &str) -> E2eResult<()> {
        let section = match name.to_lowercase().as_str() {
            "why choose pinecrest" => &self.why_choose_heading,
            "testimonials" => &self.testimonials_heading,
            "private label" => &self.private_label_heading,
            "company introduction" => &self.company_intro_heading,
            _ => return Err(E2eError::assertion(format!("Section '{}' not found", name))),
        };
        section.scroll_into_view().await?;
        expect(section).to_be_visible().await
    }

    pub async fn verify_url(&self, expected_path: &str) -> E2eResult<()> {
        let url = self.page.url().await?;
        ensure(
            url.contains(expected_path),
            format!("expected URL to contain '{}', got {}", expected_path, url),
        )
    }

    pub async fn verify_about_page_loaded(&self) -> E2eResult<()> {
        self.verify_page_title().await?;
        self.verify_page_header().await?;
        self.verify_company_introduction().await?;
        self.verify_product_details().await?;
        self.verify_company_images().await?;
        self.verify_why_choose_pinecrest_section().await?;
        self.verify_benefit_icons().await?;
        self.verify_private_label_section().await?;
        self.verify_testimonials_section().await?;
        self.verify_footer_elements().await
    }

    /// Some element showing `text` is visible
    pub async fn verify_text_content(&self, text: &str) -> E2eResult<()> {
        expect(&self.page.locator(format!("text={}", text)).first())
            .to_be_visible()
            .await
    }

    pub async fn take_screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        self.page.screenshot_named(name).await
    }

    pub async fn performance_metrics(&self) -> E2eResult<PerformanceMetrics> {
        self.page.performance_metrics().await
    }

    pub async fn testimonial_text(&self, index: usize) -> E2eResult<Option<String>> {
        self.testimonial_cards.nth(index).text_content().await
    }
}

fn text_block(page: &Page, text: &str) -> Locator {
    page.locator("*").filter_text(text).first()
}
