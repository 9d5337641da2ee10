//! Home page object

use std::path::PathBuf;
use std::sync::Arc;

use pinecrest_common::{SiteConfig, SitePage};
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::expect::{expect, expect_page};
use crate::locator::{Filter, Locator, TextMatch};
use crate::playwright::{LoadState, Page, PerformanceMetrics};

const HOME_TITLE: &str = "Pinecrest Home Goods";

#[derive(Clone)]
pub struct HomePage {
    page: Page,
    config: Arc<SiteConfig>,

    // Header
    pub logo: Locator,
    pub support_banner: Locator,
    pub get_support_button: Locator,
    pub email_support_button: Locator,
    pub my_account_link: Locator,
    pub cart_link: Locator,
    pub customer_service_icon: Locator,

    // Main navigation
    pub home_nav_link: Locator,
    pub about_nav_link: Locator,
    pub products_nav_link: Locator,
    pub installations_nav_link: Locator,
    pub gallery_nav_link: Locator,
    pub contact_nav_link: Locator,

    // Hero
    pub hero_section: Locator,
    pub hero_heading: Locator,
    pub main_shop_now_button: Locator,
    pub secondary_shop_now_button: Locator,

    // Welcome and trust indicators
    pub welcome_section: Locator,
    pub buy_risk_free_section: Locator,
    pub free_shipping_section: Locator,
    pub satisfaction_section: Locator,

    // Product information
    pub zebra_shades_heading: Locator,
    pub premium_polyester_section: Locator,
    pub dual_layer_section: Locator,
    pub custom_size_section: Locator,
    pub product_description_text: Locator,

    // Customer photos
    pub customer_photos_heading: Locator,
    pub customer_photos_grid: Locator,
    pub installation_photo_text: Locator,

    // Why choose Pinecrest
    pub why_choose_section: Locator,
    pub quality_manufactured_section: Locator,
    pub best_prices_section: Locator,
    pub satisfaction_guarantee_section: Locator,
    pub custom_areas_section: Locator,

    // Sizes
    pub width_info: Locator,
    pub height_info: Locator,

    // Testimonials
    pub testimonials_section: Locator,
    pub testimonial_cards: Locator,
    pub testimonial_navigation: Locator,

    // Footer
    pub footer_logo: Locator,
    pub facebook_link: Locator,
    pub instagram_link: Locator,

    pub body_content: Locator,
}

impl HomePage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        let shop_now = p.locator(r#"a[href*="/shop"]"#).filter_text("SHOP NOW");
        Self {
            logo: p
                .locator(r#"header img[src*="pinecrest-logo"], #page-header img[src*="pinecrest-logo"]"#)
                .first(),
            support_banner: p
                .locator("text=LUXURY HOME GOODS AT GREAT PRICES")
                .or(&p.locator("text=FREE SHIPPING"))
                .first(),
            get_support_button: p.locator("text=GET SUPPORT"),
            email_support_button: p.locator("text=EMAIL SUPPORT"),
            my_account_link: p.locator("text=MY ACCOUNT"),
            cart_link: p.locator(r#"a[href*="/cart"]"#).or(&p.locator("text=Cart")).first(),
            customer_service_icon: p.locator(r#"img[src*="customer-service-icon"]"#),

            home_nav_link: p
                .locator(r#"nav a[href*="pinecresthomegoods.com/"], nav a[href="/"]"#)
                .first(),
            about_nav_link: p.locator(r#"nav a[href*="/about"]"#).first(),
            products_nav_link: p.locator(r#"nav a[href*="/shop"]:not([class*="btn"])"#).first(),
            installations_nav_link: p.locator(r#"nav a[href*="/installations"]"#).first(),
            gallery_nav_link: p.locator(r#"nav a[href*="/gallery"]"#).first(),
            contact_nav_link: p.locator(r#"nav a[href*="/contact"]"#).first(),

            hero_section: p.locator("text=Adding Life To Your Home"),
            hero_heading: p.locator("h1, h2").filter(Filter::has_text(TextMatch::regex(
                "Adding Life To Your Home|Luxury Zebra Shades",
            ))),
            main_shop_now_button: shop_now.first(),
            secondary_shop_now_button: shop_now.nth(1),

            welcome_section: p
                .locator("p:has-text('Welcome To Pinecrest Home Goods')")
                .first(),
            buy_risk_free_section: p.locator("text=Buy Risk-Free").first(),
            free_shipping_section: p.locator(r#"h5:has-text("Free Shipping")"#).first(),
            satisfaction_section: p.locator("text=100% Satisfaction").first(),

            // The first match is the hero heading
            zebra_shades_heading: p.locator("h2, h3").filter_text("Zebra Shades").nth(1),
            premium_polyester_section: p.locator("text=100% Premium Polyester"),
            dual_layer_section: p.locator("text=Dual-Layer Design"),
            custom_size_section: p.locator("text=Custom Size Availability"),
            product_description_text: p.locator("text=Light, airy and always inviting"),

            customer_photos_heading: p.locator("text=Customer Photos"),
            customer_photos_grid: p.locator(r#"img[src*="photo-"]"#),
            installation_photo_text: p.locator("text=Send Us Your Installation Photo"),

            why_choose_section: p.locator("text=See Why Customers Love Pinecrest"),
            quality_manufactured_section: p.locator("text=Quality Manufactured Shades"),
            best_prices_section: p.locator("text=Always Best Prices"),
            satisfaction_guarantee_section: p.locator("text=60-Day Satisfaction"),
            custom_areas_section: p.locator("text=Easily Fit Custom Areas"),

            width_info: p
                .locator(r#":text("20-96")"#)
                .or(&p.locator(r#":text("Available")"#))
                .first(),
            height_info: p.locator("text=Max Height 78 Inches"),

            testimonials_section: p
                .locator("text=See Why Customers Choose Pinecrest for Window Coverings"),
            testimonial_cards: p.locator(r#"[class*="testimonial"], .us_testimonial"#),
            testimonial_navigation: p.locator("keyboard_arrow_left, keyboard_arrow_right"),

            footer_logo: p.locator(r#"footer img[src*="pinecrest-logo"]"#),
            facebook_link: p.locator(r#"a[href*="facebook"]"#),
            instagram_link: p.locator(r#"a[href*="instagram"]"#),

            body_content: p.locator("body"),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn navigate_to_home(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::Home);
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
        self.verify_page_title().await
    }

    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page).to_have_title(HOME_TITLE).await
    }

    pub async fn verify_header_elements(&self) -> E2eResult<()> {
        expect(&self.logo).to_be_visible().await?;
        expect(&self.support_banner).to_be_visible().await?;
        expect(&self.get_support_button).to_be_visible().await?;
        expect(&self.my_account_link).to_be_visible().await?;
        expect(&self.cart_link).to_be_visible().await
    }

    fn nav_links(&self) -> [(&'static str, &Locator); 6] {
        [
            ("Home", &self.home_nav_link),
            ("About", &self.about_nav_link),
            ("Products", &self.products_nav_link),
            ("Installations", &self.installations_nav_link),
            ("Gallery", &self.gallery_nav_link),
            ("Contact", &self.contact_nav_link),
        ]
    }

    /// Every main navigation link is visible and enabled
    pub async fn verify_main_navigation(&self) -> E2eResult<()> {
        for (_, link) in self.nav_links() {
            expect(link)
                .timeout(self.config.timeouts.medium)
                .to_be_visible()
                .await?;
            expect(link).to_be_enabled().await?;
        }
        Ok(())
    }

    pub async fn verify_hero_section(&self) -> E2eResult<()> {
        expect(&self.hero_section).to_be_visible().await?;
        expect(&self.hero_heading).to_be_visible().await?;
        expect(&self.main_shop_now_button).to_be_visible().await?;
        expect(&self.main_shop_now_button).to_be_enabled().await
    }

    pub async fn verify_welcome_section(&self) -> E2eResult<()> {
        expect(&self.welcome_section).to_be_visible().await?;
        expect(&self.buy_risk_free_section).to_be_visible().await?;
        expect(&self.free_shipping_section).to_be_visible().await?;
        expect(&self.satisfaction_section).to_be_visible().await
    }

    pub async fn verify_product_information(&self) -> E2eResult<()> {
        expect(&self.zebra_shades_heading).to_be_visible().await?;
        expect(&self.premium_polyester_section).to_be_visible().await?;
        expect(&self.dual_layer_section).to_be_visible().await?;
        expect(&self.custom_size_section).to_be_visible().await?;
        expect(&self.product_description_text).to_be_visible().await
    }

    pub async fn verify_customer_photos_section(&self) -> E2eResult<()> {
        expect(&self.customer_photos_heading).to_be_visible().await?;
        expect(&self.customer_photos_grid.first()).to_be_visible().await?;
        expect(&self.installation_photo_text).to_be_visible().await
    }

    pub async fn verify_why_choose_pinecrest_section(&self) -> E2eResult<()> {
        expect(&self.why_choose_section).to_be_visible().await?;
        expect(&self.quality_manufactured_section).to_be_visible().await?;
        expect(&self.best_prices_section).to_be_visible().await?;
        expect(&self.satisfaction_guarantee_section).to_be_visible().await?;
        expect(&self.custom_areas_section).to_be_visible().await
    }

    pub async fn verify_size_information(&self) -> E2eResult<()> {
        expect(&self.width_info).to_be_visible().await?;
        expect(&self.height_info).to_be_visible().await
    }

    pub async fn verify_testimonials_section(&self) -> E2eResult<()> {
        expect(&self.testimonials_section).to_be_visible().await?;
        let count = self.testimonial_cards.count().await?;
        if count == 0 {
            return Err(E2eError::assertion("expected at least one testimonial card"));
        }
        Ok(())
    }

    pub async fn verify_footer_elements(&self) -> E2eResult<()> {
        expect(&self.footer_logo).to_be_visible().await?;
        expect(&self.facebook_link).to_be_visible().await?;
        expect(&self.instagram_link).to_be_visible().await
    }

    pub async fn click_main_shop_now(&self) -> E2eResult<()> {
        self.main_shop_now_button.click().await?;
        self.wait_for_network_idle().await
    }

    pub async fn click_secondary_shop_now(&self) -> E2eResult<()> {
        self.secondary_shop_now_button.click().await?;
        self.wait_for_network_idle().await
    }

    /// Follow a main navigation link by page name
    pub async fn navigate_to_page(&self, name: &str) -> E2eResult<()> {
        let wanted = name.to_lowercase();
        let link = self
            .nav_links()
            .into_iter()
            .find(|(label, _)| label.to_lowercase() == wanted)
            .map(|(_, link)| link.clone())
            .ok_or_else(|| E2eError::assertion(format!("Navigation link for '{}' not found", name)))?;
        link.click().await?;
        self.wait_for_network_idle().await
    }

    pub async fn click_customer_photo(&self, index: usize) -> E2eResult<()> {
        self.customer_photos_grid.nth(index).click().await
    }

    pub async fn testimonial_text(&self, index: usize) -> E2eResult<Option<String>> {
        self.testimonial_cards.nth(index).text_content().await
    }

    /// Run every section check in page order
    pub async fn verify_home_page_loaded(&self) -> E2eResult<()> {
        self.verify_page_title().await?;
        self.verify_header_elements().await?;
        self.verify_main_navigation().await?;
        self.verify_hero_section().await?;
        self.verify_welcome_section().await?;
        self.verify_product_information().await?;
        self.verify_customer_photos_section().await?;
        self.verify_why_choose_pinecrest_section().await?;
        self.verify_size_information().await?;
        self.verify_testimonials_section().await?;
        self.verify_footer_elements().await
    }

    pub async fn take_screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        self.page.screenshot_named(name).await
    }

    pub async fn performance_metrics(&self) -> E2eResult<PerformanceMetrics> {
        self.page.performance_metrics().await
    }

    async fn wait_for_network_idle(&self) -> E2eResult<()> {
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await
    }
}
