//! Shop page object

use std::sync::Arc;

use pinecrest_common::{SiteConfig, SitePage};
use tracing::{debug, info};

use crate::error::E2eResult;
use crate::expect::{ensure, expect, expect_page, UrlMatch};
use crate::locator::{Locator, TextMatch};
use crate::playwright::{LoadState, Page};

const SHOP_TITLE_PATTERN: &str = "Shop|Products.*Pinecrest";

/// Products the shop always features
pub const FEATURED_PRODUCTS: [&str; 3] = ["Brown Zebra Shades", "Cream Zebra Shades", "Gray Zebra Shades"];

#[derive(Clone)]
pub struct ProductsPage {
    page: Page,
    config: Arc<SiteConfig>,

    pub products_nav_link: Locator,
    pub page_heading: Locator,
    pub page_title: Locator,
    pub breadcrumbs: Locator,

    pub product_grid: Locator,
    pub product_items: Locator,
    pub product_cards: Locator,

    pub brown_zebra_shades: Locator,
    pub cream_zebra_shades: Locator,
    pub gray_zebra_shades: Locator,
    pub installation_hardware: Locator,

    pub product_titles: Locator,
    pub product_prices: Locator,
    pub product_images: Locator,
    pub select_options_buttons: Locator,
    pub add_to_cart_buttons: Locator,

    pub price_filter: Locator,
    pub filter_section: Locator,
    pub window_shades_category: Locator,
}

impl ProductsPage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        Self {
            products_nav_link: p
                .locator(r#"nav a:has-text("Products"), nav a[href*="shop"]"#)
                .first(),
            page_heading: p.locator(r#"h1:has-text("Shop")"#).first(),
            page_title: p.locator("h1").first(),
            breadcrumbs: p
                .locator(r#".breadcrumb, .breadcrumbs, [class*="breadcrumb"]"#)
                .first(),

            product_grid: p.locator("#us_grid_1, .w-grid").first(),
            product_items: p.locator(".product, .w-grid-item.product"),
            product_cards: p.locator(".product"),

            brown_zebra_shades: product_card(p, "Brown Zebra Shades"),
            cream_zebra_shades: product_card(p, "Cream Zebra Shades"),
            gray_zebra_shades: product_card(p, "Gray Zebra Shades"),
            installation_hardware: product_card(p, "Installation Hardware Kit"),

            product_titles: p.locator(".product h2, .product .product-name"),
            product_prices: p.locator(".product .price, .product .amount"),
            product_images: p.locator(".product img, .product .product-image"),
            select_options_buttons: p.locator(r#".product a:has-text("Select options")"#),
            add_to_cart_buttons: p.locator(".product .add_to_cart_button"),

            price_filter: p.locator("#woocommerce_price_filter-1").first(),
            filter_section: p.locator(r#".widget_price_filter, [class*="filter"]"#).first(),
            window_shades_category: p.locator(r#"[class*="product_cat-window-shades"]"#),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Card of the product named `name`
    pub fn product(&self, name: &str) -> Locator {
        product_card(&self.page, name)
    }

    pub async fn navigate_to_products(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::Products);
        info!("Navigating to {}", url);
        self.page
            .goto(&url, LoadState::Load, self.config.timeouts.network_idle)
            .await?;
        self.wait_for_page_load().await
    }

    pub async fn click_products_navigation(&self) -> E2eResult<()> {
        self.products_nav_link.click().await?;
        self.wait_for_page_load().await
    }

    pub async fn wait_for_page_load(&self) -> E2eResult<()> {
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await?;
        expect_page(&self.page)
            .to_have_title(TextMatch::regex(SHOP_TITLE_PATTERN))
            .await
    }

    pub async fn verify_products_page_loaded(&self) -> E2eResult<()> {
        expect(&self.page_heading).to_be_visible().await?;
        expect(&self.product_grid).to_be_visible().await
    }

    /// Title looks like the shop and the URL is under /shop
    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page)
            .to_have_title(TextMatch::regex(SHOP_TITLE_PATTERN))
            .await?;
        expect_page(&self.page).to_have_url(UrlMatch::pattern("shop")).await
    }

    pub async fn verify_breadcrumbs(&self) -> E2eResult<()> {
        expect(&self.breadcrumbs).to_be_visible().await?;
        expect(&self.breadcrumbs)
            .to_contain_text(TextMatch::regex("Home.*Shop"))
            .await
    }

    pub async fn verify_product_grid(&self) -> E2eResult<()> {
        expect(&self.product_grid).to_be_visible().await?;
        verify_first_of(&self.product_cards, "product cards").await
    }

    pub async fn verify_featured_products(&self) -> E2eResult<()> {
        expect(&self.brown_zebra_shades).to_be_visible().await?;
        expect(&self.cream_zebra_shades).to_be_visible().await?;
        expect(&self.gray_zebra_shades).to_be_visible().await
    }

    pub async fn click_product(&self, name: &str) -> E2eResult<()> {
        let product = self.product(name);
        expect(&product).to_be_visible().await?;
        product.click().await
    }

    pub async fn verify_product_pricing(&self) -> E2eResult<()> {
        verify_first_of(&self.product_prices, "product prices").await
    }

    pub async fn verify_product_buttons(&self) -> E2eResult<()> {
        verify_first_of(&self.select_options_buttons, "select options buttons").await?;
        expect(&self.select_options_buttons.first()).to_be_enabled().await
    }

    /// Filters are optional; when shown they must stay visible
    pub async fn verify_filters(&self) -> E2eResult<()> {
        if self.filter_section.is_visible().await.unwrap_or(false) {
            expect(&self.filter_section).to_be_visible().await?;
        } else {
            debug!("No product filters on the shop page");
        }
        Ok(())
    }

    pub async fn product_count(&self) -> E2eResult<usize> {
        self.product_cards.count().await
    }

    pub async fn verify_all_products_elements(&self) -> E2eResult<()> {
        self.verify_products_page_loaded().await?;
        self.verify_breadcrumbs().await?;
        self.verify_product_grid().await?;
        self.verify_featured_products().await?;
        self.verify_product_pricing().await?;
        self.verify_product_buttons().await
    }
}

fn product_card(page: &Page, name: &str) -> Locator {
    page.locator(".product").filter_text(name).first()
}

/// At least one match exists and the first one is visible
pub(crate) async fn verify_first_of(locator: &Locator, what: &str) -> E2eResult<()> {
    let count = locator.count().await?;
    ensure(count > 0, format!("expected at least one of {}", what))?;
    expect(&locator.first()).to_be_visible().await
}
