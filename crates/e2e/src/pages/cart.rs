//! Cart and checkout page object
//!
//! Covers the WooCommerce cart, the coupon form and the checkout billing
//! form. Adding products goes through the shop UI first and falls back to
//! the `/?add-to-cart=<id>` endpoint, which keeps the session cookie.

use std::sync::Arc;

use pinecrest_common::money::parse_amount;
use pinecrest_common::{SiteConfig, SitePage};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::expect::{expect, expect_page, UrlMatch};
use crate::feature::DataTable;
use crate::locator::{css_quote, Locator, SelectBy, TextMatch};
use crate::playwright::{LoadState, Page, UrlPattern, WaitState};

const CART_TITLE_PATTERN: &str = "Cart.*Pinecrest";

/// Matches the notice WooCommerce shows for a rejected coupon
pub const COUPON_ERROR_PATTERN: &str = "does not exist|invalid|expired|not found";

const SIMPLE_ADD_TO_CART: &str = r#"a.add_to_cart_button[href*="add-to-cart"]"#;

const PRODUCT_SELECTORS: [&str; 4] = [".products .product", ".woocommerce-product", ".type-product", ".product"];

const ITEM_SELECTORS: [&str; 5] = [
    ".cart_item",
    "tr.woocommerce-cart-form__cart-item",
    ".woocommerce-cart-form__cart-item",
    "tbody tr.cart_item",
    r#"tr[class*="cart_item"]"#,
];

const REMOVE_SELECTORS: [&str; 6] = [
    ".cart_item .remove",
    "a.remove",
    ".woocommerce-cart-form__cart-item .remove",
    "tr.cart_item .remove",
    ".product-remove .remove",
    "a[data-product_id]",
];

const TOTAL_SELECTORS: [&str; 6] = [
    ".order-total .amount",
    ".cart_totals .amount",
    ".total .amount",
    ".cart-total",
    ".woocommerce-Price-amount",
    r#":text("$")"#,
];

const ADDED_NOTICES: [&str; 5] = [
    r#"text="added to your cart""#,
    r#"text="added to cart""#,
    ".woocommerce-message",
    ".added-to-cart",
    ".success",
];

/// Checkout billing fields; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl BillingData {
    /// Complete set of valid billing details
    pub fn sample() -> Self {
        Self {
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some("john.doe@example.com".to_string()),
            phone: Some("(555) 123-4567".to_string()),
            address: Some("123 Main Street".to_string()),
            city: Some("Anytown".to_string()),
            state: Some("California".to_string()),
            zip_code: Some("90210".to_string()),
        }
    }

    /// Read a two column `| Field | Value |` table
    pub fn from_table(table: &DataTable) -> Self {
        let mut data = Self::default();
        for row in table.hashes() {
            let (Some(field), Some(value)) = (row.get("Field"), row.get("Value")) else {
                continue;
            };
            data.set(field, value.clone());
        }
        data
    }

    fn set(&mut self, field: &str, value: String) {
        let key: String = field.chars().filter(|c| !c.is_whitespace()).collect();
        let slot = match key.to_lowercase().as_str() {
            "firstname" => &mut self.first_name,
            "lastname" => &mut self.last_name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "address" => &mut self.address,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "zipcode" => &mut self.zip_code,
            other => {
                debug!("Ignoring unknown billing field '{}'", other);
                return;
            }
        };
        *slot = Some(value);
    }
}

#[derive(Clone)]
pub struct CartPage {
    page: Page,
    config: Arc<SiteConfig>,

    pub cart_nav_link: Locator,
    pub page_heading: Locator,
    pub cart_container: Locator,

    // Empty cart
    pub empty_cart_message: Locator,
    pub return_to_shop_button: Locator,

    // Items
    pub cart_table: Locator,
    pub cart_items: Locator,
    pub cart_item_count: Locator,
    pub product_names: Locator,
    pub product_prices: Locator,
    pub product_quantities: Locator,
    pub product_subtotals: Locator,
    pub remove_buttons: Locator,
    pub quantity_inputs: Locator,
    pub update_cart_button: Locator,

    // Totals
    pub cart_totals_section: Locator,
    pub subtotal_amount: Locator,
    pub total_amount: Locator,

    // Coupons
    pub coupon_section: Locator,
    pub coupon_input: Locator,
    pub apply_coupon_button: Locator,
    pub coupon_error: Locator,
    pub coupon_success: Locator,
    pub remove_coupon_link: Locator,
    pub applied_coupons: Locator,

    pub continue_shopping_button: Locator,
    pub proceed_to_checkout_button: Locator,

    // Checkout
    pub billing_form: Locator,
    pub order_review_section: Locator,
    pub order_total_section: Locator,
    pub order_items: Locator,
    pub billing_first_name: Locator,
    pub billing_last_name: Locator,
    pub billing_email: Locator,
    pub billing_phone: Locator,
    pub billing_address_1: Locator,
    pub billing_city: Locator,
    pub billing_state: Locator,
    pub billing_postcode: Locator,
    pub payment_methods: Locator,
    pub payment_options: Locator,
    pub validation_errors: Locator,
    pub required_field_errors: Locator,
    pub place_order_button: Locator,

    // Stock
    pub stock_messages: Locator,
    pub out_of_stock_messages: Locator,
}

impl CartPage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        Self {
            cart_nav_link: p
                .locator(r#"a[href*="/cart"]"#)
                .or(&p.locator("text=Cart"))
                .first(),
            page_heading: p.locator(r#"h1:has-text("Cart"), .cart-title"#).first(),
            cart_container: p.locator(".woocommerce-cart, main, #primary, .cart").first(),

            empty_cart_message: p
                .locator(r#".cart-empty, :text("Your cart is currently empty")"#)
                .first(),
            return_to_shop_button: p
                .locator(r#"a:has-text("Return to shop"), a:has-text("Continue shopping")"#)
                .first(),

            cart_table: p.locator(".shop_table.cart, .woocommerce-cart-form__contents").first(),
            cart_items: p.locator(".cart_item, tr.woocommerce-cart-form__cart-item"),
            cart_item_count: p.locator(".cart-count, .cartcontents").first(),
            product_names: p.locator(".cart_item .product-name a, .cart_item td a").first(),
            product_prices: p
                .locator(".cart_item .amount, .cart_item .woocommerce-Price-amount")
                .first(),
            product_quantities: p.locator(r#".cart_item .qty, .cart_item input[name*="cart"]"#),
            product_subtotals: p.locator(".cart_item .product-subtotal .amount").first(),
            remove_buttons: p.locator(".cart_item .remove, a.remove"),
            quantity_inputs: p.locator(r#"input[name*="cart"][type="number"]"#),
            update_cart_button: p
                .locator(r#"input[name="update_cart"], button:has-text("Update cart")"#)
                .first(),

            cart_totals_section: p.locator(".cart_totals, .cart-collaterals, .cart-total").first(),
            subtotal_amount: p
                .locator(".cart-subtotal .amount, .order-total .amount, .subtotal .amount")
                .first(),
            total_amount: p
                .locator(".order-total .amount, .cart_totals .amount, .total .amount, .cart-total")
                .last(),

            coupon_section: p.locator(".coupon, .cart-discount").first(),
            coupon_input: p
                .locator(concat!(
                    r#"input[name="coupon_code"], input[id="coupon_code"], "#,
                    r#"input[placeholder*="coupon"], input[placeholder*="Coupon"]"#
                ))
                .first(),
            apply_coupon_button: p
                .locator(concat!(
                    r#"button[name="apply_coupon"], input[name="apply_coupon"], "#,
                    r#"button:has-text("Apply coupon"), input[value*="Apply"], "#,
                    r#".button:has-text("Apply"), input[type="submit"][value*="coupon"]"#
                ))
                .first(),
            coupon_error: p
                .locator(concat!(
                    ".woocommerce-error, .error, .woocommerce-notice--error, .notice-error, ",
                    r#".alert-error, [class*="error"], [class*="notice"]"#
                ))
                .filter_text(TextMatch::regex_i(COUPON_ERROR_PATTERN))
                .first(),
            coupon_success: p
                .locator(concat!(
                    ".woocommerce-message, .success, .woocommerce-notice--success, ",
                    r#".notice-success, .alert-success, [class*="success"]"#
                ))
                .first(),
            remove_coupon_link: p
                .locator(r#".woocommerce-remove-coupon, a:has-text("Remove")"#)
                .first(),
            applied_coupons: p.locator(".cart-discount, .coupon-applied"),

            continue_shopping_button: p
                .locator(r#"a:has-text("Continue shopping"), a:has-text("Return to shop")"#)
                .first(),
            proceed_to_checkout_button: p
                .locator(r#".checkout-button, a:has-text("Proceed to checkout")"#)
                .first(),

            billing_form: p.locator("#billing, .woocommerce-billing-fields").first(),
            order_review_section: p
                .locator("#order_review, .woocommerce-checkout-review-order")
                .first(),
            order_total_section: p
                .locator(".woocommerce-checkout-review-order-table, table.shop_table")
                .first(),
            order_items: p.locator(
                ".woocommerce-checkout-review-order-table .cart_item, table.shop_table .cart_item",
            ),
            billing_first_name: p.locator("#billing_first_name").first(),
            billing_last_name: p.locator("#billing_last_name").first(),
            billing_email: p.locator("#billing_email").first(),
            billing_phone: p.locator("#billing_phone").first(),
            billing_address_1: p.locator("#billing_address_1").first(),
            billing_city: p.locator("#billing_city").first(),
            billing_state: p.locator("#billing_state").first(),
            billing_postcode: p.locator("#billing_postcode").first(),
            payment_methods: p.locator(".payment_methods, .wc_payment_methods").first(),
            payment_options: p.locator(r#"input[name="payment_method"]"#),
            validation_errors: p.locator(".woocommerce-error, .woocommerce-invalid"),
            required_field_errors: p.locator(".form-row.woocommerce-invalid, .woocommerce-invalid"),
            place_order_button: p
                .locator(r#"#place_order, button[name="woocommerce_checkout_place_order"]"#)
                .first(),

            stock_messages: p.locator(".stock, .availability"),
            out_of_stock_messages: p.locator(r#".out-of-stock, :text("Out of stock")"#),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn navigate_to_cart(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::Cart);
        info!("Navigating to {}", url);
        self.page
            .goto(&url, LoadState::Load, self.config.timeouts.network_idle)
            .await?;
        self.wait_for_page_load().await;

        let cookies = self.page.cookies().await?;
        let session_cookies = cookies
            .iter()
            .filter_map(|c| c.get("name").and_then(|n| n.as_str()))
            .filter(|name| name.contains("cart") || name.contains("woocommerce"))
            .count();
        debug!("{} cart session cookies present", session_cookies);
        Ok(())
    }

    pub async fn click_cart_navigation(&self) -> E2eResult<()> {
        self.cart_nav_link.click().await?;
        self.wait_for_page_load().await;
        Ok(())
    }

    /// DOM ready plus two seconds for the cart fragments; failures only log
    pub async fn wait_for_page_load(&self) {
        let loaded = async {
            self.page
                .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
                .await?;
            self.page.wait(2_000).await
        };
        if let Err(e) = loaded.await {
            warn!("Cart page load wait failed: {}", e);
        }
    }

    pub async fn verify_cart_page_loaded(&self) -> E2eResult<()> {
        expect(&self.cart_container).to_be_visible().await
    }

    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page)
            .to_have_title(TextMatch::regex(CART_TITLE_PATTERN))
            .await?;
        expect_page(&self.page).to_have_url(UrlMatch::pattern("cart")).await
    }

    pub async fn is_cart_empty(&self) -> bool {
        visible_within(&self.empty_cart_message, 3_000).await
    }

    /// Rows in the cart table, zero when the empty notice shows
    pub async fn cart_item_count(&self) -> E2eResult<usize> {
        if self.is_cart_empty().await {
            return Ok(0);
        }
        for selector in ITEM_SELECTORS {
            let count = self.page.locator(selector).count().await?;
            if count > 0 {
                return Ok(count);
            }
        }
        Ok(0)
    }

    /// Add the named product from the current listing, falling back to the
    /// direct add-to-cart URL whenever the UI path does not work out
    pub async fn add_product_to_cart(&self, name: &str) -> E2eResult<()> {
        let page = &self.page;
        let candidates = [
            page.locator(".product").filter_text(name),
            page.locator(".wc-block-grid__product").filter_text(name),
            page.locator(".type-product").filter_text(name),
            page.locator(format!("[data-product-name*={}]", css_quote(name))),
        ];

        let mut card = None;
        for candidate in &candidates {
            let element = candidate.first();
            if visible_within(&element, 3_000).await {
                card = Some(element);
                break;
            }
        }
        let Some(card) = card else {
            info!("'{}' not listed on this page, using direct add-to-cart", name);
            return self.add_product_via_direct_url().await;
        };

        match self.add_from_card(&card).await {
            Ok(true) => self.page.wait(3_000).await,
            Ok(false) => self.add_product_via_direct_url().await,
            Err(e) => {
                warn!("Adding '{}' through the shop failed: {}", name, e);
                self.add_product_via_direct_url().await
            }
        }
    }

    /// Add whichever product the listing shows first
    pub async fn select_first_product_and_add_to_cart(&self) -> E2eResult<()> {
        let attempt = async {
            self.page
                .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
                .await?;
            self.page.wait(2_000).await?;

            let mut first = None;
            for selector in PRODUCT_SELECTORS {
                let products = self.page.locator(selector);
                if products.count().await? > 0 && visible_within(&products.first(), 3_000).await {
                    first = Some(products.first());
                    break;
                }
            }
            let card = first.ok_or_else(|| E2eError::assertion("No products found on the page"))?;
            self.add_from_card(&card).await
        };

        match attempt.await {
            Ok(true) => self.page.wait(3_000).await,
            Ok(false) => self.add_product_via_direct_url().await,
            Err(e) => {
                warn!("Adding the first product failed: {}", e);
                self.add_product_via_direct_url().await
            }
        }
    }

    /// Click through a product card. Returns false when the card offers no
    /// usable button so the caller can fall back.
    async fn add_from_card(&self, card: &Locator) -> E2eResult<bool> {
        let select_options = card
            .locator(r#"a:has-text("Select options"), .button:has-text("Select options")"#)
            .first();
        let add_to_cart = card
            .locator(r#".add_to_cart_button, a:has-text("Add to cart")"#)
            .first();

        if visible_within(&select_options, 2_000).await {
            select_options.scroll_into_view().await?;
            select_options.click().await?;
            self.page
                .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
                .await?;
            self.page.wait(2_000).await?;
            self.choose_variations().await?;

            let product_page_button = self
                .page
                .locator(concat!(
                    r#"button:has-text("Add to cart"):not([disabled]):not(.disabled), "#,
                    ".single_add_to_cart_button:not([disabled]):not(.disabled)"
                ))
                .first();
            if !visible_within(&product_page_button, 3_000).await
                || !product_page_button.is_enabled().await.unwrap_or(false)
            {
                return Ok(false);
            }
            product_page_button.scroll_into_view().await?;
            product_page_button.click().await?;
            Ok(true)
        } else if visible_within(&add_to_cart, 2_000).await {
            add_to_cart.scroll_into_view().await?;
            add_to_cart.click().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Pick the first real option of every variation dropdown
    async fn choose_variations(&self) -> E2eResult<()> {
        let selects = self.page.locator(r#"select[name*="attribute"], .variations select"#);
        let count = selects.count().await?;
        if count == 0 {
            return Ok(());
        }
        for i in 0..count {
            let select = selects.nth(i);
            let name = select.get_attribute("name").await.ok().flatten();
            if select.locator("option").count().await? > 1 {
                debug!("Choosing first option for {}", name.as_deref().unwrap_or("unknown"));
                select.select_option(SelectBy::Index(1)).await?;
                self.page.wait(1_000).await?;
            }
        }
        self.page.wait(2_000).await
    }

    /// Add the configured fallback product through `/?add-to-cart=<id>`
    pub async fn add_product_via_direct_url(&self) -> E2eResult<()> {
        let url = self.config.absolute_url(&format!(
            "/?add-to-cart={}",
            self.config.test_data.fallback_product_id
        ));
        info!("Adding product via {}", url);

        let added = async {
            self.page
                .goto(&url, LoadState::Load, self.config.timeouts.long)
                .await?;
            self.page
                .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
                .await?;

            let mut confirmed = false;
            for selector in ADDED_NOTICES {
                if visible_within(&self.page.locator(selector), 2_000).await {
                    confirmed = true;
                    break;
                }
            }
            debug!("Add-to-cart notice shown: {}", confirmed);
            self.page.wait(3_000).await
        };
        added.await.map_err(|e| {
            E2eError::step(
                "add product to cart",
                format!("Could not add product to cart using any method: {}", e),
            )
        })
    }

    /// Follow the add-to-cart links of the first `count` simple products
    /// on the shop page. Returns how many were added.
    pub async fn add_simple_products(&self, count: usize) -> E2eResult<usize> {
        let mut added = 0;
        for index in 0..count {
            self.open_shop().await?;
            let links = self.page.locator(SIMPLE_ADD_TO_CART);
            let available = links.count().await?;
            if available == 0 {
                break;
            }
            // A shop with a single simple product gets it added repeatedly
            let link = links.nth(index.min(available - 1));
            let Some(href) = link.get_attribute("href").await? else {
                break;
            };
            let url = self.config.absolute_url(&href);
            info!("Adding product via {}", url);
            self.page
                .goto(&url, LoadState::DomContentLoaded, self.config.timeouts.long)
                .await?;
            self.page.wait(1_000).await?;
            added += 1;
        }
        Ok(added)
    }

    pub async fn open_shop(&self) -> E2eResult<()> {
        self.page
            .goto(
                &self.config.url_of(SitePage::Products),
                LoadState::DomContentLoaded,
                self.config.timeouts.long + self.config.timeouts.short,
            )
            .await?;
        self.page.wait(2_000).await
    }

    pub async fn update_item_quantity(&self, index: usize, quantity: i64) -> E2eResult<()> {
        let input = self.quantity_inputs.nth(index);
        input.wait_for(WaitState::Visible, self.config.timeouts.medium).await?;
        input.clear().await?;
        input.fill(&quantity.to_string()).await?;

        // Themes with auto-update hide the button
        if visible_within(&self.update_cart_button, 2_000).await {
            self.update_cart_button.click().await?;
        }

        self.page
            .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
            .await?;
        self.page.wait(3_000).await
    }

    pub async fn remove_item(&self, index: usize) -> E2eResult<()> {
        let before = self.cart_item_count().await?;

        let mut button = None;
        for selector in REMOVE_SELECTORS {
            let buttons = self.page.locator(selector);
            if buttons.count().await? > index {
                let candidate = buttons.nth(index);
                let visible = visible_within(&candidate, 3_000).await;
                button = Some(candidate);
                if visible {
                    break;
                }
            }
        }
        let button = button
            .ok_or_else(|| E2eError::assertion(format!("Remove button for item {} not found", index)))?;

        button.scroll_into_view().await?;
        button.click().await?;
        self.page.wait(3_000).await?;

        let after = self.cart_item_count().await?;
        debug!("Cart items before removal: {}, after: {}", before, after);
        Ok(())
    }

    /// Submit the coupon form and wait for WooCommerce to answer
    pub async fn apply_coupon(&self, code: &str) -> E2eResult<()> {
        self.coupon_input.fill(code).await?;
        self.submit_coupon().await
    }

    /// Click apply and wait for the success or error notice
    pub async fn submit_coupon(&self) -> E2eResult<()> {
        self.apply_coupon_button.click().await?;

        let timeout = self.config.timeouts.long;
        let answered = tokio::select! {
            r = self.coupon_success.wait_for(WaitState::Visible, timeout) => r.is_ok(),
            r = self.coupon_error.wait_for(WaitState::Visible, timeout) => r.is_ok(),
        };
        if !answered {
            warn!("No coupon notice within {}ms", timeout);
            let shot = self.page.screenshot_named("coupon-timeout").await?;
            debug!("Saved {}", shot.display());
        }

        self.page.wait(2_000).await
    }

    pub async fn remove_coupon(&self) -> E2eResult<()> {
        if self.remove_coupon_link.is_visible().await? {
            self.remove_coupon_link.click().await?;
            self.page
                .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
                .await?;
            self.page.wait(2_000).await?;
        }
        Ok(())
    }

    pub async fn continue_shopping(&self) -> E2eResult<()> {
        self.continue_shopping_button.click().await?;
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.config.timeouts.network_idle)
            .await
    }

    pub async fn proceed_to_checkout(&self) -> E2eResult<()> {
        if !self.page.url().await?.contains("/cart") {
            self.navigate_to_cart().await?;
        }

        let items = self.cart_items.count().await?;
        if items == 0 {
            return Err(E2eError::assertion("Cannot proceed to checkout: cart is empty"));
        }
        if visible_within(&self.empty_cart_message, 2_000).await {
            return Err(E2eError::assertion("Cannot proceed to checkout: cart appears empty"));
        }

        if self
            .proceed_to_checkout_button
            .wait_for(WaitState::Visible, 8_000)
            .await
            .is_err()
        {
            return Err(E2eError::assertion(format!(
                "Checkout button not found. Current URL: {}, Cart items: {}",
                self.page.url().await?,
                items
            )));
        }
        if !self.proceed_to_checkout_button.is_enabled().await? {
            return Err(E2eError::assertion("Checkout button is not enabled"));
        }

        self.proceed_to_checkout_button.scroll_into_view().await?;
        self.proceed_to_checkout_button.click().await?;
        self.page
            .wait_for_url(UrlPattern::Glob("**/checkout/**".to_string()), 20_000)
            .await?;
        self.page
            .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
            .await
    }

    pub async fn fill_billing_information(&self, data: &BillingData) -> E2eResult<()> {
        let fields = [
            (&data.first_name, &self.billing_first_name),
            (&data.last_name, &self.billing_last_name),
            (&data.email, &self.billing_email),
            (&data.phone, &self.billing_phone),
            (&data.address, &self.billing_address_1),
            (&data.city, &self.billing_city),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                field.fill(value).await?;
            }
        }

        if let Some(state) = &data.state {
            if let Err(e) = self.choose_state(state).await {
                warn!("Skipping billing state '{}': {}", state, e);
            }
        }
        if let Some(zip) = &data.zip_code {
            self.billing_postcode.fill(zip).await?;
        }
        Ok(())
    }

    /// The state field is a Select2 widget over a hidden select
    async fn choose_state(&self, state: &str) -> E2eResult<()> {
        let widget = self
            .page
            .locator("#billing_state_field .select2-container")
            .first();
        if visible_within(&widget, 2_000).await {
            widget.click().await?;
            self.page.wait(500).await?;
            let option = self
                .page
                .locator(".select2-results__option")
                .filter_text(state)
                .first();
            if visible_within(&option, 2_000).await {
                return option.click().await;
            }
        }
        self.billing_state
            .select_option(SelectBy::Label(state.to_string()))
            .await
            .map(|_| ())
    }

    /// First visible dollar amount among the total selectors, "$0.00" when
    /// nothing is shown
    pub async fn cart_total(&self) -> String {
        for selector in TOTAL_SELECTORS {
            let element = self.page.locator(selector).last();
            if !visible_within(&element, 2_000).await {
                continue;
            }
            if let Ok(Some(text)) = element.text_content().await {
                if text.contains('$') {
                    return text.trim().to_string();
                }
            }
        }
        "$0.00".to_string()
    }

    /// Numeric value of `cart_total`
    pub async fn cart_total_value(&self) -> E2eResult<f64> {
        let total = self.cart_total().await;
        parse_amount(&total)
            .ok_or_else(|| E2eError::assertion(format!("cart total '{}' is not a number", total)))
    }

    pub async fn cart_contains_item(&self, name: &str) -> bool {
        let row = self
            .page
            .locator(".cart_item")
            .filter_text(name)
            .first();
        visible_within(&row, 5_000).await
    }

    /// Non-blank validation notices
    pub async fn validation_error_messages(&self) -> E2eResult<Vec<String>> {
        let texts = self.validation_errors.all_text_contents().await?;
        Ok(texts.into_iter().filter(|t| !t.trim().is_empty()).collect())
    }

    pub async fn payment_methods_visible(&self) -> bool {
        visible_within(&self.payment_methods, 5_000).await
    }

    /// Empty the cart, then add one simple product. Never fails so that
    /// scenarios can handle an empty cart themselves.
    pub async fn setup_cart_with_items(&self) {
        self.clear_cart().await;
        match self.add_simple_products(1).await {
            Ok(added) if added > 0 => {}
            Ok(_) => {
                let first = self.page.locator(".product").first();
                let button = first
                    .locator(r#".add_to_cart_button, button:has-text("Add to cart")"#)
                    .first();
                if visible_within(&first, 5_000).await && visible_within(&button, 3_000).await {
                    if let Err(e) = button.click_within(self.config.timeouts.medium).await {
                        warn!("Could not add a product: {}", e);
                    }
                    let _ = self.page.wait(2_000).await;
                }
            }
            Err(e) => warn!("Cart setup failed: {}", e),
        }
    }

    /// Remove every line item; errors only log
    pub async fn clear_cart(&self) {
        if let Err(e) = self.navigate_to_cart().await {
            warn!("Could not open the cart to clear it: {}", e);
            return;
        }
        if self.is_cart_empty().await {
            return;
        }

        let count = self.remove_buttons.count().await.unwrap_or(0);
        for _ in 0..count {
            let button = self.remove_buttons.first();
            if !visible_within(&button, 2_000).await {
                continue;
            }
            let removed = async {
                button.click().await?;
                self.page.wait(1_000).await?;
                self.page
                    .wait_for_load_state(LoadState::DomContentLoaded, self.config.timeouts.long)
                    .await
            };
            if let Err(e) = removed.await {
                debug!("Error removing cart item: {}", e);
            }
        }
    }

    /// Click place order with an empty form to trigger validation
    pub async fn submit_empty_checkout_form(&self) -> E2eResult<()> {
        self.place_order_button.click().await?;
        self.page.wait(2_000).await
    }
}

/// Whether `locator` becomes visible within `timeout_ms`
pub(crate) async fn visible_within(locator: &Locator, timeout_ms: u64) -> bool {
    expect(locator).timeout(timeout_ms).to_be_visible().await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_billing_from_table() {
        let data = BillingData::from_table(&table(&[
            &["Field", "Value"],
            &["First Name", "Jane"],
            &["Email", "jane@example.com"],
            &["Zip Code", "90210"],
            &["Fax", "ignored"],
        ]));
        assert_eq!(data.first_name.as_deref(), Some("Jane"));
        assert_eq!(data.email.as_deref(), Some("jane@example.com"));
        assert_eq!(data.zip_code.as_deref(), Some("90210"));
        assert_eq!(data.last_name, None);
    }

    #[test]
    fn test_billing_from_table_without_field_column() {
        let data = BillingData::from_table(&table(&[&["Name", "Value"], &["City", "Anytown"]]));
        assert_eq!(data, BillingData::default());
    }

    #[test]
    fn test_sample_billing_is_complete() {
        let data = BillingData::sample();
        assert!(data.first_name.is_some() && data.state.is_some() && data.zip_code.is_some());
    }

    #[test]
    fn test_coupon_error_pattern() {
        let m = TextMatch::regex_i(COUPON_ERROR_PATTERN);
        assert!(m.matches("Coupon \"bogus\" does not exist!").unwrap());
        assert!(m.matches("This coupon has EXPIRED").unwrap());
        assert!(!m.matches("Coupon code applied successfully.").unwrap());
    }
}
