//! Products (shop) page steps

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use super::{StepArgs, StepRegistry};
use crate::error::E2eResult;
use crate::expect::{ensure, expect, expect_page, UrlMatch};
use crate::locator::TextMatch;
use crate::pages::verify_first_of;
use crate::world::World;

/// Wait before inspecting whatever a product click opened
const DETAIL_SETTLE_MS: u64 = 2_000;

/// Content that marks a product detail view, most specific first
const DETAIL_SELECTORS: [&str; 6] = [
    "h1, .product-title, .entry-title, .product-name",
    ".product-content, .product-description, .entry-content",
    ".product-details, .product-info",
    ".woocommerce-product-details, .single-product",
    ".product-summary, .summary",
    "main, .main, #main",
];

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I am on the Products page", on_products_page);
    r.when("I navigate to the Products page", navigate_to_products);
    r.when("I click the Products navigation link", click_products_link);
    r.then("I should see the Products page title {string}", products_title);
    r.then("I should be redirected to the Products page", redirected_to_products);
    r.then("the Products page should load correctly", products_loaded);
    r.then("the Products URL should contain {string}", products_url);

    r.then("I should see the main Shop heading", shop_heading);
    r.then("the products page should have proper heading structure", shop_heading);
    r.then("I should see breadcrumbs navigation", breadcrumbs);
    r.then("category navigation should be clear", breadcrumbs);
    r.then("the products page should be navigable", navigable);

    r.then("I should see the products grid", grid_visible);
    r.then("I should see products arranged in a grid layout", grid_visible);
    r.then("I should see multiple products displayed", product_grid);
    r.then("I should see product grid with multiple items", grid_with_items);
    r.then("I should see products in the window shades category", window_shades);
    r.then("products should be properly categorized", window_shades);
    r.then("I should see featured products like {string}", featured_product);

    r.then("each product should display pricing information", pricing);
    r.then("each product should show price information", pricing);
    r.then("products should be clearly displayed with pricing", pricing);
    r.then("each product should have interaction buttons", buttons);
    r.then("product interaction elements should be accessible", buttons);
    r.then("each product should have a title", titles);
    r.then("each product should have {string} or {string} button", option_buttons);
    r.then("product images should be displayed", images);

    r.when("I click on a product {string}", click_product);
    r.then("I should be taken to the product detail page", on_detail_page);
    r.then("the product detail page should load correctly", detail_loaded);

    r.then("I should see filter options if available", filters);
    r.then("filtering functionality should be accessible", filters);
}

fn on_products_page(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.products.navigate_to_products().await?;
        world.products.verify_page_title().await
    }
    .boxed()
}

fn navigate_to_products(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.products.navigate_to_products().await
    }
    .boxed()
}

fn click_products_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.click_products_navigation().await }.boxed()
}

fn products_title(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect_page(&world.page).to_have_title(args.string(0)?).await }.boxed()
}

fn redirected_to_products(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_page_title().await }.boxed()
}

fn products_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_products_page_loaded().await }.boxed()
}

fn products_url(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page)
            .to_have_url(UrlMatch::pattern(args.string(0)?))
            .await
    }
    .boxed()
}

fn shop_heading(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let heading = &world.products.page_heading;
        expect(heading).to_be_visible().await?;
        expect(heading).to_contain_text(TextMatch::regex_i("shop")).await
    }
    .boxed()
}

fn breadcrumbs(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_breadcrumbs().await }.boxed()
}

fn navigable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.products.page_heading).to_be_visible().await?;
        expect(&world.products.product_grid).to_be_visible().await
    }
    .boxed()
}

fn grid_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.products.product_grid).to_be_visible().await }.boxed()
}

fn product_grid(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_product_grid().await }.boxed()
}

fn grid_with_items(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.products.verify_product_grid().await?;
        let count = world.products.product_count().await?;
        debug!("{} products on the shop page", count);
        ensure(count > 0, "shop page lists no products")
    }
    .boxed()
}

fn window_shades(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let count = world.products.window_shades_category.count().await?;
        ensure(count > 0, "no products in the window shades category")
    }
    .boxed()
}

fn featured_product(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.products.product(args.string(0)?)).to_be_visible().await }.boxed()
}

fn pricing(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_product_pricing().await }.boxed()
}

fn buttons(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_product_buttons().await }.boxed()
}

fn titles(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { verify_first_of(&world.products.product_titles, "product titles").await }.boxed()
}

/// Variable products only offer "Select options"; the labels are informational
fn option_buttons(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let count = world.products.select_options_buttons.count().await?;
        ensure(
            count > 0,
            format!(
                "no '{}' or '{}' buttons on product cards",
                args.string(0)?,
                args.string(1)?
            ),
        )
    }
    .boxed()
}

fn images(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { verify_first_of(&world.products.product_images, "product images").await }.boxed()
}

fn click_product(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.click_product(args.string(0)?).await }.boxed()
}

/// A click either navigates to the product or opens a quick-view overlay
fn on_detail_page(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let page = &world.page;
        page.wait(DETAIL_SETTLE_MS).await?;

        let url = page.url().await?;
        if ["product", "item", "shop"].iter().any(|m| url.contains(m)) {
            return Ok(());
        }
        let modal = page
            .locator(".product-modal, .product-popup, .product-details")
            .is_visible()
            .await
            .unwrap_or(false);
        if modal {
            return Ok(());
        }
        let heading = page
            .locator(DETAIL_SELECTORS[0])
            .first()
            .is_visible()
            .await
            .unwrap_or(false);
        ensure(heading, format!("no product details after clicking a product ({})", url))
    }
    .boxed()
}

fn detail_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let page = &world.page;
        page.wait(DETAIL_SETTLE_MS).await?;

        for selector in DETAIL_SELECTORS {
            if page.locator(selector).first().is_visible().await.unwrap_or(false) {
                debug!("Product detail content found via {}", selector);
                return Ok(());
            }
        }
        let body = page.locator("body").is_visible().await.unwrap_or(false);
        ensure(body, "product detail page rendered no content")
    }
    .boxed()
}

fn filters(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.products.verify_filters().await }.boxed()
}
