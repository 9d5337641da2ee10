//! Cart, coupon and checkout steps

use futures::future::BoxFuture;
use futures::FutureExt;
use pinecrest_common::money::{is_currency_format, is_zero_amount, parse_amount};
use pinecrest_common::SitePage;
use tracing::{debug, info, warn};

use super::{StepArgs, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::expect::{assert_page_title, ensure, ensure_eq, expect, expect_page, UrlMatch};
use crate::locator::TextMatch;
use crate::pages::{visible_within, BillingData, COUPON_ERROR_PATTERN};
use crate::playwright::{LoadState, UrlPattern};
use crate::world::World;

const ZERO_TOTAL: &str = "$0.00";

/// Upper bound for any cart the scenarios build
const MAX_PLAUSIBLE_TOTAL: f64 = 10_000.0;

/// Largest quantity the store is expected to let through
const MAX_LINE_QUANTITY: i64 = 999;

/// Notices that may carry the invalid coupon message
const NOTICE_SELECTORS: &str = r#"[class*="error"], [class*="notice"], .woocommerce-notice, .message"#;

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I have items in my cart", have_items);
    r.given("I have multiple items in my cart", have_multiple_items);
    r.given("I have items in my cart with an applied coupon", have_items_with_coupon);

    r.when("I navigate to the cart page", navigate_to_cart);
    r.when("I click the Cart navigation link", click_cart_link);
    r.then("I should see the cart page title {string}", cart_title);
    r.then("I should be redirected to the cart page", redirected_to_cart);
    r.then("the cart page should load within acceptable time", cart_container_visible);

    r.then("I should see the empty cart message", empty_cart_message);
    r.then("I should see {string} or {string} button", either_button_visible);
    r.then("the cart total should be {string}", total_is);
    r.then("the cart total should be greater than {string}", total_greater_than);

    r.when("I select the first available product", first_product_available);
    r.when("I add the product to cart", add_first_product);
    r.when("I add {string} to cart", add_named_product);
    r.then("I should see {int} item in the cart", item_count_is);
    r.then("I should see {int} items in the cart", item_count_is);
    r.then("I should see the product details in cart", product_details);
    r.then("each item should display correctly in cart", items_display);
    r.then("all cart items should be displayed properly", items_visible);
    r.then("the cart total should reflect all items", total_positive);
    r.then("cart calculations should be accurate", total_plausible);

    r.when("I increase the quantity of the first item to {int}", set_first_quantity);
    r.when("I try to set quantity to a very high number like {int}", set_first_quantity);
    r.when("I try to set quantity to a high number like {int}", set_first_quantity);
    r.then("the cart should update automatically", cart_updated);
    r.then("the line total should reflect the new quantity", line_total);
    r.then("the cart total should be recalculated", total_recalculated);
    r.then("the cart total should be recalculated accordingly", total_follows_quantity);
    r.then("the system should accept the high quantity", high_quantity_accepted);
    r.then("the system should handle the maximum quantity appropriately", quantity_capped);
    r.then("display appropriate validation messages if needed", validation_messages_meaningful);

    r.when("I remove the first item from cart", remove_first_item);
    r.then("the item should be removed from cart", item_removed);
    r.then("the remaining items should still be displayed", remaining_items);

    r.when("I continue shopping", continue_shopping);
    r.when("I click {string} or {string} button", click_either_button);
    r.then("I should be redirected to the products page from cart", back_on_shop);
    r.then("my cart items should be preserved", items_preserved);

    r.when("I click {string} button", click_button);
    r.when("I proceed to checkout", proceed_to_checkout);
    r.then("I should be redirected to the checkout page", on_checkout);
    r.then("I should see the order review section", order_review);
    r.then("I should see order review section", order_review);
    r.then("I should see billing information form", billing_form);
    r.then("I should see all cart items listed", order_items);
    r.then("I should see subtotal, tax, and total amounts", order_totals);
    r.then("the totals should match my cart contents", order_total_nonzero);

    r.when("I fill in the billing information:", fill_billing_table);
    r.when("I fill in all required billing information", fill_sample_billing);
    r.then("the billing form should accept all valid information", billing_accepted);
    r.when("I attempt to submit without filling required fields", submit_empty_checkout);
    r.then("I should see validation errors for required fields", validation_errors_shown);
    r.then("I should not be able to proceed until all required fields are filled", still_on_checkout);

    r.when("I enter a valid coupon code {string}", enter_coupon);
    r.when("I enter an invalid coupon code {string}", enter_coupon);
    r.when("I apply the coupon", apply_coupon);
    r.when("I remove the applied coupon", remove_coupon);
    r.then("the discount should be applied to cart total", discount_applied);
    r.then("I should see the coupon discount line item", discount_line);
    r.then("the total should reflect the discount", total_present);
    r.then("I should see an error message about invalid coupon", invalid_coupon_error);
    r.then("the cart total should remain unchanged", total_unchanged);
    r.then("the discount should be removed", discount_removed);
    r.then("the cart total should return to original amount", total_nonzero);

    r.then("each item should show current stock availability", items_present);
    r.then("I should be warned if any items are out of stock", out_of_stock_warning);
    r.then("out of stock items should be handled appropriately", out_of_stock_marked);

    r.then("I should see available payment options", payment_methods);
    r.then("I should be able to proceed to payment options", payment_methods);
    r.then("I should be able to select different payment methods", payment_options);
    r.then("each payment method should be functional", payment_options_usable);
}

fn have_items(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        let added = world
            .cart
            .add_simple_products(1)
            .await
            .map_err(|e| E2eError::step("cart setup", format!("Cart setup failed: {}", e)))?;
        if added == 0 {
            return Err(E2eError::step(
                "cart setup",
                "Cart setup failed: No products available for cart testing",
            ));
        }
        Ok(())
    }
    .boxed()
}

fn have_multiple_items(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        let added = world.cart.add_simple_products(2).await.map_err(|e| {
            E2eError::step("cart setup", format!("Multi-item cart setup failed: {}", e))
        })?;
        if added < 2 {
            return Err(E2eError::step(
                "cart setup",
                format!(
                    "Multi-item cart setup failed: only {} products could be added",
                    added
                ),
            ));
        }
        Ok(())
    }
    .boxed()
}

/// The coupon is best effort; scenarios check for it themselves
fn have_items_with_coupon(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        let added = world.cart.add_simple_products(1).await?;
        if added == 0 {
            return Err(E2eError::step(
                "cart setup",
                "Cart with coupon setup failed: no products available",
            ));
        }
        world.cart.navigate_to_cart().await?;
        world.page.wait(2_000).await?;

        let coupon = world.config.test_data.test_coupon.clone();
        match world.cart.apply_coupon(&coupon).await {
            Ok(()) => info!("Applied coupon {}", coupon),
            Err(e) => warn!("Could not apply coupon {}, continuing without it: {}", coupon, e),
        }
        Ok(())
    }
    .boxed()
}

fn navigate_to_cart(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.cart.navigate_to_cart().await
    }
    .boxed()
}

fn click_cart_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.click_cart_navigation().await }.boxed()
}

fn cart_title(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { assert_page_title(&world.page, args.string(0)?).await }.boxed()
}

fn redirected_to_cart(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.cart.verify_page_title().await?;
        world.cart.verify_cart_page_loaded().await
    }
    .boxed()
}

fn cart_container_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.cart.cart_container).to_be_visible().await }.boxed()
}

fn empty_cart_message(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        ensure(world.cart.is_cart_empty().await, "cart is not empty")?;
        expect(&world.cart.empty_cart_message).to_be_visible().await
    }
    .boxed()
}

fn either_button_visible(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let links = world.page.locator("a");
        let button = links
            .filter_text(args.string(0)?)
            .or(&links.filter_text(args.string(1)?))
            .first();
        expect(&button).to_be_visible().await
    }
    .boxed()
}

/// Whether `actual` satisfies an expected total; "$0.00" also accepts an empty cart
fn total_matches(expected: &str, actual: &str, cart_empty: bool) -> bool {
    if expected == ZERO_TOTAL {
        cart_empty || is_zero_amount(actual)
    } else {
        actual.contains(expected)
    }
}

fn total_is(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let expected = args.string(0)?;
        let actual = world.cart.cart_total().await;
        debug!("Expected total {}, actual {}", expected, actual);
        let empty = expected == ZERO_TOTAL && world.cart.is_cart_empty().await;
        ensure(
            total_matches(expected, &actual, empty),
            format!("cart total is {}, expected {}", actual, expected),
        )
    }
    .boxed()
}

fn total_greater_than(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.cart.navigate_to_cart().await?;
        let raw = args.string(0)?;
        let minimum = parse_amount(raw)
            .ok_or_else(|| E2eError::InvalidStepArgument(format!("'{}' is not an amount", raw)))?;
        let total = world.cart.cart_total_value().await?;
        ensure(
            total > minimum,
            format!("cart total {:.2} is not greater than {:.2}", total, minimum),
        )
    }
    .boxed()
}

fn first_product_available(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.products.product_grid).to_be_visible().await }.boxed()
}

/// Through the product card first, then any add-to-cart button on the shop page
fn add_first_product(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let Err(error) = world.cart.select_first_product_and_add_to_cart().await else {
            return world.cart.navigate_to_cart().await;
        };
        warn!("Adding the first product failed ({}), trying the shop buttons", error);

        let fallback = async {
            world.cart.open_shop().await?;
            let button = world.page.locator(".add_to_cart_button").first();
            if !visible_within(&button, 5_000).await {
                return Err(E2eError::assertion("No add to cart buttons found"));
            }
            button.click_within(world.config.timeouts.medium).await?;
            world.cart.navigate_to_cart().await
        };
        fallback.await.map_err(|fallback_error| {
            debug!("Fallback add to cart failed: {}", fallback_error);
            E2eError::step(
                "add product to cart",
                format!("Could not add product to cart: {}", error),
            )
        })
    }
    .boxed()
}

fn add_named_product(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.add_product_to_cart(args.string(0)?).await }.boxed()
}

fn item_count_is(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let expected = usize::try_from(args.int(0)?)
            .map_err(|_| E2eError::InvalidStepArgument(format!("bad item count in '{}'", args.text)))?;
        world.cart.navigate_to_cart().await?;
        let count = world.cart.cart_item_count().await?;
        ensure_eq(count, expected, "cart items")
    }
    .boxed()
}

fn product_details(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.cart.navigate_to_cart().await?;
        expect(&world.cart.cart_items.first()).to_be_visible().await?;
        expect(&world.cart.product_names).to_be_visible().await?;
        expect(&world.cart.product_prices).to_be_visible().await
    }
    .boxed()
}

async fn every_item_visible(world: &World) -> E2eResult<()> {
    let count = world.cart.cart_item_count().await?;
    ensure(count > 0, "cart has no items")?;
    for i in 0..count {
        expect(&world.cart.cart_items.nth(i)).to_be_visible().await?;
    }
    Ok(())
}

fn items_display(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.cart.navigate_to_cart().await?;
        every_item_visible(world).await
    }
    .boxed()
}

fn items_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { every_item_visible(world).await }.boxed()
}

fn total_positive(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.cart.navigate_to_cart().await?;
        let total = world.cart.cart_total_value().await?;
        ensure(total > 0.0, format!("cart total is {:.2}", total))
    }
    .boxed()
}

fn total_plausible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let total = world.cart.cart_total_value().await?;
        ensure(
            total > 0.0 && total < MAX_PLAUSIBLE_TOTAL,
            format!("cart total {:.2} is outside 0..{}", total, MAX_PLAUSIBLE_TOTAL),
        )
    }
    .boxed()
}

fn set_first_quantity(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.update_item_quantity(0, args.int(0)?).await }.boxed()
}

/// Give the AJAX cart refresh time, then check the rows survived it
fn cart_updated(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world
            .page
            .wait_for_load_state(LoadState::DomContentLoaded, world.config.timeouts.long)
            .await?;
        world.page.wait(3_000).await?;
        expect(&world.cart.cart_items.first()).to_be_visible().await?;
        let count = world.cart.cart_items.count().await?;
        ensure(count > 0, "cart emptied itself after the update")
    }
    .boxed()
}

fn line_total(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let subtotal = &world.cart.product_subtotals;
        expect(subtotal).to_be_visible().await?;
        let text = subtotal.text_content().await?.unwrap_or_default();
        ensure(!text.trim().is_empty(), "line subtotal is blank")
    }
    .boxed()
}

fn total_recalculated(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.wait(1_000).await?;
        let total = world.cart.cart_total().await;
        info!("Cart total after recalculation: {}", total);
        ensure(
            is_currency_format(&total),
            format!("cart total '{}' is not a dollar amount", total),
        )
    }
    .boxed()
}

async fn first_quantity(world: &World) -> E2eResult<i64> {
    let raw = world.cart.quantity_inputs.first().input_value().await?;
    raw.trim()
        .parse()
        .map_err(|_| E2eError::assertion(format!("quantity '{}' is not a number", raw)))
}

fn total_follows_quantity(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let total = world.cart.cart_total().await;
        ensure(total != ZERO_TOTAL, "cart total dropped to $0.00")?;

        let quantity = first_quantity(world).await?;
        info!("Quantity {}, total {}", quantity, total);
        if quantity > 1 {
            let value = parse_amount(&total).unwrap_or(0.0);
            ensure(
                value > 5.0,
                format!("total {} is too low for {} items", total, quantity),
            )?;
        }
        Ok(())
    }
    .boxed()
}

/// The store may cap the quantity, but not back down to one
fn high_quantity_accepted(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world
            .page
            .wait_for_load_state(LoadState::DomContentLoaded, world.config.timeouts.long)
            .await?;
        world.page.wait(2_000).await?;
        let quantity = first_quantity(world).await?;
        ensure(quantity > 1, format!("quantity fell back to {}", quantity))
    }
    .boxed()
}

fn quantity_capped(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let quantity = first_quantity(world).await?;
        ensure(
            quantity <= MAX_LINE_QUANTITY,
            format!("quantity {} exceeds {}", quantity, MAX_LINE_QUANTITY),
        )
    }
    .boxed()
}

fn validation_messages_meaningful(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        match world.cart.validation_error_messages().await {
            Ok(messages) => {
                if let Some(first) = messages.first() {
                    info!("Quantity validation message: {}", first.trim());
                }
            }
            Err(e) => debug!("No validation messages: {}", e),
        }
        Ok(())
    }
    .boxed()
}

fn remove_first_item(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.remove_item(0).await }.boxed()
}

fn item_removed(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.wait(2_000).await?;
        if world.cart.is_cart_empty().await {
            info!("Cart is empty after removal");
        } else {
            let remaining = world.cart.cart_item_count().await?;
            info!("{} items remain after removal", remaining);
        }
        Ok(())
    }
    .boxed()
}

fn remaining_items(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        if !world.cart.is_cart_empty().await {
            expect(&world.cart.cart_items.first()).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn continue_shopping(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.open_shop().await }.boxed()
}

/// Either labelled link or button, any shop link, or the shop itself
fn click_either_button(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let (first, second) = (args.string(0)?, args.string(1)?);
        let page = &world.page;
        let candidates = [
            page.locator("a").filter_text(first),
            page.locator("a").filter_text(second),
            page.locator("button").filter_text(first),
            page.locator("button").filter_text(second),
            page.locator(r#"a[href*="shop"]"#),
            page.locator(".continue-shopping"),
            page.locator(".return-to-shop"),
        ];

        let mut clicked = false;
        for candidate in &candidates {
            let button = candidate.first();
            if !visible_within(&button, 3_000).await {
                continue;
            }
            debug!("Clicking {}", button.describe());
            button.scroll_into_view().await?;
            button.click().await?;
            clicked = true;
            break;
        }
        if !clicked {
            warn!("No '{}' or '{}' button, opening the shop directly", first, second);
            let shop = world.config.url_of(SitePage::Products);
            world
                .page
                .goto(&shop, LoadState::DomContentLoaded, world.config.timeouts.long)
                .await?;
        }

        world
            .page
            .wait_for_load_state(LoadState::DomContentLoaded, world.config.timeouts.long)
            .await?;
        world.page.wait(3_000).await?;
        debug!("Now on {}", world.page.url().await?);
        Ok(())
    }
    .boxed()
}

fn back_on_shop(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page).to_have_url(UrlMatch::pattern("shop")).await?;
        expect(&world.products.product_grid).to_be_visible().await
    }
    .boxed()
}

fn items_preserved(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.cart.navigate_to_cart().await?;
        ensure(!world.cart.is_cart_empty().await, "cart lost its items")
    }
    .boxed()
}

fn click_button(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let text = args.string(0)?;
        let button = world
            .page
            .locator("a, button")
            .filter_text(text)
            .first();
        button.click().await?;
        let timeout = world.config.timeouts.long;
        if text.to_lowercase().contains("checkout") {
            world
                .page
                .wait_for_url(UrlPattern::Glob("**/checkout/**".to_string()), timeout)
                .await?;
        }
        world
            .page
            .wait_for_load_state(LoadState::DomContentLoaded, timeout)
            .await
    }
    .boxed()
}

fn proceed_to_checkout(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.proceed_to_checkout().await }.boxed()
}

fn on_checkout(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page)
            .to_have_url(UrlMatch::pattern("checkout"))
            .await
    }
    .boxed()
}

fn order_review(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.cart.order_review_section).to_be_visible().await }.boxed()
}

fn billing_form(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.cart.billing_form).to_be_visible().await }.boxed()
}

fn order_items(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.cart.order_items.first()).to_be_visible().await }.boxed()
}

fn order_totals(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let section = &world.cart.order_total_section;
        expect(section).to_be_visible().await?;
        expect(section).to_contain_text("Total").await
    }
    .boxed()
}

fn order_total_nonzero(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let total = world
            .page
            .locator(".order-total .amount, .checkout-total")
            .last()
            .text_content()
            .await?
            .unwrap_or_default();
        let total = total.trim();
        ensure(!total.is_empty(), "checkout shows no order total")?;
        ensure(total != ZERO_TOTAL, "checkout total is $0.00")
    }
    .boxed()
}

fn fill_billing_table(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let billing = BillingData::from_table(args.table()?);
        world.cart.fill_billing_information(&billing).await
    }
    .boxed()
}

fn fill_sample_billing(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.fill_billing_information(&BillingData::sample()).await }.boxed()
}

fn billing_accepted(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let first_name = world.cart.billing_first_name.input_value().await?;
        let email = world.cart.billing_email.input_value().await?;
        ensure(!first_name.is_empty(), "billing first name is empty")?;
        ensure(!email.is_empty(), "billing email is empty")
    }
    .boxed()
}

fn submit_empty_checkout(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.submit_empty_checkout_form().await }.boxed()
}

fn validation_errors_shown(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let messages = world.cart.validation_error_messages().await?;
        ensure(!messages.is_empty(), "checkout showed no validation errors")
    }
    .boxed()
}

fn still_on_checkout(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let url = world.page.url().await?;
        ensure(
            url.contains("checkout"),
            format!("left checkout with an incomplete form: {}", url),
        )
    }
    .boxed()
}

/// Fill the coupon field and remember the total it should not disturb
fn enter_coupon(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.state.cart_total_before = Some(world.cart.cart_total().await);
        world.cart.coupon_input.fill(args.string(0)?).await
    }
    .boxed()
}

fn apply_coupon(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.submit_coupon().await }.boxed()
}

fn remove_coupon(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.cart.remove_coupon().await }.boxed()
}

/// A success notice, or failing that a discount line in the totals
fn discount_applied(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        if visible_within(&world.cart.coupon_success, 5_000).await {
            return Ok(());
        }
        let totals = world
            .cart
            .cart_totals_section
            .text_content()
            .await?
            .unwrap_or_default();
        ensure(
            TextMatch::regex_i("discount|coupon|save").matches(&totals)?,
            "no coupon notice and no discount in the cart totals",
        )
    }
    .boxed()
}

fn discount_line(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.cart.applied_coupons.first()).to_be_visible().await }.boxed()
}

fn total_present(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let total = world.cart.cart_total().await;
        ensure(!total.is_empty(), "cart shows no total")
    }
    .boxed()
}

/// Text-based match first, then any visible notice mentioning the failure
fn invalid_coupon_error(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let pattern = TextMatch::regex_i(COUPON_ERROR_PATTERN);
        let message = world
            .page
            .locator(r#":text("does not exist"), :text("invalid"), :text("not found"), :text("expired")"#)
            .first();
        if visible_within(&message, 5_000).await {
            let text = message.text_content().await?.unwrap_or_default();
            debug!("Coupon error: {}", text.trim());
            if pattern.matches(&text)? {
                return Ok(());
            }
        }

        for notice in world.page.locator(NOTICE_SELECTORS).all().await? {
            if !notice.is_visible().await.unwrap_or(false) {
                continue;
            }
            let Ok(Some(text)) = notice.text_content().await else {
                continue;
            };
            if pattern.matches(&text)? {
                debug!("Coupon error notice: {}", text.trim());
                return Ok(());
            }
        }
        Err(E2eError::assertion("No error message found for invalid coupon"))
    }
    .boxed()
}

fn total_unchanged(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let total = world.cart.cart_total().await;
        ensure(!total.is_empty(), "cart shows no total")?;
        if let Some(before) = &world.state.cart_total_before {
            ensure(
                *before == total,
                format!("cart total changed from {} to {}", before, total),
            )?;
        }
        Ok(())
    }
    .boxed()
}

fn discount_removed(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let count = world.cart.applied_coupons.count().await?;
        ensure_eq(count, 0, "applied coupons")
    }
    .boxed()
}

fn total_nonzero(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let total = world.cart.cart_total().await;
        ensure(total != ZERO_TOTAL, "cart total is $0.00")
    }
    .boxed()
}

fn items_present(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let count = world.cart.cart_item_count().await?;
        ensure(count > 0, "cart has no items")?;
        let stock = world.cart.stock_messages.count().await?;
        debug!("{} stock notices for {} items", stock, count);
        Ok(())
    }
    .boxed()
}

fn out_of_stock_warning(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let warnings = &world.cart.out_of_stock_messages;
        if warnings.count().await.unwrap_or(0) > 0 {
            expect(&warnings.first()).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn out_of_stock_marked(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let warnings = &world.cart.out_of_stock_messages;
        if warnings.count().await? == 0 {
            return Ok(());
        }
        let text = warnings.first().text_content().await?.unwrap_or_default();
        ensure(
            TextMatch::regex_i("out of stock|unavailable").matches(&text)?,
            format!("stock notice '{}' does not say the item is unavailable", text.trim()),
        )
    }
    .boxed()
}

fn payment_methods(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        ensure(
            world.cart.payment_methods_visible().await,
            "no payment methods shown",
        )
    }
    .boxed()
}

fn payment_options(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let count = world.cart.payment_options.count().await?;
        ensure(count > 0, "no payment options to choose from")
    }
    .boxed()
}

/// Every option is shown and its radio can be selected
fn payment_options_usable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let options = &world.cart.payment_options;
        for i in 0..options.count().await? {
            let option = options.nth(i);
            expect(&option).to_be_visible().await?;
            let radio = option.locator(r#"input[type="radio"]"#).first();
            if radio.is_visible().await.unwrap_or(false) {
                expect(&radio).to_be_enabled().await?;
            }
        }
        Ok(())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("$0.00", "$0.00", false, true ; "zero total")]
    #[test_case("$0.00", "", true, true ; "empty cart")]
    #[test_case("$0.00", "$89.00", false, false ; "items present")]
    #[test_case("$89.00", "Total $89.00", false, true ; "contains amount")]
    #[test_case("$89.00", "$98.00", false, false ; "different amount")]
    fn test_total_matches(expected: &str, actual: &str, empty: bool, matches: bool) {
        assert_eq!(total_matches(expected, actual, empty), matches);
    }
}
