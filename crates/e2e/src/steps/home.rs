//! Homepage steps

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

use super::common::{images_missing_alt, missing_alt_error, unfocusable};
use super::{StepArgs, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::expect::{
    assert_element_enabled, assert_element_text, assert_page_title, assert_url, assert_visible, ensure,
    wait_for_element_stable, SoftAssertions, UrlMatch,
};
use crate::monitor::{describe_console, describe_requests};
use crate::playwright::LoadState;
use crate::world::World;

/// Pages reached from the main navigation and the URL each must land on
const NAVIGATION_TARGETS: [(&str, &str); 5] = [
    ("about", r".*/about.*"),
    ("products", r".*/shop.*"),
    ("installations", r".*/installations.*"),
    ("gallery", r".*/gallery.*"),
    ("contact", r".*/contact.*"),
];

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I navigate to the Pinecrest Home Goods homepage", navigate_home);
    r.given("I am on the Pinecrest Home Goods homepage", on_homepage);
    r.when("the page loads completely", page_loads);
    r.then("I should see the correct page title {string}", correct_title);

    r.then("I should see all header elements", header_elements);
    r.then("I should see the main navigation menu", main_navigation);
    r.when("I click on each main navigation link", click_each_nav_link);
    r.then("each page should load successfully", each_page_loaded);
    r.then("I should be able to return to the homepage", return_home);

    r.then("I should see the hero section with {string}", hero_section);
    r.then("I should see the welcome section with trust indicators", welcome_section);
    r.then("I should see product information about Zebra Shades", product_information);
    r.then("I should see customer photos section", customer_photos);
    r.then("I should see why choose Pinecrest section", why_choose);
    r.then("I should see testimonials section", testimonials);

    r.when("I scroll to the testimonials section", scroll_to_testimonials);
    r.then("I should see multiple customer testimonials", multiple_testimonials);
    r.then("each testimonial should have customer name and date", testimonial_details);
    r.then("testimonials should be navigable", testimonials_navigable);

    r.then("I should see footer elements", footer_elements);
    r.when("I scroll to the footer", scroll_to_footer);
    r.then("I should see the Pinecrest logo", footer_logo);
    r.then("I should see social media links for Facebook and Instagram", social_links);
    r.then("all footer links should be functional", footer_links_functional);

    r.when("I click the main {string} button", click_main_button);
    r.then("I should be redirected to the products page", redirected_to_products);
    r.then("the products page should load correctly", products_page_loaded);

    r.then("I should see {string} trust indicator", trust_indicator);
    r.then("I should see {string} product feature", product_feature);
    r.then("I should see size information {string}", size_information);

    r.then("all images should have alt text", images_have_alt);
    r.then("all links should be keyboard accessible", links_keyboard_accessible);
    r.then("all interactive elements should be focusable", interactive_focusable);

    r.when("I measure page load performance", measure_performance);
    r.then("the page should load within acceptable time limits", load_time_ok);
    r.then("all critical resources should load successfully", critical_resources_loaded);
    r.then("there should be no JavaScript errors in the browser console", no_javascript_errors);
}

fn navigate_home(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.home.navigate_to_home().await
    }
    .boxed()
}

fn on_homepage(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.home.navigate_to_home().await?;
        world.home.verify_page_title().await
    }
    .boxed()
}

fn page_loads(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.home.wait_for_page_load().await }.boxed()
}

fn correct_title(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { assert_page_title(&world.page, args.string(0)?).await }.boxed()
}

fn header_elements(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let mut soft = SoftAssertions::new();
        soft.check("Logo visibility check", assert_visible(&home.logo, "Logo")).await;
        soft.check(
            "Support banner visibility check",
            assert_visible(&home.support_banner, "Support Banner"),
        )
        .await;
        soft.check(
            "My Account link visibility check",
            assert_visible(&home.my_account_link, "My Account Link"),
        )
        .await;
        soft.check("Cart link visibility check", assert_visible(&home.cart_link, "Cart Link"))
            .await;
        soft.validate("Header elements verification")
    }
    .boxed()
}

fn main_navigation(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let links = [
            (&home.home_nav_link, "Home Navigation"),
            (&home.about_nav_link, "About Navigation"),
            (&home.products_nav_link, "Products Navigation"),
            (&home.installations_nav_link, "Installations Navigation"),
            (&home.gallery_nav_link, "Gallery Navigation"),
            (&home.contact_nav_link, "Contact Navigation"),
        ];
        let mut soft = SoftAssertions::new();
        for (link, name) in links {
            soft.check(format!("{} visibility check", name), assert_visible(link, name))
                .await;
            soft.check(format!("{} enabled check", name), assert_element_enabled(link, name))
                .await;
        }
        soft.validate("Main navigation verification")
    }
    .boxed()
}

fn click_each_nav_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        for (page, url_pattern) in NAVIGATION_TARGETS {
            let visit = async {
                world.home.navigate_to_page(page).await?;
                world
                    .page
                    .wait_for_load_state(LoadState::NetworkIdle, world.config.timeouts.long)
                    .await?;
                assert_url(&world.page, UrlMatch::pattern(url_pattern), &format!("{} page URL", page))
                    .await?;
                world.home.navigate_to_home().await?;
                world.home.verify_page_title().await
            };
            visit.await.map_err(|e| {
                E2eError::assertion(format!("Failed to navigate to {} page: {}", page, e))
            })?;
        }
        Ok(())
    }
    .boxed()
}

fn each_page_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { assert_page_title(&world.page, world.config.titles.home.as_str()).await }.boxed()
}

fn return_home(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.home.navigate_to_home().await?;
        assert_page_title(&world.page, world.config.titles.home.as_str()).await?;
        assert_visible(&world.home.hero_section, "Hero Section").await
    }
    .boxed()
}

fn hero_section(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        assert_visible(&home.hero_section, "Hero Section").await?;
        assert_visible(&home.hero_heading, "Hero Heading").await?;
        assert_element_text(&home.hero_section, args.string(0)?, "Hero Section").await?;
        assert_visible(&home.main_shop_now_button, "Main Shop Now Button").await?;
        assert_element_enabled(&home.main_shop_now_button, "Main Shop Now Button").await
    }
    .boxed()
}

fn welcome_section(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let items = [
            (&home.welcome_section, "Welcome Section"),
            (&home.buy_risk_free_section, "Buy Risk-Free Section"),
            (&home.free_shipping_section, "Free Shipping Section"),
            (&home.satisfaction_section, "100% Satisfaction Section"),
        ];
        let mut soft = SoftAssertions::new();
        for (locator, name) in items {
            soft.check(format!("{} visibility check", name), assert_visible(locator, name))
                .await;
        }
        soft.validate("Welcome section trust indicators verification")
    }
    .boxed()
}

fn product_information(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let items = [
            (&home.zebra_shades_heading, "Zebra Shades Heading"),
            (&home.premium_polyester_section, "Premium Polyester Section"),
            (&home.dual_layer_section, "Dual Layer Section"),
            (&home.custom_size_section, "Custom Size Section"),
            (&home.product_description_text, "Product Description"),
        ];
        let mut soft = SoftAssertions::new();
        for (locator, name) in items {
            soft.check(format!("{} visibility check", name), assert_visible(locator, name))
                .await;
        }
        soft.validate("Product information verification")
    }
    .boxed()
}

fn customer_photos(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        assert_visible(&home.customer_photos_heading, "Customer Photos Heading").await?;
        assert_visible(&home.installation_photo_text, "Installation Photo Text").await?;
        let photos = home.customer_photos_grid.count().await?;
        ensure(photos > 0, "expected at least one customer photo")
    }
    .boxed()
}

fn why_choose(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let items = [
            (&home.why_choose_section, "Why Choose Section"),
            (&home.quality_manufactured_section, "Quality Manufactured Section"),
            (&home.best_prices_section, "Best Prices Section"),
            (&home.satisfaction_guarantee_section, "Satisfaction Guarantee Section"),
            (&home.custom_areas_section, "Custom Areas Section"),
        ];
        let mut soft = SoftAssertions::new();
        for (locator, name) in items {
            soft.check(format!("{} visibility check", name), assert_visible(locator, name))
                .await;
        }
        soft.validate("Why choose Pinecrest section verification")
    }
    .boxed()
}

fn testimonials(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        assert_visible(&world.home.testimonials_section, "Testimonials Section").await?;
        let count = world.home.testimonial_cards.count().await?;
        ensure(count > 0, "expected at least one testimonial")
    }
    .boxed()
}

fn scroll_to_testimonials(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let section = &world.home.testimonials_section;
        wait_for_element_stable(section, world.config.timeouts.short).await?;
        section.scroll_into_view().await?;
        world.page.wait(1_000).await
    }
    .boxed()
}

fn multiple_testimonials(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let count = world.home.testimonial_cards.count().await?;
        ensure(count > 0, "expected customer testimonials")?;
        world.home.take_screenshot("testimonials-section").await?;
        Ok(())
    }
    .boxed()
}

fn testimonial_details(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        if world.home.testimonial_cards.count().await? > 0 {
            assert_visible(&world.home.testimonials_section, "Testimonials Section").await?;
        }
        Ok(())
    }
    .boxed()
}

fn testimonials_navigable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        // Carousel arrows are optional
        let navigation = &world.home.testimonial_navigation;
        if navigation.count().await? > 0 {
            assert_visible(navigation, "Testimonial Navigation").await?;
        }
        Ok(())
    }
    .boxed()
}

fn footer_elements(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let items = [
            (&home.footer_logo, "Footer Logo"),
            (&home.facebook_link, "Facebook Link"),
            (&home.instagram_link, "Instagram Link"),
        ];
        let mut soft = SoftAssertions::new();
        for (locator, name) in items {
            soft.check(format!("{} visibility check", name), assert_visible(locator, name))
                .await;
        }
        soft.validate("Footer elements verification")
    }
    .boxed()
}

fn scroll_to_footer(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let logo = &world.home.footer_logo;
        wait_for_element_stable(logo, world.config.timeouts.short).await?;
        logo.scroll_into_view().await?;
        world.page.wait(500).await
    }
    .boxed()
}

fn footer_logo(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { assert_visible(&world.home.footer_logo, "Footer Pinecrest Logo").await }.boxed()
}

fn social_links(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        for (link, name) in [(&home.facebook_link, "Facebook Link"), (&home.instagram_link, "Instagram Link")] {
            assert_visible(link, name).await?;
            assert_element_enabled(link, name).await?;
        }
        Ok(())
    }
    .boxed()
}

fn footer_links_functional(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let mut soft = SoftAssertions::new();
        soft.check(
            "Footer Facebook link functionality",
            assert_element_enabled(&home.facebook_link, "Footer Facebook link"),
        )
        .await;
        soft.check(
            "Footer Instagram link functionality",
            assert_element_enabled(&home.instagram_link, "Footer Instagram link"),
        )
        .await;
        soft.validate("Footer links functionality verification")
    }
    .boxed()
}

fn click_main_button(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let label = args.string(0)?;
        if label != "SHOP NOW" {
            return Err(E2eError::step(
                args.text.clone(),
                format!("Button \"{}\" is not implemented in this step definition", label),
            ));
        }
        let button = &world.home.main_shop_now_button;
        assert_visible(button, "Main Shop Now Button").await?;
        assert_element_enabled(button, "Main Shop Now Button").await?;
        world.home.click_main_shop_now().await
    }
    .boxed()
}

fn redirected_to_products(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world
            .page
            .wait_for_load_state(LoadState::NetworkIdle, world.config.timeouts.long)
            .await?;
        assert_url(&world.page, UrlMatch::pattern(r".*/shop.*"), "Products page URL").await
    }
    .boxed()
}

fn products_page_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world
            .page
            .wait_for_load_state(LoadState::NetworkIdle, world.config.timeouts.long)
            .await?;
        let url = world.page.url().await?;
        ensure(
            url.contains("shop") || url.contains("products"),
            format!("expected a shop or products URL, got {}", url),
        )?;
        world.home.take_screenshot("products-page-loaded").await?;
        Ok(())
    }
    .boxed()
}

fn trust_indicator(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let indicator = args.string(0)?;
        let (locator, name) = match indicator {
            "Buy Risk-Free" => (&home.buy_risk_free_section, "Buy Risk-Free Trust Indicator"),
            "Free Shipping" => (&home.free_shipping_section, "Free Shipping Trust Indicator"),
            "100% Satisfaction" => (&home.satisfaction_section, "100% Satisfaction Trust Indicator"),
            other => {
                return Err(E2eError::InvalidStepArgument(format!(
                    "Trust indicator '{}' is not recognized. Available options: \
                     'Buy Risk-Free', 'Free Shipping', '100% Satisfaction'",
                    other
                )))
            }
        };
        assert_visible(locator, name).await
    }
    .boxed()
}

fn product_feature(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let (locator, name) = match args.string(0)? {
            "100% Premium Polyester" => (&home.premium_polyester_section, "100% Premium Polyester Feature"),
            "Dual-Layer Design" => (&home.dual_layer_section, "Dual-Layer Design Feature"),
            "Custom Size Availability" => (&home.custom_size_section, "Custom Size Availability Feature"),
            other => {
                return Err(E2eError::InvalidStepArgument(format!(
                    "Product feature '{}' is not recognized. Available options: \
                     '100% Premium Polyester', 'Dual-Layer Design', 'Custom Size Availability'",
                    other
                )))
            }
        };
        assert_visible(locator, name).await
    }
    .boxed()
}

fn size_information(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let home = &world.home;
        let specs = &world.config.product_specs;
        let size = args.string(0)?;
        let width_range = format!("{}-{}", specs.min_width, specs.max_width);
        if size.contains(&width_range) {
            assert_visible(&home.width_info, "Width Information").await?;
            let actual = home.width_info.text_content().await?.unwrap_or_default();
            ensure(
                actual.contains(&specs.min_width.to_string()) && actual.contains(&specs.max_width.to_string()),
                format!("Width information doesn't contain expected range. Actual: \"{}\"", actual),
            )
        } else if size.contains(&format!("Max Height {}", specs.max_height)) {
            assert_visible(&home.height_info, "Height Information").await?;
            assert_element_text(&home.height_info, &specs.max_height.to_string(), "Height Information").await
        } else {
            Err(E2eError::InvalidStepArgument(format!(
                "Size information '{}' is not recognized. Available options include width ({}) \
                 and height ({} inches) information.",
                size, width_range, specs.max_height
            )))
        }
    }
    .boxed()
}

fn images_have_alt(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let missing = images_missing_alt(&world.page, &[]).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing_alt_error(&missing))
        }
    }
    .boxed()
}

fn links_keyboard_accessible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let failures = unfocusable(&world.page, "a[href]", 15).await?;
        ensure(
            failures.is_empty(),
            format!(
                "Accessibility violation - Links not keyboard accessible:\n{}",
                failures.join("\n")
            ),
        )
    }
    .boxed()
}

fn interactive_focusable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let failures = unfocusable(
            &world.page,
            "button, a, input, select, textarea, [tabindex]:not([tabindex='-1'])",
            20,
        )
        .await?;
        ensure(
            failures.is_empty(),
            format!(
                "Accessibility violation - Interactive elements not focusable:\n{}",
                failures.join("\n")
            ),
        )
    }
    .boxed()
}

fn measure_performance(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let metrics = world.home.performance_metrics().await.unwrap_or_default();
        info!(
            "Load {:.0}ms, DOMContentLoaded {:.0}ms, response {:.0}ms",
            metrics.load_time, metrics.dom_content_loaded, metrics.response_time
        );
        world.state.performance = Some(metrics);
        Ok(())
    }
    .boxed()
}

fn load_time_ok(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let metrics = world.state.performance.ok_or_else(|| {
            E2eError::assertion(
                "Performance metrics were not captured. Ensure 'I measure page load performance' step was executed.",
            )
        })?;
        let max = world.config.timeouts.long as f64;
        ensure(
            metrics.load_time < max,
            format!("load took {:.0}ms, limit {:.0}ms", metrics.load_time, max),
        )?;
        if metrics.dom_content_loaded > 0.0 {
            ensure(
                metrics.dom_content_loaded < max / 2.0,
                format!(
                    "DOMContentLoaded took {:.0}ms, limit {:.0}ms",
                    metrics.dom_content_loaded,
                    max / 2.0
                ),
            )?;
        }
        Ok(())
    }
    .boxed()
}

fn critical_resources_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let failures = world.monitor.critical_failures();
        ensure(
            failures.is_empty(),
            format!("Critical resource failures:\n{}", describe_requests(&failures)),
        )
    }
    .boxed()
}

fn no_javascript_errors(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let errors = world.monitor.critical_console_errors();
        ensure(
            errors.is_empty(),
            format!("Critical JavaScript errors found:\n{}", describe_console(&errors)),
        )
    }
    .boxed()
}
