//! Gallery page steps

use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::{StepArgs, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, expect, expect_page};
use crate::locator::{Locator, TextMatch};
use crate::monitor::{describe_console, describe_requests};
use crate::pages::ImageLoadReport;
use crate::playwright::{LoadState, Viewport};
use crate::world::World;

const MAGNIFIC_POPUP: &str = ".mfp-container, .mfp-wrap";
const GENERIC_LIGHTBOX: &str = r#".lightbox, .modal, [role="dialog"]"#;
const POPUP_NEXT: &str = ".mfp-arrow-right, .mfp-next";
const POPUP_PREV: &str = ".mfp-arrow-left, .mfp-prev";

/// Share of gallery images that must carry alt text
const MIN_ALT_PERCENTAGE: f64 = 70.0;
/// Share of images loaded right after the page settles
const MIN_INITIAL_LOAD_PERCENTAGE: f64 = 50.0;
/// Share of images loaded once the gallery was scrolled through
const MIN_EVENTUAL_LOAD_PERCENTAGE: f64 = 85.0;

const MOBILE: Viewport = Viewport { width: 375, height: 667 };
const TABLET: Viewport = Viewport { width: 768, height: 1024 };
const DESKTOP: Viewport = Viewport { width: 1920, height: 1080 };

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I navigate to the Pinecrest Home Goods gallery page", open_gallery);
    r.given("I am on the Pinecrest Home Goods gallery page", on_gallery_page);
    r.when("I navigate to the Gallery page", navigate_to_gallery);
    r.when("the gallery page loads completely", gallery_settles);
    r.when("the gallery loads", gallery_loads);

    r.then("I should see the correct page title containing {string}", title_containing);
    r.then("I should see the gallery header", gallery_header);
    r.then("I should see the image gallery container", gallery_container);

    r.then("I should see multiple gallery images", multiple_images);
    r.then("all images should be properly loaded", images_loaded);
    r.then("each image should have appropriate alt text for accessibility", images_have_alt);
    r.then("all gallery images should have alt text", images_have_alt);

    r.when("I click on the first gallery image", click_first_image);
    r.when("the enlarged view opens", enlarged_view_opens);
    r.then("the image should be viewable in a larger format", enlarged_view);
    r.then("I should be able to close the enlarged view", close_enlarged_view);
    r.then("I should be able to return to the gallery view", close_enlarged_view);
    r.then("I should be able to navigate between images", navigate_between_images);

    r.when("I view the gallery on mobile size", view_on_mobile);
    r.when("I view the gallery on tablet size", view_on_tablet);
    r.when("I view the gallery on desktop size", view_on_desktop);
    r.then("the gallery should display properly", displays_properly);

    r.then("the gallery should be keyboard navigable", keyboard_navigable);
    r.then("the gallery should work with screen readers", screen_reader_friendly);

    r.when("I measure gallery load performance", measure_load);
    r.then("all images should load within acceptable time limits", load_time_acceptable);
    r.then("there should be no failed image requests", no_failed_image_requests);
    r.then("the page should be responsive during image loading", responsive_while_loading);
    r.then("the page performance should remain smooth", performance_smooth);

    r.then("I should see examples of different window treatment types", treatment_examples);
    r.then("the images should represent quality workmanship", quality_images);
    r.then("the gallery should provide visual inspiration", visual_inspiration);

    r.when("I scroll through the gallery", scroll_gallery);
    r.then("images should load progressively as they come into view", images_present);
    r.then("all images should eventually be loaded", images_eventually_loaded);

    r.then("any missing images should not break the layout", layout_intact);
    r.then("error states should be handled gracefully", no_critical_console_errors);
    r.then("the gallery should remain functional", remains_functional);
}

fn open_gallery(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.gallery.navigate_to_gallery().await
    }
    .boxed()
}

fn on_gallery_page(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.gallery.navigate_to_gallery().await?;
        world.gallery.verify_gallery_page_loaded().await
    }
    .boxed()
}

/// Through the site navigation when possible, directly otherwise
fn navigate_to_gallery(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        if let Err(e) = world.home.navigate_to_page("gallery").await {
            debug!("Gallery navigation link failed ({}), loading it directly", e);
            world.gallery.navigate_to_gallery().await?;
        }
        world.gallery.wait_for_gallery_load().await?;
        world.gallery.verify_page_title().await
    }
    .boxed()
}

fn gallery_settles(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.gallery.wait_for_gallery_load().await }.boxed()
}

fn gallery_loads(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world
            .page
            .wait_for_load_state(LoadState::NetworkIdle, world.config.timeouts.network_idle)
            .await?;
        world.gallery.scroll_to_load_all_images().await
    }
    .boxed()
}

fn title_containing(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page)
            .to_have_title(TextMatch::regex_i(args.string(0)?))
            .await
    }
    .boxed()
}

fn gallery_header(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.gallery.page_header).to_be_visible().await }.boxed()
}

fn gallery_container(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.gallery.gallery_container).to_be_visible().await }.boxed()
}

fn multiple_images(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        let count = world.gallery.gallery_specific_image_count().await?;
        ensure(count >= 2, format!("gallery shows {} images, expected at least 2", count))
    }
    .boxed()
}

fn check_load_report(report: &ImageLoadReport, min_percentage: f64) -> E2eResult<()> {
    ensure(report.total > 0, "gallery has no images")?;
    ensure(report.loaded > 0, "no gallery image finished loading")?;
    ensure(
        report.load_percentage() >= min_percentage,
        format!(
            "only {}/{} gallery images loaded ({:.0}%, need {:.0}%); not loaded: {}",
            report.loaded,
            report.total,
            report.load_percentage(),
            min_percentage,
            report.failed.join(", ")
        ),
    )
}

fn images_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let report = world.gallery.verify_images_loaded().await?;
        check_load_report(&report, MIN_INITIAL_LOAD_PERCENTAGE)
    }
    .boxed()
}

fn alt_percentage(alts: &[String]) -> f64 {
    if alts.is_empty() {
        return 0.0;
    }
    let described = alts.iter().filter(|alt| !alt.trim().is_empty()).count();
    described as f64 / alts.len() as f64 * 100.0
}

fn images_have_alt(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let alts = world.gallery.image_alt_texts().await?;
        let percentage = alt_percentage(&alts);
        ensure(
            percentage >= MIN_ALT_PERCENTAGE,
            format!(
                "{:.0}% of {} gallery images have alt text, need {:.0}%",
                percentage,
                alts.len(),
                MIN_ALT_PERCENTAGE
            ),
        )
    }
    .boxed()
}

/// Falls back to checking the first image is at least visible
fn click_first_image(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        if let Err(e) = world.gallery.click_first_image().await {
            debug!("Opening the first gallery image failed: {}", e);
            let images = &world.gallery.content_images;
            if images.count().await? == 0 {
                return Err(E2eError::assertion("No gallery images found to interact with"));
            }
            expect(&images.first()).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn enlarged_view_opens(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.page.wait(1_000).await }.boxed()
}

/// Magnific Popup, any other lightbox, or an image opened in place
fn enlarged_view(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.wait(2_000).await?;
        for selector in [MAGNIFIC_POPUP, GENERIC_LIGHTBOX] {
            let lightbox = world.page.locator(selector);
            if lightbox.count().await? > 0 {
                return expect(&lightbox.first()).to_be_visible().await;
            }
        }
        debug!("No lightbox opened; checking the gallery is still intact");
        expect(&world.gallery.gallery_container).to_be_visible().await
    }
    .boxed()
}

fn close_enlarged_view(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.wait(1_000).await?;
        if let Err(e) = world.gallery.close_lightbox().await {
            debug!("No lightbox to close: {}", e);
        }
        world.page.wait(1_000).await?;
        world.gallery.verify_lightbox_closed().await
    }
    .boxed()
}

/// Click `arrow` when it is showing, pressing `key` if the click fails
async fn step_with(world: &World, arrow: &Locator, key: &str) -> E2eResult<bool> {
    if arrow.count().await? == 0 || !arrow.first().is_visible().await.unwrap_or(false) {
        return Ok(false);
    }
    match arrow.first().click_within(5_000).await {
        Ok(()) => world.page.wait(1_000).await?,
        Err(e) => {
            debug!("Lightbox arrow click failed ({}), pressing {}", e, key);
            world.page.keyboard_press(key).await?;
            world.page.wait(500).await?;
        }
    }
    Ok(true)
}

fn navigate_between_images(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let world = &*world;
        world.page.wait(1_000).await?;

        let next = world.page.locator(POPUP_NEXT);
        let prev = world.page.locator(POPUP_PREV);
        if step_with(world, &next, "ArrowRight").await? || step_with(world, &prev, "ArrowLeft").await? {
            return Ok(());
        }
        if let Err(e) = world.page.keyboard_press("ArrowRight").await {
            debug!("Keyboard navigation unavailable: {}", e);
            return Ok(());
        }
        world.page.wait(1_000).await
    }
    .boxed()
}

fn view_on_mobile(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.gallery.verify_responsive_layout(MOBILE).await }.boxed()
}

fn view_on_tablet(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.gallery.verify_responsive_layout(TABLET).await }.boxed()
}

fn view_on_desktop(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.gallery.verify_responsive_layout(DESKTOP).await }.boxed()
}

fn displays_properly(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let container = &world.gallery.gallery_container;
        expect(container).to_be_visible().await?;
        let bbox = container
            .bounding_box()
            .await?
            .ok_or_else(|| E2eError::assertion("gallery container has no bounding box"))?;
        ensure(
            bbox.width > 200.0 && bbox.height > 200.0,
            format!("gallery container is only {}x{}", bbox.width, bbox.height),
        )
    }
    .boxed()
}

/// Tab and arrow presses must not raise
fn keyboard_navigable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.keyboard_press("Tab").await?;
        world.page.wait(200).await?;
        world.page.keyboard_press("ArrowDown").await?;
        world.page.wait(200).await
    }
    .boxed()
}

fn screen_reader_friendly(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.gallery.gallery_container).to_be_visible().await?;
        expect(&world.gallery.gallery_images.first()).to_be_visible().await
    }
    .boxed()
}

fn measure_load(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let started = Instant::now();
        world
            .page
            .wait_for_load_state(LoadState::NetworkIdle, world.config.timeouts.network_idle)
            .await?;
        world.gallery.scroll_to_load_all_images().await?;
        let elapsed = started.elapsed();
        info!("Gallery loaded in {:?}", elapsed);
        world.state.gallery_load_time = Some(elapsed);
        Ok(())
    }
    .boxed()
}

fn load_time_acceptable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let elapsed = world
            .state
            .gallery_load_time
            .ok_or_else(|| E2eError::assertion("gallery load time was never measured"))?;
        let limit = world.config.timeouts.long * 2;
        ensure(
            elapsed.as_millis() < u128::from(limit),
            format!("gallery took {}ms to load, limit {}ms", elapsed.as_millis(), limit),
        )
    }
    .boxed()
}

fn no_failed_image_requests(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let failures = world.monitor.critical_failures();
        ensure(
            failures.is_empty(),
            format!("Failed requests:\n{}", describe_requests(&failures)),
        )
    }
    .boxed()
}

fn responsive_while_loading(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.mouse_move(100.0, 100.0).await?;
        world.page.wait(100).await?;
        expect(&world.gallery.gallery_container).to_be_visible().await
    }
    .boxed()
}

fn performance_smooth(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.mouse_move(200.0, 200.0).await?;
        expect(&world.gallery.gallery_container).to_be_visible().await
    }
    .boxed()
}

fn treatment_examples(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        let count = world.gallery.image_count().await?;
        ensure(count >= 6, format!("gallery shows {} images, expected at least 6", count))?;
        if let Err(e) = world.gallery.take_screenshot("gallery-content").await {
            warn!("Gallery screenshot failed: {}", e);
        }
        Ok(())
    }
    .boxed()
}

fn quality_images(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let report = world.gallery.verify_images_loaded().await?;
        ensure(report.total > 0, "gallery has no images")?;
        ensure(report.loaded > 0, "no gallery image finished loading")
    }
    .boxed()
}

fn visual_inspiration(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        let count = world.gallery.image_count().await?;
        ensure(count >= 4, format!("gallery shows {} images, expected at least 4", count))?;
        expect(&world.gallery.gallery_container).to_be_visible().await
    }
    .boxed()
}

fn scroll_gallery(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        world.gallery.scroll_to_load_all_images().await
    }
    .boxed()
}

fn images_present(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        let count = world.gallery.image_count().await?;
        ensure(count > 0, "no gallery images after scrolling")
    }
    .boxed()
}

fn images_eventually_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let report = world.gallery.verify_images_loaded().await?;
        check_load_report(&report, MIN_EVENTUAL_LOAD_PERCENTAGE)
    }
    .boxed()
}

fn layout_intact(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        expect(&world.gallery.gallery_container).to_be_visible().await?;
        let error = &world.gallery.error_message;
        if error.count().await? > 0 {
            ensure(
                !error.is_visible().await?,
                "gallery shows an error message",
            )?;
        }
        Ok(())
    }
    .boxed()
}

fn no_critical_console_errors(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let errors = world.monitor.critical_console_errors();
        ensure(
            errors.is_empty(),
            format!("Console errors:\n{}", describe_console(&errors)),
        )
    }
    .boxed()
}

/// Container and images are there, and the first image reacts to hover
fn remains_functional(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.gallery.ensure_on_gallery_page().await?;
        expect(&world.gallery.gallery_container).to_be_visible().await?;
        let count = world.gallery.image_count().await?;
        ensure(count > 0, "gallery has no images")?;

        let content = &world.gallery.content_images;
        let target = if content.count().await? > 0 {
            content.first()
        } else {
            world.gallery.gallery_images.first()
        };
        if let Err(e) = target.hover_within(5_000).await {
            debug!("Hovering the first gallery image failed: {}", e);
        }
        Ok(())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn alts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test_case(&[], 0.0 ; "no images")]
    #[test_case(&["Zebra shades", "Roller blinds", "", "Cream shades"], 75.0 ; "one missing")]
    #[test_case(&["  ", ""], 0.0 ; "blank alts")]
    fn test_alt_percentage(values: &[&str], expected: f64) {
        assert!((alt_percentage(&alts(values)) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_report_thresholds() {
        let report = ImageLoadReport {
            loaded: 6,
            total: 8,
            failed: vec!["a.jpg".into(), "b.jpg".into()],
        };
        assert!(check_load_report(&report, MIN_INITIAL_LOAD_PERCENTAGE).is_ok());
        assert!(check_load_report(&report, MIN_EVENTUAL_LOAD_PERCENTAGE).is_err());
        assert!(check_load_report(&ImageLoadReport::default(), 0.0).is_err());
    }
}
