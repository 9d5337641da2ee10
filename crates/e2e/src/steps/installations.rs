//! Installation guide steps

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::common::{check_heading_structure, headings};
use super::{StepArgs, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, ensure_eq, expect, expect_page, UrlMatch};
use crate::locator::TextMatch;
use crate::monitor::describe_requests;
use crate::playwright::{LoadState, Viewport};
use crate::world::World;

/// Routes aborted to simulate the guide being unreachable
const INSTALLATIONS_ROUTE: &str = "**/installations**";

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";
const SECTION_HEADINGS: &str = "h1, h2, h3";
const CLICKABLE: &str = r#"button, a, [role="button"]"#;

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I am on the Pinecrest Home Goods website", on_site);
    r.given("I am on the homepage", on_site);
    r.given("I am on the installations page", on_installations_page);
    r.given("I am trying to access the installations page", start_monitoring);

    r.when("I navigate to the installations page", navigate_to_installations);
    r.when("I click on the installations navigation link", click_installations_link);
    r.when("I scroll to the tools section", scroll_to_tools);
    r.when("I view the installation sections", view_sections);
    r.when("I locate the installation guide download link", locate_guide);
    r.when("I view the thank you section", view_thank_you);
    r.when("I resize the browser to {int}x{int}", resize);
    r.when("there is a network error or page load issue", block_installations);
    r.when("I click on the PDF download link", download_pdf);
    r.when("I click on the {string} button", click_button);
    r.when("I take a screenshot", screenshot);

    r.then("I should see the installations page content", page_content);
    r.then("I should be taken to the installations page", taken_to_installations);
    r.then("the page title should contain {string}", title_contains);
    r.then("I should see the thank you message for my purchase", thank_you_message);
    r.then("I should see the {string} installation heading", any_heading);
    r.then("I should see the {string} installation section", section_heading);
    r.then("I should see the {string} thank you heading", section_heading);
    r.then("I should see all 5 required tools listed:", tools_listed);
    r.then("I should see icons for each tool", tool_icons);
    r.then("I should see a link to download the PDF guide", guide_link);
    r.then("the PDF link should have a valid href pointing to a PDF file", guide_href);
    r.then("the PDF should start downloading", pdf_downloaded);
    r.then("I should see text about purchasing blinds", intro_text);
    r.then("I should see information about installation videos", videos_callout);
    r.then("I should see a {string} button", button_visible);
    r.then("I should scroll to the videos section", videos_section);

    r.then("the page should display correctly", displays_correctly);
    r.then("all content should remain accessible", content_accessible);
    r.then("all headings should have proper structure", headings_structured);
    r.then("all images should have appropriate alt text", images_have_alt);
    r.then("the page should be keyboard navigable", keyboard_navigable);

    r.then("I should see an appropriate error message", error_reported);
    r.then("the page should retry loading automatically", retry_loading);
    r.then("there should be no failed network requests", no_failed_requests);
}

fn on_site(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        let timeout = world.config.timeouts.network_idle;
        world
            .page
            .goto(&world.config.base_url, LoadState::NetworkIdle, timeout)
            .await?;
        Ok(())
    }
    .boxed()
}

fn on_installations_page(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.installations.navigate_to_installations().await
    }
    .boxed()
}

fn start_monitoring(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        Ok(())
    }
    .boxed()
}

fn navigate_to_installations(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.navigate_to_installations().await }.boxed()
}

fn click_installations_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.navigate_via_link().await }.boxed()
}

fn scroll_to_tools(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.scroll_to_section("tools").await }.boxed()
}

fn view_sections(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.scroll_to_section("outside").await }.boxed()
}

fn locate_guide(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.installations.install_guide_download.scroll_into_view().await?;
        world.page.wait(500).await
    }
    .boxed()
}

fn view_thank_you(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.scroll_to_section("thankyou").await }.boxed()
}

fn resize(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let dimension = |i: usize| -> E2eResult<u32> {
            let raw = args.int(i)?;
            u32::try_from(raw).map_err(|_| {
                E2eError::InvalidStepArgument(format!("{} is not a valid viewport dimension", raw))
            })
        };
        let viewport = Viewport {
            width: dimension(0)?,
            height: dimension(1)?,
        };
        world.installations.verify_responsive_layout(viewport).await
    }
    .boxed()
}

/// Abort every request for the guide, then try to load it anyway
fn block_installations(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.route_abort(INSTALLATIONS_ROUTE).await?;
        if let Err(e) = world.installations.navigate_to_installations().await {
            info!("Installations page failed to load as expected: {}", e);
            world.state.network_error = Some(e.to_string());
        }
        Ok(())
    }
    .boxed()
}

fn download_pdf(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let filename = world.installations.click_pdf_download().await?;
        info!("Downloading {}", filename);
        world.state.download_filename = Some(filename);
        Ok(())
    }
    .boxed()
}

fn click_button(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world
            .page
            .locator(CLICKABLE)
            .filter_text(args.string(0)?)
            .first()
            .click()
            .await
    }
    .boxed()
}

fn screenshot(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let path = world.installations.take_screenshot("installations-test").await?;
        debug!("Screenshot saved to {}", path.display());
        Ok(())
    }
    .boxed()
}

fn page_content(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.verify_installations_page_loaded().await }.boxed()
}

fn taken_to_installations(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page)
            .to_have_url(UrlMatch::Contains("installations".to_string()))
            .await?;
        world.installations.verify_installations_page_loaded().await
    }
    .boxed()
}

fn title_contains(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page)
            .to_have_title(TextMatch::regex_i(args.string(0)?))
            .await
    }
    .boxed()
}

fn thank_you_message(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.installations.thank_you_heading).to_be_visible().await }.boxed()
}

fn any_heading(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let heading = world.page.locator(HEADINGS).filter_text(args.string(0)?).first();
        expect(&heading).to_be_visible().await
    }
    .boxed()
}

fn section_heading(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let heading = world
            .page
            .locator(SECTION_HEADINGS)
            .filter_text(args.string(0)?)
            .first();
        expect(&heading).to_be_visible().await
    }
    .boxed()
}

fn tools_listed(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let tools: Vec<&String> = args.table()?.rows().iter().flatten().collect();
        ensure(!tools.is_empty(), "tool table lists no tools")?;
        for tool in tools {
            let element = world.page.locator(format!("text={}", tool)).first();
            expect(&element).to_be_visible().await?;
        }
        world.installations.verify_tools_section().await
    }
    .boxed()
}

fn tool_icons(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.verify_tool_icons().await }.boxed()
}

fn guide_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.installations.install_guide_download).to_be_visible().await }.boxed()
}

fn guide_href(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.installations.verify_pdf_download().await }.boxed()
}

fn pdf_downloaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let filename = world
            .state
            .download_filename
            .as_deref()
            .ok_or_else(|| E2eError::assertion("no download was started"))?;
        ensure(
            TextMatch::regex_i(r"\.pdf$").matches(filename)?,
            format!("downloaded file '{}' is not a PDF", filename),
        )
    }
    .boxed()
}

fn intro_text(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.installations.intro_text).to_be_visible().await }.boxed()
}

fn videos_callout(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.installations.videos_callout).to_be_visible().await }.boxed()
}

fn button_visible(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let button = world.page.locator(CLICKABLE).filter_text(args.string(0)?).first();
        expect(&button).to_be_visible().await
    }
    .boxed()
}

/// Videos are embedded lazily; only check them once they exist
fn videos_section(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.wait(1_000).await?;
        if world.installations.videos_present().await? {
            expect(&world.installations.installation_videos.first())
                .to_be_visible()
                .await?;
        } else {
            debug!("No installation videos embedded yet");
        }
        Ok(())
    }
    .boxed()
}

fn displays_correctly(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let container = &world.installations.content_container;
        expect(container).to_be_visible().await?;
        let bbox = container
            .bounding_box()
            .await?
            .ok_or_else(|| E2eError::assertion("content container has no bounding box"))?;
        ensure(bbox.width > 0.0, "content container has zero width")
    }
    .boxed()
}

fn content_accessible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.installations.thank_you_heading).to_be_visible().await?;
        expect(&world.installations.tools_heading).to_be_visible().await
    }
    .boxed()
}

fn headings_structured(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let headings = headings(&world.page).await?;
        check_heading_structure(&headings)?;
        world.installations.verify_accessibility().await
    }
    .boxed()
}

/// Decorative images may have an empty alt, but the attribute must exist
fn images_have_alt(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let mut missing = Vec::new();
        for image in world.page.locator("img").all().await? {
            let Some(src) = image.get_attribute("src").await? else {
                continue;
            };
            if src.contains("data:") || src.contains("placeholder") {
                continue;
            }
            if image.get_attribute("alt").await?.is_none() {
                missing.push(src);
            }
        }
        ensure(
            missing.is_empty(),
            format!("Images without an alt attribute:\n{}", missing.join("\n")),
        )
    }
    .boxed()
}

fn keyboard_navigable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.keyboard_press("Tab").await?;
        world.page.wait(100).await?;
        let focused = world.page.locator(":focus").count().await?;
        ensure_eq(focused, 1, "focused elements after Tab")
    }
    .boxed()
}

/// Either navigation failed outright or the page shows its own error
fn error_reported(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        if let Some(error) = &world.state.network_error {
            return ensure(!error.is_empty(), "navigation failed without a message");
        }
        let url = world.page.url().await?;
        if !url.contains("installations") {
            debug!("Browser stayed on {} after the blocked navigation", url);
            return Ok(());
        }
        let errors = world.page.locator(r#".error, .error-message, [role="alert"]"#);
        if errors.count().await? > 0 {
            expect(&errors.first()).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn retry_loading(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.unroute(INSTALLATIONS_ROUTE).await?;
        world.state.network_error = None;
        world.installations.navigate_to_installations().await?;
        expect(&world.installations.content_container).to_be_visible().await
    }
    .boxed()
}

fn no_failed_requests(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let failures = world.monitor.untracked_failures();
        if !failures.is_empty() {
            warn!("Network failures detected:\n{}", describe_requests(&failures));
        }
        ensure(
            failures.is_empty(),
            format!("{} network requests failed", failures.len()),
        )
    }
    .boxed()
}
