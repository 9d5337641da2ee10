//! About Us page steps

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info};

use super::common::{check_heading_structure, headings};
use super::{StepArgs, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, ensure_eq, expect, expect_page};
use crate::locator::TextMatch;
use crate::monitor::{describe_console, describe_requests};
use crate::playwright::Viewport;
use crate::world::World;

const MAX_LOAD_TIME_MS: f64 = 5_000.0;
const MAX_RESPONSE_TIME_MS: f64 = 3_000.0;

/// Images the About page leads with
const MAIN_IMAGES: [&str; 2] = [r#"img[src*="WhiteMain"]"#, r#"img[src*="Cream-Zebra-Shades"]"#];

const RESPONSIVE_VIEWPORTS: [Viewport; 3] = [
    Viewport { width: 375, height: 667 },
    Viewport { width: 768, height: 1024 },
    Viewport { width: 1920, height: 1080 },
];

const DEFAULT_VIEWPORT: Viewport = Viewport { width: 1280, height: 720 };

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I am on the About Us page", on_about_page);
    r.when("I navigate to the About Us page", navigate_to_about);
    r.when("I click the About navigation link", click_about_link);
    r.then("I should see the About Us page title {string}", about_title);
    r.then("I should be redirected to the About Us page", redirected_to_about);
    r.then("the About Us page should load correctly", about_loaded);
    r.then("the URL should contain {string}", url_contains);

    r.then("I should see the main About Us heading", main_heading);
    r.then("I should see the {string} section", named_section);
    r.then("I should see the company description with family business details", company_description);
    r.then("I should see the company showcase image", showcase_images);
    r.then("I should see the {string} section with {int} benefits", section_with_benefits);
    r.then("I should see the private label section", private_label);
    r.then("I should see the customer testimonials section", customer_testimonials);

    r.then("I should see {string} in the company description", text_visible);
    r.then("I should see {string} mentioned", text_visible);
    r.then("I should see custom sizing information {string}", text_visible);
    r.then("I should see information about importing from {string}", text_visible);
    r.then("I should see the heading {string}", text_visible);

    r.when("I scroll to the {string} section", scroll_to_section);
    r.then("I should see {string} benefit with icon", benefit_with_icon);
    r.then("each benefit should have descriptive text", benefits_described);

    r.then("I should see multiple customer testimonials on about page", multiple_testimonials);
    r.then("each testimonial should have customer name and timeframe", named_testimonials);
    r.then(
        "I should see testimonials from {string}, {string}, {string}, and {string}",
        testimonials_from,
    );
    r.then("testimonials should be navigable with arrow controls", testimonial_arrows);

    r.then("I should see the main company showcase image", main_showcase_image);
    r.then("I should see benefit icons for each {string} item", benefit_icons);
    r.then("I should see the product image in the custom areas section", custom_areas_image);
    r.then("all images should have proper alt text", images_have_alt_attribute);
    r.then("all images should have descriptive alt text", images_have_alt_attribute);

    r.then("I should see testimonial customer name links", named_testimonials);
    r.then("customer testimonial links should be functional", testimonial_links);
    r.then("I should see social media links in the footer", footer_social_links);
    r.then("I should see contact information in the footer", footer_contact);

    r.then("all headings should be properly structured", headings_structured);
    r.then("all links should be keyboard accessible on about page", links_focusable);
    r.then("text should have sufficient color contrast", readable_text);
    r.then("the page should be screen reader friendly", screen_reader_landmarks);

    r.then("the about page should load within acceptable time limits", about_load_time);
    r.then("all images should load successfully", main_images_loaded);
    r.then("there should be no JavaScript errors in the about page console", no_console_errors);
    r.then("the page should be responsive on different screen sizes", responsive);
    r.then("there should be no network failures", no_network_failures);

    r.then("I should see page content about the company", company_content);
    r.then("I should see company information sections", substantial_content);
    r.then("I should see the company introduction section", company_introduction);
    r.then("I should see the benefits section", benefits_section);
    r.then("I should see the testimonials section", testimonial_content);
    r.when("I scroll to the benefits section", scroll_to_benefits);
    r.then("I should see {string} benefit", benefit_visible);
}

fn on_about_page(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.about.navigate_to_about().await?;
        world.about.verify_page_title().await
    }
    .boxed()
}

fn navigate_to_about(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.about.navigate_to_about().await
    }
    .boxed()
}

fn click_about_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.click_about_navigation().await }.boxed()
}

fn about_title(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect_page(&world.page).to_have_title(args.string(0)?).await }.boxed()
}

fn redirected_to_about(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_page_title().await }.boxed()
}

fn about_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_about_page_loaded().await }.boxed()
}

fn url_contains(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_url(args.string(0)?).await }.boxed()
}

fn main_heading(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_page_header().await }.boxed()
}

fn named_section(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let name = args.string(0)?;
        match name.to_lowercase().as_str() {
            "who is pinecrest homegoods" => world.about.verify_company_introduction().await,
            "why choose pinecrest" => world.about.verify_why_choose_pinecrest_section().await,
            _ => Err(E2eError::InvalidStepArgument(format!("Unknown section: {}", name))),
        }
    }
    .boxed()
}

fn company_description(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_company_introduction().await }.boxed()
}

fn showcase_images(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_company_images().await }.boxed()
}

fn section_with_benefits(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        if !args.string(0)?.to_lowercase().contains("why choose pinecrest") {
            debug!("No benefit list for section '{}'", args.string(0)?);
            return Ok(());
        }
        world.about.verify_why_choose_pinecrest_section().await?;
        let expected = usize::try_from(args.int(1)?)
            .map_err(|_| E2eError::InvalidStepArgument(format!("bad benefit count in '{}'", args.text)))?;
        let benefits = world.about.benefits();
        ensure_eq(benefits.len(), expected, "benefit count")?;
        for benefit in benefits {
            expect(benefit).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn private_label(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_private_label_section().await }.boxed()
}

fn customer_testimonials(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_testimonials_section().await }.boxed()
}

fn text_visible(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_text_content(args.string(0)?).await }.boxed()
}

fn scroll_to_section(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.scroll_to_section(args.string(0)?).await }.boxed()
}

fn benefit_with_icon(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let (benefit, icon) = world.about.benefit(args.string(0)?)?;
        expect(benefit).to_be_visible().await?;
        if let Some(icon) = icon {
            expect(icon).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn benefits_described(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        for benefit in world.about.benefits() {
            expect(benefit).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn multiple_testimonials(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.about.verify_testimonials_section().await?;
        let count = world.about.testimonial_cards.count().await?;
        ensure(count > 0, "expected customer testimonials on the About page")
    }
    .boxed()
}

fn named_testimonials(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.verify_specific_testimonials().await }.boxed()
}

fn testimonials_from(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        for i in 0..4 {
            world.about.verify_text_content(args.string(i)?).await?;
        }
        Ok(())
    }
    .boxed()
}

fn testimonial_arrows(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let navigation = &world.about.testimonial_navigation;
        if navigation.count().await? > 0 {
            expect(&navigation.first()).to_be_visible().await?;
        } else {
            debug!("Testimonials have no arrow controls");
        }
        Ok(())
    }
    .boxed()
}

fn main_showcase_image(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.about.company_showcase_image).to_be_visible().await }.boxed()
}

fn benefit_icons(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        if args.string(0)?.to_lowercase().contains("why choose pinecrest") {
            world.about.verify_benefit_icons().await?;
        }
        Ok(())
    }
    .boxed()
}

fn custom_areas_image(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.about.cream_zebra_shades_image).to_be_visible().await }.boxed()
}

/// Every non-inline image carries an alt attribute, even an empty one
fn images_have_alt_attribute(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let mut missing = Vec::new();
        for image in world.page.locator("img[src]").all().await? {
            let src = image.get_attribute("src").await?.unwrap_or_default();
            if src.contains("data:") {
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

fn testimonial_links(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let links = world.page.locator(r#"a[href*="us_testimonial"]"#).count().await?;
        ensure(links > 0, "no testimonial links found")
    }
    .boxed()
}

fn footer_social_links(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.about.facebook_link).to_be_visible().await?;
        expect(&world.about.instagram_link).to_be_visible().await
    }
    .boxed()
}

fn footer_contact(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.about.email_contact).to_be_visible().await }.boxed()
}

fn headings_structured(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let headings = headings(&world.page).await?;
        check_heading_structure(&headings)?;
        expect(&world.about.page_heading).to_be_visible().await
    }
    .boxed()
}

fn links_focusable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let about = &world.about;
        for link in [&about.facebook_link, &about.instagram_link, &about.about_nav_link] {
            link.focus().await?;
            ensure(
                link.is_focused().await?,
                format!("{} did not take keyboard focus", link.describe()),
            )?;
        }
        Ok(())
    }
    .boxed()
}

fn readable_text(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.about.welcome_text).to_be_visible().await?;
        expect(&world.about.why_choose_heading).to_be_visible().await
    }
    .boxed()
}

fn screen_reader_landmarks(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let about = &world.about;
        for heading in [&about.page_heading, &about.company_intro_heading, &about.why_choose_heading] {
            expect(heading).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn about_load_time(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let metrics = world.about.performance_metrics().await?;
        info!(
            "About page load {:.0}ms, response {:.0}ms",
            metrics.load_time, metrics.response_time
        );
        ensure(
            metrics.load_time < MAX_LOAD_TIME_MS,
            format!("load took {:.0}ms, limit {:.0}ms", metrics.load_time, MAX_LOAD_TIME_MS),
        )?;
        ensure(
            metrics.response_time < MAX_RESPONSE_TIME_MS,
            format!(
                "response took {:.0}ms, limit {:.0}ms",
                metrics.response_time, MAX_RESPONSE_TIME_MS
            ),
        )
    }
    .boxed()
}

fn main_images_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.about.navigate_to_about().await?;
        world.about.verify_page_title().await?;
        world.page.wait(2_000).await?;

        let mut loaded = 0;
        for selector in MAIN_IMAGES {
            let image = world.page.locator(selector).first();
            if image.count().await? == 0 {
                debug!("No image matches {}", selector);
                continue;
            }
            let complete = image
                .evaluate("(img) => img.complete && img.naturalWidth > 0")
                .await
                .map(|v| v.as_bool().unwrap_or(false))
                .unwrap_or(false);
            if complete {
                loaded += 1;
            } else {
                debug!("{} has not finished loading", selector);
            }
        }
        ensure_eq(loaded, MAIN_IMAGES.len(), "loaded main images")
    }
    .boxed()
}

fn no_console_errors(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let errors: Vec<_> = world.monitor.console_errors().iter().collect();
        ensure(
            errors.is_empty(),
            format!("JavaScript errors on the About page:\n{}", describe_console(&errors)),
        )
    }
    .boxed()
}

fn responsive(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let checked = async {
            for viewport in RESPONSIVE_VIEWPORTS {
                world.page.set_viewport(viewport.width, viewport.height).await?;
                expect(&world.about.page_heading).to_be_visible().await?;
                expect(&world.about.welcome_text).to_be_visible().await?;
            }
            Ok::<_, E2eError>(())
        }
        .await;
        world
            .page
            .set_viewport(DEFAULT_VIEWPORT.width, DEFAULT_VIEWPORT.height)
            .await?;
        checked
    }
    .boxed()
}

fn no_network_failures(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.refresh_monitor();
        let failures: Vec<_> = world.monitor.failed_requests().iter().collect();
        ensure(
            failures.is_empty(),
            format!("Failed requests:\n{}", describe_requests(&failures)),
        )
    }
    .boxed()
}

fn company_content(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.page.locator("body"))
            .to_contain_text("Pinecrest")
            .await?;
        expect_page(&world.page)
            .to_have_title(TextMatch::regex("About"))
            .await
    }
    .boxed()
}

fn substantial_content(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let text = world.about.body_content.text_content().await?.unwrap_or_default();
        ensure(
            text.len() > 100,
            format!("page has only {} characters of text", text.len()),
        )
    }
    .boxed()
}

fn company_introduction(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.about.company_intro_heading).to_be_visible().await?;
        expect(&world.about.welcome_text).to_be_visible().await
    }
    .boxed()
}

fn benefits_section(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.about.why_choose_heading).to_be_visible().await }.boxed()
}

fn testimonial_content(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let text = world.about.body_content.text_content().await?.unwrap_or_default();
        let markers = ["Anney Dom", "Omar Felix", "testimonial", "customer", "review"];
        ensure(
            markers.iter().any(|m| text.contains(m)),
            "page shows no testimonial content",
        )
    }
    .boxed()
}

fn scroll_to_benefits(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.about.why_choose_heading.scroll_into_view().await }.boxed()
}

fn benefit_visible(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let about = &world.about;
        let benefit = match args.string(0)? {
            "Quality Manufactured Shades" => &about.quality_manufactured_benefit,
            "Always Best Prices" => &about.best_prices_benefit,
            "60-Day Satisfaction" => &about.satisfaction_benefit,
            "Easily Fit Custom Areas" => &about.custom_areas_benefit,
            other => return Err(E2eError::InvalidStepArgument(format!("Unknown benefit: {}", other))),
        };
        expect(benefit).to_be_visible().await
    }
    .boxed()
}
