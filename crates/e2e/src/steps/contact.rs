//! Contact page steps

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{StepArgs, StepRegistry};
use crate::error::E2eResult;
use crate::expect::{expect, expect_page};
use crate::locator::{Locator, TextMatch};
use crate::pages::ContactData;
use crate::world::World;

/// Subject chosen when a scenario's table does not name one
const DEFAULT_SUBJECT: &str = "General Inquiry";

pub(super) fn register(r: &mut StepRegistry) {
    r.given("I am on the Contact page", on_contact_page);
    r.when("I navigate to the Contact page", navigate_to_contact);
    r.when("I click the Contact navigation link", click_contact_link);
    r.then("I should see the Contact page title {string}", contact_title);
    r.then("I should see the Contact page title matching {string}", contact_title_matching);
    r.then("I should be redirected to the Contact page", redirected_to_contact);
    r.then("the Contact page should load correctly", contact_loaded);
    r.then("the Contact URL should contain {string}", contact_url);
    r.then("I should see the main Contact heading", contact_heading);

    r.then("I should see the contact information section", contact_information);
    r.then("I should see company contact details", contact_information);
    r.then("contact information should be clearly displayed", contact_information);
    r.then("I should see the company email address", email_visible);
    r.then("I should see social media links if available", social_links);

    r.then("I should see the contact form with all required fields", contact_form);
    r.when("I fill out the contact form with valid information:", fill_valid_form);
    r.when("I fill out the contact form with invalid email:", fill_form);
    r.when("I interact with the contact form fields", interact_with_fields);
    r.then("all form fields should be functional and accept input", fields_accept_input);
    r.then("the submit button should be enabled when form is valid", submit_enabled);
    r.then("the submit button should be present and enabled", submit_enabled);
    r.then("form fields should show proper validation states", core_fields_visible);

    r.then("the contact form should be accessible", form_accessible);
    r.then("all form fields should have proper labels", fields_labelled);
    r.then("the contact form should have proper field labels", form_fields_visible);
    r.then("the page should have proper heading structure", heading_visible);
    r.then("interactive elements should be keyboard accessible", tab_order);
    r.then("the page should be navigable", page_navigable);

    r.when("I click on the email address link", click_email);
    r.then("it should open the default email client", email_visible);
}

fn on_contact_page(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.contact.navigate_to_contact().await?;
        world.contact.verify_page_title().await
    }
    .boxed()
}

fn navigate_to_contact(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.start_monitoring();
        world.contact.navigate_to_contact().await
    }
    .boxed()
}

fn click_contact_link(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.click_contact_navigation().await }.boxed()
}

fn contact_title(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect_page(&world.page).to_have_title(args.string(0)?).await }.boxed()
}

fn contact_title_matching(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect_page(&world.page)
            .to_have_title(TextMatch::regex(args.string(0)?))
            .await
    }
    .boxed()
}

fn redirected_to_contact(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_page_title().await }.boxed()
}

fn contact_loaded(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_contact_page_loaded().await }.boxed()
}

fn contact_url(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_url(args.string(0)?).await }.boxed()
}

fn contact_heading(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_page_header().await }.boxed()
}

fn contact_information(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_contact_information().await }.boxed()
}

fn email_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.contact.email_address).to_be_visible().await }.boxed()
}

fn social_links(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_social_media_links().await }.boxed()
}

fn contact_form(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.verify_contact_form().await }.boxed()
}

fn fill_valid_form(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let mut data = ContactData::from_table(args.table()?);
        data.subject.get_or_insert_with(|| DEFAULT_SUBJECT.to_string());
        world.contact.fill_contact_form(&data).await
    }
    .boxed()
}

fn fill_form(world: &mut World, args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let data = ContactData::from_table(args.table()?);
        world.contact.fill_contact_form(&data).await
    }
    .boxed()
}

fn interact_with_fields(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        for (field, sample) in [
            (&contact.first_name_field, "Test"),
            (&contact.email_field, "test@example.com"),
            (&contact.message_field, "Test message"),
        ] {
            field.click().await?;
            field.fill(sample).await?;
            field.clear().await?;
        }
        Ok(())
    }
    .boxed()
}

/// Visible, enabled, and keeps what was typed
async fn accepts_input(field: &Locator, value: &str) -> E2eResult<()> {
    expect(field).to_be_visible().await?;
    expect(field).to_be_enabled().await?;
    field.fill(value).await?;
    expect(field).to_have_value(value).await
}

fn fields_accept_input(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        accepts_input(&contact.first_name_field, "Test Name").await?;
        accepts_input(&contact.last_name_field, "Test Last").await?;
        accepts_input(&contact.email_field, "test@example.com").await?;
        accepts_input(&contact.message_field, "Test message content").await
    }
    .boxed()
}

fn submit_enabled(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        expect(&world.contact.submit_button).to_be_visible().await?;
        expect(&world.contact.submit_button).to_be_enabled().await
    }
    .boxed()
}

fn core_fields_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        for field in [contact.name_field(), &contact.email_field, &contact.message_field] {
            expect(field).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn form_accessible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        expect(&contact.contact_form).to_be_visible().await?;
        for field in [contact.name_field(), &contact.email_field, &contact.message_field] {
            expect(field).to_be_visible().await?;
        }
        expect(&contact.submit_button).to_be_visible().await
    }
    .boxed()
}

/// Each field with an id shows either its `<label for>` or itself
fn fields_labelled(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        for field in [contact.name_field(), &contact.email_field, &contact.message_field] {
            let Some(id) = field.get_attribute("id").await? else {
                continue;
            };
            let label = world.page.locator(format!(r#"label[for="{}"]"#, id));
            expect(&label.or(field).first()).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn form_fields_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        expect(&contact.contact_form).to_be_visible().await?;
        for field in [
            &contact.first_name_field,
            &contact.last_name_field,
            &contact.email_field,
            &contact.message_field,
        ] {
            expect(field).to_be_visible().await?;
        }
        Ok(())
    }
    .boxed()
}

fn heading_visible(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { expect(&world.contact.page_heading).to_be_visible().await }.boxed()
}

/// Tab walks name, email, the optional phone and subject, message, then submit
fn tab_order(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        let contact = &world.contact;
        let page = &world.page;

        contact.name_field().focus().await?;
        expect(contact.name_field()).to_be_focused().await?;

        page.keyboard_press("Tab").await?;
        expect(&contact.email_field).to_be_focused().await?;
        page.keyboard_press("Tab").await?;

        for optional in [&contact.phone_field, &contact.subject_field] {
            if optional.is_visible().await.unwrap_or(false) {
                expect(optional).to_be_focused().await?;
                page.keyboard_press("Tab").await?;
            }
        }

        expect(&contact.message_field).to_be_focused().await?;
        page.keyboard_press("Tab").await?;
        expect(&contact.submit_button).to_be_focused().await
    }
    .boxed()
}

fn page_navigable(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move {
        world.page.evaluate("() => window.scrollTo(0, 100)").await?;
        world.page.wait(500).await?;
        world.page.evaluate("() => window.scrollTo(0, 0)").await?;
        expect(&world.contact.body_content).to_be_visible().await
    }
    .boxed()
}

fn click_email(world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
    async move { world.contact.click_email_address().await }.boxed()
}
