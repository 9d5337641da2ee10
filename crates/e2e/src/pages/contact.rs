//! Contact page object

use std::sync::Arc;

use pinecrest_common::{SiteConfig, SitePage};
use tracing::{debug, info, warn};

use crate::error::E2eResult;
use crate::expect::{expect, expect_page, UrlMatch};
use crate::feature::DataTable;
use crate::locator::{css_quote, Filter, Locator, SelectBy, TextMatch};
use crate::playwright::{LoadState, Page, UrlPattern};

const CONTACT_TITLE_PATTERN: &str = "Contact.*Pinecrest";

/// Values for the WPForms contact form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Full name, split on the first space when first and last are absent
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactData {
    /// Collect the fields named in a table's header row; later rows win
    pub fn from_table(table: &DataTable) -> Self {
        let mut data = Self::default();
        for row in table.hashes() {
            for (key, value) in row {
                data.set(&key, value);
            }
        }
        data
    }

    fn set(&mut self, key: &str, value: String) {
        let slot = match key.trim().to_lowercase().replace([' ', '_'], "").as_str() {
            "firstname" => &mut self.first_name,
            "lastname" => &mut self.last_name,
            "name" => &mut self.name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "subject" | "reason" => &mut self.subject,
            "message" => &mut self.message,
            other => {
                debug!("Ignoring unknown contact field '{}'", other);
                return;
            }
        };
        *slot = Some(value);
    }

    /// First and last name, splitting `name` when neither is given
    pub fn split_name(&self) -> (Option<String>, Option<String>) {
        if self.first_name.is_some() || self.last_name.is_some() {
            return (self.first_name.clone(), self.last_name.clone());
        }
        match self.name.as_deref() {
            Some(full) => {
                let mut parts = full.split(' ');
                let first = parts.next().unwrap_or_default().to_string();
                let last = parts.collect::<Vec<_>>().join(" ");
                (Some(first), Some(last))
            }
            None => (None, None),
        }
    }
}

#[derive(Clone)]
pub struct ContactPage {
    page: Page,
    config: Arc<SiteConfig>,

    pub contact_nav_link: Locator,
    pub page_heading: Locator,
    pub main_title: Locator,
    pub sub_heading: Locator,

    pub contact_info_section: Locator,
    pub company_name: Locator,
    pub email_address: Locator,
    pub email_link: Locator,

    pub facebook_link: Locator,
    pub instagram_link: Locator,
    pub social_media_section: Locator,

    pub contact_form: Locator,
    pub first_name_field: Locator,
    pub last_name_field: Locator,
    pub email_field: Locator,
    pub phone_field: Locator,
    pub message_field: Locator,
    pub subject_field: Locator,
    pub submit_button: Locator,

    pub success_message: Locator,
    pub error_message: Locator,
    pub body_content: Locator,
}

impl ContactPage {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        let p = &page;
        let email = config.test_data.contact_email.clone();
        Self {
            contact_nav_link: p.locator(r#"nav a[href*="/contact"]"#).first(),
            page_heading: p.locator("h1").filter_text(TextMatch::regex_i("Contact")).first(),
            main_title: p.locator(r#"h1:has-text("Contact")"#).first(),
            sub_heading: p
                .locator("h2, p")
                .filter_text(TextMatch::regex_i("Get in touch|Contact us|Reach out"))
                .first(),

            contact_info_section: p
                .locator("section, div")
                .filter_text(TextMatch::regex_i("email|contact.*info"))
                .first(),
            company_name: p.locator(r#":has-text("Pinecrest Home Goods")"#).first(),
            email_address: p.locator("*").filter_text(email.as_str()).first(),
            email_link: p
                .locator(format!("a[href={}]", css_quote(&format!("mailto:{}", email))))
                .first(),

            facebook_link: p.locator(r#"a[href*="facebook"]"#).first(),
            instagram_link: p.locator(r#"a[href*="instagram"]"#).first(),
            social_media_section: p.locator(r#":has-text("Follow Us")"#).first(),

            contact_form: p.locator(r#"form[action="/contact/"], .wpforms-form"#).first(),
            first_name_field: p.locator(r#"input[name="wpforms[fields][0][first]"]"#).first(),
            last_name_field: p.locator(r#"input[name="wpforms[fields][0][last]"]"#).first(),
            email_field: p.locator(r#"input[name="wpforms[fields][1]"]"#).first(),
            phone_field: p.locator(r#"input[name="wpf-temp-wpforms[fields][4]"]"#).first(),
            message_field: p.locator(r#"textarea[name="wpforms[fields][2]"]"#).first(),
            subject_field: p.locator(r#"select[name="wpforms[fields][5]"]"#).first(),
            submit_button: p.locator(r#"button.wpforms-submit, button:has-text("SEND")"#).first(),

            success_message: p
                .locator(r#".success, .confirmation, :has-text("thank you"), :has-text("sent successfully"), :has-text("message sent")"#)
                .first(),
            error_message: p
                .locator(r#".error, .alert, :has-text("error"), :has-text("required")"#)
                .first(),
            body_content: p.locator("body"),

            config,
            page,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The first-name input doubles as the "name" field
    pub fn name_field(&self) -> &Locator {
        &self.first_name_field
    }

    /// Load the contact URL, retrying once and waiting for network idle
    pub async fn navigate_to_contact(&self) -> E2eResult<()> {
        let url = self.config.url_of(SitePage::Contact);
        info!("Navigating to {}", url);
        let timeout = self.config.timeouts.network_idle;
        if let Err(e) = self.page.goto(&url, LoadState::DomContentLoaded, timeout).await {
            warn!("Retrying contact page navigation after: {}", e);
            self.page.goto(&url, LoadState::NetworkIdle, timeout).await?;
        }
        self.wait_for_page_load().await;
        Ok(())
    }

    /// Follow the CONTACT nav link, falling back to the contact URL
    pub async fn click_contact_navigation(&self) -> E2eResult<()> {
        if let Err(e) = self.follow_contact_link().await {
            warn!("Error clicking Contact navigation: {}", e);
            self.page
                .goto(
                    &self.config.url_of(SitePage::Contact),
                    LoadState::Load,
                    self.config.timeouts.network_idle,
                )
                .await?;
            self.wait_for_page_load().await;
        }
        Ok(())
    }

    async fn follow_contact_link(&self) -> E2eResult<()> {
        let timeouts = self.config.timeouts;
        let link = self
            .page
            .locator(r#"nav a[href*="/contact"]"#)
            .filter(Filter::has_text("CONTACT"))
            .first();
        expect(&link).timeout(timeouts.medium).to_be_visible().await?;
        expect(&link).to_be_enabled().await?;
        link.click().await?;
        self.page
            .wait_for_url(UrlPattern::regex(".*contact.*"), timeouts.long)
            .await?;
        self.page
            .wait_for_load_state(LoadState::DomContentLoaded, timeouts.long)
            .await
    }

    /// Best effort: a slow title is logged, not fatal
    pub async fn wait_for_page_load(&self) {
        let timeouts = self.config.timeouts;
        let loaded = async {
            self.page
                .wait_for_load_state(LoadState::DomContentLoaded, timeouts.long)
                .await?;
            expect_page(&self.page)
                .timeout(timeouts.medium)
                .to_have_title(TextMatch::regex(CONTACT_TITLE_PATTERN))
                .await
        }
        .await;

        if let Err(e) = loaded {
            info!("Contact page load verification failed, continuing: {}", e);
            if let Err(e) = self.page.wait(2_000).await {
                debug!("Settle wait failed: {}", e);
            }
        }
    }

    pub async fn verify_page_title(&self) -> E2eResult<()> {
        expect_page(&self.page)
            .to_have_title(TextMatch::regex("Contact.*Pinecrest Home Goods"))
            .await
    }

    /// Heading plus either the contact form or a contact URL
    pub async fn verify_contact_page_loaded(&self) -> E2eResult<()> {
        expect(&self.page_heading).to_be_visible().await?;
        if self.contact_form.is_visible().await.unwrap_or(false) {
            expect(&self.contact_form).to_be_visible().await
        } else {
            expect_page(&self.page).to_have_url(UrlMatch::pattern("contact")).await
        }
    }

    pub async fn verify_url(&self, expected: &str) -> E2eResult<()> {
        expect_page(&self.page).to_have_url(UrlMatch::pattern(expected)).await
    }

    pub async fn verify_page_header(&self) -> E2eResult<()> {
        expect(&self.page_heading).to_be_visible().await?;
        expect(&self.page_heading)
            .to_contain_text(TextMatch::regex_i("contact"))
            .await
    }

    pub async fn verify_contact_information(&self) -> E2eResult<()> {
        expect(&self.email_address).to_be_visible().await?;
        expect(&self.social_media_section).to_be_visible().await
    }

    pub async fn verify_contact_form(&self) -> E2eResult<()> {
        expect(&self.contact_form).to_be_visible().await?;
        for field in [
            &self.first_name_field,
            &self.last_name_field,
            &self.email_field,
            &self.message_field,
            &self.submit_button,
        ] {
            expect(field).to_be_visible().await?;
        }
        expect(&self.submit_button).to_be_enabled().await
    }

    pub async fn fill_contact_form(&self, data: &ContactData) -> E2eResult<()> {
        expect(&self.contact_form)
            .timeout(self.config.timeouts.medium)
            .to_be_visible()
            .await?;

        let (first, last) = data.split_name();
        let short = self.config.timeouts.short;
        for (field, value) in [
            (&self.first_name_field, first.as_deref()),
            (&self.last_name_field, last.as_deref()),
            (&self.email_field, data.email.as_deref()),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                expect(field).timeout(short).to_be_visible().await?;
                field.fill(value).await?;
            }
        }

        if let Some(phone) = data.phone.as_deref() {
            if self.phone_field.is_visible().await.unwrap_or(false) {
                self.phone_field.fill(phone).await?;
            }
        }

        if self.subject_field.is_visible().await.unwrap_or(false) {
            match data.subject.as_deref() {
                Some(subject) => {
                    self.subject_field
                        .select_option(SelectBy::Label(subject.to_string()))
                        .await?;
                }
                None => {
                    self.subject_field.select_option(SelectBy::Index(1)).await?;
                    debug!("Selected default contact reason (option 1)");
                }
            }
        }

        if let Some(message) = data.message.as_deref() {
            expect(&self.message_field).timeout(short).to_be_visible().await?;
            self.message_field.fill(message).await?;
        }
        Ok(())
    }

    pub async fn submit_contact_form(&self) -> E2eResult<()> {
        self.submit_button.click().await
    }

    pub async fn fill_and_submit_contact_form(&self, data: &ContactData) -> E2eResult<()> {
        self.fill_contact_form(data).await?;
        self.submit_contact_form().await
    }

    pub async fn verify_form_submission_success(&self) -> E2eResult<()> {
        expect(&self.success_message)
            .timeout(self.config.timeouts.medium)
            .to_be_visible()
            .await
    }

    pub async fn verify_form_validation_errors(&self) -> E2eResult<()> {
        expect(&self.error_message).to_be_visible().await
    }

    pub async fn verify_social_media_links(&self) -> E2eResult<()> {
        expect(&self.social_media_section).to_be_visible().await?;
        for link in [&self.facebook_link, &self.instagram_link] {
            expect(link).to_be_visible().await?;
            expect(link).to_be_enabled().await?;
        }
        Ok(())
    }

    /// Click the mailto link, or settle for the address being shown
    pub async fn click_email_address(&self) -> E2eResult<()> {
        if self.email_link.is_visible().await? {
            self.email_link.click().await
        } else {
            expect(&self.email_address).to_be_visible().await
        }
    }

    pub async fn verify_all_contact_elements(&self) -> E2eResult<()> {
        self.verify_page_header().await?;
        self.verify_contact_information().await?;
        self.verify_contact_form().await?;
        self.verify_social_media_links().await
    }
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
    fn test_from_table_maps_header_fields() {
        let data = ContactData::from_table(&table(&[
            &["name", "email", "Message", "nickname"],
            &["Jane Q Public", "jane@example.com", "Hello", "JQ"],
        ]));
        assert_eq!(data.name.as_deref(), Some("Jane Q Public"));
        assert_eq!(data.email.as_deref(), Some("jane@example.com"));
        assert_eq!(data.message.as_deref(), Some("Hello"));
        assert_eq!(data.subject, None);
    }

    #[test]
    fn test_split_name() {
        let data = ContactData {
            name: Some("Jane Q Public".to_string()),
            ..Default::default()
        };
        assert_eq!(
            data.split_name(),
            (Some("Jane".to_string()), Some("Q Public".to_string()))
        );

        let single = ContactData {
            name: Some("Cher".to_string()),
            ..Default::default()
        };
        assert_eq!(single.split_name(), (Some("Cher".to_string()), Some(String::new())));
    }

    #[test]
    fn test_explicit_names_are_not_split() {
        let data = ContactData {
            first_name: Some("Jane".to_string()),
            name: Some("Someone Else".to_string()),
            ..Default::default()
        };
        assert_eq!(data.split_name(), (Some("Jane".to_string()), None));
    }
}
