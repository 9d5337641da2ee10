//! Lazily-resolved element handles
//!
//! A `Locator` is only a chain of selector operations. Nothing touches the
//! DOM until an action or query is sent to the driver, which rebuilds the
//! Playwright locator from the chain each time.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Page, WaitState};

/// Text condition used by filters and text assertions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Plain substring, case-sensitive, with runs of whitespace collapsed on both sides
    Substring(String),
    /// Regular expression in the syntax shared by Rust `regex` and JS `RegExp`
    Pattern { source: String, ignore_case: bool },
}

/// Trims and collapses every whitespace run to one space, the way the browser
/// compares element text.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Double-quoted CSS string literal for attribute selectors
pub fn css_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl TextMatch {
    pub fn regex(source: impl Into<String>) -> Self {
        TextMatch::Pattern {
            source: source.into(),
            ignore_case: false,
        }
    }

    pub fn regex_i(source: impl Into<String>) -> Self {
        TextMatch::Pattern {
            source: source.into(),
            ignore_case: true,
        }
    }

    /// Evaluate the condition locally
    pub fn matches(&self, text: &str) -> E2eResult<bool> {
        match self {
            TextMatch::Substring(s) => {
                Ok(collapse_whitespace(text).contains(&collapse_whitespace(s)))
            }
            TextMatch::Pattern { source, ignore_case } => {
                let re = RegexBuilder::new(source)
                    .case_insensitive(*ignore_case)
                    .build()?;
                Ok(re.is_match(text))
            }
        }
    }
}

impl std::fmt::Display for TextMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextMatch::Substring(s) => write!(f, "\"{}\"", s),
            TextMatch::Pattern { source, ignore_case } => {
                write!(f, "/{}/{}", source, if *ignore_case { "i" } else { "" })
            }
        }
    }
}

impl From<&str> for TextMatch {
    fn from(s: &str) -> Self {
        TextMatch::Substring(s.to_string())
    }
}

impl From<String> for TextMatch {
    fn from(s: String) -> Self {
        TextMatch::Substring(s)
    }
}

/// One link of a locator chain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChainStep {
    Locator {
        selector: String,
    },
    First,
    Last,
    Nth {
        index: usize,
    },
    Filter {
        #[serde(skip_serializing_if = "Option::is_none")]
        has_text: Option<TextMatch>,
        #[serde(skip_serializing_if = "Option::is_none")]
        has_not_text: Option<TextMatch>,
        #[serde(skip_serializing_if = "Option::is_none")]
        has: Option<Vec<ChainStep>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        has_not: Option<Vec<ChainStep>>,
    },
    Or {
        other: Vec<ChainStep>,
    },
}

/// Options for `Locator::filter`
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub has_text: Option<TextMatch>,
    pub has_not_text: Option<TextMatch>,
    pub has: Option<Locator>,
    pub has_not: Option<Locator>,
}

impl Filter {
    pub fn has_text(text: impl Into<TextMatch>) -> Self {
        Self {
            has_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn has(locator: Locator) -> Self {
        Self {
            has: Some(locator),
            ..Default::default()
        }
    }
}

/// How `select_option` picks an option
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectBy {
    Value(String),
    Label(String),
    Index(usize),
}

/// Element bounding box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone)]
pub struct Locator {
    page: Page,
    chain: Vec<ChainStep>,
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Locator {
    pub(crate) fn new(page: Page, selector: impl Into<String>) -> Self {
        Self {
            page,
            chain: vec![ChainStep::Locator {
                selector: selector.into(),
            }],
        }
    }

    fn with(&self, step: ChainStep) -> Self {
        let mut chain = self.chain.clone();
        chain.push(step);
        Self {
            page: self.page.clone(),
            chain,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn chain(&self) -> &[ChainStep] {
        &self.chain
    }

    /// Descendant locator
    pub fn locator(&self, selector: impl Into<String>) -> Self {
        self.with(ChainStep::Locator {
            selector: selector.into(),
        })
    }

    pub fn first(&self) -> Self {
        self.with(ChainStep::First)
    }

    pub fn last(&self) -> Self {
        self.with(ChainStep::Last)
    }

    pub fn nth(&self, index: usize) -> Self {
        self.with(ChainStep::Nth { index })
    }

    /// Parent element
    pub fn parent(&self) -> Self {
        self.locator("..")
    }

    pub fn filter(&self, filter: Filter) -> Self {
        self.with(ChainStep::Filter {
            has_text: filter.has_text,
            has_not_text: filter.has_not_text,
            has: filter.has.map(|l| l.chain),
            has_not: filter.has_not.map(|l| l.chain),
        })
    }

    pub fn filter_text(&self, text: impl Into<TextMatch>) -> Self {
        self.filter(Filter::has_text(text))
    }

    /// Elements matching either locator
    pub fn or(&self, other: &Locator) -> Self {
        self.with(ChainStep::Or {
            other: other.chain.clone(),
        })
    }

    /// Human-readable chain, Playwright style
    pub fn describe(&self) -> String {
        fn render(chain: &[ChainStep]) -> String {
            let mut out = String::from("page");
            for step in chain {
                match step {
                    ChainStep::Locator { selector } => out.push_str(&format!(".locator('{}')", selector)),
                    ChainStep::First => out.push_str(".first()"),
                    ChainStep::Last => out.push_str(".last()"),
                    ChainStep::Nth { index } => out.push_str(&format!(".nth({})", index)),
                    ChainStep::Filter {
                        has_text,
                        has_not_text,
                        has,
                        has_not,
                    } => {
                        let mut parts = Vec::new();
                        if let Some(t) = has_text {
                            parts.push(format!("hasText: {}", t));
                        }
                        if let Some(t) = has_not_text {
                            parts.push(format!("hasNotText: {}", t));
                        }
                        if let Some(c) = has {
                            parts.push(format!("has: {}", render(c)));
                        }
                        if let Some(c) = has_not {
                            parts.push(format!("hasNot: {}", render(c)));
                        }
                        out.push_str(&format!(".filter({{ {} }})", parts.join(", ")));
                    }
                    ChainStep::Or { other } => out.push_str(&format!(".or({})", render(other))),
                }
            }
            out
        }
        render(&self.chain)
    }

    async fn act(&self, action: &str, extra: Value) -> E2eResult<Value> {
        let mut args = json!({ "chain": self.chain, "action": action });
        if let (Value::Object(args), Value::Object(extra)) = (&mut args, extra) {
            args.extend(extra);
        }
        self.page.call("locator", args).await.map_err(|e| match e {
            E2eError::Browser { message, .. } => E2eError::Browser {
                command: format!("{} on {}", action, self.describe()),
                message,
            },
            other => other,
        })
    }

    pub async fn count(&self) -> E2eResult<usize> {
        let value = self.act("count", Value::Null).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    pub async fn is_visible(&self) -> E2eResult<bool> {
        Ok(self.act("is_visible", Value::Null).await?.as_bool().unwrap_or(false))
    }

    pub async fn is_enabled(&self) -> E2eResult<bool> {
        Ok(self.act("is_enabled", Value::Null).await?.as_bool().unwrap_or(false))
    }

    pub async fn is_focused(&self) -> E2eResult<bool> {
        Ok(self.act("is_focused", Value::Null).await?.as_bool().unwrap_or(false))
    }

    pub async fn text_content(&self) -> E2eResult<Option<String>> {
        let value = self.act("text_content", Value::Null).await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn all_text_contents(&self) -> E2eResult<Vec<String>> {
        let value = self.act("all_text_contents", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_attribute(&self, name: &str) -> E2eResult<Option<String>> {
        let value = self.act("get_attribute", json!({ "name": name })).await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn input_value(&self) -> E2eResult<String> {
        let value = self.act("input_value", Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn bounding_box(&self) -> E2eResult<Option<BoundingBox>> {
        let value = self.act("bounding_box", Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn click(&self) -> E2eResult<()> {
        self.act("click", Value::Null).await?;
        Ok(())
    }

    pub async fn click_within(&self, timeout_ms: u64) -> E2eResult<()> {
        self.act("click", json!({ "timeout": timeout_ms })).await?;
        Ok(())
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        self.act("fill", json!({ "value": value })).await?;
        Ok(())
    }

    pub async fn clear(&self) -> E2eResult<()> {
        self.act("clear", Value::Null).await?;
        Ok(())
    }

    pub async fn hover(&self) -> E2eResult<()> {
        self.act("hover", Value::Null).await?;
        Ok(())
    }

    pub async fn hover_within(&self, timeout_ms: u64) -> E2eResult<()> {
        self.act("hover", json!({ "timeout": timeout_ms })).await?;
        Ok(())
    }

    pub async fn focus(&self) -> E2eResult<()> {
        self.act("focus", Value::Null).await?;
        Ok(())
    }

    pub async fn press(&self, key: &str) -> E2eResult<()> {
        self.act("press", json!({ "key": key })).await?;
        Ok(())
    }

    /// Select an option, returning the selected values
    pub async fn select_option(&self, by: SelectBy) -> E2eResult<Vec<String>> {
        let value = self.act("select_option", json!({ "by": by })).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    pub async fn scroll_into_view(&self) -> E2eResult<()> {
        self.act("scroll_into_view", Value::Null).await?;
        Ok(())
    }

    pub async fn wait_for(&self, state: WaitState, timeout_ms: u64) -> E2eResult<()> {
        self.act("wait_for", json!({ "state": state, "timeout": timeout_ms }))
            .await?;
        Ok(())
    }

    /// Run a JS function against the single matched element
    pub async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        self.act("evaluate", json!({ "expression": expression })).await
    }

    /// Run a JS function against every matched element
    pub async fn evaluate_all(&self, expression: &str) -> E2eResult<Value> {
        self.act("evaluate_all", json!({ "expression": expression })).await
    }

    /// Click and wait for the resulting download, returning its file name
    pub async fn click_for_download(&self, timeout_ms: u64) -> E2eResult<String> {
        let value = self
            .act("click_for_download", json!({ "timeout": timeout_ms }))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// One locator per current match, like Playwright's `all()`
    pub async fn all(&self) -> E2eResult<Vec<Locator>> {
        let count = self.count().await?;
        Ok((0..count).map(|i| self.nth(i)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_chain_serialization() {
        let chain = vec![
            ChainStep::Locator {
                selector: "a[href*=\"/shop\"]".to_string(),
            },
            ChainStep::Filter {
                has_text: Some(TextMatch::from("SHOP NOW")),
                has_not_text: None,
                has: None,
                has_not: None,
            },
            ChainStep::Nth { index: 1 },
        ];
        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(
            json,
            json!([
                { "op": "locator", "selector": "a[href*=\"/shop\"]" },
                { "op": "filter", "has_text": { "substring": "SHOP NOW" } },
                { "op": "nth", "index": 1 }
            ])
        );
    }

    #[test]
    fn test_pattern_serialization() {
        let json = serde_json::to_value(TextMatch::regex_i("Home.*Shop")).unwrap();
        assert_eq!(
            json,
            json!({ "pattern": { "source": "Home.*Shop", "ignore_case": true } })
        );
    }

    #[test]
    fn test_select_by_serialization() {
        assert_eq!(serde_json::to_value(SelectBy::Index(1)).unwrap(), json!({ "index": 1 }));
        assert_eq!(
            serde_json::to_value(SelectBy::Label("Texas".into())).unwrap(),
            json!({ "label": "Texas" })
        );
    }

    #[test_case(TextMatch::from("Zebra"), "Luxury Zebra Shades", true ; "substring hit")]
    #[test_case(TextMatch::from("zebra"), "Luxury Zebra Shades", false ; "substring is case sensitive")]
    #[test_case(TextMatch::from("Luxury Zebra Shades"), "\n  Luxury\n  Zebra Shades\n", true ; "markup line breaks")]
    #[test_case(TextMatch::from(" Free\tShipping "), "Free   Shipping on orders", true ; "expected whitespace collapsed")]
    #[test_case(TextMatch::from("LuxuryZebra"), "Luxury Zebra", false ; "whitespace is not dropped")]
    #[test_case(TextMatch::regex("Adding Life To Your Home|Luxury Zebra Shades"), "Luxury Zebra Shades", true ; "alternation")]
    #[test_case(TextMatch::regex_i("thank you"), "THANK YOU for your order", true ; "ignore case")]
    #[test_case(TextMatch::regex(r"\d+ items?"), "no items", false ; "pattern miss")]
    fn test_text_match(matcher: TextMatch, text: &str, expected: bool) {
        assert_eq!(matcher.matches(text).unwrap(), expected);
    }

    #[test_case("Zebra Shades", r#""Zebra Shades""# ; "plain")]
    #[test_case(r#"24" Roller"#, r#""24\" Roller""# ; "double quote")]
    #[test_case(r"a\b", r#""a\\b""# ; "backslash")]
    #[test_case("two\nlines", "\"two\\a lines\"" ; "newline")]
    fn test_css_quote(value: &str, expected: &str) {
        assert_eq!(css_quote(value), expected);
    }

    #[test]
    fn test_quoted_product_name_stays_in_text_filter() {
        let name = r#"24" Roller"), body:has-text("x"#;
        let step = ChainStep::Filter {
            has_text: Some(TextMatch::from(name)),
            has_not_text: None,
            has: None,
            has_not: None,
        };
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["op"], "filter");
        assert_eq!(value["has_text"]["substring"], name);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(TextMatch::regex("(unclosed").matches("x").is_err());
    }

    #[test]
    fn test_text_match_display() {
        assert_eq!(TextMatch::from("SHOP NOW").to_string(), "\"SHOP NOW\"");
        assert_eq!(TextMatch::regex_i("cart").to_string(), "/cart/i");
    }
}
