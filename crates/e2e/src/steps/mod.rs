//! Step definitions and the registry that binds Gherkin text to them
//!
//! Definitions are registered with cucumber expressions. `{string}` matches a
//! double-quoted argument, `{int}` a signed integer, `{float}` a decimal and
//! `{word}` a single token; everything else is literal text.

use futures::future::BoxFuture;
use regex::Regex;
use std::fmt;

use crate::error::{E2eError, E2eResult};
use crate::feature::{DataTable, Step};
use crate::world::World;

mod about;
mod cart;
mod common;
mod contact;
mod gallery;
mod home;
mod installations;
mod products;

/// Async handler bound to one expression
pub type StepFn = for<'a> fn(&'a mut World, StepArgs) -> BoxFuture<'a, E2eResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Given,
    When,
    Then,
}

/// Arguments captured from a matched step
#[derive(Debug, Clone, Default)]
pub struct StepArgs {
    pub text: String,
    pub captures: Vec<String>,
    pub table: Option<DataTable>,
    pub doc_string: Option<String>,
}

impl StepArgs {
    pub fn string(&self, index: usize) -> E2eResult<&str> {
        self.captures.get(index).map(String::as_str).ok_or_else(|| {
            E2eError::InvalidStepArgument(format!("no argument {} in '{}'", index, self.text))
        })
    }

    pub fn int(&self, index: usize) -> E2eResult<i64> {
        let raw = self.string(index)?;
        raw.parse().map_err(|_| {
            E2eError::InvalidStepArgument(format!("'{}' is not an integer in '{}'", raw, self.text))
        })
    }

    pub fn float(&self, index: usize) -> E2eResult<f64> {
        let raw = self.string(index)?;
        raw.parse().map_err(|_| {
            E2eError::InvalidStepArgument(format!("'{}' is not a number in '{}'", raw, self.text))
        })
    }

    pub fn table(&self) -> E2eResult<&DataTable> {
        self.table.as_ref().ok_or_else(|| {
            E2eError::InvalidStepArgument(format!("step '{}' needs a data table", self.text))
        })
    }
}

pub struct StepDefinition {
    pub kind: StepKind,
    pub expression: String,
    regex: Regex,
    pub handler: StepFn,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("kind", &self.kind)
            .field("expression", &self.expression)
            .finish()
    }
}

impl StepDefinition {
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        self.regex.captures(text).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
    }
}

/// A step bound to its definition
#[derive(Debug)]
pub struct BoundStep<'r> {
    pub definition: &'r StepDefinition,
    pub args: StepArgs,
}

/// Turn a cucumber expression into an anchored regex
pub fn compile_expression(expression: &str) -> E2eResult<Regex> {
    let mut pattern = String::from("^");
    let mut rest = expression;
    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            E2eError::InvalidStepArgument(format!("unclosed parameter in '{}'", expression))
        })?;
        let group = match &after[..close] {
            "string" => r#""([^"]*)""#,
            "int" => r"(-?\d+)",
            "float" => r"(-?\d*\.?\d+)",
            "word" => r"([^\s]+)",
            "" => r"(.*)",
            other => {
                return Err(E2eError::InvalidStepArgument(format!(
                    "unknown parameter type {{{}}} in '{}'",
                    other, expression
                )))
            }
        };
        pattern.push_str(group);
        rest = &after[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Ok(Regex::new(&pattern)?)
}

#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
    errors: Vec<E2eError>,
}

impl StepRegistry {
    /// Registry holding every step definition of the suite
    pub fn new() -> E2eResult<Self> {
        let mut registry = Self::default();
        common::register(&mut registry);
        home::register(&mut registry);
        about::register(&mut registry);
        products::register(&mut registry);
        installations::register(&mut registry);
        gallery::register(&mut registry);
        contact::register(&mut registry);
        cart::register(&mut registry);

        if let Some(err) = registry.errors.pop() {
            return Err(err);
        }
        Ok(registry)
    }

    pub fn given(&mut self, expression: &str, handler: StepFn) {
        self.add(StepKind::Given, expression, handler);
    }

    pub fn when(&mut self, expression: &str, handler: StepFn) {
        self.add(StepKind::When, expression, handler);
    }

    pub fn then(&mut self, expression: &str, handler: StepFn) {
        self.add(StepKind::Then, expression, handler);
    }

    pub fn add(&mut self, kind: StepKind, expression: &str, handler: StepFn) {
        match compile_expression(expression) {
            Ok(regex) => self.definitions.push(StepDefinition {
                kind,
                expression: expression.to_string(),
                regex,
                handler,
            }),
            Err(e) => self.errors.push(e),
        }
    }

    pub fn definitions(&self) -> &[StepDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Expressions registered more than once
    pub fn duplicate_expressions(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.definitions
            .iter()
            .filter(|d| !seen.insert(d.expression.as_str()))
            .map(|d| d.expression.as_str())
            .collect()
    }

    /// The single definition matching `text`, with its captured arguments
    pub fn find(&self, text: &str) -> E2eResult<(&StepDefinition, Vec<String>)> {
        let mut matches = self
            .definitions
            .iter()
            .filter_map(|d| d.captures(text).map(|caps| (d, caps)));

        let Some(first) = matches.next() else {
            return Err(E2eError::UndefinedStep(text.to_string()));
        };
        let rest: Vec<_> = matches.collect();
        if !rest.is_empty() {
            let mut candidates = vec![first.0.expression.clone()];
            candidates.extend(rest.iter().map(|(d, _)| d.expression.clone()));
            return Err(E2eError::AmbiguousStep {
                text: text.to_string(),
                candidates,
            });
        }
        Ok(first)
    }

    pub fn bind<'r>(&'r self, step: &Step) -> E2eResult<BoundStep<'r>> {
        let (definition, captures) = self.find(&step.text)?;
        Ok(BoundStep {
            definition,
            args: StepArgs {
                text: step.text.clone(),
                captures,
                table: step.table.clone(),
                doc_string: step.doc_string.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use test_case::test_case;

    fn noop(_world: &mut World, _args: StepArgs) -> BoxFuture<'_, E2eResult<()>> {
        async { Ok(()) }.boxed()
    }

    #[test_case("I should see the correct page title {string}", "I should see the correct page title \"Pinecrest Home Goods\"", &["Pinecrest Home Goods"] ; "string")]
    #[test_case("I click on customer photo {int}", "I click on customer photo -2", &["-2"] ; "negative int")]
    #[test_case("I set viewport to {int}x{int}", "I set viewport to 375x667", &["375", "667"] ; "two ints")]
    #[test_case("the total is {float}", "the total is 12.50", &["12.50"] ; "float")]
    #[test_case("I open the {word} tab", "I open the reviews tab", &["reviews"] ; "word")]
    #[test_case("I see (optional) text.", "I see (optional) text.", &[] ; "regex metacharacters are literal")]
    fn test_compile_expression(expression: &str, text: &str, expected: &[&str]) {
        let re = compile_expression(expression).unwrap();
        let caps = re.captures(text).unwrap();
        let got: Vec<_> = caps.iter().skip(1).map(|m| m.unwrap().as_str()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_expression_is_anchored() {
        let re = compile_expression("the page loads").unwrap();
        assert!(re.is_match("the page loads"));
        assert!(!re.is_match("the page loads completely"));
        assert!(!re.is_match("when the page loads"));
    }

    #[test]
    fn test_unknown_parameter_type() {
        assert!(compile_expression("I pick {color}").is_err());
        assert!(compile_expression("I pick {string").is_err());
    }

    #[test]
    fn test_find_reports_undefined_and_ambiguous() {
        let mut registry = StepRegistry::default();
        registry.given("I am on the {string} page", noop);
        registry.given("I am on the \"cart\" page", noop);
        registry.then("I see {int} items", noop);

        let (def, caps) = registry.find("I see 3 items").unwrap();
        assert_eq!(def.kind, StepKind::Then);
        assert_eq!(caps, ["3"]);

        assert!(matches!(
            registry.find("I see three items"),
            Err(E2eError::UndefinedStep(_))
        ));

        match registry.find("I am on the \"cart\" page") {
            Err(E2eError::AmbiguousStep { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other.map(|(d, _)| d)),
        }
    }

    #[test]
    fn test_step_args_accessors() {
        let args = StepArgs {
            text: "I click on customer photo 2".to_string(),
            captures: vec!["2".to_string(), "abc".to_string()],
            table: None,
            doc_string: None,
        };
        assert_eq!(args.int(0).unwrap(), 2);
        assert!(args.int(1).is_err());
        assert!(args.string(2).is_err());
        assert!(args.table().is_err());
    }

    #[test]
    fn test_suite_registry_builds_without_duplicates() {
        let registry = StepRegistry::new().unwrap();
        assert!(registry.len() > 150);
        assert!(
            registry.duplicate_expressions().is_empty(),
            "duplicates: {:?}",
            registry.duplicate_expressions()
        );
    }
}
