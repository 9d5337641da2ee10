//! Gherkin feature files
//!
//! Supports the subset the suite uses: tags, `Background`, `Scenario`,
//! `Scenario Outline` with `Examples`, data tables, doc strings and comments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    Given,
    When,
    Then,
    And,
    But,
    Star,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
            Keyword::And => "And",
            Keyword::But => "But",
            Keyword::Star => "*",
        }
    }

    fn split(line: &str) -> Option<(Keyword, &str)> {
        const KEYWORDS: [(&str, Keyword); 6] = [
            ("Given ", Keyword::Given),
            ("When ", Keyword::When),
            ("Then ", Keyword::Then),
            ("And ", Keyword::And),
            ("But ", Keyword::But),
            ("* ", Keyword::Star),
        ];
        KEYWORDS
            .iter()
            .find_map(|(prefix, kw)| line.strip_prefix(prefix).map(|rest| (*kw, rest.trim())))
    }
}

/// Rows of a step's data table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Every row, header included
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Every row except the header
    pub fn rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// One map per row, keyed by the header
    pub fn hashes(&self) -> Vec<HashMap<String, String>> {
        let Some((header, body)) = self.rows.split_first() else {
            return Vec::new();
        };
        body.iter()
            .map(|row| {
                header
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<HashMap<_, _>>()
            })
            .collect()
    }

    /// First column to second column for two-column tables
    pub fn rows_hash(&self) -> E2eResult<HashMap<String, String>> {
        self.rows
            .iter()
            .map(|row| match row.as_slice() {
                [key, value] => Ok((key.clone(), value.clone())),
                _ => Err(E2eError::InvalidStepArgument(format!(
                    "rows_hash needs exactly two columns, found {}",
                    row.len()
                ))),
            })
            .collect()
    }

    fn substitute(&self, params: &HashMap<String, String>) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|cell| substitute(cell, params)).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub keyword: Keyword,
    pub text: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<DataTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub line: usize,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub path: PathBuf,
    pub background: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

impl Feature {
    /// Tags of a scenario together with the feature's own
    pub fn effective_tags(&self, scenario: &Scenario) -> Vec<String> {
        let mut tags = self.tags.clone();
        for tag in &scenario.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Load every `.feature` file under a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|ext| ext == "feature").unwrap_or(false))
        {
            paths.push(entry.path().to_path_buf());
        }
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    pub fn parse(source: &str, path: &Path) -> E2eResult<Self> {
        Parser::new(path).parse(source)
    }
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> E2eError {
    E2eError::FeatureParse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

/// Replaces `<name>` placeholders in one left-to-right pass. Substituted
/// values are never rescanned, and unknown placeholders stay as written.
fn substitute(text: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>').and_then(|close| params.get(&after[..close]).map(|v| (close, v))) {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Drops up to `indent` leading whitespace characters.
fn strip_indent(raw: &str, indent: usize) -> &str {
    let cut = raw
        .char_indices()
        .take(indent)
        .take_while(|(_, c)| c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &raw[cut..]
}

fn indent_width(raw: &str) -> usize {
    raw.chars().take_while(|c| c.is_whitespace()).count()
}

fn parse_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some('n') => cell.push('\n'),
                Some('\\') => cell.push('\\'),
                Some(other) => {
                    cell.push('\\');
                    cell.push(other);
                }
                None => cell.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

enum Section {
    None,
    Feature,
    Background,
    Scenario,
    Outline,
    Examples,
}

struct Outline {
    name: String,
    tags: Vec<String>,
    line: usize,
    steps: Vec<Step>,
    examples: Vec<(Vec<String>, Vec<Vec<String>>)>,
}

struct Parser<'p> {
    path: &'p Path,
    feature: Option<Feature>,
    section: Section,
    pending_tags: Vec<String>,
    scenario: Option<Scenario>,
    outline: Option<Outline>,
    /// Open doc string: starting line, delimiter indent, collected lines
    doc: Option<(usize, usize, Vec<String>)>,
}

impl<'p> Parser<'p> {
    fn new(path: &'p Path) -> Self {
        Self {
            path,
            feature: None,
            section: Section::None,
            pending_tags: Vec::new(),
            scenario: None,
            outline: None,
            doc: None,
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> E2eError {
        parse_error(self.path, line, message)
    }

    fn feature_mut(&mut self, line: usize) -> E2eResult<&mut Feature> {
        let path = self.path;
        self.feature
            .as_mut()
            .ok_or_else(|| parse_error(path, line, "expected 'Feature:' first"))
    }

    fn current_steps(&mut self, line: usize) -> E2eResult<&mut Vec<Step>> {
        let path = self.path;
        match self.section {
            Section::Background => Ok(&mut self.feature_mut(line)?.background),
            Section::Scenario => self
                .scenario
                .as_mut()
                .map(|s| &mut s.steps)
                .ok_or_else(|| parse_error(path, line, "step outside a scenario")),
            Section::Outline => self
                .outline
                .as_mut()
                .map(|o| &mut o.steps)
                .ok_or_else(|| parse_error(path, line, "step outside a scenario outline")),
            _ => Err(parse_error(path, line, "step outside a scenario")),
        }
    }

    fn last_step(&mut self, line: usize) -> E2eResult<&mut Step> {
        let path = self.path;
        self.current_steps(line)?
            .last_mut()
            .ok_or_else(|| parse_error(path, line, "table or doc string without a step"))
    }

    fn close_block(&mut self, line: usize) -> E2eResult<()> {
        if let Some(scenario) = self.scenario.take() {
            self.feature_mut(line)?.scenarios.push(scenario);
        }
        if let Some(outline) = self.outline.take() {
            let expanded = self.expand(outline, line)?;
            self.feature_mut(line)?.scenarios.extend(expanded);
        }
        Ok(())
    }

    fn expand(&self, outline: Outline, line: usize) -> E2eResult<Vec<Scenario>> {
        if outline.examples.is_empty() {
            return Err(self.error(outline.line, format!("outline '{}' has no Examples", outline.name)));
        }
        let mut scenarios = Vec::new();
        let mut n = 0;
        for (tags, rows) in &outline.examples {
            let Some((header, body)) = rows.split_first() else {
                return Err(self.error(line, "Examples table without a header row"));
            };
            for row in body {
                n += 1;
                let params: HashMap<String, String> =
                    header.iter().cloned().zip(row.iter().cloned()).collect();
                let mut scenario_tags = outline.tags.clone();
                scenario_tags.extend(tags.iter().cloned());
                scenarios.push(Scenario {
                    name: format!("{} (example {})", substitute(&outline.name, &params), n),
                    tags: scenario_tags,
                    line: outline.line,
                    steps: outline
                        .steps
                        .iter()
                        .map(|step| Step {
                            keyword: step.keyword,
                            text: substitute(&step.text, &params),
                            line: step.line,
                            table: step.table.as_ref().map(|t| t.substitute(&params)),
                            doc_string: step.doc_string.as_ref().map(|d| substitute(d, &params)),
                        })
                        .collect(),
                });
            }
        }
        Ok(scenarios)
    }

    fn parse(mut self, source: &str) -> E2eResult<Feature> {
        for (index, raw) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if self.doc.is_some() {
                if line.starts_with("\"\"\"") || line.starts_with("```") {
                    if let Some((_, _, lines)) = self.doc.take() {
                        self.last_step(line_no)?.doc_string = Some(lines.join("\n"));
                    }
                } else if let Some((_, indent, lines)) = self.doc.as_mut() {
                    lines.push(strip_indent(raw, *indent).to_string());
                }
                continue;
            }

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('@') {
                let tags = line
                    .split_whitespace()
                    .take_while(|t| !t.starts_with('#'))
                    .map(str::to_string);
                self.pending_tags.extend(tags);
                continue;
            }

            if let Some(name) = line.strip_prefix("Feature:") {
                if self.feature.is_some() {
                    return Err(self.error(line_no, "only one Feature per file"));
                }
                self.feature = Some(Feature {
                    name: name.trim().to_string(),
                    description: String::new(),
                    tags: std::mem::take(&mut self.pending_tags),
                    path: self.path.to_path_buf(),
                    background: Vec::new(),
                    scenarios: Vec::new(),
                });
                self.section = Section::Feature;
                continue;
            }

            if line.starts_with("Background:") {
                self.close_block(line_no)?;
                self.feature_mut(line_no)?;
                self.section = Section::Background;
                continue;
            }

            if let Some(name) = line
                .strip_prefix("Scenario Outline:")
                .or_else(|| line.strip_prefix("Scenario Template:"))
            {
                self.close_block(line_no)?;
                self.feature_mut(line_no)?;
                self.outline = Some(Outline {
                    name: name.trim().to_string(),
                    tags: std::mem::take(&mut self.pending_tags),
                    line: line_no,
                    steps: Vec::new(),
                    examples: Vec::new(),
                });
                self.section = Section::Outline;
                continue;
            }

            if let Some(name) = line
                .strip_prefix("Scenario:")
                .or_else(|| line.strip_prefix("Example:"))
            {
                self.close_block(line_no)?;
                self.feature_mut(line_no)?;
                self.scenario = Some(Scenario {
                    name: name.trim().to_string(),
                    tags: std::mem::take(&mut self.pending_tags),
                    line: line_no,
                    steps: Vec::new(),
                });
                self.section = Section::Scenario;
                continue;
            }

            if line.starts_with("Examples:") || line.starts_with("Scenarios:") {
                let Some(outline) = self.outline.as_mut() else {
                    return Err(self.error(line_no, "Examples outside a Scenario Outline"));
                };
                outline.examples.push((std::mem::take(&mut self.pending_tags), Vec::new()));
                self.section = Section::Examples;
                continue;
            }

            if line.starts_with('|') {
                let row = parse_row(line);
                if let Section::Examples = self.section {
                    if let Some((_, rows)) = self
                        .outline
                        .as_mut()
                        .and_then(|o| o.examples.last_mut())
                    {
                        if let Some(first) = rows.first() {
                            if first.len() != row.len() {
                                return Err(self.error(line_no, "inconsistent cell count"));
                            }
                        }
                        rows.push(row);
                    }
                    continue;
                }
                let step = self.last_step(line_no)?;
                let table = step.table.get_or_insert_with(DataTable::default);
                if let Some(first) = table.rows.first() {
                    if first.len() != row.len() {
                        let expected = first.len();
                        return Err(self.error(
                            line_no,
                            format!("inconsistent cell count: expected {}, found {}", expected, row.len()),
                        ));
                    }
                }
                table.rows.push(row);
                continue;
            }

            if line.starts_with("\"\"\"") || line.starts_with("```") {
                self.last_step(line_no)?;
                self.doc = Some((line_no, indent_width(raw), Vec::new()));
                continue;
            }

            if let Some((keyword, text)) = Keyword::split(line) {
                let steps = self.current_steps(line_no)?;
                steps.push(Step {
                    keyword,
                    text: text.to_string(),
                    line: line_no,
                    table: None,
                    doc_string: None,
                });
                continue;
            }

            if matches!(self.section, Section::Feature) {
                let feature = self.feature_mut(line_no)?;
                if !feature.description.is_empty() {
                    feature.description.push('\n');
                }
                feature.description.push_str(line);
                continue;
            }

            // Free text under a scenario header is a description
            let in_block = matches!(
                self.section,
                Section::Scenario | Section::Outline | Section::Background
            );
            if in_block && self.current_steps(line_no)?.is_empty() {
                continue;
            }
            return Err(self.error(line_no, format!("unexpected line: {}", line)));
        }

        if let Some((start, _, _)) = self.doc {
            return Err(self.error(start, "unterminated doc string"));
        }
        let end = source.lines().count();
        self.close_block(end)?;
        let path = self.path;
        self.feature
            .ok_or_else(|| parse_error(path, end, "no Feature found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Feature {
        Feature::parse(source, Path::new("test.feature")).unwrap()
    }

    #[test]
    fn test_parse_simple_feature() {
        let feature = parse(
            r#"
@homepage @smoke
Feature: Pinecrest homepage
  As a shopper
  I want the homepage to load

  Background:
    Given I navigate to the Pinecrest Home Goods homepage

  # header checks
  @header
  Scenario: Header is complete
    When the page loads completely
    Then I should see all header elements
    And I should see the correct page title "Pinecrest Home Goods"
"#,
        );
        assert_eq!(feature.name, "Pinecrest homepage");
        assert_eq!(feature.tags, ["@homepage", "@smoke"]);
        assert_eq!(feature.description, "As a shopper\nI want the homepage to load");
        assert_eq!(feature.background.len(), 1);
        assert_eq!(feature.scenarios.len(), 1);

        let scenario = &feature.scenarios[0];
        assert_eq!(scenario.tags, ["@header"]);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[2].keyword, Keyword::And);
        assert_eq!(
            scenario.steps[2].text,
            "I should see the correct page title \"Pinecrest Home Goods\""
        );
        assert_eq!(
            feature.effective_tags(scenario),
            ["@homepage", "@smoke", "@header"]
        );
    }

    #[test]
    fn test_data_tables() {
        let feature = parse(
            r#"
Feature: Contact
  Scenario: Submit the form
    When I fill the contact form with:
      | name      | email            | message       |
      | Jane Doe  | jane@example.com | Hello \| hi   |
    And I fill billing information:
      | Field      | Value   |
      | First Name | Jane    |
"#,
        );
        let steps = &feature.scenarios[0].steps;
        let table = steps[0].table.as_ref().unwrap();
        let hashes = table.hashes();
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0]["name"], "Jane Doe");
        assert_eq!(hashes[0]["message"], "Hello | hi");

        let billing = steps[1].table.as_ref().unwrap();
        assert_eq!(billing.raw().len(), 2);
        assert_eq!(billing.rows(), [vec!["First Name".to_string(), "Jane".to_string()]]);
        assert_eq!(billing.rows_hash().unwrap()["Field"], "Value");
    }

    #[test]
    fn test_rows_hash_rejects_wide_tables() {
        let table = DataTable::new(vec![vec!["a".into(), "b".into(), "c".into()]]);
        assert!(table.rows_hash().is_err());
    }

    #[test]
    fn test_scenario_outline_expansion() {
        let feature = parse(
            r#"
Feature: Navigation
  @nav
  Scenario Outline: Visit <page>
    When I navigate to "<page>" via the menu
    Then the URL should contain "<path>"

    @fast
    Examples:
      | page    | path     |
      | about   | /about   |
      | gallery | /gallery |
"#,
        );
        assert_eq!(feature.scenarios.len(), 2);
        assert_eq!(feature.scenarios[0].name, "Visit about (example 1)");
        assert_eq!(feature.scenarios[1].name, "Visit gallery (example 2)");
        assert_eq!(feature.scenarios[1].tags, ["@nav", "@fast"]);
        assert_eq!(
            feature.scenarios[1].steps[1].text,
            "the URL should contain \"/gallery\""
        );
    }

    #[test]
    fn test_doc_string() {
        let feature = parse(
            "Feature: Docs\n  Scenario: Message\n    When I type:\n      \"\"\"\n      line one\n        line two\n      \"\"\"\n",
        );
        assert_eq!(
            feature.scenarios[0].steps[0].doc_string.as_deref(),
            Some("line one\n  line two")
        );
    }

    #[test]
    fn test_doc_string_with_multibyte_indent() {
        let feature = parse(
            "Feature: F\n  Scenario: S\n    Given a step\n   \"\"\"\n\u{A0}\u{A0}x\n \u{A0}\u{A0}\u{A0}y\n   \"\"\"\n",
        );
        assert_eq!(
            feature.scenarios[0].steps[0].doc_string.as_deref(),
            Some("x\n\u{A0}y")
        );
    }

    #[test]
    fn test_outline_values_are_not_rescanned() {
        let feature = parse(
            r#"
Feature: Search
  Scenario Outline: Search <term>
    When I search for "<term>" on <page> <unknown>

    Examples:
      | term   | page  |
      | <page> | about |
"#,
        );
        assert_eq!(feature.scenarios[0].name, "Search <page> (example 1)");
        assert_eq!(
            feature.scenarios[0].steps[0].text,
            "I search for \"<page>\" on about <unknown>"
        );
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = Feature::parse("Feature: X\n  Given a step\n", Path::new("bad.feature")).unwrap_err();
        match err {
            E2eError::FeatureParse { line, path, .. } => {
                assert_eq!(line, 2);
                assert_eq!(path, PathBuf::from("bad.feature"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = Feature::parse("Scenario: orphan\n", Path::new("bad.feature")).unwrap_err();
        assert!(err.to_string().contains("expected 'Feature:' first"));
    }

    #[test]
    fn test_outline_without_examples_is_an_error() {
        let err = Feature::parse(
            "Feature: X\n  Scenario Outline: Y\n    Given a <thing>\n",
            Path::new("x.feature"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no Examples"));
    }

    #[test]
    fn test_load_all_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.feature"), "Feature: B\n").unwrap();
        std::fs::write(dir.path().join("a.feature"), "Feature: A\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let features = Feature::load_all(dir.path()).unwrap();
        let names: Vec<_> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }
}
