//! Line-level template edits.
//!
//! A [`FileEdit`] reads a named template, applies the first matching rule to
//! each line, and produces a derived file. Lines no rule matches are copied
//! byte for byte, line ending included.
use serde::{Deserialize, Serialize};

/// What happens to a line a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    /// Replace the whole line (a newline is added).
    Line(String),
    /// Drop the line.
    Drop,
    /// Append text before the line ending.
    AppendSuffix(String),
    /// Substitute every occurrence of `from` with `to`.
    Substitute { from: String, to: String },
    /// Exchange every occurrence of two tokens.
    Swap { first: String, second: String },
}

/// A predicate (substring match) paired with its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRule {
    pub contains: String,
    pub replacement: Replacement,
}

impl LineRule {
    pub fn new(contains: impl Into<String>, replacement: Replacement) -> Self {
        Self {
            contains: contains.into(),
            replacement,
        }
    }

    fn matches(&self, line: &str) -> bool {
        line.contains(self.contains.as_str())
    }
}

/// Template file name, derived file name, and ordered rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    pub template: String,
    pub output: String,
    pub rules: Vec<LineRule>,
}

impl FileEdit {
    pub fn new(template: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            output: output.into(),
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, contains: impl Into<String>, replacement: Replacement) -> Self {
        self.rules.push(LineRule::new(contains, replacement));
        self
    }

    /// Apply the rules to template text.
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            let Some(rule) = self.rules.iter().find(|rule| rule.matches(line)) else {
                out.push_str(line);
                continue;
            };
            apply_rule(&rule.replacement, line, &mut out);
        }
        out
    }
}

fn apply_rule(replacement: &Replacement, line: &str, out: &mut String) {
    match replacement {
        Replacement::Line(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Replacement::Drop => {}
        Replacement::AppendSuffix(suffix) => {
            let (body, ending) = split_line_ending(line);
            out.push_str(body);
            out.push_str(suffix);
            out.push_str(ending);
        }
        Replacement::Substitute { from, to } => out.push_str(&line.replace(from.as_str(), to)),
        Replacement::Swap { first, second } => {
            out.push_str(&swap_tokens(line, first, second));
        }
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    let body = line.trim_end_matches(['\n', '\r']);
    (body, &line[body.len()..])
}

fn swap_tokens(line: &str, first: &str, second: &str) -> String {
    if first.is_empty() || second.is_empty() {
        return line.to_string();
    }
    line.split(first)
        .map(|piece| piece.replace(second, first))
        .collect::<Vec<_>>()
        .join(second)
}
