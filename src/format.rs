//! Markdown rendering for plan and report comments.
//!
//! Planned test case descriptions are free text. The formatter looks for
//! `Steps:` and `Expected:` sections and renders them as a numbered list
//! and a block quote. When neither is found the description is emitted
//! verbatim, so no text is ever lost.

use std::sync::OnceLock;

use regex::Regex;

use crate::plan::{ExecutedTestCase, PlannedTestCase, TestStatus};

/// Separator between test cases in the plan comment.
pub const CASE_SEPARATOR: &str = "\n\n---\n\n";

/// Glyph for a passing test case.
pub const PASS_GLYPH: &str = "✅";

/// Glyph for a failing test case.
pub const FAIL_GLYPH: &str = "❌";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

fn steps_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"(?is)Steps?:\s*(.*?)(?:Expected:|$)"))
}

fn expected_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"(?is)Expected:\s*(.*)"))
}

fn step_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"\d+\)\s*"))
}

/// Structure recovered from a free-text description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDescription {
    /// At least one of the sections was found with content.
    Structured {
        /// Steps in order, without their original numbering.
        steps: Vec<String>,
        /// Expected outcome.
        expected: Option<String>,
    },
    /// No usable section; render the description as-is.
    Unstructured,
}

/// Extracts steps and expected outcome from a description.
///
/// Never fails: a description without markers is `Unstructured`.
pub fn parse_description(description: &str) -> ParsedDescription {
    let steps_text = steps_pattern()
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or("");

    let expected = expected_pattern()
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    let steps: Vec<String> = step_number_pattern()
        .split(steps_text)
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(str::to_string)
        .collect();

    if steps.is_empty() && expected.is_none() {
        ParsedDescription::Unstructured
    } else {
        ParsedDescription::Structured { steps, expected }
    }
}

/// Renders one planned test case as Markdown.
pub fn format_test_case(test_case: &PlannedTestCase) -> String {
    let mut parts = vec![format!("**{}**", test_case.title)];

    match parse_description(&test_case.description) {
        ParsedDescription::Structured { steps, expected } => {
            if !steps.is_empty() {
                let list: Vec<String> = steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| format!("{}. {}", i + 1, step))
                    .collect();
                parts.push(format!("\n**Steps:**\n{}", list.join("\n")));
            }
            if let Some(expected) = expected {
                parts.push(format!("\n**Expected:**\n> {}", expected));
            }
        }
        ParsedDescription::Unstructured => {
            parts.push(format!("\n{}", test_case.description));
        }
    }

    parts.join("\n")
}

/// Renders all planned test cases separated by horizontal rules.
pub fn format_test_plan(test_cases: &[PlannedTestCase]) -> String {
    test_cases
        .iter()
        .map(format_test_case)
        .collect::<Vec<_>>()
        .join(CASE_SEPARATOR)
}

/// Prefixes every line of `text` with `> `.
pub fn block_quote(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders executed test cases as a pass/fail list.
pub fn format_test_report(test_cases: &[ExecutedTestCase]) -> String {
    test_cases
        .iter()
        .map(|case| {
            let glyph = match case.status {
                TestStatus::Success => PASS_GLYPH,
                TestStatus::Fail => FAIL_GLYPH,
            };
            match case.result_description.as_deref() {
                Some(description) if !description.is_empty() => format!(
                    "{} **{}**\n{}",
                    glyph,
                    case.title,
                    block_quote(description)
                ),
                _ => format!("{} **{}**", glyph, case.title),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
