//! Inline rule tests
//!
//! Each test case is parsed, run through [`apply_rules`] with the single rule
//! under test and printed back. A case with an `output` must produce exactly
//! that text (trailing whitespace aside); a case without one must come out
//! unchanged.

use tfprune_core::parse;

use super::schema::TestCase;
use super::CatalogRule;
use crate::engine::apply_rules;

/// Result of running a single test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub rule: String,
    /// Position of the case in the rule's `tests` list
    pub index: usize,
    pub outcome: TestOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Passed,
    Skipped,
    Failed {
        expected: Option<String>,
        actual: Option<String>,
        error: String,
    },
}

impl TestResult {
    pub fn passed(&self) -> bool {
        !matches!(self.outcome, TestOutcome::Failed { .. })
    }
}

/// Run every test case of a rule
pub fn verify_rule(rule: &CatalogRule) -> Vec<TestResult> {
    rule.tests
        .iter()
        .enumerate()
        .map(|(index, case)| TestResult {
            rule: rule.name().to_string(),
            index,
            outcome: if case.skip {
                TestOutcome::Skipped
            } else {
                run_case(rule, case)
            },
        })
        .collect()
}

/// Run the test cases of every rule, in order
pub fn verify_rules<'r>(rules: impl IntoIterator<Item = &'r CatalogRule>) -> Vec<TestResult> {
    rules.into_iter().flat_map(verify_rule).collect()
}

fn run_case(rule: &CatalogRule, case: &TestCase) -> TestOutcome {
    let fail = |error: String, actual: Option<String>| TestOutcome::Failed {
        expected: case.output.clone(),
        actual,
        error,
    };

    let mut document = match parse(&case.input) {
        Ok(document) => document,
        Err(e) => return fail(format!("Input does not parse: {}", e), None),
    };

    let report = match apply_rules(&mut document, std::slice::from_ref(&rule.rule)) {
        Ok(report) => report,
        Err(e) => return fail(e.to_string(), None),
    };
    let actual = document.to_string();

    if let Some(error) = report.errors.first() {
        return fail(error.to_string(), Some(actual));
    }

    match &case.output {
        Some(expected) if actual.trim_end() == expected.trim_end() => TestOutcome::Passed,
        Some(_) => fail("Output differs".to_string(), Some(actual)),
        None if report.modifications == 0 && actual == case.input => TestOutcome::Passed,
        None => fail("Expected no change but rule fired".to_string(), Some(actual)),
    }
}
