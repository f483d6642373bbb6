//! Judge programs written as TOML.
//!
//! A program is a list of steps run in order against the submission, plus a verdict rule:
//!
//! ```toml
//! [[step]]
//! kind = "run"
//! expect = "Hello, World!"
//!
//! [[step]]
//! kind = "test-cases"
//! cases = [["1 2", "3"], ["10 20", "30"], ["0 0", "0"]]
//!
//! [verdict]
//! points = 100
//! ```

use async_trait::async_trait;
use serde::Deserialize;

use super::{Judge, JudgeError};
use crate::compare::eq_ignore_trailing_whitespace;
use crate::context::{Context, FilterCasesOptions, TestCasesOptions};
use crate::verdict::{FinalVerdict, PassState, TestCase};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0}")]
    Syntax(#[from] toml::de::Error),

    #[error("Judge program has no steps")]
    NoSteps,

    #[error("Step {step}: {reason}")]
    Invalid { step: usize, reason: String },
}

/// How one output line is compared with its expected value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    #[default]
    IgnoreTrailingWhitespace,
    Exact,
    IgnoreCase,
}

impl Comparison {
    pub fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            Comparison::IgnoreTrailingWhitespace => eq_ignore_trailing_whitespace(actual, expected),
            Comparison::Exact => actual == expected,
            Comparison::IgnoreCase => {
                eq_ignore_trailing_whitespace(&actual.to_lowercase(), &expected.to_lowercase())
            }
        }
    }
}

fn newline() -> String {
    "\n".to_owned()
}

fn two() -> usize {
    2
}

fn yes() -> bool {
    true
}

fn info() -> PassState {
    PassState::Info
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Step {
    /// One run, optionally checked against expected stdout and stderr.
    #[serde(rename_all = "kebab-case")]
    Run {
        #[serde(default)]
        input: Option<String>,
        /// Runs this instead of the submission.
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        expect: Option<String>,
        #[serde(default)]
        expect_stderr: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        on_fail: Option<PassState>,
    },

    /// `(input, expected output)` pairs dealt over several runs.
    #[serde(rename_all = "kebab-case")]
    TestCases {
        cases: Vec<(String, String)>,
        #[serde(default = "newline")]
        input_separator: String,
        #[serde(default = "newline")]
        output_separator: String,
        #[serde(default = "two")]
        number_of_runs: usize,
        #[serde(default = "yes")]
        shuffle: bool,
        #[serde(default)]
        compare: Comparison,
    },

    /// `(item, keep)` pairs; the submission must print back the kept items.
    #[serde(rename_all = "kebab-case")]
    FilterCases {
        cases: Vec<(String, bool)>,
        #[serde(default = "newline")]
        input_separator: String,
        #[serde(default = "two")]
        number_of_runs: usize,
        #[serde(default = "yes")]
        shuffle: bool,
    },

    /// A case shown as is, without running anything.
    Text {
        text: String,
        #[serde(default = "info")]
        pass: PassState,
        #[serde(default)]
        name: Option<String>,
    },
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Run { .. } => "run",
            Step::TestCases { .. } => "test-cases",
            Step::FilterCases { .. } => "filter-cases",
            Step::Text { .. } => "text",
        }
    }

    fn validate(&self) -> Result<(), String> {
        let (runs, seps, empty) = match self {
            Step::TestCases {
                cases,
                input_separator,
                output_separator,
                number_of_runs,
                ..
            } => (
                *number_of_runs,
                vec![input_separator, output_separator],
                cases.is_empty(),
            ),
            Step::FilterCases {
                cases,
                input_separator,
                number_of_runs,
                ..
            } => (*number_of_runs, vec![input_separator], cases.is_empty()),
            Step::Run { .. } | Step::Text { .. } => return Ok(()),
        };
        if runs == 0 {
            return Err("number-of-runs must be at least 1".to_owned());
        }
        if seps.iter().any(|s| s.is_empty()) {
            return Err("separators must not be empty".to_owned());
        }
        if empty {
            return Err("cases must not be empty".to_owned());
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), JudgeError> {
        match self {
            Step::Run {
                input,
                code,
                expect,
                expect_stderr,
                name,
                on_fail,
            } => {
                let code = match code {
                    Some(code) => code.clone(),
                    None => ctx.code().to_owned(),
                };
                let mut out = ctx.run_code(&code, input.as_deref()).await?;
                if let Some(name) = name {
                    out = out.named(name);
                }
                if let Some(state) = on_fail {
                    out = out.on_fail(*state);
                }
                if let Some(expected) = expect {
                    out.assert_equals(expected).await?;
                }
                if let Some(expected) = expect_stderr {
                    out.error().assert_equals(expected).await?;
                }
            }
            Step::TestCases {
                cases,
                input_separator,
                output_separator,
                number_of_runs,
                shuffle,
                compare,
            } => {
                let compare = *compare;
                let options = TestCasesOptions::default()
                    .input_separator(input_separator)
                    .output_separator(output_separator)
                    .number_of_runs(*number_of_runs)
                    .shuffle(*shuffle)
                    .compare(move |actual: &str, expected: &String| {
                        compare.matches(actual, expected)
                    });
                ctx.run_test_cases(cases.iter().cloned(), options)
                    .run_all()
                    .await?;
            }
            Step::FilterCases {
                cases,
                input_separator,
                number_of_runs,
                shuffle,
            } => {
                let options = FilterCasesOptions::default()
                    .input_separator(input_separator)
                    .number_of_runs(*number_of_runs)
                    .shuffle(*shuffle);
                ctx.run_filter_cases(cases.iter().cloned(), options)
                    .run_all()
                    .await?;
            }
            Step::Text { text, pass, name } => {
                let mut case = TestCase::text(*pass, text);
                if let Some(name) = name {
                    case = case.set_name(name);
                }
                ctx.register_test_case(case).await?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct VerdictRule {
    /// Awarded on a passing verdict.
    #[serde(default)]
    pub points: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JudgeProgram {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
    /// Skips the remaining steps after the first failing case.
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub verdict: VerdictRule,
}

impl JudgeProgram {
    pub fn load(text: &str) -> Result<Self, LoadError> {
        let program: Self = toml::from_str(text)?;
        if program.steps.is_empty() {
            return Err(LoadError::NoSteps);
        }
        for (i, step) in program.steps.iter().enumerate() {
            step.validate().map_err(|reason| LoadError::Invalid {
                step: i + 1,
                reason,
            })?;
        }
        log::debug!("Loaded judge program with {} steps", program.steps.len());
        Ok(program)
    }
}

#[async_trait]
impl Judge for JudgeProgram {
    async fn judge(&self, ctx: &mut Context) -> Result<FinalVerdict, JudgeError> {
        for (i, step) in self.steps.iter().enumerate() {
            log::debug!("Step {}: {}", i + 1, step.kind());
            step.execute(ctx).await?;
            if self.fail_fast && !ctx.no_failures().pass {
                log::info!("Stopping after failing step {}", i + 1);
                break;
            }
        }

        let verdict = ctx.no_failures();
        Ok(match self.verdict.points {
            Some(points) if verdict.pass => verdict.with_points(points),
            _ => verdict,
        })
    }
}
