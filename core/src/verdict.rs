use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum PassState {
    /// The test passed.
    Pass,
    /// The test failed and makes the whole challenge fail under the default verdict rule.
    Fail,
    /// Shown as a problem but does not make the challenge fail by itself.
    Warning,
    /// Informational only.
    Info,
}

/// Rendering hint for diffs produced by the batch helpers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    #[default]
    Normal,
    Filter,
    Test,
}

fn default_sep() -> String {
    "\n".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultDisplay {
    Empty,
    Text(String),
    #[serde(rename_all = "camelCase")]
    Diff {
        expected: String,
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sep: Option<String>,
        #[serde(default)]
        display_mode: DisplayMode,
        #[serde(default = "default_sep")]
        input_separator: String,
    },
    Run {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<String>,
        output: String,
        error: String,
    },
}

impl ResultDisplay {
    pub fn diff(expected: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Diff {
            expected: expected.into(),
            output: output.into(),
            input: None,
            sep: None,
            display_mode: DisplayMode::Normal,
            input_separator: default_sep(),
        }
    }

    pub fn run(input: Option<&str>, output: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Run {
            input: input.map(str::to_owned),
            output: output.into(),
            error: error.into(),
        }
    }

    pub fn truncate(&mut self, length: usize) {
        use ResultDisplay::*;
        match self {
            Empty => {}
            Text(text) => truncate_str(text, length),
            Diff {
                expected,
                output,
                input,
                ..
            } => {
                truncate_str(expected, length);
                truncate_str(output, length);
                if let Some(input) = input {
                    truncate_str(input, length);
                }
            }
            Run {
                input,
                output,
                error,
            } => {
                if let Some(input) = input {
                    truncate_str(input, length);
                }
                truncate_str(output, length);
                truncate_str(error, length);
            }
        }
    }
}

/// `String::truncate` that backs off to a char boundary instead of panicking.
fn truncate_str(s: &mut String, length: usize) {
    if s.len() <= length {
        return;
    }
    let mut end = length;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub name: Option<String>,
    pub pass: PassState,
    pub result_display: ResultDisplay,
}

impl TestCase {
    pub fn new(name: Option<String>, pass: PassState, result_display: ResultDisplay) -> Self {
        Self {
            name,
            pass,
            result_display,
        }
    }

    pub fn pass(result_display: ResultDisplay) -> Self {
        Self::new(None, PassState::Pass, result_display)
    }

    pub fn fail(result_display: ResultDisplay) -> Self {
        Self::new(None, PassState::Fail, result_display)
    }

    pub fn info(result_display: ResultDisplay) -> Self {
        Self::new(None, PassState::Info, result_display)
    }

    /// `Pass` or `Fail` depending on `ok`.
    pub fn judged(ok: bool, result_display: ResultDisplay) -> Self {
        let pass = if ok { PassState::Pass } else { PassState::Fail };
        Self::new(None, pass, result_display)
    }

    pub fn text(pass: PassState, text: impl Into<String>) -> Self {
        Self::new(None, pass, ResultDisplay::Text(text.into()))
    }

    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Softens a failure, e.g. into a `Warning`. Any other state is left untouched.
    pub fn replace_fail_state(mut self, state: PassState) -> Self {
        if self.pass == PassState::Fail {
            self.pass = state;
        }
        self
    }

    pub fn is_failure(&self) -> bool {
        self.pass == PassState::Fail
    }

    pub fn truncate(&mut self, length: usize) {
        self.result_display.truncate(length);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalVerdict {
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}

impl FinalVerdict {
    pub fn new(pass: bool) -> Self {
        Self { pass, points: None }
    }

    pub fn with_points(mut self, points: i32) -> Self {
        self.points = Some(points);
        self
    }
}

/// Everything a judging session reported, as collected by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResult {
    pub pass: bool,
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}
