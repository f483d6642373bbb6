//! Per-session state handed to a judge program.
//!
//! A [`Context`] does not run anything itself. Every run request and every recorded test case is
//! sent as an [`Event`] to the driver loop, which executes runs and writes cases out in the order
//! they were sent.

use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
    sync::Arc,
    vec,
};

use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::{mpsc, oneshot};

use crate::compare::{eq_ignore_trailing_whitespace, zip_longest};
use crate::judge::JudgeError;
use crate::partition::partition;
use crate::runner::{CompiledRunResult, RunResponse, RunResult, RunnerError};
use crate::verdict::{DisplayMode, FinalVerdict, PassState, ResultDisplay, TestCase};

/// Something the judge program asks the driver loop to do.
#[derive(Debug)]
pub enum Event {
    /// Write out a recorded test case.
    Emit(TestCase),
    /// Execute code and answer on `reply`.
    Run {
        code: String,
        input: Option<String>,
        reply: oneshot::Sender<Result<RunResponse, RunnerError>>,
    },
}

pub struct Context {
    code: String,
    test_cases: Vec<TestCase>,
    runs: usize,
    events: mpsc::Sender<Event>,
    rng: StdRng,
}

impl Context {
    pub fn new(code: impl Into<String>, events: mpsc::Sender<Event>) -> Self {
        Self {
            code: code.into(),
            test_cases: Vec::new(),
            runs: 0,
            events,
            rng: StdRng::from_entropy(),
        }
    }

    /// Makes shuffling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The submitted code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Every case recorded so far, in emission order.
    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    async fn send(&self, event: Event) -> Result<(), JudgeError> {
        self.events
            .send(event)
            .await
            .map_err(|_| JudgeError::ChannelClosed)
    }

    /// Appends `case` to the log and emits it.
    pub async fn register_test_case(&mut self, case: TestCase) -> Result<TestCase, JudgeError> {
        self.test_cases.push(case.clone());
        self.send(Event::Emit(case.clone())).await?;
        Ok(case)
    }

    /// Runs the submission with `input` on stdin.
    pub async fn run(&mut self, input: Option<&str>) -> Result<RunOutput<'_>, JudgeError> {
        let code = self.code.clone();
        self.run_code(&code, input).await
    }

    /// Runs arbitrary `code`, e.g. a reference solution or a modified submission.
    ///
    /// The run is shown as an `Info` case named `Run #<n>`, or `Warning` when compilation failed.
    /// A size or time limit rejection comes back as [`JudgeError::Rejected`].
    pub async fn run_code(
        &mut self,
        code: &str,
        input: Option<&str>,
    ) -> Result<RunOutput<'_>, JudgeError> {
        let (reply, response) = oneshot::channel();
        self.send(Event::Run {
            code: code.to_owned(),
            input: input.map(str::to_owned),
            reply,
        })
        .await?;
        let result = match response.await.map_err(|_| JudgeError::ChannelClosed)?? {
            RunResponse::Rejected(rejection) => return Err(JudgeError::Rejected(rejection)),
            RunResponse::Completed(result) => result,
        };

        self.runs += 1;
        let (stdout, stderr) = result.displayed_streams();
        let pass = match result.compilation_failed() {
            true => PassState::Warning,
            false => PassState::Info,
        };
        let display = ResultDisplay::run(input, stdout, stderr);
        let name = format!("Run #{}", self.runs);
        self.register_test_case(TestCase::new(Some(name), pass, display))
            .await?;

        Ok(RunOutput::new(self, result, input))
    }

    /// Deals `(input, expected)` pairs into hands and runs the submission once per hand.
    ///
    /// Nothing runs until the returned sequence is advanced.
    pub fn run_test_cases<I, S, T>(
        &mut self,
        pairs: I,
        options: TestCasesOptions<T>,
    ) -> TestCaseRuns<'_, T>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Clone + Display,
    {
        let pairs: Vec<(String, T)> = pairs.into_iter().map(|(i, e)| (i.into(), e)).collect();
        let hands = deal(pairs, options.shuffle, options.number_of_runs, &mut self.rng);
        TestCaseRuns {
            context: self,
            hands: hands.into_iter(),
            options,
        }
    }

    /// Like [`run_test_cases`](Self::run_test_cases) for programs that should print back only the
    /// items marked `true`, in input order.
    pub fn run_filter_cases<I, S>(
        &mut self,
        pairs: I,
        options: FilterCasesOptions,
    ) -> FilterCaseRuns<'_>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let pairs: Vec<(String, bool)> = pairs.into_iter().map(|(i, k)| (i.into(), k)).collect();
        let hands = deal(pairs, options.shuffle, options.number_of_runs, &mut self.rng);
        FilterCaseRuns {
            context: self,
            hands: hands.into_iter(),
            options,
        }
    }

    /// Passes iff nothing recorded so far failed.
    pub fn no_failures(&self) -> FinalVerdict {
        FinalVerdict::new(!self.test_cases.iter().any(TestCase::is_failure))
    }
}

/// Deals `pairs` into the hands to run. Unlike [`partition`], this never yields an empty hand:
/// an empty case list means no runs and no cases rather than one run with empty input.
fn deal<T: Clone>(
    pairs: Vec<T>,
    shuffle: bool,
    number_of_runs: usize,
    rng: &mut StdRng,
) -> Vec<Vec<T>> {
    partition(pairs, shuffle, number_of_runs, rng)
        .into_iter()
        .filter(|hand| !hand.is_empty())
        .collect()
}

/// A string produced by a run, with assertions that record their outcome.
pub struct StringResult<'c> {
    context: &'c mut Context,
    text: String,
    input: Option<String>,
    name: Option<String>,
    fail_state: Option<PassState>,
}

impl<'c> StringResult<'c> {
    fn new(context: &'c mut Context, text: String, input: Option<String>) -> Self {
        Self {
            context,
            text,
            input,
            name: None,
            fail_state: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names the cases recorded by later assertions.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Records failed assertions with `state` instead of `Fail`.
    pub fn on_fail(mut self, state: PassState) -> Self {
        self.fail_state = Some(state);
        self
    }

    /// Compares against `expected` ignoring trailing whitespace.
    pub async fn assert_equals(&mut self, expected: &str) -> Result<TestCase, JudgeError> {
        self.assert_equals_sep(expected, "\n").await
    }

    /// Like [`assert_equals`](Self::assert_equals); `sep` tells renderers how to split lines.
    pub async fn assert_equals_sep(
        &mut self,
        expected: &str,
        sep: &str,
    ) -> Result<TestCase, JudgeError> {
        self.assert_equals_as(expected, sep, DisplayMode::Normal, "\n")
            .await
    }

    async fn assert_equals_as(
        &mut self,
        expected: &str,
        sep: &str,
        display_mode: DisplayMode,
        input_separator: &str,
    ) -> Result<TestCase, JudgeError> {
        let ok = eq_ignore_trailing_whitespace(&self.text, expected);
        let display = ResultDisplay::Diff {
            expected: expected.to_owned(),
            output: self.text.clone(),
            input: self.input.clone(),
            sep: Some(sep.to_owned()),
            display_mode,
            input_separator: input_separator.to_owned(),
        };
        self.record(TestCase::judged(ok, display)).await
    }

    /// Records whatever case `judge` builds from the text.
    pub async fn assert<F>(&mut self, judge: F) -> Result<TestCase, JudgeError>
    where
        F: FnOnce(&str) -> TestCase,
    {
        let case = judge(&self.text);
        self.record(case).await
    }

    async fn record(&mut self, mut case: TestCase) -> Result<TestCase, JudgeError> {
        if let Some(name) = &self.name {
            case = case.set_name(name.clone());
        }
        if let Some(state) = self.fail_state {
            case = case.replace_fail_state(state);
        }
        self.context.register_test_case(case).await
    }
}

/// Output of one run. Dereferences to the stdout [`StringResult`].
pub struct RunOutput<'c> {
    stdout: StringResult<'c>,
    stderr: String,
    exit_status: i32,
    compilation_result: Option<RunResult>,
}

impl<'c> RunOutput<'c> {
    fn new(context: &'c mut Context, result: CompiledRunResult, input: Option<&str>) -> Self {
        let CompiledRunResult {
            stdout,
            stderr,
            exit_status,
            compilation_result,
        } = result;
        Self {
            stdout: StringResult::new(context, stdout, input.map(str::to_owned)),
            stderr,
            exit_status,
            compilation_result,
        }
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    pub fn compilation_result(&self) -> Option<&RunResult> {
        self.compilation_result.as_ref()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.stdout = self.stdout.named(name);
        self
    }

    pub fn on_fail(mut self, state: PassState) -> Self {
        self.stdout = self.stdout.on_fail(state);
        self
    }

    /// Assertions over stderr instead of stdout.
    pub fn error(self) -> StringResult<'c> {
        let StringResult {
            context,
            input,
            name,
            fail_state,
            ..
        } = self.stdout;
        StringResult {
            context,
            text: self.stderr,
            input,
            name,
            fail_state,
        }
    }
}

impl<'c> Deref for RunOutput<'c> {
    type Target = StringResult<'c>;

    fn deref(&self) -> &Self::Target {
        &self.stdout
    }
}

impl DerefMut for RunOutput<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.stdout
    }
}

pub type CompareFn<T> = Arc<dyn Fn(&str, &T) -> bool + Send + Sync>;

pub struct TestCasesOptions<T> {
    pub input_separator: String,
    pub output_separator: String,
    pub number_of_runs: usize,
    pub shuffle: bool,
    /// `(actual line, expected value) -> equal`
    pub compare: CompareFn<T>,
}

impl<T: Display + 'static> Default for TestCasesOptions<T> {
    fn default() -> Self {
        Self {
            input_separator: "\n".to_owned(),
            output_separator: "\n".to_owned(),
            number_of_runs: 2,
            shuffle: true,
            compare: Arc::new(|actual: &str, expected: &T| {
                eq_ignore_trailing_whitespace(actual, &expected.to_string())
            }),
        }
    }
}

impl<T> TestCasesOptions<T> {
    pub fn input_separator(mut self, sep: impl Into<String>) -> Self {
        self.input_separator = sep.into();
        self
    }

    pub fn output_separator(mut self, sep: impl Into<String>) -> Self {
        self.output_separator = sep.into();
        self
    }

    pub fn number_of_runs(mut self, n: usize) -> Self {
        self.number_of_runs = n;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn compare<F>(mut self, compare: F) -> Self
    where
        F: Fn(&str, &T) -> bool + Send + Sync + 'static,
    {
        self.compare = Arc::new(compare);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilterCasesOptions {
    pub input_separator: String,
    pub number_of_runs: usize,
    pub shuffle: bool,
}

impl Default for FilterCasesOptions {
    fn default() -> Self {
        Self {
            input_separator: "\n".to_owned(),
            number_of_runs: 2,
            shuffle: true,
        }
    }
}

impl FilterCasesOptions {
    pub fn input_separator(mut self, sep: impl Into<String>) -> Self {
        self.input_separator = sep.into();
        self
    }

    pub fn number_of_runs(mut self, n: usize) -> Self {
        self.number_of_runs = n;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

/// Pending executions of [`Context::run_test_cases`]. Each hand runs when it is reached.
pub struct TestCaseRuns<'c, T> {
    context: &'c mut Context,
    hands: vec::IntoIter<Vec<(String, T)>>,
    options: TestCasesOptions<T>,
}

impl<T: Display> TestCaseRuns<'_, T> {
    /// Hands not run yet.
    pub fn remaining(&self) -> usize {
        self.hands.len()
    }

    /// Runs the next hand, or returns `None` when every hand has run.
    pub async fn next(&mut self) -> Option<Result<TestCase, JudgeError>> {
        let hand = self.hands.next()?;
        Some(self.run_hand(hand).await)
    }

    pub async fn run_all(mut self) -> Result<Vec<TestCase>, JudgeError> {
        let mut cases = Vec::with_capacity(self.remaining());
        while let Some(case) = self.next().await {
            cases.push(case?);
        }
        Ok(cases)
    }

    async fn run_hand(&mut self, hand: Vec<(String, T)>) -> Result<TestCase, JudgeError> {
        let options = &self.options;
        let input = join(hand.iter().map(|(i, _)| i.as_str()), &options.input_separator);
        let mut output = self.context.run(Some(input.as_str())).await?;
        output
            .assert(|text| judge_hand(text, &input, &hand, options))
            .await
    }
}

/// Line by line verdict for one hand. The expected side shows the actual line wherever it was
/// right, so a diff only highlights the wrong lines.
fn judge_hand<T: Display>(
    output: &str,
    input: &str,
    hand: &[(String, T)],
    options: &TestCasesOptions<T>,
) -> TestCase {
    let sep = options.output_separator.as_str();
    let mut all_equal = true;
    let shown: Vec<String> = zip_longest(output.trim_end().split(sep), hand.iter().map(|(_, e)| e))
        .map(|pair| match pair {
            (Some(actual), Some(expected)) if (options.compare)(actual, expected) => {
                actual.to_owned()
            }
            (_, expected) => {
                all_equal = false;
                expected.map(ToString::to_string).unwrap_or_default()
            }
        })
        .collect();

    TestCase::judged(
        all_equal,
        ResultDisplay::Diff {
            expected: shown.join(sep),
            output: output.to_owned(),
            input: Some(input.to_owned()),
            sep: Some(sep.to_owned()),
            display_mode: DisplayMode::Test,
            input_separator: options.input_separator.clone(),
        },
    )
}

/// Pending executions of [`Context::run_filter_cases`].
pub struct FilterCaseRuns<'c> {
    context: &'c mut Context,
    hands: vec::IntoIter<Vec<(String, bool)>>,
    options: FilterCasesOptions,
}

impl FilterCaseRuns<'_> {
    pub fn remaining(&self) -> usize {
        self.hands.len()
    }

    pub async fn next(&mut self) -> Option<Result<TestCase, JudgeError>> {
        let hand = self.hands.next()?;
        Some(self.run_hand(hand).await)
    }

    pub async fn run_all(mut self) -> Result<Vec<TestCase>, JudgeError> {
        let mut cases = Vec::with_capacity(self.remaining());
        while let Some(case) = self.next().await {
            cases.push(case?);
        }
        Ok(cases)
    }

    async fn run_hand(&mut self, hand: Vec<(String, bool)>) -> Result<TestCase, JudgeError> {
        let sep = self.options.input_separator.as_str();
        let input = join(hand.iter().map(|(i, _)| i.as_str()), sep);
        let expected = join(
            hand.iter().filter(|(_, keep)| *keep).map(|(i, _)| i.as_str()),
            sep,
        );
        let mut output = self.context.run(Some(input.as_str())).await?;
        output
            .assert_equals_as(&expected, "\n", DisplayMode::Filter, sep)
            .await
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>, sep: &str) -> String {
    items.collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runner::{CompiledRunResult, RunRejection};

    /// Answers every run with `respond(code, input)` and collects emitted cases.
    async fn drive<F, Fut>(
        respond: impl Fn(&str, Option<&str>) -> RunResponse,
        judge: F,
    ) -> (Vec<TestCase>, Vec<(String, Option<String>)>)
    where
        F: FnOnce(Context) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::channel(4);
        let ctx = Context::new("submission", tx).with_seed(7);
        let producer = async move {
            judge(ctx).await;
        };
        let consumer = async {
            let mut emitted = Vec::new();
            let mut runs = Vec::new();
            while let Some(event) = rx.recv().await {
                match event {
                    Event::Emit(case) => emitted.push(case),
                    Event::Run { code, input, reply } => {
                        let _ = reply.send(Ok(respond(&code, input.as_deref())));
                        runs.push((code, input));
                    }
                }
            }
            (emitted, runs)
        };
        let ((), out) = tokio::join!(producer, consumer);
        out
    }

    fn echo(_: &str, input: Option<&str>) -> RunResponse {
        RunResponse::Completed(CompiledRunResult {
            stdout: input.unwrap_or_default().to_owned(),
            ..Default::default()
        })
    }

    fn uppercase(_: &str, input: Option<&str>) -> RunResponse {
        RunResponse::Completed(CompiledRunResult {
            stdout: input.unwrap_or_default().to_uppercase(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn run_emits_a_run_case_before_the_assertion() {
        let (emitted, runs) = drive(echo, |mut ctx| async move {
            let mut out = ctx.run(Some("hi ")).await.unwrap();
            assert_eq!(out.text(), "hi ");
            let case = out.assert_equals("hi\n").await.unwrap();
            assert_eq!(case.pass, PassState::Pass);
            assert_eq!(ctx.test_cases().len(), 2);
            assert!(ctx.no_failures().pass);
        })
        .await;

        assert_eq!(runs, [("submission".to_owned(), Some("hi ".to_owned()))]);
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].name.as_deref(), Some("Run #1"));
        assert_eq!(emitted[0].pass, PassState::Info);
        assert!(matches!(
            &emitted[0].result_display,
            ResultDisplay::Run { output, .. } if output == "hi "
        ));
        assert_eq!(emitted[1].pass, PassState::Pass);
    }

    #[tokio::test]
    async fn failed_compilation_is_a_warning_showing_compiler_output() {
        let respond = |_: &str, _: Option<&str>| {
            RunResponse::Completed(CompiledRunResult::compile_failed(RunResult {
                stdout: "".into(),
                stderr: "syntax error".into(),
                exit_status: 2,
            }))
        };
        let (emitted, _) = drive(respond, |mut ctx| async move {
            let out = ctx.run(None).await.unwrap();
            assert_eq!(out.text(), "");
            assert_eq!(out.compilation_result().unwrap().exit_status, 2);
        })
        .await;

        assert_eq!(emitted[0].pass, PassState::Warning);
        assert_eq!(
            emitted[0].result_display,
            ResultDisplay::Run {
                input: None,
                output: "".into(),
                error: "syntax error".into()
            }
        );
    }

    #[tokio::test]
    async fn assertions_over_stderr_can_be_named_and_softened() {
        let respond = |_: &str, _: Option<&str>| {
            RunResponse::Completed(CompiledRunResult {
                stdout: "out".into(),
                stderr: "err".into(),
                exit_status: 1,
                compilation_result: None,
            })
        };
        let (emitted, _) = drive(respond, |mut ctx| async move {
            let out = ctx.run(None).await.unwrap();
            assert_eq!(out.exit_status(), 1);
            assert_eq!(out.stderr(), "err");
            let mut err = out.named("stderr").on_fail(PassState::Warning).error();
            let case = err.assert_equals("something else").await.unwrap();
            assert_eq!(case.pass, PassState::Warning);
            assert!(ctx.no_failures().pass);
        })
        .await;

        assert_eq!(emitted[1].name.as_deref(), Some("stderr"));
        assert_eq!(emitted[1].pass, PassState::Warning);
    }

    #[tokio::test]
    async fn custom_assertion_and_registered_cases() {
        let (emitted, _) = drive(echo, |mut ctx| async move {
            ctx.register_test_case(TestCase::text(PassState::Info, "note"))
                .await
                .unwrap();
            let mut out = ctx.run_code("other", Some("abc")).await.unwrap();
            let case = out
                .assert(|text| TestCase::judged(text.len() == 2, ResultDisplay::Empty))
                .await
                .unwrap();
            assert!(case.is_failure());
            assert!(!ctx.no_failures().pass);
            assert_eq!(ctx.runs(), 1);
        })
        .await;

        let names: Vec<_> = emitted.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(names, [None, Some("Run #1"), None]);
    }

    #[tokio::test]
    async fn rejection_is_an_error_and_not_counted() {
        let respond = |_: &str, _: Option<&str>| RunResponse::Rejected(RunRejection::CodeTooLarge);
        let (emitted, _) = drive(respond, |mut ctx| async move {
            let err = ctx.run(None).await.err().unwrap();
            assert!(matches!(err, JudgeError::Rejected(RunRejection::CodeTooLarge)));
            assert_eq!(ctx.runs(), 0);
        })
        .await;
        assert!(emitted.is_empty());
    }

    #[tokio::test]
    async fn single_run_takes_every_pair() {
        let (emitted, runs) = drive(echo, |mut ctx| async move {
            let pairs = [("a", "a"), ("b", "b"), ("c", "c"), ("d", "d")];
            let options = TestCasesOptions::default().number_of_runs(1).shuffle(false);
            let cases = ctx.run_test_cases(pairs, options).run_all().await.unwrap();
            assert_eq!(cases.len(), 1);
            assert_eq!(cases[0].pass, PassState::Pass);
        })
        .await;

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1.as_deref(), Some("a\nb\nc\nd"));
        let ResultDisplay::Diff { display_mode, .. } = &emitted[1].result_display else {
            panic!("expected a diff")
        };
        assert_eq!(*display_mode, DisplayMode::Test);
    }

    #[tokio::test]
    async fn test_case_diff_shows_actual_lines_where_right() {
        let (emitted, _) = drive(uppercase, |mut ctx| async move {
            let pairs = vec![
                ("a".to_owned(), "A".to_owned()),
                ("b".to_owned(), "x".to_owned()),
                ("c".to_owned(), "C".to_owned()),
            ];
            let options = TestCasesOptions::default().number_of_runs(1).shuffle(false);
            let mut runs = ctx.run_test_cases(pairs, options);
            let case = runs.next().await.unwrap().unwrap();
            assert!(case.is_failure());
            assert!(runs.next().await.is_none());
        })
        .await;

        assert_eq!(
            emitted[1].result_display,
            ResultDisplay::Diff {
                expected: "A\nx\nC".into(),
                output: "A\nB\nC".into(),
                input: Some("a\nb\nc".into()),
                sep: Some("\n".into()),
                display_mode: DisplayMode::Test,
                input_separator: "\n".into(),
            }
        );
    }

    #[tokio::test]
    async fn missing_output_lines_fail() {
        let respond = |_: &str, _: Option<&str>| {
            RunResponse::Completed(CompiledRunResult {
                stdout: "1\n".into(),
                ..Default::default()
            })
        };
        let (emitted, _) = drive(respond, |mut ctx| async move {
            let pairs = [("x", 1), ("y", 2)];
            let options = TestCasesOptions::default().number_of_runs(1).shuffle(false);
            let cases = ctx.run_test_cases(pairs, options).run_all().await.unwrap();
            assert!(cases[0].is_failure());
        })
        .await;

        let ResultDisplay::Diff { expected, .. } = &emitted[1].result_display else {
            panic!("expected a diff")
        };
        assert_eq!(expected, "1\n2");
    }

    #[tokio::test]
    async fn hands_cover_every_pair_once_per_run() {
        let (_, runs) = drive(echo, |mut ctx| async move {
            let pairs: Vec<_> = (0..6).map(|i| (i.to_string(), i)).collect();
            let options = TestCasesOptions::default()
                .input_separator(" ")
                .output_separator(" ");
            let cases = ctx.run_test_cases(pairs, options).run_all().await.unwrap();
            assert_eq!(cases.len(), 2);
            assert!(cases.iter().all(|c| c.pass == PassState::Pass));
        })
        .await;

        let mut seen: Vec<i32> = runs
            .iter()
            .flat_map(|(_, input)| {
                input
                    .as_deref()
                    .unwrap_or_default()
                    .split(' ')
                    .map(|s| s.parse::<i32>().unwrap())
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(runs[0].1.as_deref().unwrap().split(' ').count(), 4);
        seen.sort();
        assert_eq!(seen, [0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn custom_comparison() {
        let (_, _) = drive(uppercase, |mut ctx| async move {
            let options = TestCasesOptions::default()
                .number_of_runs(1)
                .compare(|actual: &str, expected: &String| actual.eq_ignore_ascii_case(expected));
            let pairs = [("hello", "hello".to_owned())];
            let cases = ctx.run_test_cases(pairs, options).run_all().await.unwrap();
            assert_eq!(cases[0].pass, PassState::Pass);
        })
        .await;
    }

    #[tokio::test]
    async fn no_pairs_means_no_runs() {
        let (emitted, runs) = drive(echo, |mut ctx| async move {
            let pairs: Vec<(String, String)> = Vec::new();
            let cases = ctx
                .run_test_cases(pairs, TestCasesOptions::default())
                .run_all()
                .await
                .unwrap();
            assert!(cases.is_empty());
            assert!(ctx.no_failures().pass);
        })
        .await;
        assert!(emitted.is_empty());
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn filter_cases_expect_kept_items_in_order() {
        let keep_vowels = |_: &str, input: Option<&str>| {
            let kept: Vec<_> = input
                .unwrap_or_default()
                .split(',')
                .filter(|s| s.starts_with(['a', 'e', 'i', 'o', 'u']))
                .collect();
            RunResponse::Completed(CompiledRunResult {
                stdout: kept.join(","),
                ..Default::default()
            })
        };
        let (emitted, _) = drive(keep_vowels, |mut ctx| async move {
            let pairs = [("apple", true), ("kiwi", false), ("orange", true), ("fig", false)];
            let options = FilterCasesOptions::default()
                .input_separator(",")
                .number_of_runs(1)
                .shuffle(false);
            let cases = ctx.run_filter_cases(pairs, options).run_all().await.unwrap();
            assert_eq!(cases.len(), 1);
            assert_eq!(cases[0].pass, PassState::Pass);
        })
        .await;

        let ResultDisplay::Diff {
            expected,
            sep,
            display_mode,
            input_separator,
            ..
        } = &emitted[1].result_display
        else {
            panic!("expected a diff")
        };
        assert_eq!(expected, "apple,orange");
        assert_eq!(sep.as_deref(), Some("\n"));
        assert_eq!(*display_mode, DisplayMode::Filter);
        assert_eq!(input_separator, ",");
    }

    #[tokio::test]
    async fn no_filter_pairs_means_no_runs() {
        let (emitted, runs) = drive(echo, |mut ctx| async move {
            let pairs: Vec<(String, bool)> = Vec::new();
            let runs = ctx.run_filter_cases(pairs, FilterCasesOptions::default());
            assert_eq!(runs.remaining(), 0);
            assert!(runs.run_all().await.unwrap().is_empty());
        })
        .await;
        assert!(emitted.is_empty());
        assert!(runs.is_empty());
    }
}
