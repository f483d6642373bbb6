use heist_core::config::{LimitsConfig, RunnerConfig};
use heist_core::lang::Lang;
use heist_core::protocol::{JsonStream, JsonWriter, JudgeMessage};
use heist_core::runner::{CodeRunner, LangRunner, TimeBudget};
use heist_core::session::{run_in_process, run_judge_side, Session};
use heist_core::verdict::{FinalVerdict, PassState, ResultDisplay, TestCase};

fn sh_lang() -> Lang {
    Lang {
        name: "sh".into(),
        run_command: vec!["sh".into(), "${FILE_LOCATION}".into()],
        extension: ".sh".into(),
        ..Default::default()
    }
}

const ADDER: &str = r#"while read a b || [ -n "$a" ]; do echo $((a + b)); done"#;

const SUM_JUDGE: &str = r#"
[[step]]
kind = "run"
input = "20 22"
expect = "42"
name = "Example"

[[step]]
kind = "test-cases"
cases = [["1 2", "3"], ["5 5", "10"], ["0 7", "7"], ["100 -1", "99"], ["3 3", "6"]]

[verdict]
points = 7
"#;

fn session(code: &str, judge: &str) -> Session {
    Session {
        code: code.into(),
        lang: Some(sh_lang()),
        judge: judge.into(),
        max_code_size: None,
        max_input_size: None,
    }
}

async fn in_process(session: &Session) -> Vec<String> {
    in_process_within(session, TimeBudget::default()).await
}

async fn in_process_within(session: &Session, budget: TimeBudget) -> Vec<String> {
    let mut out = Vec::new();
    let limits = session.limits(&LimitsConfig::default());
    // The verdict itself is checked through the output lines.
    let _ = run_in_process(session, &RunnerConfig::default(), limits, budget, &mut out).await;
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

fn parse_cases(lines: &[String]) -> Vec<TestCase> {
    lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn correct_submission_passes() {
    let lines = in_process(&session(ADDER, SUM_JUDGE)).await;

    let (verdict, cases) = lines.split_last().unwrap();
    assert_eq!(verdict, r#"{"pass":true,"points":7}"#);

    let cases = parse_cases(cases);
    assert_eq!(cases[0].name.as_deref(), Some("Run #1"));
    assert_eq!(cases[1].name.as_deref(), Some("Example"));
    assert_eq!(cases[1].pass, PassState::Pass);
    assert!(cases.iter().all(|c| !c.is_failure()));

    let runs = cases.iter().filter(|c| c.pass == PassState::Info).count();
    let batches = cases.iter().filter(|c| c.pass == PassState::Pass).count() - 1;
    assert_eq!(runs, 1 + batches);
    assert_eq!(batches, 2);
}

#[tokio::test]
async fn wrong_submission_fails_with_diff() {
    let lines = in_process(&session("echo 42", SUM_JUDGE)).await;

    assert_eq!(lines.last().unwrap(), r#"{"pass":false}"#);
    let cases = parse_cases(&lines[..lines.len() - 1]);
    assert_eq!(cases[1].pass, PassState::Pass);
    let failed: Vec<_> = cases.iter().filter(|c| c.is_failure()).collect();
    assert_eq!(failed.len(), 2);
    assert!(matches!(
        &failed[0].result_display,
        ResultDisplay::Diff { output, .. } if output == "42\n"
    ));
}

#[tokio::test]
async fn oversized_code_reports_the_limit() {
    let mut s = session(ADDER, SUM_JUDGE);
    s.max_code_size = Some(10);
    let lines = in_process(&s).await;

    assert_eq!(lines.len(), 2);
    let case: TestCase = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(case.pass, PassState::Fail);
    assert_eq!(
        case.result_display,
        ResultDisplay::Text("Expected code to have at most 10 bytes".into())
    );
    assert_eq!(lines[1], r#"{"pass":false}"#);
}

#[tokio::test]
async fn slow_submission_exceeds_the_run_budget() {
    let s = session("sleep 5", "[[step]]\nkind = \"run\"\ninput = \"\"\nexpect = \"\"");
    let budget = TimeBudget {
        run: Some(std::time::Duration::from_millis(300)),
        ..Default::default()
    };
    let started = std::time::Instant::now();
    let lines = in_process_within(&s, budget).await;
    assert!(started.elapsed() < std::time::Duration::from_secs(3));

    assert_eq!(lines.len(), 2, "{:?}", lines);
    let case: TestCase = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(case.pass, PassState::Fail);
    assert_eq!(
        case.result_display,
        ResultDisplay::Text("Time limit exceeded: run took longer than 300ms in total".into())
    );
    assert_eq!(lines[1], r#"{"pass":false}"#);
}

#[tokio::test]
async fn compile_failure_is_a_warning() {
    let mut s = session("anything", SUM_JUDGE);
    s.lang = Some(Lang {
        name: "never-compiles".into(),
        compile_command: vec!["sh".into(), "-c".into(), "echo 'bad code' >&2; exit 1".into()],
        run_command: vec!["${OUTPUT_LOCATION}".into()],
        ..Default::default()
    });
    let lines = in_process(&s).await;

    let cases = parse_cases(&lines[..lines.len() - 1]);
    assert_eq!(cases[0].pass, PassState::Warning);
    assert_eq!(
        cases[0].result_display,
        ResultDisplay::Run {
            input: Some("20 22".into()),
            output: "".into(),
            error: "bad code\n".into(),
        }
    );
    assert_eq!(lines.last().unwrap(), r#"{"pass":false}"#);
}

#[tokio::test]
async fn invalid_judge_is_fatal() {
    let s = session(ADDER, "[[step]]\nkind = \"nope\"");
    let mut out = Vec::new();
    let limits = s.limits(&LimitsConfig::default());
    let res =
        run_in_process(&s, &RunnerConfig::default(), limits, TimeBudget::default(), &mut out).await;
    assert!(res.is_err());

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with(r#"{"error":"Failed to load judge program"#));
}

#[tokio::test]
async fn split_session_talks_the_wire_protocol() {
    let s = session(ADDER, SUM_JUDGE);
    let limits = s.limits(&LimitsConfig::default());

    let (judge_out, host_in) = tokio::io::duplex(1024);
    let (host_out, judge_in) = tokio::io::duplex(1024);

    let judge = async move {
        let verdict = run_judge_side(&s, limits, judge_in, judge_out).await;
        verdict.unwrap()
    };
    let host = async move {
        let mut runner = LangRunner::new(sh_lang()).unwrap();
        let mut messages = JsonStream::new(host_in);
        let mut responses = JsonWriter::new(host_out);
        let mut requests = 0;
        let mut cases = Vec::new();
        let mut verdict = None;
        while let Some(message) = messages.next::<JudgeMessage>().await.unwrap() {
            match message {
                JudgeMessage::RunRequest(req) => {
                    requests += 1;
                    let res = runner.run(&req.code, req.input.as_deref()).await.unwrap();
                    responses.write_line(&res).await.unwrap();
                }
                JudgeMessage::TestCase(case) => cases.push(case),
                JudgeMessage::FinalVerdict(v) => verdict = Some(v),
                JudgeMessage::Fatal(e) => panic!("judge failed: {}", e.error),
            }
        }
        (requests, cases, verdict)
    };

    let (judge_verdict, (requests, cases, verdict)) = tokio::join!(judge, host);
    assert_eq!(judge_verdict, FinalVerdict::new(true).with_points(7));
    assert_eq!(verdict, Some(judge_verdict));
    assert_eq!(requests, 3);
    assert_eq!(cases.len(), 6);
}
