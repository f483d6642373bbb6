//! One judging session: a submission, its language and the judge program to run it through.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::{LimitsConfig, RunnerConfig};
use crate::judge::{Driver, JudgeError};
use crate::lang::Lang;
use crate::protocol::shared_writer;
use crate::runner::{RemoteRunner, SizeLimits, TimeBudget};
use crate::verdict::FinalVerdict;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub code: String,
    /// Needed wherever the submission is executed; the judge side of a split session ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Lang>,
    /// Text of the judge program.
    pub judge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_code_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_size: Option<usize>,
}

impl Session {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Configured limits, overridden by the session's own.
    pub fn limits(&self, config: &LimitsConfig) -> SizeLimits {
        SizeLimits {
            max_code_size: self.max_code_size.or(Some(config.max_code_size)),
            max_input_size: self.max_input_size.or(Some(config.max_input_size)),
        }
    }

    /// Configured phase budgets plus whatever extra time the session's language asks for.
    pub fn time_budget(&self, config: &LimitsConfig) -> TimeBudget {
        let budget = config.time_budget();
        match &self.lang {
            Some(lang) => budget.extended_by(&lang.extra_runtime),
            None => budget,
        }
    }
}

/// Runs the judge and the submission in this process, writing the session output to `out`.
pub async fn run_in_process<W>(
    session: &Session,
    runner_config: &RunnerConfig,
    limits: SizeLimits,
    budget: TimeBudget,
    out: W,
) -> Result<FinalVerdict, JudgeError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut driver = Driver::new(shared_writer(out)).limits(limits);

    let runner = match &session.lang {
        Some(lang) => runner_config
            .build_runner(lang.clone(), limits)
            .map(|runner| runner.budget(budget))
            .map_err(JudgeError::from),
        None => Err(anyhow::anyhow!("Session has no lang to run the code with").into()),
    };
    let mut runner = match runner {
        Ok(runner) => runner,
        Err(e) => {
            driver.abort(&e).await;
            return Err(e);
        }
    };

    driver
        .run_program(&session.judge, &session.code, &mut runner)
        .await
}

/// Runs the judge side of a split session: run requests and the session output go to `out`,
/// run results are read from `responses`.
pub async fn run_judge_side<R, W>(
    session: &Session,
    limits: SizeLimits,
    responses: R,
    out: W,
) -> Result<FinalVerdict, JudgeError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let out = shared_writer(out);
    let mut runner = RemoteRunner::new(out.clone(), responses).limits(limits);
    Driver::new(out)
        .limits(limits)
        .run_program(&session.judge, &session.code, &mut runner)
        .await
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn session_limits_override_config() {
        let session = Session::from_json(
            r#"{"code":"x","judge":"","max_code_size":10}"#,
        )
        .unwrap();
        assert_eq!(session.lang, None);
        assert_eq!(
            session.limits(&LimitsConfig::default()),
            SizeLimits {
                max_code_size: Some(10),
                max_input_size: Some(65536),
            }
        );
    }

    #[test]
    fn lang_extra_runtime_extends_the_budget() {
        let session = Session::from_json(
            r#"{"code":"x","judge":"","lang":{"name":"java","runCommand":["java"],"extraRuntime":{"run":2}}}"#,
        )
        .unwrap();
        let budget = session.time_budget(&LimitsConfig::default());
        assert_eq!(budget.run, Some(std::time::Duration::from_secs(5)));
        assert_eq!(budget.compile, Some(std::time::Duration::from_secs(1)));
        assert_eq!(budget.judge, Some(std::time::Duration::from_secs(1)));
    }

    #[test]
    fn serialize_skips_missing_fields() {
        let session = Session {
            code: "print(1)".into(),
            lang: None,
            judge: "[[step]]".into(),
            max_code_size: None,
            max_input_size: Some(3),
        };
        assert_eq!(
            serde_json::to_string(&session).unwrap(),
            r#"{"code":"print(1)","judge":"[[step]]","max_input_size":3}"#
        );
    }
}
