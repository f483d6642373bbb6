use serde::{Deserialize, Serialize};

use crate::runner::Timers;

/// How to compile and run one language, as given in the session input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lang {
    pub name: String,
    #[serde(default)]
    pub compile_command: Vec<String>,
    pub run_command: Vec<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
    #[serde(default)]
    pub extension: String,
    /// Time on top of the configured per-phase budgets, for slow toolchains.
    #[serde(default, skip_serializing_if = "Timers::is_zero")]
    pub extra_runtime: Timers,
}

impl Lang {
    pub fn is_compiled(&self) -> bool {
        !self.compile_command.is_empty()
    }

    /// File name the submission is written to, e.g. `code.rs`.
    pub fn source_file_name(&self) -> String {
        format!("code{}", self.extension)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_ignores_install_fields() {
        let json = r#"{
            "name": "rust",
            "compileCommand": ["${LANG_LOCATION}/bin/rustc", "${FILE_LOCATION}", "-o", "${OUTPUT_LOCATION}"],
            "runCommand": ["${OUTPUT_LOCATION}"],
            "env": [["PATH", "/usr/bin:/bin"]],
            "installEnv": [],
            "plugin": "https://example.com/asdf-rust.git",
            "latestVersion": "1.85.0",
            "extension": ".rs"
        }"#;
        let lang: Lang = serde_json::from_str(json).unwrap();
        assert!(lang.is_compiled());
        assert_eq!(lang.env, [("PATH".to_owned(), "/usr/bin:/bin".to_owned())]);
        assert_eq!(lang.source_file_name(), "code.rs");
    }

    #[test]
    fn extra_runtime_is_given_in_seconds() {
        let lang: Lang = serde_json::from_str(
            r#"{"name":"java","runCommand":["java","Main"],"extraRuntime":{"compile":2.5,"run":1}}"#,
        )
        .unwrap();
        assert_eq!(lang.extra_runtime.compile, std::time::Duration::from_millis(2500));
        assert_eq!(lang.extra_runtime.run, std::time::Duration::from_secs(1));
        assert_eq!(lang.extra_runtime.judge, std::time::Duration::ZERO);

        let plain = Lang::default();
        assert!(!serde_json::to_string(&plain).unwrap().contains("extraRuntime"));
    }

    #[test]
    fn interpreted_language_has_no_compile_step() {
        let lang: Lang =
            serde_json::from_str(r#"{"name":"sh","runCommand":["sh","${FILE_LOCATION}"]}"#).unwrap();
        assert!(!lang.is_compiled());
        assert_eq!(lang.source_file_name(), "code");
    }
}
