use std::path::{Path, PathBuf};

use anyhow::Context as _;
use heist_core::session::Session;
use tokio::io::AsyncReadExt;

pub fn current_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("Failed to get current dir")
}

pub fn replace_homedir_to_tilde(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    let Some(home_dir) = ::dirs::home_dir() else {
        return path
    };
    path.strip_prefix(home_dir)
        .map(|path| Path::new("~").join(path))
        .unwrap_or(path)
}

/// Reads the session JSON from `file`, or from stdin when no file is given.
pub async fn read_session(file: Option<&Path>) -> anyhow::Result<Session> {
    if let Some(path) = file {
        return fsutil::read_json_with_deserialize(path)
            .with_context(|| format!("Invalid session file: {}", path.to_string_lossy()));
    }

    let mut json = String::new();
    tokio::io::stdin()
        .read_to_string(&mut json)
        .await
        .context("Failed to read the session from stdin")?;
    Session::from_json(&json).context("Invalid session JSON on stdin")
}
