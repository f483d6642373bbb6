use serde::de::DeserializeOwned;
use std::{
    fmt,
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    use super::Action;

    pub type Result<T> = std::result::Result<T, self::Error>;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("Cannot {0} '{}': {2}", .1.to_string_lossy())]
        IO(Action, PathBuf, #[source] io::Error),

        #[error("Cannot deserialize from JSON (src='{}'): {1}", .0.to_string_lossy())]
        DeserializeFromJson(PathBuf, #[source] serde_json::Error),
    }

    impl Error {
        pub fn path(&self) -> &std::path::Path {
            match self {
                Error::IO(_, path, _) | Error::DeserializeFromJson(path, _) => path,
            }
        }
    }
}
pub use error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateDir,
    ReadFile,
    WriteFile,
    RemoveFile,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Action::*;
        let a = match self {
            CreateDir => "create dir",
            ReadFile => "read file",
            WriteFile => "write file",
            RemoveFile => "remove file",
        };
        write!(f, "{}", a)
    }
}

fn io_err(action: Action, path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |e| Error::IO(action, path.to_owned(), e)
}

pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(io_err(Action::CreateDir, dir))
}

pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let filepath = filepath.as_ref();
    fs::write(filepath, contents).map_err(io_err(Action::WriteFile, filepath))
}

pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    let filepath = filepath.as_ref();
    fs::read_to_string(filepath).map_err(io_err(Action::ReadFile, filepath))
}

/// Removes the file; a file that is already gone is not an error.
pub fn remove_file_if_exists(filepath: impl AsRef<Path>) -> Result<()> {
    let filepath = filepath.as_ref();
    match fs::remove_file(filepath) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Already removed: {}", filepath.to_string_lossy());
            Ok(())
        }
        res => res.map_err(io_err(Action::RemoveFile, filepath)),
    }
}

pub fn read_json_with_deserialize<P, T>(filepath: P) -> Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let filepath = filepath.as_ref();
    let f = File::open(filepath).map_err(io_err(Action::ReadFile, filepath))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| Error::DeserializeFromJson(filepath.to_owned(), e))
}

/// Joins `name` under `dir`, rejecting names that would escape `dir`.
pub fn child_path(dir: impl AsRef<Path>, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return None;
    }
    Some(dir.as_ref().join(name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn child_path_rejects_traversal() {
        assert_eq!(child_path("/tmp", "code.rs"), Some(PathBuf::from("/tmp/code.rs")));
        assert_eq!(child_path("/tmp", ".."), None);
        assert_eq!(child_path("/tmp", "a/b"), None);
        assert_eq!(child_path("/tmp", ""), None);
    }

    #[test]
    fn read_missing_file_reports_path() {
        let err = read_to_string("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.path(), Path::new("/definitely/not/here.toml"));
        assert!(err.to_string().starts_with("Cannot read file"));
    }

    #[test]
    fn removing_missing_file_is_ok() {
        assert!(remove_file_if_exists("/definitely/not/here.bin").is_ok());
    }
}
