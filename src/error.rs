use std::{fmt::Display, path::PathBuf};

use derive_more::From;

use crate::config::ParseError;

/// Everything that can go wrong while finding, opening or creating a repository.
#[derive(Debug, From)]
pub enum Error {
    /// No `.git` entry between the starting directory and the filesystem root.
    RepositoryNotFound,
    /// The metadata directory exists but holds no `config` file.
    MissingConfiguration(PathBuf),
    /// `core.repositoryformatversion` is absent or not `0`.
    UnsupportedFormatVersion(Option<String>),
    #[from]
    Parse(ParseError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Failures caused by the state of the repository rather than by the
    /// operating system.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::RepositoryNotFound
                | Error::MissingConfiguration(_)
                | Error::UnsupportedFormatVersion(_)
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Error::RepositoryNotFound
            | Error::MissingConfiguration(_)
            | Error::UnsupportedFormatVersion(_) => 128,
            Error::Parse(_) => 3,
            Error::Io { .. } => 74,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RepositoryNotFound => {
                write!(f, "not a git repository (or any of the parent directories): .git")
            }
            Error::MissingConfiguration(git_dir) => {
                write!(f, "configuration file missing in {}", git_dir.display())
            }
            Error::UnsupportedFormatVersion(Some(found)) => {
                write!(f, "expected git repo version <= 0, found {}", found)
            }
            Error::UnsupportedFormatVersion(None) => {
                write!(f, "core.repositoryformatversion is not set")
            }
            Error::Parse(err) => write!(f, "bad config file: {}", err),
            Error::Io { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[test]
fn test_exit_codes_separate_expected_failures() {
    let not_found = Error::RepositoryNotFound;
    let io = Error::io(
        "/nowhere",
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    );
    assert!(not_found.is_expected());
    assert!(!io.is_expected());
    assert_ne!(not_found.exit_code(), io.exit_code());
    assert_eq!(io.to_string(), "/nowhere: denied");
}
