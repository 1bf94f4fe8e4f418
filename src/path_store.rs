use std::{
    fmt::Display,
    fs::{create_dir_all, metadata, File},
    io::Write,
    path::{Component, Path, PathBuf},
};

use crate::error::{Error, Result};

/// Filesystem helpers scoped to a single root directory.
///
/// Every path handed to a [`PathStore`] is a list of relative segments that
/// gets joined onto the root, so callers never build absolute paths by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStore {
    root: PathBuf,
}

/// The first directory [`PathStore::ensure_dirs`] could not create.
#[derive(Debug)]
pub struct DirectoryFailure {
    /// Position of the failing entry in the requested list.
    pub index: usize,
    pub error: Error,
}

impl From<DirectoryFailure> for Error {
    fn from(failure: DirectoryFailure) -> Self {
        failure.error
    }
}

impl Display for DirectoryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "directory #{}: {}", self.index, self.error)
    }
}

/// Makes `path` absolute against the current directory and removes `.` and
/// `..` components without touching the filesystem.
///
/// `..` at the root stays at the root.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = std::path::absolute(path).map_err(|err| Error::io(path, err))?;
    let mut clean = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    Ok(clean)
}

impl PathStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Makes sure the root directory itself exists.
    pub fn ensure_root(&self) -> Result<bool> {
        self.ensure_dir::<&str>(&[])
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn join<S: AsRef<Path>>(&self, segments: &[S]) -> PathBuf {
        let mut path = self.root.clone();
        for segment in segments {
            path.push(segment);
        }
        path
    }

    /// Whether the joined path is a regular file. Errors count as absent.
    pub fn has_file<S: AsRef<Path>>(&self, segments: &[S]) -> bool {
        metadata(self.join(segments))
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub fn has_dir<S: AsRef<Path>>(&self, segments: &[S]) -> bool {
        metadata(self.join(segments))
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Makes sure the directory exists, creating missing ancestors.
    ///
    /// Returns `Ok(true)` both when the directory was already there and when
    /// it has just been created.
    pub fn ensure_dir<S: AsRef<Path>>(&self, segments: &[S]) -> Result<bool> {
        if self.has_dir(segments) {
            return Ok(true);
        }
        let path = self.join(segments);
        log::debug!("creating directory {:?}", path);
        create_dir_all(&path).map_err(|err| Error::io(path, err))?;
        Ok(true)
    }

    /// Runs [`PathStore::ensure_dir`] over `paths` in order and stops at the
    /// first failure. Directories created before the failure are left behind.
    pub fn ensure_dirs<S: AsRef<Path>>(
        &self,
        paths: &[&[S]],
    ) -> std::result::Result<(), DirectoryFailure> {
        for (index, segments) in paths.iter().enumerate() {
            self.ensure_dir(*segments)
                .map_err(|error| DirectoryFailure { index, error })?;
        }
        Ok(())
    }

    /// Creates or truncates the file and writes `content` to it.
    pub fn write_file<S: AsRef<Path>>(&self, segments: &[S], content: &str) -> Result<()> {
        let path = self.join(segments);
        log::debug!("writing {} bytes to {:?}", content.len(), path);
        let mut file = File::create(&path).map_err(|err| Error::io(&path, err))?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|err| Error::io(&path, err))
    }
}

#[test]
fn test_absolute_removes_dot_components() {
    let tempdir = tempfile::tempdir().unwrap();
    let messy = tempdir.path().join("sub").join(".").join("..").join("other");
    assert_eq!(absolute(&messy).unwrap(), tempdir.path().join("other"));
    assert_eq!(absolute(Path::new("/..")).unwrap(), Path::new("/"));

    let relative = absolute(Path::new("a/../b")).unwrap();
    assert_eq!(relative, std::env::current_dir().unwrap().join("b"));
}

#[test]
fn test_ensure_root_creates_missing_ancestors() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path().join("one").join("two");
    let store = PathStore::new(root.clone());
    assert!(store.ensure_root().unwrap());
    assert!(store.ensure_root().unwrap());
    assert!(root.is_dir());
}

#[test]
fn test_has_file_and_has_dir_distinguish_kinds() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = PathStore::new(tempdir.path().into());
    std::fs::create_dir(tempdir.path().join("dir")).unwrap();
    std::fs::write(tempdir.path().join("file"), "x").unwrap();

    assert!(store.has_dir(&["dir"]));
    assert!(!store.has_file(&["dir"]));
    assert!(store.has_file(&["file"]));
    assert!(!store.has_dir(&["file"]));
    assert!(!store.has_file(&["missing"]));
    assert!(!store.has_dir(&["missing"]));
}

#[test]
fn test_ensure_dir_is_idempotent() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = PathStore::new(tempdir.path().into());
    assert!(store.ensure_dir(&["refs", "heads"]).unwrap());
    assert!(store.ensure_dir(&["refs", "heads"]).unwrap());
    assert!(tempdir.path().join("refs/heads").is_dir());
}

#[test]
fn test_ensure_dir_fails_on_file_collision() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = PathStore::new(tempdir.path().into());
    std::fs::write(tempdir.path().join("objects"), "").unwrap();
    match store.ensure_dir(&["objects"]) {
        Err(Error::Io { path, .. }) => assert_eq!(path, tempdir.path().join("objects")),
        other => panic!("expected an io error, got {:?}", other),
    }
}

#[test]
fn test_ensure_dirs_stops_at_first_failure() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = PathStore::new(tempdir.path().into());
    std::fs::write(tempdir.path().join("blocked"), "").unwrap();

    let paths: [&[&str]; 3] = [&["first"], &["blocked", "inner"], &["last"]];
    let failure = store.ensure_dirs(&paths).unwrap_err();
    assert_eq!(failure.index, 1);
    assert!(store.has_dir(&["first"]));
    assert!(!store.has_dir(&["last"]));
}

#[test]
fn test_write_file_truncates() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = PathStore::new(tempdir.path().into());
    store.write_file(&["HEAD"], "a much longer first line\n").unwrap();
    store.write_file(&["HEAD"], "short\n").unwrap();
    assert_eq!(
        std::fs::read_to_string(tempdir.path().join("HEAD")).unwrap(),
        "short\n"
    );
}
