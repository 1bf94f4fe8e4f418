use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    path_store::absolute,
    repository::GIT_DIR,
};

/// Finds the `.git` entry governing `start`, looking at `start` itself and
/// then at each of its ancestors.
///
/// Any kind of entry named `.git` ends the search; it does not have to be a
/// directory. Symlinks are followed, so a dangling `.git` link counts as
/// absent. `start` is made absolute and cleaned of `.` and `..` first, so
/// the walk never leaves the chain of ancestors.
pub fn locate(start: &Path) -> Result<PathBuf> {
    let start = absolute(start)?;
    let mut dir: &Path = &start;
    loop {
        let candidate = dir.join(GIT_DIR);
        log::trace!("looking for {:?}", candidate);
        if matches!(candidate.try_exists(), Ok(true)) {
            log::debug!("found repository metadata at {:?}", candidate);
            return Ok(candidate);
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return Err(Error::RepositoryNotFound),
        }
    }
}

#[test]
fn test_locate_from_nested_directory() {
    let tempdir = tempfile::tempdir().unwrap();
    let a = tempdir.path().join("A");
    let nested = a.join("B").join("C");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::create_dir(a.join(".git")).unwrap();

    assert_eq!(locate(&nested).unwrap(), a.join(".git"));
}

#[test]
fn test_locate_prefers_closest_repository() {
    let tempdir = tempfile::tempdir().unwrap();
    let outer = tempdir.path().join("outer");
    let inner = outer.join("inner");
    std::fs::create_dir_all(inner.join(".git")).unwrap();
    std::fs::create_dir_all(outer.join(".git")).unwrap();

    assert_eq!(locate(&inner).unwrap(), inner.join(".git"));
}

#[test]
fn test_locate_never_descends_through_parent_components() {
    let tempdir = tempfile::tempdir().unwrap();
    let sub = tempdir.path().join("sub");
    std::fs::create_dir_all(sub.join(".git")).unwrap();

    match locate(&sub.join("..")) {
        Ok(found) => assert_ne!(found, sub.join(".git")),
        Err(err) => assert!(matches!(err, Error::RepositoryNotFound)),
    }
    assert_eq!(
        locate(&sub.join("..").join("sub")).unwrap(),
        sub.join(".git")
    );
}

#[cfg(unix)]
#[test]
fn test_locate_skips_dangling_symlink() {
    let tempdir = tempfile::tempdir().unwrap();
    let outer = tempdir.path().join("outer");
    let inner = outer.join("inner");
    std::fs::create_dir_all(outer.join(".git")).unwrap();
    std::fs::create_dir_all(&inner).unwrap();
    std::os::unix::fs::symlink(tempdir.path().join("gone"), inner.join(".git")).unwrap();

    assert_eq!(locate(&inner).unwrap(), outer.join(".git"));
}

#[test]
fn test_locate_accepts_git_file() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(tempdir.path().join(".git"), "gitdir: elsewhere\n").unwrap();
    assert_eq!(locate(tempdir.path()).unwrap(), tempdir.path().join(".git"));
}

#[test]
fn test_locate_without_repository() {
    // the temporary directory may itself live inside a checkout, so probe
    // from the root instead, where no `.git` is expected
    let root = Path::new("/");
    if root.join(GIT_DIR).exists() {
        return;
    }
    match locate(root) {
        Err(Error::RepositoryNotFound) => {}
        other => panic!("expected RepositoryNotFound, got {:?}", other),
    }
}
