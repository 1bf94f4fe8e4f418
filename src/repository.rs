use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    error::{Error, Result},
    locate::locate,
    path_store::{absolute, PathStore},
};

/// Name of the metadata directory inside a work tree.
pub const GIT_DIR: &str = ".git";

pub const DEFAULT_DESCRIPTION: &str =
    "Unnamed repository; edit this file 'description' to name the repository.\n";
pub const DEFAULT_HEAD: &str = "ref: refs/heads/master\n";

/// The only `core.repositoryformatversion` this implementation understands.
pub const FORMAT_VERSION: &str = "0";

/// Directories every fresh repository gets, in creation order.
const SKELETON: &[&[&str]] = &[
    &["branches"],
    &["objects"],
    &["refs", "tags"],
    &["refs", "heads"],
];

/// A work tree together with its `.git` directory and parsed configuration.
#[derive(Debug)]
pub struct Repository {
    work_tree: PathBuf,
    git_dir: PathStore,
    config: Config,
}

impl Repository {
    /// Opens the repository containing `work_tree`, searching upwards.
    ///
    /// The returned work tree is the directory holding the `.git` entry that
    /// was found, which may be an ancestor of `work_tree`.
    pub fn open(work_tree: &Path) -> Result<Self> {
        let git_dir = locate(work_tree)?;
        let work_tree = git_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or(Error::RepositoryNotFound)?;
        let paths = PathStore::new(git_dir);

        if !paths.has_file(&["config"]) {
            return Err(Error::MissingConfiguration(paths.root().to_path_buf()));
        }
        let config = Config::load(&paths.join(&["config"]))?;

        match config.get("core", "repositoryformatversion") {
            Some(FORMAT_VERSION) => {}
            found => return Err(Error::UnsupportedFormatVersion(found.map(str::to_owned))),
        }

        log::info!("opened repository at {:?}", work_tree);
        Ok(Self {
            work_tree,
            git_dir: paths,
            config,
        })
    }

    /// A handle for a repository that may not exist yet. Touches nothing on disk.
    pub fn fresh(work_tree: PathBuf) -> Self {
        let git_dir = PathStore::new(work_tree.join(GIT_DIR));
        Self {
            work_tree,
            git_dir,
            config: Config::empty(),
        }
    }

    /// Creates a repository at `path`, making the directory if needed.
    ///
    /// Running this on an existing repository rewrites `description`, `HEAD`
    /// and `config` and leaves everything else alone. A failure part way
    /// through leaves whatever was already created in place.
    pub fn init(path: &Path) -> Result<Self> {
        let work_tree = absolute(path)?;
        log::info!("initializing repository in {:?}", work_tree);

        let work_tree_store = PathStore::new(work_tree);
        work_tree_store.ensure_root()?;

        let mut repo = Self::fresh(work_tree_store.root().to_path_buf());
        repo.git_dir.ensure_dirs(SKELETON)?;
        repo.git_dir.write_file(&["description"], DEFAULT_DESCRIPTION)?;
        repo.git_dir.write_file(&["HEAD"], DEFAULT_HEAD)?;

        repo.config
            .section("core")
            .set("repositoryformatversion", FORMAT_VERSION)
            // permission bits are not tracked
            .set("filemode", "false")
            .set("bare", "false");
        repo.save_config()?;

        log::info!("initialized repository in {:?}", repo.git_dir());
        Ok(repo)
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn git_dir(&self) -> &Path {
        self.git_dir.root()
    }

    /// Filesystem helpers rooted at the `.git` directory.
    pub fn paths(&self) -> &PathStore {
        &self.git_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Writes the in-memory configuration to `.git/config`.
    pub fn save_config(&self) -> Result<()> {
        self.git_dir.write_file(&["config"], &self.config.to_string())
    }

    pub fn join<S: AsRef<Path>>(&self, segments: &[S]) -> PathBuf {
        self.git_dir.join(segments)
    }

    pub fn has_file<S: AsRef<Path>>(&self, segments: &[S]) -> bool {
        self.git_dir.has_file(segments)
    }

    pub fn has_dir<S: AsRef<Path>>(&self, segments: &[S]) -> bool {
        self.git_dir.has_dir(segments)
    }
}

#[cfg(test)]
fn read(path: PathBuf) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_fresh_does_not_touch_disk() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::fresh(tempdir.path().into());
    assert_eq!(repo.git_dir(), tempdir.path().join(".git"));
    assert_eq!(repo.config().sections().count(), 0);
    assert!(!tempdir.path().join(".git").exists());
}

#[test]
fn test_init_builds_skeleton() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path()).unwrap();

    for dir in SKELETON {
        assert!(repo.has_dir(*dir), "missing {:?}", dir);
    }
    assert!(repo.has_file(&["description"]));
    assert_eq!(read(repo.join(&["description"])), DEFAULT_DESCRIPTION);
    assert_eq!(read(repo.join(&["HEAD"])), "ref: refs/heads/master\n");

    let config = Config::load(&repo.join(&["config"])).unwrap();
    assert_eq!(config.get("core", "repositoryformatversion"), Some("0"));
    assert_eq!(config.get("core", "filemode"), Some("false"));
    assert_eq!(config.get("core", "bare"), Some("false"));
}

#[test]
fn test_init_creates_missing_target() {
    let tempdir = tempfile::tempdir().unwrap();
    let target = tempdir.path().join("demo").join("nested");
    let repo = Repository::init(&target).unwrap();
    assert_eq!(repo.work_tree(), target);
    assert!(target.join(".git").join("HEAD").is_file());
}

#[test]
fn test_init_cleans_parent_components() {
    let tempdir = tempfile::tempdir().unwrap();
    let target = tempdir.path().join("a").join("..").join("b").join(".");
    let repo = Repository::init(&target).unwrap();
    assert_eq!(repo.work_tree(), tempdir.path().join("b"));
    assert_eq!(repo.git_dir(), tempdir.path().join("b").join(".git"));
    assert!(!tempdir.path().join("a").exists());
}

#[test]
fn test_init_rejects_file_as_target() {
    let tempdir = tempfile::tempdir().unwrap();
    let target = tempdir.path().join("plain");
    std::fs::write(&target, "").unwrap();
    match Repository::init(&target) {
        Err(Error::Io { path, .. }) => assert_eq!(path, target),
        other => panic!("expected an io error, got {:?}", other),
    }
}

#[test]
fn test_init_twice_keeps_extra_files() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path()).unwrap();
    let stray = repo.join(&["objects", "keep-me"]);
    std::fs::write(&stray, "payload").unwrap();
    std::fs::write(repo.join(&["HEAD"]), "ref: refs/heads/other\n").unwrap();

    let repo = Repository::init(tempdir.path()).unwrap();
    assert_eq!(read(stray), "payload");
    assert_eq!(read(repo.join(&["HEAD"])), DEFAULT_HEAD);
    assert_eq!(repo.config().get("core", "bare"), Some("false"));
}

#[test]
fn test_init_surfaces_skeleton_failure() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(tempdir.path().join(".git")).unwrap();
    std::fs::write(tempdir.path().join(".git").join("refs"), "").unwrap();

    match Repository::init(tempdir.path()) {
        Err(Error::Io { path, .. }) => assert!(path.ends_with("refs/tags")),
        other => panic!("expected an io error, got {:?}", other),
    }
    // created before the failure, not rolled back
    assert!(tempdir.path().join(".git/objects").is_dir());
    assert!(!tempdir.path().join(".git/HEAD").exists());
}

#[test]
fn test_open_from_nested_directory() {
    let tempdir = tempfile::tempdir().unwrap();
    Repository::init(tempdir.path()).unwrap();
    let nested = tempdir.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();

    let repo = Repository::open(&nested).unwrap();
    assert_eq!(repo.work_tree(), tempdir.path());
    assert_eq!(repo.git_dir(), tempdir.path().join(".git"));
    assert_eq!(repo.config().get("core", "filemode"), Some("false"));
}

#[test]
fn test_open_without_config() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(tempdir.path().join(".git")).unwrap();
    match Repository::open(tempdir.path()) {
        Err(Error::MissingConfiguration(git_dir)) => {
            assert_eq!(git_dir, tempdir.path().join(".git"))
        }
        other => panic!("expected MissingConfiguration, got {:?}", other),
    }
}

#[test]
fn test_open_git_file_without_config() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(tempdir.path().join(".git"), "gitdir: elsewhere\n").unwrap();
    assert!(matches!(
        Repository::open(tempdir.path()),
        Err(Error::MissingConfiguration(_))
    ));
}

#[test]
fn test_open_rejects_unknown_format_version() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(tempdir.path()).unwrap();
    repo.config_mut()
        .section("core")
        .set("repositoryformatversion", "1");
    repo.save_config().unwrap();

    match Repository::open(tempdir.path()) {
        Err(Error::UnsupportedFormatVersion(Some(found))) => assert_eq!(found, "1"),
        other => panic!("expected UnsupportedFormatVersion, got {:?}", other),
    }
}

#[test]
fn test_open_propagates_parse_error() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path()).unwrap();
    std::fs::write(repo.join(&["config"]), "not = in a section\n").unwrap();
    assert!(matches!(
        Repository::open(tempdir.path()),
        Err(Error::Parse(_))
    ));
}
