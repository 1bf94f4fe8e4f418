use std::{
    fmt::Display,
    fs::read_to_string,
    path::Path,
    str::FromStr,
};

use indexmap::IndexMap;

use crate::{
    error::{Error, Result},
    path_store::PathStore,
};

/// A named group of `key = value` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    entries: IndexMap<String, String>,
}

impl Section {
    /// Inserts or overwrites `key`. Values are stored as given.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.entries.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Repository configuration: sections in the order they were first seen,
/// persisted in git's INI-like `config` format.
///
/// Mutations only touch memory; call [`Config::save`] to write them out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    sections: IndexMap<String, Section>,
}

/// A malformed line in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

impl Config {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("loading config from {:?}", path);
        let text = read_to_string(path).map_err(|err| Error::io(path, err))?;
        Ok(text.parse()?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        log::debug!("saving config to {:?}", path);
        let (dir, name) = match (path.parent(), path.file_name()) {
            (Some(dir), Some(name)) => (dir, name),
            _ => {
                let err = std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "config path has no file name",
                );
                return Err(Error::io(path, err));
            }
        };
        PathStore::new(dir.to_path_buf()).write_file(&[name], &self.to_string())
    }

    /// Returns the named section, creating an empty one if needed.
    pub fn section(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_owned()).or_default()
    }

    pub fn get_section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.get_section(section)?.get(key)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// Every `(section, key, value)` triple, in document order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.sections()
            .flat_map(|(name, section)| section.iter().map(move |(k, v)| (name, k, v)))
    }
}

impl FromStr for Config {
    type Err = ParseError;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        let mut config = Config::empty();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let error = |message: &str| ParseError {
                line: index + 1,
                message: message.to_owned(),
            };

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| error("unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(error("empty section name"));
                }
                config.section(name);
                current = Some(name.to_owned());
                continue;
            }

            let section = current
                .as_deref()
                .ok_or_else(|| error("key outside of any section"))?;
            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), parse_value(value).map_err(error)?),
                // a bare key is git's shorthand for `key = true`
                None => (line, String::from("true")),
            };
            if key.is_empty() {
                return Err(error("empty key"));
            }
            config.section(section).set(key, &value);
        }

        Ok(config)
    }
}

/// Decodes the text after `=`: double quotes group, backslash escapes,
/// unquoted `#` or `;` starts a comment and unquoted edge whitespace is
/// dropped.
fn parse_value(raw: &str) -> std::result::Result<String, &'static str> {
    let mut value = String::new();
    let mut pending = String::new();
    let mut quoted = false;
    let mut chars = raw.trim_start().chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                value.push_str(&pending);
                pending.clear();
                quoted = !quoted;
            }
            '\\' => {
                let unescaped = match chars.next() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('b') => '\u{8}',
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some(_) => return Err("unknown escape sequence"),
                    None => return Err("line continuations are not supported"),
                };
                value.push_str(&pending);
                pending.clear();
                value.push(unescaped);
            }
            '#' | ';' if !quoted => break,
            c if c.is_whitespace() && !quoted => pending.push(c),
            c => {
                value.push_str(&pending);
                pending.clear();
                value.push(c);
            }
        }
    }

    if quoted {
        return Err("unterminated quoted value");
    }
    Ok(value)
}

/// Writes `value` so that [`parse_value`] gives it back unchanged.
fn write_value(f: &mut std::fmt::Formatter<'_>, value: &str) -> std::fmt::Result {
    let needs_quotes = value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(|c: char| matches!(c, '"' | '\\' | '#' | ';' | '\n' | '\t' | '\u{8}'));
    if !needs_quotes {
        return f.write_str(value);
    }

    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, section) in self.sections() {
            writeln!(f, "[{}]", name)?;
            for (key, value) in section.iter() {
                write!(f, "\t{} = ", key)?;
                write_value(f, value)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
fn default_core() -> Config {
    let mut config = Config::empty();
    config
        .section("core")
        .set("repositoryformatversion", "0")
        .set("filemode", "false")
        .set("bare", "false");
    config
}

#[test]
fn test_section_is_created_once() {
    let mut config = Config::empty();
    config.section("core").set("bare", "false");
    config.section("core").set("bare", "true");
    assert_eq!(config.sections().count(), 1);
    assert_eq!(config.get("core", "bare"), Some("true"));
}

#[test]
fn test_save_then_load_keeps_triples() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("config");
    let config = default_core();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    let expected: Vec<_> = config.entries().collect();
    let actual: Vec<_> = loaded.entries().collect();
    assert_eq!(expected, actual);
}

#[test]
fn test_serialized_layout() {
    assert_eq!(
        default_core().to_string(),
        "[core]\n\trepositoryformatversion = 0\n\tfilemode = false\n\tbare = false\n"
    );
}

#[test]
fn test_parse_git_written_config() {
    let text = "# written by git\n[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\
                \tlogallrefupdates\n\n[remote \"origin\"]\n\turl = https://example.com/r.git\n";
    let config: Config = text.parse().unwrap();
    assert_eq!(config.get("core", "filemode"), Some("true"));
    assert_eq!(config.get("core", "logallrefupdates"), Some("true"));
    assert_eq!(
        config.get("remote \"origin\"", "url"),
        Some("https://example.com/r.git")
    );
}

#[test]
fn test_awkward_values_survive_save_and_load() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("config");
    let mut config = Config::empty();
    config
        .section("core")
        .set("editor", "vim\n[evil]\nbare = true")
        .set("pager", "less # not a comment; really")
        .set("worktree", "C:\\work \"tree\"\t");
    config.section("user").set("name", "  padded  ").set("email", "");
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    let expected: Vec<_> = config.entries().collect();
    let actual: Vec<_> = loaded.entries().collect();
    assert_eq!(expected, actual);
    assert!(loaded.get_section("evil").is_none());
}

#[test]
fn test_parse_quoting_and_comments() {
    let text = "[core]\n\tpager = less -R   # inline comment\n\tname = \"  spaced \"out\n\
                \tpath = \"a\\\\b\"\n";
    let config: Config = text.parse().unwrap();
    assert_eq!(config.get("core", "pager"), Some("less -R"));
    assert_eq!(config.get("core", "name"), Some("  spaced out"));
    assert_eq!(config.get("core", "path"), Some("a\\b"));

    let err = "[core]\n\tname = \"open\n".parse::<Config>().unwrap_err();
    assert_eq!(err.line, 2);
    let err = "[core]\n\tname = bad\\q\n".parse::<Config>().unwrap_err();
    assert_eq!(err.line, 2);
}

#[test]
fn test_parse_errors_report_line() {
    let err = "bare = false\n".parse::<Config>().unwrap_err();
    assert_eq!(err.line, 1);

    let err = "[core]\nbare = false\n[broken\n".parse::<Config>().unwrap_err();
    assert_eq!(err.line, 3);

    let err = "[core]\n = value\n".parse::<Config>().unwrap_err();
    assert_eq!(err.line, 2);
}

#[test]
fn test_load_reports_parse_error() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("config");
    std::fs::write(&path, "[]\n").unwrap();
    match Config::load(&path) {
        Err(Error::Parse(err)) => assert_eq!(err.line, 1),
        other => panic!("expected a parse error, got {:?}", other),
    }
}
