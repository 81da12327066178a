//! Filesystem path completion
//!
//! Given a partially typed path, list what it could complete to. Every I/O
//! failure is converted into "no entries" at [`list_directory`]: a completion
//! request must never fail because a directory vanished or is unreadable.

use std::fs;
use std::path::{PathBuf, MAIN_SEPARATOR};

use tracing::trace;

/// How a partial path was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolution {
    /// Entries of the path's directory part whose names start with its last
    /// component. `dir_prefix` is the typed text up to and including the
    /// last separator (empty for bare names).
    Siblings { dir_prefix: String, names: Vec<String> },
    /// The path named exactly one directory; these are its entries.
    Children(Vec<String>),
    /// The path named exactly one file: the path followed by a space.
    Exact(String),
}

impl PathResolution {
    pub fn into_candidates(self) -> Vec<String> {
        match self {
            PathResolution::Siblings { names, .. } => names,
            PathResolution::Children(names) => names,
            PathResolution::Exact(path) => vec![path],
        }
    }
}

pub fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Replace a leading `~` with the user's home directory.
///
/// `~user` forms are left alone, as is everything when no home directory is
/// known.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with(is_separator) {
            if let Some(home) = dirs::home_dir() {
                let rest = rest.trim_start_matches(is_separator);
                return if rest.is_empty() { home } else { home.join(rest) };
            }
        }
    }
    PathBuf::from(path)
}

/// List `path`, suffixing subdirectories with the path separator.
///
/// Missing paths, permission errors and non-directories all yield an empty
/// list. Names are sorted.
pub fn list_directory(path: &str) -> Vec<String> {
    let root = expand_home(path);
    let entries = match fs::read_dir(&root) {
        Ok(entries) => entries,
        Err(e) => {
            trace!("Cannot list {:?}: {}", root, e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                trace!("Skipping unreadable entry in {:?}: {}", root, e);
                None
            }
        })
        .map(|entry| {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks, so a link to a directory completes like one
            if entry.path().is_dir() {
                name.push(MAIN_SEPARATOR);
            }
            name
        })
        .collect();
    names.sort();
    names
}

/// Split a typed path into `(dir_prefix, listing_dir, rest)`.
///
/// `dir_prefix` keeps the separator so it can be glued back in front of a
/// sibling name; `listing_dir` is what to hand to [`list_directory`].
fn split_path(path: &str) -> (&str, &str, &str) {
    match path.rfind(is_separator) {
        Some(idx) => {
            let sep_len = path[idx..].chars().next().map_or(1, char::len_utf8);
            let dir_prefix = &path[..idx + sep_len];
            let rest = &path[idx + sep_len..];
            let trimmed = dir_prefix.trim_end_matches(is_separator);
            let listing_dir = if trimmed.is_empty() { dir_prefix } else { trimmed };
            (dir_prefix, listing_dir, rest)
        }
        None => ("", ".", path),
    }
}

/// Work out what a partial path could complete to.
pub fn resolve_path(path: &str) -> PathResolution {
    if path.is_empty() || path == "." {
        return PathResolution::Siblings {
            dir_prefix: String::new(),
            names: list_directory("."),
        };
    }

    let expanded = expand_home(path);
    // `dir/` lists the same names either way; report them as children
    if path.ends_with(is_separator) && expanded.is_dir() {
        return PathResolution::Children(list_directory(path));
    }

    let (dir_prefix, listing_dir, rest) = split_path(path);
    let names: Vec<String> = list_directory(listing_dir)
        .into_iter()
        .filter(|name| name.starts_with(rest))
        .collect();

    // Several candidates, or a single one that is not what was typed
    if names.len() > 1 || !expanded.exists() {
        trace!("{:?} resolves to {} siblings", path, names.len());
        return PathResolution::Siblings {
            dir_prefix: dir_prefix.to_string(),
            names,
        };
    }

    if expanded.is_dir() {
        return PathResolution::Children(list_directory(path));
    }

    PathResolution::Exact(format!("{} ", path))
}

/// Completion candidates for a partial path.
///
/// Directory contents and sibling names come back as bare names; an exact
/// file match comes back as the typed path plus a trailing space, which tells
/// the front-end the completion is final.
pub fn complete_path(path: &str) -> Vec<String> {
    resolve_path(path).into_candidates()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Test Dir")).unwrap();
        fs::write(dir.path().join("Test Dir").join("test.txt"), "x").unwrap();
        fs::write(dir.path().join("alpha.txt"), "a").unwrap();
        fs::write(dir.path().join("alpine.txt"), "a").unwrap();
        dir
    }

    fn root(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_list_directory_marks_subdirectories() {
        let dir = fixture();
        let names = list_directory(&root(&dir));
        assert!(names.contains(&format!("Test Dir{}", MAIN_SEPARATOR)));
        assert!(names.contains(&"alpha.txt".to_string()));
    }

    #[test]
    fn test_list_directory_swallows_errors() {
        assert!(list_directory("/definitely/not/a/real/dir").is_empty());

        let dir = fixture();
        let file = dir.path().join("alpha.txt");
        assert!(list_directory(&file.to_string_lossy()).is_empty());
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/tmp/Test"), ("/tmp/", "/tmp", "Test"));
        assert_eq!(split_path("/usr"), ("/", "/", "usr"));
        assert_eq!(split_path("src/"), ("src/", "src", ""));
        assert_eq!(split_path("README"), ("", ".", "README"));
    }

    #[test]
    fn test_ambiguous_prefix_lists_siblings() {
        let dir = fixture();
        let partial = format!("{}/alp", root(&dir));
        let mut matches = complete_path(&partial);
        matches.sort();
        assert_eq!(matches, vec!["alpha.txt", "alpine.txt"]);
    }

    #[test]
    fn test_unique_prefix_that_does_not_exist() {
        let dir = fixture();
        let partial = format!("{}/Test", root(&dir));
        assert_eq!(
            resolve_path(&partial),
            PathResolution::Siblings {
                dir_prefix: format!("{}/", root(&dir)),
                names: vec![format!("Test Dir{}", MAIN_SEPARATOR)],
            }
        );
    }

    #[test]
    fn test_directory_lists_children() {
        let dir = fixture();
        let path = format!("{}/Test Dir", root(&dir));
        assert_eq!(
            resolve_path(&path),
            PathResolution::Children(vec!["test.txt".to_string()])
        );
    }

    #[test]
    fn test_directory_with_separator_lists_children() {
        let dir = fixture();
        let path = format!("{}/", root(&dir));
        match resolve_path(&path) {
            PathResolution::Children(names) => {
                assert_eq!(names, vec![
                    format!("Test Dir{}", MAIN_SEPARATOR),
                    "alpha.txt".to_string(),
                    "alpine.txt".to_string(),
                ]);
            }
            other => panic!("expected children, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_file_gets_trailing_space() {
        let dir = fixture();
        let path = format!("{}/alpha.txt", root(&dir));
        assert_eq!(complete_path(&path), vec![format!("{} ", path)]);
    }

    #[test]
    fn test_dot_lists_current_directory() {
        let here = complete_path(".");
        assert!(here.iter().any(|name| name == "Cargo.toml"));
        assert_eq!(here, complete_path(""));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/x"), home.join("x"));
        }
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
        assert_eq!(expand_home("/tmp"), PathBuf::from("/tmp"));
    }
}
