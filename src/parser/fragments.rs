//! Path fragments before the cursor
//!
//! Two surface syntaxes are tried independently and their completions
//! unioned:
//!
//! - **free-form**: the text after the last quote (`open("/tmp/fo`), or an
//!   unquoted run such as `/tmp/Test Dir/`;
//! - **single word**: the run after the last whitespace or quote
//!   (`ls /tmp/fo`).
//!
//! Completions come back from [`crate::paths`] as names; they are first
//! rebuilt into text that would replace the whole fragment, then trimmed so
//! they replace only the `obj` span the completion reply advertises.

use std::collections::BTreeSet;
use std::path::MAIN_SEPARATOR;

use tracing::trace;

use crate::paths::{self, PathResolution, is_separator};

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// First character of anything worth completing as a path
pub fn is_path_start(c: char) -> bool {
    c.is_alphabetic() || c == '/' || c == '.' || c == '~'
}

/// Byte offset just past the last character matching `pred`, or 0
fn after_last(line: &str, pred: impl Fn(char) -> bool) -> usize {
    line.char_indices()
        .rev()
        .find(|&(_, c)| pred(c))
        .map_or(0, |(i, c)| i + c.len_utf8())
}

/// Quoted or unquoted fragment that may contain spaces.
///
/// Unquoted text with spaces only counts when it ends in a separator: in
/// `ls /tmp/Test Dir` the trailing `Dir` is its own argument.
pub fn free_form_fragment(line: &str) -> Option<&str> {
    let after_quote = after_last(line, is_quote);
    let tail = &line[after_quote..];
    if after_quote > 0 && tail.starts_with(is_path_start) {
        return Some(tail);
    }

    let start = tail.find(is_path_start)?;
    let fragment = &tail[start..];
    if fragment.contains(char::is_whitespace) && !fragment.ends_with(is_separator) {
        return None;
    }
    Some(fragment)
}

/// Fragment with no whitespace or quotes in it
pub fn single_word_fragment(line: &str) -> Option<&str> {
    let tail = &line[after_last(line, |c| c.is_whitespace() || is_quote(c))..];
    let start = tail.find(is_path_start)?;
    Some(&tail[start..])
}

/// Entries of `dir` as completions of a lone `.` typed before them.
///
/// One leading `.` is stripped from each name, since the typed dot already
/// supplies it for hidden entries.
fn dot_candidates(dir: &str, obj: &str) -> Vec<String> {
    paths::list_directory(dir)
        .into_iter()
        .map(|name| match name.strip_prefix('.') {
            Some(stripped) => stripped.to_string(),
            None => name,
        })
        .filter(|candidate| !candidate.is_empty() && candidate != obj)
        .collect()
}

/// Candidates for one fragment, aligned to `obj`.
pub fn fragment_candidates(fragment: &str, obj: &str) -> Vec<String> {
    if fragment == "." {
        return dot_candidates(".", obj);
    }

    let whole: Vec<String> = match paths::resolve_path(fragment) {
        PathResolution::Siblings { dir_prefix, names } => names
            .into_iter()
            .map(|name| format!("{}{}", dir_prefix, name))
            .collect(),
        PathResolution::Children(names) => names
            .into_iter()
            .map(|name| format!("{}{}{}", fragment, MAIN_SEPARATOR, name))
            .collect(),
        PathResolution::Exact(path) => vec![path],
    };

    let surplus = fragment.len().saturating_sub(obj.len());
    whole
        .into_iter()
        .filter_map(|candidate| candidate.get(surplus..).map(str::to_string))
        .filter(|candidate| !candidate.is_empty() && candidate != obj)
        .collect()
}

/// Union of the completions of both fragment syntaxes
pub fn match_paths(line: &str, obj: &str) -> BTreeSet<String> {
    let mut fragments: Vec<&str> = Vec::with_capacity(2);
    for fragment in [free_form_fragment(line), single_word_fragment(line)]
        .into_iter()
        .flatten()
    {
        if !fragments.contains(&fragment) {
            fragments.push(fragment);
        }
    }

    let mut matches = BTreeSet::new();
    for fragment in fragments {
        let candidates = fragment_candidates(fragment, obj);
        trace!("Path fragment {:?} gave {} candidates", fragment, candidates.len());
        matches.extend(candidates);
    }
    matches
}
