//! Value types produced by the parser
//!
//! Everything in this module is a plain, serializable value. A fresh
//! [`AnalysisResult`] is built on every call; nothing here is shared between
//! requests.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of magic families a kernel understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagicKind {
    /// Interpreter directive such as `%time` or `%%python`
    Magic,
    /// Shell escape such as `!ls`
    Shell,
    /// Introspection request such as `?print` or `print?`
    Help,
}

impl MagicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MagicKind::Magic => "magic",
            MagicKind::Shell => "shell",
            MagicKind::Help => "help",
        }
    }
}

impl fmt::Display for MagicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a marker character sits relative to the token it decorates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerPosition {
    Prefix,
    Suffix,
}

impl fmt::Display for MarkerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerPosition::Prefix => f.write_str("prefix"),
            MarkerPosition::Suffix => f.write_str("suffix"),
        }
    }
}

/// Scope of a magic, chosen by how many times its marker repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Line,
    Cell,
    Sticky,
}

impl Severity {
    /// Map a marker repeat count onto a severity.
    ///
    /// Runs longer than three characters saturate at [`Severity::Sticky`].
    pub fn from_repeat_count(count: usize) -> Self {
        match count {
            0 => Severity::None,
            1 => Severity::Line,
            2 => Severity::Cell,
            _ => Severity::Sticky,
        }
    }
}

/// A detected magic invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicInfo {
    pub kind: MagicKind,
    /// Magic name for generic magics (`"python"` for `%%python`), otherwise
    /// the kind name (`"shell"`, `"help"`)
    pub name: String,
    pub severity: Severity,
    /// Which marker form produced the match
    pub position: MarkerPosition,
    /// Byte offset in the scanned text where the magic's payload begins
    pub index: usize,
    /// Payload from `index` onwards, trimmed
    pub rest: String,
    /// First line of the payload
    pub args: String,
    /// Remaining payload lines joined with `\n`
    pub code: String,
}

/// Everything the kernel needs to know about a buffer at a cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub code: String,

    /// Analyzed window, clamped into the buffer and onto char boundaries
    pub window_start: usize,
    pub window_end: usize,

    /// The window split into lines; `line` is the last one
    pub lines: Vec<String>,
    pub line_num: usize,
    pub line: String,
    /// Byte length of `line`, i.e. the cursor column
    pub column: usize,

    /// Token ending exactly at the cursor
    pub obj: String,
    /// `obj` extended past the cursor to the end of the token
    pub full_obj: String,

    /// What introspection should be shown for
    pub help_obj: String,
    /// Column on the active line: just past the called name (the `(` of an
    /// open call), or the cursor column for a plain token
    pub help_col: usize,
    /// `help_col` as a byte offset into `code`
    pub help_pos: usize,

    pub magic: Option<MagicInfo>,

    pub path_matches: BTreeSet<String>,

    /// Completion replacement span: `end - obj.len()..end`
    pub start: usize,
    pub end: usize,
}

impl AnalysisResult {
    /// A result with every derived field empty, positioned at `cursor`.
    pub fn empty(code: &str, cursor: usize) -> Self {
        Self {
            code: code.to_string(),
            window_start: cursor,
            window_end: cursor,
            lines: Vec::new(),
            line_num: 0,
            line: String::new(),
            column: 0,
            obj: String::new(),
            full_obj: String::new(),
            help_obj: String::new(),
            help_col: 0,
            help_pos: cursor,
            magic: None,
            path_matches: BTreeSet::new(),
            start: cursor,
            end: cursor,
        }
    }

    /// The buffer text the completion span replaces
    pub fn replaced_text(&self) -> &str {
        self.code.get(self.start..self.end).unwrap_or("")
    }
}
