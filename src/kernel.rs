//! Kernel-facing requests
//!
//! The kernel host owns the wire protocol; this module only turns an
//! analysis into the two payloads it asks for:
//!
//! ```text
//! complete_request(code, cursor)        inspect_request(code, cursor)
//!       ↓                                     ↓
//! Parser::parse_code(code, 0, cursor)   Parser::parse_code(code, 0, cursor)
//!       ├─→ path_matches                      ├─→ magic     → InspectRoute::Magic
//!       ├─→ SymbolCompleter (optional)        ├─→ help_obj  → InspectRoute::Help
//!       └─→ CompletionReply                   └─→ otherwise → InspectRoute::Nothing
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{AnalysisResult, MagicInfo};
use crate::parser::Parser;

/// Source of language-aware completions beyond filesystem paths.
///
/// The engine works without one; its absence just means no extra
/// candidates.
pub trait SymbolCompleter {
    /// Candidates for the token at the cursor. They replace the span
    /// `analysis.start..analysis.end`.
    fn complete(&self, analysis: &AnalysisResult) -> Vec<String>;
}

/// A fixed vocabulary filtered by the token at the cursor
#[derive(Debug, Clone, Default)]
pub struct StaticSymbols {
    words: BTreeSet<String>,
}

impl StaticSymbols {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl SymbolCompleter for StaticSymbols {
    fn complete(&self, analysis: &AnalysisResult) -> Vec<String> {
        if analysis.obj.is_empty() {
            return Vec::new();
        }
        self.words
            .iter()
            .filter(|word| word.starts_with(&analysis.obj) && **word != analysis.obj)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
}

/// Completion reply as a kernel front-end expects it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReply {
    pub matches: Vec<String>,
    pub cursor_start: usize,
    pub cursor_end: usize,
    pub metadata: Map<String, Value>,
    pub status: ReplyStatus,
}

/// Where an introspection request should go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "lowercase")]
pub enum InspectRoute {
    /// Hand the buffer to the magic (or help-magic) handler
    Magic(MagicInfo),
    /// Show help for `name`
    Help {
        name: String,
        column: usize,
        offset: usize,
    },
    Nothing,
}

/// Build the completion reply for `code` with the cursor at `cursor_pos`.
///
/// `matches` is the sorted union of path completions and whatever the
/// optional symbol completer offers; all of them replace
/// `cursor_start..cursor_end`.
pub fn complete_request(
    parser: &Parser,
    code: &str,
    cursor_pos: usize,
    symbols: Option<&dyn SymbolCompleter>,
) -> CompletionReply {
    let analysis = parser.parse_code(code, 0, Some(cursor_pos));

    let mut matches = analysis.path_matches.clone();
    if let Some(symbols) = symbols {
        matches.extend(symbols.complete(&analysis));
    }

    debug!(
        "Completion at {} for {:?}: {} matches",
        analysis.end,
        analysis.obj,
        matches.len()
    );

    CompletionReply {
        matches: matches.into_iter().collect(),
        cursor_start: analysis.start,
        cursor_end: analysis.end,
        metadata: Map::new(),
        status: ReplyStatus::Ok,
    }
}

/// Decide which handler serves an introspection request at `cursor_pos`.
pub fn inspect_request(parser: &Parser, code: &str, cursor_pos: usize) -> InspectRoute {
    route(parser.parse_code(code, 0, Some(cursor_pos)))
}

/// Magic first, then the help target, else nothing.
pub fn route(analysis: AnalysisResult) -> InspectRoute {
    if let Some(magic) = analysis.magic {
        return InspectRoute::Magic(magic);
    }
    if analysis.help_obj.is_empty() {
        return InspectRoute::Nothing;
    }
    InspectRoute::Help {
        name: analysis.help_obj,
        column: analysis.help_col,
        offset: analysis.help_pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;
    use crate::models::MagicKind;

    fn parser() -> Parser {
        Parser::new(ParseConfig::default()).unwrap()
    }

    #[test]
    fn test_symbols_replace_obj_span() {
        let symbols = StaticSymbols::new(["numpy", "numbers", "os"]);
        let reply = complete_request(&parser(), "import num", 10, Some(&symbols));
        assert_eq!(reply.matches, vec!["numbers", "numpy"]);
        assert_eq!(reply.cursor_start, 7);
        assert_eq!(reply.cursor_end, 10);
        assert_eq!(reply.status, ReplyStatus::Ok);
    }

    #[test]
    fn test_missing_symbol_completer_is_not_an_error() {
        let reply = complete_request(&parser(), "x = 1 + ", 8, None);
        assert!(reply.matches.is_empty());
        assert_eq!((reply.cursor_start, reply.cursor_end), (8, 8));
    }

    #[test]
    fn test_empty_code() {
        let reply = complete_request(&parser(), "", 0, None);
        assert!(reply.matches.is_empty());
        assert_eq!((reply.cursor_start, reply.cursor_end), (0, 0));
    }

    #[test]
    fn test_exact_symbol_is_not_offered() {
        let symbols = StaticSymbols::new(["print"]);
        let reply = complete_request(&parser(), "print", 5, Some(&symbols));
        assert!(reply.matches.is_empty());
    }

    #[test]
    fn test_inspect_routes_magic_first() {
        match inspect_request(&parser(), "%time foo(", 10) {
            InspectRoute::Magic(magic) => assert_eq!(magic.name, "time"),
            other => panic!("expected magic route, got {:?}", other),
        }
        match inspect_request(&parser(), "len?", 4) {
            InspectRoute::Magic(magic) => assert_eq!(magic.kind, MagicKind::Help),
            other => panic!("expected help magic, got {:?}", other),
        }
    }

    #[test]
    fn test_inspect_routes_help() {
        assert_eq!(
            inspect_request(&parser(), "x = sorted(items, ", 18),
            InspectRoute::Help {
                name: "sorted".to_string(),
                column: 10,
                offset: 10,
            }
        );
        assert_eq!(inspect_request(&parser(), "1 + ", 4), InspectRoute::Nothing);
    }

    #[test]
    fn test_reply_serializes_like_the_protocol() {
        let reply = complete_request(&parser(), "x", 1, None);
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cursor_start"], 0);
        assert_eq!(json["cursor_end"], 1);
        assert!(json["metadata"].as_object().unwrap().is_empty());
    }
}
