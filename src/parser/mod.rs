//! Code analysis for the kernel front-end
//!
//! A [`Parser`] compiles a [`ParseConfig`] once and then answers three
//! questions about any buffer and cursor:
//!
//! - which magic, if any, the buffer invokes ([`Parser::parse_magic`]),
//! - which token or called function the cursor sits in, for help lookup,
//! - which filesystem paths complete the text before the cursor
//!   ([`Parser::match_paths`]).
//!
//! [`Parser::parse_code`] runs all three and packs the answers into an
//! [`AnalysisResult`].
//!
//! # Usage
//!
//! ```rust
//! use kernel_parser::config::ParseConfig;
//! use kernel_parser::parser::Parser;
//!
//! let parser = Parser::new(ParseConfig::default()).unwrap();
//! let info = parser.parse_code("oct(a,", 0, None);
//! assert_eq!(info.help_obj, "oct");
//! ```

pub mod fragments;
pub mod magic;
pub mod tokens;

use std::collections::BTreeSet;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ConfigError, ParseConfig, DEFAULT_IDENTIFIER_PATTERN};
use crate::models::{AnalysisResult, MagicInfo, MagicKind, MarkerPosition};

use self::magic::MagicMatcher;
use self::tokens::{TokenWindow, clamp_window};

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("invalid {name} pattern: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("function call pattern {pattern:?} has no capture group for the called name")]
    MissingCaptureGroup { pattern: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) fn compile(name: &'static str, pattern: &str) -> Result<Regex, ParserError> {
    Regex::new(pattern).map_err(|source| ParserError::InvalidPattern { name, source })
}

/// Compiled form of a [`ParseConfig`]
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Parser {
    config: ParseConfig,
    /// Trailing-token pattern: magic-prefixed identifier or bare identifier
    token: Regex,
    /// Same alternation, anchored at the start of the haystack
    token_at_start: Regex,
    function_call: Regex,
    /// Magic matchers in priority order
    magic_matchers: Vec<MagicMatcher>,
}

impl Parser {
    pub fn new(config: ParseConfig) -> Result<Self, ParserError> {
        config.validate()?;

        // Probe the identifier on its own so a bad pattern is reported by name
        compile("identifier", &config.identifier_pattern)?;

        let token_source = match config.marker(MagicKind::Magic, MarkerPosition::Prefix) {
            Some(prefix) => format!(
                "(?:{}+(?:{})|(?:{}))",
                regex::escape(&prefix.to_string()),
                DEFAULT_IDENTIFIER_PATTERN,
                config.identifier_pattern,
            ),
            None => format!("(?:{})", config.identifier_pattern),
        };
        let token = compile("token", &token_source)?;
        let token_at_start = compile("token", &format!("^{}", token_source))?;

        let function_call = compile("function call", &config.function_call_pattern)?;
        if function_call.captures_len() < 2 {
            return Err(ParserError::MissingCaptureGroup {
                pattern: config.function_call_pattern.clone(),
            });
        }

        let magic_matchers = magic::build_matchers(&config)?;
        debug!(
            "Compiled parser with {} magic matchers",
            magic_matchers.len()
        );

        Ok(Self {
            config,
            token,
            token_at_start,
            function_call,
            magic_matchers,
        })
    }

    /// The configuration this parser was compiled from
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Analyze `code` with the cursor at `end` (`None` for end of text).
    ///
    /// Magic detection always scans from the top of the buffer; `start` only
    /// narrows the window used for line and token extraction. Never fails:
    /// anything unrecognized comes back as an empty field.
    pub fn parse_code(&self, code: &str, start: usize, end: Option<usize>) -> AnalysisResult {
        let (start, end) = clamp_window(code, start, end);
        if code.is_empty() {
            return AnalysisResult::empty(code, 0);
        }

        let magic = self.parse_magic(&code[..end]);

        let window = TokenWindow::new(code, start, end);
        let obj = window.trailing_token(&self.token).to_string();
        let full_obj = window.extend_token(&obj, &self.token_at_start);

        let (help_obj, help_col, help_pos) =
            match window.open_call(&self.function_call).filter(|_| obj.is_empty()) {
                Some(call) => {
                    trace!("Cursor is inside a call to {:?}", call.name);
                    (call.name.to_string(), call.column, call.offset)
                }
                None => (full_obj.clone(), window.column(), end),
            };

        let path_matches = self.match_paths(window.line(), &obj);

        debug!(
            "Analyzed {} bytes: obj={:?} help_obj={:?} magic={:?} paths={}",
            end - start,
            obj,
            help_obj,
            magic.as_ref().map(|m| m.name.as_str()),
            path_matches.len()
        );

        AnalysisResult {
            code: code.to_string(),
            window_start: start,
            window_end: end,
            lines: window.lines(),
            line_num: window.line_num(),
            line: window.line().to_string(),
            column: window.column(),
            start: end - obj.len(),
            end,
            obj,
            full_obj,
            help_obj,
            help_col,
            help_pos,
            magic,
            path_matches,
        }
    }

    /// Analyze the whole buffer with the cursor at its end.
    pub fn analyze(&self, code: &str) -> AnalysisResult {
        self.parse_code(code, 0, None)
    }

    /// Find the magic `code` invokes, if any.
    ///
    /// Each marker keeps its right-most occurrence; the first marker to match
    /// in priority order (help prefix, help suffix, magic, shell) wins.
    pub fn parse_magic(&self, code: &str) -> Option<MagicInfo> {
        self.magic_matchers
            .iter()
            .find_map(|matcher| matcher.find(code))
            .map(|found| found.into_info(code))
    }

    /// Path completions for the text before the cursor, aligned to `obj`.
    pub fn match_paths(&self, line: &str, obj: &str) -> BTreeSet<String> {
        fragments::match_paths(line, obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MagicMarker;
    use crate::models::Severity;

    fn parser() -> Parser {
        Parser::new(ParseConfig::default()).unwrap()
    }

    #[test]
    fn test_parser_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser>();
    }

    #[test]
    fn test_config_is_kept() {
        let parser = Parser::new(ParseConfig::lisp()).unwrap();
        assert_eq!(parser.config(), &ParseConfig::lisp());
    }

    #[test]
    fn test_help_position_is_the_open_paren() {
        let code = "x = 1\nresult = max(a, ";
        let info = parser().analyze(code);
        assert_eq!(info.help_obj, "max");
        assert_eq!(info.help_col, 12);
        assert_eq!(&code[info.help_pos..info.help_pos + 1], "(");
    }

    #[test]
    fn test_identifier_help() {
        let info = parser().analyze("import nump");
        assert_eq!(info.obj, "nump");
        assert_eq!(info.help_obj, "nump");
        assert_eq!(info.help_col, 11);
        assert_eq!(info.help_pos, 11);
        assert_eq!((info.start, info.end), (7, 11));
    }

    #[test]
    fn test_truncated_magic_name() {
        let info = parser().parse_code("%python impor", 0, Some(10));
        let magic = info.magic.unwrap();
        assert_eq!(magic.kind, MagicKind::Magic);
        assert_eq!(magic.name, "python");
        assert_eq!(magic.args, "im");
    }

    #[test]
    fn test_open_call_help() {
        let info = parser().analyze("oct(a,");
        assert_eq!(info.obj, "");
        assert_eq!(info.help_obj, "oct");
        assert_eq!(info.help_col, 3);
        assert_eq!(info.help_pos, 3);
    }

    #[test]
    fn test_shell_magic() {
        let magic = parser().analyze("! ls").magic.unwrap();
        assert_eq!(magic.kind, MagicKind::Shell);
        assert_eq!(magic.name, "shell");
        assert_eq!(magic.severity, Severity::Line);
        assert_eq!(magic.args, "ls");
    }

    #[test]
    fn test_help_magic_recovers_full_token() {
        let info = parser().parse_code("%help %lsmagic", 0, Some(10));
        assert_eq!(info.obj, "%lsm");
        assert_eq!(info.full_obj, "%lsmagic");
        assert_eq!(info.help_obj, "%lsmagic");
    }

    #[test]
    fn test_call_inside_cell_magic() {
        let info = parser().analyze("%%python\nprint(\"hello, world!\",");
        assert_eq!(info.help_obj, "print");
        assert_eq!(info.help_col, 5);
        assert_eq!(info.help_pos, 14);
        assert_eq!(info.magic.unwrap().severity, Severity::Cell);
    }

    #[test]
    fn test_bare_magic_token() {
        let info = parser().analyze("%lsmagic");
        assert_eq!(info.help_obj, "%lsmagic");
        assert_eq!(info.magic.unwrap().name, "lsmagic");
    }

    #[test]
    fn test_lisp_call_help() {
        let parser = Parser::new(ParseConfig::lisp()).unwrap();
        assert_eq!(parser.analyze("(oct a b ").help_obj, "oct");
    }

    #[test]
    fn test_empty_code() {
        let info = parser().analyze("");
        assert_eq!(info.obj, "");
        assert_eq!(info.help_obj, "");
        assert!(info.magic.is_none());
        assert!(info.path_matches.is_empty());
        assert_eq!((info.start, info.end), (0, 0));
    }

    #[test]
    fn test_cursor_at_zero() {
        let info = parser().parse_code("print(x)", 0, Some(0));
        assert_eq!(info.obj, "");
        assert_eq!(info.help_obj, "");
        assert!(info.lines.is_empty());
        assert!(info.magic.is_none());
    }

    #[test]
    fn test_out_of_range_window_is_clamped() {
        let info = parser().parse_code("abc", 10, Some(99));
        assert_eq!((info.window_start, info.window_end), (3, 3));
        assert_eq!((info.start, info.end), (3, 3));
    }

    #[test]
    fn test_no_magic_marker_means_plain_tokens() {
        let config = ParseConfig {
            markers: vec![MagicMarker::prefix(MagicKind::Shell, '!')],
            ..ParseConfig::default()
        };
        let parser = Parser::new(config).unwrap();
        let info = parser.analyze("%lsm");
        assert_eq!(info.obj, "lsm");
        assert!(info.magic.is_none());
    }

    #[test]
    fn test_invalid_identifier_pattern() {
        let config = ParseConfig {
            identifier_pattern: "[unclosed".to_string(),
            ..ParseConfig::default()
        };
        assert!(matches!(
            Parser::new(config),
            Err(ParserError::InvalidPattern { name: "identifier", .. })
        ));
    }

    #[test]
    fn test_call_pattern_needs_group() {
        let config = ParseConfig {
            function_call_pattern: r"\w+\([^)]*\z".to_string(),
            ..ParseConfig::default()
        };
        assert!(matches!(
            Parser::new(config),
            Err(ParserError::MissingCaptureGroup { .. })
        ));
    }

    #[test]
    fn test_invalid_marker_is_config_error() {
        let config = ParseConfig {
            markers: vec![MagicMarker::prefix(MagicKind::Magic, ' ')],
            ..ParseConfig::default()
        };
        assert!(matches!(
            Parser::new(config),
            Err(ParserError::Config(ConfigError::InvalidMarker { .. }))
        ));
    }
}
