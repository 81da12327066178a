//! Parser configuration
//!
//! A [`ParseConfig`] describes the surface syntax of the kernel's language:
//! what an identifier looks like, how a function call opens, and which
//! marker characters introduce magics. It is built once, validated, and
//! compiled into a [`crate::parser::Parser`].
//!
//! The marker table is a closed list of `(kind, character, position)`
//! triples rather than a free-form mapping, since the kernel only knows
//! three magic families.
//!
//! # Example
//!
//! ```json
//! {
//!   "identifier_pattern": "[^\\d\\W]\\w*",
//!   "function_call_pattern": "([^\\d\\W][\\w.]*)\\([^()]*\\z",
//!   "markers": [
//!     { "kind": "magic", "character": "%", "position": "prefix" },
//!     { "kind": "help", "character": "?", "position": "suffix" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{MagicKind, MarkerPosition};

/// Identifier pattern used when nothing else is configured: a Unicode word
/// that does not start with a digit.
pub const DEFAULT_IDENTIFIER_PATTERN: &str = r"[^\d\W]\w*";

/// `name(args` with no closing paren before the end of the text
pub const CALL_PATTERN_PYTHON: &str = r"([^\d\W][\w.]*)\([^()]*\z";

/// `(name args` with no closing paren before the end of the text
pub const CALL_PATTERN_LISP: &str = r"\(([^\d\W][\w.]*)[^()]*\z";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("marker character {character:?} is not usable: {reason}")]
    InvalidMarker { character: char, reason: &'static str },

    #[error("more than one {position} marker configured for {kind}")]
    DuplicateMarker { kind: MagicKind, position: MarkerPosition },
}

/// One magic marker: a character that, repeated 1-3 times before (or after)
/// a token, turns the token into a magic of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicMarker {
    pub kind: MagicKind,
    pub character: char,
    pub position: MarkerPosition,
}

impl MagicMarker {
    pub const fn prefix(kind: MagicKind, character: char) -> Self {
        Self { kind, character, position: MarkerPosition::Prefix }
    }

    pub const fn suffix(kind: MagicKind, character: char) -> Self {
        Self { kind, character, position: MarkerPosition::Suffix }
    }
}

/// Surface syntax description consumed by [`crate::parser::Parser::new`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseConfig {
    #[serde(default = "default_identifier_pattern")]
    pub identifier_pattern: String,

    /// Must end at the end of the text and capture the called name in
    /// group 1
    #[serde(default = "default_function_call_pattern")]
    pub function_call_pattern: String,

    #[serde(default = "default_markers")]
    pub markers: Vec<MagicMarker>,
}

fn default_identifier_pattern() -> String {
    DEFAULT_IDENTIFIER_PATTERN.to_string()
}

fn default_function_call_pattern() -> String {
    CALL_PATTERN_PYTHON.to_string()
}

fn default_markers() -> Vec<MagicMarker> {
    vec![
        MagicMarker::prefix(MagicKind::Magic, '%'),
        MagicMarker::prefix(MagicKind::Shell, '!'),
        MagicMarker::prefix(MagicKind::Help, '?'),
        MagicMarker::suffix(MagicKind::Help, '?'),
    ]
}

impl Default for ParseConfig {
    /// Python-style call syntax with the usual `%`, `!` and `?` markers
    fn default() -> Self {
        Self {
            identifier_pattern: default_identifier_pattern(),
            function_call_pattern: default_function_call_pattern(),
            markers: default_markers(),
        }
    }
}

impl ParseConfig {
    /// Lisp-style call syntax: the open paren precedes the function name.
    pub fn lisp() -> Self {
        Self {
            function_call_pattern: CALL_PATTERN_LISP.to_string(),
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ParseConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded parser config from {}", path.display());
        Self::from_json_str(&text)
    }

    /// The marker for a `(kind, position)` pair, if configured
    pub fn marker(&self, kind: MagicKind, position: MarkerPosition) -> Option<char> {
        self.markers
            .iter()
            .find(|m| m.kind == kind && m.position == position)
            .map(|m| m.character)
    }

    /// Reject markers that would collide with identifier or whitespace
    /// characters, and duplicate `(kind, position)` entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for marker in &self.markers {
            let c = marker.character;
            if c.is_alphanumeric() || c == '_' {
                return Err(ConfigError::InvalidMarker {
                    character: c,
                    reason: "identifier characters cannot be markers",
                });
            }
            if c.is_whitespace() {
                return Err(ConfigError::InvalidMarker {
                    character: c,
                    reason: "whitespace cannot be a marker",
                });
            }
            if !seen.insert((marker.kind, marker.position)) {
                return Err(ConfigError::DuplicateMarker {
                    kind: marker.kind,
                    position: marker.position,
                });
            }
        }
        Ok(())
    }
}
