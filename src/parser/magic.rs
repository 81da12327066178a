//! Magic-syntax detection
//!
//! Every configured marker gets its own matcher. Matchers are kept in a
//! fixed priority order and the first one that finds anything decides the
//! magic:
//!
//! 1. help prefix (`?obj`, `??obj`)
//! 2. help suffix (`obj?`, `obj??`)
//! 3. generic magic prefix (`%name`, `%%name`)
//! 4. shell prefix (`!cmd`, `! cmd`)
//!
//! Within one matcher the right-most occurrence wins, i.e. the last of the
//! non-overlapping matches scanning left to right. The marker run is matched
//! greedily, so `%%python` is one cell magic, not a line magic at offset 1.

use regex::Regex;
use tracing::trace;

use crate::config::{ParseConfig, DEFAULT_IDENTIFIER_PATTERN};
use crate::models::{MagicInfo, MagicKind, MarkerPosition, Severity};

use super::{ParserError, compile};

/// The matcher slots, highest priority first
const PRIORITY: [(MagicKind, MarkerPosition); 4] = [
    (MagicKind::Help, MarkerPosition::Prefix),
    (MagicKind::Help, MarkerPosition::Suffix),
    (MagicKind::Magic, MarkerPosition::Prefix),
    (MagicKind::Shell, MarkerPosition::Prefix),
];

/// Build one matcher per configured priority slot, in priority order.
pub(crate) fn build_matchers(config: &ParseConfig) -> Result<Vec<MagicMatcher>, ParserError> {
    let identifier = format!(
        "(?:{}|{})",
        DEFAULT_IDENTIFIER_PATTERN, config.identifier_pattern
    );

    let mut matchers = Vec::new();
    for (kind, position) in PRIORITY {
        if let Some(character) = config.marker(kind, position) {
            matchers.push(MagicMatcher::new(kind, position, character, &identifier)?);
        }
    }
    Ok(matchers)
}

/// Detects one `(kind, position)` marker form
#[derive(Debug, Clone)]
pub(crate) struct MagicMatcher {
    kind: MagicKind,
    position: MarkerPosition,
    regex: Regex,
}

impl MagicMatcher {
    fn new(
        kind: MagicKind,
        position: MarkerPosition,
        character: char,
        identifier: &str,
    ) -> Result<Self, ParserError> {
        let run = format!("(?P<run>{}+)", regex::escape(&character.to_string()));
        let token = format!("(?P<token>{})", identifier);
        let source = match (kind, position) {
            (MagicKind::Shell, MarkerPosition::Prefix) => {
                format!("{}(?P<ws>[ \\t]*){}", run, token)
            }
            (_, MarkerPosition::Prefix) => format!("{}{}", run, token),
            (_, MarkerPosition::Suffix) => format!("{}{}", token, run),
        };
        Ok(Self {
            kind,
            position,
            regex: compile("magic", &source)?,
        })
    }

    /// Right-most occurrence of this marker form in `code`
    pub(crate) fn find(&self, code: &str) -> Option<MagicMatch> {
        let captures = self.regex.captures_iter(code).last()?;
        let whole = captures.get(0)?;
        let run = captures.name("run")?;
        let token = captures.name("token")?;

        let index = match (self.kind, self.position) {
            // The payload keeps the help expression itself
            (MagicKind::Help, _) => whole.start(),
            // The command name is part of the shell command
            (MagicKind::Shell, _) => captures.name("ws").map_or(run.end(), |ws| ws.end()),
            (MagicKind::Magic, _) => whole.end(),
        };

        trace!(
            "{} {} marker matched {:?} at {}",
            self.kind,
            self.position,
            whole.as_str(),
            whole.start()
        );

        Some(MagicMatch {
            kind: self.kind,
            position: self.position,
            run_length: run.as_str().chars().count(),
            token: token.as_str().to_string(),
            index,
        })
    }
}

/// A raw marker hit, before payload splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MagicMatch {
    kind: MagicKind,
    position: MarkerPosition,
    run_length: usize,
    token: String,
    index: usize,
}

impl MagicMatch {
    pub(crate) fn into_info(self, code: &str) -> MagicInfo {
        let rest = code[self.index..].trim().to_string();
        let (args, body) = split_payload(&rest);

        let name = match self.kind {
            MagicKind::Magic => self.token,
            kind => kind.as_str().to_string(),
        };

        MagicInfo {
            kind: self.kind,
            name,
            severity: Severity::from_repeat_count(self.run_length),
            position: self.position,
            index: self.index,
            args,
            code: body,
            rest,
        }
    }
}

/// First line of the payload as arguments, the remaining lines as body.
fn split_payload(rest: &str) -> (String, String) {
    let mut lines = rest.lines();
    match lines.next() {
        Some(first) => (
            first.trim().to_string(),
            lines.collect::<Vec<_>>().join("\n"),
        ),
        None => (String::new(), String::new()),
    }
}
