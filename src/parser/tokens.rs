//! Token and help-target extraction around the cursor

use regex::Regex;

/// Clamp a requested window into `code`.
///
/// `end = None` means end of text. Both offsets are pulled back onto UTF-8
/// character boundaries and `start <= end` always holds afterwards.
pub fn clamp_window(code: &str, start: usize, end: Option<usize>) -> (usize, usize) {
    let end = floor_char_boundary(code, end.unwrap_or(code.len()).min(code.len()));
    let start = floor_char_boundary(code, start.min(end));
    (start, end)
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// A call whose argument list is still open at the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCall<'a> {
    pub name: &'a str,
    /// Column just past the name, where the argument list opens
    pub column: usize,
    /// Same point as a byte offset into the buffer
    pub offset: usize,
}

/// The analyzed slice of a buffer, split into lines
#[derive(Debug)]
pub struct TokenWindow<'a> {
    code: &'a str,
    end: usize,
    lines: Vec<&'a str>,
}

impl<'a> TokenWindow<'a> {
    /// `start..end` must already be clamped with [`clamp_window`].
    pub fn new(code: &'a str, start: usize, end: usize) -> Self {
        let slice = &code[start..end];
        let lines = if slice.is_empty() {
            Vec::new()
        } else {
            let lines: Vec<&str> = slice.split('\n').collect();
            let last = lines.len() - 1;
            // The active line keeps its bytes so offsets stay exact
            lines
                .into_iter()
                .enumerate()
                .map(|(i, line)| {
                    if i < last {
                        line.strip_suffix('\r').unwrap_or(line)
                    } else {
                        line
                    }
                })
                .collect()
        };
        Self { code, end, lines }
    }

    /// The line the cursor is on (empty for an empty window)
    pub fn line(&self) -> &'a str {
        self.lines.last().copied().unwrap_or("")
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.to_string()).collect()
    }

    pub fn line_num(&self) -> usize {
        self.lines.len()
    }

    pub fn column(&self) -> usize {
        self.line().len()
    }

    /// The token that ends exactly at the cursor, or `""`.
    pub fn trailing_token(&self, token: &Regex) -> &'a str {
        let line = self.line();
        token
            .find_iter(line)
            .filter(|m| !m.as_str().is_empty())
            .last()
            .filter(|m| m.end() == line.len())
            .map_or("", |m| m.as_str())
    }

    /// Grow `obj` forward past the cursor using the unsliced buffer, so help
    /// sees `%lsmagic` even when the cursor sits after `%lsm`.
    pub fn extend_token(&self, obj: &str, token_at_start: &Regex) -> String {
        if obj.is_empty() {
            return String::new();
        }
        let after = &self.code[self.end..];
        let rest_of_line = after.split('\n').next().unwrap_or("");
        // Either token branch may attach: `ab` before `%cd` extends to `ab%cd`
        match token_at_start.find(rest_of_line) {
            Some(m) => format!("{}{}", obj, m.as_str()),
            None => obj.to_string(),
        }
    }

    /// The innermost call whose argument list is open at the cursor.
    pub fn open_call(&self, function_call: &Regex) -> Option<OpenCall<'a>> {
        let line = self.line();
        let captures = function_call.captures_iter(line).last()?;
        let name = captures.get(1)?;
        let line_start = self.end - line.len();
        Some(OpenCall {
            name: name.as_str(),
            column: name.end(),
            offset: line_start + name.end(),
        })
    }
}
