//! Metadata header parsing.
//!
//! The header is the leading run of comments in a fixture (block comments and/or `//` lines, with blank
//! lines allowed between them). Inside it, every line of the form `:key: value` is one metadata entry:
//!
//! ```text
//! /*
//! :name: unique0_case
//! :description: unique0 case statement
//! :tags: 12.5.3
//! :type: simulation elaboration parsing
//! */
//! ```

/// One `:key: value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
    /// Byte offset of the leading `:`.
    pub offset: usize,
    /// Byte length from the leading `:` to the end of the value.
    pub len: usize,
}

/// Parsed header comment span and its entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub entries: Vec<HeaderEntry>,
    /// Byte range covered by the leading comments.
    pub start: usize,
    pub end: usize,
}

impl Header {
    /// Whether the fixture declared any metadata at all.
    pub fn has_metadata(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Parse the leading comment run of `source`.
pub fn parse_header(source: &str) -> Header {
    let bytes = source.as_bytes();
    let mut pos = 0;
    let mut header = Header::default();
    let mut started = false;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let rest = &source[pos..];

        let (body_start, body_end, next) = if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(close) => (pos + 2, pos + 2 + close, pos + 2 + close + 2),
                None => (pos + 2, source.len(), source.len()),
            }
        } else if rest.starts_with("//") {
            let eol = rest.find('\n').map(|i| pos + i).unwrap_or(source.len());
            (pos + 2, eol, eol)
        } else {
            break;
        };

        if !started {
            header.start = pos;
            started = true;
        }
        collect_entries(source, body_start, body_end, &mut header.entries);
        header.end = next;
        pos = next;
    }

    header
}

fn collect_entries(source: &str, start: usize, end: usize, entries: &mut Vec<HeaderEntry>) {
    let mut line_start = start;
    for line in source[start..end].split('\n') {
        let line_offset = line_start;
        line_start += line.len() + 1;

        // Tolerate ` * ` decoration in block comments and extra slashes in line comments.
        let trimmed = line.trim_start();
        let trimmed = trimmed
            .strip_prefix('*')
            .filter(|t| !t.starts_with('/'))
            .map(str::trim_start)
            .unwrap_or(trimmed);
        let trimmed = trimmed.trim_start_matches('/').trim_start();

        let Some(after_colon) = trimmed.strip_prefix(':') else {
            continue;
        };
        let Some(key_len) = after_colon.find(':') else {
            continue;
        };
        let key = &after_colon[..key_len];
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }

        let value = after_colon[key_len + 1..].trim();
        let offset = line_offset + (line.len() - trimmed.len());
        let len = trimmed.trim_end().len();
        entries.push(HeaderEntry {
            key: key.to_string(),
            value: value.to_string(),
            offset,
            len,
        });
    }
}
