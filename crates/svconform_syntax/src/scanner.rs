//! Comment- and string-aware tokenizer for fixture bodies.
//!
//! The scanner only distinguishes what directive extraction needs: string literals, bracket nesting,
//! argument separators and everything else as opaque words.

/// Token categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// String literal with escapes resolved. `terminated` is false when the line ended first.
    Str { value: String, terminated: bool },
    Open(char),
    Close(char),
    Comma,
    Semi,
    /// Any other run of non-space characters (identifiers, numbers, operators).
    Word,
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// Source text covered by the token.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Tokenizer state.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole source, skipping whitespace and comments.
    pub fn tokenize(mut self) -> Vec<Token> {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            match c {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                b'"' => self.scan_string(),
                b'(' | b'[' | b'{' => self.single(TokenKind::Open(char::from(c))),
                b')' | b']' | b'}' => self.single(TokenKind::Close(char::from(c))),
                b',' => self.single(TokenKind::Comma),
                b';' => self.single(TokenKind::Semi),
                _ => self.scan_word(),
            }
        }
        self.tokens
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn single(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            start: self.pos,
            end: self.pos + 1,
        });
        self.pos += 1;
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            let starts_comment = c == b'/' && matches!(self.peek_at(1), Some(b'/' | b'*'));
            if c.is_ascii_whitespace()
                || starts_comment
                || matches!(c, b'"' | b'(' | b')' | b'[' | b']' | b'{' | b'}' | b',' | b';')
            {
                break;
            }
            self.pos += 1;
        }
        // Non-ASCII bytes are consumed whole so token boundaries stay on char boundaries.
        while !self.source.is_char_boundary(self.pos) {
            self.pos += 1;
        }
        self.tokens.push(Token {
            kind: TokenKind::Word,
            start,
            end: self.pos,
        });
    }

    fn scan_string(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut terminated = false;

        let rest = &self.source[self.pos..];
        let mut chars = rest.char_indices().peekable();
        let mut consumed = rest.len();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    terminated = true;
                    consumed = i + 1;
                    break;
                }
                '\n' => {
                    consumed = i;
                    break;
                }
                '\\' => {
                    let Some((_, esc)) = chars.next() else {
                        break;
                    };
                    match esc {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'v' => value.push('\u{0b}'),
                        'f' => value.push('\u{0c}'),
                        'a' => value.push('\u{07}'),
                        '\n' => {}
                        'x' => {
                            let mut code = 0u32;
                            for _ in 0..2 {
                                match chars.peek().and_then(|(_, d)| d.to_digit(16)) {
                                    Some(d) => {
                                        code = code * 16 + d;
                                        chars.next();
                                    }
                                    None => break,
                                }
                            }
                            value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        '0'..='7' => {
                            let mut code = esc.to_digit(8).unwrap_or(0);
                            for _ in 0..2 {
                                match chars.peek().and_then(|(_, d)| d.to_digit(8)) {
                                    Some(d) => {
                                        code = code * 8 + d;
                                        chars.next();
                                    }
                                    None => break,
                                }
                            }
                            value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        other => value.push(other),
                    }
                }
                other => value.push(other),
            }
        }

        self.pos += consumed;
        self.tokens.push(Token {
            kind: TokenKind::Str { value, terminated },
            start,
            end: self.pos,
        });
    }
}

/// Convenience function to tokenize a fixture body.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn scan(source: &str) -> Vec<Token> {
    Scanner::new(source).tokenize()
}

/// 1-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}
