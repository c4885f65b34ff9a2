//! Printf-style template rendering with explicit coercion rules.
//!
//! An assertion directive is a format template plus the arguments declared next to it in the fixture. The
//! harness never evaluates HDL; it renders the template the way the front end would and compares text.
//!
//! ## Placeholders
//!
//! `%d`/`%i`, `%h`/`%x`, `%o`, `%b`, `%c`, `%s` and the escape `%%`. A placeholder may carry flags and a width:
//! `%0d` (minimal width), `%5d` (right aligned), `%05d` (zero padded), `%-5s` (left aligned).
//!
//! ## Arguments
//!
//! - [`Arg::Str`]: a string literal, rendered verbatim by `%s`, packed into bytes for numeric placeholders.
//! - [`Arg::Logic`]: a numeric literal, rendered with the 4-state display rules of [`LogicValue`].
//! - [`Arg::Symbolic`]: an identifier or expression whose runtime value the harness cannot know; rendered
//!   according to [`CoercionRules`].

use std::collections::HashSet;
use std::fmt;

use crate::logic::{Bit, LogicValue};

/// Kind of conversion a placeholder performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    Decimal,
    Hex,
    Octal,
    Binary,
    Char,
    String,
}

impl PlaceholderKind {
    fn from_conversion(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' | 'i' => Some(PlaceholderKind::Decimal),
            'h' | 'x' => Some(PlaceholderKind::Hex),
            'o' => Some(PlaceholderKind::Octal),
            'b' => Some(PlaceholderKind::Binary),
            'c' => Some(PlaceholderKind::Char),
            's' => Some(PlaceholderKind::String),
            _ => None,
        }
    }

    /// Whether the conversion renders a number.
    pub fn is_numeric(self) -> bool {
        !matches!(self, PlaceholderKind::Char | PlaceholderKind::String)
    }

    /// Check whether `text` is something this conversion could print, ignoring padding.
    pub fn accepts(self, text: &str) -> bool {
        let body = text.trim();
        let is_unknown = |s: &str| matches!(s, "x" | "X" | "z" | "Z");
        match self {
            PlaceholderKind::String => true,
            PlaceholderKind::Char => text.chars().count() == 1,
            PlaceholderKind::Decimal => {
                let digits = body.strip_prefix('-').unwrap_or(body);
                is_unknown(body) || (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            }
            PlaceholderKind::Hex => !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit() || is_unknown_char(c)),
            PlaceholderKind::Octal => {
                !body.is_empty() && body.chars().all(|c| ('0'..='7').contains(&c) || is_unknown_char(c))
            }
            PlaceholderKind::Binary => {
                !body.is_empty() && body.chars().all(|c| matches!(c, '0' | '1') || is_unknown_char(c))
            }
        }
    }
}

fn is_unknown_char(c: char) -> bool {
    matches!(c, 'x' | 'X' | 'z' | 'Z')
}

/// One conversion specification inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub width: Option<usize>,
    pub zero_pad: bool,
    pub left_align: bool,
}

/// Parsed template piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

/// A parsed format template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// A directive argument as declared in the fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Str(String),
    Logic(LogicValue),
    Symbolic(String),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "{:?}", s),
            Arg::Logic(v) => write!(f, "{}", v.to_decimal()),
            Arg::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

/// How arguments whose value only exists at run time are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SymbolicPolicy {
    /// Render as the front end's rendering of an indeterminate value.
    #[default]
    Coerce,
    /// Accept any text the placeholder could produce.
    Wildcard,
}

/// Front-end specific rendering rules for values the harness cannot compute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoercionRules {
    pub symbolic: SymbolicPolicy,
    /// Text an indeterminate value prints through a numeric placeholder.
    pub indeterminate_numeric: String,
    /// Text an indeterminate value prints through `%s` or `%c`.
    pub indeterminate_string: String,
    /// Size numeric placeholders without an explicit width to the argument's bit width, as `$display` does.
    /// `%0d` style placeholders always print the minimal width.
    pub auto_width: bool,
}

impl Default for CoercionRules {
    fn default() -> Self {
        Self {
            symbolic: SymbolicPolicy::Coerce,
            indeterminate_numeric: "0".to_string(),
            indeterminate_string: "x".to_string(),
            auto_width: true,
        }
    }
}

impl CoercionRules {
    /// Set the symbolic argument policy
    pub fn with_symbolic(mut self, policy: SymbolicPolicy) -> Self {
        self.symbolic = policy;
        self
    }

    /// Set the numeric rendering of an indeterminate value
    pub fn with_indeterminate_numeric(mut self, text: impl Into<String>) -> Self {
        self.indeterminate_numeric = text.into();
        self
    }

    /// Enable or disable automatic sizing of numeric placeholders
    pub fn with_auto_width(mut self, auto_width: bool) -> Self {
        self.auto_width = auto_width;
        self
    }
}

/// Errors raised while parsing a template or rendering it against arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// `%` at the end of the template.
    DanglingPercent,
    /// A conversion character the renderer does not support.
    UnsupportedConversion(char),
    /// Number of declared arguments differs from the number of placeholders.
    ArgCountMismatch { placeholders: usize, args: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::DanglingPercent => write!(f, "template ends with a lone '%'"),
            FormatError::UnsupportedConversion(c) => write!(f, "unsupported placeholder '%{}'", c),
            FormatError::ArgCountMismatch { placeholders, args } => write!(
                f,
                "template has {} placeholder(s) but {} argument(s) were declared",
                placeholders, args
            ),
        }
    }
}

impl std::error::Error for FormatError {}

impl Template {
    /// Parse a template string (escape sequences already resolved).
    pub fn parse(source: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                text.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                text.push('%');
                continue;
            }

            let mut left_align = false;
            let mut zero_pad = false;
            if chars.peek() == Some(&'-') {
                chars.next();
                left_align = true;
            }
            let mut width_digits = String::new();
            while let Some(d) = chars.peek().copied().filter(|d| d.is_ascii_digit()) {
                width_digits.push(d);
                chars.next();
            }
            if width_digits.len() > 1 && width_digits.starts_with('0') {
                zero_pad = true;
            }
            let width = width_digits.parse::<usize>().ok();

            let Some(conv) = chars.next() else {
                return Err(FormatError::DanglingPercent);
            };
            let kind = PlaceholderKind::from_conversion(conv).ok_or(FormatError::UnsupportedConversion(conv))?;

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Placeholder(Placeholder {
                kind,
                width,
                zero_pad,
                left_align,
            }));
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed pieces in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of argument-consuming placeholders.
    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder(_)))
            .count()
    }

    /// Render the template against declared arguments.
    ///
    /// The argument count must equal the placeholder count; nothing is truncated or padded.
    pub fn render(&self, args: &[Arg], rules: &CoercionRules) -> Result<RenderedLine, FormatError> {
        let placeholders = self.placeholder_count();
        if placeholders != args.len() {
            return Err(FormatError::ArgCountMismatch {
                placeholders,
                args: args.len(),
            });
        }

        let mut line = RenderedLine::default();
        let mut args = args.iter();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => line.push_text(text),
                Segment::Placeholder(ph) => {
                    let Some(arg) = args.next() else {
                        return Err(FormatError::ArgCountMismatch {
                            placeholders,
                            args: 0,
                        });
                    };
                    match render_arg(ph, arg, rules) {
                        Some(text) => line.push_text(&pad(ph, text)),
                        None => line.pieces.push(Piece::Hole(ph.kind)),
                    }
                }
            }
        }
        Ok(line)
    }
}

/// Render one argument, or `None` when it should match as a wildcard.
fn render_arg(ph: &Placeholder, arg: &Arg, rules: &CoercionRules) -> Option<String> {
    let value = match arg {
        Arg::Symbolic(_) => {
            return match rules.symbolic {
                SymbolicPolicy::Wildcard => None,
                SymbolicPolicy::Coerce if ph.kind.is_numeric() => Some(rules.indeterminate_numeric.clone()),
                SymbolicPolicy::Coerce => Some(rules.indeterminate_string.clone()),
            };
        }
        Arg::Str(s) => match ph.kind {
            PlaceholderKind::String => return Some(s.clone()),
            PlaceholderKind::Char => return Some(s.chars().next().map(String::from).unwrap_or_default()),
            _ => LogicValue::from_bytes(s.as_bytes()),
        },
        Arg::Logic(v) => v.clone(),
    };

    let text = match ph.kind {
        PlaceholderKind::Decimal => value.to_decimal(),
        PlaceholderKind::Hex => value.to_radix(4),
        PlaceholderKind::Octal => value.to_radix(3),
        PlaceholderKind::Binary => value.to_radix(1),
        PlaceholderKind::Char => value
            .low_byte_char()
            .map(String::from)
            .unwrap_or_else(|| rules.indeterminate_string.clone()),
        PlaceholderKind::String => value
            .to_packed_string()
            .unwrap_or_else(|| rules.indeterminate_string.clone()),
    };

    if ph.width.is_none() && rules.auto_width && ph.kind.is_numeric() {
        return Some(size_to_value(ph.kind, &value, text));
    }
    Some(text)
}

/// Pad `text` to the number of digits the largest value of `value`'s width needs in this radix.
fn size_to_value(kind: PlaceholderKind, value: &LogicValue, text: String) -> String {
    let width = value.width();
    let (digits, fill) = match kind {
        PlaceholderKind::Decimal => {
            let extreme = if value.is_signed() {
                let mut bits = vec![Bit::Zero; width];
                bits[0] = Bit::One;
                LogicValue::from_bits(bits, true)
            } else {
                LogicValue::from_bits(vec![Bit::One; width], false)
            };
            (extreme.to_decimal().len(), ' ')
        }
        PlaceholderKind::Hex => (width.div_ceil(4), '0'),
        PlaceholderKind::Octal => (width.div_ceil(3), '0'),
        PlaceholderKind::Binary => (width, '0'),
        PlaceholderKind::Char | PlaceholderKind::String => return text,
    };
    let len = text.chars().count();
    if len >= digits {
        return text;
    }
    let mut out: String = std::iter::repeat_n(fill, digits - len).collect();
    out.push_str(&text);
    out
}

fn pad(ph: &Placeholder, text: String) -> String {
    let Some(width) = ph.width else {
        return text;
    };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = width - len;
    if ph.left_align {
        format!("{}{}", text, " ".repeat(fill))
    } else if ph.zero_pad && ph.kind.is_numeric() {
        match text.strip_prefix('-') {
            Some(digits) => format!("-{}{}", "0".repeat(fill), digits),
            None => format!("{}{}", "0".repeat(fill), text),
        }
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}

/// Piece of a rendered line: exact text, or a hole left by a wildcard argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Hole(PlaceholderKind),
}

/// The expected runtime line produced by rendering a directive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedLine {
    pieces: Vec<Piece>,
}

impl RenderedLine {
    fn push_text(&mut self, text: &str) {
        if let Some(Piece::Text(last)) = self.pieces.last_mut() {
            last.push_str(text);
        } else {
            self.pieces.push(Piece::Text(text.to_string()));
        }
    }

    /// Rendered pieces.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// The exact expected text, when no argument was left as a wildcard.
    pub fn as_exact(&self) -> Option<String> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Hole(_) => return None,
            }
        }
        Some(out)
    }

    /// Check whether `line` is what this rendering describes.
    ///
    /// Text pieces compare byte-for-byte; holes accept any text their placeholder kind could print.
    pub fn matches(&self, line: &str) -> bool {
        match self.as_exact() {
            Some(exact) => exact == line,
            None => match_pieces(&self.pieces, line, 0, 0, &mut HashSet::new()),
        }
    }
}

/// Match `pieces[piece..]` against `line[at..]`.
///
/// `failed` remembers (piece, offset) states already known not to match, which keeps consecutive holes
/// polynomial instead of trying every split of the line again and again.
fn match_pieces(pieces: &[Piece], line: &str, piece: usize, at: usize, failed: &mut HashSet<(usize, usize)>) -> bool {
    let Some(current) = pieces.get(piece) else {
        return at == line.len();
    };
    if failed.contains(&(piece, at)) {
        return false;
    }
    let rest = &line[at..];
    let matched = match current {
        Piece::Text(t) => rest.starts_with(t.as_str()) && match_pieces(pieces, line, piece + 1, at + t.len(), failed),
        Piece::Hole(kind) => rest
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(rest.len()))
            .any(|end| kind.accepts(&rest[..end]) && match_pieces(pieces, line, piece + 1, at + end, failed)),
    };
    if !matched {
        failed.insert((piece, at));
    }
    matched
}

impl fmt::Display for RenderedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for piece in &self.pieces {
            match piece {
                Piece::Text(t) => f.write_str(t)?,
                Piece::Hole(kind) => write!(f, "<{:?}>", kind)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, args: &[Arg]) -> Result<RenderedLine, FormatError> {
        Template::parse(template)?.render(args, &CoercionRules::default())
    }

    #[test]
    fn test_string_and_decimal_literals() {
        let line = render(
            ":assert: ('%s' == %d)",
            &[Arg::Str("x".into()), Arg::Logic(LogicValue::parse("1'b0").unwrap())],
        )
        .unwrap();
        assert_eq!(line.as_exact().as_deref(), Some(":assert: ('x' == 0)"));
    }

    #[test]
    fn test_symbolic_coerces_to_indeterminate_rendering() {
        let line = render(":assert: ('%s' == %d)", &[Arg::Str("x".into()), Arg::Symbolic("c".into())]).unwrap();
        assert!(line.matches(":assert: ('x' == 0)"));
        assert!(!line.matches(":assert: ('x' == 1)"));
    }

    #[test]
    fn test_symbolic_wildcard_accepts_any_decimal() {
        let rules = CoercionRules::default().with_symbolic(SymbolicPolicy::Wildcard);
        let line = Template::parse("value=%d!")
            .unwrap()
            .render(&[Arg::Symbolic("count".into())], &rules)
            .unwrap();
        assert!(line.matches("value=17!"));
        assert!(line.matches("value=-3!"));
        assert!(line.matches("value=x!"));
        assert!(!line.matches("value=abc!"));
        assert!(!line.matches("value=!"));
    }

    #[test]
    fn test_many_wildcard_holes_reject_quickly() {
        let rules = CoercionRules::default().with_symbolic(SymbolicPolicy::Wildcard);
        let template = format!(":assert: {}!", "%s ".repeat(16));
        let args: Vec<Arg> = (0..16).map(|i| Arg::Symbolic(format!("v{}", i))).collect();
        let line = Template::parse(&template).unwrap().render(&args, &rules).unwrap();

        let output = format!(":assert: {}?", "ab ".repeat(24));
        let start = std::time::Instant::now();
        assert!(!line.matches(&output));
        assert!(start.elapsed() < std::time::Duration::from_secs(1), "took {:?}", start.elapsed());

        let output = format!(":assert: {}!", "ab ".repeat(16));
        assert!(line.matches(&output));
    }

    #[test]
    fn test_percent_escape() {
        let line = render("100%% of %0d", &[Arg::Logic(LogicValue::parse("3").unwrap())]).unwrap();
        assert_eq!(line.as_exact().as_deref(), Some("100% of 3"));
    }

    #[test]
    fn test_widths() {
        let five = Arg::Logic(LogicValue::parse("5").unwrap());
        assert_eq!(render("[%4d]", &[five.clone()]).unwrap().as_exact().as_deref(), Some("[   5]"));
        assert_eq!(render("[%04d]", &[five.clone()]).unwrap().as_exact().as_deref(), Some("[0005]"));
        assert_eq!(render("[%-3s]", &[Arg::Str("a".into())]).unwrap().as_exact().as_deref(), Some("[a  ]"));
        assert_eq!(render("[%0d]", &[five]).unwrap().as_exact().as_deref(), Some("[5]"));
    }

    #[test]
    fn test_unknown_bits_through_radix_placeholders() {
        let v = Arg::Logic(LogicValue::parse("8'b1101x001").unwrap());
        let line = render("%h %b %d", &[v.clone(), v.clone(), v]).unwrap();
        assert_eq!(line.as_exact().as_deref(), Some("dX 1101x001   X"));
    }

    #[test]
    fn test_string_through_decimal_packs_bytes() {
        let line = render("%d", &[Arg::Str("A".into())]).unwrap();
        assert_eq!(line.as_exact().as_deref(), Some(" 65"));
    }

    #[test]
    fn test_auto_width_follows_bit_width() {
        let int = Arg::Logic(LogicValue::parse("12").unwrap());
        let line = render("[%d] [%o] [%h]", &[int.clone(), int.clone(), int.clone()]).unwrap();
        assert_eq!(line.as_exact().as_deref(), Some("[         12] [00000000014] [0000000c]"));

        let rules = CoercionRules::default().with_auto_width(false);
        let line = Template::parse("[%d] [%h]").unwrap().render(&[int.clone(), int], &rules).unwrap();
        assert_eq!(line.as_exact().as_deref(), Some("[12] [c]"));
    }

    #[test]
    fn test_signed_decimal_width_includes_sign() {
        let v = Arg::Logic(LogicValue::parse("-4'sd3").unwrap());
        assert_eq!(render("[%d]", &[v]).unwrap().as_exact().as_deref(), Some("[-3]"));
    }

    #[test]
    fn test_arg_count_mismatch_is_an_error() {
        assert_eq!(
            render("%d %d", &[Arg::Symbolic("a".into())]),
            Err(FormatError::ArgCountMismatch { placeholders: 2, args: 1 })
        );
        assert_eq!(
            render("no placeholders", &[Arg::Symbolic("a".into())]),
            Err(FormatError::ArgCountMismatch { placeholders: 0, args: 1 })
        );
    }

    #[test]
    fn test_unsupported_conversion() {
        assert_eq!(Template::parse("%t").unwrap_err(), FormatError::UnsupportedConversion('t'));
        assert_eq!(Template::parse("50%").unwrap_err(), FormatError::DanglingPercent);
    }
}
