//! Assertion directive extraction.
//!
//! A directive is a call to one of the front end's output primitives whose first argument is a string literal
//! starting with the `:assert:` marker:
//!
//! ```text
//! $display(":assert: ('%s' == %d)", "x", c);
//! ```
//!
//! The literal is the format template; the remaining arguments are the declared arguments, kept in
//! declaration order.

use svconform_core::lang::metadata::{ASSERT_MARKER, OUTPUT_PRIMITIVES};
use svconform_core::{Arg, CoercionRules, FormatError, LiteralError, LogicValue, RenderedLine, Template};

use crate::diagnostics::{FixtureError, span};
use crate::scanner::{Token, TokenKind, line_of, scan};

/// One embedded expectation of runtime output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionDirective {
    /// Output primitive the directive was declared with (e.g. `$display`).
    pub primitive: String,
    /// Full template, marker included.
    pub template: Template,
    /// Declared arguments, in order.
    pub args: Vec<Arg>,
    /// 1-based source line of the call.
    pub line: usize,
}

impl AssertionDirective {
    /// The template text after the `:assert:` marker.
    pub fn format_template(&self) -> &str {
        let source = self.template.source();
        source.strip_prefix(ASSERT_MARKER).unwrap_or(source).trim_start()
    }

    /// Render the expected runtime line.
    pub fn render(&self, rules: &CoercionRules) -> Result<RenderedLine, FormatError> {
        self.template.render(&self.args, rules)
    }
}

struct Call<'t> {
    start: usize,
    end: usize,
    args: Vec<&'t [Token]>,
}

/// Extract every assertion directive in `source`.
///
/// Malformed directives are returned as errors and do not stop extraction of later ones.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn extract_directives(source: &str) -> (Vec<AssertionDirective>, Vec<FixtureError>) {
    let tokens = scan(source);
    let mut directives = Vec::new();
    let mut errors = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let is_primitive = token.kind == TokenKind::Word && OUTPUT_PRIMITIVES.contains(&token.text(source));
        if !is_primitive || !matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::Open('('))) {
            i += 1;
            continue;
        }

        let first_arg_is_marker = matches!(
            tokens.get(i + 2).map(|t| &t.kind),
            Some(TokenKind::Str { value, .. }) if value.starts_with(ASSERT_MARKER)
        );
        if !first_arg_is_marker {
            i += 1;
            continue;
        }

        match split_call(&tokens, i) {
            Some(call) => {
                match build_directive(source, token.text(source), &call) {
                    Ok(directive) => directives.push(directive),
                    Err(err) => errors.push(err),
                }
                i = tokens
                    .iter()
                    .position(|t| t.start >= call.end)
                    .unwrap_or(tokens.len());
            }
            None => {
                errors.push(FixtureError::UnterminatedDirective {
                    span: span(token.start, token.end - token.start),
                });
                i += 1;
            }
        }
    }

    tracing::debug!(directives = directives.len(), errors = errors.len(), "directives extracted");
    (directives, errors)
}

/// Split `primitive ( a, b, ... )` into top-level arguments. `None` when the call never closes.
fn split_call(tokens: &[Token], primitive: usize) -> Option<Call<'_>> {
    let open = primitive + 1;
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut arg_start = open + 1;

    for (idx, token) in tokens.iter().enumerate().skip(open + 1) {
        match token.kind {
            TokenKind::Open(_) => depth += 1,
            TokenKind::Close(_) if depth > 0 => depth -= 1,
            TokenKind::Close(_) => {
                args.push(&tokens[arg_start..idx]);
                return Some(Call {
                    start: tokens[primitive].start,
                    end: token.end,
                    args,
                });
            }
            TokenKind::Comma if depth == 0 => {
                args.push(&tokens[arg_start..idx]);
                arg_start = idx + 1;
            }
            TokenKind::Semi if depth == 0 => return None,
            _ => {}
        }
    }
    None
}

fn build_directive(source: &str, primitive: &str, call: &Call<'_>) -> Result<AssertionDirective, FixtureError> {
    let call_span = span(call.start, call.end - call.start);

    let template = match call.args.first().copied() {
        Some([
            Token {
                kind: TokenKind::Str { value, terminated: true },
                ..
            },
        ]) => value.clone(),
        Some([token, ..]) if matches!(token.kind, TokenKind::Str { terminated: false, .. }) => {
            return Err(FixtureError::UnterminatedString {
                span: span(token.start, token.end - token.start),
            });
        }
        _ => return Err(FixtureError::TemplateNotLiteral { span: call_span }),
    };

    let template = Template::parse(&template).map_err(|reason| FixtureError::Template {
        reason,
        span: call_span,
    })?;

    let mut args = Vec::with_capacity(call.args.len().saturating_sub(1));
    for arg in call.args.iter().skip(1) {
        args.push(classify_arg(source, arg, call)?);
    }

    let placeholders = template.placeholder_count();
    if placeholders != args.len() {
        return Err(FixtureError::Template {
            reason: FormatError::ArgCountMismatch {
                placeholders,
                args: args.len(),
            },
            span: call_span,
        });
    }

    Ok(AssertionDirective {
        primitive: primitive.to_string(),
        template,
        args,
        line: line_of(source, call.start),
    })
}

fn classify_arg(source: &str, tokens: &[Token], call: &Call<'_>) -> Result<Arg, FixtureError> {
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return Err(FixtureError::EmptyArgument {
            span: span(call.start, call.end - call.start),
        });
    };

    if let [token] = tokens {
        if let TokenKind::Str { value, terminated } = &token.kind {
            if !terminated {
                return Err(FixtureError::UnterminatedString {
                    span: span(token.start, token.end - token.start),
                });
            }
            return Ok(Arg::Str(value.clone()));
        }
    }

    let text = source[first.start..last.end].trim();
    match LogicValue::parse(text) {
        Ok(value) => Ok(Arg::Logic(value)),
        Err(reason @ LiteralError::TooWide(_)) => Err(FixtureError::Literal {
            reason,
            span: span(first.start, last.end - first.start),
        }),
        Err(_) => Ok(Arg::Symbolic(text.to_string())),
    }
}
