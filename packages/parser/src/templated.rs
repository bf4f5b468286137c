use crate::ast::TemplateSegment;
use crate::error::{ParseError, ParseResult};
use crate::parser::parse_expression;

/// Parse templated text into literal and interpolation segments.
///
/// `{{expr}}` yields a text segment, `{{{expr}}}` an html segment and
/// `{{{{expr}}}}` a node segment; everything else is literal text. Closing
/// delimiters are located depth-aware, so braces inside dict literals,
/// subscripts and strings do not terminate an interpolation early.
pub fn parse_templated(source: &str) -> ParseResult<Vec<TemplateSegment>> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        let run_start = i;
        let mut run = 0;
        while i < bytes.len() && bytes[i] == b'{' {
            run += 1;
            i += 1;
        }
        if run < 2 {
            continue;
        }

        // At most four braces open an interpolation; extras stay literal.
        let open = run.min(4);
        let literal_end = run_start + (run - open);
        if literal_end > literal_start {
            segments.push(TemplateSegment::Literal {
                text: source[literal_start..literal_end].to_string(),
            });
        }

        let expr_start = i;
        let expr_end = find_closing(bytes, expr_start, open)?;
        let expr = parse_expression(&source[expr_start..expr_end])
            .map_err(|err| offset_error(err, expr_start))?;

        segments.push(match open {
            2 => TemplateSegment::Text { expr },
            3 => TemplateSegment::Html { expr },
            _ => TemplateSegment::Node { expr },
        });

        i = expr_end + open;
        literal_start = i;
    }

    if literal_start < bytes.len() {
        segments.push(TemplateSegment::Literal {
            text: source[literal_start..].to_string(),
        });
    }

    Ok(segments)
}

// Scan for a run of `need` closing braces at bracket depth zero, skipping
// string literals. Returns the index of the run's first brace.
fn find_closing(bytes: &[u8], from: usize, need: usize) -> ParseResult<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                i += 1;
            }
            b'{' | b'[' | b'(' => {
                depth += 1;
                i += 1;
            }
            b']' | b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    i += 1;
                    continue;
                }
                let start = i;
                let mut run = 0;
                while i < bytes.len() && bytes[i] == b'}' && run < need {
                    run += 1;
                    i += 1;
                }
                if run == need {
                    return Ok(start);
                }
                // Short run at depth zero; leave it to expression parsing.
            }
            _ => i += 1,
        }
    }

    Err(ParseError::invalid_syntax(from, "unterminated interpolation"))
}

fn offset_error(err: ParseError, delta: usize) -> ParseError {
    match err {
        ParseError::UnexpectedToken {
            pos,
            expected,
            found,
        } => ParseError::UnexpectedToken {
            pos: pos + delta,
            expected,
            found,
        },
        ParseError::UnexpectedEof { pos } => ParseError::UnexpectedEof { pos: pos + delta },
        ParseError::InvalidSyntax { pos, message } => ParseError::InvalidSyntax {
            pos: pos + delta,
            message,
        },
        ParseError::LexerError { pos } => ParseError::LexerError { pos: pos + delta },
    }
}
