use crate::error::{DomError, DomResult};
use crate::tree::{Dom, NodeId};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

impl Dom {
    /// Parse an HTML-like string and append the resulting nodes as children
    /// of `parent`.
    ///
    /// This is a small forgiving parser covering the template subset:
    /// elements with quoted/unquoted/bare attributes, self-closing and void
    /// elements, comments, and basic entities. Unclosed elements are closed
    /// at end of input; stray closing tags are ignored.
    pub fn parse_markup(&mut self, parent: NodeId, html: &str) -> DomResult<()> {
        let mut scanner = Scanner {
            bytes: html.as_bytes(),
            src: html,
            pos: 0,
        };
        let mut stack = vec![parent];

        loop {
            let text = scanner.take_until(b'<');
            if !text.is_empty() {
                let content = decode_entities(text);
                let node = self.create_text(content);
                self.append_child(stack.last().copied().unwrap_or(parent), node);
            }
            if scanner.at_end() {
                return Ok(());
            }

            if scanner.eat_str("<!--") {
                let content = scanner.take_until_str("-->");
                let node = self.create_comment(content.to_string());
                self.append_child(stack.last().copied().unwrap_or(parent), node);
                continue;
            }

            if scanner.eat_str("</") {
                let name = scanner.take_name().to_ascii_lowercase();
                scanner.skip_past(b'>');
                if let Some(pos) = stack
                    .iter()
                    .skip(1)
                    .rposition(|&id| self.tag_name(id) == Some(name.as_str()))
                {
                    stack.truncate(pos + 1);
                }
                continue;
            }

            if scanner.eat_str("<!") || scanner.eat_str("<?") {
                scanner.skip_past(b'>');
                continue;
            }

            if scanner.peek_ahead(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                scanner.advance(1); // consume '<'
                let tag = scanner.take_name().to_ascii_lowercase();
                let element = self.create_element(&tag);
                self.parse_attributes(&mut scanner, element)?;

                let self_closing = scanner.eat_str("/>");
                if !self_closing && !scanner.eat_str(">") {
                    return Err(DomError::unexpected_eof(scanner.pos));
                }
                self.append_child(stack.last().copied().unwrap_or(parent), element);
                if !self_closing && !is_void_element(&tag) {
                    stack.push(element);
                }
                continue;
            }

            // A '<' that opens nothing is plain text.
            scanner.advance(1);
            let node = self.create_text("<");
            self.append_child(stack.last().copied().unwrap_or(parent), node);
        }
    }

    fn parse_attributes(&mut self, scanner: &mut Scanner<'_>, element: NodeId) -> DomResult<()> {
        loop {
            scanner.skip_whitespace();
            match scanner.peek() {
                None => return Err(DomError::unexpected_eof(scanner.pos)),
                Some(b'>') | Some(b'/') => return Ok(()),
                _ => {}
            }

            let name = scanner.take_attr_name().to_ascii_lowercase();
            if name.is_empty() {
                return Err(DomError::invalid_markup(scanner.pos, "expected attribute name"));
            }
            scanner.skip_whitespace();

            let value = if scanner.eat_str("=") {
                scanner.skip_whitespace();
                match scanner.peek() {
                    Some(q @ (b'"' | b'\'')) => {
                        scanner.advance(1);
                        let raw = scanner.take_until(q);
                        if scanner.at_end() {
                            return Err(DomError::unexpected_eof(scanner.pos));
                        }
                        scanner.advance(1);
                        decode_entities(raw)
                    }
                    _ => decode_entities(scanner.take_unquoted_value()),
                }
            } else {
                String::new()
            };

            if self.attribute(element, &name).is_none() {
                self.set_attribute(element, name, value);
            }
        }
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.bytes.len());
    }

    fn eat_str(&mut self, prefix: &str) -> bool {
        if self.src[self.pos..].starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn take_until(&mut self, stop: u8) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == stop {
                break;
            }
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn take_until_str(&mut self, stop: &str) -> &'a str {
        let start = self.pos;
        match self.src[start..].find(stop) {
            Some(offset) => {
                self.pos = start + offset + stop.len();
                &self.src[start..start + offset]
            }
            None => {
                self.pos = self.bytes.len();
                &self.src[start..]
            }
        }
    }

    fn skip_past(&mut self, stop: u8) {
        self.take_until(stop);
        self.advance(1);
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_name(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn take_attr_name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| {
            !b.is_ascii_whitespace() && b != b'=' && b != b'>' && b != b'/'
        }) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn take_unquoted_value(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
        {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match rest[1..].find(';') {
            Some(len) if len <= 10 => {
                let name = &rest[1..1 + len];
                let decoded = match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => decode_numeric_entity(name),
                };
                match decoded {
                    Some(c) => {
                        out.push(c);
                        rest = &rest[len + 2..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            _ => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_numeric_entity(name: &str) -> Option<char> {
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code)
}
