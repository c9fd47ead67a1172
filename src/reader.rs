//! Textual reader: source text to value trees. Plain recursive descent over
//! bytes; its only coupling to the rest of the runtime is the heap it
//! allocates into.

use crate::{
    diagnostics::{Diagnostic, Result, SourceSpan},
    heap::Heap,
    value::Value,
};

const MAX_NESTING: usize = 1024;

/// Parses exactly one expression; trailing input is an error.
pub fn parse(heap: &mut Heap, source: &str) -> Result<Value> {
    let mut reader = Reader::new(heap, source);
    let value = reader.read_expr(0)?;
    reader.skip_trivia();
    if !reader.at_end() {
        return Err(reader.error_here("trailing input after expression"));
    }
    Ok(value)
}

/// Multi-expression mode: parses a whitespace-separated top-level sequence
/// into a proper list of forms, in source order.
pub fn parse_multi(heap: &mut Heap, source: &str) -> Result<Value> {
    let mut forms = Vec::new();
    let mut reader = Reader::new(heap, source);
    loop {
        reader.skip_trivia();
        if reader.at_end() {
            break;
        }
        forms.push(reader.read_expr(0)?);
    }
    Ok(reader.heap.list(&forms))
}

struct Reader<'a> {
    heap: &'a mut Heap,
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(heap: &'a mut Heap, source: &'a str) -> Self {
        Self {
            heap,
            src: source.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn error_at(&self, start: usize, message: impl Into<String>) -> crate::diagnostics::TansyError {
        Diagnostic::parser(message)
            .with_span(SourceSpan::new(start, self.pos))
            .into()
    }

    fn error_here(&self, message: impl Into<String>) -> crate::diagnostics::TansyError {
        self.error_at(self.pos, message)
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b';' => {
                    while let Some(byte) = self.peek() {
                        self.pos += 1;
                        if byte == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_expr(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_NESTING {
            return Err(self.error_here("expression nesting too deep"));
        }
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error_here("unexpected end of input")),
            Some(b'(') => self.read_list(depth),
            Some(b')') => Err(self.error_here("unexpected `)`")),
            Some(b'"') => self.read_string(),
            Some(b'#') => self.read_bool(),
            Some(byte) if is_atom_start(byte) => self.read_atom(),
            Some(byte) => Err(self.error_here(format!(
                "unexpected character `{}`",
                char::from(byte)
            ))),
        }
    }

    fn read_list(&mut self, depth: usize) -> Result<Value> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error_at(start, "unterminated list")),
                Some(b')') => {
                    self.pos += 1;
                    return Ok(self.heap.list(&items));
                }
                Some(_) => items.push(self.read_expr(depth + 1)?),
            }
        }
    }

    fn read_bool(&mut self) -> Result<Value> {
        let start = self.pos;
        self.pos += 1;
        let value = match self.peek() {
            Some(b't') => true,
            Some(b'f') => false,
            _ => return Err(self.error_at(start, "expected `#t` or `#f`")),
        };
        self.pos += 1;
        // `#true` is not a longer spelling of `#t`.
        if let Some(byte) = self.peek() {
            if is_symbol_char(byte) {
                return Err(self.error_at(start, "expected `#t` or `#f`"));
            }
        }
        Ok(self.heap.bool_value(value))
    }

    fn read_string(&mut self) -> Result<Value> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "unterminated string literal")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(self.heap.string(text));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'\\') => text.push('\\'),
                        Some(b'"') => text.push('"'),
                        Some(b'n') => text.push('\n'),
                        _ => return Err(self.error_here("unknown string escape")),
                    }
                    self.pos += 1;
                }
                Some(_) => {
                    // Multi-byte UTF-8 sequences pass through untouched.
                    let rest = &self.src[self.pos..];
                    let ch_len = utf8_len(rest[0]);
                    let chunk = std::str::from_utf8(&rest[..ch_len.min(rest.len())])
                        .map_err(|_| self.error_here("invalid UTF-8 in string literal"))?;
                    text.push_str(chunk);
                    self.pos += chunk.len();
                }
            }
        }
    }

    fn read_atom(&mut self) -> Result<Value> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if is_symbol_char(byte) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos])
            .map_err(|_| self.error_at(start, "invalid UTF-8 in token"))?;
        let mut digits = text.chars();
        let looks_numeric = match digits.next() {
            Some(ch) if ch.is_ascii_digit() => true,
            Some('-') => digits.next().map(|ch| ch.is_ascii_digit()).unwrap_or(false),
            _ => false,
        };
        if looks_numeric {
            let value = text
                .parse::<i64>()
                .map_err(|_| self.error_at(start, format!("invalid integer literal `{text}`")))?;
            return Ok(self.heap.integer(value));
        }
        Ok(self.heap.intern(text))
    }
}

fn is_atom_start(byte: u8) -> bool {
    is_symbol_char(byte)
}

fn is_symbol_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-+*/?<>=!_%.&~:".contains(&byte)
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}
