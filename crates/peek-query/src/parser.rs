//! Character-level query parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! query   := or
//! or      := and ( "OR" and )*
//! and     := not ( ("AND")? not )*        adjacent terms AND implicitly
//! not     := ( "NOT" )? primary
//! primary := "(" or ")" | term
//! term    := ident ":" value | keyword
//! value   := qstring | "[" bound " TO " bound "]" | ident-with-wildcards
//! ```

use regex::Regex;

use crate::error::{QueryError, Result};
use crate::filter::Filter;
use crate::time::parse_time_bound;

/// Parses a non-empty, non-`*` query string.
pub(crate) fn parse(input: &str) -> Result<Filter> {
    let mut parser = Parser::new(input);
    let filter = parser.parse_or()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(QueryError::parse(
            "unexpected trailing input",
            parser.pos,
        ));
    }
    Ok(filter)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_or(&mut self) -> Result<Filter> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if self.peek_word("OR") {
                self.pos += 2;
                let right = self.parse_and()?;
                left = Filter::Or(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut left = self.parse_not()?;
        loop {
            self.skip_whitespace();
            if self.peek_word("AND") {
                self.pos += 3;
                let right = self.parse_not()?;
                left = Filter::And(Box::new(left), Box::new(right));
            } else if !self.at_end() && !self.peek_word("OR") && !self.peek_byte(b')') {
                // Adjacent term: implicit AND.
                let right = self.parse_not()?;
                left = Filter::And(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_not(&mut self) -> Result<Filter> {
        self.skip_whitespace();
        if self.peek_word("NOT") {
            self.pos += 3;
            let inner = self.parse_primary()?;
            return Ok(Filter::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Filter> {
        self.skip_whitespace();
        if self.at_end() {
            return Err(QueryError::parse("unexpected end of query", self.pos));
        }

        if self.peek_byte(b'(') {
            let open = self.pos;
            self.pos += 1;
            self.skip_whitespace();
            if self.peek_byte(b')') {
                return Err(QueryError::parse("empty group", open));
            }
            let inner = self.parse_or()?;
            self.skip_whitespace();
            if !self.peek_byte(b')') {
                return Err(QueryError::parse("expected closing parenthesis", self.pos));
            }
            self.pos += 1;
            return Ok(inner);
        }

        // A bare quoted string is a keyword term.
        if self.peek_byte(b'"') {
            let text = self.read_quoted()?;
            return Ok(Filter::Keyword(text.to_string()));
        }

        let ident_pos = self.pos;
        let ident = self.read_ident();
        if ident.is_empty() {
            if self.peek_byte(b':') {
                return Err(QueryError::parse("missing field name before ':'", ident_pos));
            }
            return Err(QueryError::parse("unexpected character", self.pos));
        }

        if self.peek_byte(b':') {
            self.pos += 1;
            return self.parse_field_value(ident);
        }

        Ok(Filter::Keyword(ident.to_string()))
    }

    fn parse_field_value(&mut self, field: &str) -> Result<Filter> {
        if self.at_end() {
            return Err(QueryError::parse("missing value after ':'", self.pos));
        }

        if self.peek_byte(b'"') {
            let value = self.read_quoted()?;
            return Ok(Filter::Field {
                name: field.to_string(),
                value: value.to_string(),
                exact: true,
            });
        }

        if self.peek_byte(b'[') {
            let open = self.pos;
            let inner = self.read_bracketed()?;
            return parse_range(field, inner, open);
        }

        let value_pos = self.pos;
        let value = self.read_value();
        if value.is_empty() {
            return Err(QueryError::parse("missing value after ':'", value_pos));
        }

        if value.contains('*') {
            let pattern = compile_wildcard(value, value_pos)?;
            return Ok(Filter::Wildcard {
                name: field.to_string(),
                pattern,
            });
        }

        Ok(Filter::Field {
            name: field.to_string(),
            value: value.to_string(),
            exact: false,
        })
    }

    /// Reads an identifier: stops at whitespace, parens, `:`, `"`, `[`.
    fn read_ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'(' | b')' | b':' | b'"' | b'[' => break,
                _ => self.pos += 1,
            }
        }
        &self.input[start..self.pos]
    }

    /// Reads a field value: stops at whitespace and parens only, so
    /// values may contain `:` or `*`.
    fn read_value(&mut self) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'(' | b')' => break,
                _ => self.pos += 1,
            }
        }
        &self.input[start..self.pos]
    }

    /// Reads a `"..."` string, returning its contents.
    fn read_quoted(&mut self) -> Result<&'a str> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'"' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(QueryError::parse("unterminated quote", open));
        }
        let contents = &self.input[start..self.pos];
        self.pos += 1;
        Ok(contents)
    }

    /// Reads a `[...]` group, returning its contents.
    fn read_bracketed(&mut self) -> Result<&'a str> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b']' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(QueryError::parse("unterminated range", open));
        }
        let contents = &self.input[start..self.pos];
        self.pos += 1;
        Ok(contents)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] == b' ' {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek_byte(&self, byte: u8) -> bool {
        self.bytes.get(self.pos) == Some(&byte)
    }

    /// True when `word` sits at the cursor as a whole token.
    fn peek_word(&self, word: &str) -> bool {
        let end = self.pos + word.len();
        if !self.input[self.pos..].starts_with(word) {
            return false;
        }
        match self.bytes.get(end) {
            None | Some(b' ' | b'(' | b')') => true,
            Some(_) => false,
        }
    }
}

/// Parses `start TO end` into a timestamp or numeric range filter.
fn parse_range(field: &str, inner: &str, position: usize) -> Result<Filter> {
    let Some((start, end)) = inner.split_once(" TO ") else {
        return Err(QueryError::parse(
            "range must be '[start TO end]'",
            position,
        ));
    };
    let start = start.trim();
    let end = end.trim();

    if field == "timestamp" {
        return Ok(Filter::TimestampRange {
            start: parse_time_bound(start),
            end: parse_time_bound(end),
        });
    }

    Ok(Filter::NumericRange {
        name: field.to_string(),
        start: start.parse().unwrap_or(0.0),
        end: end.parse().unwrap_or(0.0),
    })
}

/// Compiles `*`-wildcards into an anchored, case-insensitive regex.
///
/// Literal segments are escaped so patterns like `*[retry]*` match the
/// bracket characters themselves.
fn compile_wildcard(value: &str, position: usize) -> Result<Regex> {
    let mut pattern = String::from("(?i)^");
    for (i, part) in value.split('*').enumerate() {
        if i > 0 {
            pattern.push_str(".*");
        }
        pattern.push_str(&regex::escape(part));
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| QueryError::parse(format!("invalid wildcard: {e}"), position))
}
