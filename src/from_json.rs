use std::io::Read;

use log::debug;

use crate::error::{ParseError, Result};
use crate::matchers::{skip_byte_order_marker, skip_whitespace_and_newline};
use crate::options::ParseOptions;
use crate::parse_result::ParseResult::{self, *};
use crate::parser::Parser;
use crate::tree::{Array, Object, PropertyTree};

const NUMBER_CHARS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '+', '-', '.', 'e', 'E',
];

/// Parse a JSON document. All-or-nothing: any syntax error aborts.
pub fn from_json(input: &str) -> Result<PropertyTree> {
    from_json_with(input, &ParseOptions::default())
}

pub fn from_json_with(input: &str, options: &ParseOptions) -> Result<PropertyTree> {
    debug!("parsing json ({} bytes)", input.len());
    let result = options
        .open(input)
        .and_then(|mut p| JsonParser { options }.parse_document(&mut p));
    if let Err(err) = &result {
        debug!("json parse failed: {err}");
    }
    Ok(result?)
}

/// Reads the whole source into memory, then parses it.
pub fn from_json_reader(reader: impl Read) -> Result<PropertyTree> {
    from_json(&crate::read_source(reader)?)
}

struct JsonParser<'o> {
    options: &'o ParseOptions,
}

impl JsonParser<'_> {
    fn parse_document(&self, p: &mut Parser<'_>) -> Result<PropertyTree, ParseError> {
        skip_byte_order_marker(p);
        let value = self
            .parse_value(p, 0)
            .require(|| p.error("expected a JSON value"))?;
        skip_whitespace_and_newline(p);
        if !p.eof() {
            return Err(p.error("unexpected content after the JSON value"));
        }
        Ok(value)
    }

    fn parse_value(&self, p: &mut Parser<'_>, depth: usize) -> ParseResult<PropertyTree> {
        skip_whitespace_and_newline(p);
        if p.check("null") {
            return Matched(PropertyTree::Null);
        }
        if p.check("true") {
            return Matched(PropertyTree::Bool(true));
        }
        if p.check("false") {
            return Matched(PropertyTree::Bool(false));
        }
        match p.peek_char() {
            Some('"') => parse_string(p).map(PropertyTree::String),
            Some('[') => self.parse_array(p, depth).into(),
            Some('{') => self.parse_object(p, depth).into(),
            Some(c) if NUMBER_CHARS.contains(&c) => parse_number(p).into(),
            _ => Unmatched,
        }
    }

    fn parse_array(&self, p: &mut Parser<'_>, depth: usize) -> Result<PropertyTree, ParseError> {
        let depth = self.options.nest(p, depth)?;
        p.check_char('[');
        let mut items = Array::new();
        skip_whitespace_and_newline(p);
        if p.check_char(']') {
            return Ok(PropertyTree::Array(items));
        }
        loop {
            let item = self
                .parse_value(p, depth)
                .require(|| p.error("expected a JSON value"))?;
            items.push(item);
            skip_whitespace_and_newline(p);
            if p.check_char(',') {
                continue;
            }
            if p.check_char(']') {
                return Ok(PropertyTree::Array(items));
            }
            return Err(p.error("expected ',' or ']'"));
        }
    }

    fn parse_object(&self, p: &mut Parser<'_>, depth: usize) -> Result<PropertyTree, ParseError> {
        let depth = self.options.nest(p, depth)?;
        p.check_char('{');
        let mut entries = Object::new();
        skip_whitespace_and_newline(p);
        if p.check_char('}') {
            return Ok(PropertyTree::Object(entries));
        }
        loop {
            skip_whitespace_and_newline(p);
            let key = parse_string(p).require(|| p.error("expected a string key"))?;
            skip_whitespace_and_newline(p);
            if !p.check_char(':') {
                return Err(p.error("expected ':'"));
            }
            let value = self
                .parse_value(p, depth)
                .require(|| p.error("expected a JSON value"))?;
            entries.insert(key, value);
            skip_whitespace_and_newline(p);
            if p.check_char(',') {
                continue;
            }
            if p.check_char('}') {
                return Ok(PropertyTree::Object(entries));
            }
            return Err(p.error("expected ',' or '}'"));
        }
    }
}

/// Longest run of number characters; integer unless it holds `.`, `e`
/// or `E`.
fn parse_number(p: &mut Parser<'_>) -> Result<PropertyTree, ParseError> {
    let text = p
        .match_each(NUMBER_CHARS)
        .require(|| p.error("expected a number"))?;
    if text.contains(['.', 'e', 'E']) {
        match text.parse::<f64>() {
            Ok(d) if d.is_finite() => Ok(PropertyTree::Double(d)),
            Ok(_) => Err(p.error(format!("number {text:?} is out of range"))),
            Err(e) => Err(p.error(format!("invalid number {text:?}: {e}"))),
        }
    } else {
        text.parse::<i64>()
            .map(PropertyTree::Integer)
            .map_err(|e| p.error(format!("invalid number {text:?}: {e}")))
    }
}

fn parse_string(p: &mut Parser<'_>) -> ParseResult<String> {
    if !p.check_char('"') {
        return Unmatched;
    }
    let mut s = String::new();
    loop {
        if let Matched(text) = p.match_with(|c| c != '"' && c != '\\' && c >= ' ') {
            s.push_str(text);
        }
        match p.peek_char() {
            None => return Error(p.error("unterminated string")),
            Some('"') => {
                p.advance();
                return Matched(s);
            }
            Some('\\') => {
                p.advance();
                match parse_escape(p) {
                    Ok(c) => s.push(c),
                    Err(e) => return Error(e),
                }
            }
            Some(c) => {
                return Error(p.error(format!("control character {c:?} in string")));
            }
        }
    }
}

fn parse_escape(p: &mut Parser<'_>) -> Result<char, ParseError> {
    let c = p
        .peek_char()
        .ok_or_else(|| p.error("unterminated escape sequence"))?;
    p.advance();
    Ok(match c {
        '"' => '"',
        '\\' => '\\',
        '/' => '/',
        'b' => '\u{0008}',
        'f' => '\u{000C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'u' => return parse_unicode_escape(p),
        other => return Err(p.error(format!("unknown escape sequence '\\{other}'"))),
    })
}

/// The four hex digits after `\u`, joining a surrogate pair when one
/// follows. Lone surrogates decode to U+FFFD.
fn parse_unicode_escape(p: &mut Parser<'_>) -> Result<char, ParseError> {
    let high = parse_hex4(p)?;
    if !(0xD800..=0xDBFF).contains(&high) {
        return Ok(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    let mut state = p.scope();
    if !state.check("\\u") {
        return Ok(char::REPLACEMENT_CHARACTER);
    }
    let low = parse_hex4(&mut state)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return Ok(char::REPLACEMENT_CHARACTER);
    }
    state.accept();
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
}

fn parse_hex4(p: &mut Parser<'_>) -> Result<u32, ParseError> {
    let code = p
        .remaining()
        .get(..4)
        .filter(|digits| digits.chars().all(|c| c.is_ascii_hexdigit()))
        .and_then(|digits| u32::from_str_radix(digits, 16).ok())
        .ok_or_else(|| p.error("expected four hex digits after \\u"))?;
    p.advance_by(4);
    Ok(code)
}
