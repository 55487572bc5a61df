use std::io::Read;

use log::debug;

use crate::error::{ParseError, Result};
use crate::matchers::*;
use crate::options::ParseOptions;
use crate::parse_result::ParseResult;
use crate::parser::{EofMode, Parser};
use crate::tree::{Object, PropertyTree};

/// Parse an INI document into `{section: {key: value}}`.
///
/// Values are typed by trying, in order: float, integer, boolean, UUID,
/// double-quoted string. `;` starts a comment that runs to end of line.
pub fn from_ini(input: &str) -> Result<PropertyTree> {
    from_ini_with(input, &ParseOptions::default())
}

pub fn from_ini_with(input: &str, options: &ParseOptions) -> Result<PropertyTree> {
    debug!("parsing ini ({} bytes)", input.len());
    // An empty file is a config with no sections.
    if input.is_empty() {
        return Ok(PropertyTree::Object(Object::new()));
    }
    let result = options.open(input).and_then(|mut p| parse_document(&mut p));
    if let Err(err) = &result {
        debug!("ini parse failed: {err}");
    }
    Ok(result?)
}

/// Reads the whole source into memory, then parses it.
pub fn from_ini_reader(reader: impl Read) -> Result<PropertyTree> {
    from_ini(&crate::read_source(reader)?)
}

fn parse_document(p: &mut Parser<'_>) -> Result<PropertyTree, ParseError> {
    skip_byte_order_marker(p);
    let mut sections = Object::new();
    let mut current: Option<String> = None;
    loop {
        skip_whitespace_and_newline(p);
        if p.eof() {
            return Ok(PropertyTree::Object(sections));
        }
        if skip_comment(p) {
            continue;
        }
        if let Some(name) = parse_header(p)? {
            sections
                .entry(name.clone())
                .or_insert_with(|| PropertyTree::Object(Object::new()));
            current = Some(name);
            continue;
        }

        let key = match_identifier(p)
            .require(|| p.error("expected a header, key or comment"))?;
        let section = match &current {
            Some(name) => name,
            None => return Err(p.error("Expected header")),
        };
        skip_whitespace(p);
        if !p.check_char('=') {
            return Err(p.error(format!("expected '=' after {key}")));
        }
        skip_whitespace(p);
        let value = parse_value(p)?;
        end_of_line(p)?;

        if let Some(PropertyTree::Object(entries)) = sections.get_mut(section) {
            entries.insert(key.to_string(), value);
        }
    }
}

fn skip_comment(p: &mut Parser<'_>) -> bool {
    if p.check_char(';') {
        skip_until_newline(p);
        true
    } else {
        false
    }
}

/// Whitespace, then a comment, a newline or eof.
fn end_of_line(p: &mut Parser<'_>) -> Result<(), ParseError> {
    skip_whitespace(p);
    if skip_comment(p) || check_newline(p) || p.eof() {
        Ok(())
    } else {
        Err(p.error("Expected newline"))
    }
}

fn parse_header(p: &mut Parser<'_>) -> Result<Option<String>, ParseError> {
    if !p.check_char('[') {
        return Ok(None);
    }
    let name = match_identifier(p).require(|| p.error("expected a section name"))?;
    if !p.check_char(']') {
        return Err(p.error("expected ']'"));
    }
    end_of_line(p)?;
    Ok(Some(name.to_string()))
}

fn parse_value(p: &mut Parser<'_>) -> Result<PropertyTree, ParseError> {
    if let Some(v) = bounded(p, parse_floating_point)? {
        return Ok(PropertyTree::Double(v));
    }
    if let Some(v) = bounded(p, parse_decimal_signed::<i64>)? {
        return Ok(PropertyTree::Integer(v));
    }
    if let Some(v) = bounded(p, parse_boolean)? {
        return Ok(PropertyTree::Bool(v));
    }
    if let Some(v) = bounded(p, parse_uuid)? {
        return Ok(PropertyTree::Uuid(v));
    }
    if let Some(s) = parse_quoted(p)? {
        return Ok(PropertyTree::String(s.to_string()));
    }
    Err(p.error("Unknown value type"))
}

/// Runs `rule` and keeps the match only if the value ends there, so
/// `1e5x` is not read as a float followed by junk.
fn bounded<T>(
    p: &mut Parser<'_>,
    rule: fn(&mut Parser<'_>) -> ParseResult<T>,
) -> Result<Option<T>, ParseError> {
    let mut state = p.scope();
    match rule(&mut state).into_result()? {
        Some(value) if at_value_end(&state) => {
            state.accept();
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

fn at_value_end(p: &Parser<'_>) -> bool {
    matches!(p.peek_char(), None | Some(' ' | '\t' | ';' | '\r' | '\n'))
}

/// `"..."` on a single line, no escapes.
fn parse_quoted<'a>(p: &mut Parser<'a>) -> Result<Option<&'a str>, ParseError> {
    if !p.check_char('"') {
        return Ok(None);
    }
    let text = p
        .match_until_any(&['"', '\n'], EofMode::Fail)
        .into_value()
        .unwrap_or_default();
    if !p.check_char('"') {
        return Err(p.error("unterminated string"));
    }
    Ok(Some(text))
}
