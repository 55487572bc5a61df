//! Leaf grammar rules shared by the codecs.
//!
//! Every rule takes the parser it runs on and follows the outcome
//! algebra: `Unmatched` leaves the position untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::parse_result::ParseResult::{self, *};
use crate::parser::Parser;

const WHITESPACE: &[char] = &[' ', '\t'];
const WHITESPACE_AND_NEWLINE: &[char] = &[' ', '\t', '\r', '\n'];

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

// ── Layout ──────────────────────────────────────────────────────────

pub fn check_whitespace(p: &mut Parser<'_>) -> bool {
    p.check_any(WHITESPACE)
}

/// `\n` or `\r\n`.
pub fn check_newline(p: &mut Parser<'_>) -> bool {
    let mut state = p.scope();
    state.check_char('\r');
    if state.check_char('\n') {
        state.accept();
        true
    } else {
        false
    }
}

pub fn skip_whitespace(p: &mut Parser<'_>) {
    p.skip_any(WHITESPACE);
}

pub fn skip_whitespace_and_newline(p: &mut Parser<'_>) {
    p.skip_any(WHITESPACE_AND_NEWLINE);
}

/// Stops in front of the `\n`; a `\r` before it is consumed.
pub fn skip_until_newline(p: &mut Parser<'_>) {
    p.skip_until('\n');
}

pub fn skip_byte_order_marker(p: &mut Parser<'_>) {
    if p.bof() {
        p.check_char('\u{FEFF}');
    }
}

// ── Character classes ───────────────────────────────────────────────

pub fn match_alpha<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_with(|c| c.is_ascii_alphabetic())
}

pub fn match_digit<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_with(|c| c.is_ascii_digit())
}

/// Digits with an optional leading `-`.
pub fn match_signed_digit<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_indexed(|c, i| (i == 0 && c == '-') || c.is_ascii_digit())
}

pub fn match_alnum<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_with(|c| c.is_ascii_alphanumeric())
}

pub fn match_binary<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_with(|c| c == '0' || c == '1')
}

pub fn match_hexadecimal<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_with(|c| c.is_ascii_hexdigit())
}

/// `[a-zA-Z_][a-zA-Z0-9_-]*`
pub fn match_identifier<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_indexed(|c, i| {
        if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_' || c == '-'
        }
    })
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ── Integers ────────────────────────────────────────────────────────

/// The arithmetic the integer rules need from a target type.
pub trait Integer: Copy {
    const SIGNED: bool;
    const NAME: &'static str;

    fn zero() -> Self;

    /// `self * radix + digit`, or `- digit` when building a negative
    /// literal. `None` on overflow.
    fn accumulate(self, radix: u32, digit: u32, negative: bool) -> Option<Self>;
}

macro_rules! impl_integer {
    ($($t:ty => $signed:literal),* $(,)?) => {
        $(
            impl Integer for $t {
                const SIGNED: bool = $signed;
                const NAME: &'static str = stringify!($t);

                fn zero() -> Self {
                    0
                }

                fn accumulate(self, radix: u32, digit: u32, negative: bool) -> Option<Self> {
                    let radix = Self::try_from(radix).ok()?;
                    let digit = Self::try_from(digit).ok()?;
                    let shifted = self.checked_mul(radix)?;
                    if negative {
                        shifted.checked_sub(digit)
                    } else {
                        shifted.checked_add(digit)
                    }
                }
            }
        )*
    };
}

impl_integer! {
    i8 => true, i16 => true, i32 => true, i64 => true, i128 => true, isize => true,
    u8 => false, u16 => false, u32 => false, u64 => false, u128 => false, usize => false,
}

fn convert<T: Integer>(p: &Parser<'_>, digits: &str, radix: u32, negative: bool) -> ParseResult<T> {
    let mut value = T::zero();
    for c in digits.chars() {
        let digit = match c.to_digit(radix) {
            Some(d) => d,
            None => return Error(p.error(format!("invalid digit {c:?} for base {radix}"))),
        };
        value = match value.accumulate(radix, digit, negative) {
            Some(v) => v,
            None => return Error(p.error(format!("integer literal out of range for {}", T::NAME))),
        };
    }
    Matched(value)
}

/// Unsigned decimal digits. A leading `-` is `Unmatched`.
pub fn parse_decimal<T: Integer>(p: &mut Parser<'_>) -> ParseResult<T> {
    let mut state = p.scope();
    let digits = match match_digit(&mut state) {
        Matched(d) => d,
        _ => return Unmatched,
    };
    let result = convert(&state, digits, 10, false);
    if result.is_matched() {
        state.accept();
    }
    result
}

/// Decimal digits with an optional leading `-`. A negative literal for an
/// unsigned `T` is out of range.
pub fn parse_decimal_signed<T: Integer>(p: &mut Parser<'_>) -> ParseResult<T> {
    let mut state = p.scope();
    let text = match match_signed_digit(&mut state) {
        Matched(t) => t,
        _ => return Unmatched,
    };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() {
        return Unmatched;
    }
    let result = convert(&state, digits, 10, negative);
    if result.is_matched() {
        state.accept();
    }
    result
}

fn parse_radix<'a, T: Integer>(
    p: &mut Parser<'a>,
    prefix: Option<&str>,
    radix: u32,
    digits: fn(&mut Parser<'a>) -> ParseResult<&'a str>,
) -> ParseResult<T> {
    let mut state = p.scope();
    if let Some(prefix) = prefix {
        if !state.check(prefix) {
            return Unmatched;
        }
    }
    let text = match digits(&mut state) {
        Matched(t) => t,
        _ => return Unmatched,
    };
    let result = convert(&state, text, radix, false);
    if result.is_matched() {
        state.accept();
    }
    result
}

/// Binary digits, optionally behind a required prefix such as `"0b"`.
pub fn parse_binary<T: Integer>(p: &mut Parser<'_>, prefix: Option<&str>) -> ParseResult<T> {
    parse_radix(p, prefix, 2, match_binary)
}

/// Hex digits, optionally behind a required prefix such as `"0x"`.
pub fn parse_hexadecimal<T: Integer>(p: &mut Parser<'_>, prefix: Option<&str>) -> ParseResult<T> {
    parse_radix(p, prefix, 16, match_hexadecimal)
}

// ── Other scalars ───────────────────────────────────────────────────

/// `[-+]? digits? (. digits)? ([eE] [-+]? digits)?`
///
/// A fraction or an exponent is required, so `42` is not a float. Once a
/// fraction was read, an `e` without exponent digits is an error; without
/// a fraction the literal simply is not a float. Literals too large for
/// an `f64` are an error rather than infinity.
pub fn parse_floating_point(p: &mut Parser<'_>) -> ParseResult<f64> {
    let mut state = p.scope();
    let start = state.remaining();
    state.check_any(&['+', '-']);
    let integer = match_digit(&mut state).is_matched();

    let mut fraction = false;
    {
        let mut frac = state.scope();
        if frac.check_char('.') && match_digit(&mut frac).is_matched() {
            frac.accept();
            fraction = true;
        }
    }
    if !integer && !fraction {
        return Unmatched;
    }

    let mut exponent = false;
    if matches!(state.peek_char(), Some('e' | 'E')) {
        let mut exp = state.scope();
        exp.advance();
        exp.check_any(&['+', '-']);
        if match_digit(&mut exp).is_matched() {
            exp.accept();
            exponent = true;
        } else if fraction {
            return Error(exp.error("malformed exponent"));
        }
    }
    if !fraction && !exponent {
        return Unmatched;
    }

    let text = &start[..start.len() - state.remaining().len()];
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            state.accept();
            Matched(v)
        }
        Ok(_) => Error(state.error(format!("floating point literal {text:?} is out of range"))),
        Err(e) => Error(state.error(format!("invalid floating point literal {text:?}: {e}"))),
    }
}

/// `true` or `false`, ASCII case-insensitive.
pub fn parse_boolean(p: &mut Parser<'_>) -> ParseResult<bool> {
    for (literal, value) in [("true", true), ("false", false)] {
        let found = p
            .remaining()
            .get(..literal.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(literal));
        if found && p.advance_by(literal.len()) {
            return Matched(value);
        }
    }
    Unmatched
}

/// Canonical `8-4-4-4-12` hex form.
pub fn parse_uuid(p: &mut Parser<'_>) -> ParseResult<Uuid> {
    let mut state = p.scope();
    let text = match state.match_regex_with(&UUID) {
        Matched(t) => t,
        _ => return Unmatched,
    };
    match Uuid::parse_str(text) {
        Ok(uuid) => {
            state.accept();
            Matched(uuid)
        }
        Err(e) => Error(state.error(format!("invalid uuid {text:?}: {e}"))),
    }
}
