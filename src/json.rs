use std::io::Write;

use log::debug;

use crate::error::{Error, Result};
use crate::tree::*;

struct JsonWriter {
    buf: String,
}

impl JsonWriter {
    fn new() -> Self {
        JsonWriter { buf: String::new() }
    }

    fn write_value(&mut self, value: &PropertyTree) -> Result<()> {
        match value {
            PropertyTree::Null => self.buf.push_str("null"),
            PropertyTree::Bool(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            PropertyTree::Integer(i) => self.buf.push_str(&i.to_string()),
            PropertyTree::Double(d) => {
                let text = format_double(*d).ok_or_else(|| {
                    Error::unsupported("JSON", format!("non-finite number {d}"))
                })?;
                self.buf.push_str(&text);
            }
            PropertyTree::String(s) => self.write_string_value(s),
            PropertyTree::Uuid(u) => self.write_string_value(&u.to_string()),
            PropertyTree::Blob(_) => {
                return Err(Error::unsupported("JSON", "binary blobs are not supported"));
            }
            PropertyTree::Array(items) => self.write_array(items)?,
            PropertyTree::Object(entries) => self.write_object(entries)?,
        }
        Ok(())
    }

    fn write_array(&mut self, items: &Array) -> Result<()> {
        self.buf.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.write_value(item)?;
        }
        self.buf.push(']');
        Ok(())
    }

    fn write_object(&mut self, entries: &Object) -> Result<()> {
        self.buf.push('{');
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.write_string_value(key);
            self.buf.push(':');
            self.write_value(value)?;
        }
        self.buf.push('}');
        Ok(())
    }

    fn write_string_value(&mut self, s: &str) {
        self.buf.push('"');
        for ch in s.chars() {
            match escape(ch) {
                Some(escaped) => self.buf.push_str(escaped),
                None if ch < '\u{0020}' => {
                    self.buf.push_str(&format!("\\u{:04x}", ch as u32));
                }
                None => self.buf.push(ch),
            }
        }
        self.buf.push('"');
    }
}

fn escape(ch: char) -> Option<&'static str> {
    Some(match ch {
        '"' => "\\\"",
        '\\' => "\\\\",
        '/' => "\\/",
        '\u{0008}' => "\\b",
        '\u{000C}' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        _ => return None,
    })
}

/// Decimal text that parses back as a double in every codec (`1.0`,
/// `1e21`). `None` for NaN and infinities.
pub(crate) fn format_double(d: f64) -> Option<String> {
    d.is_finite().then(|| format!("{d:?}"))
}

/// Serialize to compact JSON. Object keys keep insertion order.
pub fn to_json(tree: &PropertyTree) -> Result<String> {
    debug!("writing json ({})", tree.kind());
    let mut w = JsonWriter::new();
    w.write_value(tree)?;
    Ok(w.buf)
}

/// Serialize to compact JSON and write it to `sink`. Nothing is written
/// when the tree cannot be represented.
pub fn write_json(tree: &PropertyTree, sink: impl Write) -> Result<()> {
    crate::write_sink(sink, &to_json(tree)?)
}
