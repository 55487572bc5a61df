//! A backtracking recursive-descent parser core and a dynamically typed
//! property tree, with JSON, XML and INI codecs built on top of it.
//!
//! ```
//! let tree = ptree::from_json(r#"{"server": {"port": 8080, "tls": true}}"#).unwrap();
//! assert_eq!(tree["server"]["port"], 8080);
//! let ini = ptree::to_ini(&tree).unwrap();
//! assert_eq!(ini, "[server]\nport = 8080\ntls = true\n");
//! ```

pub mod config_file;
pub mod error;
pub mod from_ini;
pub mod from_json;
pub mod from_xml;
pub mod ini;
pub mod json;
pub mod matchers;
pub mod options;
pub mod parse_result;
pub mod parser;
pub mod tree;
pub mod xml;
pub mod xml_dom;


use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

pub use config_file::{ConfigFile, ConfigValue};
pub use error::{Cursor, Error, ParseError, Result};
pub use from_ini::{from_ini, from_ini_reader, from_ini_with};
pub use from_json::{from_json, from_json_reader, from_json_with};
pub use from_xml::{from_xml, from_xml_reader, from_xml_with};
pub use ini::{to_ini, write_ini};
pub use json::{to_json, write_json};
pub use options::{ParseOptions, XmlOptions};
pub use parse_result::ParseResult;
pub use parser::{EofMode, Parser, ScopedState};
pub use tree::{Array, Blob, Kind, Object, PropertyTree, WrongVariant};
pub use xml::{to_xml, to_xml_with, write_xml, write_xml_with};
pub use xml_dom::{XmlAttributes, XmlDocument, XmlNode, XmlNodeKind};

// ── Formats ────────────────────────────────────────────────────────

/// The document formats the codecs read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
    Ini,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Ini => "ini",
        }
    }

    /// Guess a format from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Format> {
        ext.parse().ok()
    }

    /// Parse `input` in this format. The attribute placeholder only
    /// matters for XML.
    pub fn parse(self, input: &str, options: &XmlOptions) -> Result<PropertyTree> {
        match self {
            Format::Json => from_json_with(input, &options.parse),
            Format::Xml => from_xml_with(input, options),
            Format::Ini => from_ini_with(input, &options.parse),
        }
    }

    pub fn serialize(self, tree: &PropertyTree, options: &XmlOptions) -> Result<String> {
        match self {
            Format::Json => to_json(tree),
            Format::Xml => to_xml_with(tree, options),
            Format::Ini => to_ini(tree),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "ini" | "cfg" | "conf" => Ok(Format::Ini),
            other => Err(format!("unknown format {other:?} (expected json, xml or ini)")),
        }
    }
}

// ── I/O boundary ────────────────────────────────────────────────────

/// Read the whole source once; the parsers never read incrementally.
pub(crate) fn read_source(mut reader: impl Read) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

pub(crate) fn write_sink(mut sink: impl Write, text: &str) -> Result<()> {
    sink.write_all(text.as_bytes())?;
    sink.flush()?;
    Ok(())
}
