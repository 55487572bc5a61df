use std::io::Write;

use log::debug;

use crate::error::{Error, Result};
use crate::json::format_double;
use crate::matchers::is_identifier;
use crate::tree::*;

fn unsupported(reason: impl Into<String>) -> Error {
    Error::unsupported("INI", reason)
}

fn check_name(name: &str, what: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(unsupported(format!("{what} {name:?} is not an identifier")))
    }
}

/// Text that reads back as the same typed value.
fn value_text(key: &str, value: &PropertyTree) -> Result<String> {
    match value {
        PropertyTree::Bool(b) => Ok(b.to_string()),
        PropertyTree::Integer(i) => Ok(i.to_string()),
        PropertyTree::Double(d) => {
            format_double(*d).ok_or_else(|| unsupported(format!("{key} is not a finite number")))
        }
        PropertyTree::String(s) => {
            if s.contains(['"', '\n', '\r']) {
                return Err(unsupported(format!(
                    "{key} holds a quote or line break, which cannot be written unescaped"
                )));
            }
            Ok(format!("\"{s}\""))
        }
        PropertyTree::Uuid(u) => Ok(u.hyphenated().to_string()),
        PropertyTree::Null
        | PropertyTree::Blob(_)
        | PropertyTree::Array(_)
        | PropertyTree::Object(_) => Err(unsupported(format!(
            "{key} is a {}; only scalar values are representable",
            value.kind()
        ))),
    }
}

/// Serialize `{section: {key: scalar}}`. Anything deeper, and values
/// without an INI spelling, are rejected rather than dropped.
pub fn to_ini(tree: &PropertyTree) -> Result<String> {
    debug!("writing ini ({})", tree.kind());
    let sections = match tree {
        PropertyTree::Null => return Ok(String::new()),
        PropertyTree::Object(sections) => sections,
        other => {
            return Err(unsupported(format!(
                "the root must be an object of sections, found {}",
                other.kind()
            )))
        }
    };

    let mut buf = String::new();
    for (i, (name, section)) in sections.iter().enumerate() {
        check_name(name, "section")?;
        let entries = section
            .as_object()
            .ok_or_else(|| unsupported(format!("section {name} is a {}", section.kind())))?;
        if i > 0 {
            buf.push('\n');
        }
        buf.push('[');
        buf.push_str(name);
        buf.push_str("]\n");
        for (key, value) in entries {
            check_name(key, "key")?;
            buf.push_str(key);
            buf.push_str(" = ");
            buf.push_str(&value_text(key, value)?);
            buf.push('\n');
        }
    }
    Ok(buf)
}

pub fn write_ini(tree: &PropertyTree, sink: impl Write) -> Result<()> {
    crate::write_sink(sink, &to_ini(tree)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_ini::from_ini;

    fn sample() -> PropertyTree {
        let mut pt = PropertyTree::Null;
        pt["header1"]["value"] = 42.into();
        pt["header1"]["flag"] = false.into();
        pt["header1"]["text"] = "This is a string".into();
        pt["header1"]["ratio"] = 1.0.into();
        pt["another_header"]["uuid_value"] =
            uuid::Uuid::parse_str("f976d1e3-0f0d-4c9c-b7c5-2e31eb4bae89")
                .unwrap()
                .into();
        pt
    }

    #[test]
    fn layout() {
        assert_eq!(
            to_ini(&sample()).unwrap(),
            "[header1]\n\
             value = 42\n\
             flag = false\n\
             text = \"This is a string\"\n\
             ratio = 1.0\n\
             \n\
             [another_header]\n\
             uuid_value = f976d1e3-0f0d-4c9c-b7c5-2e31eb4bae89\n"
        );
    }

    #[test]
    fn round_trip() {
        let pt = sample();
        assert_eq!(from_ini(&to_ini(&pt).unwrap()).unwrap(), pt);
    }

    #[test]
    fn string_that_looks_typed_stays_a_string() {
        let mut pt = PropertyTree::Null;
        pt["s"]["a"] = "42".into();
        pt["s"]["b"] = "true".into();
        let back = from_ini(&to_ini(&pt).unwrap()).unwrap();
        assert_eq!(back["s"]["a"], "42");
        assert_eq!(back["s"]["b"], "true");
    }

    #[test]
    fn nested_values_are_unsupported() {
        let mut pt = PropertyTree::Null;
        pt["s"]["list"] = PropertyTree::Array(vec![1.into()]);
        assert!(matches!(to_ini(&pt), Err(Error::UnsupportedFormat { format: "INI", .. })));

        let mut pt = PropertyTree::Null;
        pt["s"]["deep"]["er"] = 1.into();
        assert!(to_ini(&pt).is_err());

        let pt = PropertyTree::Array(vec![]);
        assert!(to_ini(&pt).is_err());

        let mut pt = PropertyTree::Null;
        pt["s"] = 1.into();
        assert!(to_ini(&pt).is_err());
    }

    #[test]
    fn unwritable_scalars_are_unsupported() {
        for value in [
            PropertyTree::Null,
            PropertyTree::blob(vec![1u8]),
            PropertyTree::from("say \"hi\""),
            PropertyTree::from("two\nlines"),
            PropertyTree::from(f64::INFINITY),
        ] {
            let mut pt = PropertyTree::Null;
            pt["s"]["k"] = value;
            assert!(to_ini(&pt).is_err());
        }

        let mut pt = PropertyTree::Null;
        pt["s"]["not an identifier"] = 1.into();
        assert!(to_ini(&pt).is_err());
    }

    #[test]
    fn write_to_sink() {
        let mut out = Vec::new();
        write_ini(&sample(), &mut out).unwrap();
        assert!(out.starts_with(b"[header1]\n"));
    }
}
