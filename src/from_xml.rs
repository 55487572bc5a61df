use std::io::Read;

use log::{debug, trace};

use crate::error::{ParseError, Result};
use crate::matchers::{check_whitespace, skip_byte_order_marker, skip_whitespace_and_newline};
use crate::options::XmlOptions;
use crate::parse_result::ParseResult;
use crate::parser::{EofMode, Parser};
use crate::tree::{Array, Object, PropertyTree};

pub(crate) const HEADER_KEY: &str = "?xml";

const HEADER_OPEN: &str = "<?xml";
const HEADER_CLOSE: &str = "?>";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const DTD_OPEN: &str = "<!";
const CLOSE_TAG_OPEN: &str = "</";
const SELF_CLOSE: &str = "/>";

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn match_name<'a>(p: &mut Parser<'a>) -> ParseResult<&'a str> {
    p.match_with(is_name_char)
}

/// Parse an XML document into an array of its top-level nodes.
///
/// An element `<a x="1">hi</a>` becomes `{"a": ["hi", {placeholder: {"x": "1"}}]}`;
/// the `<?xml ...?>` header becomes `{"?xml": {attributes}}`. Comments are
/// dropped and text is trimmed. DTDs are rejected.
pub fn from_xml(input: &str) -> Result<PropertyTree> {
    from_xml_with(input, &XmlOptions::default())
}

pub fn from_xml_with(input: &str, options: &XmlOptions) -> Result<PropertyTree> {
    debug!("parsing xml ({} bytes)", input.len());
    let result = options
        .parse
        .open(input)
        .and_then(|mut p| XmlParser { options }.parse_document(&mut p));
    if let Err(err) = &result {
        debug!("xml parse failed: {err}");
    }
    Ok(result?)
}

/// Reads the whole source into memory, then parses it.
pub fn from_xml_reader(reader: impl Read) -> Result<PropertyTree> {
    from_xml(&crate::read_source(reader)?)
}

struct XmlParser<'o> {
    options: &'o XmlOptions,
}

fn single(name: &str, value: PropertyTree) -> PropertyTree {
    PropertyTree::Object(Object::from([(name.to_string(), value)]))
}

impl XmlParser<'_> {
    fn parse_document(&self, p: &mut Parser<'_>) -> Result<PropertyTree, ParseError> {
        skip_byte_order_marker(p);
        Ok(PropertyTree::Array(self.parse_nodes(p, None, 0)?))
    }

    /// Siblings up to the closing tag of `parent`, or up to eof at the root.
    fn parse_nodes(
        &self,
        p: &mut Parser<'_>,
        parent: Option<&str>,
        depth: usize,
    ) -> Result<Array, ParseError> {
        let mut nodes = Array::new();
        loop {
            skip_whitespace_and_newline(p);
            if let Some(name) = parent {
                if check_closing_tag(p, name)? {
                    return Ok(nodes);
                }
            }
            if p.eof() {
                return match parent {
                    None => Ok(nodes),
                    Some(name) => Err(p.error(format!("expected closing tag </{name}>"))),
                };
            }
            if let Some(node) = self.parse_node(p, depth)? {
                nodes.push(node);
            }
        }
    }

    /// Always consumes input. `None` for nodes that are dropped.
    fn parse_node(
        &self,
        p: &mut Parser<'_>,
        depth: usize,
    ) -> Result<Option<PropertyTree>, ParseError> {
        if p.check(COMMENT_OPEN) {
            p.match_until_str(COMMENT_CLOSE, EofMode::Fail)
                .require(|| p.error("unterminated comment"))?;
            p.check(COMMENT_CLOSE);
            return Ok(None);
        }
        if p.check(CDATA_OPEN) {
            let text = p
                .match_until_str(CDATA_CLOSE, EofMode::Fail)
                .require(|| p.error("unterminated CDATA section"))?;
            p.check(CDATA_CLOSE);
            return Ok(Some(PropertyTree::String(text.to_string())));
        }
        if p.peek(DTD_OPEN) {
            return Err(p.error("DTD is not yet supported"));
        }
        if p.check(HEADER_OPEN) {
            return self.parse_header(p).map(Some);
        }
        if p.peek(CLOSE_TAG_OPEN) {
            return Err(p.error("unexpected closing tag"));
        }
        if p.check_char('<') {
            return self.parse_element(p, depth).map(Some);
        }
        let text = p
            .match_until('<', EofMode::Match)
            .require(|| p.error("expected text"))?
            .trim();
        Ok((!text.is_empty()).then(|| PropertyTree::String(text.to_string())))
    }

    fn parse_header(&self, p: &mut Parser<'_>) -> Result<PropertyTree, ParseError> {
        if !check_whitespace(p) && !p.check_any(&['\r', '\n']) {
            return Err(p.error("expected whitespace after <?xml"));
        }
        let attributes = parse_attributes(p)?;
        if !p.check(HEADER_CLOSE) {
            return Err(p.error("expected '?>'"));
        }
        Ok(single(HEADER_KEY, PropertyTree::Object(attributes)))
    }

    /// Called after the opening `<`.
    fn parse_element(&self, p: &mut Parser<'_>, depth: usize) -> Result<PropertyTree, ParseError> {
        let depth = self.options.parse.nest(p, depth)?;
        let name = match_name(p).require(|| p.error("expected element name"))?;
        trace!("open <{name}>");
        let attributes = parse_attributes(p)?;

        let mut children = if p.check(SELF_CLOSE) {
            Array::new()
        } else if p.check_char('>') {
            self.parse_nodes(p, Some(name), depth)?
        } else {
            return Err(p.error(format!("expected '>' or '/>' in <{name}>")));
        };
        trace!("close <{name}>");

        if !attributes.is_empty() {
            children.push(single(
                &self.options.attribute_placeholder,
                PropertyTree::Object(attributes),
            ));
        }
        Ok(single(name, PropertyTree::Array(children)))
    }
}

/// `</name>` for the expected name. Any other closing tag is an error.
fn check_closing_tag(p: &mut Parser<'_>, name: &str) -> Result<bool, ParseError> {
    let mut state = p.scope();
    if !state.check(CLOSE_TAG_OPEN) {
        return Ok(false);
    }
    let found = match_name(&mut state).into_value().unwrap_or_default();
    if found != name {
        return Err(state.error(format!(
            "mismatched closing tag </{found}>, expected </{name}>"
        )));
    }
    skip_whitespace_and_newline(&mut state);
    if !state.check_char('>') {
        return Err(state.error("expected '>'"));
    }
    state.accept();
    Ok(true)
}

/// Zero or more `name="value"` pairs. Values are always strings.
fn parse_attributes(p: &mut Parser<'_>) -> Result<Object, ParseError> {
    let mut attributes = Object::new();
    loop {
        skip_whitespace_and_newline(p);
        let name = match match_name(p).into_value() {
            Some(name) => name,
            None => return Ok(attributes),
        };
        skip_whitespace_and_newline(p);
        if !p.check_char('=') {
            return Err(p.error(format!("expected '=' after attribute {name}")));
        }
        skip_whitespace_and_newline(p);
        let quote = match p.peek_char() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(p.error(format!("expected quoted value for attribute {name}"))),
        };
        p.advance();
        let value = p
            .match_until(quote, EofMode::Fail)
            .require(|| p.error(format!("unterminated value for attribute {name}")))?;
        p.advance();
        if attributes.contains_key(name) {
            return Err(p.error(format!("duplicate attribute {name}")));
        }
        attributes.insert(name.to_string(), PropertyTree::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn with_placeholder(input: &str) -> Result<PropertyTree> {
        from_xml_with(input, &XmlOptions::default().with_attribute_placeholder("?attrs"))
    }

    #[test]
    fn attributes_fold_under_placeholder() {
        let pt = with_placeholder(r#"<a x="1" y="2">hi</a>"#).unwrap();
        let expected = crate::from_json::from_json(
            r#"[{"a": ["hi", {"?attrs": {"x": "1", "y": "2"}}]}]"#,
        )
        .unwrap();
        assert_eq!(pt, expected);
    }

    #[test]
    fn self_closing() {
        let pt = with_placeholder("<a/><b k='v' />").unwrap();
        assert_eq!(pt[0]["a"], PropertyTree::Array(vec![]));
        assert_eq!(pt[1]["b"][0]["?attrs"]["k"], "v");
        assert_eq!(pt[1]["b"].len(), 1);
    }

    #[test]
    fn header_and_nesting() {
        let pt = from_xml(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <root>\n  <item>one</item>\n  <item>two</item>\n</root>\n",
        )
        .unwrap();
        assert_eq!(pt.len(), 2);
        assert_eq!(pt[0]["?xml"]["version"], "1.0");
        assert_eq!(pt[0]["?xml"]["encoding"], "UTF-8");
        let items = &pt[1]["root"];
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["item"][0], "one");
        assert_eq!(items[1]["item"][0], "two");
    }

    #[test]
    fn text_is_trimmed_and_blank_text_dropped() {
        let pt = from_xml("<a>\n   padded text \n<b/>   </a>").unwrap();
        assert_eq!(pt[0]["a"].len(), 2);
        assert_eq!(pt[0]["a"][0], "padded text");
    }

    #[test]
    fn comments_are_dropped() {
        let pt = from_xml("<!-- top --><a><!-- inner -->x</a>").unwrap();
        assert_eq!(pt.len(), 1);
        assert_eq!(pt[0]["a"], PropertyTree::Array(vec!["x".into()]));
    }

    #[test]
    fn cdata_is_raw() {
        let pt = from_xml("<a><![CDATA[ <not> & markup ]]></a>").unwrap();
        assert_eq!(pt[0]["a"][0], " <not> & markup ");
    }

    #[test]
    fn names_allow_punctuation() {
        let pt = from_xml(r#"<ns:my-el.v_2 xml:lang="en"/>"#).unwrap();
        assert!(pt[0].contains("ns:my-el.v_2"));
    }

    #[test]
    fn errors() {
        for input in [
            "<!DOCTYPE html><a/>",
            "<a>",
            "<a></b>",
            "</a>",
            "<a x=1/>",
            "<a x/>",
            "<a x=\"1/>",
            "<a x=\"1\" x=\"2\"/>",
            "<!-- open",
            "<a><![CDATA[never closed</a>",
            "<?xml?><a/>",
            "<?xml version=\"1.0\"<a/>",
            "< a/>",
            "<a",
        ] {
            assert!(
                matches!(from_xml(input), Err(Error::Parse(_))),
                "{input:?} should fail"
            );
        }
    }

    #[test]
    fn dtd_message() {
        match from_xml("<!DOCTYPE note>") {
            Err(Error::Parse(e)) => assert_eq!(e.message, "DTD is not yet supported"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn depth_limit() {
        let options = XmlOptions::default().with_max_depth(2);
        assert!(from_xml_with("<a><b/></a>", &options).is_ok());
        assert!(from_xml_with("<a><b><c/></b></a>", &options).is_err());
    }
}
