use crate::error::ParseError;
use crate::parser::Parser;

/// Nesting deeper than this is rejected unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// `<` never appears in an element name, so this key cannot collide.
pub const DEFAULT_ATTRIBUTE_PLACEHOLDER: &str = "<xmlattr>";

/// Settings shared by every parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reported in error cursors.
    pub filename: Option<String>,
    /// Maximum array/object/element nesting.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            filename: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn open<'a>(&'a self, input: &'a str) -> Result<Parser<'a>, ParseError> {
        match &self.filename {
            Some(filename) => Parser::with_filename(input, filename),
            None => Parser::new(input),
        }
    }

    /// Depth after entering one more container, or an error past the limit.
    pub(crate) fn nest(&self, p: &Parser<'_>, depth: usize) -> Result<usize, ParseError> {
        if depth >= self.max_depth {
            return Err(p.error(format!(
                "maximum nesting depth of {} exceeded",
                self.max_depth
            )));
        }
        Ok(depth + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Key of the synthetic child object holding an element's attributes.
    pub attribute_placeholder: String,
    pub parse: ParseOptions,
}

impl Default for XmlOptions {
    fn default() -> Self {
        XmlOptions {
            attribute_placeholder: DEFAULT_ATTRIBUTE_PLACEHOLDER.to_string(),
            parse: ParseOptions::default(),
        }
    }
}

impl XmlOptions {
    pub fn with_attribute_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.attribute_placeholder = placeholder.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.parse.filename = Some(filename.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.parse.max_depth = max_depth;
        self
    }
}
