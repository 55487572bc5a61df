//! Typed `[header] key = value` access over an INI-shaped tree.

use std::io::Read;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::from_ini::{from_ini, from_ini_reader};
use crate::ini::to_ini;
use crate::tree::{Kind, Object, PropertyTree, WrongVariant};

/// A scalar that can be stored in and read from a config entry.
pub trait ConfigValue: Sized {
    /// The variant the value is stored as.
    const KIND: Kind;

    /// `None` when the node holds another variant or the value does not fit.
    fn from_tree(tree: &PropertyTree) -> Option<Self>;

    fn into_tree(self) -> PropertyTree;
}

impl ConfigValue for bool {
    const KIND: Kind = Kind::Bool;

    fn from_tree(tree: &PropertyTree) -> Option<Self> {
        tree.as_bool()
    }

    fn into_tree(self) -> PropertyTree {
        PropertyTree::Bool(self)
    }
}

macro_rules! config_integer {
    ($($t:ty),*) => {
        $(
            impl ConfigValue for $t {
                const KIND: Kind = Kind::Integer;

                fn from_tree(tree: &PropertyTree) -> Option<Self> {
                    tree.as_i64().and_then(|i| <$t>::try_from(i).ok())
                }

                fn into_tree(self) -> PropertyTree {
                    PropertyTree::Integer(i64::from(self))
                }
            }
        )*
    };
}

config_integer!(i64, i32, u32);

/// Integers widen, so `ratio = 1` reads as `1.0`.
impl ConfigValue for f64 {
    const KIND: Kind = Kind::Double;

    fn from_tree(tree: &PropertyTree) -> Option<Self> {
        match tree {
            PropertyTree::Double(d) => Some(*d),
            PropertyTree::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn into_tree(self) -> PropertyTree {
        PropertyTree::Double(self)
    }
}

impl ConfigValue for f32 {
    const KIND: Kind = Kind::Double;

    fn from_tree(tree: &PropertyTree) -> Option<Self> {
        f64::from_tree(tree).map(|d| d as f32)
    }

    fn into_tree(self) -> PropertyTree {
        PropertyTree::Double(f64::from(self))
    }
}

impl ConfigValue for String {
    const KIND: Kind = Kind::String;

    fn from_tree(tree: &PropertyTree) -> Option<Self> {
        tree.as_str().map(str::to_string)
    }

    fn into_tree(self) -> PropertyTree {
        PropertyTree::String(self)
    }
}

impl ConfigValue for Uuid {
    const KIND: Kind = Kind::Uuid;

    fn from_tree(tree: &PropertyTree) -> Option<Self> {
        tree.as_uuid()
    }

    fn into_tree(self) -> PropertyTree {
        PropertyTree::Uuid(self)
    }
}

/// An INI configuration held as a `{header: {key: value}}` tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    tree: PropertyTree,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::from_tree(PropertyTree::Object(Object::new()))
    }
}

impl ConfigFile {
    /// A config without any headers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: PropertyTree) -> Self {
        ConfigFile { tree }
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(Self::from_tree(from_ini_reader(reader)?))
    }

    pub fn tree(&self) -> &PropertyTree {
        &self.tree
    }

    pub fn into_tree(self) -> PropertyTree {
        self.tree
    }

    pub fn to_ini(&self) -> Result<String> {
        to_ini(&self.tree)
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.tree.get(header).is_some_and(PropertyTree::is_object)
    }

    pub fn has_entry(&self, header: &str, key: &str) -> bool {
        self.entry(header, key).is_some()
    }

    fn entry(&self, header: &str, key: &str) -> Option<&PropertyTree> {
        self.tree.get(header)?.get(key)
    }

    /// `None` when the entry is missing or holds another type.
    pub fn get<T: ConfigValue>(&self, header: &str, key: &str) -> Option<T> {
        T::from_tree(self.entry(header, key)?)
    }

    /// Reads an entry, storing `default` first if it is missing.
    /// An entry of another type is left alone and `default` is returned.
    pub fn get_or<T: ConfigValue + Clone>(&mut self, header: &str, key: &str, default: T) -> T {
        match self.entry(header, key) {
            Some(value) => T::from_tree(value).unwrap_or(default),
            None => {
                // A header that is not an object cannot take the entry.
                if let Err(err) = self.set(header, key, default.clone().into_tree()) {
                    log::debug!("not storing default for [{header}] {key}: {err}");
                }
                default
            }
        }
    }

    pub fn get_or_err<T: ConfigValue>(&self, header: &str, key: &str) -> Result<T> {
        let value = self.entry(header, key).ok_or_else(|| Error::MissingEntry {
            header: header.to_string(),
            key: key.to_string(),
        })?;
        T::from_tree(value).ok_or_else(|| {
            Error::from(WrongVariant {
                expected: T::KIND,
                found: value.kind(),
            })
        })
    }

    /// Creates the header when needed. Fails when the root or the header
    /// holds something other than an object.
    pub fn set(
        &mut self,
        header: &str,
        key: &str,
        value: impl Into<PropertyTree>,
    ) -> Result<(), WrongVariant> {
        if self.tree.is_null() {
            self.tree = PropertyTree::Object(Object::new());
        }
        let section = self
            .tree
            .object_value_mut()?
            .entry(header.to_string())
            .or_default();
        section.insert(key, value)?;
        Ok(())
    }
}

impl FromStr for ConfigFile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::from_tree(from_ini(s)?))
    }
}

impl From<PropertyTree> for ConfigFile {
    fn from(tree: PropertyTree) -> Self {
        Self::from_tree(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = include_str!("../test-data/simple.ini");

    fn simple() -> ConfigFile {
        SIMPLE.parse().unwrap()
    }

    #[test]
    fn typed_reads() {
        let config = simple();
        assert!(config.has_header("header1"));
        assert!(config.has_header("another_header"));
        assert!(!config.has_header("header3"));

        assert_eq!(config.get::<i64>("header1", "value"), Some(42));
        assert_eq!(config.get::<i32>("header1", "value"), Some(42));
        assert_eq!(config.get::<bool>("header1", "another_value"), Some(false));
        assert_eq!(config.get::<bool>("header1", "another_bool"), Some(true));
        assert_eq!(
            config.get::<String>("header1", "string").as_deref(),
            Some("This is a string")
        );
        assert_eq!(config.get::<f64>("header1", "value2"), Some(1.0));
        assert_eq!(config.get::<f32>("header1", "value2"), Some(1.0));
        assert_eq!(config.get::<f64>("header1", "value3"), Some(4.2));
        assert_eq!(config.get::<i64>("header1", "value4"), Some(-10));
        assert_eq!(config.get::<u32>("header1", "value4"), None);
        assert_eq!(config.get::<u32>("another_header", "val"), Some(1337));
        assert_eq!(
            config.get::<Uuid>("another_header", "uuid_value"),
            Some(Uuid::parse_str("f976d1e3-0f0d-4c9c-b7c5-2e31eb4bae89").unwrap())
        );
    }

    #[test]
    fn integers_widen_to_doubles() {
        let config = simple();
        assert_eq!(config.get::<f64>("another_header", "val"), Some(1337.0));
        assert_eq!(config.get::<i64>("header1", "value2"), None);
    }

    #[test]
    fn missing_and_mistyped() {
        let config = simple();
        assert!(config.has_entry("header1", "value"));
        assert!(!config.has_entry("header1", "nope"));
        assert!(!config.has_entry("nope", "value"));
        assert_eq!(config.get::<bool>("header1", "value"), None);

        match config.get_or_err::<i64>("header1", "nope") {
            Err(Error::MissingEntry { header, key }) => {
                assert_eq!(header, "header1");
                assert_eq!(key, "nope");
            }
            other => panic!("unexpected {other:?}"),
        }
        match config.get_or_err::<bool>("header1", "value") {
            Err(Error::WrongVariant(w)) => {
                assert_eq!(w.expected, Kind::Bool);
                assert_eq!(w.found, Kind::Integer);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(config.get_or_err::<i64>("another_header", "val").unwrap(), 1337);
    }

    #[test]
    fn get_or_stores_missing_defaults() {
        let mut config = simple();
        assert_eq!(config.get_or("header1", "value", 7i64), 42);
        assert_eq!(config.get_or("header1", "fresh", 7i64), 7);
        assert_eq!(config.get::<i64>("header1", "fresh"), Some(7));
        assert_eq!(config.get_or("header3", "name", String::from("x")), "x");
        assert!(config.has_header("header3"));

        // Mistyped entries are not overwritten.
        assert!(!config.get_or("header1", "string", false));
        assert!(config.get::<String>("header1", "string").is_some());
    }

    #[test]
    fn set_and_write_back() {
        let mut config = ConfigFile::new();
        config.set("server", "port", 8080).unwrap();
        config.set("server", "tls", true).unwrap();
        config.set("server", "port", 9090).unwrap();
        assert_eq!(config.to_ini().unwrap(), "[server]\nport = 9090\ntls = true\n");

        let back: ConfigFile = config.to_ini().unwrap().parse().unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn empty_config_round_trips() {
        let config = ConfigFile::new();
        let text = config.to_ini().unwrap();
        assert_eq!(text, "");
        assert_eq!(text.parse::<ConfigFile>().unwrap(), config);
        assert_eq!(ConfigFile::from_reader(&b""[..]).unwrap(), config);
    }

    #[test]
    fn simple_file_round_trips() {
        let config = simple();
        let back: ConfigFile = config.to_ini().unwrap().parse().unwrap();
        assert_eq!(back.into_tree(), config.into_tree());
    }

    #[test]
    fn set_on_non_object_header() {
        let mut config = ConfigFile::from_tree([("h", PropertyTree::from(1))].into_iter().collect());
        let err = config.set("h", "k", 2).unwrap_err();
        assert_eq!(err.expected, Kind::Object);
        assert_eq!(config.get_or("h", "k", 5i64), 5);
        assert!(!config.has_entry("h", "k"));

        let mut config = ConfigFile::from_tree(PropertyTree::from("flat"));
        assert!(config.set("h", "k", 2).is_err());
    }

    #[test]
    fn reader_and_errors() {
        let config = ConfigFile::from_reader(SIMPLE.as_bytes()).unwrap();
        assert_eq!(config, simple());
        assert!(matches!("key = 1".parse::<ConfigFile>(), Err(Error::Parse(_))));
    }
}
