use std::fmt;
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use uuid::Uuid;

pub type Array = Vec<PropertyTree>;
/// Keys keep insertion order.
pub type Object = IndexMap<String, PropertyTree>;
pub type Blob = Vec<u8>;

/// A dynamically typed document value shared by every codec.
///
/// Each node owns its children; equality is deep. Objects compare equal
/// regardless of key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PropertyTree {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Uuid(Uuid),
    Blob(Blob),
    Array(Array),
    Object(Object),
}

/// The variant a [`PropertyTree`] currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Integer,
    Double,
    String,
    Uuid,
    Blob,
    Array,
    Object,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Integer => "integer",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Uuid => "uuid",
            Kind::Blob => "blob",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed accessor was used on a node holding a different variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} but found {found}")]
pub struct WrongVariant {
    pub expected: Kind,
    pub found: Kind,
}

static NULL: PropertyTree = PropertyTree::Null;

impl PropertyTree {
    pub fn new() -> Self {
        PropertyTree::Null
    }

    pub fn blob(bytes: impl Into<Blob>) -> Self {
        PropertyTree::Blob(bytes.into())
    }

    pub fn kind(&self) -> Kind {
        match self {
            PropertyTree::Null => Kind::Null,
            PropertyTree::Bool(_) => Kind::Bool,
            PropertyTree::Integer(_) => Kind::Integer,
            PropertyTree::Double(_) => Kind::Double,
            PropertyTree::String(_) => Kind::String,
            PropertyTree::Uuid(_) => Kind::Uuid,
            PropertyTree::Blob(_) => Kind::Blob,
            PropertyTree::Array(_) => Kind::Array,
            PropertyTree::Object(_) => Kind::Object,
        }
    }

    fn wrong(&self, expected: Kind) -> WrongVariant {
        WrongVariant {
            expected,
            found: self.kind(),
        }
    }

    // ── Variant tests ───────────────────────────────────────────────

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyTree::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, PropertyTree::Bool(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, PropertyTree::Integer(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, PropertyTree::Double(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, PropertyTree::String(_))
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self, PropertyTree::Uuid(_))
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, PropertyTree::Blob(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, PropertyTree::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, PropertyTree::Object(_))
    }

    // ── Typed accessors ─────────────────────────────────────────────

    pub fn bool_value(&self) -> Result<bool, WrongVariant> {
        self.as_bool().ok_or_else(|| self.wrong(Kind::Bool))
    }

    pub fn integer_value(&self) -> Result<i64, WrongVariant> {
        self.as_i64().ok_or_else(|| self.wrong(Kind::Integer))
    }

    pub fn double_value(&self) -> Result<f64, WrongVariant> {
        self.as_f64().ok_or_else(|| self.wrong(Kind::Double))
    }

    pub fn string_value(&self) -> Result<&str, WrongVariant> {
        self.as_str().ok_or_else(|| self.wrong(Kind::String))
    }

    pub fn uuid_value(&self) -> Result<Uuid, WrongVariant> {
        self.as_uuid().ok_or_else(|| self.wrong(Kind::Uuid))
    }

    pub fn blob_value(&self) -> Result<&[u8], WrongVariant> {
        self.as_blob().ok_or_else(|| self.wrong(Kind::Blob))
    }

    pub fn array_value(&self) -> Result<&Array, WrongVariant> {
        self.as_array().ok_or_else(|| self.wrong(Kind::Array))
    }

    pub fn object_value(&self) -> Result<&Object, WrongVariant> {
        self.as_object().ok_or_else(|| self.wrong(Kind::Object))
    }

    pub fn string_value_mut(&mut self) -> Result<&mut String, WrongVariant> {
        match self {
            PropertyTree::String(s) => Ok(s),
            other => Err(other.wrong(Kind::String)),
        }
    }

    pub fn array_value_mut(&mut self) -> Result<&mut Array, WrongVariant> {
        match self {
            PropertyTree::Array(a) => Ok(a),
            other => Err(other.wrong(Kind::Array)),
        }
    }

    pub fn object_value_mut(&mut self) -> Result<&mut Object, WrongVariant> {
        match self {
            PropertyTree::Object(o) => Ok(o),
            other => Err(other.wrong(Kind::Object)),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyTree::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyTree::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyTree::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyTree::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            PropertyTree::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            PropertyTree::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            PropertyTree::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            PropertyTree::Object(o) => Some(o),
            _ => None,
        }
    }

    // ── Containers ──────────────────────────────────────────────────

    /// False for anything that is not an object.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyTree> {
        self.as_object().and_then(|o| o.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyTree> {
        match self {
            PropertyTree::Object(o) => o.get_mut(key),
            _ => None,
        }
    }

    /// Number of elements of an array or entries of an object; 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            PropertyTree::Array(a) => a.len(),
            PropertyTree::Object(o) => o.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends to an array. A null node becomes an empty array first.
    pub fn push(&mut self, value: impl Into<PropertyTree>) -> Result<(), WrongVariant> {
        if self.is_null() {
            *self = PropertyTree::Array(Array::new());
        }
        self.array_value_mut()?.push(value.into());
        Ok(())
    }

    /// Inserts into an object, returning the replaced value. A null node
    /// becomes an empty object first.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyTree>,
    ) -> Result<Option<PropertyTree>, WrongVariant> {
        if self.is_null() {
            *self = PropertyTree::Object(Object::new());
        }
        Ok(self.object_value_mut()?.insert(key.into(), value.into()))
    }
}

/// Missing keys and non-object nodes yield `Null`.
impl Index<&str> for PropertyTree {
    type Output = PropertyTree;

    fn index(&self, key: &str) -> &PropertyTree {
        self.get(key).unwrap_or(&NULL)
    }
}

/// Auto-vivifies: a null node becomes an object, a missing key is
/// inserted as `Null`.
///
/// # Panics
/// If the node holds any other non-object variant.
impl IndexMut<&str> for PropertyTree {
    fn index_mut(&mut self, key: &str) -> &mut PropertyTree {
        if self.is_null() {
            *self = PropertyTree::Object(Object::new());
        }
        match self {
            PropertyTree::Object(o) => o.entry(key.to_string()).or_default(),
            other => panic!("cannot index into {} with key {key:?}", other.kind()),
        }
    }
}

/// Out-of-range indices and non-array nodes yield `Null`.
impl Index<usize> for PropertyTree {
    type Output = PropertyTree;

    fn index(&self, index: usize) -> &PropertyTree {
        self.as_array().and_then(|a| a.get(index)).unwrap_or(&NULL)
    }
}

impl IndexMut<usize> for PropertyTree {
    fn index_mut(&mut self, index: usize) -> &mut PropertyTree {
        match self {
            PropertyTree::Array(a) => {
                let len = a.len();
                match a.get_mut(index) {
                    Some(v) => v,
                    None => panic!("index {index} out of range for array of length {len}"),
                }
            }
            other => panic!("cannot index into {} with {index}", other.kind()),
        }
    }
}

impl fmt::Display for PropertyTree {
    /// Compact JSON; trees JSON cannot hold print as `<kind>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::json::to_json(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<{}>", self.kind()),
        }
    }
}

// ── Conversions ─────────────────────────────────────────────────────

impl From<()> for PropertyTree {
    fn from(_: ()) -> Self {
        PropertyTree::Null
    }
}

impl From<bool> for PropertyTree {
    fn from(v: bool) -> Self {
        PropertyTree::Bool(v)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PropertyTree {
                fn from(v: $t) -> Self {
                    PropertyTree::Integer(i64::from(v))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for PropertyTree {
    fn from(v: f32) -> Self {
        PropertyTree::Double(f64::from(v))
    }
}

impl From<f64> for PropertyTree {
    fn from(v: f64) -> Self {
        PropertyTree::Double(v)
    }
}

impl From<&str> for PropertyTree {
    fn from(v: &str) -> Self {
        PropertyTree::String(v.to_string())
    }
}

impl From<String> for PropertyTree {
    fn from(v: String) -> Self {
        PropertyTree::String(v)
    }
}

impl From<Uuid> for PropertyTree {
    fn from(v: Uuid) -> Self {
        PropertyTree::Uuid(v)
    }
}

impl From<Array> for PropertyTree {
    fn from(v: Array) -> Self {
        PropertyTree::Array(v)
    }
}

impl From<Object> for PropertyTree {
    fn from(v: Object) -> Self {
        PropertyTree::Object(v)
    }
}

impl FromIterator<PropertyTree> for PropertyTree {
    fn from_iter<I: IntoIterator<Item = PropertyTree>>(iter: I) -> Self {
        PropertyTree::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, PropertyTree)> for PropertyTree {
    fn from_iter<I: IntoIterator<Item = (K, PropertyTree)>>(iter: I) -> Self {
        PropertyTree::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ── Comparison against plain values ─────────────────────────────────

macro_rules! eq_plain {
    ($($t:ty => |$tree:ident, $other:ident| $body:expr;)*) => {
        $(
            impl PartialEq<$t> for PropertyTree {
                fn eq(&self, $other: &$t) -> bool {
                    let $tree = self;
                    $body
                }
            }

            impl PartialEq<PropertyTree> for $t {
                fn eq(&self, other: &PropertyTree) -> bool {
                    other == self
                }
            }
        )*
    };
}

eq_plain! {
    bool => |t, o| t.as_bool() == Some(*o);
    i64 => |t, o| t.as_i64() == Some(*o);
    i32 => |t, o| t.as_i64() == Some(i64::from(*o));
    u32 => |t, o| t.as_i64() == Some(i64::from(*o));
    f64 => |t, o| t.as_f64() == Some(*o);
    str => |t, o| t.as_str() == Some(o);
    &str => |t, o| t.as_str() == Some(*o);
    String => |t, o| t.as_str() == Some(o.as_str());
    Uuid => |t, o| t.as_uuid() == Some(*o);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_null() {
        let pt = PropertyTree::default();
        assert!(pt.is_null());
        assert_eq!(pt.kind(), Kind::Null);
    }

    #[test]
    fn index_auto_vivifies_null() {
        let mut pt = PropertyTree::new();
        pt["header"]["value"] = 42.into();
        assert!(pt.is_object());
        assert!(pt["header"].is_object());
        assert_eq!(pt["header"]["value"], 42);
        assert!(pt["missing"].is_null());
        assert!(!pt.contains("missing"));
    }

    #[test]
    #[should_panic]
    fn index_mut_on_scalar_panics() {
        let mut pt = PropertyTree::from(5);
        pt["key"] = true.into();
    }

    #[test]
    fn contains_is_false_for_non_objects() {
        assert!(!PropertyTree::from("text").contains("text"));
        assert!(!PropertyTree::Array(vec![1.into()]).contains("0"));
    }

    #[test]
    fn wrong_variant() {
        let pt = PropertyTree::from("foo");
        assert_eq!(pt.string_value(), Ok("foo"));
        assert_eq!(
            pt.integer_value(),
            Err(WrongVariant {
                expected: Kind::Integer,
                found: Kind::String,
            })
        );
        assert_eq!(
            pt.integer_value().unwrap_err().to_string(),
            "expected integer but found string"
        );
        assert!(PropertyTree::Integer(1).double_value().is_err());
    }

    #[test]
    fn reassignment_replaces_variant() {
        let mut pt = PropertyTree::from(1.5);
        assert!(pt.is_double());
        pt = PropertyTree::from(vec![PropertyTree::from(1)]);
        assert!(pt.is_array());
        assert_eq!(pt[0], 1);
        assert!(pt[1].is_null());
    }

    #[test]
    fn plain_value_equality() {
        assert_eq!(PropertyTree::from(5), 5);
        assert_eq!(PropertyTree::from(5), 5i64);
        assert_ne!(PropertyTree::from(5), 5.0);
        assert_eq!(PropertyTree::from(2.5), 2.5);
        assert_eq!(PropertyTree::from("foo"), "foo");
        assert_eq!(PropertyTree::from("foo"), "foo".to_string());
        assert_eq!(PropertyTree::from(true), true);
        assert_ne!(PropertyTree::from("true"), true);
        assert_eq!("foo", PropertyTree::from("foo"));
    }

    #[test]
    fn structural_equality() {
        let a: PropertyTree = [("x", PropertyTree::from(1)), ("y", PropertyTree::from("two"))]
            .into_iter()
            .collect();
        let b: PropertyTree = [("y", PropertyTree::from("two")), ("x", PropertyTree::from(1))]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_ne!(a, PropertyTree::Null);
        assert_ne!(PropertyTree::from(1), PropertyTree::from(1.0));
    }

    #[test]
    fn push_and_insert() {
        let mut pt = PropertyTree::Null;
        pt.push(1).unwrap();
        pt.push("two").unwrap();
        assert_eq!(pt.len(), 2);
        assert!(pt.insert("k", 1).is_err());

        let mut pt = PropertyTree::Null;
        assert_eq!(pt.insert("k", 1), Ok(None));
        assert_eq!(pt.insert("k", 2), Ok(Some(PropertyTree::from(1))));
        assert!(pt.push(3).is_err());
    }

    #[test]
    fn object_keeps_insertion_order() {
        let mut pt = PropertyTree::Null;
        pt["zeta"] = 1.into();
        pt["alpha"] = 2.into();
        pt["mid"] = 3.into();
        let keys: Vec<&str> = pt.object_value().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn blob() {
        let pt = PropertyTree::blob(vec![1u8, 2, 3]);
        assert!(pt.is_blob());
        assert_eq!(pt.blob_value(), Ok(&[1u8, 2, 3][..]));
        assert_eq!(pt.to_string(), "<blob>");
    }
}
