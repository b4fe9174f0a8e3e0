use crate::error::Error;
use crate::Result;
use indexmap::IndexMap;
use std::fmt;

/// Identifies an indirect object: `(object number, generation number)`.
pub type ObjectId = (u32, u16);

/// An ordered `Name -> Object` mapping. Insertion order is preserved because the Writer
/// must reproduce dictionaries in the order a producer wrote them.
#[derive(Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

/// A stream object: a dictionary plus an associated byte payload.
///
/// `raw` holds the bytes exactly as they sit in the file (still encoded by whatever
/// `/Filter` chain the dictionary names); `start_position` is the byte offset of the
/// payload in the source buffer, used by the Reader to lazily slurp large streams.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub raw: Vec<u8>,
    pub start_position: Option<usize>,
    /// Fonts and a handful of other streams must never be repacked into an object
    /// stream or recompressed; the Optimizer/Writer check this.
    pub allows_compression: bool,
}

#[derive(Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    StringLiteral(Vec<u8>),
    HexLiteral(Vec<u8>),
    Array(Vec<Object>),
    Dict(Dictionary),
    Stream(Stream),
    IndirectRef(ObjectId),
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

macro_rules! from_smaller_ints {
    ($( $Int:ty )+) => {
        $(
            impl From<$Int> for Object {
                fn from(value: $Int) -> Self {
                    Object::Integer(i64::from(value))
                }
            }
        )+
    };
}
from_smaller_ints! { i8 i16 i32 u8 u16 u32 }

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Real(value)
    }
}

impl From<f32> for Object {
    fn from(value: f32) -> Self {
        Object::Real(value as f64)
    }
}

impl From<String> for Object {
    fn from(name: String) -> Self {
        Object::Name(name.into_bytes())
    }
}

impl<'a> From<&'a str> for Object {
    fn from(name: &'a str) -> Self {
        Object::Name(name.as_bytes().to_vec())
    }
}

impl From<Vec<Object>> for Object {
    fn from(array: Vec<Object>) -> Self {
        Object::Array(array)
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dict(dict)
    }
}

impl From<Stream> for Object {
    fn from(stream: Stream) -> Self {
        Object::Stream(stream)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::IndirectRef(id)
    }
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::StringLiteral(s.into())
    }

    pub fn hex_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::HexLiteral(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn enum_variant(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::StringLiteral(_) => "StringLiteral",
            Object::HexLiteral(_) => "HexLiteral",
            Object::Array(_) => "Array",
            Object::Dict(_) => "Dict",
            Object::Stream(_) => "Stream",
            Object::IndirectRef(_) => "IndirectRef",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            path: String::new(),
            expected,
            found: self.enum_variant(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(v) => Ok(*v),
            _ => Err(self.mismatch("Boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(v) => Ok(*v),
            _ => Err(self.mismatch("Integer")),
        }
    }

    /// Unlike `as_i64`, also widens a `Real` that happens to carry an integral value.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Object::Integer(v) => Ok(*v as f64),
            Object::Real(v) => Ok(*v),
            _ => Err(self.mismatch("Integer or Real")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(self.mismatch("Name")),
        }
    }

    /// Bytes of either string variant; most consumers don't care which quoting style
    /// a producer chose.
    pub fn as_string_bytes(&self) -> Result<&[u8]> {
        match self {
            Object::StringLiteral(s) | Object::HexLiteral(s) => Ok(s),
            _ => Err(self.mismatch("StringLiteral or HexLiteral")),
        }
    }

    pub fn as_string_bytes_mut(&mut self) -> Result<&mut Vec<u8>> {
        match self {
            Object::StringLiteral(s) | Object::HexLiteral(s) => Ok(s),
            _ => Err(Error::TypeMismatch {
                path: String::new(),
                expected: "StringLiteral or HexLiteral",
                found: "other",
            }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::IndirectRef(id) => Ok(*id),
            _ => Err(self.mismatch("IndirectRef")),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(self.mismatch("Array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::TypeMismatch {
                path: String::new(),
                expected: "Array",
                found: "other",
            }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dict(d) => Ok(d),
            _ => Err(self.mismatch("Dict")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dict(d) => Ok(d),
            _ => Err(Error::TypeMismatch {
                path: String::new(),
                expected: "Dict",
                found: "other",
            }),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(self.mismatch("Stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::TypeMismatch {
                path: String::new(),
                expected: "Stream",
                found: "other",
            }),
        }
    }

    /// The `/Type` of a `Dict` or `Stream`, falling back to `/Linearized` for the
    /// first-page hint dictionary which omits `/Type`.
    pub fn type_name(&self) -> Result<&[u8]> {
        match self {
            Object::Dict(dict) => dict.get_type(),
            Object::Stream(stream) => stream.dict.get_type(),
            other => Err(other.mismatch("Dict or Stream")),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => write!(f, "Null"),
            Object::Boolean(v) => write!(f, "{v}"),
            Object::Integer(v) => write!(f, "{v}"),
            Object::Real(v) => write!(f, "{v}"),
            Object::Name(n) => write!(f, "/{}", String::from_utf8_lossy(n)),
            Object::StringLiteral(s) => write!(f, "({})", String::from_utf8_lossy(s)),
            Object::HexLiteral(s) => {
                write!(f, "<")?;
                for b in s {
                    write!(f, "{b:02x}")?;
                }
                write!(f, ">")
            }
            Object::Array(a) => {
                let items: Vec<String> = a.iter().map(|i| format!("{i:?}")).collect();
                write!(f, "[{}]", items.join(" "))
            }
            Object::Dict(d) => write!(f, "{d:?}"),
            Object::Stream(s) => write!(f, "{:?}stream...endstream", s.dict),
            Object::IndirectRef(id) => write!(f, "{} {} R", id.0, id.1),
        }
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key).to_string()))
    }

    pub fn get_opt(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0.get_mut(key).ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key).to_string()))
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        self.get(b"Type").and_then(Object::as_name).ok() == Some(type_name)
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type")
            .and_then(Object::as_name)
            .or_else(|_| self.get(b"Linearized").and(Ok(&b"Linearized"[..])))
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Vec<u8>, Object> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, Vec<u8>, Object> {
        self.0.iter_mut()
    }

    pub fn as_map(&self) -> &IndexMap<Vec<u8>, Object> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut IndexMap<Vec<u8>, Object> {
        &mut self.0
    }
}

#[macro_export]
macro_rules! dictionary {
    () => { $crate::Dictionary::new() };
    ($( $key:expr => $value:expr ),+ ,) => { dictionary!( $($key => $value),+ ) };
    ($( $key:expr => $value:expr ),*) => {{
        let mut dict = $crate::Dictionary::new();
        $( dict.set($key, $value); )*
        dict
    }};
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("/{} {:?}", String::from_utf8_lossy(k), v))
            .collect();
        write!(f, "<<{}>>", entries.concat())
    }
}

impl IntoIterator for Dictionary {
    type Item = (Vec<u8>, Object);
    type IntoIter = indexmap::map::IntoIter<Vec<u8>, Object>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, Vec<u8>, Object>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, Object)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

impl Stream {
    pub fn new(mut dict: Dictionary, raw: Vec<u8>) -> Self {
        dict.set("Length", raw.len() as i64);
        Stream {
            dict,
            raw,
            start_position: None,
            allows_compression: true,
        }
    }

    pub fn with_position(dict: Dictionary, position: usize) -> Self {
        Stream {
            dict,
            raw: vec![],
            start_position: Some(position),
            allows_compression: true,
        }
    }

    pub fn with_compression(mut self, allows_compression: bool) -> Self {
        self.allows_compression = allows_compression;
        self
    }

    pub fn set_raw(&mut self, raw: Vec<u8>) {
        self.dict.set("Length", raw.len() as i64);
        self.raw = raw;
    }

    pub fn set_plain_content(&mut self, content: Vec<u8>) {
        self.dict.remove(b"DecodeParms");
        self.dict.remove(b"Filter");
        self.set_raw(content);
    }

    /// Names of the filters applied to this stream's payload, in decode order.
    pub fn filters(&self) -> Result<Vec<&[u8]>> {
        match self.dict.get(b"Filter") {
            Ok(obj) => {
                if let Ok(name) = obj.as_name() {
                    Ok(vec![name])
                } else if let Ok(names) = obj.as_array() {
                    names.iter().map(Object::as_name).collect()
                } else {
                    Err(Error::TypeMismatch {
                        path: "Filter".into(),
                        expected: "Name or Array",
                        found: obj.enum_variant(),
                    })
                }
            }
            Err(_) => Ok(vec![]),
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.dict.get(b"Filter").is_ok()
    }
}
