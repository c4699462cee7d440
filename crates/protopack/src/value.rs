//! Dynamic value model for messages flowing through the compiled codecs.

/// A dynamic value: what a compiled codec encodes from and decodes into.
///
/// A message is a list of `(field name, value)` pairs in insertion order; a
/// field is absent when its name does not appear among the pairs. Map fields
/// are `(key, value)` pairs where the key is a scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    List(Vec<ProtoValue>),
    Map(Vec<(ProtoValue, ProtoValue)>),
    Message(Vec<(String, ProtoValue)>),
}

impl ProtoValue {
    /// Builds a message value from `(name, value)` pairs.
    pub fn message<N: Into<String>>(fields: Vec<(N, ProtoValue)>) -> Self {
        ProtoValue::Message(fields.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// Short name of the variant, used in error reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProtoValue::Bool(_) => "bool",
            ProtoValue::Int(_) => "int",
            ProtoValue::UInt(_) => "uint",
            ProtoValue::Float(_) => "float",
            ProtoValue::Bytes(_) => "bytes",
            ProtoValue::Str(_) => "string",
            ProtoValue::List(_) => "list",
            ProtoValue::Map(_) => "map",
            ProtoValue::Message(_) => "message",
        }
    }

    /// Looks up a field by name on a message value.
    pub fn get(&self, name: &str) -> Option<&ProtoValue> {
        match self {
            ProtoValue::Message(pairs) => {
                pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Sets a field on a message value, replacing any existing entry in
    /// place. No-op on non-message values.
    pub fn set(&mut self, name: impl Into<String>, value: ProtoValue) {
        if let ProtoValue::Message(pairs) = self {
            let name = name.into();
            match pairs.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = value,
                None => pairs.push((name, value)),
            }
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ProtoValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Signed view; unsigned values convert when they fit.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ProtoValue::Int(i) => Some(*i),
            ProtoValue::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Unsigned view; non-negative signed values convert.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ProtoValue::UInt(u) => Some(*u),
            ProtoValue::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Float view; integer values widen losslessly enough for wire use.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ProtoValue::Float(f) => Some(*f),
            ProtoValue::Int(i) => Some(*i as f64),
            ProtoValue::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProtoValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Byte view; strings expose their UTF-8 bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ProtoValue::Bytes(b) => Some(b),
            ProtoValue::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ProtoValue]> {
        match self {
            ProtoValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for ProtoValue {
    fn from(value: bool) -> Self {
        ProtoValue::Bool(value)
    }
}

impl From<i32> for ProtoValue {
    fn from(value: i32) -> Self {
        ProtoValue::Int(value.into())
    }
}

impl From<i64> for ProtoValue {
    fn from(value: i64) -> Self {
        ProtoValue::Int(value)
    }
}

impl From<u32> for ProtoValue {
    fn from(value: u32) -> Self {
        ProtoValue::UInt(value.into())
    }
}

impl From<u64> for ProtoValue {
    fn from(value: u64) -> Self {
        ProtoValue::UInt(value)
    }
}

impl From<f64> for ProtoValue {
    fn from(value: f64) -> Self {
        ProtoValue::Float(value)
    }
}

impl From<&str> for ProtoValue {
    fn from(value: &str) -> Self {
        ProtoValue::Str(value.to_owned())
    }
}

impl From<String> for ProtoValue {
    fn from(value: String) -> Self {
        ProtoValue::Str(value)
    }
}

impl From<Vec<u8>> for ProtoValue {
    fn from(value: Vec<u8>) -> Self {
        ProtoValue::Bytes(value)
    }
}
