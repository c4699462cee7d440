//! AST node types, deserializable from a JSON schema descriptor.
//!
//! The shapes mirror what a schema parser emits: a flat `type` name per
//! field, a `map { from, to }` descriptor for map fields, a `oneof` group
//! label, and a string-valued `options` bag. Fluent constructors are
//! provided for building schemas in code.

use serde::Deserialize;
use serde_json::Value;

/// A whole parsed schema: the top-level message and enum declarations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub messages: Vec<MessageAst>,
    pub enums: Vec<EnumAst>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: MessageAst) -> Self {
        self.messages.push(message);
        self
    }

    pub fn enumeration(mut self, enumeration: EnumAst) -> Self {
        self.enums.push(enumeration);
        self
    }

    /// Loads a schema from a JSON descriptor value.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// A message declaration, possibly with nested declarations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageAst {
    pub name: String,
    pub fields: Vec<FieldAst>,
    pub messages: Vec<MessageAst>,
    pub enums: Vec<EnumAst>,
}

impl MessageAst {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, field: FieldAst) -> Self {
        self.fields.push(field);
        self
    }

    pub fn message(mut self, message: MessageAst) -> Self {
        self.messages.push(message);
        self
    }

    pub fn enumeration(mut self, enumeration: EnumAst) -> Self {
        self.enums.push(enumeration);
        self
    }
}

/// One field declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldAst {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub tag: u32,
    pub repeated: bool,
    pub required: bool,
    pub oneof: Option<String>,
    pub map: Option<MapAst>,
    pub options: FieldOptions,
}

impl FieldAst {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, tag: u32) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            tag,
            ..Self::default()
        }
    }

    /// A map field; `type_name` is ignored for these.
    pub fn map(
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        tag: u32,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: "map".into(),
            tag,
            map: Some(MapAst {
                from: from.into(),
                to: to.into(),
            }),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn oneof(mut self, group: impl Into<String>) -> Self {
        self.oneof = Some(group.into());
        self
    }

    pub fn packed(mut self) -> Self {
        self.options.packed = Some(true);
        self
    }

    pub fn default_option(mut self, text: impl Into<String>) -> Self {
        self.options.default = Some(text.into());
        self
    }
}

/// Key/value type names of a map field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MapAst {
    pub from: String,
    pub to: String,
}

/// The option bag attached to a field declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
    pub default: Option<String>,
    pub packed: Option<bool>,
}

/// An enum declaration. Values keep declaration order; the first declared
/// value is the decode-time default. Each table entry is either a bare
/// integer or an object with a `value` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnumAst {
    pub name: String,
    pub values: serde_json::Map<String, Value>,
}

impl EnumAst {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: serde_json::Map::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, number: i64) -> Self {
        self.values.insert(name.into(), Value::from(number));
        self
    }
}
