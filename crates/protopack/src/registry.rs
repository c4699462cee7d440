//! Schema resolver and registry.
//!
//! Compilation runs in two passes over the AST. Pass 1 walks nested
//! messages and enums depth-first, assigning every declaration a
//! dot-qualified id and a slot in an arena. Pass 2 resolves each field's
//! type name against that complete index and parses typed defaults. Because
//! every id exists before any field is resolved, self-referential and
//! mutually-recursive message graphs terminate by construction: a field of
//! message type holds an arena reference, not a nested codec.

use std::collections::{HashMap, HashSet};

use crate::error::SchemaError;
use crate::scalars::{CustomCodec, ExtraCodecs, ScalarType};
use crate::schema::{FieldAst, MessageAst, Schema};
use crate::value::ProtoValue;

/// Arena reference to a compiled message descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub(crate) usize);

/// Arena reference to a compiled enum descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumRef(pub(crate) usize);

#[derive(Debug, Clone, Copy)]
pub(crate) enum TypeRef {
    Message(usize),
    Enum(usize),
}

/// Presence discipline of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

/// Resolved type of a field. Map fields carry their key and value codecs
/// directly; on the wire each entry is a length-delimited record with the
/// key at tag 1 and the value at tag 2.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarType),
    Enum(EnumRef),
    Message(MessageRef),
    Custom(usize),
    Map {
        key: ScalarType,
        value: Box<FieldKind>,
    },
}

/// One compiled field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub tag: u32,
    pub label: Label,
    pub oneof: Option<String>,
    pub packed: bool,
    pub default: Option<ProtoValue>,
    pub kind: FieldKind,
}

/// One compiled message.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    /// Dot-qualified path, stable for the registry's lifetime.
    pub id: String,
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub(crate) nested_messages: Vec<usize>,
    pub(crate) nested_enums: Vec<usize>,
    tags: HashMap<u32, usize>,
}

impl MessageDescriptor {
    pub fn field_by_tag(&self, tag: u32) -> Option<&FieldDescriptor> {
        self.tags.get(&tag).map(|&i| &self.fields[i])
    }

    pub(crate) fn field_index(&self, tag: u32) -> Option<usize> {
        self.tags.get(&tag).copied()
    }
}

/// One compiled enum: named constants in declaration order.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub id: String,
    pub name: String,
    pub values: Vec<(String, i64)>,
}

impl EnumDescriptor {
    pub fn value(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn name_of(&self, number: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| *v == number)
            .map(|(n, _)| n.as_str())
    }

    pub fn contains(&self, number: i64) -> bool {
        self.values.iter().any(|(_, v)| *v == number)
    }
}

/// The compiled registry: message and enum arenas plus the qualified-id
/// index. Built once from a [`Schema`], never mutated; every codec
/// operation borrows it immutably.
pub struct CompiledSchema {
    messages: Vec<MessageDescriptor>,
    enums: Vec<EnumDescriptor>,
    index: HashMap<String, TypeRef>,
    customs: Vec<Box<dyn CustomCodec>>,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("messages", &self.messages)
            .field("enums", &self.enums)
            .field("index", &self.index)
            .field("customs", &self.customs.len())
            .finish()
    }
}

impl CompiledSchema {
    /// Compiles a parsed schema.
    pub fn compile(schema: &Schema) -> Result<Self, SchemaError> {
        Self::compile_with(schema, ExtraCodecs::new())
    }

    /// Compiles a parsed schema with a caller-supplied codec table, which
    /// takes precedence over every other resolution tier.
    pub fn compile_with(schema: &Schema, extra: ExtraCodecs) -> Result<Self, SchemaError> {
        let mut custom_index = HashMap::new();
        for (i, (name, _)) in extra.codecs.iter().enumerate() {
            custom_index.insert(name.clone(), i);
        }
        let mut compiled = CompiledSchema {
            messages: Vec::new(),
            enums: Vec::new(),
            index: HashMap::new(),
            customs: extra.codecs.into_iter().map(|(_, codec)| codec).collect(),
        };

        // Pass 1: assign ids and arena slots.
        let mut pending: Vec<(usize, &[FieldAst])> = Vec::new();
        for message in &schema.messages {
            compiled.register_message(message, "", &mut pending)?;
        }
        for enumeration in &schema.enums {
            compiled.register_enum(enumeration, "")?;
        }

        // Pass 2: resolve field types against the complete index.
        for (slot, fields) in pending {
            let scope = compiled.messages[slot].id.clone();
            let mut descriptors = Vec::with_capacity(fields.len());
            for field in fields {
                descriptors.push(compiled.resolve_field(field, &scope, &custom_index)?);
            }
            let tags = descriptors
                .iter()
                .enumerate()
                .map(|(i, f)| (f.tag, i))
                .collect();
            let descriptor = &mut compiled.messages[slot];
            descriptor.fields = descriptors;
            descriptor.tags = tags;
        }
        Ok(compiled)
    }

    fn register_message<'a>(
        &mut self,
        ast: &'a MessageAst,
        parent: &str,
        pending: &mut Vec<(usize, &'a [FieldAst])>,
    ) -> Result<usize, SchemaError> {
        let id = qualify(parent, &ast.name);
        if self.index.contains_key(&id) {
            return Err(SchemaError::DuplicateType(id));
        }
        let mut seen = HashSet::new();
        for field in &ast.fields {
            if !seen.insert(field.tag) {
                return Err(SchemaError::DuplicateTag {
                    message: id,
                    tag: field.tag,
                });
            }
        }
        let slot = self.messages.len();
        self.messages.push(MessageDescriptor {
            id: id.clone(),
            name: ast.name.clone(),
            fields: Vec::new(),
            nested_messages: Vec::new(),
            nested_enums: Vec::new(),
            tags: HashMap::new(),
        });
        self.index.insert(id.clone(), TypeRef::Message(slot));
        pending.push((slot, &ast.fields));
        for nested in &ast.messages {
            let child = self.register_message(nested, &id, pending)?;
            self.messages[slot].nested_messages.push(child);
        }
        for nested in &ast.enums {
            let child = self.register_enum(nested, &id)?;
            self.messages[slot].nested_enums.push(child);
        }
        Ok(slot)
    }

    fn register_enum(
        &mut self,
        ast: &crate::schema::EnumAst,
        parent: &str,
    ) -> Result<usize, SchemaError> {
        let id = qualify(parent, &ast.name);
        if self.index.contains_key(&id) {
            return Err(SchemaError::DuplicateType(id));
        }
        let mut values = Vec::with_capacity(ast.values.len());
        for (name, entry) in &ast.values {
            let number = entry
                .as_i64()
                .or_else(|| entry.get("value").and_then(serde_json::Value::as_i64))
                .ok_or_else(|| SchemaError::InvalidEnumValue {
                    enum_id: id.clone(),
                    name: name.clone(),
                })?;
            values.push((name.clone(), number));
        }
        let slot = self.enums.len();
        self.enums.push(EnumDescriptor {
            id: id.clone(),
            name: ast.name.clone(),
            values,
        });
        self.index.insert(id, TypeRef::Enum(slot));
        Ok(slot)
    }

    /// Resolves a type name from a message scope: caller-supplied codecs
    /// first, then the scalar table, then the registry under partial
    /// qualification — the name qualified at `scope`, then at each
    /// successive ancestor scope up to the empty prefix.
    fn resolve(
        &self,
        type_name: &str,
        scope: &str,
        customs: &HashMap<String, usize>,
    ) -> Result<FieldKind, SchemaError> {
        if let Some(&idx) = customs.get(type_name) {
            return Ok(FieldKind::Custom(idx));
        }
        if let Some(scalar) = ScalarType::from_name(type_name) {
            return Ok(FieldKind::Scalar(scalar));
        }
        let mut prefix = scope;
        loop {
            let candidate = qualify(prefix, type_name);
            if let Some(type_ref) = self.index.get(&candidate) {
                return Ok(match *type_ref {
                    TypeRef::Message(i) => FieldKind::Message(MessageRef(i)),
                    TypeRef::Enum(i) => FieldKind::Enum(EnumRef(i)),
                });
            }
            if prefix.is_empty() {
                break;
            }
            prefix = match prefix.rfind('.') {
                Some(pos) => &prefix[..pos],
                None => "",
            };
        }
        Err(SchemaError::UnresolvedType {
            type_name: type_name.to_owned(),
            scope: scope.to_owned(),
        })
    }

    fn resolve_field(
        &self,
        ast: &FieldAst,
        scope: &str,
        customs: &HashMap<String, usize>,
    ) -> Result<FieldDescriptor, SchemaError> {
        let kind = match &ast.map {
            Some(map) => {
                let key = ScalarType::from_name(&map.from)
                    .filter(|s| s.is_map_key())
                    .ok_or_else(|| SchemaError::InvalidMapKey(map.from.clone()))?;
                let value = self.resolve(&map.to, scope, customs)?;
                FieldKind::Map {
                    key,
                    value: Box::new(value),
                }
            }
            None => self.resolve(&ast.type_name, scope, customs)?,
        };
        let label = if ast.map.is_some() {
            Label::Optional
        } else if ast.repeated {
            Label::Repeated
        } else if ast.required {
            Label::Required
        } else {
            Label::Optional
        };
        let packed = ast.repeated
            && ast.options.packed == Some(true)
            && match &kind {
                FieldKind::Scalar(scalar) => scalar.is_packable(),
                FieldKind::Enum(_) => true,
                _ => false,
            };
        let default = match &ast.options.default {
            Some(text) => Some(self.parse_default(&kind, text).ok_or_else(|| {
                SchemaError::InvalidDefault {
                    field: ast.name.clone(),
                    value: text.clone(),
                }
            })?),
            None => None,
        };
        Ok(FieldDescriptor {
            name: ast.name.clone(),
            tag: ast.tag,
            label,
            oneof: ast.oneof.clone(),
            packed,
            default,
            kind,
        })
    }

    /// Typed default for a declared `default` option. Enum defaults parse
    /// as an integer validated against the value table, falling back to a
    /// value-name lookup.
    fn parse_default(&self, kind: &FieldKind, text: &str) -> Option<ProtoValue> {
        match kind {
            FieldKind::Scalar(scalar) => scalar.parse_default(text),
            FieldKind::Enum(e) => {
                let descriptor = self.enum_desc(*e);
                match text.parse::<i64>() {
                    Ok(number) if descriptor.contains(number) => Some(ProtoValue::Int(number)),
                    Ok(_) => None,
                    Err(_) => descriptor.value(text).map(ProtoValue::Int),
                }
            }
            _ => None,
        }
    }

    pub(crate) fn message_desc(&self, r: MessageRef) -> &MessageDescriptor {
        &self.messages[r.0]
    }

    pub(crate) fn enum_desc(&self, r: EnumRef) -> &EnumDescriptor {
        &self.enums[r.0]
    }

    pub(crate) fn custom(&self, idx: usize) -> &dyn CustomCodec {
        &*self.customs[idx]
    }

    pub(crate) fn lookup(&self, id: &str) -> Option<TypeRef> {
        self.index.get(id).copied()
    }

    /// Wire type a field of this kind puts on the wire.
    pub(crate) fn field_wire_type(&self, kind: &FieldKind) -> crate::wire::WireType {
        use crate::wire::WireType;
        match kind {
            FieldKind::Scalar(scalar) => scalar.wire_type(),
            FieldKind::Enum(_) => WireType::Varint,
            FieldKind::Custom(i) => self.custom(*i).wire_type(),
            FieldKind::Message(_) | FieldKind::Map { .. } => WireType::LengthDelimited,
        }
    }
}

fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}.{name}")
    }
}
