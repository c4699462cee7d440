use protopack::schema::{EnumAst, FieldAst, MessageAst, Schema};
use protopack::{compile, ProtoValue, SchemaError};
use serde_json::json;

#[test]
fn json_descriptor_compiles_and_roundtrips() {
    let schema = Schema::from_json(json!({
        "messages": [{
            "name": "Envelope",
            "fields": [
                {"name": "id", "type": "uint64", "tag": 1, "required": true},
                {"name": "kind", "type": "Kind", "tag": 2},
                {"name": "payload", "type": "Body", "tag": 3},
                {"name": "labels", "type": "map", "tag": 4,
                 "map": {"from": "string", "to": "string"}},
                {"name": "sizes", "type": "uint32", "tag": 5, "repeated": true,
                 "options": {"packed": true}},
            ],
            "messages": [{
                "name": "Body",
                "fields": [
                    {"name": "data", "type": "bytes", "tag": 1, "required": true},
                ],
            }],
            "enums": [{"name": "Kind", "values": {"PLAIN": 0, "SIGNED": 1}}],
        }],
    }))
    .unwrap();
    let compiled = compile(&schema).unwrap();
    let envelope = compiled.message("Envelope").unwrap();

    let value = ProtoValue::message(vec![
        ("id", ProtoValue::UInt(12)),
        ("kind", ProtoValue::Int(1)),
        (
            "payload",
            ProtoValue::message(vec![("data", ProtoValue::Bytes(vec![1, 2]))]),
        ),
        (
            "labels",
            ProtoValue::Map(vec![(ProtoValue::Str("env".into()), "prod".into())]),
        ),
        (
            "sizes",
            ProtoValue::List(vec![ProtoValue::UInt(10), ProtoValue::UInt(20)]),
        ),
    ]);
    let bytes = envelope.encode(&value).unwrap();
    assert_eq!(bytes.len(), envelope.encoding_length(&value).unwrap());
    assert_eq!(envelope.decode(&bytes).unwrap(), value);
}

#[test]
fn facade_navigates_nested_declarations() {
    let schema = Schema::new().message(
        MessageAst::new("Outer")
            .message(
                MessageAst::new("Inner")
                    .field(FieldAst::new("n", "int32", 1))
                    .message(MessageAst::new("Deep")),
            )
            .enumeration(EnumAst::new("Mode").value("OFF", 0)),
    );
    let compiled = compile(&schema).unwrap();
    let outer = compiled.message("Outer").unwrap();
    let inner = outer.message("Inner").unwrap();
    assert_eq!(inner.id(), "Outer.Inner");
    assert_eq!(inner.message("Deep").unwrap().id(), "Outer.Inner.Deep");
    assert_eq!(outer.enum_type("Mode").unwrap().value("OFF"), Some(0));
    // Qualified ids resolve from the schema root too.
    assert!(compiled.message("Outer.Inner.Deep").is_some());
    assert!(compiled.message("Deep").is_none());
    // An enum id is not a message id.
    assert!(compiled.message("Outer.Mode").is_none());
    assert!(compiled.enum_type("Outer.Mode").is_some());
}

#[test]
fn inner_declaration_shadows_outer() {
    // Both Outer and Outer.Inner declare a message named T; a field inside
    // Inner resolves to the nearest scope.
    let schema = Schema::new().message(
        MessageAst::new("Outer")
            .message(MessageAst::new("T").field(FieldAst::new("outer_marker", "bool", 1)))
            .message(
                MessageAst::new("Inner")
                    .field(FieldAst::new("t", "T", 1))
                    .message(MessageAst::new("T").field(FieldAst::new("inner_marker", "bool", 1))),
            ),
    );
    let compiled = compile(&schema).unwrap();
    let inner = compiled.message("Outer.Inner").unwrap();
    let decoded = inner
        .decode(&[0x0a, 0x02, 0x08, 0x01]) // t = { marker: true }
        .unwrap();
    assert_eq!(
        decoded,
        ProtoValue::message(vec![(
            "t",
            ProtoValue::message(vec![("inner_marker", ProtoValue::Bool(true))])
        )])
    );
}

#[test]
fn sibling_scope_resolution_walks_ancestors() {
    // A field in one top-level message referencing a type nested in a
    // sibling must fail (partial qualification only walks ancestors), while
    // the dotted path succeeds.
    let schema = Schema::new()
        .message(MessageAst::new("A").message(MessageAst::new("Nested")))
        .message(MessageAst::new("B").field(FieldAst::new("x", "Nested", 1)));
    assert_eq!(
        compile(&schema).unwrap_err(),
        SchemaError::UnresolvedType {
            type_name: "Nested".into(),
            scope: "B".into()
        }
    );

    let schema = Schema::new()
        .message(MessageAst::new("A").message(MessageAst::new("Nested")))
        .message(MessageAst::new("B").field(FieldAst::new("x", "A.Nested", 1)));
    assert!(compile(&schema).is_ok());
}

#[test]
fn schema_error_matrix() {
    let duplicate_type = Schema::new()
        .message(MessageAst::new("M").enumeration(EnumAst::new("K")).message(MessageAst::new("K")));
    assert_eq!(
        compile(&duplicate_type).unwrap_err(),
        SchemaError::DuplicateType("M.K".into())
    );

    let duplicate_tag = Schema::new().message(
        MessageAst::new("M")
            .field(FieldAst::new("a", "int32", 3))
            .field(FieldAst::map("b", "string", "int32", 3)),
    );
    assert_eq!(
        compile(&duplicate_tag).unwrap_err(),
        SchemaError::DuplicateTag {
            message: "M".into(),
            tag: 3
        }
    );

    let bad_key = Schema::new()
        .message(MessageAst::new("M").field(FieldAst::map("m", "double", "int32", 1)));
    assert_eq!(
        compile(&bad_key).unwrap_err(),
        SchemaError::InvalidMapKey("double".into())
    );

    let bad_default = Schema::new().message(
        MessageAst::new("M").field(FieldAst::new("n", "uint32", 1).default_option("-1")),
    );
    assert_eq!(
        compile(&bad_default).unwrap_err(),
        SchemaError::InvalidDefault {
            field: "n".into(),
            value: "-1".into()
        }
    );

    let bad_enum = Schema::from_json(json!({
        "enums": [{"name": "K", "values": {"A": "not-a-number"}}],
    }))
    .unwrap();
    assert_eq!(
        compile(&bad_enum).unwrap_err(),
        SchemaError::InvalidEnumValue {
            enum_id: "K".into(),
            name: "A".into()
        }
    );
}

#[test]
fn enum_value_object_form_accepted() {
    // Value tables may carry bare integers or {"value": n} objects.
    let schema = Schema::from_json(json!({
        "enums": [{"name": "K", "values": {"A": 0, "B": {"value": 3}}}],
    }))
    .unwrap();
    let compiled = compile(&schema).unwrap();
    let k = compiled.enum_type("K").unwrap();
    assert_eq!(k.value("B"), Some(3));
    assert_eq!(k.values()[0].0, "A");
}

#[test]
fn declared_defaults_materialize_on_decode() {
    let schema = Schema::new().message(
        MessageAst::new("Config")
            .field(FieldAst::new("host", "string", 1).default_option("localhost"))
            .field(FieldAst::new("port", "uint32", 2).default_option("8080"))
            .field(FieldAst::new("debug", "bool", 3).default_option("true"))
            .field(FieldAst::new("mode", "Mode", 4).default_option("FAST"))
            .enumeration(EnumAst::new("Mode").value("SAFE", 0).value("FAST", 9)),
    );
    let compiled = compile(&schema).unwrap();
    let config = compiled.message("Config").unwrap();
    assert_eq!(
        config.decode(&[]).unwrap(),
        ProtoValue::message(vec![
            ("host", "localhost".into()),
            ("port", ProtoValue::UInt(8080)),
            ("debug", ProtoValue::Bool(true)),
            ("mode", ProtoValue::Int(9)),
        ])
    );
    // Wire values override declared defaults.
    let decoded = config.decode(&[0x10, 0x07]).unwrap();
    assert_eq!(decoded.get("port"), Some(&ProtoValue::UInt(7)));
}
