use proto_osi::desc::VariantDecl;
use proto_osi::value::{from_json, to_json};
use proto_osi::{
    Catalog, EncodeOptions, EnumDecl, FieldDecl, Primitive, RecordDecl, Schema, SchemaGenerator, TypeDesc, TypeRef,
    UnionDecl, Value,
};
use serde_json::json;

fn catalog() -> Catalog {
    let payload = {
        let mut u = UnionDecl::new("Payload")
            .variant(TypeDesc::reference("Inner"))
            .variant(TypeDesc::string())
            .variant(TypeDesc::list(TypeDesc::int64()));
        u.variants.push(VariantDecl { ty: TypeDesc::nullable(TypeDesc::bool()), number: Some(10), name: Some("flag".into()) });
        u.into_desc()
    };
    Catalog::new()
        .with(EnumDecl::new("Color").default_value("UNKNOWN").value("RED").value("GREEN").into_desc())
        .with(
            RecordDecl::new("Inner")
                .field("n", TypeDesc::int32())
                .field("label", TypeDesc::nullable(TypeDesc::string()))
                .into_desc(),
        )
        .with(payload)
        .with(
            RecordDecl::new("Everything")
                .field("flag", TypeDesc::bool())
                .field("small", TypeDesc::primitive(Primitive::Int8))
                .field("count", TypeDesc::uint64())
                .field("ratio", TypeDesc::double())
                .field("temp", TypeDesc::float())
                .field("name", TypeDesc::string())
                .field("blob", TypeDesc::list(TypeDesc::primitive(Primitive::Uint8)))
                .field("color", TypeDesc::reference("Color"))
                .field("inner", TypeDesc::reference("Inner"))
                .field("maybe_inner", TypeDesc::nullable(TypeDesc::reference("Inner")))
                .field("maybe_count", TypeDesc::nullable(TypeDesc::uint32()))
                .field("ids", TypeDesc::list(TypeDesc::int32()))
                .push(FieldDecl::new("loose_ids", TypeDesc::list(TypeDesc::uint32())).packed(false))
                .field("tags", TypeDesc::list(TypeDesc::string()))
                .field("colors", TypeDesc::list(TypeDesc::reference("Color")))
                .field("grid", TypeDesc::list(TypeDesc::list(TypeDesc::int32())))
                .field("maybe_tags", TypeDesc::nullable(TypeDesc::list(TypeDesc::string())))
                .field("scores", TypeDesc::map(TypeDesc::string(), TypeDesc::int32()))
                .field("lookup", TypeDesc::map(TypeDesc::int32(), TypeDesc::reference("Inner")))
                .field("payload", TypeDesc::reference("Payload"))
                .field("sparse", TypeDesc::list(TypeDesc::nullable(TypeDesc::int32())))
                .into_desc(),
        )
}

fn everything() -> (Schema, TypeRef) {
    let mut generator = SchemaGenerator::new();
    let root = generator.generate_named(&catalog(), "Everything").unwrap();
    (generator.finish(), root)
}

fn full_value() -> serde_json::Value {
    json!({
        "flag": true,
        "small": -7,
        "count": 18446744073709551615u64,
        "ratio": 2.5,
        "temp": -0.5,
        "name": "héllo",
        "blob": "00ff10",
        "color": "GREEN",
        "inner": {"n": 3, "label": "three"},
        "maybe_inner": {"n": 0, "label": null},
        "maybe_count": 0,
        "ids": [1, -1, 300],
        "loose_ids": [0, 4294967295u32],
        "tags": ["a", ""],
        "colors": ["RED", "UNKNOWN"],
        "grid": [[1, 2], [], [3]],
        "maybe_tags": ["x"],
        "scores": {"alice": 10, "bob": 0},
        "lookup": [[1, {"n": 1, "label": "one"}], [-2, {"n": 0, "label": null}]],
        "payload": {"list_of_int64": [5, -6]},
        "sparse": [1, null, 0]
    })
}

fn sparse_value() -> serde_json::Value {
    json!({
        "flag": false,
        "small": 0,
        "count": 0,
        "ratio": 0.0,
        "temp": 0.0,
        "name": "",
        "blob": "",
        "color": "UNKNOWN",
        "inner": {"n": 0, "label": null},
        "maybe_inner": null,
        "maybe_count": null,
        "ids": [],
        "loose_ids": [],
        "tags": [],
        "colors": [],
        "grid": [],
        "maybe_tags": null,
        "scores": [],
        "lookup": [],
        "payload": {"flag": null},
        "sparse": []
    })
}

#[test]
fn every_shape_round_trips_with_and_without_default_suppression() {
    let (schema, root) = everything();
    for doc in [full_value(), sparse_value()] {
        let value = from_json(&schema, root, &doc).unwrap();
        for emit_defaults in [false, true] {
            let options = EncodeOptions { emit_defaults };
            let bytes = schema.encode_with(root, &value, options).unwrap();
            let decoded = schema.decode(root, &bytes).unwrap();
            assert_eq!(decoded, value, "emit_defaults = {emit_defaults}");
            assert_eq!(schema.encode_with(root, &decoded, options).unwrap(), bytes);
        }
    }
}

#[test]
fn suppression_only_drops_singular_defaults() {
    let (schema, root) = everything();
    let value = from_json(&schema, root, &sparse_value()).unwrap();
    let quiet = schema.encode(root, &value).unwrap();
    let loud = schema.encode_with(root, &value, EncodeOptions { emit_defaults: true }).unwrap();
    // inner (empty message, field 9) and payload (field 20 holding an empty `flag` wrapper) remain.
    assert_eq!(quiet, vec![0x4A, 0x00, 0xA2, 0x01, 0x02, 0x52, 0x00]);
    assert!(loud.len() > quiet.len());
}

#[test]
fn json_rendering_survives_a_round_trip() {
    let (schema, root) = everything();
    let value = from_json(&schema, root, &full_value()).unwrap();
    let bytes = schema.encode(root, &value).unwrap();
    let decoded = schema.decode(root, &bytes).unwrap();
    let rendered = to_json(&decoded);
    assert_eq!(rendered["scores"], json!([["alice", 10], ["bob", 0]]));
    assert_eq!(rendered["blob"], json!("00ff10"));
    assert_eq!(rendered["sparse"], json!([1, null, 0]));
    assert_eq!(from_json(&schema, root, &rendered).unwrap(), value);
}

#[test]
fn record_with_negative_int_and_string_list() {
    let root = RecordDecl::new("Pair")
        .field("a", TypeDesc::int32())
        .field("b", TypeDesc::list(TypeDesc::string()))
        .into_desc();
    let mut generator = SchemaGenerator::new();
    let r = generator.generate(&Catalog::new(), &root).unwrap();
    let schema = generator.finish();

    let value = Value::record([("a", Value::I32(-5)), ("b", Value::List(vec![Value::string("x"), Value::string("y")]))]);
    let bytes = schema.encode(r, &value).unwrap();
    let mut expected = vec![0x08, 0xFB, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
    expected.extend_from_slice(&[0x12, 0x01, b'x', 0x12, 0x01, b'y']);
    assert_eq!(bytes, expected);
    assert_eq!(schema.decode(r, &bytes).unwrap(), value);

    let zero = Value::record([("a", Value::I32(0)), ("b", Value::List(vec![Value::string("x"), Value::string("y")]))]);
    let bytes = schema.encode(r, &zero).unwrap();
    assert_eq!(bytes, vec![0x12, 0x01, b'x', 0x12, 0x01, b'y']);
    assert_eq!(schema.decode(r, &bytes).unwrap(), zero);
}

#[test]
fn two_level_nesting() {
    let catalog = Catalog::new()
        .with(RecordDecl::new("Leaf").field("v", TypeDesc::string()).into_desc())
        .with(RecordDecl::new("Middle").field("leaf", TypeDesc::reference("Leaf")).into_desc())
        .with(RecordDecl::new("Top").field("middle", TypeDesc::reference("Middle")).into_desc());
    let mut generator = SchemaGenerator::new();
    let top = generator.generate_named(&catalog, "Top").unwrap();
    let schema = generator.finish();
    let value = Value::record([(
        "middle",
        Value::record([("leaf", Value::record([("v", Value::string("ok"))]))]),
    )]);
    let bytes = schema.encode(top, &value).unwrap();
    assert_eq!(bytes, vec![0x0A, 0x06, 0x0A, 0x04, 0x0A, 0x02, b'o', b'k']);
    assert_eq!(schema.decode(top, &bytes).unwrap(), value);
}

#[test]
fn schema_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Schema>();

    let (schema, root) = everything();
    let value = from_json(&schema, root, &full_value()).unwrap();
    let expected = schema.encode(root, &value).unwrap();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| assert_eq!(schema.encode(root, &value).unwrap(), expected));
        }
    });
}
