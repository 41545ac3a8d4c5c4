use std::sync::Arc;

use tabula::blueprint::{
    FieldDecl, Instance, ScalarType, Shape, ShapeParser, Value, ID_FIELD, TS_FIELD,
};
use tabula::internal::error::Error;

fn text_shape() -> Arc<Shape> {
    Shape::builder("TestShape")
        .field(
            "field",
            FieldDecl::scalar(ScalarType::Str)
                .verbose_name("Field Name")
                .default(Value::from("")),
        )
        .id_template("{_ts}")
        .build()
        .unwrap()
}

fn multi_int_shape() -> Arc<Shape> {
    Shape::builder("TestShapeMulti")
        .field(
            "field",
            FieldDecl::scalar(ScalarType::Int)
                .verbose_name("Field Name")
                .multi(true),
        )
        .id_template("{_ts}")
        .build()
        .unwrap()
}

/// Tests field binding and basic get/set through the accessor layer.
#[test]
fn test_field_operation() {
    let shape = text_shape();
    let field = shape.field("field").unwrap();
    assert_eq!(field.name(), "field", "error set field name");
    assert_eq!(field.internal_name(), "field__field", "error internal name");
    assert_eq!(field.fullname(), "testshape.field", "error set fullname");
    assert_eq!(field.verbose_name(), Some("Field Name"));

    let instance = Instance::create_empty(&shape).unwrap();
    assert_eq!(
        instance.get("field").unwrap(),
        Value::from(""),
        "default value not works"
    );

    instance.set("field", Value::from("hello")).unwrap();
    assert_eq!(
        instance.get("field").unwrap(),
        Value::from("hello"),
        "assignment not works"
    );

    Instance::create(&shape, Value::map([("field", Value::from("hello"))])).unwrap();
}

/// Tests that a shared mutable default is never aliased across instances.
#[test]
fn test_mutable_default_is_copied_per_instance() {
    let shape = multi_int_shape();
    let instance_1 = Instance::create_empty(&shape).unwrap();
    let instance_2 = Instance::create_empty(&shape).unwrap();
    assert_eq!(
        instance_1.get("field").unwrap(),
        Value::List(Vec::new()),
        "default value not works"
    );
    assert_eq!(
        instance_1.get("field").unwrap(),
        instance_2.get("field").unwrap(),
        "default value should be equal"
    );

    // mutating one instance must never leak into the other
    instance_1
        .set("field", Value::list([Value::Int(9)]))
        .unwrap();
    assert_eq!(
        instance_2.get("field").unwrap(),
        Value::List(Vec::new()),
        "should have two different value copies"
    );

    let shared_default = Value::list([Value::Int(1), Value::Int(1), Value::Int(1)]);
    let with_values = Shape::builder("TestShapeMutableWithValues")
        .field(
            "field",
            FieldDecl::scalar(ScalarType::Int)
                .default(shared_default.clone())
                .multi(true),
        )
        .id_template("{_ts}")
        .build()
        .unwrap();
    let instance_3 = Instance::create_empty(&with_values).unwrap();
    let instance_4 = Instance::create_empty(&with_values).unwrap();
    assert_eq!(instance_3.get("field").unwrap(), shared_default);
    instance_3
        .set("field", Value::list([Value::Int(2)]))
        .unwrap();
    assert_eq!(
        instance_4.get("field").unwrap(),
        shared_default,
        "should not refer to the same value"
    );
}

/// Tests that a multi field with no declared default presents an empty list.
#[test]
fn test_multi_sets_default_automatically() {
    let shape = Shape::builder("TestShapeMultiNoDefault")
        .field(
            "field",
            FieldDecl::scalar(ScalarType::Str).multi(true),
        )
        .id_template("{_ts}")
        .build()
        .unwrap();
    let instance = Instance::create_empty(&shape).unwrap();
    assert_eq!(
        instance.get("field").unwrap(),
        Value::List(Vec::new()),
        "multi should imply default value []"
    );
}

/// Tests the assignment protections: composition is never implicit, scalars
/// cast per element, cardinality is enforced both ways.
#[test]
fn test_assignment_protect() {
    let nested_shape = multi_int_shape();
    let outer = Shape::builder("TestShapeNested")
        .field(
            "field",
            FieldDecl::shape(&nested_shape).required(false),
        )
        .id_template("{_ts}")
        .build()
        .unwrap();
    let instance = Instance::create_empty(&outer).unwrap();

    // a raw int cannot become a nested record
    assert!(matches!(
        instance.set("field", Value::from(100)),
        Err(Error::CompositionTypeMismatch(_))
    ));
    // neither can a raw string, no matter how it looks
    assert!(matches!(
        instance.set("field", Value::from("hello")),
        Err(Error::CompositionTypeMismatch(_))
    ));
    // a record of the declared shape is accepted
    let record = Instance::create_empty(&nested_shape).unwrap();
    instance.set("field", Value::Record(record)).unwrap();
    // a record of a different shape is not
    let other = Instance::create_empty(&text_shape()).unwrap();
    assert!(matches!(
        instance.set("field", Value::Record(other)),
        Err(Error::CompositionTypeMismatch(_))
    ));

    // int can be cast to str
    let text = Instance::create_empty(&text_shape()).unwrap();
    text.set("field", Value::from(100)).unwrap();
    text.set("field", Value::from("hello")).unwrap();

    // per-element casting for a multi int field
    let multi = Instance::create_empty(&multi_int_shape()).unwrap();
    assert!(matches!(
        multi.set(
            "field",
            Value::list([Value::from(100), Value::from("hello")])
        ),
        Err(Error::CastFailure(_))
    ));
    multi
        .set(
            "field",
            Value::list([Value::from("100"), Value::from(200), Value::from(300)]),
        )
        .unwrap();
    assert_eq!(
        multi.get("field").unwrap(),
        Value::list([Value::Int(100), Value::Int(200), Value::Int(300)])
    );

    // construction applies the same implicit scalar cast
    let casted = Instance::create(
        &text_shape(),
        Value::map([("field", Value::from(100))]),
    )
    .unwrap();
    assert_eq!(casted.get("field").unwrap(), Value::from("100"), "init failed");

    // the timestamp is stored as an integer
    assert!(matches!(casted.get(TS_FIELD).unwrap(), Value::Int(_)));

    // assignment casts, so 9.776 becomes 9
    casted.set(TS_FIELD, Value::from(9.776)).unwrap();
    assert_eq!(
        casted.get(TS_FIELD).unwrap(),
        Value::Int(9),
        "value type cast error"
    );

    // 9.776 casts from float to str
    casted.set("field", Value::from(9.776)).unwrap();

    // '9.776' does not cast from string to int
    assert!(matches!(
        casted.set(TS_FIELD, Value::from("9.776")),
        Err(Error::CastFailure(_))
    ));
}

/// Tests identifier generation against the shape's template.
#[test]
fn test_id_generation() {
    let instance = Instance::create_empty(&text_shape()).unwrap();
    assert!(instance.is_new());
    let ts = match instance.get(TS_FIELD).unwrap() {
        Value::Int(ts) => ts,
        other => panic!("expected an int timestamp, got {:?}", other),
    };
    assert_eq!(instance.get(ID_FIELD).unwrap(), Value::Str(ts.to_string()));
}

/// Tests that a supplied identifier suppresses generation.
#[test]
fn test_supplied_id_is_kept() {
    let instance = Instance::create(
        &text_shape(),
        Value::map([(ID_FIELD, Value::from("record-1"))]),
    )
    .unwrap();
    assert!(!instance.is_new());
    assert_eq!(instance.get(ID_FIELD).unwrap(), Value::from("record-1"));
}

/// Tests that a new instance without a template fails, while a supplied
/// identifier avoids generation entirely.
#[test]
fn test_missing_id_template() {
    let shape = Shape::builder("NoTemplate")
        .field(
            "field",
            FieldDecl::scalar(ScalarType::Str).required(false),
        )
        .build()
        .unwrap();
    assert!(matches!(
        Instance::create_empty(&shape),
        Err(Error::MissingIdTemplate(_))
    ));
    Instance::create(&shape, Value::map([(ID_FIELD, Value::from("x"))])).unwrap();
}

/// Tests the required-field check on construction.
#[test]
fn test_required_field() {
    let shape = Shape::builder("TestShapeRequired")
        .field("field", FieldDecl::scalar(ScalarType::Str))
        .id_template("{_ts}")
        .build()
        .unwrap();
    assert!(matches!(
        Instance::create_empty(&shape),
        Err(Error::RequiredFieldMissing(_))
    ));
    Instance::create(&shape, Value::map([("field", Value::from("set"))])).unwrap();
}

/// Tests that serialization reproduces the input augmented with generated
/// fields and is stable across repeated calls.
#[test]
fn test_serialize_round_trip() {
    let instance = Instance::create(
        &text_shape(),
        Value::map([("field", Value::from("hello"))]),
    )
    .unwrap();
    let serialized = instance.serialize();
    assert_eq!(serialized.entry("field"), Some(&Value::from("hello")));
    assert_eq!(serialized.entry(ID_FIELD), Some(&instance.get(ID_FIELD).unwrap()));
    assert_eq!(serialized.entry(TS_FIELD), Some(&instance.get(TS_FIELD).unwrap()));
    assert_eq!(serialized, instance.serialize(), "serialize should be stable");
}

/// Tests selective serialization limits the output to the listed fields.
#[test]
fn test_serialize_selected_fields() {
    let instance = Instance::create(
        &text_shape(),
        Value::map([("field", Value::from("hello"))]),
    )
    .unwrap();
    let serialized = instance.serialize_selected(&["field"]);
    assert_eq!(
        serialized,
        Value::map([("field", Value::from("hello"))])
    );
}

/// Tests nested construction from raw maps, parent wiring and two-level
/// serialization.
#[test]
fn test_nested_composition_and_serialization() {
    let author = Shape::builder("Author")
        .field("handle", FieldDecl::scalar(ScalarType::Str))
        .id_template("{handle}")
        .build()
        .unwrap();
    let post = Shape::builder("Post")
        .field("body", FieldDecl::scalar(ScalarType::Str))
        .field("author", FieldDecl::shape(&author))
        .field(
            "replies",
            FieldDecl::shape(&author).multi(true).required(false),
        )
        .id_template("{_ts}")
        .build()
        .unwrap();

    let instance = Instance::create(
        &post,
        Value::map([
            ("body", Value::from("hi")),
            ("author", Value::map([("handle", Value::from("ada"))])),
            (
                "replies",
                Value::list([
                    Value::map([("handle", Value::from("brian"))]),
                    Value::map([("handle", Value::from("grace"))]),
                ]),
            ),
        ]),
    )
    .unwrap();

    let nested = match instance.get("author").unwrap() {
        Value::Record(nested) => nested,
        other => panic!("expected a record, got {:?}", other),
    };
    assert_eq!(nested.parent(), Some(instance.clone()));
    assert_eq!(nested.get(ID_FIELD).unwrap(), Value::from("ada"));

    let serialized = instance.serialize();
    let author_map = serialized.entry("author").unwrap();
    assert_eq!(author_map.entry("handle"), Some(&Value::from("ada")));
    match serialized.entry("replies").unwrap() {
        Value::List(replies) => {
            assert_eq!(replies.len(), 2);
            assert_eq!(replies[0].entry("handle"), Some(&Value::from("brian")));
        }
        other => panic!("expected a list of maps, got {:?}", other),
    }
}

/// Tests that a nested record vetoing its own hook is omitted from the
/// owning record's serialization.
#[test]
fn test_nested_serialize_hook_veto() {
    let hidden = Shape::builder("Hidden")
        .field(
            "secret",
            FieldDecl::scalar(ScalarType::Str).required(false),
        )
        .id_template("{_ts}")
        .should_serialize(|_| false)
        .build()
        .unwrap();
    let outer = Shape::builder("Outer")
        .field("child", FieldDecl::shape(&hidden))
        .id_template("{_ts}")
        .build()
        .unwrap();

    let instance = Instance::create(
        &outer,
        Value::map([("child", Value::empty_map())]),
    )
    .unwrap();
    let serialized = instance.serialize();
    assert_eq!(serialized.entry("child"), None, "vetoed child should be absent");
    assert!(serialized.entry(ID_FIELD).is_some());

    let child = match instance.get("child").unwrap() {
        Value::Record(child) => child,
        other => panic!("expected a record, got {:?}", other),
    };
    assert!(!child.should_serialize());
    assert_eq!(child.serialize(), Value::empty_map());
}

/// Tests that a literal record default hands every instance the same
/// shared record, while explicit nested init data builds fresh ones.
#[test]
fn test_nested_record_default_is_shared() {
    let nested_shape = multi_int_shape();
    let default_record = Instance::create_empty(&nested_shape).unwrap();
    let outer = Shape::builder("TestShapeNestedDefault")
        .field(
            "field",
            FieldDecl::shape(&nested_shape).default(Value::Record(default_record.clone())),
        )
        .id_template("{_ts}")
        .build()
        .unwrap();

    let instance_1 = Instance::create_empty(&outer).unwrap();
    let instance_2 = Instance::create_empty(&outer).unwrap();
    let child_1 = match instance_1.get("field").unwrap() {
        Value::Record(child) => child,
        other => panic!("expected a record, got {:?}", other),
    };
    let child_2 = match instance_2.get("field").unwrap() {
        Value::Record(child) => child,
        other => panic!("expected a record, got {:?}", other),
    };
    assert_eq!(child_1, child_2, "literal default should share one record");
    assert_eq!(child_1, default_record);

    // explicit init data still constructs a fresh nested record
    let explicit = Instance::create(
        &outer,
        Value::map([("field", Value::empty_map())]),
    )
    .unwrap();
    let child_3 = match explicit.get("field").unwrap() {
        Value::Record(child) => child,
        other => panic!("expected a record, got {:?}", other),
    };
    assert_ne!(child_3, default_record);
    assert_eq!(child_3.parent(), Some(explicit.clone()));
}

/// Tests that a JSON-declared shape behaves like a builder-declared one,
/// including raw JSON construction and JSON output.
#[test]
fn test_json_declaration_parity() {
    let mut parser = ShapeParser::new();
    let shape = parser
        .parse_shape_str(
            r#"{
                "name": "Message",
                "metadata": {"id_template": "{_ts}"},
                "fields": [
                    {"name": "text", "type": "string", "default": ""},
                    {"name": "tags", "type": "string", "multi": true}
                ]
            }"#,
        )
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(r#"{"text": "hello", "tags": ["a", "b"]}"#).unwrap();
    let instance = Instance::create_from_json(&shape, &raw).unwrap();
    assert_eq!(instance.get("text").unwrap(), Value::from("hello"));
    assert_eq!(
        instance.get("tags").unwrap(),
        Value::list([Value::from("a"), Value::from("b")])
    );

    let json = instance.serialize().to_json();
    assert_eq!(json["text"], serde_json::json!("hello"));
    assert_eq!(json["tags"], serde_json::json!(["a", "b"]));
    assert_eq!(json[ID_FIELD], instance.get(ID_FIELD).unwrap().to_json());
}
