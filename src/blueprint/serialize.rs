// Selective recursive serialization of instances
//
// Serialization projects an instance's current field values into a plain
// nested map suitable for downstream encoding. The instance's
// should_serialize hook is consulted first, then every included field is
// emitted in declaration order, recursing into nested records. The walk
// never mutates the instance and never fails on null optional values.

use crate::blueprint::field::DataType;
use crate::blueprint::instance::Instance;
use crate::blueprint::value::Value;

impl Instance {
    /// Whether this instance takes part in serialization. Shapes install
    /// the hook at build time; the default is true.
    pub fn should_serialize(&self) -> bool {
        self.shape().serialize_allowed(self)
    }

    /// Serializes every declared field, injected identifier and
    /// timestamp included.
    pub fn serialize(&self) -> Value {
        self.serialize_selected(&[])
    }

    /// Serializes only the listed fields; an empty list means all.
    ///
    /// Nested single-valued records are included only when their own
    /// hook passes, otherwise the key is omitted entirely. Nested multi
    /// records serialize item by item; a vetoing item contributes an
    /// empty map. Scalar lists are copied by value.
    pub fn serialize_selected(&self, selected_fields: &[&str]) -> Value {
        let mut serialized: Vec<(String, Value)> = Vec::new();
        if !self.should_serialize() {
            return Value::Map(serialized);
        }
        let shape = self.shape();
        for field in shape.fields() {
            if !selected_fields.is_empty() && !selected_fields.contains(&field.name()) {
                continue;
            }
            let value = self.resolved_value(field);
            match field.data_type() {
                DataType::Shape(_) if field.multi() => {
                    let children = match value {
                        Value::List(children) => children,
                        _ => Vec::new(),
                    };
                    let maps = children
                        .into_iter()
                        .map(|child| match child {
                            Value::Record(record) => record.serialize(),
                            other => other,
                        })
                        .collect();
                    serialized.push((field.name().to_string(), Value::List(maps)));
                }
                DataType::Shape(_) => match value {
                    Value::Record(record) => {
                        if record.should_serialize() {
                            serialized.push((field.name().to_string(), record.serialize()));
                        }
                    }
                    // a null nested record is emitted as-is
                    other => serialized.push((field.name().to_string(), other)),
                },
                DataType::Scalar(_) => {
                    serialized.push((field.name().to_string(), value));
                }
            }
        }
        Value::Map(serialized)
    }
}
