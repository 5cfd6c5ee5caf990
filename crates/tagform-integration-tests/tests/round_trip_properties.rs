//! # Round-Trip Properties
//!
//! Property-based sweep: for arbitrary field values, including through the
//! JSON text projection, `load(dump(x)) == x` and repeated dumps are
//! byte-identical.

use proptest::prelude::*;

use tagform_schema::fields::{Boolean, Integer, ListOf, Optional, Text};
use tagform_schema::{Attribute, Record, SchemaBuilder, SchemaRegistry};

#[derive(Debug, Clone, PartialEq)]
struct Payload {
    label: String,
    count: i64,
    enabled: bool,
    comment: Option<String>,
    tags: Vec<String>,
}

impl Record for Payload {
    const NAME: &'static str = "payload";

    fn attributes() -> &'static [Attribute] {
        const ATTRS: &[Attribute] = &[
            Attribute::required("label"),
            Attribute::required("count"),
            Attribute::required("enabled"),
            Attribute::required("comment"),
            Attribute::required("tags"),
        ];
        ATTRS
    }
}

fn build_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    SchemaBuilder::<Payload>::new("payload")
        .version(1)
        .field("label", Text, |p| &p.label)
        .field("count", Integer, |p| &p.count)
        .field("enabled", Boolean, |p| &p.enabled)
        .field("comment", Optional::new(Text), |p| &p.comment)
        .field("tags", ListOf::new(Text), |p| &p.tags)
        .construct(|fields| {
            Ok(Payload {
                label: fields.take("label")?,
                count: fields.take("count")?,
                enabled: fields.take("enabled")?,
                comment: fields.take("comment")?,
                tags: fields.take("tags")?,
            })
        })
        .register(&registry)
        .expect("payload schema");
    registry
}

fn payload_strategy() -> impl Strategy<Value = Payload> {
    (
        ".*",
        any::<i64>(),
        any::<bool>(),
        proptest::option::of(".*"),
        proptest::collection::vec(".*", 0..4),
    )
        .prop_map(|(label, count, enabled, comment, tags)| Payload {
            label,
            count,
            enabled,
            comment,
            tags,
        })
}

proptest! {
    #[test]
    fn load_of_dump_is_identity(payload in payload_strategy()) {
        let registry = build_registry();
        let document = registry.dump(&payload).unwrap();
        let restored: Payload = registry.load(&document).unwrap();
        prop_assert_eq!(restored, payload);
    }

    #[test]
    fn identity_holds_through_json_text(payload in payload_strategy()) {
        let registry = build_registry();
        let text = registry.dump_json(&payload).unwrap();
        let restored: Payload = registry.load_json(&text).unwrap();
        prop_assert_eq!(restored, payload);
    }

    #[test]
    fn dumps_are_deterministic(payload in payload_strategy()) {
        let registry = build_registry();
        let first = registry.dump_json(&payload).unwrap();
        let second = registry.dump_json(&payload).unwrap();
        prop_assert_eq!(first, second);
    }
}
