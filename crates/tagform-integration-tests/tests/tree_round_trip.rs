//! # End-to-End Tree Round Trip
//!
//! Builds the canonical mixed hierarchy — groups nesting groups, typed leaf
//! lists, and a polymorphic sequence holding both — and verifies the whole
//! tree survives dump → JSON text → load, with every element restored to its
//! original concrete type.

use tagform_schema::fields::{ListOf, Nested, Text};
use tagform_schema::{
    Attribute, Candidate, DynRecord, PolyList, Record, SchemaBuilder, SchemaRegistry,
};

#[derive(Debug, Clone, PartialEq)]
struct Leaf {
    name: String,
}

impl Default for Leaf {
    fn default() -> Self {
        Self {
            name: "<unnamed leaf>".into(),
        }
    }
}

impl Record for Leaf {
    const NAME: &'static str = "leaf";

    fn attributes() -> &'static [Attribute] {
        const ATTRS: &[Attribute] = &[Attribute::defaulted("name")];
        ATTRS
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Group {
    name: String,
    groups: Vec<Group>,
    leaves: Vec<Leaf>,
    mixed: Vec<Box<dyn DynRecord>>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            name: "<unnamed group>".into(),
            groups: Vec::new(),
            leaves: Vec::new(),
            mixed: Vec::new(),
        }
    }
}

impl Record for Group {
    const NAME: &'static str = "group";

    fn attributes() -> &'static [Attribute] {
        const ATTRS: &[Attribute] = &[
            Attribute::defaulted("name"),
            Attribute::defaulted("groups"),
            Attribute::defaulted("leaves"),
            Attribute::defaulted("mixed"),
        ];
        ATTRS
    }
}

/// Register both schemas. Group goes first on purpose: its nested and
/// polymorphic bindings reference `leaf` before that schema exists, and its
/// own name before registration completes — both resolve lazily.
fn build_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();

    SchemaBuilder::<Group>::new("group")
        .version("2")
        .field("name", Text, |g| &g.name)
        .field("groups", ListOf::new(Nested::<Group>::new()), |g| &g.groups)
        .field("leaves", ListOf::new(Nested::<Leaf>::new()), |g| &g.leaves)
        .field(
            "mixed",
            PolyList::new([Candidate::named("group"), Candidate::named("leaf")]),
            |g| &g.mixed,
        )
        .construct(|fields| {
            Ok(Group {
                name: fields.take("name")?,
                groups: fields.take("groups")?,
                leaves: fields.take("leaves")?,
                mixed: fields.take("mixed")?,
            })
        })
        .register(&registry)
        .expect("group schema");

    SchemaBuilder::<Leaf>::new("leaf")
        .version("2")
        .field("name", Text, |l| &l.name)
        .construct(|fields| {
            Ok(Leaf {
                name: fields.take("name")?,
            })
        })
        .register(&registry)
        .expect("leaf schema");

    registry
}

fn sample_tree() -> Group {
    let mut subgroup = Group {
        name: "subgroup".into(),
        ..Default::default()
    };
    subgroup.leaves.push(Leaf {
        name: "subgroup leaf".into(),
    });

    let mut group = Group::default();
    group.groups.push(subgroup);
    group.leaves.push(Leaf::default());
    group.mixed.push(Box::new(Leaf {
        name: "mixed list leaf".into(),
    }));
    group.mixed.push(Box::new(Group {
        name: "mixed list group".into(),
        ..Default::default()
    }));
    group
}

#[test]
fn whole_tree_survives_json_round_trip() {
    let registry = build_registry();
    let original = sample_tree();

    let text = registry.dump_json(&original).expect("dump");
    let restored: Group = registry.load_json(&text).expect("load");

    assert_eq!(restored, original);
}

#[test]
fn mixed_elements_restore_concrete_types() {
    let registry = build_registry();

    let document = registry.dump(&sample_tree()).unwrap();
    let restored: Group = registry.load(&document).unwrap();

    assert!(restored.mixed[0].as_any().downcast_ref::<Leaf>().is_some());
    assert!(restored.mixed[1].as_any().downcast_ref::<Group>().is_some());
}

#[test]
fn nesting_round_trips_two_levels_deep() {
    let registry = build_registry();

    let inner = Group {
        name: "inner".into(),
        ..Default::default()
    };
    let middle = Group {
        name: "middle".into(),
        groups: vec![inner],
        ..Default::default()
    };
    let outer = Group {
        name: "outer".into(),
        groups: vec![middle],
        ..Default::default()
    };

    let document = registry.dump(&outer).unwrap();
    let restored: Group = registry.load(&document).unwrap();
    assert_eq!(restored, outer);
    assert_eq!(restored.groups[0].groups[0].name, "inner");
}

#[test]
fn self_reference_works_in_the_polymorphic_sequence() {
    let registry = build_registry();

    let mut group = Group::default();
    group.mixed.push(Box::new(Group {
        name: "nested via tag".into(),
        ..Default::default()
    }));

    let document = registry.dump(&group).unwrap();
    let restored: Group = registry.load(&document).unwrap();
    assert_eq!(restored, group);
}

#[test]
fn freeze_succeeds_once_all_references_exist() {
    let registry = build_registry();
    registry.freeze().expect("all references resolvable");

    // A frozen registry still serves the round trip.
    let original = sample_tree();
    let document = registry.dump(&original).unwrap();
    let restored: Group = registry.load(&document).unwrap();
    assert_eq!(restored, original);
}
