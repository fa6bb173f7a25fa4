// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use lazy_static::lazy_static;
use resultpath::*;

use super::init_tracing;

lazy_static! {
    static ref CHAIN: TypeSchema = TypeSchema::builder("Chain")
        .field("id", MemberType::Scalar)
        .field("ids", MemberType::Sequence(ElementType::Scalar))
        .build()
        .unwrap();
    static ref EAGER_ENTRY: TypeSchema = entry_schema(MemberDefinition::field(
        "chains",
        MemberType::sequence_of("Chain")
    )
    .iterate());
    static ref FLAT_ENTRY: TypeSchema = entry_schema(
        MemberDefinition::field("chains", MemberType::sequence_of("Chain"))
            .iterate()
            .flatten()
    );
    static ref LAZY_ENTRY: TypeSchema = entry_schema(MemberDefinition::field(
        "chains",
        MemberType::sequence_of("Chain")
    ));
}

fn entry_schema(chains: MemberDefinition) -> TypeSchema {
    TypeSchema::builder("Entry")
        .root_alias("entry")
        .field("title", MemberType::Scalar)
        .field("subunit", MemberType::Composite("Chain".into()))
        .member(chains)
        .build()
        .unwrap()
}

// Hand-written result types that count how often `id` is read.
#[derive(Debug)]
struct Chain {
    id: &'static str,
    ids: Vec<&'static str>,
    id_reads: Arc<AtomicUsize>,
}

impl Resolvable for Chain {
    fn schema(&self) -> &TypeSchema {
        &CHAIN
    }

    fn invoke(&self, accessor: &Accessor) -> Option<Node> {
        match accessor.name() {
            "id" => {
                self.id_reads.fetch_add(1, Ordering::SeqCst);
                Some(Node::from(self.id))
            }
            "ids" => Some(Node::from(
                self.ids.iter().map(|id| Node::from(*id)).collect::<Vec<_>>(),
            )),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    schema: &'static TypeSchema,
    title: Option<&'static str>,
    subunit: Option<Composite>,
    chains: Arc<Vec<Node>>,
}

impl Resolvable for Entry {
    fn schema(&self) -> &TypeSchema {
        self.schema
    }

    fn invoke(&self, accessor: &Accessor) -> Option<Node> {
        match accessor.name() {
            "title" => self.title.map(Node::from),
            "subunit" => self.subunit.clone().map(Node::Composite),
            "chains" => Some(Node::Sequence(self.chains.clone())),
            _ => None,
        }
    }
}

struct Fixture {
    entry: Composite,
    chains: Vec<Composite>,
    id_reads: Arc<AtomicUsize>,
}

fn fixture(schema: &'static TypeSchema) -> Fixture {
    init_tracing();
    let id_reads = Arc::new(AtomicUsize::new(0));
    let chains = vec![
        Composite::new(Chain {
            id: "A",
            ids: vec!["A1", "A2"],
            id_reads: id_reads.clone(),
        }),
        Composite::new(Chain {
            id: "B",
            ids: vec!["B1"],
            id_reads: id_reads.clone(),
        }),
    ];
    let entry = Composite::new(Entry {
        schema,
        title: Some("Hello"),
        subunit: None,
        chains: Arc::new(chains.iter().cloned().map(Node::from).collect()),
    });
    Fixture {
        entry,
        chains,
        id_reads,
    }
}

fn scalars(values: &[&str]) -> Resolved<'static> {
    Resolved::Collected(
        values
            .iter()
            .map(|v| Resolved::Node(Node::from(*v)))
            .collect(),
    )
}

#[test]
fn root_self_reference() -> Result<()> {
    let f = fixture(&EAGER_ENTRY);
    match f.entry.resolve("entry")? {
        Resolved::Node(Node::Composite(c)) => assert!(c.ptr_eq(&f.entry)),
        other => panic!("expected the entry itself, got {other:?}"),
    }
    Ok(())
}

#[test]
fn root_stripped_member_access() -> Result<()> {
    let f = fixture(&EAGER_ENTRY);
    let stripped = f.entry.resolve("entry.title")?;
    assert_eq!(stripped, Resolved::Node(Node::from("Hello")));
    assert_eq!(stripped, f.entry.resolve("title")?);
    Ok(())
}

#[test]
fn empty_path_is_null() -> Result<()> {
    let f = fixture(&EAGER_ENTRY);
    assert!(f.entry.resolve("")?.is_null());
    Ok(())
}

#[test]
fn null_short_circuit() -> Result<()> {
    let f = fixture(&EAGER_ENTRY);
    assert!(f.entry.resolve("subunit.name")?.is_null());
    assert!(f.entry.resolve("entry.subunit")?.is_null());
    Ok(())
}

#[test]
fn eager_fan_out() -> Result<()> {
    let f = fixture(&EAGER_ENTRY);
    assert_eq!(f.entry.resolve("chains.id")?, scalars(&["A", "B"]));
    assert_eq!(f.id_reads.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn eager_fan_out_without_flatten_nests() -> Result<()> {
    let f = fixture(&EAGER_ENTRY);
    assert_eq!(
        f.entry.resolve("chains.ids")?.into_json()?,
        serde_json::json!([["A1", "A2"], ["B1"]])
    );
    Ok(())
}

#[test]
fn eager_fan_out_with_flatten() -> Result<()> {
    let f = fixture(&FLAT_ENTRY);
    assert_eq!(f.entry.resolve("chains.ids")?, scalars(&["A1", "A2", "B1"]));
    // Scalar results are unaffected by flattening.
    assert_eq!(f.entry.resolve("chains.id")?, scalars(&["A", "B"]));
    Ok(())
}

#[test]
fn terminal_sequence_is_returned_as_is() -> Result<()> {
    let f = fixture(&FLAT_ENTRY);
    match f.entry.resolve("entry.chains")? {
        Resolved::Node(Node::Sequence(items)) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0], Node::Composite(f.chains[0].clone()));
        }
        other => panic!("expected the chains sequence, got {other:?}"),
    }
    Ok(())
}

#[test]
fn lazy_deferral() -> Result<()> {
    let f = fixture(&LAZY_ENTRY);
    let mut deferred = f
        .entry
        .resolve("chains.id")?
        .into_deferred()
        .expect("deferred results");

    assert_eq!(deferred.remaining(), "id");
    assert_eq!(deferred.len(), 2);

    let first = deferred.next().expect("first chain");
    assert_eq!(first, Node::Composite(f.chains[0].clone()));
    let second = deferred.next().expect("second chain");
    assert_eq!(second, Node::Composite(f.chains[1].clone()));
    assert!(deferred.next().is_none());

    // Nothing was resolved on the elements.
    assert_eq!(f.id_reads.load(Ordering::SeqCst), 0);

    // The caller drives resolution of the remaining path.
    let id = first.as_composite()?.resolve(deferred.remaining())?;
    assert_eq!(id, Resolved::Node(Node::from("A")));
    assert_eq!(f.id_reads.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn deferred_resolve_next() -> Result<()> {
    let f = fixture(&LAZY_ENTRY);
    let mut deferred = f
        .entry
        .resolve("entry.chains.id")?
        .into_deferred()
        .expect("deferred results");

    assert_eq!(
        deferred.resolve_next().transpose()?,
        Some(Resolved::Node(Node::from("A")))
    );
    assert_eq!(deferred.len(), 1);
    assert_eq!(
        deferred.resolve_next().transpose()?,
        Some(Resolved::Node(Node::from("B")))
    );
    assert!(deferred.resolve_next().is_none());
    assert!(deferred.is_empty());
    Ok(())
}

#[test]
fn deferred_error_names_full_path() -> Result<()> {
    let f = fixture(&LAZY_ENTRY);
    let mut deferred = f
        .entry
        .resolve("entry.chains.bogus")?
        .into_deferred()
        .expect("deferred results");
    assert_eq!(deferred.origin(), "entry.chains.bogus");

    let err = deferred.resolve_next().expect("first chain").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error retrieving result for query path 'entry.chains.bogus'"
    );
    assert_eq!(
        err.trail().collect::<Vec<_>>(),
        vec!["entry.chains.bogus", "bogus"]
    );
    assert!(matches!(
        err.kind(),
        ErrorKind::PathNotFound { type_name, path }
            if type_name.as_ref() == "Chain" && path.as_ref() == "bogus"
    ));

    let err = f.entry.resolve("chains.bogus")?.into_json().unwrap_err();
    assert_eq!(err.path(), "chains.bogus");
    assert_eq!(err.failed_at(), "bogus");
    Ok(())
}

#[test]
fn deferred_into_json() -> Result<()> {
    let f = fixture(&LAZY_ENTRY);
    assert_eq!(
        f.entry.resolve("chains.ids")?.into_json()?,
        serde_json::json!([["A1", "A2"], ["B1"]])
    );
    Ok(())
}

#[test]
fn unresolvable_path_reports_full_path() {
    let f = fixture(&EAGER_ENTRY);
    let err = f.entry.resolve("chains.bogus").unwrap_err();
    assert!(err.to_string().contains("chains.bogus"));
    assert_eq!(
        err.to_string(),
        "Error retrieving result for query path 'chains.bogus'"
    );
    assert_eq!(err.failed_at(), "bogus");
    assert!(matches!(
        err.kind(),
        ErrorKind::PathNotFound { type_name, path }
            if type_name.as_ref() == "Chain" && path.as_ref() == "bogus"
    ));
}

#[test]
fn nested_error_trail() {
    let mut f = fixture(&EAGER_ENTRY);
    f.entry = Composite::new(Entry {
        schema: &EAGER_ENTRY,
        title: None,
        subunit: Some(f.chains[0].clone()),
        chains: Arc::new(vec![]),
    });

    let err = f.entry.resolve("entry.subunit.bogus").unwrap_err();
    assert_eq!(
        err.trail().collect::<Vec<_>>(),
        vec!["entry.subunit.bogus", "bogus"]
    );

    let err = f.entry.resolve("entry.bogus").unwrap_err();
    assert_eq!(err.path(), "entry.bogus");
    assert!(err.cause().is_none());
    assert!(matches!(
        err.kind(),
        ErrorKind::PathNotFound { path, .. } if path.as_ref() == "bogus"
    ));
}

#[test]
fn non_descendable_scalar() {
    let f = fixture(&EAGER_ENTRY);
    let err = f.entry.resolve("title.length").unwrap_err();
    assert_eq!(err.path(), "title.length");
    assert!(matches!(
        err.kind(),
        ErrorKind::NonDescendableValue { found: "scalar", .. }
    ));
}

#[test]
fn unresolvable_element_type() {
    let f = fixture(&EAGER_ENTRY);
    let err = f.entry.resolve("chains.ids.value").unwrap_err();
    assert_eq!(
        err.trail().collect::<Vec<_>>(),
        vec!["chains.ids.value", "ids.value"]
    );
    assert!(matches!(
        err.kind(),
        ErrorKind::UnresolvableElementType { member, .. } if member.as_ref() == "ids"
    ));
}

#[test]
fn idempotence() -> Result<()> {
    for schema in [&*EAGER_ENTRY, &*FLAT_ENTRY, &*LAZY_ENTRY] {
        let f = fixture(schema);
        for path in ["entry", "title", "chains.id", "chains.ids", "subunit.id", ""] {
            assert_eq!(f.entry.resolve(path)?, f.entry.resolve(path)?, "{path}");
        }
        assert_eq!(
            f.entry.resolve("chains.bogus").and_then(Resolved::into_json),
            f.entry.resolve("chains.bogus").and_then(Resolved::into_json)
        );
    }
    Ok(())
}

#[test]
fn concurrent_resolution() {
    let f = fixture(&FLAT_ENTRY);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let entry = f.entry.clone();
                s.spawn(move || entry.resolve("chains.ids").map(|r| r.into_json()))
            })
            .collect();
        for handle in handles {
            let json = handle.join().unwrap().unwrap().unwrap();
            assert_eq!(json, serde_json::json!(["A1", "A2", "B1"]));
        }
    });
}
