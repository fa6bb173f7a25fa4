// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use core::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::resolver::{self, ResolutionError, Resolved};
use crate::schema::{Accessor, ElementType, MemberType, TypeSchema};
use crate::value::Value;

/// A result type whose members can answer query paths.
///
/// Implementors expose the schema registered for their type and hand out
/// member values on request. `invoke` returning `None` is the null value.
/// Result graphs are read-only once built, so implementors must not change
/// what `invoke` returns between calls.
pub trait Resolvable: fmt::Debug + Send + Sync {
    fn schema(&self) -> &TypeSchema;

    fn invoke(&self, accessor: &Accessor) -> Option<Node>;
}

/// Shared handle to a node of the result graph that supports path resolution.
#[derive(Clone)]
pub struct Composite(Arc<dyn Resolvable>);

impl Composite {
    pub fn new<T: Resolvable + 'static>(value: T) -> Self {
        Composite(Arc::new(value))
    }

    /// JSON object keyed by match key, the same shape as its serialized form.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for accessor in self.schema().matchable() {
            if let Some(key) = accessor.match_key() {
                let value = self
                    .invoke(accessor)
                    .map_or(serde_json::Value::Null, |node| node.to_json());
                object.insert(key.to_string(), value);
            }
        }
        serde_json::Value::Object(object)
    }

    pub fn from_arc(value: Arc<dyn Resolvable>) -> Self {
        Composite(value)
    }

    pub fn schema(&self) -> &TypeSchema {
        self.0.schema()
    }

    pub fn type_name(&self) -> &str {
        self.0.schema().name()
    }

    pub fn invoke(&self, accessor: &Accessor) -> Option<Node> {
        self.0.invoke(accessor)
    }

    /// Resolve a dotted query path against this node.
    pub fn resolve<'p>(&self, path: &'p str) -> Result<Resolved<'p>, ResolutionError> {
        resolver::resolve(self, path)
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Composite) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Composite {
    /// Serializes as an object keyed by the match key of every accessor that
    /// can answer a path, in matching order.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let schema = self.schema();
        let mut map = serializer.serialize_map(None)?;
        for accessor in schema.matchable() {
            if let Some(key) = accessor.match_key() {
                map.serialize_entry(key, &self.invoke(accessor))?;
            }
        }
        map.end()
    }
}

/// A value of the result graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Terminal value. No path may be applied to it.
    Scalar(Value),
    Composite(Composite),
    /// Ordered, possibly empty, sequence of nodes.
    Sequence(Arc<Vec<Node>>),
}

impl Node {
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Value::Null))
    }

    pub fn as_scalar(&self) -> Result<&Value> {
        match self {
            Node::Scalar(v) => Ok(v),
            _ => bail!("not a scalar"),
        }
    }

    pub fn as_composite(&self) -> Result<&Composite> {
        match self {
            Node::Composite(c) => Ok(c),
            _ => bail!("not a composite"),
        }
    }

    pub fn as_sequence(&self) -> Result<&Arc<Vec<Node>>> {
        match self {
            Node::Sequence(s) => Ok(s),
            _ => bail!("not a sequence"),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Scalar(v) => v.to_json(),
            Node::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Node::to_json).collect())
            }
            Node::Composite(c) => c.to_json(),
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Composite(_) => "composite",
            Node::Sequence(_) => "sequence",
        }
    }

    fn conforms_to(&self, member_type: &MemberType) -> bool {
        match (member_type, self) {
            (MemberType::Scalar, Node::Scalar(_)) => true,
            (MemberType::Composite(t), Node::Composite(c)) => t.as_ref() == c.type_name(),
            (MemberType::Sequence(element), Node::Sequence(items)) => {
                items.iter().all(|item| item.conforms_to_element(element))
            }
            _ => false,
        }
    }

    fn conforms_to_element(&self, element: &ElementType) -> bool {
        match (element, self) {
            (ElementType::Unknown, _) => true,
            // Null entries are tolerated in any sequence.
            (_, Node::Scalar(Value::Null)) => true,
            (ElementType::Scalar, Node::Scalar(_)) => true,
            (ElementType::Composite(t), Node::Composite(c)) => t.as_ref() == c.type_name(),
            _ => false,
        }
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Scalar(v) => v.serialize(serializer),
            Node::Composite(c) => c.serialize(serializer),
            Node::Sequence(items) => items.serialize(serializer),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Node {
                fn from(v: $t) -> Self {
                    Node::Scalar(Value::from(v))
                }
            }
        )*
    };
}

impl_from_scalar!(bool, i32, i64, u64, usize, f64, &str, String, Arc<str>);

impl From<Value> for Node {
    fn from(v: Value) -> Self {
        Node::Scalar(v)
    }
}

impl From<Composite> for Node {
    fn from(c: Composite) -> Self {
        Node::Composite(c)
    }
}

impl From<Record> for Node {
    fn from(r: Record) -> Self {
        Node::Composite(Composite::new(r))
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(Arc::new(items))
    }
}

/// Schema-driven result object holding one optional value per member.
///
/// Every member starts out null. Values are checked against the declared
/// member type when they are set.
pub struct Record {
    schema: Arc<TypeSchema>,
    values: Vec<Option<Node>>,
}

impl Record {
    pub fn new(schema: Arc<TypeSchema>) -> Self {
        let values = vec![None; schema.accessors().len()];
        Self { schema, values }
    }

    /// Set the value of the member with the given own name.
    pub fn set(&mut self, member: &str, value: impl Into<Node>) -> Result<&mut Self> {
        let Some(accessor) = self.schema.accessor(member) else {
            bail!(
                "type '{}' has no member '{member}'",
                self.schema.name()
            );
        };
        let value = value.into();
        // Null is accepted for every member and stored as absent.
        if value.is_null() {
            self.values[accessor.index()] = None;
            return Ok(self);
        }
        if !value.conforms_to(accessor.member_type()) {
            bail!(
                "member '{member}' of type '{}' is declared as {:?} but was given a {}",
                self.schema.name(),
                accessor.member_type(),
                value.kind()
            );
        }
        self.values[accessor.index()] = Some(value);
        Ok(self)
    }

    /// Builder-style variant of [`Record::set`].
    pub fn with(mut self, member: &str, value: impl Into<Node>) -> Result<Self> {
        self.set(member, value)?;
        Ok(self)
    }

    pub fn get(&self, member: &str) -> Option<&Node> {
        let accessor = self.schema.accessor(member)?;
        self.values[accessor.index()].as_ref()
    }

    pub fn into_composite(self) -> Composite {
        Composite::new(self)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.name());
        for (accessor, value) in self.schema.accessors().iter().zip(&self.values) {
            if let Some(value) = value {
                s.field(accessor.name(), value);
            }
        }
        s.finish()
    }
}

impl Resolvable for Record {
    fn schema(&self) -> &TypeSchema {
        &self.schema
    }

    fn invoke(&self, accessor: &Accessor) -> Option<Node> {
        // Accessors of another schema carry foreign indices.
        let own = self.schema.accessors().get(accessor.index())?;
        if own.name() != accessor.name() {
            return None;
        }
        self.values[accessor.index()].clone()
    }
}
