// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

//! Path resolution over the result graph.
//!
//! [`resolve`] walks a dotted path down from a composite node. At every
//! frame the node's own schema decides what happens to the path: a root
//! alias may name the node itself or be stripped, and the first matching
//! accessor consumes one or more leading segments. The value it returns is
//! then either the answer, a composite to recurse into, or a sequence that
//! is fanned out eagerly or handed back as a [`DeferredResults`].
//!
//! A null value anywhere along the way ends the walk with
//! [`Resolved::Null`]. Every other dead end is a [`ResolutionError`] whose
//! outermost frame names the full path of the original call.

use tracing::{debug, trace};

use crate::deferred::DeferredResults;
use crate::node::{Composite, Node};
use crate::schema::{Accessor, ElementType, RootMatch, TypeSchema};
use crate::value::Value;

pub mod error;

pub use error::{ErrorKind, ResolutionError};

/// Outcome of resolving a path.
#[derive(Debug, PartialEq)]
pub enum Resolved<'p> {
    /// The path was empty or reached a null value.
    Null,
    /// Terminal node: a scalar, a composite or a sequence.
    Node(Node),
    /// Eager fan-out over a sequence member, in element order.
    Collected(Vec<Resolved<'p>>),
    /// Lazy fan-out over a sequence member.
    Deferred(DeferredResults<'p>),
}

impl<'p> Resolved<'p> {
    fn from_node(node: Node) -> Self {
        if node.is_null() {
            Resolved::Null
        } else {
            Resolved::Node(node)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Resolved::Null)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Resolved::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_collected(&self) -> Option<&[Resolved<'p>]> {
        match self {
            Resolved::Collected(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_deferred(self) -> Option<DeferredResults<'p>> {
        match self {
            Resolved::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    /// Record `origin` as the original call path on every deferred result.
    pub(crate) fn with_origin(self, origin: &'p str) -> Self {
        match self {
            Resolved::Deferred(deferred) => Resolved::Deferred(deferred.with_origin(origin)),
            Resolved::Collected(items) => Resolved::Collected(
                items
                    .into_iter()
                    .map(|item| item.with_origin(origin))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Materialize the result as JSON.
    ///
    /// Deferred results are resolved element by element and rendered as an
    /// array, like a collected result.
    pub fn into_json(self) -> Result<serde_json::Value, ResolutionError> {
        Ok(match self {
            Resolved::Null => serde_json::Value::Null,
            Resolved::Node(node) => node.to_json(),
            Resolved::Collected(items) => serde_json::Value::Array(
                items
                    .into_iter()
                    .map(Resolved::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Resolved::Deferred(mut deferred) => {
                let mut items = Vec::with_capacity(deferred.len());
                while let Some(result) = deferred.resolve_next() {
                    items.push(result?.into_json()?);
                }
                serde_json::Value::Array(items)
            }
        })
    }
}

/// Resolve a dotted `path` against `node`.
///
/// An empty path resolves to [`Resolved::Null`].
pub fn resolve<'p>(node: &Composite, path: &'p str) -> Result<Resolved<'p>, ResolutionError> {
    resolve_frame(node, path).map(|resolved| resolved.with_origin(path))
}

fn resolve_frame<'p>(node: &Composite, path: &'p str) -> Result<Resolved<'p>, ResolutionError> {
    if path.is_empty() {
        return Ok(Resolved::Null);
    }

    let schema = node.schema();
    let members_path = match schema.match_root(path) {
        RootMatch::Itself => {
            trace!(type_name = schema.name(), path, "path names the node itself");
            return Ok(Resolved::Node(Node::Composite(node.clone())));
        }
        RootMatch::Members(rest) => rest,
    };

    let Some((accessor, remaining)) = schema.select_accessor(members_path) else {
        return Err(ResolutionError::new(
            path,
            ErrorKind::PathNotFound {
                type_name: schema.name_rc().clone(),
                path: members_path.into(),
            },
        ));
    };
    trace!(
        type_name = schema.name(),
        member = accessor.name(),
        remaining,
        "selected accessor"
    );

    let value = match node.invoke(accessor) {
        Some(value) if !value.is_null() => value,
        _ => return Ok(Resolved::Null),
    };
    if remaining.is_empty() {
        return Ok(Resolved::Node(value));
    }

    match value {
        Node::Composite(child) => {
            resolve_frame(&child, remaining).map_err(|e| ResolutionError::wrap(path, e))
        }
        Node::Sequence(elements) => {
            if !accessor
                .element_type()
                .is_some_and(ElementType::is_resolvable)
            {
                return Err(ResolutionError::new(
                    path,
                    ErrorKind::UnresolvableElementType {
                        type_name: schema.name_rc().clone(),
                        member: accessor.name_rc().clone(),
                    },
                ));
            }
            if accessor.iterate() {
                collect(schema, accessor, &elements, remaining)
                    .map_err(|e| ResolutionError::wrap(path, e))
            } else {
                debug!(
                    type_name = schema.name(),
                    member = accessor.name(),
                    elements = elements.len(),
                    remaining,
                    "deferring sequence resolution"
                );
                Ok(Resolved::Deferred(DeferredResults::new(
                    elements,
                    path,
                    remaining,
                    schema.name_rc().clone(),
                    accessor.name_rc().clone(),
                )))
            }
        }
        Node::Scalar(_) => Err(ResolutionError::new(
            path,
            ErrorKind::NonDescendableValue {
                type_name: schema.name_rc().clone(),
                member: accessor.name_rc().clone(),
                found: value.kind(),
            },
        )),
    }
}

/// Resolve `remaining` on every element and gather the results in order.
fn collect<'p>(
    schema: &TypeSchema,
    accessor: &Accessor,
    elements: &[Node],
    remaining: &'p str,
) -> Result<Resolved<'p>, ResolutionError> {
    let mut collected = Vec::with_capacity(elements.len());
    for element in elements {
        let result = resolve_element(element, remaining, schema.name(), accessor.name())?;
        match result {
            Resolved::Collected(items) if accessor.flatten() => collected.extend(items),
            Resolved::Node(Node::Sequence(items)) if accessor.flatten() => {
                collected.extend(items.iter().cloned().map(Resolved::from_node))
            }
            other => collected.push(other),
        }
    }
    debug!(
        type_name = schema.name(),
        member = accessor.name(),
        elements = elements.len(),
        collected = collected.len(),
        flatten = accessor.flatten(),
        "collected sequence results"
    );
    Ok(Resolved::Collected(collected))
}

/// Resolve `path` on one element of a resolvable sequence.
pub(crate) fn resolve_element<'p>(
    element: &Node,
    path: &'p str,
    type_name: &str,
    member: &str,
) -> Result<Resolved<'p>, ResolutionError> {
    match element {
        Node::Composite(child) => resolve_frame(child, path),
        Node::Scalar(Value::Null) => Ok(Resolved::Null),
        other => Err(ResolutionError::new(
            path,
            ErrorKind::NonDescendableValue {
                type_name: type_name.into(),
                member: member.into(),
                found: other.kind(),
            },
        )),
    }
}
