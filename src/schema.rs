// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

//! Per-type accessor metadata.
//!
//! A [`TypeSchema`] tells the resolver which member of a result type answers
//! which path segment. It is built once per type, either programmatically
//! through [`TypeSchema::builder`] or from a type definition document:
//!
//! ```json
//! {
//!   "name": "Entry",
//!   "rootAliases": ["entry"],
//!   "members": [
//!     { "name": "rcsbId", "kind": "method", "alias": "rcsb_id" },
//!     { "name": "title", "serializedName": "struct_title" },
//!     {
//!       "name": "polymerEntities",
//!       "serializedName": "polymer_entities",
//!       "type": { "sequence": { "composite": "PolymerEntity" } },
//!       "iterate": true,
//!       "flatten": true
//!     }
//!   ]
//! }
//! ```
//!
//! Declaration order is the order members appear in the definition. Methods
//! are matched before fields, and only a method's alias makes it matchable.
//! Sibling match keys that overlap are rejected at build time so that the
//! order never decides which member answers a path.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod error;

pub use error::SchemaError;

type String = Arc<str>;


/// How a member is exposed by its result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessorKind {
    /// Computed accessor. Only matchable through an explicit alias.
    Method,
    /// Stored member, matched by alias, serialized name or own name.
    #[default]
    Field,
}

/// Static type of the elements of a sequence member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    Scalar,
    Composite(String),
    /// The element type could not be determined when the schema was built.
    Unknown,
}

impl ElementType {
    /// Whether a path may be applied to the elements.
    pub fn is_resolvable(&self) -> bool {
        matches!(self, ElementType::Composite(_))
    }
}

/// Static type of a member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberType {
    #[default]
    Scalar,
    Composite(String),
    Sequence(ElementType),
}

impl MemberType {
    pub fn sequence_of(type_name: impl Into<String>) -> Self {
        MemberType::Sequence(ElementType::Composite(type_name.into()))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, MemberType::Sequence(_))
    }

    /// Name of the composite type reachable through this member, if any.
    pub fn composite_type(&self) -> Option<&str> {
        match self {
            MemberType::Composite(t) | MemberType::Sequence(ElementType::Composite(t)) => {
                Some(t.as_ref())
            }
            _ => None,
        }
    }
}

/// Declarative form of a member, as found in type definition documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemberDefinition {
    pub name: String,
    #[serde(default)]
    pub kind: AccessorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized_name: Option<String>,
    #[serde(rename = "type", default)]
    pub member_type: MemberType,
    #[serde(default)]
    pub iterate: bool,
    #[serde(default)]
    pub flatten: bool,
}

impl MemberDefinition {
    pub fn field(name: impl Into<String>, member_type: MemberType) -> Self {
        Self {
            name: name.into(),
            kind: AccessorKind::Field,
            alias: None,
            serialized_name: None,
            member_type,
            iterate: false,
            flatten: false,
        }
    }

    pub fn method(name: impl Into<String>, member_type: MemberType) -> Self {
        Self {
            kind: AccessorKind::Method,
            ..Self::field(name, member_type)
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn serialized_name(mut self, name: impl Into<String>) -> Self {
        self.serialized_name = Some(name.into());
        self
    }

    pub fn iterate(mut self) -> Self {
        self.iterate = true;
        self
    }

    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }
}

/// Declarative form of a type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_aliases: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberDefinition>,
}

/// Describes how one declared member answers a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    index: usize,
    name: String,
    alias: Option<String>,
    serialized_name: Option<String>,
    kind: AccessorKind,
    member_type: MemberType,
    iterate: bool,
    flatten: bool,
}

impl Accessor {
    /// Position of the member in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> &String {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn serialized_name(&self) -> Option<&str> {
        self.serialized_name.as_deref()
    }

    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    pub fn member_type(&self) -> &MemberType {
        &self.member_type
    }

    /// Element type, for sequence members only.
    pub fn element_type(&self) -> Option<&ElementType> {
        match &self.member_type {
            MemberType::Sequence(element) => Some(element),
            _ => None,
        }
    }

    pub fn iterate(&self) -> bool {
        self.iterate
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }

    /// The string matched against path segments.
    ///
    /// Fields use alias, then serialized name, then their own name. Methods
    /// are only reachable through an alias.
    pub fn match_key(&self) -> Option<&str> {
        match self.kind {
            AccessorKind::Method => self.alias.as_deref(),
            AccessorKind::Field => Some(
                self.alias
                    .as_deref()
                    .or(self.serialized_name.as_deref())
                    .unwrap_or(&self.name),
            ),
        }
    }

    /// Matches `path` against this accessor and returns the remaining path.
    pub fn match_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        self.match_key().and_then(|key| strip_key(path, key))
    }

    fn definition(&self) -> MemberDefinition {
        MemberDefinition {
            name: self.name.clone(),
            kind: self.kind,
            alias: self.alias.clone(),
            serialized_name: self.serialized_name.clone(),
            member_type: self.member_type.clone(),
            iterate: self.iterate,
            flatten: self.flatten,
        }
    }
}

/// Outcome of matching a path against a type's root aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMatch<'p> {
    /// The path names the node itself.
    Itself,
    /// Continue with member matching on this path, which has any root alias
    /// prefix removed.
    Members(&'p str),
}

/// Ordered accessor metadata and root aliases of one result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    name: String,
    root_aliases: Vec<String>,
    accessors: Vec<Accessor>,
}

impl TypeSchema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            definition: TypeDefinition {
                name: name.into(),
                root_aliases: Vec::new(),
                members: Vec::new(),
            },
        }
    }

    /// Parse a type definition document.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let definition: TypeDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition)
    }

    /// Validate a definition and build the schema from it.
    pub fn from_definition(definition: TypeDefinition) -> Result<Self, SchemaError> {
        let TypeDefinition {
            name,
            root_aliases,
            members,
        } = definition;

        validate_name(&name, &name)?;

        for (idx, alias) in root_aliases.iter().enumerate() {
            validate_name(&name, alias)?;
            if root_aliases[..idx].contains(alias) {
                return Err(SchemaError::DuplicateRootAlias {
                    type_name: name.clone(),
                    alias: alias.clone(),
                });
            }
        }

        let mut accessors: Vec<Accessor> = Vec::with_capacity(members.len());
        for (index, member) in members.into_iter().enumerate() {
            validate_member(&name, &member)?;
            if accessors.iter().any(|a| a.name == member.name) {
                return Err(SchemaError::DuplicateMember {
                    type_name: name.clone(),
                    member: member.name.clone(),
                });
            }

            if member.kind == AccessorKind::Method && member.alias.is_none() {
                tracing::warn!(
                    type_name = %name,
                    member = %member.name,
                    "method has no alias and will never answer a path"
                );
            }

            accessors.push(Accessor {
                index,
                name: member.name,
                alias: member.alias,
                serialized_name: member.serialized_name,
                kind: member.kind,
                member_type: member.member_type,
                iterate: member.iterate,
                flatten: member.flatten,
            });
        }

        let keys: Vec<&str> = accessors.iter().filter_map(Accessor::match_key).collect();
        for (idx, first) in keys.iter().enumerate() {
            if let Some(second) = keys[idx + 1..].iter().find(|k| keys_overlap(first, k)) {
                return Err(SchemaError::OverlappingMatchKeys {
                    type_name: name.clone(),
                    first: (*first).into(),
                    second: (*second).into(),
                });
            }
        }

        tracing::debug!(
            type_name = %name,
            members = accessors.len(),
            root_aliases = root_aliases.len(),
            "built type schema"
        );

        Ok(TypeSchema {
            name,
            root_aliases,
            accessors,
        })
    }

    /// Declarative form of this schema.
    pub fn definition(&self) -> TypeDefinition {
        TypeDefinition {
            name: self.name.clone(),
            root_aliases: self.root_aliases.clone(),
            members: self.accessors.iter().map(Accessor::definition).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> &String {
        &self.name
    }

    pub fn root_aliases(&self) -> &[String] {
        &self.root_aliases
    }

    /// All accessors in declaration order.
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// Look up an accessor by the member's own name.
    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors.iter().find(|a| a.name.as_ref() == name)
    }

    /// Accessors that can answer a path, methods first.
    pub fn matchable(&self) -> impl Iterator<Item = &Accessor> + '_ {
        let methods = self
            .accessors
            .iter()
            .filter(|a| a.kind == AccessorKind::Method);
        let fields = self
            .accessors
            .iter()
            .filter(|a| a.kind == AccessorKind::Field);
        methods.chain(fields).filter(|a| a.match_key().is_some())
    }

    /// Match `path` against the root aliases, first declared alias wins.
    pub fn match_root<'p>(&self, path: &'p str) -> RootMatch<'p> {
        for alias in &self.root_aliases {
            match strip_key(path, alias) {
                Some("") => return RootMatch::Itself,
                Some(rest) => return RootMatch::Members(rest),
                None => (),
            }
        }
        RootMatch::Members(path)
    }

    /// Find the accessor answering `path` and the path left after its key.
    pub fn select_accessor<'p>(&self, path: &'p str) -> Option<(&Accessor, &'p str)> {
        self.matchable()
            .find_map(|accessor| accessor.match_path(path).map(|rest| (accessor, rest)))
    }
}

/// Programmatic construction of a [`TypeSchema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    definition: TypeDefinition,
}

impl SchemaBuilder {
    pub fn root_alias(mut self, alias: impl Into<String>) -> Self {
        self.definition.root_aliases.push(alias.into());
        self
    }

    pub fn member(mut self, member: MemberDefinition) -> Self {
        self.definition.members.push(member);
        self
    }

    pub fn field(self, name: impl Into<String>, member_type: MemberType) -> Self {
        self.member(MemberDefinition::field(name, member_type))
    }

    pub fn method(
        self,
        name: impl Into<String>,
        alias: impl Into<String>,
        member_type: MemberType,
    ) -> Self {
        self.member(MemberDefinition::method(name, member_type).alias(alias))
    }

    pub fn build(self) -> Result<TypeSchema, SchemaError> {
        TypeSchema::from_definition(self.definition)
    }
}

/// Returns the remainder of `path` if it equals `key` or starts with `key.`.
fn strip_key<'p>(path: &'p str, key: &str) -> Option<&'p str> {
    if path == key {
        return Some("");
    }
    path.strip_prefix(key)?
        .strip_prefix('.')
        .filter(|rest| !rest.is_empty())
}

fn keys_overlap(a: &str, b: &str) -> bool {
    strip_key(a, b).is_some() || strip_key(b, a).is_some()
}

fn validate_name(type_name: &String, name: &str) -> Result<(), SchemaError> {
    if name.trim().is_empty() {
        Err(SchemaError::InvalidName {
            type_name: type_name.clone(),
            name: name.into(),
        })
    } else {
        Ok(())
    }
}

fn validate_member(type_name: &String, member: &MemberDefinition) -> Result<(), SchemaError> {
    validate_name(type_name, &member.name)?;
    if let Some(alias) = &member.alias {
        validate_name(type_name, alias)?;
    }
    if let Some(serialized_name) = &member.serialized_name {
        validate_name(type_name, serialized_name)?;
    }
    if let Some(composite) = member.member_type.composite_type() {
        validate_name(type_name, composite)?;
    }

    let not_a_sequence = |flag| SchemaError::NotASequence {
        type_name: type_name.clone(),
        member: member.name.clone(),
        flag,
    };
    if !member.member_type.is_sequence() {
        if member.iterate {
            return Err(not_a_sequence("iterate"));
        }
        if member.flatten {
            return Err(not_a_sequence("flatten"));
        }
    }
    if member.flatten && !member.iterate {
        return Err(SchemaError::FlattenWithoutIterate {
            type_name: type_name.clone(),
            member: member.name.clone(),
        });
    }
    Ok(())
}
