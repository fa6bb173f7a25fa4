// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

//! Schema registration boundary.
//!
//! Result types register their [`TypeSchema`] once, by name. The resolver
//! itself never consults the registry (every composite carries its own
//! schema); the registry exists so that definitions can be loaded from
//! documents, cross-checked, and introspected with [`crate::enumerate_paths`].

use core::fmt;
use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use serde::Deserialize;

use crate::schema::{TypeDefinition, TypeSchema};

type String = Arc<str>;

/// Errors that can occur when interacting with a Registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyExists {
        name: String,
        registry: String,
    },
    InvalidName {
        name: String,
        registry: String,
    },
    UnknownType {
        type_name: String,
        member: String,
        referenced: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyExists { name, registry } => {
                write!(
                    f,
                    "{} registration failed: An item with the name '{name}' is already registered.",
                    registry
                )
            }
            RegistryError::InvalidName { name, registry } => {
                write!(f, "{} registration failed: The name '{name}' is invalid (empty or whitespace-only names are not allowed).", registry)
            }
            RegistryError::UnknownType {
                type_name,
                member,
                referenced,
            } => {
                write!(
                    f,
                    "Member '{member}' of type '{type_name}' refers to unregistered type '{referenced}'."
                )
            }
        }
    }
}

impl core::error::Error for RegistryError {}

/// Validates that a name is not empty or whitespace-only.
pub fn validate_name(name: &str, registry_name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        Err(RegistryError::InvalidName {
            name: String::from(name),
            registry: String::from(registry_name),
        })
    } else {
        Ok(())
    }
}

/// Generic thread-safe registry for items of type T using DashMap.
#[derive(Clone)]
pub struct Registry<T> {
    inner: DashMap<String, Arc<T>>,
    name: String,
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("items", &self.list_names())
            .finish()
    }
}

impl<T> Registry<T> {
    /// Create a new, empty registry with a given name.
    pub fn new(registry_name: impl Into<String>) -> Self {
        Self {
            inner: DashMap::new(),
            name: registry_name.into(),
        }
    }

    /// Get the name of this registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an item with a given name. Returns Err if name already exists.
    pub fn register(&self, name: impl Into<String>, item: Arc<T>) -> Result<(), RegistryError> {
        let name = name.into();
        validate_name(&name, &self.name)?;

        use dashmap::mapref::entry::Entry;
        match self.inner.entry(name.clone()) {
            Entry::Occupied(e) => Err(RegistryError::AlreadyExists {
                name: e.key().clone(),
                registry: self.name.clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(item);
                Ok(())
            }
        }
    }

    /// Try to register an item, but don't fail if the name already exists.
    /// Returns Ok(true) if the item was registered, Ok(false) if the name already exists.
    pub fn try_register(
        &self,
        name: impl Into<String>,
        item: Arc<T>,
    ) -> Result<bool, RegistryError> {
        match self.register(name, item) {
            Ok(()) => Ok(true),
            Err(RegistryError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Retrieve an item by name, if it exists.
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.inner.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove an item by name. Returns the removed item if it existed.
    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.inner.remove(name).map(|(_, v)| v)
    }

    /// List all registered item names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Check if an item with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Get the number of registered items.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clear all items from the registry.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

/// Registry of result type schemas, keyed by type name.
pub type SchemaRegistry = Registry<TypeSchema>;

#[derive(Deserialize)]
#[serde(untagged)]
enum Definitions {
    One(TypeDefinition),
    Many(Vec<TypeDefinition>),
}

impl Registry<TypeSchema> {
    /// Register a schema under its own type name.
    pub fn register_schema(&self, schema: TypeSchema) -> Result<Arc<TypeSchema>, RegistryError> {
        let schema = Arc::new(schema);
        self.register(schema.name(), schema.clone())?;
        Ok(schema)
    }

    /// Load one definition or an array of definitions and register them.
    ///
    /// Nothing is registered if any definition fails to build or any name
    /// is already taken, in the registry or within the document.
    pub fn register_json(&self, json: &str) -> Result<Vec<Arc<TypeSchema>>> {
        let definitions = match serde_json::from_str(json)? {
            Definitions::One(definition) => vec![definition],
            Definitions::Many(definitions) => definitions,
        };

        let schemas = definitions
            .into_iter()
            .map(TypeSchema::from_definition)
            .collect::<Result<Vec<_>, _>>()?;

        for (idx, schema) in schemas.iter().enumerate() {
            if self.contains(schema.name())
                || schemas[..idx].iter().any(|s| s.name() == schema.name())
            {
                return Err(RegistryError::AlreadyExists {
                    name: schema.name_rc().clone(),
                    registry: self.name.clone(),
                }
                .into());
            }
        }

        let mut registered: Vec<Arc<TypeSchema>> = Vec::with_capacity(schemas.len());
        for schema in schemas {
            match self.register_schema(schema) {
                Ok(schema) => registered.push(schema),
                Err(e) => {
                    // Lost a race with a concurrent registration; undo this batch.
                    for schema in &registered {
                        self.remove(schema.name());
                    }
                    return Err(e.into());
                }
            }
        }
        tracing::debug!(
            registry = %self.name,
            count = registered.len(),
            "registered type definitions"
        );
        Ok(registered)
    }

    /// Verify that every composite type referenced by a member is registered.
    pub fn check_references(&self) -> Result<(), RegistryError> {
        for name in self.list_names() {
            let Some(schema) = self.get(&name) else {
                continue;
            };
            for accessor in schema.accessors() {
                if let Some(referenced) = accessor.member_type().composite_type() {
                    if !self.contains(referenced) {
                        return Err(RegistryError::UnknownType {
                            type_name: name.clone(),
                            member: accessor.name().into(),
                            referenced: referenced.into(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Global registry instances
pub mod instances {
    use super::*;

    lazy_static::lazy_static! {
        /// Global singleton instance of the result type schema registry.
        pub static ref SCHEMA_REGISTRY: SchemaRegistry = Registry::new("SCHEMA_REGISTRY");
    }
}

/// Helper functions for the global schema registry.
pub mod schemas {
    use super::*;
    use instances::*;

    /// Register a schema under its type name.
    pub fn register(schema: TypeSchema) -> Result<Arc<TypeSchema>, RegistryError> {
        SCHEMA_REGISTRY.register_schema(schema)
    }

    /// Load type definitions from a JSON document.
    pub fn register_json(json: &str) -> Result<Vec<Arc<TypeSchema>>> {
        SCHEMA_REGISTRY.register_json(json)
    }

    /// Retrieve a schema by type name.
    pub fn get(name: &str) -> Option<Arc<TypeSchema>> {
        SCHEMA_REGISTRY.get(name)
    }

    /// Remove a schema by type name.
    pub fn remove(name: &str) -> Option<Arc<TypeSchema>> {
        SCHEMA_REGISTRY.remove(name)
    }

    /// List all registered type names.
    pub fn list_names() -> Vec<String> {
        SCHEMA_REGISTRY.list_names()
    }

    /// Check if a schema with the given type name exists.
    pub fn contains(name: &str) -> bool {
        SCHEMA_REGISTRY.contains(name)
    }

    /// Clear all schemas from the registry.
    pub fn clear() {
        SCHEMA_REGISTRY.clear();
    }
}
