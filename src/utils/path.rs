// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query path utilities shared between the engine and schema introspection

use anyhow::{anyhow, bail, Result};

use crate::registry::SchemaRegistry;
use crate::schema::TypeSchema;

/// Split a query path into its segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Check that a query path is non-empty and has no empty segments.
pub fn validate_query_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("query path is empty");
    }
    if let Some(idx) = split_path(path).iter().position(|s| s.trim().is_empty()) {
        bail!("query path '{path}' has an empty segment at position {idx}");
    }
    Ok(())
}

/// List every path that `type_name` can answer, in matching order.
///
/// Composite members and resolvable sequence members are expanded through
/// the registry. Paths longer than `max_depth` segments are not listed, which
/// also bounds recursive types.
pub fn enumerate_paths(
    registry: &SchemaRegistry,
    type_name: &str,
    max_depth: usize,
) -> Result<Vec<String>> {
    let schema = registry
        .get(type_name)
        .ok_or_else(|| anyhow!("type '{type_name}' is not registered"))?;
    let mut paths = vec![];
    collect_paths(registry, &schema, "", 0, max_depth, &mut paths)?;
    Ok(paths)
}

fn collect_paths(
    registry: &SchemaRegistry,
    schema: &TypeSchema,
    prefix: &str,
    depth: usize,
    max_depth: usize,
    paths: &mut Vec<String>,
) -> Result<()> {
    for accessor in schema.matchable() {
        let Some(key) = accessor.match_key() else {
            continue;
        };
        let key_depth = depth + split_path(key).len();
        if key_depth > max_depth {
            continue;
        }
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        paths.push(path.clone());

        if let Some(child) = accessor.member_type().composite_type() {
            let child_schema = registry.get(child).ok_or_else(|| {
                anyhow!(
                    "member '{}' of type '{}' refers to unregistered type '{child}'",
                    accessor.name(),
                    schema.name()
                )
            })?;
            collect_paths(
                registry,
                &child_schema,
                &path,
                key_depth,
                max_depth,
                paths,
            )?;
        }
    }
    Ok(())
}
