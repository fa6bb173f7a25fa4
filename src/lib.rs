// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod deferred;
mod engine;
mod node;
pub mod registry;
pub mod resolver;
pub mod schema;
mod utils;
mod value;

pub use deferred::DeferredResults;
pub use engine::{Engine, QueryResult, QueryResults};
pub use node::{Composite, Node, Record, Resolvable};
pub use registry::{RegistryError, SchemaRegistry};
pub use resolver::{resolve, ErrorKind, ResolutionError, Resolved};
pub use schema::{
    Accessor, AccessorKind, ElementType, MemberDefinition, MemberType, SchemaError,
    TypeDefinition, TypeSchema,
};
pub use utils::path::{enumerate_paths, split_path, validate_query_path};
pub use value::Value;
