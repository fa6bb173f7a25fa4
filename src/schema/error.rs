// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

type String = Arc<str>;

/// Errors raised while registering a type schema.
///
/// Every problem that would make path matching depend on an accident of
/// declaration order is reported here instead of at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A type, member, alias or root alias name is empty or whitespace-only.
    #[error("Type '{type_name}': the name '{name}' is invalid (empty or whitespace-only names are not allowed)")]
    InvalidName { type_name: String, name: String },
    /// The same root alias is declared twice.
    #[error("Type '{type_name}': root alias '{alias}' is declared more than once")]
    DuplicateRootAlias { type_name: String, alias: String },
    /// Two members share the same own name.
    #[error("Type '{type_name}': member '{member}' is declared more than once")]
    DuplicateMember { type_name: String, member: String },
    /// Two sibling match keys are equal, or one is a dotted prefix of the other.
    #[error("Type '{type_name}': match keys '{first}' and '{second}' overlap")]
    OverlappingMatchKeys {
        type_name: String,
        first: String,
        second: String,
    },
    /// `iterate` or `flatten` is set on a member that is not a sequence.
    #[error("Type '{type_name}': member '{member}' sets `{flag}` but is not a sequence")]
    NotASequence {
        type_name: String,
        member: String,
        flag: &'static str,
    },
    /// `flatten` only applies to eagerly iterated members.
    #[error("Type '{type_name}': member '{member}' sets `flatten` without `iterate`")]
    FlattenWithoutIterate { type_name: String, member: String },
    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParseError(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(error: serde_json::Error) -> Self {
        SchemaError::JsonParseError(format!("{}", error).into())
    }
}
