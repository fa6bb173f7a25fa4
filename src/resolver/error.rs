// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use thiserror::Error;

type String = Arc<str>;

/// Root cause of a failed resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// No accessor of the type answers the path.
    #[error("type '{type_name}' has no member answering '{path}'")]
    PathNotFound { type_name: String, path: String },
    /// Path remains but the member's value cannot be descended into.
    #[error("member '{member}' of type '{type_name}' holds a {found} value that cannot be descended into")]
    NonDescendableValue {
        type_name: String,
        member: String,
        found: &'static str,
    },
    /// The member is a sequence whose elements are not resolvable.
    #[error("elements of member '{member}' of type '{type_name}' are not resolvable")]
    UnresolvableElementType { type_name: String, member: String },
}

/// Error raised by path resolution.
///
/// Each recursive frame wraps the error raised below it with the path that
/// frame was asked to resolve, so the outermost error carries the full path
/// of the original call while the innermost carries the failing fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error retrieving result for query path '{path}'")]
pub struct ResolutionError {
    path: String,
    kind: ErrorKind,
    #[source]
    cause: Option<Box<ResolutionError>>,
}

impl ResolutionError {
    pub fn new(path: &str, kind: ErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
            cause: None,
        }
    }

    /// Wrap an error raised while resolving a sub-path of `path`.
    pub fn wrap(path: &str, cause: ResolutionError) -> Self {
        Self {
            path: path.into(),
            kind: cause.kind.clone(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Path this frame was asked to resolve. On the outermost error this is
    /// the path of the original call.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Root cause, shared by every frame of the chain.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn cause(&self) -> Option<&ResolutionError> {
        self.cause.as_deref()
    }

    /// Paths of every frame, outermost first.
    pub fn trail(&self) -> impl Iterator<Item = &str> + '_ {
        core::iter::successors(Some(self), |e| e.cause()).map(ResolutionError::path)
    }

    /// Path fragment at which resolution failed.
    pub fn failed_at(&self) -> &str {
        self.trail().last().unwrap_or(&self.path)
    }
}
