// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::sync::Arc;

use crate::node::Node;
use crate::resolver::{self, ResolutionError, Resolved};

/// Lazy pairing of a sequence member's elements with the path left to resolve.
///
/// Returned for sequence members declared without `iterate`. Nothing is
/// resolved up front: iteration yields the raw elements and the caller
/// decides whether and when to apply [`DeferredResults::remaining`] to each,
/// typically through [`DeferredResults::resolve_next`].
///
/// The element sequence is shared with the result graph, not copied. The
/// iterator cannot be rewound; resolve the original path again to restart.
pub struct DeferredResults<'p> {
    elements: Arc<Vec<Node>>,
    cursor: usize,
    // Path of the frame that deferred and path of the original call, used
    // to wrap element errors.
    path: &'p str,
    origin: &'p str,
    remaining: &'p str,
    // Owning type and member, for diagnostics.
    type_name: Arc<str>,
    member: Arc<str>,
}

impl<'p> DeferredResults<'p> {
    pub(crate) fn new(
        elements: Arc<Vec<Node>>,
        path: &'p str,
        remaining: &'p str,
        type_name: Arc<str>,
        member: Arc<str>,
    ) -> Self {
        Self {
            elements,
            cursor: 0,
            path,
            origin: path,
            remaining,
            type_name,
            member,
        }
    }

    pub(crate) fn with_origin(mut self, origin: &'p str) -> Self {
        self.origin = origin;
        self
    }

    /// Path of the original resolve call that produced these results.
    pub fn origin(&self) -> &'p str {
        self.origin
    }

    /// Path still to be applied to every element.
    pub fn remaining(&self) -> &'p str {
        self.remaining
    }

    /// Number of elements not yet yielded.
    pub fn len(&self) -> usize {
        self.elements.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance one element and resolve the remaining path on it.
    ///
    /// Null elements resolve to [`Resolved::Null`]. Errors are wrapped with
    /// the path that produced these results, so they name the full path of
    /// the original call.
    pub fn resolve_next(&mut self) -> Option<Result<Resolved<'p>, ResolutionError>> {
        let element = self.next()?;
        let (path, origin) = (self.path, self.origin);
        Some(
            resolver::resolve_element(&element, self.remaining, &self.type_name, &self.member)
                .map(|resolved| resolved.with_origin(origin))
                .map_err(|e| {
                    let e = ResolutionError::wrap(path, e);
                    if origin == path {
                        e
                    } else {
                        ResolutionError::wrap(origin, e)
                    }
                }),
        )
    }
}

impl Iterator for DeferredResults<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let element = self.elements.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl ExactSizeIterator for DeferredResults<'_> {}

impl PartialEq for DeferredResults<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.origin == other.origin
            && self.remaining == other.remaining
            && self.cursor == other.cursor
            && (Arc::ptr_eq(&self.elements, &other.elements) || self.elements == other.elements)
    }
}

impl fmt::Debug for DeferredResults<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredResults")
            .field("type_name", &self.type_name)
            .field("member", &self.member)
            .field("origin", &self.origin)
            .field("path", &self.path)
            .field("remaining", &self.remaining)
            .field("pending", &self.len())
            .finish()
    }
}
