//! Prefix tree node.

use crate::params::Params;
use crate::segment::{Segment, WILDCARD_PARAM};

/// Why an insertion was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InsertError {
    /// A value already sits at the target position.
    Occupied,
    /// The parameter position already has a different name.
    ParamName { existing: String, new: String },
}

/// A node in one method's prefix tree.
///
/// A node can carry a value (the route ending here) and children at the
/// same time. Wildcard and catch-all children are always leaves.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// Segment text this node was created for.
    segment: String,

    /// Value registered for the route ending at this node.
    value: Option<T>,

    /// Literal children, sorted by segment for binary search.
    literal_children: Vec<Node<T>>,

    /// Parameter child (at most one per node).
    param_child: Option<Box<Node<T>>>,

    /// Wildcard child (at most one per node).
    wildcard_child: Option<Box<Node<T>>>,

    /// Catch-all children keyed by suffix, in registration order.
    catch_all_children: Vec<Node<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new("")
    }
}

impl<T> Node<T> {
    fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            value: None,
            literal_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
            catch_all_children: Vec::new(),
        }
    }

    /// Creates an empty root node.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Segment text of this node. Parameter nodes hold the parameter name and
    /// catch-all nodes their suffix.
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Value registered at this node, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns `true` if this node has any child.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.literal_children.is_empty()
            || self.param_child.is_some()
            || self.wildcard_child.is_some()
            || !self.catch_all_children.is_empty()
    }

    /// Inserts `value` at the position addressed by `segments`.
    pub(crate) fn insert(&mut self, segments: &[Segment], value: T) -> Result<(), InsertError> {
        let Some((first, rest)) = segments.split_first() else {
            if self.value.is_some() {
                return Err(InsertError::Occupied);
            }
            self.value = Some(value);
            return Ok(());
        };

        match first {
            Segment::Literal(text) => {
                let idx = match self
                    .literal_children
                    .binary_search_by(|c| c.segment.as_str().cmp(text.as_str()))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.literal_children.insert(idx, Node::new(text.clone()));
                        idx
                    }
                };
                self.literal_children[idx].insert(rest, value)
            }
            Segment::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new(name.clone())));
                if child.segment != *name {
                    return Err(InsertError::ParamName {
                        existing: child.segment.clone(),
                        new: name.clone(),
                    });
                }
                child.insert(rest, value)
            }
            Segment::Wildcard => self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Node::new(WILDCARD_PARAM)))
                .insert(rest, value),
            Segment::CatchAll(suffix) => {
                let idx = match self
                    .catch_all_children
                    .iter()
                    .position(|c| c.segment == *suffix)
                {
                    Some(idx) => idx,
                    None => {
                        self.catch_all_children.push(Node::new(suffix.clone()));
                        self.catch_all_children.len() - 1
                    }
                };
                self.catch_all_children[idx].insert(rest, value)
            }
        }
    }

    /// Resolves request segments against the tree below this node.
    #[must_use]
    pub fn resolve(&self, segments: &[&str]) -> Option<(&T, Params)> {
        let mut params = Params::new();
        let last = segments.last().copied().unwrap_or_default();
        let mut node = self;
        let mut idx = 0;

        while let Some(&segment) = segments.get(idx) {
            if let Some(child) = node.find_literal_child(segment) {
                node = child;
                idx += 1;
                continue;
            }

            if let Some(child) = node.find_catch_all_child(last) {
                return child.value.as_ref().map(|v| (v, params));
            }

            if let Some(child) = &node.wildcard_child {
                params.push(WILDCARD_PARAM, segments[idx..].join("/"));
                return child.value.as_ref().map(|v| (v, params));
            }

            if let Some(child) = &node.param_child {
                params.push(child.segment.clone(), segment);
                idx += 1;
                if idx == segments.len() || !child.has_children() {
                    return child.value.as_ref().map(|v| (v, params));
                }
                node = &**child;
                continue;
            }

            return None;
        }

        node.value.as_ref().map(|v| (v, params))
    }

    /// Visits every value in the subtree together with its display path.
    pub(crate) fn for_each<'a>(&'a self, prefix: &str, f: &mut dyn FnMut(String, &'a T)) {
        if let Some(value) = &self.value {
            let path = if prefix.is_empty() { "/" } else { prefix };
            f(path.to_string(), value);
        }
        for child in &self.literal_children {
            child.for_each(&format!("{prefix}/{}", child.segment), f);
        }
        if let Some(child) = &self.param_child {
            child.for_each(&format!("{prefix}/:{}", child.segment), f);
        }
        if let Some(child) = &self.wildcard_child {
            child.for_each(&format!("{prefix}/*"), f);
        }
        for child in &self.catch_all_children {
            let path = if child.segment.is_empty() {
                format!("{prefix}/**")
            } else {
                format!("{prefix}/**.{}", child.segment)
            };
            child.for_each(&path, f);
        }
    }

    fn find_literal_child(&self, segment: &str) -> Option<&Node<T>> {
        self.literal_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.literal_children[i])
    }

    // The extension is whatever follows the last dot; a dotless segment has
    // none and only reaches a bare `**`.
    fn find_catch_all_child(&self, last: &str) -> Option<&Node<T>> {
        let extension = last.rsplit_once('.').map(|(_, ext)| ext);
        self.catch_all_children.iter().find(|c| {
            c.segment.is_empty() || extension.is_some_and(|ext| ext == c.segment)
        })
    }
}
