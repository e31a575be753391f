//! The packed tree match engine.
//!
//! Templates are inserted into a builder trie keyed by segment kind and
//! literal text, then flattened breadth-first into a contiguous array of
//! [`PackedEntry`] records linked by `first_child` / `next_sibling`
//! indices, with `-1` meaning absence. Matching walks the array
//! recursively, attempting candidate entries with the snapshot/restore
//! protocol wherever the consumed path ends at a node with matches.

use std::sync::Arc;

use routex_core::{RouteResult, RouteValues};

use crate::endpoint::{
    split_path, try_candidate, Matcher, RouteEntry, RouteMatch, RouteSet,
};

/// What a packed node consumes from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Consumes one segment equal (case-insensitively) to `value`.
    Literal,
    /// Consumes any one non-empty segment.
    Parameter,
    /// Consumes the whole remaining residue.
    CatchAll,
}

/// One record of the packed array.
///
/// Siblings form a linked list through `next_sibling`; a parent points at
/// its first child only. `-1` denotes absence in both fields.
pub struct PackedEntry {
    /// How this node consumes the path.
    pub kind: NodeKind,
    /// Index of the first child, or `-1`.
    pub first_child: i32,
    /// Index of the next sibling, or `-1`.
    pub next_sibling: i32,
    /// The literal text; empty for parameter and catch-all nodes.
    pub value: String,
    /// Entries terminating at this node, most specific first.
    pub matches: Vec<Arc<RouteEntry>>,
}

/// The packed tree matcher. Index 0 is the root, which consumes nothing;
/// its matches are the entries that accept the bare `/` path.
pub struct TreeMatcher {
    packed: Vec<PackedEntry>,
}

struct BuilderNode {
    kind: NodeKind,
    value: String,
    children: Vec<BuilderNode>,
    matches: Vec<Arc<RouteEntry>>,
}

impl BuilderNode {
    fn new(kind: NodeKind, value: String) -> Self {
        Self {
            kind,
            value,
            children: Vec::new(),
            matches: Vec::new(),
        }
    }

    fn child_index(&self, kind: NodeKind, value: &str) -> Option<usize> {
        self.children.iter().position(|c| {
            c.kind == kind && (kind != NodeKind::Literal || c.value.eq_ignore_ascii_case(value))
        })
    }
}

/// A segment descriptor used during insertion.
#[derive(Clone, Copy)]
enum SegmentKey<'a> {
    Literal(&'a str),
    Parameter,
    CatchAll,
}

impl TreeMatcher {
    /// Compiles the route set into a packed tree.
    ///
    /// Entries are inserted most specific first, once per permitted
    /// truncation of trailing omissible segments, so a template like
    /// `{controller}/{action}/{id?}` terminates at both depth two and
    /// depth three. A catch-all template additionally terminates at its
    /// parent so it can match an empty residue.
    ///
    /// # Errors
    ///
    /// Propagates [`RouteError::DuplicateRoute`](routex_core::RouteError)
    /// from the route set.
    pub fn build(routes: &RouteSet) -> RouteResult<Self> {
        let sorted = routes.sorted_entries()?;
        let mut root = BuilderNode::new(NodeKind::Literal, String::new());

        for entry in &sorted {
            for keys in insertion_paths(entry) {
                insert(&mut root, &keys, entry);
            }
        }

        Ok(Self {
            packed: flatten(root),
        })
    }

    /// The packed array, for inspection.
    pub fn packed(&self) -> &[PackedEntry] {
        &self.packed
    }

    fn match_node(
        &self,
        index: usize,
        segments: &[&str],
        position: usize,
        path: &str,
        values: &mut RouteValues,
    ) -> Option<Arc<RouteEntry>> {
        let node = &self.packed[index];

        if position == segments.len() {
            for entry in &node.matches {
                if try_candidate(entry, path, values) {
                    return Some(Arc::clone(entry));
                }
            }
            return None;
        }

        let segment = segments[position];
        let mut child = node.first_child;
        while child != -1 {
            let node = &self.packed[child as usize];
            let consumes = match node.kind {
                NodeKind::Literal => node.value.eq_ignore_ascii_case(segment),
                NodeKind::Parameter => !segment.is_empty(),
                NodeKind::CatchAll => true,
            };
            if consumes {
                if node.kind == NodeKind::CatchAll {
                    for entry in &node.matches {
                        if try_candidate(entry, path, values) {
                            return Some(Arc::clone(entry));
                        }
                    }
                } else if let Some(found) =
                    self.match_node(child as usize, segments, position + 1, path, values)
                {
                    return Some(found);
                }
            }
            child = node.next_sibling;
        }
        None
    }
}

impl Matcher for TreeMatcher {
    fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let segments = split_path(path);
        let mut values = RouteValues::new();
        self.match_node(0, &segments, 0, path, &mut values)
            .map(|entry| RouteMatch {
                endpoint: Arc::clone(&entry.endpoint),
                values,
            })
    }
}

/// Expands one entry into the key sequences it terminates under: one per
/// permitted truncation of trailing omissible segments, with the full
/// sequence ending in a catch-all key when the template has one.
fn insertion_paths(entry: &Arc<RouteEntry>) -> Vec<Vec<SegmentKey<'_>>> {
    let template = entry.matcher.template();
    let full: Vec<SegmentKey<'_>> = template
        .segments()
        .iter()
        .map(|segment| {
            if segment.is_catch_all() {
                SegmentKey::CatchAll
            } else {
                match segment.single_parameter() {
                    Some(_) => SegmentKey::Parameter,
                    None if segment.is_simple() => SegmentKey::Literal(
                        segment.parts()[0].text().unwrap_or_default(),
                    ),
                    // Complex segments consume one segment like a
                    // parameter; the per-template matcher rejects them
                    // at candidate time.
                    None => SegmentKey::Parameter,
                }
            }
        })
        .collect();

    let min = entry.matcher.min_required_segments();
    (min..=full.len())
        .map(|length| full[..length].to_vec())
        .collect()
}

fn insert(root: &mut BuilderNode, keys: &[SegmentKey<'_>], entry: &Arc<RouteEntry>) {
    let mut node = root;
    for key in keys {
        let (kind, value) = match key {
            SegmentKey::Literal(text) => (NodeKind::Literal, *text),
            SegmentKey::Parameter => (NodeKind::Parameter, ""),
            SegmentKey::CatchAll => (NodeKind::CatchAll, ""),
        };
        let index = match node.child_index(kind, value) {
            Some(i) => i,
            None => {
                node.children.push(BuilderNode::new(kind, value.to_string()));
                node.children.len() - 1
            }
        };
        node = &mut node.children[index];
    }
    if !node.matches.iter().any(|m| Arc::ptr_eq(m, entry)) {
        node.matches.push(Arc::clone(entry));
    }
}

/// Flattens the builder tree breadth-first. Children of one parent occupy
/// consecutive indices, chained through `next_sibling`.
fn flatten(root: BuilderNode) -> Vec<PackedEntry> {
    let mut order: Vec<BuilderNode> = Vec::new();
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut queue: std::collections::VecDeque<BuilderNode> = std::collections::VecDeque::new();
    let mut enqueued = 1;
    queue.push_back(root);

    while let Some(mut node) = queue.pop_front() {
        let children = std::mem::take(&mut node.children);
        runs.push((enqueued, children.len()));
        enqueued += children.len();
        queue.extend(children);
        order.push(node);
    }

    let mut packed: Vec<PackedEntry> = order
        .into_iter()
        .zip(&runs)
        .map(|(node, &(first, count))| PackedEntry {
            kind: node.kind,
            first_child: if count == 0 { -1 } else { first as i32 },
            next_sibling: -1,
            value: node.value,
            matches: node.matches,
        })
        .collect();

    for &(first, count) in &runs {
        for offset in 0..count {
            let sibling = first + offset + 1;
            packed[first + offset].next_sibling = if offset + 1 < count {
                sibling as i32
            } else {
                -1
            };
        }
    }

    packed
}
