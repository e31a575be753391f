//! The DFA match engine.
//!
//! States are connected by jump tables keyed on literal segment text, with
//! an `exit` edge taken when no literal matches. The build runs two
//! passes over the sorted entries: pass one lays down the literal
//! skeleton (parameter segments descend through a dedicated parameter
//! child), pass two overlays parameter branches onto every literal
//! branch, deep-copying the parameter subtree into literal children
//! created along the way so the two subtrees stay independent.
//!
//! Matching is a single forward scan over the path, one jump-table
//! lookup per segment, followed by candidate evaluation at the final
//! state.

use std::sync::Arc;

use routex_core::{RouteResult, RouteValues};

use crate::endpoint::{try_candidate, Matcher, RouteEntry, RouteMatch, RouteSet};

/// A per-state jump table: literal transitions plus the `exit` fallback.
pub struct JumpTable {
    /// `(segment text, destination state)` pairs.
    pub entries: Vec<(String, usize)>,
    /// Destination when no literal entry matches.
    pub exit: usize,
}

impl JumpTable {
    /// Looks up the destination for one path segment. The first entry of
    /// equal length that compares equal case-insensitively wins;
    /// otherwise the `exit` destination is taken.
    fn lookup(&self, segment: &str) -> usize {
        for (text, destination) in &self.entries {
            if text.len() == segment.len() && text.eq_ignore_ascii_case(segment) {
                return *destination;
            }
        }
        self.exit
    }
}

/// One DFA state.
pub struct State {
    /// `true` when at least one entry terminates here.
    pub is_accepting: bool,
    /// Entries terminating here, most specific first.
    pub matches: Vec<Arc<RouteEntry>>,
    /// Outgoing transitions.
    pub transitions: JumpTable,
}

/// The DFA matcher. State 0 is the start state; the last state is the
/// absorbing sink that never accepts.
pub struct DfaMatcher {
    states: Vec<State>,
}

/// A builder node in the pre-emission tree. `literals` keys are unique
/// case-insensitively; `parameter` is the child any segment descends
/// into, and `catch_all` is the self-looping tail.
#[derive(Default, Clone)]
struct BuilderNode {
    literals: Vec<(String, usize)>,
    parameter: Option<usize>,
    catch_all: Option<usize>,
    matches: Vec<usize>,
}

/// Segment descriptor used while threading a template through the tree.
#[derive(Clone, Copy)]
enum SegmentKey<'a> {
    Literal(&'a str),
    Parameter,
    CatchAll,
}

impl DfaMatcher {
    /// Compiles the route set into a DFA.
    ///
    /// # Errors
    ///
    /// Propagates [`RouteError::DuplicateRoute`](routex_core::RouteError)
    /// from the route set.
    pub fn build(routes: &RouteSet) -> RouteResult<Self> {
        let sorted = routes.sorted_entries()?;

        let mut nodes: Vec<BuilderNode> = vec![BuilderNode::default()];

        // Pass 1: literal skeleton. Every template is threaded once per
        // permitted truncation of trailing omissible segments.
        for (index, entry) in sorted.iter().enumerate() {
            for keys in insertion_paths(entry) {
                let mut current = 0;
                for key in &keys {
                    current = match key {
                        SegmentKey::Literal(text) => literal_child(&mut nodes, current, text),
                        SegmentKey::Parameter => parameter_child(&mut nodes, current),
                        SegmentKey::CatchAll => catch_all_child(&mut nodes, current),
                    };
                }
                attach(&mut nodes, current, index);
            }
        }

        // Pass 2: parameter overlay. Reprocess each template against the
        // whole tree, fanning a parameter segment out over every child of
        // every current parent.
        for (index, entry) in sorted.iter().enumerate() {
            for keys in insertion_paths(entry) {
                let mut parents: Vec<usize> = vec![0];
                for key in &keys {
                    let mut next: Vec<usize> = Vec::new();
                    match key {
                        SegmentKey::Literal(text) => {
                            for &parent in &parents {
                                let existing = find_literal(&nodes, parent, text);
                                let child = match existing {
                                    Some(child) => child,
                                    None => {
                                        let child = literal_child(&mut nodes, parent, text);
                                        if let Some(param) = nodes[parent].parameter {
                                            deep_copy_into(&mut nodes, param, child);
                                        }
                                        child
                                    }
                                };
                                push_unique(&mut next, child);
                            }
                        }
                        SegmentKey::Parameter => {
                            for &parent in &parents {
                                for &(_, child) in &nodes[parent].literals.clone() {
                                    push_unique(&mut next, child);
                                }
                                if let Some(param) = nodes[parent].parameter {
                                    push_unique(&mut next, param);
                                }
                            }
                        }
                        SegmentKey::CatchAll => {
                            for &parent in &parents {
                                let child = catch_all_child(&mut nodes, parent);
                                push_unique(&mut next, child);
                            }
                        }
                    }
                    parents = next;
                }
                for parent in parents {
                    attach(&mut nodes, parent, index);
                }
            }
        }

        // A catch-all stays a live candidate anywhere deeper in its
        // subtree, so a path that lands on a literal state and fails its
        // constraints there can still fall back to it. Propagate each
        // catch-all's entries into every descendant of the owning node.
        let owners: Vec<(usize, Vec<usize>)> = nodes
            .iter()
            .enumerate()
            .filter_map(|(node, n)| n.catch_all.map(|tail| (node, nodes[tail].matches.clone())))
            .collect();
        for (owner, entries) in owners {
            let mut stack: Vec<usize> = children_of(&nodes[owner]);
            while let Some(node) = stack.pop() {
                for &entry in &entries {
                    attach(&mut nodes, node, entry);
                }
                stack.extend(children_of(&nodes[node]));
            }
        }

        Ok(Self {
            states: emit(&nodes, &sorted),
        })
    }

    /// The emitted states, for inspection.
    pub fn states(&self) -> &[State] {
        &self.states
    }
}

impl Matcher for DfaMatcher {
    fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let bytes = path.as_bytes();
        let mut current = 0usize;
        let mut start = usize::from(bytes.first() == Some(&b'/'));

        let mut position = start;
        while position < bytes.len() {
            if bytes[position] == b'/' {
                current = self.states[current].transitions.lookup(&path[start..position]);
                start = position + 1;
            }
            position += 1;
        }
        // Final residue; an empty one (trailing slash) is skipped.
        if start < bytes.len() {
            current = self.states[current].transitions.lookup(&path[start..]);
        }

        let state = &self.states[current];
        let mut values = RouteValues::new();
        for entry in &state.matches {
            if try_candidate(entry, path, &mut values) {
                return Some(RouteMatch {
                    endpoint: Arc::clone(&entry.endpoint),
                    values,
                });
            }
        }
        None
    }
}

fn insertion_paths(entry: &Arc<RouteEntry>) -> Vec<Vec<SegmentKey<'_>>> {
    let template = entry.matcher.template();
    let full: Vec<SegmentKey<'_>> = template
        .segments()
        .iter()
        .map(|segment| {
            if segment.is_catch_all() {
                SegmentKey::CatchAll
            } else if segment.is_simple() && segment.single_parameter().is_none() {
                SegmentKey::Literal(segment.parts()[0].text().unwrap_or_default())
            } else {
                // Parameter or complex; the per-template matcher rejects
                // complex segments at candidate time.
                SegmentKey::Parameter
            }
        })
        .collect();

    let min = entry.matcher.min_required_segments();
    (min..=full.len())
        .map(|length| full[..length].to_vec())
        .collect()
}

fn find_literal(nodes: &[BuilderNode], parent: usize, text: &str) -> Option<usize> {
    nodes[parent]
        .literals
        .iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(text))
        .map(|(_, child)| *child)
}

fn literal_child(nodes: &mut Vec<BuilderNode>, parent: usize, text: &str) -> usize {
    if let Some(child) = find_literal(nodes, parent, text) {
        return child;
    }
    let child = nodes.len();
    nodes.push(BuilderNode::default());
    nodes[parent].literals.push((text.to_string(), child));
    child
}

fn parameter_child(nodes: &mut Vec<BuilderNode>, parent: usize) -> usize {
    if let Some(child) = nodes[parent].parameter {
        return child;
    }
    let child = nodes.len();
    nodes.push(BuilderNode::default());
    nodes[parent].parameter = Some(child);
    child
}

fn catch_all_child(nodes: &mut Vec<BuilderNode>, parent: usize) -> usize {
    if let Some(child) = nodes[parent].catch_all {
        return child;
    }
    let child = nodes.len();
    nodes.push(BuilderNode::default());
    nodes[parent].catch_all = Some(child);
    child
}

fn attach(nodes: &mut [BuilderNode], node: usize, entry: usize) {
    if !nodes[node].matches.contains(&entry) {
        nodes[node].matches.push(entry);
    }
}

fn push_unique(list: &mut Vec<usize>, value: usize) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn children_of(node: &BuilderNode) -> Vec<usize> {
    let mut children: Vec<usize> = node.literals.iter().map(|(_, c)| *c).collect();
    children.extend(node.parameter);
    children.extend(node.catch_all);
    children
}

/// Structurally copies the subtree rooted at `src` into the (freshly
/// created, empty) node `dst`. The copy owns its own children: mutating
/// either subtree afterwards never affects the other.
fn deep_copy_into(nodes: &mut Vec<BuilderNode>, src: usize, dst: usize) {
    nodes[dst].matches = nodes[src].matches.clone();

    let literals = nodes[src].literals.clone();
    for (text, child) in literals {
        let copy = copy_subtree(nodes, child);
        nodes[dst].literals.push((text, copy));
    }
    if let Some(param) = nodes[src].parameter {
        let copy = copy_subtree(nodes, param);
        nodes[dst].parameter = Some(copy);
    }
    if let Some(tail) = nodes[src].catch_all {
        let copy = copy_subtree(nodes, tail);
        nodes[dst].catch_all = Some(copy);
    }
}

fn copy_subtree(nodes: &mut Vec<BuilderNode>, src: usize) -> usize {
    let dst = nodes.len();
    nodes.push(BuilderNode::default());
    deep_copy_into(nodes, src, dst);
    dst
}

/// Emits runtime states from the builder tree. Builder node `i` becomes
/// state `i`; one extra sink state is appended at the end. A catch-all
/// node self-loops through its `exit` so any further segments stay in
/// the accepting state.
fn emit(nodes: &[BuilderNode], sorted: &[Arc<RouteEntry>]) -> Vec<State> {
    let sink = nodes.len();
    let mut states: Vec<State> = Vec::with_capacity(nodes.len() + 1);

    for (index, node) in nodes.iter().enumerate() {
        // Entry indices are positions in the pre-sorted list, so sorting
        // them restores precedence order regardless of attach order.
        let mut indices = node.matches.clone();
        indices.sort_unstable();
        let matches: Vec<Arc<RouteEntry>> =
            indices.iter().map(|&entry| Arc::clone(&sorted[entry])).collect();

        let exit = node
            .parameter
            .or(node.catch_all)
            .unwrap_or(if is_catch_all_node(nodes, index) {
                index
            } else {
                sink
            });

        states.push(State {
            is_accepting: !matches.is_empty(),
            matches,
            transitions: JumpTable {
                entries: node.literals.clone(),
                exit,
            },
        });
    }

    states.push(State {
        is_accepting: false,
        matches: Vec::new(),
        transitions: JumpTable {
            entries: Vec::new(),
            exit: sink,
        },
    });

    states
}

fn is_catch_all_node(nodes: &[BuilderNode], index: usize) -> bool {
    nodes.iter().any(|n| n.catch_all == Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Endpoint, NamedHandler, RouteSet};

    fn routes(templates: &[&str]) -> RouteSet {
        let mut set = RouteSet::new();
        for t in templates {
            set.add(
                t,
                RouteValues::new(),
                Vec::new(),
                Endpoint::new(*t, NamedHandler::new(*t)),
            )
            .unwrap();
        }
        set
    }

    fn winner(matcher: &DfaMatcher, path: &str) -> Option<String> {
        matcher
            .match_path(path)
            .map(|m| m.endpoint.display_name().to_string())
    }

    #[test]
    fn test_literal_wins_over_parameter() {
        let matcher = DfaMatcher::build(&routes(&["{controller}", "home"])).unwrap();
        assert_eq!(winner(&matcher, "/home").as_deref(), Some("home"));
        assert_eq!(winner(&matcher, "/HoMe").as_deref(), Some("home"));
        assert_eq!(winner(&matcher, "/other").as_deref(), Some("{controller}"));
    }

    #[test]
    fn test_overlay_reaches_literal_states() {
        // After the overlay, the state reached through "home" must carry
        // both the literal match and the parameter match as candidates.
        let matcher = DfaMatcher::build(&routes(&["{controller}", "home"])).unwrap();
        let home_state = matcher.states()[0].transitions.lookup("home");
        assert_eq!(matcher.states()[home_state].matches.len(), 2);
    }

    #[test]
    fn test_overlay_extends_literal_branches() {
        // The parameter arm of "{x}/tail" must also be reachable through
        // the literal "lit" laid down by the other template.
        let matcher = DfaMatcher::build(&routes(&["{x}/tail", "lit/other"])).unwrap();
        assert_eq!(winner(&matcher, "/lit/tail").as_deref(), Some("{x}/tail"));
        assert_eq!(winner(&matcher, "/lit/other").as_deref(), Some("lit/other"));
        assert_eq!(winner(&matcher, "/any/tail").as_deref(), Some("{x}/tail"));
        assert_eq!(winner(&matcher, "/any/other"), None);
    }

    #[test]
    fn test_deep_copy_of_parameter_subtree() {
        // Threading "{p}/mid/end" creates the literal "mid" under "lit",
        // which must receive a structural copy of the sibling parameter
        // subtree: "/lit/mid" still matches "lit/{q}".
        let matcher = DfaMatcher::build(&routes(&["lit/{q}", "{p}/mid/end"])).unwrap();
        assert_eq!(winner(&matcher, "/lit/mid").as_deref(), Some("lit/{q}"));
        assert_eq!(
            winner(&matcher, "/lit/mid/end").as_deref(),
            Some("{p}/mid/end")
        );
        assert_eq!(winner(&matcher, "/lit/other").as_deref(), Some("lit/{q}"));
        // The copy is independent: "end" grafted under the copied "mid"
        // does not leak back into the parameter subtree.
        assert_eq!(winner(&matcher, "/lit/x/end"), None);
    }

    #[test]
    fn test_specificity_ladder() {
        let matcher = DfaMatcher::build(&routes(&[
            "{controller}/{action}/{id?}",
            "{controller}/{action}",
            "{controller}",
        ]))
        .unwrap();
        assert_eq!(winner(&matcher, "/Home").as_deref(), Some("{controller}"));
        assert_eq!(
            winner(&matcher, "/Home/Index").as_deref(),
            Some("{controller}/{action}")
        );
        assert_eq!(
            winner(&matcher, "/Home/Index/7").as_deref(),
            Some("{controller}/{action}/{id?}")
        );
    }

    #[test]
    fn test_catch_all_self_loop() {
        let matcher = DfaMatcher::build(&routes(&["files/{*path}"])).unwrap();
        assert!(matcher.match_path("/files").is_some());
        assert!(matcher.match_path("/files/a").is_some());
        let m = matcher.match_path("/files/a/b/c").unwrap();
        assert_eq!(
            m.values.get("path").map(ToString::to_string).as_deref(),
            Some("a/b/c")
        );
    }

    #[test]
    fn test_no_match_lands_in_sink() {
        let matcher = DfaMatcher::build(&routes(&["a/b"])).unwrap();
        assert!(matcher.match_path("/x/y/z/w").is_none());
        assert!(matcher.match_path("/a").is_none());
        assert!(matcher.match_path("/a/b/c").is_none());
    }

    #[test]
    fn test_trailing_slash_skips_empty_residue() {
        let matcher = DfaMatcher::build(&routes(&["simple", "{controller}/{action}"])).unwrap();
        assert!(matcher.match_path("/simple/").is_some());
        assert!(matcher.match_path("/Home/Index/").is_some());
    }

    #[test]
    fn test_constraint_failure_tries_next_candidate() {
        let mut set = RouteSet::new();
        set.add(
            "{id:int}",
            RouteValues::new(),
            Vec::new(),
            Endpoint::new("{id:int}", NamedHandler::new("int")),
        )
        .unwrap();
        set.add(
            "{name}",
            RouteValues::new(),
            Vec::new(),
            Endpoint::new("{name}", NamedHandler::new("any")),
        )
        .unwrap();

        let matcher = DfaMatcher::build(&set).unwrap();
        assert_eq!(winner(&matcher, "/42").as_deref(), Some("int"));
        assert_eq!(winner(&matcher, "/abc").as_deref(), Some("any"));
    }

    #[test]
    fn test_values_from_winning_template() {
        let matcher = DfaMatcher::build(&routes(&["{controller}/{action}"])).unwrap();
        let m = matcher.match_path("/Home/Index").unwrap();
        assert_eq!(m.values.get("controller").unwrap().to_string(), "Home");
        assert_eq!(m.values.get("action").unwrap().to_string(), "Index");
    }

    #[test]
    fn test_empty_path_matches_root_state() {
        let matcher = DfaMatcher::build(&routes(&["", "{controller}"])).unwrap();
        assert_eq!(winner(&matcher, "/").as_deref(), Some(""));
    }
}
