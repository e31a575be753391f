//! The instruction match engine.
//!
//! A baseline/benchmark counterpart to the DFA: the same candidate
//! selection expressed as a flat sequence of opcodes interpreted against a
//! pre-tokenised path. The builder lowers a tree of `Sequence` / `Branch` /
//! `Parameter` / `Accept` nodes into `Accept`, `Branch`, and `Jump`
//! instructions; `Pop` exists only during lowering as a placeholder that
//! block closure rewrites into a `Jump` past the block.
//!
//! Accepts are arranged least specific first, so the last accept that
//! fires on a path is the most specific candidate. Earlier fired accepts
//! are kept as fallbacks for constraint failures, which keeps this engine
//! in lockstep with the tree and DFA engines.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use routex_core::{RouteResult, RouteValues};

use crate::endpoint::{try_candidate, Matcher, RouteEntry, RouteMatch, RouteSet};

/// Instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Record the entry at `payload` as the current result.
    Accept,
    /// Consult the jump table at `payload` for the segment at `depth`.
    Branch,
    /// Set the program counter to `payload`.
    Jump,
    /// Build-time placeholder; rewritten to `Jump` when a branch block
    /// closes. Never present in a finished program.
    Pop,
}

/// One instruction of the flat program.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    /// The opcode.
    pub code: OpCode,
    /// The segment depth this instruction concerns.
    pub depth: u8,
    /// Opcode-specific operand: entry index, table index, or target PC.
    pub payload: u32,
}

/// A branch's jump table. The table knows its own depth and computes the
/// segment bounds from the tokenised offset array.
pub struct BranchTable {
    /// The segment index this table switches on.
    pub depth: u8,
    /// `(segment text, block start PC)` pairs.
    pub entries: Vec<(String, u32)>,
    /// PC to jump to when no literal matches or the path is exhausted.
    pub exit: u32,
}

impl BranchTable {
    fn lookup(&self, segment: &str) -> u32 {
        for (text, target) in &self.entries {
            if text.len() == segment.len() && text.eq_ignore_ascii_case(segment) {
                return *target;
            }
        }
        self.exit
    }
}

/// How many slash offsets are tokenised on the stack before spilling to
/// the heap.
const INLINE_SEGMENTS: usize = 32;

type SegmentSpans = SmallVec<[(u32, u32); INLINE_SEGMENTS]>;

/// The instruction matcher.
pub struct ProgramMatcher {
    instructions: Vec<Instruction>,
    tables: Vec<BranchTable>,
    entries: Vec<Arc<RouteEntry>>,
}

/// An accept registered at a trie node. Whether the accept is exact or
/// at-least-depth (catch-all) is read off the entry's template at run
/// time.
#[derive(Clone, Copy, PartialEq, Eq)]
struct AcceptSpec {
    entry: usize,
    depth: u8,
}

#[derive(Default)]
struct TrieNode {
    literals: Vec<(String, TrieNode)>,
    parameter: Option<Box<TrieNode>>,
    accepts: Vec<AcceptSpec>,
}

/// The typed builder tree the trie is converted into before lowering.
enum ProgramNode {
    Sequence(Vec<ProgramNode>),
    Branch {
        depth: u8,
        literals: Vec<(String, ProgramNode)>,
    },
    Parameter(Vec<ProgramNode>),
    Accept(AcceptSpec),
}

impl ProgramMatcher {
    /// Compiles the route set into an instruction stream.
    ///
    /// # Errors
    ///
    /// Propagates [`RouteError::DuplicateRoute`](routex_core::RouteError)
    /// from the route set.
    pub fn build(routes: &RouteSet) -> RouteResult<Self> {
        let sorted = routes.sorted_entries()?;

        // One tree per entry order. Higher orders are lowered first, so
        // the accepts of a lower (higher-priority) order land later in
        // the stream and overwrite.
        let mut groups: Vec<(i32, Vec<usize>)> = Vec::new();
        for (index, entry) in sorted.iter().enumerate() {
            match groups.last_mut() {
                Some((order, indices)) if *order == entry.order => indices.push(index),
                _ => groups.push((entry.order, vec![index])),
            }
        }

        let mut instructions = Vec::new();
        let mut tables = Vec::new();
        for (_, indices) in groups.iter().rev() {
            let mut root = TrieNode::default();
            for &index in indices {
                insert_entry(&mut root, &sorted[index], index);
            }
            let tree = convert(&root, 0);
            lower(&tree, &mut instructions, &mut tables);
        }

        Ok(Self {
            instructions,
            tables,
            entries: sorted,
        })
    }

    /// The finished instruction stream, for inspection.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The jump tables, for inspection.
    pub fn tables(&self) -> &[BranchTable] {
        &self.tables
    }

    fn tokenize(path: &str) -> SegmentSpans {
        let bytes = path.as_bytes();
        let mut spans = SegmentSpans::new();
        let mut start = usize::from(bytes.first() == Some(&b'/'));
        let mut position = start;
        while position < bytes.len() {
            if bytes[position] == b'/' {
                spans.push((start as u32, position as u32));
                start = position + 1;
            }
            position += 1;
        }
        // The residue after the last slash; empty (trailing slash) is
        // dropped.
        if start < bytes.len() {
            spans.push((start as u32, bytes.len() as u32));
        }
        if spans.spilled() {
            debug!(
                segments = spans.len(),
                "path tokenizer spilled to the heap"
            );
        }
        spans
    }
}

impl Matcher for ProgramMatcher {
    fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let spans = Self::tokenize(path);
        let segment_count = spans.len();

        let mut fired: SmallVec<[u32; 8]> = SmallVec::new();
        let mut pc = 0usize;
        while pc < self.instructions.len() {
            let instruction = self.instructions[pc];
            match instruction.code {
                OpCode::Accept => {
                    let entry = &self.entries[instruction.payload as usize];
                    let depth = instruction.depth as usize;
                    let accepts = if entry.matcher.template().has_catch_all() {
                        segment_count >= depth
                    } else {
                        segment_count == depth
                    };
                    if accepts {
                        fired.push(instruction.payload);
                    }
                    pc += 1;
                }
                OpCode::Branch => {
                    let table = &self.tables[instruction.payload as usize];
                    let depth = table.depth as usize;
                    pc = if depth < segment_count {
                        let (from, to) = spans[depth];
                        table.lookup(&path[from as usize..to as usize]) as usize
                    } else {
                        table.exit as usize
                    };
                }
                OpCode::Jump => {
                    pc = instruction.payload as usize;
                }
                // Pop never survives lowering; treat it as a no-op if it
                // ever appears.
                OpCode::Pop => {
                    pc += 1;
                }
            }
        }

        // The last-seen accept is the most specific; walk backwards so
        // constraint failures fall through to less specific candidates.
        let mut values = RouteValues::new();
        for &index in fired.iter().rev() {
            let entry = &self.entries[index as usize];
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

/// Threads one entry through the trie: once per permitted truncation for
/// optional segments, or a single catch-all accept at the last
/// non-catch-all node.
fn insert_entry(root: &mut TrieNode, entry: &Arc<RouteEntry>, index: usize) {
    let template = entry.matcher.template();
    let segments = template.segments();

    let keys: Vec<Option<&str>> = segments
        .iter()
        .filter(|s| !s.is_catch_all())
        .map(|segment| {
            if segment.is_simple() && segment.single_parameter().is_none() {
                Some(segment.parts()[0].text().unwrap_or_default())
            } else {
                None
            }
        })
        .collect();

    if template.has_catch_all() {
        let node = descend(root, &keys);
        push_accept(
            node,
            AcceptSpec {
                entry: index,
                depth: depth_of(keys.len()),
            },
        );
        return;
    }

    let min = entry.matcher.min_required_segments();
    for length in min..=keys.len() {
        let node = descend(root, &keys[..length]);
        push_accept(
            node,
            AcceptSpec {
                entry: index,
                depth: depth_of(length),
            },
        );
    }
}

fn depth_of(length: usize) -> u8 {
    u8::try_from(length).unwrap_or(u8::MAX)
}

fn descend<'a>(mut node: &'a mut TrieNode, keys: &[Option<&str>]) -> &'a mut TrieNode {
    for key in keys {
        node = match key {
            Some(text) => {
                let position = node
                    .literals
                    .iter()
                    .position(|(t, _)| t.eq_ignore_ascii_case(text));
                let position = match position {
                    Some(p) => p,
                    None => {
                        node.literals.push((text.to_string(), TrieNode::default()));
                        node.literals.len() - 1
                    }
                };
                &mut node.literals[position].1
            }
            None => node.parameter.get_or_insert_with(Box::default).as_mut(),
        };
    }
    node
}

fn push_accept(node: &mut TrieNode, spec: AcceptSpec) {
    if !node.accepts.contains(&spec) {
        node.accepts.push(spec);
    }
}

/// Converts a trie node into the typed tree: accepts least specific
/// first, then the parameter subtree, then the literal branch, so that
/// more specific accepts always land later in the stream.
fn convert(node: &TrieNode, depth: u8) -> ProgramNode {
    let mut children = Vec::new();

    let mut accepts = node.accepts.clone();
    accepts.sort_by(|a, b| b.entry.cmp(&a.entry));
    children.extend(accepts.into_iter().map(ProgramNode::Accept));

    if let Some(parameter) = &node.parameter {
        children.push(ProgramNode::Parameter(vec![convert(
            parameter,
            depth.saturating_add(1),
        )]));
    }

    if !node.literals.is_empty() {
        let literals = node
            .literals
            .iter()
            .map(|(text, child)| (text.clone(), convert(child, depth.saturating_add(1))))
            .collect();
        children.push(ProgramNode::Branch { depth, literals });
    }

    ProgramNode::Sequence(children)
}

/// Lowers the typed tree to instructions, exactly one branch block per
/// `Branch` node: emit the table and the `Branch`, lower each literal
/// child followed by a `Pop` placeholder, then close the block by
/// rewriting every remaining `Pop` to a `Jump` past the block and fixing
/// the table's `exit`.
fn lower(node: &ProgramNode, instructions: &mut Vec<Instruction>, tables: &mut Vec<BranchTable>) {
    match node {
        ProgramNode::Sequence(children) | ProgramNode::Parameter(children) => {
            for child in children {
                lower(child, instructions, tables);
            }
        }
        ProgramNode::Accept(spec) => {
            instructions.push(Instruction {
                code: OpCode::Accept,
                depth: spec.depth,
                payload: spec.entry as u32,
            });
        }
        ProgramNode::Branch { depth, literals } => {
            let table_index = tables.len();
            tables.push(BranchTable {
                depth: *depth,
                entries: Vec::new(),
                exit: 0,
            });
            instructions.push(Instruction {
                code: OpCode::Branch,
                depth: *depth,
                payload: table_index as u32,
            });

            let block_start = instructions.len();
            let mut entries = Vec::with_capacity(literals.len());
            for (text, child) in literals {
                entries.push((text.clone(), instructions.len() as u32));
                lower(child, instructions, tables);
                instructions.push(Instruction {
                    code: OpCode::Pop,
                    depth: *depth,
                    payload: 0,
                });
            }

            let end = instructions.len() as u32;
            for instruction in &mut instructions[block_start..] {
                if instruction.code == OpCode::Pop {
                    *instruction = Instruction {
                        code: OpCode::Jump,
                        depth: instruction.depth,
                        payload: end,
                    };
                }
            }
            tables[table_index].entries = entries;
            tables[table_index].exit = end;
        }
    }
}
