//! Owned syntax tree: tree-sitter output copied into a flat node arena
//!
//! Nodes are stored in pre-order, each with a parent link and its field name
//! in the parent. All traversal uses explicit stacks, so very deep files never
//! recurse on the call stack.

use std::ops::Range;
use tree_sitter::Tree;

pub type NodeIdx = usize;

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: &'static str,
    /// Field name under which this node hangs off its parent.
    pub field: Option<&'static str>,
    pub named: bool,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    pub byte_range: Range<usize>,
    /// 1-based.
    pub start_line: u32,
    /// 1-based.
    pub end_line: u32,
}

#[derive(Debug)]
pub struct SyntaxArena {
    nodes: Vec<SyntaxNode>,
    source: String,
    has_errors: bool,
}

impl SyntaxArena {
    pub const ROOT: NodeIdx = 0;

    pub fn from_tree(tree: &Tree, source: String) -> Self {
        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let mut parents: Vec<NodeIdx> = Vec::new();
        let mut cursor = tree.walk();

        loop {
            let node = cursor.node();
            let idx = nodes.len();
            let parent = parents.last().copied();
            nodes.push(SyntaxNode {
                kind: node.kind(),
                field: cursor.field_name(),
                named: node.is_named(),
                parent,
                children: Vec::new(),
                byte_range: node.start_byte()..node.end_byte(),
                start_line: node.start_position().row as u32 + 1,
                end_line: node.end_position().row as u32 + 1,
            });
            if let Some(p) = parent {
                nodes[p].children.push(idx);
            }

            if cursor.goto_first_child() {
                parents.push(idx);
                continue;
            }
            // Climb until a sibling exists; done once we are back above the root.
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return SyntaxArena {
                        nodes,
                        source,
                        has_errors: tree.root_node().has_error(),
                    };
                }
                parents.pop();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, idx: NodeIdx) -> &SyntaxNode {
        &self.nodes[idx]
    }

    pub fn kind(&self, idx: NodeIdx) -> &'static str {
        self.nodes[idx].kind
    }

    pub fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.nodes[idx].parent
    }

    pub fn field(&self, idx: NodeIdx) -> Option<&'static str> {
        self.nodes[idx].field
    }

    pub fn line(&self, idx: NodeIdx) -> u32 {
        self.nodes[idx].start_line
    }

    pub fn text(&self, idx: NodeIdx) -> &str {
        self.source
            .get(self.nodes[idx].byte_range.clone())
            .unwrap_or_default()
    }

    pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.nodes[idx].children
    }

    pub fn named_children(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        self.nodes[idx]
            .children
            .iter()
            .copied()
            .filter(move |&c| self.nodes[c].named)
    }

    pub fn child_by_field(&self, idx: NodeIdx, field: &str) -> Option<NodeIdx> {
        self.children_by_field(idx, field).next()
    }

    pub fn children_by_field<'a>(&'a self, idx: NodeIdx, field: &'a str) -> impl Iterator<Item = NodeIdx> + 'a {
        self.nodes[idx]
            .children
            .iter()
            .copied()
            .filter(move |&c| self.nodes[c].field == Some(field))
    }

    pub fn child_of_kind(&self, idx: NodeIdx, kind: &str) -> Option<NodeIdx> {
        self.nodes[idx]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].kind == kind)
    }

    /// Text of the child under `field`, if any.
    pub fn field_text(&self, idx: NodeIdx, field: &str) -> Option<&str> {
        self.child_by_field(idx, field).map(|c| self.text(c))
    }

    /// Sibling immediately before `idx` (named or not).
    pub fn prev_sibling(&self, idx: NodeIdx) -> Option<NodeIdx> {
        let parent = self.nodes[idx].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&s| s == idx)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Strict ancestors, innermost first.
    pub fn ancestors(&self, idx: NodeIdx) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.nodes[idx].parent,
        }
    }

    /// Pre-order descendants of `idx` (including `idx`), skipping the
    /// subtrees of nodes for which `prune` returns true.
    pub fn descendants_pruned<'a, F>(&'a self, idx: NodeIdx, prune: F) -> Descendants<'a, F>
    where
        F: Fn(NodeIdx) -> bool,
    {
        Descendants {
            arena: self,
            stack: vec![idx],
            root: idx,
            prune,
        }
    }
}

pub struct Ancestors<'a> {
    arena: &'a SyntaxArena,
    next: Option<NodeIdx>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<NodeIdx> {
        let current = self.next?;
        self.next = self.arena.nodes[current].parent;
        Some(current)
    }
}

pub struct Descendants<'a, F> {
    arena: &'a SyntaxArena,
    stack: Vec<NodeIdx>,
    root: NodeIdx,
    prune: F,
}

impl<F> Iterator for Descendants<'_, F>
where
    F: Fn(NodeIdx) -> bool,
{
    type Item = NodeIdx;

    fn next(&mut self) -> Option<NodeIdx> {
        let current = self.stack.pop()?;
        if current == self.root || !(self.prune)(current) {
            self.stack
                .extend(self.arena.nodes[current].children.iter().rev().copied());
        }
        Some(current)
    }
}
