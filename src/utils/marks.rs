//! # Ancestor Marking
//!
//! The growth step of both interval passes asks "which nodes can reach this
//! candidate?" once per candidate, many times per worklist pop. Instead of
//! allocating and zeroing a fresh bit vector per query, the marks are tagged
//! with a generation number: a node is marked iff its slot holds the current
//! generation, so starting a new query invalidates every old mark at once.

use super::cfg::CfgNode;

pub struct AncestorMarks<N> {
    marks: Vec<u32>,
    generation: u32,
    stack: Vec<N>,
}

impl<N> Default for AncestorMarks<N> {
    fn default() -> Self {
        Self {
            marks: Vec::new(),
            generation: 0,
            stack: Vec::new(),
        }
    }
}

impl<N> AncestorMarks<N>
where
    N: CfgNode,
{
    /// Mark `node` and every node that can reach it through predecessor
    /// edges. Marks from the previous query are discarded.
    pub fn mark(&mut self, arena: &N::A, node: N) {
        self.next_generation();

        self.stack.clear();
        self.stack.push(node);

        while let Some(node) = self.stack.pop() {
            if !self.set(node) {
                continue;
            }
            for &pred in node.preds(arena) {
                if !self.is_marked(pred) {
                    self.stack.push(pred);
                }
            }
        }
    }

    /// Check if the node was reached by the last query.
    pub fn is_marked(&self, node: N) -> bool {
        self.generation != 0 && self.marks.get(node.index()) == Some(&self.generation)
    }

    fn next_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // wrapped around, old generations could alias the new ones
            self.marks.iter_mut().for_each(|m| *m = 0);
            self.generation = 1;
        }
    }

    /// Returns false if the node was already marked in this generation.
    fn set(&mut self, node: N) -> bool {
        let index = node.index();
        if index >= self.marks.len() {
            self.marks.resize(index + 1, 0);
        }
        if self.marks[index] == self.generation {
            return false;
        }
        self.marks[index] = self.generation;
        true
    }
}
