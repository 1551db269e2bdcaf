//! Pane tree of a single tab
//!
//! Each tab holds a binary tree: a leaf is a pane showing one terminal, a
//! split holds two subtrees and the share of space given to the first one.
//!
//! ```text
//! Split(Horizontal, 0.5)
//! ├── Leaf(A, local shell)
//! └── Split(Vertical, 0.3)
//!     ├── Leaf(B, ssh web)
//!     └── Leaf(C, ssh db)
//! ```
//!
//! Closing a pane promotes its sibling into the parent's slot, so the tree
//! never contains a split with a missing child.

use super::error::{PaneError, PaneResult};
use super::types::{PaneId, PaneOrientation, TerminalRef};

/// Ratio of a fresh split
pub const DEFAULT_SPLIT_RATIO: f64 = 0.5;

/// Smallest share a split gives its first child
pub const MIN_SPLIT_RATIO: f64 = 0.05;

/// Largest share a split gives its first child
pub const MAX_SPLIT_RATIO: f64 = 0.95;

/// A pane showing one terminal
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLeaf {
    /// Stable identifier
    pub id: PaneId,
    /// The terminal in this pane
    pub terminal: TerminalRef,
}

impl PaneLeaf {
    /// Wraps `terminal` in a new pane
    #[must_use]
    pub fn new(terminal: TerminalRef) -> Self {
        Self {
            id: PaneId::new(),
            terminal,
        }
    }
}

/// A node in the pane tree
#[derive(Debug, Clone, PartialEq)]
pub enum PaneNode {
    /// A single pane
    Leaf(PaneLeaf),
    /// Two subtrees sharing the space
    Split {
        /// Side by side or stacked
        orientation: PaneOrientation,
        /// Start/left/top child
        first: Box<PaneNode>,
        /// End/right/bottom child
        second: Box<PaneNode>,
        /// Share of the first child, within the min/max ratio
        ratio: f64,
    },
}

impl PaneNode {
    /// A split of two nodes at `ratio` (clamped)
    #[must_use]
    pub fn split(orientation: PaneOrientation, first: Self, second: Self, ratio: f64) -> Self {
        Self::Split {
            orientation,
            first: Box::new(first),
            second: Box::new(second),
            ratio: clamp_ratio(ratio),
        }
    }

    fn find(&self, id: PaneId) -> Option<&PaneLeaf> {
        match self {
            Self::Leaf(leaf) => (leaf.id == id).then_some(leaf),
            Self::Split { first, second, .. } => first.find(id).or_else(|| second.find(id)),
        }
    }

    fn find_mut(&mut self, id: PaneId) -> Option<&mut PaneLeaf> {
        match self {
            Self::Leaf(leaf) => (leaf.id == id).then_some(leaf),
            Self::Split { first, second, .. } => match first.find_mut(id) {
                Some(leaf) => Some(leaf),
                None => second.find_mut(id),
            },
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a PaneLeaf>) {
        match self {
            Self::Leaf(leaf) => out.push(leaf),
            Self::Split { first, second, .. } => {
                first.collect(out);
                second.collect(out);
            }
        }
    }

    /// Top-left leaf of this subtree
    #[must_use]
    pub fn first_leaf(&self) -> &PaneLeaf {
        match self {
            Self::Leaf(leaf) => leaf,
            Self::Split { first, .. } => first.first_leaf(),
        }
    }

    fn count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Split { first, second, .. } => first.count() + second.count(),
        }
    }

    fn insert_split(
        &mut self,
        id: PaneId,
        orientation: PaneOrientation,
        new_leaf: &mut Option<PaneLeaf>,
    ) -> bool {
        match self {
            Self::Leaf(leaf) if leaf.id == id => {
                let Some(added) = new_leaf.take() else {
                    return false;
                };
                let original = Self::Leaf(leaf.clone());
                *self = Self::split(orientation, original, Self::Leaf(added), DEFAULT_SPLIT_RATIO);
                true
            }
            Self::Leaf(_) => false,
            Self::Split { first, second, .. } => {
                first.insert_split(id, orientation, new_leaf)
                    || second.insert_split(id, orientation, new_leaf)
            }
        }
    }

    /// Removes the leaf `id` from a split below this node, promoting its
    /// sibling. Returns the removed leaf.
    fn remove(&mut self, id: PaneId) -> Option<PaneLeaf> {
        let Self::Split { first, second, .. } = self else {
            return None;
        };
        let first_matches = matches!(first.as_ref(), Self::Leaf(l) if l.id == id);
        let second_matches = matches!(second.as_ref(), Self::Leaf(l) if l.id == id);
        if first_matches || second_matches {
            let (removed, survivor) = if first_matches {
                (first.as_ref().clone(), second.as_ref().clone())
            } else {
                (second.as_ref().clone(), first.as_ref().clone())
            };
            *self = survivor;
            return match removed {
                Self::Leaf(leaf) => Some(leaf),
                Self::Split { .. } => None,
            };
        }
        first.remove(id).or_else(|| second.remove(id))
    }

    fn update_ratio(&mut self, first_pane: PaneId, value: f64) -> bool {
        match self {
            Self::Leaf(_) => false,
            Self::Split {
                first,
                second,
                ratio,
                ..
            } => {
                if first.first_leaf().id == first_pane {
                    *ratio = clamp_ratio(value);
                    true
                } else {
                    first.update_ratio(first_pane, value) || second.update_ratio(first_pane, value)
                }
            }
        }
    }
}

/// Clamps a split ratio into the allowed range; NaN becomes the default
#[must_use]
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        DEFAULT_SPLIT_RATIO
    } else {
        ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
    }
}

/// Outcome of closing a pane
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// The pane was removed; its sibling took the parent's place
    Promoted {
        /// The removed pane
        removed: PaneLeaf,
        /// First pane of the promoted sibling, the natural focus target
        focus: PaneId,
    },
    /// It was the last pane; the tab has nothing left to show
    TabEmptied(PaneLeaf),
}

/// The panes of one tab
#[derive(Debug, Clone, PartialEq)]
pub struct PaneTree {
    root: PaneNode,
}

impl PaneTree {
    /// A tree holding a single pane
    #[must_use]
    pub fn new(terminal: TerminalRef) -> Self {
        Self {
            root: PaneNode::Leaf(PaneLeaf::new(terminal)),
        }
    }

    /// Wraps an existing node, e.g. one rebuilt from a saved layout
    #[must_use]
    pub const fn from_root(root: PaneNode) -> Self {
        Self { root }
    }

    /// The root node
    #[must_use]
    pub const fn root(&self) -> &PaneNode {
        &self.root
    }

    /// Splits pane `id`; the original stays first, the new terminal second.
    ///
    /// # Errors
    /// [`PaneError::PaneNotFound`] if `id` is not in this tree.
    pub fn split(
        &mut self,
        id: PaneId,
        orientation: PaneOrientation,
        terminal: TerminalRef,
    ) -> PaneResult<PaneId> {
        let leaf = PaneLeaf::new(terminal);
        let new_id = leaf.id;
        let mut slot = Some(leaf);
        if self.root.insert_split(id, orientation, &mut slot) {
            Ok(new_id)
        } else {
            Err(PaneError::PaneNotFound(id))
        }
    }

    /// Closes pane `id`.
    ///
    /// # Errors
    /// [`PaneError::PaneNotFound`] if `id` is not in this tree.
    pub fn close(&mut self, id: PaneId) -> PaneResult<CloseOutcome> {
        if let PaneNode::Leaf(leaf) = &self.root {
            return if leaf.id == id {
                Ok(CloseOutcome::TabEmptied(leaf.clone()))
            } else {
                Err(PaneError::PaneNotFound(id))
            };
        }
        let removed = self.root.remove(id).ok_or(PaneError::PaneNotFound(id))?;
        Ok(CloseOutcome::Promoted {
            removed,
            focus: self.root.first_leaf().id,
        })
    }

    /// Finds a pane
    #[must_use]
    pub fn find(&self, id: PaneId) -> Option<&PaneLeaf> {
        self.root.find(id)
    }

    /// Finds a pane for mutation
    #[must_use]
    pub fn find_mut(&mut self, id: PaneId) -> Option<&mut PaneLeaf> {
        self.root.find_mut(id)
    }

    /// Finds the pane showing `terminal_id`
    #[must_use]
    pub fn find_terminal(&self, terminal_id: &str) -> Option<&PaneLeaf> {
        self.panes()
            .into_iter()
            .find(|p| p.terminal.terminal_id == terminal_id)
    }

    /// All panes, depth first, first child before second
    #[must_use]
    pub fn panes(&self) -> Vec<&PaneLeaf> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    /// Number of panes
    #[must_use]
    pub fn pane_count(&self) -> usize {
        self.root.count()
    }

    /// `true` if the tab is split
    #[must_use]
    pub const fn is_split(&self) -> bool {
        matches!(self.root, PaneNode::Split { .. })
    }

    /// Top-left pane
    #[must_use]
    pub fn first_pane(&self) -> &PaneLeaf {
        self.root.first_leaf()
    }

    /// Sets the ratio of the split whose first subtree starts with
    /// `first_pane`. Returns `false` if there is no such split.
    pub fn update_ratio(&mut self, first_pane: PaneId, ratio: f64) -> bool {
        self.root.update_ratio(first_pane, ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_of_three() -> (PaneTree, PaneId, PaneId, PaneId) {
        let mut tree = PaneTree::new(TerminalRef::local("a"));
        let a = tree.first_pane().id;
        let b = tree
            .split(a, PaneOrientation::Horizontal, TerminalRef::ssh("b"))
            .unwrap();
        let c = tree
            .split(b, PaneOrientation::Vertical, TerminalRef::ssh("c"))
            .unwrap();
        (tree, a, b, c)
    }

    #[test]
    fn split_keeps_original_first() {
        let (tree, a, b, c) = tree_of_three();
        let order: Vec<PaneId> = tree.panes().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![a, b, c]);
        assert!(tree.is_split());
        assert_eq!(tree.pane_count(), 3);
    }

    #[test]
    fn split_unknown_pane_fails() {
        let mut tree = PaneTree::new(TerminalRef::local("a"));
        let missing = PaneId::new();
        assert_eq!(
            tree.split(missing, PaneOrientation::Vertical, TerminalRef::local("b")),
            Err(PaneError::PaneNotFound(missing))
        );
    }

    #[test]
    fn close_promotes_sibling() {
        let (mut tree, a, b, c) = tree_of_three();
        let outcome = tree.close(b).unwrap();
        assert!(matches!(outcome, CloseOutcome::Promoted { ref removed, .. } if removed.id == b));
        let order: Vec<PaneId> = tree.panes().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![a, c]);

        let PaneNode::Split { second, .. } = tree.root() else {
            panic!("root should still be a split");
        };
        assert!(matches!(second.as_ref(), PaneNode::Leaf(l) if l.id == c));
    }

    #[test]
    fn closing_the_last_pane_empties_the_tab() {
        let mut tree = PaneTree::new(TerminalRef::local("a"));
        let a = tree.first_pane().id;
        let b = tree
            .split(a, PaneOrientation::Horizontal, TerminalRef::local("b"))
            .unwrap();
        assert!(matches!(tree.close(a), Ok(CloseOutcome::Promoted { focus, .. }) if focus == b));
        assert!(!tree.is_split());
        assert!(matches!(tree.close(b), Ok(CloseOutcome::TabEmptied(_))));
        assert!(tree.close(a).is_err());
    }

    #[test]
    fn ratio_updates_are_clamped() {
        let (mut tree, a, b, _) = tree_of_three();
        assert!(tree.update_ratio(a, 2.0));
        assert!(tree.update_ratio(b, 0.0));
        let PaneNode::Split { ratio, second, .. } = tree.root() else {
            panic!("expected split");
        };
        assert!((ratio - MAX_SPLIT_RATIO).abs() < f64::EPSILON);
        let PaneNode::Split { ratio: inner, .. } = second.as_ref() else {
            panic!("expected nested split");
        };
        assert!((inner - MIN_SPLIT_RATIO).abs() < f64::EPSILON);
        assert!(!tree.update_ratio(PaneId::new(), 0.5));
    }

    #[test]
    fn clamp_handles_nan() {
        assert!((clamp_ratio(f64::NAN) - DEFAULT_SPLIT_RATIO).abs() < f64::EPSILON);
    }
}
