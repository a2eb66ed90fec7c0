//! Transactional parse-tree construction.
//!
//! A [Nursery] owns the `Vec<ParseTreeNode>` being built and the current
//! read cursor into a [Tokenization]. A [Stake] is a nested, RAII-style
//! transaction over both: while a stake is alive its creator may push a node
//! and advance the token cursor; if the stake is dropped without being
//! [Stake::commit]ted, both the tree and the cursor are rewound to exactly
//! where the stake started. This is what lets the Seed interpreter try an
//! alternative, fail, and retry a sibling alternative as if the failed
//! attempt never happened — the PEG backtracking the teacher's combinators
//! get for free from Rust's call stack, reproduced here explicitly because
//! the grammar driving it is only known at runtime.
//!
//! Grounded directly in the original's `parse_tree_nursery_t`/`stake_t`
//! (`cpp/syntax/parse_tree_nursery.cpp`): same state/rewind split, same
//! proto-node accumulation, same owns-a-node-or-passes-through-children
//! duality. `commit` takes `self` by value (rather than `&mut self`) so a
//! stake that is used at all must be explicitly committed or explicitly
//! dropped — there is no method that both keeps the stake alive and forgets
//! about it.
use crate::catalog::NameId;
use crate::error::SilvaError;
use crate::tokenization::{Position, Tokenization};
use crate::tree::{ParseTree, ParseTreeNode};

/// A snapshot of a [Nursery]'s mutable state, cheap to save and restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NurseryState {
    pub tree_size: u32,
    pub token_index: u32,
}

/// The accumulator a [Stake] folds its children's contributions into.
///
/// `last_error` is diagnostic-only (spec §4.3.4): the `Minor` error, if any,
/// that caused a repetition or alternative to stop trying further options
/// even though the overall evaluation still succeeded. It never affects
/// success/failure and is folded forward by [ProtoNode::absorb] so it
/// survives being wrapped by an enclosing `Concat`/`And`.
#[derive(Debug, Clone)]
pub struct ProtoNode {
    pub rule_name: Option<NameId>,
    pub num_children: u32,
    pub subtree_size: u32,
    pub token_begin: u32,
    pub token_end: u32,
    pub last_error: Option<SilvaError>,
}

impl ProtoNode {
    fn empty(token_index: u32) -> Self {
        Self {
            rule_name: None,
            num_children: 0,
            subtree_size: 0,
            token_begin: token_index,
            token_end: token_index,
            last_error: None,
        }
    }

    /// Folds one committed child's contribution into `self`.
    pub fn absorb(&mut self, other: ProtoNode) {
        self.num_children += other.num_children;
        self.subtree_size += other.subtree_size;
        if other.subtree_size > 0 || other.num_children > 0 {
            self.token_begin = self.token_begin.min(other.token_begin);
            self.token_end = self.token_end.max(other.token_end);
        }
        if other.last_error.is_some() {
            self.last_error = other.last_error;
        }
    }
}

/// The tree builder: the `Vec<ParseTreeNode>` under construction plus the
/// read cursor into the token stream being parsed.
pub struct Nursery<'t> {
    pub tokenization: &'t Tokenization,
    nodes: Vec<ParseTreeNode>,
    token_index: u32,
}

impl<'t> Nursery<'t> {
    pub fn new(tokenization: &'t Tokenization) -> Self {
        Self {
            tokenization,
            nodes: Vec::new(),
            token_index: 0,
        }
    }

    pub fn state(&self) -> NurseryState {
        NurseryState {
            tree_size: self.nodes.len() as u32,
            token_index: self.token_index,
        }
    }

    pub fn set_state(&mut self, state: NurseryState) {
        self.nodes.truncate(state.tree_size as usize);
        self.token_index = state.token_index;
    }

    /// Opens a new transaction. The returned [Stake] uniquely (mutably)
    /// borrows this nursery until it is committed or dropped.
    pub fn stake(&mut self) -> Stake<'_, 't> {
        let orig_state = self.state();
        Stake {
            nursery: self,
            orig_state,
            proto: ProtoNode::empty(orig_state.token_index),
            has_node: false,
            committed: false,
        }
    }

    /// Consumes the nursery, returning the finished tree. The caller is
    /// responsible for having committed a single root stake first so that
    /// `nodes` holds a well-formed pre-order tree.
    pub fn finish(self) -> ParseTree {
        ParseTree { nodes: self.nodes }
    }

    pub fn token_index(&self) -> u32 {
        self.token_index
    }

    pub fn num_tokens_left(&self) -> u32 {
        self.tokenization.num_tokens().saturating_sub(self.token_index)
    }

    pub fn token_id_by(&self, offset: u32) -> crate::catalog::TokenId {
        self.tokenization.token_id(self.token_index + offset)
    }

    pub fn token_text_by(&self, offset: u32) -> &str {
        self.tokenization.text_of(self.token_index + offset)
    }

    pub fn is_eof_by(&self, offset: u32) -> bool {
        self.tokenization.is_eof(self.token_index + offset)
    }

    pub fn position_by(&self, offset: u32) -> Position {
        self.tokenization.position_of(self.token_index + offset)
    }

    pub fn position_at(&self, token_index: u32) -> Position {
        self.tokenization.position_of(token_index)
    }

    /// Advances the read cursor past the current token.
    pub fn advance(&mut self) {
        debug_assert!(!self.tokenization.is_eof(self.token_index));
        self.token_index += 1;
    }

    /// Crate-internal escape hatch for [crate::axe], which stitches atom
    /// subtrees into an operator tree and needs to move already-committed
    /// nodes around in ways a [Stake] transaction doesn't model.
    pub(crate) fn raw_nodes(&self) -> &[ParseTreeNode] {
        &self.nodes
    }

    pub(crate) fn raw_nodes_mut(&mut self) -> &mut Vec<ParseTreeNode> {
        &mut self.nodes
    }

    /// Wraps every node from `start` to the current end in a single new
    /// parent node with `num_children` direct children. Used by
    /// [crate::seed_syntax] to retroactively wrap an already-committed
    /// subtree once a trailing marker (a postfix `?`/`*`/`+`, or discovering
    /// a second `Concat`/`Or` item) reveals it needed a wrapper after all —
    /// something a [Stake] can't do, since `create_node` must run before any
    /// of a node's children are parsed.
    pub(crate) fn wrap_subtree(
        &mut self,
        start: u32,
        rule_name: NameId,
        num_children: u32,
        token_begin: u32,
        token_end: u32,
    ) {
        let wrapped_len = self.nodes.len() as u32 - start;
        self.nodes.insert(
            start as usize,
            ParseTreeNode {
                rule_name,
                num_children,
                subtree_size: wrapped_len + 1,
                token_begin,
                token_end,
            },
        );
    }
}

/// A nested transaction over a [Nursery]. See the module docs for the
/// commit/rollback contract.
pub struct Stake<'n, 't> {
    nursery: &'n mut Nursery<'t>,
    orig_state: NurseryState,
    proto: ProtoNode,
    has_node: bool,
    committed: bool,
}

impl<'n, 't> Stake<'n, 't> {
    /// Reserves a real tree node for this stake, to be finalized on commit.
    /// Without this call the stake is "transparent": its children are
    /// passed straight up to the parent stake instead of being wrapped.
    pub fn create_node(&mut self, rule_name: NameId) {
        debug_assert!(!self.has_node);
        debug_assert_eq!(self.proto.subtree_size, 0);
        self.has_node = true;
        self.proto.rule_name = Some(rule_name);
        self.proto.subtree_size = 1;
        self.proto.token_begin = self.nursery.token_index;
        self.proto.token_end = self.nursery.token_index;
        self.nursery.nodes.push(ParseTreeNode {
            rule_name,
            num_children: 0,
            subtree_size: 0,
            token_begin: 0,
            token_end: 0,
        });
    }

    pub fn has_node(&self) -> bool {
        self.has_node
    }

    /// Folds a child stake's committed contribution into this stake.
    pub fn absorb(&mut self, child: ProtoNode) {
        self.proto.absorb(child);
    }

    /// Opens a nested transaction over the same nursery.
    pub fn stake(&mut self) -> Stake<'_, 't> {
        self.nursery.stake()
    }

    pub fn nursery(&self) -> &Nursery<'t> {
        self.nursery
    }

    /// Crate-internal escape hatch, mirroring [Nursery::raw_nodes_mut] and
    /// [Nursery::wrap_subtree] — lets [crate::seed_syntax] reach past this
    /// stake's own accounting to retroactively wrap a subtree it already
    /// let a child commit.
    pub(crate) fn nursery_mut(&mut self) -> &mut Nursery<'t> {
        self.nursery
    }

    pub fn num_tokens_left(&self) -> u32 {
        self.nursery.num_tokens_left()
    }

    pub fn token_id_by(&self, offset: u32) -> crate::catalog::TokenId {
        self.nursery.token_id_by(offset)
    }

    pub fn token_text_by(&self, offset: u32) -> &str {
        self.nursery.token_text_by(offset)
    }

    pub fn is_eof_by(&self, offset: u32) -> bool {
        self.nursery.is_eof_by(offset)
    }

    pub fn position_by(&self, offset: u32) -> Position {
        self.nursery.position_by(offset)
    }

    pub fn token_index(&self) -> u32 {
        self.nursery.token_index()
    }

    pub fn advance(&mut self) {
        self.nursery.advance();
    }

    /// Finalizes the transaction: if a node was created, writes it into the
    /// tree with its accumulated children and returns a `ProtoNode`
    /// representing "one child" to the caller's stake; otherwise returns the
    /// accumulated children unchanged, as a pass-through.
    pub fn commit(mut self) -> ProtoNode {
        self.proto.token_end = self.nursery.token_index;
        if self.has_node {
            let node_index = self.orig_state.tree_size as usize;
            self.nursery.nodes[node_index] = ParseTreeNode {
                rule_name: self.proto.rule_name.expect("create_node sets rule_name"),
                num_children: self.proto.num_children,
                subtree_size: self.proto.subtree_size,
                token_begin: self.proto.token_begin,
                token_end: self.proto.token_end,
            };
            self.proto.num_children = 1;
        }
        self.committed = true;
        self.proto
    }

    /// Explicitly discards the transaction. Equivalent to dropping the
    /// stake, spelled out for call sites where that reads more clearly.
    pub fn rollback(self) {}
}

impl<'n, 't> Drop for Stake<'n, 't> {
    fn drop(&mut self) {
        if !self.committed {
            self.nursery.set_state(self.orig_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Ward;
    use crate::tokenization::tokenize;

    #[test]
    fn committed_leaf_produces_single_node() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "a").unwrap();
        let mut nursery = Nursery::new(&tok);
        let name = ward.name_id_of(&["A"]);
        let mut stake = nursery.stake();
        stake.create_node(name);
        stake.advance();
        stake.commit();
        let tree = nursery.finish();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].rule_name, name);
        assert_eq!(tree.nodes[0].token_begin, 0);
        assert_eq!(tree.nodes[0].token_end, 1);
    }

    #[test]
    fn dropped_stake_rolls_back_tree_and_cursor() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "a b").unwrap();
        let mut nursery = Nursery::new(&tok);
        let name = ward.name_id_of(&["A"]);
        {
            let mut stake = nursery.stake();
            stake.create_node(name);
            stake.advance();
            // stake dropped without commit: rolled back
        }
        assert_eq!(nursery.state(), NurseryState { tree_size: 0, token_index: 0 });
    }

    #[test]
    fn parent_absorbs_children_into_subtree_size() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "a b").unwrap();
        let mut nursery = Nursery::new(&tok);
        let parent_name = ward.name_id_of(&["P"]);
        let child_name = ward.name_id_of(&["C"]);

        let mut parent = nursery.stake();
        parent.create_node(parent_name);
        for _ in 0..2 {
            let mut child = parent.stake();
            child.create_node(child_name);
            child.advance();
            let proto = child.commit();
            parent.absorb(proto);
        }
        parent.commit();

        let tree = nursery.finish();
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].num_children, 2);
        assert_eq!(tree.nodes[0].subtree_size, 3);
        assert_eq!(tree.nodes[0].token_begin, 0);
        assert_eq!(tree.nodes[0].token_end, 2);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn transparent_stake_passes_children_through() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "a b").unwrap();
        let mut nursery = Nursery::new(&tok);
        let child_name = ward.name_id_of(&["C"]);

        let mut transparent = nursery.stake();
        for _ in 0..2 {
            let mut child = transparent.stake();
            child.create_node(child_name);
            child.advance();
            let proto = child.commit();
            transparent.absorb(proto);
        }
        let result = transparent.commit();
        assert_eq!(result.num_children, 2);
        assert_eq!(result.subtree_size, 2);

        let tree = nursery.finish();
        assert_eq!(tree.nodes.len(), 2);
    }
}
