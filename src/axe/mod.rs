//! The embedded operator-precedence ("axe") engine.
//!
//! An [AxeSpec] is a compiled precedence table: a set of levels, each with
//! an associativity and the operator tokens active at that level. Parsing an
//! expression against it needs no grammar-interpreter machinery of its own —
//! it only calls back into an `atom` parser for the leaves — which is why a
//! Seed rule written as `=/` hands off to this module entirely.
//!
//! This is the one part of the crate with essentially no analogue in the
//! teacher crate (a statically combinator-built parser has no notion of
//! runtime-configurable operator precedence). It is grounded instead in the
//! original's `cpp/syntax/parse_axe.hpp`/`.cpp`: same operator-kind
//! vocabulary (`atom_nest`/`prefix`/`prefix_nest`/`infix`(+flatten)/
//! `postfix`/`postfix_nest`/`ternary`), the same `Precedence` ordering rule
//! (equal level + matching flatten group defers to grouping; equal level
//! otherwise breaks ties by associativity), and the same two-phase
//! parse-then-stitch strategy — though expressed here as a classic
//! minimum-precedence recursive descent rather than the original's explicit
//! operator/atom stacks, since the two are equivalent and the former is the
//! idiomatic shape in Rust.
use crate::catalog::{NameId, TokenId, Ward};
use crate::error::{Result, Severity, SilvaError};
use crate::nursery::{Nursery, ProtoNode};
use crate::tree::ParseTreeNode;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Nest,
    Ltr,
    Rtl,
}

/// Where an operator sits in the precedence table.
///
/// `level_index` is higher for tighter-binding levels; the recursive-descent
/// climb in [parse_expr] reads it directly via [next_min_level] rather than
/// comparing two `Precedence`s against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precedence {
    pub level_index: i32,
    pub assoc: Assoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperKind {
    AtomNest { left: TokenId, right: TokenId },
    PrefixNest { left: TokenId, right: TokenId },
    Prefix { token: TokenId },
    Postfix { token: TokenId },
    PostfixNest { left: TokenId, right: TokenId },
    Infix { token: TokenId, flatten: bool },
    Ternary { first: TokenId, second: TokenId },
}

impl OperKind {
    fn is_nest(&self) -> bool {
        matches!(self, OperKind::AtomNest { .. })
    }
    fn allowed_on_ltr(&self) -> bool {
        matches!(
            self,
            OperKind::Postfix { .. } | OperKind::PostfixNest { .. } | OperKind::Infix { .. } | OperKind::Ternary { .. }
        )
    }
    fn allowed_on_rtl(&self) -> bool {
        matches!(
            self,
            OperKind::Prefix { .. } | OperKind::PrefixNest { .. } | OperKind::Infix { .. } | OperKind::Ternary { .. }
        )
    }
    fn is_prefix_mode(&self) -> bool {
        matches!(
            self,
            OperKind::AtomNest { .. } | OperKind::PrefixNest { .. } | OperKind::Prefix { .. }
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultOper {
    pub kind: OperKind,
    pub name: NameId,
    pub precedence: Precedence,
}

#[derive(Debug, Clone, Default)]
struct AxeTokenEntry {
    prefix: Option<ResultOper>,
    regular: Option<ResultOper>,
    is_right_bracket: bool,
}

/// One `Level` of a Seed `Axe` block: a name, an associativity, and the
/// operators active at that level (each sharing the level's precedence).
#[derive(Debug, Clone)]
pub struct AxeLevelDesc {
    pub base_name: TokenId,
    pub assoc: Assoc,
    pub opers: Vec<OperKind>,
}

/// A compiled precedence table, ready to drive [parse].
#[derive(Debug, Clone, Default)]
pub struct AxeSpec {
    entries: HashMap<TokenId, AxeTokenEntry>,
    concat: Option<ResultOper>,
}

impl AxeSpec {
    /// Compiles a list of levels (highest precedence first) into an
    /// [AxeSpec], validating the structural rules from the original's
    /// `parse_axe_create`.
    pub fn compile(ward: &mut Ward, axe_name: NameId, levels: &[AxeLevelDesc]) -> Result<Self> {
        let mut spec = AxeSpec::default();
        let mut may_be_nest = true;

        for level in levels {
            for oper in &level.opers {
                if level.assoc == Assoc::Nest {
                    if !may_be_nest {
                        return Err(SilvaError::new(
                            Severity::BrokenSeed,
                            0,
                            "a 'nest' level must occur before all non-'nest' levels",
                        ));
                    }
                    if !oper.is_nest() {
                        return Err(SilvaError::new(
                            Severity::BrokenSeed,
                            0,
                            "a 'nest' level only allows 'atom_nest' operators",
                        ));
                    }
                } else {
                    may_be_nest = false;
                    let ok = match level.assoc {
                        Assoc::Ltr => oper.allowed_on_ltr(),
                        Assoc::Rtl => oper.allowed_on_rtl(),
                        Assoc::Nest => unreachable!(),
                    };
                    if !ok {
                        return Err(SilvaError::new(
                            Severity::BrokenSeed,
                            0,
                            format!("operator {oper:?} not allowed on a {:?} level", level.assoc),
                        ));
                    }
                }
            }
        }

        let num_levels = levels.len() as i32;
        for (i, level) in levels.iter().enumerate() {
            let level_index = num_levels - i as i32;
            let level_name = ward.name_id(axe_name, level.base_name);
            let base_precedence = Precedence {
                level_index,
                assoc: level.assoc,
            };
            for oper in &level.opers {
                match *oper {
                    OperKind::Prefix { token } => {
                        spec.register_prefix(ward, token, *oper, level_name, base_precedence)?;
                    }
                    OperKind::PrefixNest { left, right } => {
                        spec.register_prefix(ward, left, *oper, level_name, base_precedence)?;
                        spec.register_right_bracket(right)?;
                    }
                    OperKind::AtomNest { left, right } => {
                        spec.register_prefix(ward, left, *oper, level_name, base_precedence)?;
                        spec.register_right_bracket(right)?;
                    }
                    OperKind::Postfix { token } => {
                        spec.register_regular(ward, token, *oper, level_name, base_precedence)?;
                    }
                    OperKind::PostfixNest { left, right } => {
                        spec.register_regular(ward, left, *oper, level_name, base_precedence)?;
                        spec.register_right_bracket(right)?;
                    }
                    OperKind::Ternary { first, second } => {
                        spec.register_regular(ward, first, *oper, level_name, base_precedence)?;
                        spec.register_right_bracket(second)?;
                    }
                    OperKind::Infix { token, .. } => {
                        let precedence = base_precedence;
                        let name = ward.name_id(level_name, token);
                        let result = ResultOper { kind: *oper, name, precedence };
                        if ward.token_info(token).text == "concat" {
                            if spec.concat.is_some() {
                                return Err(SilvaError::new(
                                    Severity::BrokenSeed,
                                    0,
                                    "'concat' registered twice in one axe",
                                ));
                            }
                            spec.concat = Some(result);
                        } else {
                            spec.register_regular(ward, token, *oper, level_name, base_precedence)?;
                        }
                    }
                }
            }
        }
        Ok(spec)
    }

    fn register_prefix(
        &mut self,
        ward: &mut Ward,
        token: TokenId,
        kind: OperKind,
        level_name: NameId,
        precedence: Precedence,
    ) -> Result<()> {
        let entry = self.entries.entry(token).or_default();
        if entry.prefix.is_some() {
            return Err(SilvaError::new(Severity::BrokenSeed, 0, "token used twice as prefix operator"));
        }
        if entry.is_right_bracket {
            return Err(SilvaError::new(Severity::BrokenSeed, 0, "token used as both right-bracket and prefix"));
        }
        entry.prefix = Some(ResultOper {
            kind,
            name: ward.name_id(level_name, token),
            precedence,
        });
        Ok(())
    }

    fn register_regular(
        &mut self,
        ward: &mut Ward,
        token: TokenId,
        kind: OperKind,
        level_name: NameId,
        precedence: Precedence,
    ) -> Result<()> {
        let entry = self.entries.entry(token).or_default();
        if entry.regular.is_some() {
            return Err(SilvaError::new(Severity::BrokenSeed, 0, "token used twice as regular operator"));
        }
        if entry.is_right_bracket {
            return Err(SilvaError::new(Severity::BrokenSeed, 0, "token used as both right-bracket and regular"));
        }
        entry.regular = Some(ResultOper {
            kind,
            name: ward.name_id(level_name, token),
            precedence,
        });
        Ok(())
    }

    fn register_right_bracket(&mut self, token: TokenId) -> Result<()> {
        let entry = self.entries.entry(token).or_default();
        if entry.prefix.is_some() || entry.regular.is_some() {
            return Err(SilvaError::new(Severity::BrokenSeed, 0, "token used as both right-bracket and operator"));
        }
        entry.is_right_bracket = true;
        Ok(())
    }
}

/// A not-yet-materialized piece of an axe-parsed tree: either a whole
/// already-committed atom subtree sitting in scratch space, or a pending
/// operator node whose children are themselves [StitchItem]s.
enum StitchItem {
    Atom {
        scratch_start: u32,
        size: u32,
        token_begin: u32,
        token_end: u32,
    },
    Node {
        name: NameId,
        children: Vec<StitchItem>,
        token_begin: u32,
        token_end: u32,
    },
}

impl StitchItem {
    fn range(&self) -> (u32, u32) {
        match self {
            StitchItem::Atom { token_begin, token_end, .. } => (*token_begin, *token_end),
            StitchItem::Node { token_begin, token_end, .. } => (*token_begin, *token_end),
        }
    }
}

struct Ctx<'n, 't, F> {
    nursery: &'n mut Nursery<'t>,
    spec: &'n AxeSpec,
    atom: F,
}

/// Parses one axe-governed expression starting at the nursery's current
/// token, consistency-checking bracket nesting and calling back into `atom`
/// for every leaf. On success the real parse-tree nodes for the whole
/// expression have been appended to the nursery (see the module docs for
/// why this can't simply be done incrementally).
pub fn parse<'t>(
    nursery: &mut Nursery<'t>,
    spec: &AxeSpec,
    mut atom: impl FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
) -> Result<ProtoNode> {
    let scratch_start = raw_len(nursery);
    let mut ctx = Ctx { nursery, spec, atom: &mut atom };
    let item = parse_expr(&mut ctx, i32::MIN)?;

    let scratch: Vec<ParseTreeNode> = nodes_slice(ctx.nursery)[scratch_start as usize..].to_vec();
    truncate_nodes(ctx.nursery, scratch_start);
    let proto = materialize(&item, scratch_start, &scratch, ctx.nursery);
    Ok(proto)
}

fn parse_expr<'t, F>(ctx: &mut Ctx<'_, 't, F>, min_level: i32) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    let mut lhs = parse_atom_mode(ctx)?;

    loop {
        if ctx.nursery.is_eof_by(0) {
            break;
        }
        let tok = ctx.nursery.token_id_by(0);
        let entry = ctx.spec.entries.get(&tok).cloned();
        if entry.as_ref().map_or(false, |e| e.is_right_bracket) {
            break;
        }
        if let Some(reg) = entry.as_ref().and_then(|e| e.regular) {
            if reg.precedence.level_index < min_level {
                break;
            }
            lhs = apply_regular(ctx, lhs, reg)?;
            continue;
        }
        if let Some(concat) = ctx.spec.concat {
            if concat.precedence.level_index >= min_level {
                lhs = apply_concat(ctx, lhs, concat)?;
                continue;
            }
        }
        break;
    }
    Ok(lhs)
}

fn next_min_level(precedence: &Precedence) -> i32 {
    match precedence.assoc {
        Assoc::Ltr => precedence.level_index + 1,
        Assoc::Rtl | Assoc::Nest => precedence.level_index,
    }
}

fn parse_atom_mode<'t, F>(ctx: &mut Ctx<'_, 't, F>) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    if ctx.nursery.is_eof_by(0) {
        return Err(SilvaError::new(Severity::Minor, ctx.nursery.token_index(), "unexpected end of input in expression"));
    }
    let tok = ctx.nursery.token_id_by(0);
    let entry = ctx.spec.entries.get(&tok).cloned();

    if let Some(prefix) = entry.and_then(|e| e.prefix) {
        if prefix.kind.is_prefix_mode() {
            return apply_prefix(ctx, prefix);
        }
    }
    parse_atom_leaf(ctx)
}

fn parse_atom_leaf<'t, F>(ctx: &mut Ctx<'_, 't, F>) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    let scratch_start = raw_len(ctx.nursery);
    let token_begin = ctx.nursery.token_index();
    let proto = (ctx.atom)(ctx.nursery)?;
    if proto.num_children != 1 {
        return Err(SilvaError::new(
            Severity::Assert,
            token_begin,
            "axe atom rule must produce exactly one child",
        ));
    }
    let token_end = ctx.nursery.token_index();
    Ok(StitchItem::Atom {
        scratch_start,
        size: proto.subtree_size,
        token_begin,
        token_end,
    })
}

/// Parses a bracketed sub-expression starting after a left bracket has
/// already been consumed, stopping just before (and not consuming) the
/// matching `right` token.
fn parse_nested<'t, F>(ctx: &mut Ctx<'_, 't, F>, right: TokenId) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    let item = parse_expr(ctx, i32::MIN)?;
    if ctx.nursery.is_eof_by(0) || ctx.nursery.token_id_by(0) != right {
        return Err(SilvaError::new(
            Severity::Minor,
            ctx.nursery.token_index(),
            "expected closing bracket",
        ));
    }
    ctx.nursery.advance();
    Ok(item)
}

fn apply_prefix<'t, F>(ctx: &mut Ctx<'_, 't, F>, prefix: ResultOper) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    let token_begin = ctx.nursery.token_index();
    ctx.nursery.advance();
    match prefix.kind {
        OperKind::AtomNest { right, .. } => {
            let inner = parse_nested(ctx, right)?;
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: prefix.name,
                children: vec![inner],
                token_begin,
                token_end,
            })
        }
        OperKind::PrefixNest { right, .. } => {
            let inner = parse_nested(ctx, right)?;
            let operand = parse_expr(ctx, next_min_level(&prefix.precedence))?;
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: prefix.name,
                children: vec![inner, operand],
                token_begin,
                token_end,
            })
        }
        OperKind::Prefix { .. } => {
            let operand = parse_expr(ctx, next_min_level(&prefix.precedence))?;
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: prefix.name,
                children: vec![operand],
                token_begin,
                token_end,
            })
        }
        _ => unreachable!("non-prefix operator kind reached apply_prefix"),
    }
}

fn apply_regular<'t, F>(ctx: &mut Ctx<'_, 't, F>, lhs: StitchItem, reg: ResultOper) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    let (token_begin, _) = lhs.range();
    match reg.kind {
        OperKind::Postfix { .. } => {
            ctx.nursery.advance();
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: reg.name,
                children: vec![lhs],
                token_begin,
                token_end,
            })
        }
        OperKind::PostfixNest { right, .. } => {
            ctx.nursery.advance();
            let inner = parse_nested(ctx, right)?;
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: reg.name,
                children: vec![lhs, inner],
                token_begin,
                token_end,
            })
        }
        OperKind::Ternary { second, .. } => {
            ctx.nursery.advance();
            let mid = parse_nested(ctx, second)?;
            let rhs = parse_expr(ctx, next_min_level(&reg.precedence))?;
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: reg.name,
                children: vec![lhs, mid, rhs],
                token_begin,
                token_end,
            })
        }
        OperKind::Infix { flatten, .. } => {
            let op_token = ctx.nursery.token_id_by(0);
            ctx.nursery.advance();
            let mut children = vec![lhs];
            children.push(parse_expr(ctx, next_min_level(&reg.precedence))?);
            if flatten {
                loop {
                    if ctx.nursery.is_eof_by(0) || ctx.nursery.token_id_by(0) != op_token {
                        break;
                    }
                    let (_, prev_end) = children.last().expect("flatten group has a left operand").range();
                    let op_begin = ctx.nursery.token_index();
                    if op_begin != prev_end {
                        return Err(SilvaError::new(
                            Severity::Minor,
                            op_begin,
                            "flatten group operator does not immediately follow its left operand",
                        ));
                    }
                    ctx.nursery.advance();
                    let op_end = ctx.nursery.token_index();
                    let next = parse_expr(ctx, next_min_level(&reg.precedence))?;
                    let (next_begin, _) = next.range();
                    if next_begin != op_end {
                        return Err(SilvaError::new(
                            Severity::Minor,
                            next_begin,
                            "flatten group operand does not immediately follow its operator",
                        ));
                    }
                    children.push(next);
                }
            }
            let token_end = ctx.nursery.token_index();
            Ok(StitchItem::Node {
                name: reg.name,
                children,
                token_begin,
                token_end,
            })
        }
        _ => unreachable!("non-regular operator kind reached apply_regular"),
    }
}

fn apply_concat<'t, F>(ctx: &mut Ctx<'_, 't, F>, lhs: StitchItem, concat: ResultOper) -> Result<StitchItem>
where
    F: FnMut(&mut Nursery<'t>) -> Result<ProtoNode>,
{
    let (token_begin, _) = lhs.range();
    let mut children = vec![lhs];
    children.push(parse_expr(ctx, next_min_level(&concat.precedence))?);
    loop {
        if ctx.nursery.is_eof_by(0) {
            break;
        }
        let tok = ctx.nursery.token_id_by(0);
        let entry = ctx.spec.entries.get(&tok);
        if entry.map_or(false, |e| e.is_right_bracket || e.regular.is_some()) {
            break;
        }
        children.push(parse_expr(ctx, next_min_level(&concat.precedence))?);
    }
    let token_end = ctx.nursery.token_index();
    Ok(StitchItem::Node {
        name: concat.name,
        children,
        token_begin,
        token_end,
    })
}

fn materialize<'t>(item: &StitchItem, scratch_base: u32, scratch: &[ParseTreeNode], nursery: &mut Nursery<'t>) -> ProtoNode {
    match item {
        StitchItem::Atom { scratch_start, size, token_begin, token_end } => {
            let local = (*scratch_start - scratch_base) as usize;
            let slice = &scratch[local..local + *size as usize];
            extend_nodes(nursery, slice);
            ProtoNode {
                rule_name: None,
                num_children: 1,
                subtree_size: *size,
                token_begin: *token_begin,
                token_end: *token_end,
                last_error: None,
            }
        }
        StitchItem::Node { name, children, token_begin, token_end } => {
            let node_index = raw_len(nursery);
            push_node(nursery, ParseTreeNode { rule_name: *name, num_children: 0, subtree_size: 0, token_begin: *token_begin, token_end: *token_end });
            let mut acc = ProtoNode {
                rule_name: Some(*name),
                num_children: 0,
                subtree_size: 1,
                token_begin: *token_begin,
                token_end: *token_end,
                last_error: None,
            };
            for child in children {
                let child_proto = materialize(child, scratch_base, scratch, nursery);
                acc.num_children += child_proto.num_children;
                acc.subtree_size += child_proto.subtree_size;
            }
            set_node(
                nursery,
                node_index,
                ParseTreeNode {
                    rule_name: *name,
                    num_children: acc.num_children,
                    subtree_size: acc.subtree_size,
                    token_begin: *token_begin,
                    token_end: *token_end,
                },
            );
            ProtoNode {
                rule_name: None,
                num_children: 1,
                subtree_size: acc.subtree_size,
                token_begin: *token_begin,
                token_end: *token_end,
                last_error: None,
            }
        }
    }
}

// Small crate-internal windows into `Nursery`'s private node vector, needed
// only by the stitching pass above (ordinary rule matching goes through
// `Stake` and never needs this).
fn raw_len(nursery: &Nursery) -> u32 {
    nursery.raw_nodes().len() as u32
}
fn nodes_slice(nursery: &Nursery) -> &[ParseTreeNode] {
    nursery.raw_nodes()
}
fn truncate_nodes(nursery: &mut Nursery, len: u32) {
    nursery.raw_nodes_mut().truncate(len as usize);
}
fn push_node(nursery: &mut Nursery, node: ParseTreeNode) {
    nursery.raw_nodes_mut().push(node);
}
fn set_node(nursery: &mut Nursery, index: u32, node: ParseTreeNode) {
    nursery.raw_nodes_mut()[index as usize] = node;
}
fn extend_nodes(nursery: &mut Nursery, slice: &[ParseTreeNode]) {
    nursery.raw_nodes_mut().extend_from_slice(slice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenization::tokenize;

    fn arith_spec(ward: &mut Ward) -> (AxeSpec, NameId) {
        let axe_name = ward.name_id_of(&["Expr"]);
        let plus = ward.intern("+", crate::catalog::Category::Operator);
        let star = ward.intern("*", crate::catalog::Category::Operator);
        let lparen = ward.intern("(", crate::catalog::Category::Operator);
        let rparen = ward.intern(")", crate::catalog::Category::Operator);
        let parens = ward.intern("Parens", crate::catalog::Category::Identifier);
        let mul = ward.intern("Mul", crate::catalog::Category::Identifier);
        let add = ward.intern("Add", crate::catalog::Category::Identifier);
        let levels = vec![
            AxeLevelDesc {
                base_name: parens,
                assoc: Assoc::Nest,
                opers: vec![OperKind::AtomNest { left: lparen, right: rparen }],
            },
            AxeLevelDesc {
                base_name: mul,
                assoc: Assoc::Ltr,
                opers: vec![OperKind::Infix { token: star, flatten: false }],
            },
            AxeLevelDesc {
                base_name: add,
                assoc: Assoc::Ltr,
                opers: vec![OperKind::Infix { token: plus, flatten: false }],
            },
        ];
        let spec = AxeSpec::compile(ward, axe_name, &levels).unwrap();
        (spec, axe_name)
    }

    fn atom_fn(nursery: &mut Nursery, ward: &mut Ward, num_name: NameId) -> Result<ProtoNode> {
        let mut stake = nursery.stake();
        stake.create_node(num_name);
        let _ = ward;
        stake.advance();
        Ok(stake.commit())
    }

    #[test]
    fn respects_precedence_over_left_assoc() {
        let mut ward = Ward::new();
        let (spec, _axe_name) = arith_spec(&mut ward);
        let num_name = ward.name_id_of(&["Num"]);
        let tok = tokenize(&mut ward, "1 + 2 * 3").unwrap();
        let mut nursery = Nursery::new(&tok);
        let proto = parse(&mut nursery, &spec, |n| atom_fn(n, &mut Ward::new(), num_name)).unwrap();
        assert_eq!(proto.num_children, 1);
        let tree = nursery.finish();
        tree.check_invariants().unwrap();
        // root should be Add(1, Mul(2,3)): 5 nodes total (Add, 1, Mul, 2, 3)
        assert_eq!(tree.nodes.len(), 5);
    }

    #[test]
    fn parens_override_precedence() {
        let mut ward = Ward::new();
        let (spec, _axe_name) = arith_spec(&mut ward);
        let num_name = ward.name_id_of(&["Num"]);
        let tok = tokenize(&mut ward, "( 1 + 2 ) * 3").unwrap();
        let mut nursery = Nursery::new(&tok);
        let proto = parse(&mut nursery, &spec, |n| atom_fn(n, &mut Ward::new(), num_name)).unwrap();
        assert_eq!(proto.num_children, 1);
        let tree = nursery.finish();
        tree.check_invariants().unwrap();
        // root Mul(Parens(Add(1,2)),3): Mul, Parens, Add, 1, 2, 3
        assert_eq!(tree.nodes.len(), 6);
    }
}
