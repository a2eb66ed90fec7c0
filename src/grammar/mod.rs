//! Compiles Seed source text into a [Grammar]: a set of named rule
//! expressions, nested scopes, axe tables and cached derived data (regex
//! patterns, keyword sets) ready for [crate::interp] to walk.
//!
//! The compiler does not build its own tree shape for rule bodies — it reuses
//! [crate::seed_syntax]'s bootstrap recognizer to produce the tree, then
//! walks that tree once to resolve every name path it contains and to
//! collect the handful of things worth precomputing once rather than on
//! every match attempt (regex compilation, literal unquoting, axe
//! compilation). Everything the interpreter needs to re-derive at run time —
//! which alternative of an `Or` matched, what a `Concat`'s children are —
//! stays implicit in the tree shape itself and is read off `Grammar`'s
//! stored [ParseTree] directly, the same way [crate::tree] was designed to
//! carry no payload beyond a node's name and token span.
pub mod name_style;
pub mod names;

use crate::axe::{Assoc, AxeLevelDesc, AxeSpec, OperKind};
use crate::catalog::{Category, NameId, TokenId, Ward, NAME_ID_ROOT};
use crate::error::{Result, Severity, SilvaError};
use crate::tokenization::{self, unquote_string, Tokenization};
use crate::tree::{ParseTree, ParseTreeNode};
use names::SeedNames;
use std::collections::{HashMap, HashSet};

fn child_indices(nodes: &[ParseTreeNode], index: u32) -> Vec<u32> {
    let node = nodes[index as usize];
    let mut out = Vec::with_capacity(node.num_children as usize);
    let mut cursor = index + 1;
    for _ in 0..node.num_children {
        out.push(cursor);
        cursor += nodes[cursor as usize].subtree_size;
    }
    out
}

fn is_identifier_shaped(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// A compiled grammar: rule bodies, aliases, axe tables, and the name/regex
/// resolution an interpreter would otherwise have to redo on every match.
///
/// Owns the Seed source's own [ParseTree] and [Tokenization] rather than
/// borrowing them, since `rule_exprs`/`nonterminal_rules` store raw indices
/// into that specific tree, and recovering a leaf's text (a name path, a
/// quoted literal, a function name) means re-reading its token range out of
/// that same tokenization.
pub struct Grammar {
    tree: ParseTree,
    tokenization: Tokenization,
    names: SeedNames,
    rule_exprs: HashMap<NameId, u32>,
    aliases: HashMap<NameId, NameId>,
    nonterminal_rules: HashMap<u32, NameId>,
    regex_cache: HashMap<TokenId, regex::Regex>,
    axes: HashMap<NameId, AxeSpec>,
    axe_atoms: HashMap<NameId, u32>,
    keyword_scopes: HashMap<NameId, HashSet<TokenId>>,
    string_to_keyword: HashMap<TokenId, TokenId>,
}

impl Grammar {
    /// Tokenizes and compiles `source` as Seed grammar text.
    pub fn compile(ward: &mut Ward, source: &str) -> Result<Self> {
        let tokenization = tokenization::tokenize(ward, source)?;
        let tree = crate::seed_syntax::parse(ward, &tokenization)?;
        Self::compile_tree(ward, tree, tokenization)
    }

    /// Compiles an already-parsed Seed-describing-Seed tree. Used directly
    /// by the self-parse fixpoint check, which needs to compare this
    /// bootstrap route against a tree obtained by interpreting a compiled
    /// Seed grammar over the same source.
    pub fn compile_tree(ward: &mut Ward, tree: ParseTree, tokenization: Tokenization) -> Result<Self> {
        let names = SeedNames::new(ward);
        let mut builder = Builder {
            ward,
            names,
            rule_exprs: HashMap::new(),
            aliases: HashMap::new(),
            nonterminal_rules: HashMap::new(),
            regex_cache: HashMap::new(),
            axes: HashMap::new(),
            axe_atoms: HashMap::new(),
            keyword_scopes: HashMap::new(),
            string_to_keyword: HashMap::new(),
        };
        builder.walk_rule_list(&tree, &tokenization, 0, NAME_ID_ROOT)?;
        Ok(Grammar {
            tree,
            tokenization,
            names,
            rule_exprs: builder.rule_exprs,
            aliases: builder.aliases,
            nonterminal_rules: builder.nonterminal_rules,
            regex_cache: builder.regex_cache,
            axes: builder.axes,
            axe_atoms: builder.axe_atoms,
            keyword_scopes: builder.keyword_scopes,
            string_to_keyword: builder.string_to_keyword,
        })
    }

    pub fn names(&self) -> &SeedNames {
        &self.names
    }

    /// The Seed source's own parse tree, which doubles as the "bytecode" an
    /// interpreter walks: a rule's node index in `rule_exprs` points here.
    pub fn grammar_tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn grammar_tokenization(&self) -> &Tokenization {
        &self.tokenization
    }

    pub fn expr_node(&self, index: u32) -> ParseTreeNode {
        self.tree.nodes[index as usize]
    }

    pub fn expr_children(&self, index: u32) -> Vec<u32> {
        child_indices(&self.tree.nodes, index)
    }

    pub fn rule_expr(&self, name: NameId) -> Option<u32> {
        self.rule_exprs.get(&name).copied()
    }

    pub fn alias_target(&self, name: NameId) -> Option<NameId> {
        self.aliases.get(&name).copied()
    }

    pub fn axe(&self, name: NameId) -> Option<&AxeSpec> {
        self.axes.get(&name)
    }

    /// The atom rule an axe rule delegates to between operators, resolved
    /// the same way any other `Nonterminal` reference is.
    pub fn axe_atom_rule(&self, name: NameId) -> Option<NameId> {
        self.axe_atoms.get(&name).map(|&index| self.resolved_nonterminal(index))
    }

    pub fn is_defined(&self, name: NameId) -> bool {
        self.rule_exprs.contains_key(&name) || self.aliases.contains_key(&name) || self.axes.contains_key(&name)
    }

    /// The name a `Nonterminal`- or `NontermRef`-tagged node at `node_index`
    /// resolves to. Every such node in the tree was resolved once at compile
    /// time, so this is an infallible lookup rather than a re-resolution.
    pub fn resolved_nonterminal(&self, node_index: u32) -> NameId {
        self.nonterminal_rules[&node_index]
    }

    pub fn regex_for(&self, quoted_token: TokenId) -> Option<&regex::Regex> {
        self.regex_cache.get(&quoted_token)
    }

    /// The unquoted token a quoted string literal's `TokenId` stands for.
    pub fn unquoted_of(&self, quoted_token: TokenId) -> Option<TokenId> {
        self.string_to_keyword.get(&quoted_token).copied()
    }

    /// True if `token` was used as an identifier-shaped literal anywhere
    /// within `scope` or one of its nested rules.
    pub fn is_keyword(&self, scope: NameId, token: TokenId) -> bool {
        self.keyword_scopes.get(&scope).map_or(false, |set| set.contains(&token))
    }
}

/// Mutable compile-time state, separate from [Grammar] itself so the walk
/// can hold a `&mut Ward` alongside shared `&ParseTree`/`&Tokenization`
/// borrows without the two ever aliasing.
struct Builder<'w> {
    ward: &'w mut Ward,
    names: SeedNames,
    rule_exprs: HashMap<NameId, u32>,
    aliases: HashMap<NameId, NameId>,
    nonterminal_rules: HashMap<u32, NameId>,
    regex_cache: HashMap<TokenId, regex::Regex>,
    axes: HashMap<NameId, AxeSpec>,
    axe_atoms: HashMap<NameId, u32>,
    keyword_scopes: HashMap<NameId, HashSet<TokenId>>,
    string_to_keyword: HashMap<TokenId, TokenId>,
}

impl<'w> Builder<'w> {
    fn walk_rule_list(&mut self, tree: &ParseTree, tok: &Tokenization, list_index: u32, scope: NameId) -> Result<()> {
        for rule_index in child_indices(&tree.nodes, list_index) {
            self.walk_rule(tree, tok, rule_index, scope)?;
        }
        Ok(())
    }

    fn walk_rule(&mut self, tree: &ParseTree, tok: &Tokenization, rule_index: u32, scope: NameId) -> Result<()> {
        let children = child_indices(&tree.nodes, rule_index);
        debug_assert_eq!(children.len(), 2);
        let name_index = children[0];
        let body_index = children[1];
        let name_node = tree.nodes[name_index as usize];
        let resolved = name_style::resolve_path(self.ward, tok, scope, name_node.token_begin, name_node.token_end)?;
        self.nonterminal_rules.insert(name_index, resolved);

        let body_node = tree.nodes[body_index as usize];
        let body_children = child_indices(&tree.nodes, body_index);
        let n = self.names;

        if body_node.rule_name == n.body_def {
            self.check_fresh(resolved, name_node.token_begin)?;
            let expr_index = body_children[0];
            self.rule_exprs.insert(resolved, expr_index);
            self.walk_expr(tree, tok, expr_index, resolved)?;
        } else if body_node.rule_name == n.body_alias {
            self.check_fresh(resolved, name_node.token_begin)?;
            let target_index = body_children[0];
            let target_node = tree.nodes[target_index as usize];
            let target =
                name_style::resolve_path(self.ward, tok, scope, target_node.token_begin, target_node.token_end)?;
            self.nonterminal_rules.insert(target_index, target);
            self.aliases.insert(resolved, target);
        } else if body_node.rule_name == n.body_scope {
            let inner_root = body_children[0];
            self.walk_rule_list(tree, tok, inner_root, resolved)?;
        } else if body_node.rule_name == n.body_axe {
            self.check_fresh(resolved, name_node.token_begin)?;
            self.walk_axe(tree, tok, &body_children, resolved, scope)?;
        } else {
            return Err(SilvaError::new(
                Severity::Assert,
                name_node.token_begin,
                "rule body tagged with an unrecognized node kind",
            ));
        }
        Ok(())
    }

    fn check_fresh(&self, name: NameId, token_index: u32) -> Result<()> {
        if self.is_taken(name) {
            return Err(SilvaError::new(
                Severity::BrokenSeed,
                token_index,
                format!("'{}' is defined more than once", self.ward.absolute(name)),
            ));
        }
        Ok(())
    }

    fn is_taken(&self, name: NameId) -> bool {
        self.rule_exprs.contains_key(&name) || self.aliases.contains_key(&name) || self.axes.contains_key(&name)
    }

    fn walk_expr(&mut self, tree: &ParseTree, tok: &Tokenization, index: u32, scope: NameId) -> Result<()> {
        let node = tree.nodes[index as usize];
        let children = child_indices(&tree.nodes, index);
        let n = self.names;

        if node.rule_name == n.nonterminal {
            let resolved = name_style::resolve_path(self.ward, tok, scope, node.token_begin, node.token_end)?;
            self.nonterminal_rules.insert(index, resolved);
            return Ok(());
        }
        if node.rule_name == n.expr_nonterm_ref {
            let path_end = path_end_before_arrow(tok, node.token_begin, node.token_end);
            let resolved = name_style::resolve_path(self.ward, tok, scope, node.token_begin, path_end)?;
            self.nonterminal_rules.insert(index, resolved);
            return Ok(());
        }
        if node.rule_name == n.term_literal {
            self.register_literal(tree, tok, index, scope)?;
            return Ok(());
        }
        if node.rule_name == n.term_identifier || node.rule_name == n.term_operator {
            if let Some(&lit_index) = children.first() {
                self.register_regex(tree, tok, lit_index)?;
            }
            return Ok(());
        }
        // Structural nodes (Or, Concat, Not, Opt, Star, Plus, Paren,
        // FuncCall, KeywordsOf's Nonterminal child, ...): recurse, no node
        // of its own to register.
        for child in children {
            self.walk_expr(tree, tok, child, scope)?;
        }
        Ok(())
    }

    fn register_literal(&mut self, tree: &ParseTree, tok: &Tokenization, index: u32, scope: NameId) -> Result<()> {
        let node = tree.nodes[index as usize];
        let quoted_tok = tok.token_id(node.token_begin);
        let unquoted = unquote_string(tok.text_of(node.token_begin))?;
        let identifier_shaped = is_identifier_shaped(&unquoted);
        let category = if identifier_shaped { Category::Identifier } else { Category::Operator };
        let unquoted_tok = self.ward.intern(&unquoted, category);
        self.string_to_keyword.insert(quoted_tok, unquoted_tok);
        if identifier_shaped {
            self.register_keyword(scope, unquoted_tok);
        }
        Ok(())
    }

    fn register_keyword(&mut self, owner: NameId, token: TokenId) {
        let mut cur = owner;
        loop {
            self.keyword_scopes.entry(cur).or_default().insert(token);
            if cur == NAME_ID_ROOT {
                break;
            }
            cur = self.ward.parent_of(cur);
        }
    }

    fn register_regex(&mut self, tree: &ParseTree, tok: &Tokenization, lit_index: u32) -> Result<()> {
        let node = tree.nodes[lit_index as usize];
        let quoted_tok = tok.token_id(node.token_begin);
        if self.regex_cache.contains_key(&quoted_tok) {
            return Ok(());
        }
        let pattern = unquote_string(tok.text_of(node.token_begin))?;
        let re = regex::Regex::new(&pattern).map_err(|e| {
            SilvaError::new(
                Severity::BrokenSeed,
                node.token_begin,
                format!("invalid regex pattern '{pattern}': {e}"),
            )
        })?;
        self.regex_cache.insert(quoted_tok, re);
        Ok(())
    }

    fn walk_axe(
        &mut self,
        tree: &ParseTree,
        tok: &Tokenization,
        body_children: &[u32],
        axe_name: NameId,
        scope: NameId,
    ) -> Result<()> {
        let atom_index = body_children[0];
        let atom_node = tree.nodes[atom_index as usize];
        let atom_target =
            name_style::resolve_path(self.ward, tok, scope, atom_node.token_begin, atom_node.token_end)?;
        self.nonterminal_rules.insert(atom_index, atom_target);
        self.axe_atoms.insert(axe_name, atom_index);

        let mut levels = Vec::with_capacity(body_children.len() - 1);
        for &level_index in &body_children[1..] {
            levels.push(self.build_level(tree, tok, level_index)?);
        }
        let spec = AxeSpec::compile(self.ward, axe_name, &levels)?;
        self.axes.insert(axe_name, spec);
        Ok(())
    }

    fn build_level(&mut self, tree: &ParseTree, tok: &Tokenization, level_index: u32) -> Result<AxeLevelDesc> {
        let node = tree.nodes[level_index as usize];
        let n = self.names;
        let assoc = if node.rule_name == n.axe_level_nest {
            Assoc::Nest
        } else if node.rule_name == n.axe_level_ltr {
            Assoc::Ltr
        } else if node.rule_name == n.axe_level_rtl {
            Assoc::Rtl
        } else {
            return Err(SilvaError::new(
                Severity::Assert,
                node.token_begin,
                "axe level tagged with an unrecognized node kind",
            ));
        };
        let children = child_indices(&tree.nodes, level_index);
        let path_node = tree.nodes[children[0] as usize];
        let base_name = self.level_base_token(tok, path_node)?;

        let mut opers = Vec::new();
        for &group_index in &children[1..] {
            self.build_oper_group(tree, tok, group_index, &mut opers)?;
        }
        Ok(AxeLevelDesc { base_name, assoc, opers })
    }

    /// An axe level's or atom's name is a plain local label, not a path into
    /// an existing scope — it becomes a child of the axe's own rule name
    /// (see `AxeSpec::compile`), so unlike a `Nonterminal` reference it must
    /// be a single bare token.
    fn level_base_token(&mut self, tok: &Tokenization, path_node: ParseTreeNode) -> Result<TokenId> {
        if path_node.num_tokens() != 1 {
            return Err(SilvaError::new(
                Severity::BrokenSeed,
                path_node.token_begin,
                "an axe level name must be a single unqualified identifier",
            ));
        }
        let text = tok.text_of(path_node.token_begin);
        Ok(self.ward.intern(text, Category::Identifier))
    }

    fn build_oper_group(
        &mut self,
        tree: &ParseTree,
        tok: &Tokenization,
        group_index: u32,
        out: &mut Vec<OperKind>,
    ) -> Result<()> {
        let node = tree.nodes[group_index as usize];
        let n = self.names;
        let lit_indices = child_indices(&tree.nodes, group_index);
        let mut tokens = Vec::with_capacity(lit_indices.len());
        for &lit_index in &lit_indices {
            let lit_node = tree.nodes[lit_index as usize];
            let text = unquote_string(tok.text_of(lit_node.token_begin))?;
            let category = if is_identifier_shaped(&text) { Category::Identifier } else { Category::Operator };
            tokens.push(self.ward.intern(&text, category));
        }

        if node.rule_name == n.axe_op_prefix {
            out.extend(tokens.into_iter().map(|token| OperKind::Prefix { token }));
        } else if node.rule_name == n.axe_op_postfix {
            out.extend(tokens.into_iter().map(|token| OperKind::Postfix { token }));
        } else if node.rule_name == n.axe_op_infix {
            out.extend(tokens.into_iter().map(|token| OperKind::Infix { token, flatten: false }));
        } else if node.rule_name == n.axe_op_infix_flat {
            out.extend(tokens.into_iter().map(|token| OperKind::Infix { token, flatten: true }));
        } else if node.rule_name == n.axe_op_atom_nest {
            push_bracket_pairs(tokens, node.token_begin, |left, right| OperKind::AtomNest { left, right }, out)?;
        } else if node.rule_name == n.axe_op_prefix_nest {
            push_bracket_pairs(tokens, node.token_begin, |left, right| OperKind::PrefixNest { left, right }, out)?;
        } else if node.rule_name == n.axe_op_postfix_nest {
            push_bracket_pairs(tokens, node.token_begin, |left, right| OperKind::PostfixNest { left, right }, out)?;
        } else if node.rule_name == n.axe_op_ternary {
            push_bracket_pairs(tokens, node.token_begin, |first, second| OperKind::Ternary { first, second }, out)?;
        } else {
            return Err(SilvaError::new(
                Severity::Assert,
                node.token_begin,
                "axe operator group tagged with an unrecognized node kind",
            ));
        }
        Ok(())
    }
}

fn path_end_before_arrow(tok: &Tokenization, begin: u32, end: u32) -> u32 {
    let mut i = begin;
    while i < end {
        if tok.text_of(i) == "->" {
            return i;
        }
        i += 1;
    }
    end
}

fn push_bracket_pairs(
    tokens: Vec<TokenId>,
    token_index: u32,
    make: impl Fn(TokenId, TokenId) -> OperKind,
    out: &mut Vec<OperKind>,
) -> Result<()> {
    if tokens.is_empty() || tokens.len() % 2 != 0 {
        return Err(SilvaError::new(
            Severity::BrokenSeed,
            token_index,
            "this axe operator kind needs its literals in left/right pairs",
        ));
    }
    for pair in tokens.chunks_exact(2) {
        out.push(make(pair[0], pair[1]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nursery::Nursery;

    #[test]
    fn compiles_simple_definition() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(&mut ward, "- Foo = 'a' 'b'").unwrap();
        let foo = ward.name_id_of(&["Foo"]);
        assert!(grammar.rule_expr(foo).is_some());
    }

    #[test]
    fn resolves_alias_target() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(&mut ward, "- Foo => Bar\n- Bar = 'x'").unwrap();
        let foo = ward.name_id_of(&["Foo"]);
        let bar = ward.name_id_of(&["Bar"]);
        assert_eq!(grammar.alias_target(foo), Some(bar));
    }

    #[test]
    fn nests_scoped_rules_under_the_enclosing_name() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(&mut ward, "- Foo =[ - Bar = 'x' ]").unwrap();
        let nested_bar = ward.name_id_of(&["Foo", "Bar"]);
        assert!(grammar.rule_expr(nested_bar).is_some());
        // `Foo` itself is a namespace, not a rule.
        let foo = ward.name_id_of(&["Foo"]);
        assert!(!grammar.is_defined(foo));
    }

    #[test]
    fn rejects_redefinition() {
        let mut ward = Ward::new();
        let err = Grammar::compile(&mut ward, "- Foo = 'a'\n- Foo = 'b'").unwrap_err();
        assert_eq!(err.severity, Severity::BrokenSeed);
    }

    #[test]
    fn caches_regex_for_refined_terminals() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(&mut ward, "- Foo = identifier/'^[A-Z]'").unwrap();
        let foo = ward.name_id_of(&["Foo"]);
        let expr_index = grammar.rule_expr(foo).unwrap();
        let lit_index = grammar.expr_children(expr_index)[0];
        let lit_node = grammar.expr_node(lit_index);
        let quoted_tok = grammar.grammar_tokenization().token_id(lit_node.token_begin);
        assert!(grammar.regex_for(quoted_tok).unwrap().is_match("Zebra"));
    }

    #[test]
    fn collects_identifier_shaped_literals_as_keywords() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(&mut ward, "- Foo = 'if' 'then'").unwrap();
        let foo = ward.name_id_of(&["Foo"]);
        let if_tok = ward.intern("if", Category::Identifier);
        assert!(grammar.is_keyword(foo, if_tok));
        assert!(grammar.is_keyword(NAME_ID_ROOT, if_tok));
    }

    #[test]
    fn compiles_axe_body_into_a_working_spec() {
        let mut ward = Ward::new();
        let grammar =
            Grammar::compile(&mut ward, "- Expr =/ atom Num ltr Mul infix '*' ltr Add infix '+'").unwrap();
        let expr_name = ward.name_id_of(&["Expr"]);
        let spec = grammar.axe(expr_name).expect("axe spec registered");

        let num_name = ward.name_id_of(&["Num"]);
        let tok = tokenization::tokenize(&mut ward, "1 + 2 * 3").unwrap();
        let mut nursery = Nursery::new(&tok);
        let proto = crate::axe::parse(&mut nursery, spec, |n| {
            let mut stake = n.stake();
            stake.create_node(num_name);
            stake.advance();
            Ok(stake.commit())
        })
        .unwrap();
        assert_eq!(proto.num_children, 1);
        let tree = nursery.finish();
        tree.check_invariants().unwrap();
        assert_eq!(tree.nodes.len(), 5);
    }
}
