//! Fixed node-kind names used by the Seed-describing-Seed tree.
//!
//! [seed_syntax](crate::seed_syntax) produces a [ParseTree](crate::tree::ParseTree)
//! whose node `rule_name`s come from this fixed vocabulary (one `NameId` per
//! syntactic construct of the Seed meta-language: `Or`, `Concat`, a terminal
//! kind, an axe operator kind, ...). [crate::grammar] walks that vocabulary
//! to build a [Grammar](crate::grammar::Grammar); nothing about it is
//! user-grammar-specific, so it is computed once per [Ward] and shared.
use crate::catalog::{NameId, Ward};

#[derive(Debug, Clone, Copy)]
pub struct SeedNames {
    pub root: NameId,
    pub rule: NameId,
    pub nonterminal: NameId,
    pub var: NameId,
    pub lit: NameId,

    pub body_def: NameId,
    pub body_alias: NameId,
    pub body_scope: NameId,
    pub body_axe: NameId,

    pub axe_level_nest: NameId,
    pub axe_level_ltr: NameId,
    pub axe_level_rtl: NameId,

    pub axe_op_atom_nest: NameId,
    pub axe_op_prefix_nest: NameId,
    pub axe_op_prefix: NameId,
    pub axe_op_postfix: NameId,
    pub axe_op_postfix_nest: NameId,
    pub axe_op_infix: NameId,
    pub axe_op_infix_flat: NameId,
    pub axe_op_ternary: NameId,

    pub expr_or: NameId,
    pub expr_and: NameId,
    pub expr_concat: NameId,
    pub expr_not: NameId,
    pub expr_opt: NameId,
    pub expr_star: NameId,
    pub expr_plus: NameId,
    pub expr_paren: NameId,
    pub expr_nonterm_ref: NameId,
    pub expr_func_call: NameId,

    pub term_eof: NameId,
    pub term_epsilon: NameId,
    pub term_any: NameId,
    pub term_identifier: NameId,
    pub term_operator: NameId,
    pub term_string: NameId,
    pub term_number: NameId,
    pub term_keywords_of: NameId,
    pub term_literal: NameId,
}

impl SeedNames {
    /// Interns the whole vocabulary under the `Seed` name. Idempotent:
    /// calling this twice on the same [Ward] yields identical ids, since
    /// [Ward::name_id_of] itself is idempotent.
    pub fn new(ward: &mut Ward) -> Self {
        let mut under = |parts: &[&str]| {
            let mut full = Vec::with_capacity(parts.len() + 1);
            full.push("Seed");
            full.extend_from_slice(parts);
            ward.name_id_of(&full)
        };
        Self {
            root: under(&[]),
            rule: under(&["Rule"]),
            nonterminal: under(&["Nonterminal"]),
            var: under(&["Var"]),
            lit: under(&["Lit"]),

            body_def: under(&["Body", "Def"]),
            body_alias: under(&["Body", "Alias"]),
            body_scope: under(&["Body", "Scope"]),
            body_axe: under(&["Body", "Axe"]),

            axe_level_nest: under(&["Axe", "Level", "Nest"]),
            axe_level_ltr: under(&["Axe", "Level", "Ltr"]),
            axe_level_rtl: under(&["Axe", "Level", "Rtl"]),

            axe_op_atom_nest: under(&["Axe", "Op", "AtomNest"]),
            axe_op_prefix_nest: under(&["Axe", "Op", "PrefixNest"]),
            axe_op_prefix: under(&["Axe", "Op", "Prefix"]),
            axe_op_postfix: under(&["Axe", "Op", "Postfix"]),
            axe_op_postfix_nest: under(&["Axe", "Op", "PostfixNest"]),
            axe_op_infix: under(&["Axe", "Op", "Infix"]),
            axe_op_infix_flat: under(&["Axe", "Op", "InfixFlat"]),
            axe_op_ternary: under(&["Axe", "Op", "Ternary"]),

            expr_or: under(&["Expr", "Or"]),
            expr_and: under(&["Expr", "And"]),
            expr_concat: under(&["Expr", "Concat"]),
            expr_not: under(&["Expr", "Not"]),
            expr_opt: under(&["Expr", "Opt"]),
            expr_star: under(&["Expr", "Star"]),
            expr_plus: under(&["Expr", "Plus"]),
            expr_paren: under(&["Expr", "Paren"]),
            expr_nonterm_ref: under(&["Expr", "NontermRef"]),
            expr_func_call: under(&["Expr", "FuncCall"]),

            term_eof: under(&["Term", "Eof"]),
            term_epsilon: under(&["Term", "Epsilon"]),
            term_any: under(&["Term", "Any"]),
            term_identifier: under(&["Term", "Identifier"]),
            term_operator: under(&["Term", "Operator"]),
            term_string: under(&["Term", "String"]),
            term_number: under(&["Term", "Number"]),
            term_keywords_of: under(&["Term", "KeywordsOf"]),
            term_literal: under(&["Term", "Literal"]),
        }
    }
}
