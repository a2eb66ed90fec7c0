//! `seedling` — a grammar-driven parser toolkit.
//!
//! Given a grammar written in the small Seed meta-language, this crate
//! produces a parser that turns a token stream into a typed, immutable parse
//! tree. Three pieces do the real work:
//!
//! - [catalog] interns token text and hierarchical rule names.
//! - [grammar] compiles Seed source into a [grammar::Grammar]: an index of
//!   rule bodies, axe (operator-precedence) tables, keyword sets and
//!   compiled regexes.
//! - [interp] walks a compiled grammar's rules against a
//!   [tokenization::Tokenization], using a [nursery::Nursery] to build the
//!   output [tree::ParseTree]. Rules declared as an `Axe` delegate to [axe]
//!   for precedence-climbing.
//!
//! # Example
//!
//! ```
//! use seedling::catalog::Ward;
//! use seedling::grammar::Grammar;
//! use seedling::interp::SeedInterpreter;
//! use seedling::tokenization;
//!
//! let mut ward = Ward::new();
//! let grammar = Grammar::compile(
//!     &mut ward,
//!     "- Expr =/ atom Num ltr Mul infix '*' ltr Add infix '+'\n- Num = number",
//! )
//! .unwrap();
//! let expr = ward.name_id_of(&["Expr"]);
//!
//! let tokens = tokenization::tokenize(&mut ward, "1 + 2 * 3").unwrap();
//! let interp = SeedInterpreter::new(&grammar);
//! let tree = interp.apply(&mut ward, &tokens, expr).unwrap();
//! tree.check_invariants().unwrap();
//! assert_eq!(ward.absolute(tree.nodes[0].rule_name), "Expr.Add.+");
//! ```
//!
//! # Scope
//!
//! Tokenization (beyond the minimal bootstrap lexer in [tokenization]), file
//! I/O, CLI drivers, and interpreters or pretty-printers built atop a
//! produced tree are deliberately out of scope for this crate; see the
//! module docs on [interp] and [axe] for the boundary each piece owns.
//!
//! # License
//! Provided under the MIT license, matching the crate this one is descended
//! from ([lang_pt](https://github.com/creative-forest/lang-pt)).
pub mod axe;
pub mod catalog;
pub mod error;
pub mod grammar;
pub mod interp;
mod log;
pub mod nursery;
mod seed_syntax;
pub mod tokenization;
pub mod tree;

pub use catalog::{Category, NameId, TokenId, Ward};
pub use error::{Result, Severity, SilvaError};
pub use grammar::Grammar;
pub use interp::SeedInterpreter;
pub use tree::{ParseTree, ParseTreeNode, ParseTreeSpan};

#[cfg(test)]
mod tests {
    use super::*;

    /// End-to-end scenario 2 (spec §8): a `rtl` axe level nests to the right.
    #[test]
    fn right_associative_assignment_nests_rightward() {
        let mut ward = Ward::new();
        let grammar =
            Grammar::compile(&mut ward, "- Expr =/ atom Id rtl Assign infix '='\n- Id = identifier").unwrap();
        let expr = ward.name_id_of(&["Expr"]);
        let tok = tokenization::tokenize(&mut ward, "a = b = c").unwrap();
        let interp = SeedInterpreter::new(&grammar);
        let tree = interp.apply(&mut ward, &tok, expr).unwrap();
        tree.check_invariants().unwrap();

        let span = tree.root(&ward).unwrap();
        assert_eq!(span.absolute_name(), "Expr.Assign.=");
        let children = span.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].absolute_name(), "Id");
        assert_eq!(children[1].absolute_name(), "Expr.Assign.=");
        let grandchildren = children[1].children();
        assert_eq!(grandchildren[0].absolute_name(), "Id");
        assert_eq!(grandchildren[1].absolute_name(), "Id");
    }

    /// End-to-end scenario 3 (spec §8): `infix_flat` collapses a repeated
    /// operator into one variadic node instead of a left- or right-skewed
    /// chain.
    #[test]
    fn flat_operator_produces_one_variadic_node() {
        let mut ward = Ward::new();
        let grammar =
            Grammar::compile(&mut ward, "- Expr =/ atom Num ltr Comma infix_flat ','\n- Num = number").unwrap();
        let expr = ward.name_id_of(&["Expr"]);
        let tok = tokenization::tokenize(&mut ward, "1,2,3,4").unwrap();
        let interp = SeedInterpreter::new(&grammar);
        let tree = interp.apply(&mut ward, &tok, expr).unwrap();
        tree.check_invariants().unwrap();

        let span = tree.root(&ward).unwrap();
        assert_eq!(span.absolute_name(), "Expr.Comma.,");
        assert_eq!(span.children().len(), 4);
    }

    /// End-to-end scenario 4 (spec §8): an `atom_nest` parenthesized atom, a
    /// `postfix_nest` call and an `rtl` `prefix` unary compose correctly:
    /// `-f(x)` parses as `Unary(Call(f, x))`.
    #[test]
    fn nested_brackets_and_postfix_call_compose_with_prefix() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(
            &mut ward,
            "- Expr =/ atom Id \
             nest Primary atom_nest '(' ')' \
             ltr Call postfix_nest '(' ')' \
             rtl Unary prefix '-'\n\
             - Id = identifier",
        )
        .unwrap();
        let expr = ward.name_id_of(&["Expr"]);
        let tok = tokenization::tokenize(&mut ward, "-f(x)").unwrap();
        let interp = SeedInterpreter::new(&grammar);
        let tree = interp.apply(&mut ward, &tok, expr).unwrap();
        tree.check_invariants().unwrap();

        let span = tree.root(&ward).unwrap();
        assert_eq!(span.absolute_name(), "Expr.Unary.-");
        let call = span.children();
        assert_eq!(call.len(), 1);
        assert_eq!(call[0].absolute_name(), "Expr.Call.(");
        let call_children = call[0].children();
        assert_eq!(call_children.len(), 2);
        assert_eq!(call_children[0].absolute_name(), "Id");
        assert_eq!(call_children[1].absolute_name(), "Id");
    }

    /// A ternary axe operator consumes its middle operand between the two
    /// literal tokens and its right operand via ordinary precedence-climbing.
    #[test]
    fn ternary_operator_consumes_three_operands() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(
            &mut ward,
            "- Expr =/ atom Id ltr Cond ternary '?' ':'\n- Id = identifier",
        )
        .unwrap();
        let expr = ward.name_id_of(&["Expr"]);
        let tok = tokenization::tokenize(&mut ward, "a ? b : c").unwrap();
        let interp = SeedInterpreter::new(&grammar);
        let tree = interp.apply(&mut ward, &tok, expr).unwrap();
        tree.check_invariants().unwrap();

        let span = tree.root(&ward).unwrap();
        assert_eq!(span.absolute_name(), "Expr.Cond.?");
        assert_eq!(span.children().len(), 3);
    }

    /// Rendering round-trips through both the indented dump and the Graphviz
    /// exporter without panicking, for a tree with real structure.
    #[test]
    fn tree_renders_as_text_and_graphviz() {
        let mut ward = Ward::new();
        let grammar = Grammar::compile(
            &mut ward,
            "- Expr =/ atom Num ltr Mul infix '*' ltr Add infix '+'\n- Num = number",
        )
        .unwrap();
        let expr = ward.name_id_of(&["Expr"]);
        let tok = tokenization::tokenize(&mut ward, "1 + 2 * 3").unwrap();
        let interp = SeedInterpreter::new(&grammar);
        let tree = interp.apply(&mut ward, &tok, expr).unwrap();

        let span = tree.root(&ward).unwrap();
        let text = span.to_string_tree(false);
        assert!(text.contains("Expr.Add.+"));
        let dot = span.to_graphviz();
        assert!(dot.starts_with("digraph parse_tree {"));
        assert!(dot.contains("->"));
    }
}
