//! The bootstrap recognizer for Seed source text.
//!
//! This is a plain hand-written recursive-descent parser — not an
//! interpretation of a grammar, since Seed's own grammar is fixed and known
//! at compile time of this crate. It exists for two reasons (spec §8,
//! "self-parse fixpoint"): it is what [crate::grammar] runs to compile a
//! grammar description into a [Grammar](crate::grammar::Grammar) in the
//! first place, and it is the independent reference the self-hosted route
//! (parsing Seed-describing-Seed source through a *compiled* Seed grammar,
//! via [crate::interp]) is checked against.
//!
//! Grounded in the original's `seed.cpp` (`seed_parse`), adapted to the
//! richer construct set this spec's Seed dialect has over the original's
//! (variable bindings, function calls, axes): same `"-" Rule` top-level
//! shape, same `=`/`=>` derivation split, extended with `=[...]` (nested
//! scope) and `=/` (axe) bodies.
//!
//! Concrete syntax (the original never wrote one out for this richer
//! dialect; this is this crate's fixed concrete syntax for the spec's
//! abstract Seed language):
//!
//! ```text
//! Seed       := ("-" Rule)*
//! Rule       := NamePath Body
//! Body       := "=" Or | "=>" NamePath | "=[" Seed "]" | "=/" AxeBody
//! Or         := And ("|" And)*
//! And        := Concat ("but_then" Concat)*
//! Concat     := Unary+
//! Unary      := "not" Postfix | Postfix
//! Postfix    := Primary ("?" | "*" | "+")?
//! Primary    := "(" Or ")" | FuncCall | NontermRef | Terminal
//! FuncCall   := identifier "(" (Arg ("," Arg)*)? ")"
//! Arg        := Or
//! NontermRef := NamePath ("->" identifier)?
//! Terminal   := "end_of_file" | "epsilon" | "any" | "identifier" | "operator"
//!             | "string" | "number" | "keywords_of" NamePath
//!             | ("identifier" | "operator") "/" StringLiteral
//!             | StringLiteral
//! NamePath   := Component ("." Component)*
//! Component  := "_" | "x" | "p" | identifier
//! AxeBody    := "atom" NamePath Level+
//! Level      := ("nest" | "ltr" | "rtl") NamePath OperGroup+
//! OperGroup  := OperKind StringLiteral+
//! OperKind   := "atom_nest" | "prefix_nest" | "prefix" | "postfix"
//!             | "postfix_nest" | "infix" | "infix_flat" | "ternary"
//! ```
//!
//! Every production below follows the shape established by
//! [crate::axe]'s stitching pass: open a stake, fill it in, commit it, and
//! return the resulting [ProtoNode] for the caller to [Stake::absorb]. A
//! production that needs to conditionally wrap what it already parsed (the
//! postfix `?`/`*`/`+` suffix, whose presence is only known *after* the
//! primary has already been committed) reaches for
//! [Nursery::wrap_subtree] instead of trying to retrofit a [Stake] that has
//! already let its child commit.
use crate::catalog::Ward;
use crate::error::{Result, Severity, SilvaError};
use crate::grammar::names::SeedNames;
use crate::nursery::{Nursery, ProtoNode};
use crate::tokenization::Tokenization;
use crate::tree::ParseTree;

const TERMINAL_KEYWORDS: &[&str] = &[
    "end_of_file",
    "epsilon",
    "any",
    "identifier",
    "operator",
    "string",
    "number",
];
const OPER_KIND_KEYWORDS: &[&str] = &[
    "atom_nest",
    "prefix_nest",
    "prefix",
    "postfix",
    "postfix_nest",
    "infix",
    "infix_flat",
    "ternary",
];

fn peek<'t>(nursery: &Nursery<'t>, offset: u32) -> &'t str {
    nursery.tokenization.text_of(nursery.token_index() + offset)
}
fn at_eof(nursery: &Nursery, offset: u32) -> bool {
    nursery.is_eof_by(offset)
}
fn at(nursery: &Nursery, text: &str) -> bool {
    !at_eof(nursery, 0) && peek(nursery, 0) == text
}
fn is_component_start(text: &str) -> bool {
    text.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
}

fn unexpected(nursery: &Nursery, expected: &str) -> SilvaError {
    let found = if at_eof(nursery, 0) { "<eof>" } else { peek(nursery, 0) };
    SilvaError::new(
        Severity::Major,
        nursery.token_index(),
        format!("expected '{expected}', found '{found}'"),
    )
}

/// Parses a full Seed source file (already tokenized) into a [ParseTree]
/// tagged with [SeedNames]. This is the entry point [crate::grammar] calls.
pub fn parse(ward: &mut Ward, tokenization: &Tokenization) -> Result<ParseTree> {
    let names = SeedNames::new(ward);
    let mut nursery = Nursery::new(tokenization);
    let proto = parse_seed_body(&mut nursery, names)?;
    if !at_eof(&nursery, 0) {
        return Err(SilvaError::new(
            Severity::Major,
            nursery.token_index(),
            "unexpected trailing content after Seed source",
        ));
    }
    debug_assert_eq!(proto.num_children, 1);
    Ok(nursery.finish())
}

fn parse_seed_body(nursery: &mut Nursery, names: SeedNames) -> Result<ProtoNode> {
    let mut stake = nursery.stake();
    stake.create_node(names.root);
    while at(stake.nursery(), "-") {
        let proto = parse_rule(&mut stake, names)?;
        stake.absorb(proto);
    }
    Ok(stake.commit())
}

fn parse_rule(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    expect_stake(parent, "-")?;
    let mut stake = parent.stake();
    stake.create_node(names.rule);

    let name_proto = parse_name_path_node(&mut stake, names.nonterminal, names)?;
    stake.absorb(name_proto);

    let body_proto = parse_body(&mut stake, names)?;
    stake.absorb(body_proto);
    Ok(stake.commit())
}

fn expect_stake(stake: &mut crate::nursery::Stake, text: &str) -> Result<()> {
    if !at(stake.nursery(), text) {
        return Err(unexpected(stake.nursery(), text));
    }
    stake.advance();
    Ok(())
}

fn parse_name_path_node(
    parent: &mut crate::nursery::Stake,
    tag: crate::catalog::NameId,
    _names: SeedNames,
) -> Result<ProtoNode> {
    let mut stake = parent.stake();
    stake.create_node(tag);
    parse_name_path_tokens(&mut stake)?;
    Ok(stake.commit())
}

fn parse_name_path_tokens(stake: &mut crate::nursery::Stake) -> Result<()> {
    if stake.nursery().is_eof_by(0) || !is_component_start(peek(stake.nursery(), 0)) {
        return Err(unexpected(stake.nursery(), "a name-path component"));
    }
    stake.advance();
    while at(stake.nursery(), ".") {
        stake.advance();
        if stake.nursery().is_eof_by(0) || !is_component_start(peek(stake.nursery(), 0)) {
            return Err(unexpected(stake.nursery(), "a name-path component after '.'"));
        }
        stake.advance();
    }
    Ok(())
}

fn parse_body(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    // "[" is always its own token (see OPLET_CHARS in tokenization), so the
    // nested-scope marker is two tokens ("=", "["), unlike "=>"/"=/" which
    // the tokenizer's operator-run grouping does join into one.
    if at(parent.nursery(), "=") && !at_eof(parent.nursery(), 1) && peek(parent.nursery(), 1) == "[" {
        parent.advance();
        parent.advance();
        let mut stake = parent.stake();
        stake.create_node(names.body_scope);
        let inner = parse_seed_body(stake_nursery_mut(&mut stake), names)?;
        stake.absorb(inner);
        expect_stake(&mut stake, "]")?;
        return Ok(stake.commit());
    }
    if at(parent.nursery(), "=/") {
        parent.advance();
        let mut stake = parent.stake();
        stake.create_node(names.body_axe);
        let inner = parse_axe_body(&mut stake, names)?;
        stake.absorb(inner);
        return Ok(stake.commit());
    }
    if at(parent.nursery(), "=>") {
        parent.advance();
        let mut stake = parent.stake();
        stake.create_node(names.body_alias);
        let path = parse_name_path_node(&mut stake, names.nonterminal, names)?;
        stake.absorb(path);
        return Ok(stake.commit());
    }
    expect_stake(parent, "=")?;
    let mut stake = parent.stake();
    stake.create_node(names.body_def);
    let expr = parse_or(&mut stake, names)?;
    stake.absorb(expr);
    Ok(stake.commit())
}

/// `parse_seed_body` needs a bare `&mut Nursery` to recurse (it opens its
/// own top-level stake), but we are already inside `stake`'s borrow here;
/// this reborrows through the [Stake] API rather than via raw access.
fn stake_nursery_mut<'n, 't>(stake: &'n mut crate::nursery::Stake<'_, 't>) -> &'n mut Nursery<'t> {
    stake.nursery_mut()
}

fn parse_or(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let mut stake = parent.stake();
    stake.create_node(names.expr_or);
    let first = parse_and(&mut stake, names)?;
    stake.absorb(first);
    while at(stake.nursery(), "|") {
        stake.advance();
        let next = parse_and(&mut stake, names)?;
        stake.absorb(next);
    }
    Ok(stake.commit())
}

/// `but_then`-joined sequence, binding tighter than `|` and looser than
/// plain juxtaposition: `a but_then b but_then c` evaluates each operand in
/// turn under one stake, the last one's success deciding the group's.
fn parse_and(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let mut stake = parent.stake();
    stake.create_node(names.expr_and);
    let first = parse_concat(&mut stake, names)?;
    stake.absorb(first);
    while at(stake.nursery(), "but_then") {
        stake.advance();
        let next = parse_concat(&mut stake, names)?;
        stake.absorb(next);
    }
    Ok(stake.commit())
}

fn parse_concat(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let mut stake = parent.stake();
    stake.create_node(names.expr_concat);
    let first = parse_unary(&mut stake, names)?;
    stake.absorb(first);
    while starts_unary(stake.nursery()) {
        let next = parse_unary(&mut stake, names)?;
        stake.absorb(next);
    }
    Ok(stake.commit())
}

fn starts_unary(nursery: &Nursery) -> bool {
    if at_eof(nursery, 0) {
        return false;
    }
    !matches!(peek(nursery, 0), "|" | "but_then" | ")" | "]" | "-" | "," | "->")
}

fn parse_unary(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    if at(parent.nursery(), "not") {
        let mut stake = parent.stake();
        stake.advance();
        stake.create_node(names.expr_not);
        let inner = parse_postfix(&mut stake, names)?;
        stake.absorb(inner);
        return Ok(stake.commit());
    }
    parse_postfix(parent, names)
}

/// Parses a primary and, if followed by `?`/`*`/`+`, wraps it in place via
/// [Nursery::wrap_subtree] — the suffix is only known after the primary has
/// already been parsed and committed, so by the time we need the wrapper
/// node it is too late to have reserved one through the normal
/// `create_node`-before-children [Stake] protocol.
fn parse_postfix(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let before = parent.nursery().raw_nodes().len() as u32;
    let primary = parse_primary(parent, names)?;
    if !parent.nursery().is_eof_by(0) && matches!(peek(parent.nursery(), 0), "?" | "*" | "+") {
        let suffix = peek(parent.nursery(), 0);
        let name = match suffix {
            "?" => names.expr_opt,
            "*" => names.expr_star,
            _ => names.expr_plus,
        };
        parent.advance();
        let token_end = parent.token_index();
        parent
            .nursery_mut()
            .wrap_subtree(before, name, 1, primary.token_begin, token_end);
        return Ok(ProtoNode {
            rule_name: None,
            num_children: 1,
            subtree_size: primary.subtree_size + 1,
            token_begin: primary.token_begin,
            token_end,
            last_error: None,
        });
    }
    Ok(primary)
}

fn parse_primary(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    if at(parent.nursery(), "(") {
        parent.advance();
        let mut stake = parent.stake();
        stake.create_node(names.expr_paren);
        let inner = parse_or(&mut stake, names)?;
        stake.absorb(inner);
        expect_stake(&mut stake, ")")?;
        return Ok(stake.commit());
    }
    if at(parent.nursery(), "keywords_of") {
        parent.advance();
        let mut stake = parent.stake();
        stake.create_node(names.term_keywords_of);
        let path = parse_name_path_node(&mut stake, names.nonterminal, names)?;
        stake.absorb(path);
        return Ok(stake.commit());
    }
    if !at_eof(parent.nursery(), 0) && TERMINAL_KEYWORDS.contains(&peek(parent.nursery(), 0)) {
        return parse_terminal_keyword(parent, names);
    }
    if !at_eof(parent.nursery(), 0) && peek(parent.nursery(), 0).starts_with('\'') {
        let mut stake = parent.stake();
        stake.create_node(names.term_literal);
        stake.advance();
        return Ok(stake.commit());
    }
    if !at_eof(parent.nursery(), 0)
        && is_component_start(peek(parent.nursery(), 0))
        && !at_eof(parent.nursery(), 1)
        && peek(parent.nursery(), 1) == "("
    {
        return parse_func_call(parent, names);
    }
    parse_nonterm_ref(parent, names)
}

fn parse_terminal_keyword(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let kw = peek(parent.nursery(), 0);
    let name = match kw {
        "end_of_file" => names.term_eof,
        "epsilon" => names.term_epsilon,
        "any" => names.term_any,
        "identifier" => names.term_identifier,
        "operator" => names.term_operator,
        "string" => names.term_string,
        "number" => names.term_number,
        _ => unreachable!(),
    };
    let refinable = matches!(kw, "identifier" | "operator");
    let mut stake = parent.stake();
    stake.advance();
    if refinable && at(stake.nursery(), "/") {
        stake.advance();
        stake.create_node(name);
        if stake.nursery().is_eof_by(0) || !peek(stake.nursery(), 0).starts_with('\'') {
            return Err(unexpected(stake.nursery(), "a quoted regex pattern after '/'"));
        }
        let mut lit = stake.stake();
        lit.create_node(names.lit);
        lit.advance();
        let proto = lit.commit();
        stake.absorb(proto);
    } else {
        stake.create_node(name);
    }
    Ok(stake.commit())
}

fn parse_func_call(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let mut stake = parent.stake();
    stake.create_node(names.expr_func_call);
    stake.advance(); // function name token
    expect_stake(&mut stake, "(")?;
    if !at(stake.nursery(), ")") {
        loop {
            let arg = parse_or(&mut stake, names)?;
            stake.absorb(arg);
            if at(stake.nursery(), ",") {
                stake.advance();
                continue;
            }
            break;
        }
    }
    expect_stake(&mut stake, ")")?;
    Ok(stake.commit())
}

fn parse_nonterm_ref(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let mut stake = parent.stake();
    stake.create_node(names.expr_nonterm_ref);
    parse_name_path_tokens(&mut stake)?;
    if at(stake.nursery(), "->") {
        stake.advance();
        if stake.nursery().is_eof_by(0) || !is_component_start(peek(stake.nursery(), 0)) {
            return Err(unexpected(stake.nursery(), "a variable name after '->'"));
        }
        stake.advance();
    }
    Ok(stake.commit())
}

fn parse_axe_body(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    expect_stake(parent, "atom")?;
    let atom = parse_name_path_node(parent, names.nonterminal, names)?;
    parent.absorb(atom);

    loop {
        if parent.nursery().is_eof_by(0) || !matches!(peek(parent.nursery(), 0), "nest" | "ltr" | "rtl") {
            break;
        }
        let level = parse_axe_level(parent, names)?;
        parent.absorb(level);
    }
    // Return a transparent pass-through: the caller (`parse_body`'s
    // `body_axe` stake) already owns the enclosing node.
    Ok(ProtoNode {
        rule_name: None,
        num_children: 0,
        subtree_size: 0,
        token_begin: parent.token_index(),
        token_end: parent.token_index(),
        last_error: None,
    })
}

fn parse_axe_level(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let assoc = peek(parent.nursery(), 0);
    let name = match assoc {
        "nest" => names.axe_level_nest,
        "ltr" => names.axe_level_ltr,
        "rtl" => names.axe_level_rtl,
        _ => return Err(unexpected(parent.nursery(), "'nest', 'ltr' or 'rtl'")),
    };
    let mut stake = parent.stake();
    stake.advance();
    stake.create_node(name);
    let path = parse_name_path_node(&mut stake, names.nonterminal, names)?;
    stake.absorb(path);

    loop {
        if stake.nursery().is_eof_by(0) || !OPER_KIND_KEYWORDS.contains(&peek(stake.nursery(), 0)) {
            break;
        }
        let group = parse_oper_group(&mut stake, names)?;
        stake.absorb(group);
    }
    Ok(stake.commit())
}

fn parse_oper_group(parent: &mut crate::nursery::Stake, names: SeedNames) -> Result<ProtoNode> {
    let kind = peek(parent.nursery(), 0);
    let name = match kind {
        "atom_nest" => names.axe_op_atom_nest,
        "prefix_nest" => names.axe_op_prefix_nest,
        "prefix" => names.axe_op_prefix,
        "postfix" => names.axe_op_postfix,
        "postfix_nest" => names.axe_op_postfix_nest,
        "infix" => names.axe_op_infix,
        "infix_flat" => names.axe_op_infix_flat,
        "ternary" => names.axe_op_ternary,
        _ => unreachable!(),
    };
    let mut stake = parent.stake();
    stake.advance();
    stake.create_node(name);
    while !stake.nursery().is_eof_by(0) && peek(stake.nursery(), 0).starts_with('\'') {
        let mut lit = stake.stake();
        lit.create_node(names.lit);
        lit.advance();
        let proto = lit.commit();
        stake.absorb(proto);
    }
    Ok(stake.commit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenization::tokenize;

    fn parse_src(src: &str) -> (Ward, ParseTree) {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, src).unwrap();
        let tree = parse(&mut ward, &tok).unwrap();
        tree.check_invariants().unwrap();
        (ward, tree)
    }

    #[test]
    fn parses_simple_definition() {
        let (_, tree) = parse_src("- Foo = 'a' 'b'");
        let root = &tree.nodes[0];
        assert_eq!(root.num_children, 1);
    }

    #[test]
    fn parses_alias() {
        parse_src("- Foo => Bar");
    }

    #[test]
    fn parses_nested_scope() {
        parse_src("- Foo =[ - Bar = 'x' ]");
    }

    #[test]
    fn parses_alternation_and_postfix() {
        parse_src("- Foo = ('a' | 'b')* not 'c'?");
    }

    #[test]
    fn parses_func_call_and_binding() {
        parse_src("- Foo = Bar -> x parse_f(_.Seed, x)");
    }

    #[test]
    fn parses_regex_refined_terminal() {
        parse_src("- Foo = identifier/'^[A-Z]'");
    }

    #[test]
    fn parses_axe_body() {
        parse_src("- Expr =/ atom Num ltr Mul infix '*' ltr Add infix '+'");
    }

    #[test]
    fn parses_but_then_conjunction() {
        let (mut ward, tree) = parse_src("- Foo = 'a' but_then 'b' but_then 'c'");
        let names = SeedNames::new(&mut ward);
        let and_count = tree.nodes.iter().filter(|n| n.rule_name == names.expr_and).count();
        assert_eq!(and_count, 1);
    }

    #[test]
    fn rejects_unclosed_paren() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "- Foo = ('a'").unwrap();
        assert!(parse(&mut ward, &tok).is_err());
    }
}
