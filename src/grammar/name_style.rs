//! Resolution of a `Nonterminal`/rule-name path into a fully-qualified
//! [NameId], via the four-way style described in spec §4.2:
//!
//! - `_` resets to the root scope
//! - `x` stays at the current scope
//! - `p` moves to the parent of the current scope
//! - anything else names a child of the current scope
//!
//! A path is a dotted chain of these components (`p.Concat`, `_.Seed.Rule`,
//! `x`, `Foo`), read directly off the token range a `Nonterminal` occupies in
//! the source tokenization: tokens at even offsets are path components,
//! tokens at odd offsets are the `.` separators the tokenizer in
//! [crate::tokenization] splits out on its own. No payload needs to live on
//! the [ParseTreeNode](crate::tree::ParseTreeNode) itself, matching its
//! fixed, no-extra-field shape (spec §3.3).
use crate::catalog::{NameId, Ward, NAME_ID_ROOT};
use crate::error::{Result, Severity, SilvaError};
use crate::tokenization::Tokenization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component<'a> {
    Root,
    Current,
    Parent,
    Named(&'a str),
}

fn components(tokenization: &Tokenization, token_begin: u32, token_end: u32) -> Vec<Component<'_>> {
    let mut out = Vec::new();
    let mut i = token_begin;
    while i < token_end {
        let text = tokenization.text_of(i);
        out.push(match text {
            "_" => Component::Root,
            "x" => Component::Current,
            "p" => Component::Parent,
            other => Component::Named(other),
        });
        // Skip the "." separator, if present.
        i += 2;
    }
    out
}

/// Resolves a dotted name-style path occupying `[token_begin, token_end)` of
/// `tokenization`, relative to `scope`.
pub fn resolve_path(
    ward: &mut Ward,
    tokenization: &Tokenization,
    scope: NameId,
    token_begin: u32,
    token_end: u32,
) -> Result<NameId> {
    let comps = components(tokenization, token_begin, token_end);
    if comps.is_empty() {
        return Err(SilvaError::new(
            Severity::BrokenSeed,
            token_begin,
            "empty name-style path",
        ));
    }
    let mut current = scope;
    for (i, comp) in comps.iter().enumerate() {
        current = match comp {
            Component::Root => {
                if i != 0 {
                    return Err(SilvaError::new(
                        Severity::BrokenSeed,
                        token_begin,
                        "'_' may only appear as the first component of a name path",
                    ));
                }
                NAME_ID_ROOT
            }
            Component::Current => current,
            Component::Parent => ward.parent_of(current),
            Component::Named(text) => {
                let tok = ward.intern(text, crate::catalog::Category::Identifier);
                ward.name_id(current, tok)
            }
        };
    }
    Ok(current)
}

/// Resolves a path the same way, but always relative to the root scope
/// regardless of `scope` — used for the `scope` argument of `parse_f`, which
/// the spec (§4.3.3) says is resolved absolutely.
pub fn resolve_path_absolute(
    ward: &mut Ward,
    tokenization: &Tokenization,
    token_begin: u32,
    token_end: u32,
) -> Result<NameId> {
    resolve_path(ward, tokenization, NAME_ID_ROOT, token_begin, token_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenization::tokenize;

    #[test]
    fn resolves_plain_child() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "Foo").unwrap();
        let scope = ward.name_id_of(&["Seed", "Expr"]);
        let resolved = resolve_path(&mut ward, &tok, scope, 0, tok.num_tokens()).unwrap();
        assert_eq!(resolved, ward.name_id_of(&["Seed", "Expr", "Foo"]));
    }

    #[test]
    fn resolves_parent_then_child() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "p.Concat").unwrap();
        let scope = ward.name_id_of(&["Seed", "Expr", "Or"]);
        let resolved = resolve_path(&mut ward, &tok, scope, 0, tok.num_tokens()).unwrap();
        assert_eq!(resolved, ward.name_id_of(&["Seed", "Expr", "Concat"]));
    }

    #[test]
    fn resolves_root_anchor() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "_.Seed.Rule").unwrap();
        let scope = ward.name_id_of(&["Seed", "Expr", "Or"]);
        let resolved = resolve_path(&mut ward, &tok, scope, 0, tok.num_tokens()).unwrap();
        assert_eq!(resolved, ward.name_id_of(&["Seed", "Rule"]));
    }

    #[test]
    fn resolves_current_scope() {
        let mut ward = Ward::new();
        let tok = tokenize(&mut ward, "x").unwrap();
        let scope = ward.name_id_of(&["Seed", "Expr"]);
        let resolved = resolve_path(&mut ward, &tok, scope, 0, tok.num_tokens()).unwrap();
        assert_eq!(resolved, scope);
    }
}
